//! Minimal client-side plumbing used by tests and the `demos/` examples.
//!
//! This is deliberately not a transport client: there is no socket or pipe
//! dial here, only the two pieces of bookkeeping a real client needs around
//! whatever transport it picks — an id source, and a way to correlate a
//! response with the call that's waiting on it. Tests feed encoded bytes
//! straight into [`crate::stream_decoder::StreamDecoder`], so a roundtrip
//! never actually has to leave the process.

use crate::id::Id;
use crate::response::Response;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::mpsc;
use std::sync::Mutex;

/// Hands out a fresh numeric id for each outgoing call, starting at 1.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: AtomicI64,
}

impl IdGenerator {
    /// A generator whose first id is `1`.
    pub fn new() -> Self {
        IdGenerator { next: AtomicI64::new(1) }
    }

    /// Returns the next id in sequence as an [`Id::Num`].
    pub fn next(&self) -> Id {
        Id::from(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// The receiving half of a single outstanding call, handed back by
/// [`PendingCalls::register`].
pub struct PendingCall {
    rx: mpsc::Receiver<Response>,
}

impl PendingCall {
    /// Blocks until the matching response arrives (or the sending half is
    /// dropped, e.g. because the connection closed first).
    pub fn wait(self) -> Result<Response, mpsc::RecvError> {
        self.rx.recv()
    }
}

/// Correlates in-flight calls with their eventual responses by id.
///
/// A real client reads responses off its transport on a background thread
/// and calls [`complete`](Self::complete) as each one arrives; the thread
/// that issued the call blocks in [`PendingCall::wait`] until its id shows
/// up. This crate stops at the correlation map — driving bytes across an
/// actual transport is out of scope.
#[derive(Default)]
pub struct PendingCalls {
    inflight: Mutex<HashMap<Id, mpsc::Sender<Response>>>,
}

impl PendingCalls {
    /// An empty correlation map.
    pub fn new() -> Self {
        PendingCalls::default()
    }

    /// Registers `id` as awaiting a response, returning the handle the
    /// calling thread blocks on.
    ///
    /// # Panics
    ///
    /// Panics if `id` is already registered — a client must not reuse an id
    /// for a second call before the first completes.
    pub fn register(&self, id: Id) -> PendingCall {
        let (tx, rx) = mpsc::channel();
        let mut inflight = self.inflight.lock().unwrap();
        if inflight.insert(id.clone(), tx).is_some() {
            panic!("jsonrpc-runtime: id {id:?} registered twice while still in flight");
        }
        PendingCall { rx }
    }

    /// Delivers `response` to whichever call is waiting on its id, if any.
    /// A response for an id nobody registered (or one already delivered) is
    /// silently dropped, matching a lenient client that tolerates stray or
    /// duplicate server traffic.
    pub fn complete(&self, response: Response) {
        let sender = self.inflight.lock().unwrap().remove(&response.id);
        if let Some(sender) = sender {
            let _ = sender.send(response);
        }
    }

    /// The number of calls still awaiting a response.
    pub fn len(&self) -> usize {
        self.inflight.lock().unwrap().len()
    }

    /// True iff no calls are outstanding.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_generator_counts_up_from_one() {
        let gen = IdGenerator::new();
        assert_eq!(gen.next(), Id::from(1i64));
        assert_eq!(gen.next(), Id::from(2i64));
        assert_eq!(gen.next(), Id::from(3i64));
    }

    #[test]
    fn pending_call_resolves_once_completed() {
        let pending = PendingCalls::new();
        let id = Id::from(7i64);
        let call = pending.register(id.clone());
        assert_eq!(pending.len(), 1);

        let response = Response::success(&crate::encode_value::Json("ok"), id).unwrap();
        pending.complete(response);
        assert!(pending.is_empty());

        let resolved = call.wait().unwrap();
        assert_eq!(resolved.id, Id::from(7i64));
    }

    #[test]
    fn response_for_unknown_id_is_dropped_silently() {
        let pending = PendingCalls::new();
        pending.complete(Response::success(&crate::encode_value::Json("ok"), Id::from(99i64)).unwrap());
        assert!(pending.is_empty());
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn registering_the_same_id_twice_panics() {
        let pending = PendingCalls::new();
        let _first = pending.register(Id::from(1i64));
        let _second = pending.register(Id::from(1i64));
    }
}
