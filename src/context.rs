//! A minimal cooperative cancellation token.
//!
//! The decoder/dispatcher/encoder "context-aware" variants need a cheap,
//! clonable cancellation signal without pulling in an async runtime.
//! [`Context`] is a handle threaded through a call tree that can be asked
//! "are we done?" and that propagates cancellation to every clone sharing
//! the same root — the same shape as `tokio_util::sync::CancellationToken`,
//! reimplemented over a bare `Arc<AtomicBool>` since this crate has no other
//! async dependency to justify pulling in tokio for one flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cancellation signal shared by clone. Cancelling any clone cancels all
/// of them.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
}

impl Context {
    /// A fresh, not-yet-cancelled context.
    pub fn new() -> Self {
        Context::default()
    }

    /// True iff this context (or any clone of it) has been cancelled.
    pub fn is_done(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Cancels this context and every clone sharing its cancellation flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns the cancellation error if this context is done, else `Ok(())`.
    pub fn check(&self) -> Result<(), ContextCancelled> {
        if self.is_done() {
            Err(ContextCancelled)
        } else {
            Ok(())
        }
    }
}

/// The context was cancelled before or during an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("context cancelled")]
pub struct ContextCancelled;
