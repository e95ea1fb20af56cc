//! Runs decoded requests against a [`Registry`], producing the responses a
//! [`crate::stream_encoder::StreamEncoder`] will serialize.
//!
//! Concurrent requests within a batch run under `std::thread::scope`, with
//! a cooperative [`Context`] token standing in for cancellation: the first
//! non-protocol error cancels the context, every spawned request observes
//! that on its next check, and `scope` provides the "wait for every peer"
//! join without an async runtime.

use crate::context::{Context, ContextCancelled};
use crate::error::{Error, RecoveredError};
use crate::id::Id;
use crate::interceptor::RequestInfo;
use crate::registry::Registry;
use crate::request::Request;
use crate::response::Response;
use crate::stream_decoder::SENTINEL_PARSE_ERROR;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// A non-protocol failure aborting an entire [`Dispatcher::execute`] call —
/// as opposed to a protocol error, which is always surfaced as a normal
/// [`Response`] with an `error` field, never as this type.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The context was cancelled before or during dispatch.
    #[error(transparent)]
    Cancelled(#[from] ContextCancelled),
}

/// Observes a recovered panic: the request whose handler panicked and the
/// panic payload, rendered to a string.
pub type PanicHandler = Arc<dyn Fn(&Request, &str) + Send + Sync>;

/// Executes requests against a [`Registry`].
pub struct Dispatcher {
    registry: Registry,
    concurrent: bool,
    panic_handler: Option<PanicHandler>,
}

impl Dispatcher {
    /// A dispatcher over `registry` with concurrent batch execution enabled
    /// (the default).
    pub fn new(registry: Registry) -> Self {
        Dispatcher {
            registry,
            concurrent: true,
            panic_handler: None,
        }
    }

    /// Disables concurrent execution of batch requests; a batch runs
    /// strictly in input order on the calling thread.
    pub fn disable_concurrency(mut self) -> Self {
        self.concurrent = false;
        self
    }

    /// Installs an observer invoked whenever a handler or interceptor
    /// panics, before the internal-error response is synthesized.
    pub fn with_panic_handler(mut self, handler: PanicHandler) -> Self {
        self.panic_handler = Some(handler);
        self
    }

    /// Runs `requests` (as decoded together, with `batch` indicating
    /// whether they arrived as a JSON array) and returns the sendable
    /// responses, in no particular order for batches.
    pub fn execute(
        &self,
        ctx: &Context,
        requests: &[Request],
        batch: bool,
    ) -> Result<Vec<Response>, DispatchError> {
        match requests {
            [] => Ok(vec![Response::failure(Error::invalid_request(), Id::null())]),
            [only] => Ok(self.do_method(ctx, only, batch)?.into_iter().collect()),
            many if !self.concurrent => {
                let mut responses = Vec::with_capacity(many.len());
                for req in many {
                    if let Some(resp) = self.do_method(ctx, req, batch)? {
                        responses.push(resp);
                    }
                }
                Ok(responses)
            }
            many => self.execute_concurrent(ctx, many, batch),
        }
    }

    fn execute_concurrent(
        &self,
        ctx: &Context,
        requests: &[Request],
        batch: bool,
    ) -> Result<Vec<Response>, DispatchError> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = requests
                .iter()
                .map(|req| {
                    let ctx = ctx.clone();
                    scope.spawn(move || self.do_method(&ctx, req, batch))
                })
                .collect();

            let mut responses = Vec::with_capacity(requests.len());
            let mut first_err = None;
            for handle in handles {
                match handle.join() {
                    Ok(Ok(Some(resp))) => responses.push(resp),
                    Ok(Ok(None)) => {}
                    Ok(Err(e)) => {
                        if first_err.is_none() {
                            ctx.cancel();
                            first_err = Some(e);
                        }
                    }
                    Err(_) => {
                        // do_method catches its own panics; a join-level
                        // panic means a bug elsewhere escaped that guard.
                        if first_err.is_none() {
                            ctx.cancel();
                            first_err = Some(DispatchError::Cancelled(ContextCancelled));
                        }
                    }
                }
            }
            match first_err {
                Some(e) => Err(e),
                None => Ok(responses),
            }
        })
    }

    /// Runs the six-step per-request algorithm, returning `None` when the
    /// resulting response isn't sendable (a notification whose handler
    /// succeeded).
    fn do_method(
        &self,
        ctx: &Context,
        req: &Request,
        batch: bool,
    ) -> Result<Option<Response>, DispatchError> {
        ctx.check()?;

        if req.jsonrpc != "2.0" {
            let mut resp = req.to_response_shell();
            resp.error = Some(Error::invalid_request());
            return Ok(self.finalize(resp));
        }

        if let Some(sentinel) = req.method.strip_prefix("rpc.") {
            return Ok(self.finalize(call_rpc_internal(req, sentinel)));
        }

        let mut resp = req.to_response_shell();
        let Some(metadata) = self.registry.lookup(&req.method) else {
            resp.error = Some(Error::method_not_found());
            return Ok(self.finalize(resp));
        };

        let info = RequestInfo {
            method_full_name: req.method.clone(),
            is_batch: batch,
            id: req.id.clone(),
        };
        let params = req.params.as_deref();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            metadata.chain.call(ctx, params, &info)
        }));

        match outcome {
            Ok(Ok(result)) => resp.result = Some(result),
            Ok(Err(e)) => resp.error = Some(e),
            Err(payload) => {
                let recovered = describe_panic(payload);
                if let Some(handler) = &self.panic_handler {
                    handler(req, &recovered);
                }
                resp.error = Some(
                    Error::internal_message("Internal error").with_cause(RecoveredError {
                        request: req.clone(),
                        recovered,
                    }),
                );
            }
        }

        Ok(self.finalize(resp))
    }

    fn finalize(&self, mut resp: Response) -> Option<Response> {
        if resp.error.is_some() && resp.id.is_absent() {
            resp.id = Id::null();
        }
        if resp.is_sendable() {
            Some(resp)
        } else {
            None
        }
    }
}

fn call_rpc_internal(req: &Request, sentinel: &str) -> Response {
    let mut resp = req.to_response_shell();
    resp.error = Some(match sentinel {
        "parseError" => parse_error_with_cause(req),
        "invalidRequest" => invalid_request_with_cause(req),
        "internalError" => internal_error_with_cause(req),
        _ => Error::method_not_found(),
    });
    resp
}

fn parse_error_with_cause(req: &Request) -> Error {
    match &req.cause {
        Some(cause) => Error::parse_error().with_cause(CauseText(cause.clone())),
        None => Error::parse_error(),
    }
}

fn invalid_request_with_cause(req: &Request) -> Error {
    match &req.cause {
        Some(cause) => Error::invalid_request().with_cause(CauseText(cause.clone())),
        None => Error::invalid_request(),
    }
}

fn internal_error_with_cause(req: &Request) -> Error {
    match &req.cause {
        Some(cause) => Error::internal_message("Internal error").with_cause(CauseText(cause.clone())),
        None => Error::internal_message("Internal error"),
    }
}

/// Wraps a plain diagnostic string as a `std::error::Error`, so it can ride
/// along as an [`Error`]'s never-serialized cause.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct CauseText(String);

fn describe_panic(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unrecognized panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use serde_json::value::RawValue;

    fn registry_with(
        name: &str,
        handler: impl Handler + 'static,
    ) -> Registry {
        let registry = Registry::new();
        registry
            .register(name, handler, None::<&str>, None::<&str>)
            .unwrap();
        registry
    }

    fn json(s: &str) -> Box<RawValue> {
        RawValue::from_string(s.to_string()).unwrap()
    }

    #[test]
    fn empty_input_yields_one_invalid_request_response() {
        let dispatcher = Dispatcher::new(Registry::new());
        let ctx = Context::new();
        let responses = dispatcher.execute(&ctx, &[], false).unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].error.as_ref().unwrap().code(), crate::error::CODE_INVALID_REQUEST);
        assert_eq!(responses[0].id, Id::Null);
    }

    #[test]
    fn successful_call_encodes_result() {
        let registry = registry_with("echo", |_ctx: &Context, params: Option<&RawValue>, _info: &RequestInfo| {
            Ok(RawValue::from_string(params.unwrap().get().to_string()).unwrap())
        });
        let dispatcher = Dispatcher::new(registry);
        let ctx = Context::new();
        let req = Request::new("echo", Some(&19i64), Id::from(1i64)).unwrap();
        let responses = dispatcher.execute(&ctx, &[req], false).unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].result.as_ref().unwrap().get(), "19");
    }

    #[test]
    fn notification_with_successful_handler_produces_no_response() {
        let registry = registry_with("ping", |_ctx: &Context, _p: Option<&RawValue>, _i: &RequestInfo| {
            Ok(json("null"))
        });
        let dispatcher = Dispatcher::new(registry);
        let ctx = Context::new();
        let req = Request::without_params("ping", Id::Absent);
        let responses = dispatcher.execute(&ctx, &[req], false).unwrap();
        assert!(responses.is_empty());
    }

    #[test]
    fn notification_with_failing_handler_gets_explicit_null_id() {
        let registry = registry_with("boom", |_ctx: &Context, _p: Option<&RawValue>, _i: &RequestInfo| {
            Err(Error::invalid_params("nope"))
        });
        let dispatcher = Dispatcher::new(registry);
        let ctx = Context::new();
        let req = Request::without_params("boom", Id::Absent);
        let responses = dispatcher.execute(&ctx, &[req], false).unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].id, Id::Null);
    }

    #[test]
    fn unknown_method_yields_method_not_found() {
        let dispatcher = Dispatcher::new(Registry::new());
        let ctx = Context::new();
        let req = Request::without_params("missing", Id::from(1i64));
        let responses = dispatcher.execute(&ctx, &[req], false).unwrap();
        assert_eq!(responses[0].error.as_ref().unwrap().code(), crate::error::CODE_METHOD_NOT_FOUND);
    }

    #[test]
    fn rpc_prefixed_user_method_is_rejected_as_method_not_found() {
        let dispatcher = Dispatcher::new(Registry::new());
        let ctx = Context::new();
        let req = Request::without_params("rpc.somethingElse", Id::from(1i64));
        let responses = dispatcher.execute(&ctx, &[req], false).unwrap();
        assert_eq!(responses[0].error.as_ref().unwrap().code(), crate::error::CODE_METHOD_NOT_FOUND);
    }

    #[test]
    fn sentinel_parse_error_is_translated() {
        let dispatcher = Dispatcher::new(Registry::new());
        let ctx = Context::new();
        let req = Request::without_params(SENTINEL_PARSE_ERROR, Id::Absent).with_cause("bad json");
        let responses = dispatcher.execute(&ctx, &[req], false).unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].error.as_ref().unwrap().code(), crate::error::CODE_PARSE_ERROR);
        assert_eq!(responses[0].id, Id::Null);
    }

    #[test]
    fn panicking_handler_is_recovered_as_internal_error() {
        let registry = registry_with("explode", |_ctx: &Context, _p: Option<&RawValue>, _i: &RequestInfo| -> crate::handler::HandlerResult {
            panic!("kaboom");
        });
        let dispatcher = Dispatcher::new(registry);
        let ctx = Context::new();
        let req = Request::without_params("explode", Id::from(1i64));
        let responses = dispatcher.execute(&ctx, &[req], false).unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].error.as_ref().unwrap().code(), crate::error::CODE_INTERNAL_ERROR);
    }

    #[test]
    fn concurrent_batch_runs_every_request() {
        let registry = Registry::new();
        registry
            .register("a", |_ctx: &Context, _p: Option<&RawValue>, _i: &RequestInfo| Ok(json("1")), None::<&str>, None::<&str>)
            .unwrap();
        registry
            .register("b", |_ctx: &Context, _p: Option<&RawValue>, _i: &RequestInfo| Ok(json("2")), None::<&str>, None::<&str>)
            .unwrap();
        let dispatcher = Dispatcher::new(registry);
        let ctx = Context::new();
        let requests = vec![
            Request::without_params("a", Id::from(1i64)),
            Request::without_params("b", Id::from(2i64)),
        ];
        let mut responses = dispatcher.execute(&ctx, &requests, true).unwrap();
        responses.sort_by_key(|r| r.id.as_i64());
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].result.as_ref().unwrap().get(), "1");
        assert_eq!(responses[1].result.as_ref().unwrap().get(), "2");
    }

    #[test]
    fn sequential_mode_preserves_order_and_still_runs_every_request() {
        let registry = Registry::new();
        registry
            .register("a", |_ctx: &Context, _p: Option<&RawValue>, _i: &RequestInfo| Ok(json("1")), None::<&str>, None::<&str>)
            .unwrap();
        registry
            .register("b", |_ctx: &Context, _p: Option<&RawValue>, _i: &RequestInfo| Ok(json("2")), None::<&str>, None::<&str>)
            .unwrap();
        let dispatcher = Dispatcher::new(registry).disable_concurrency();
        let ctx = Context::new();
        let requests = vec![
            Request::without_params("a", Id::from(1i64)),
            Request::without_params("b", Id::from(2i64)),
        ];
        let responses = dispatcher.execute(&ctx, &requests, true).unwrap();
        assert_eq!(responses[0].result.as_ref().unwrap().get(), "1");
        assert_eq!(responses[1].result.as_ref().unwrap().get(), "2");
    }

    #[test]
    fn already_cancelled_context_aborts_before_any_work() {
        let dispatcher = Dispatcher::new(Registry::new());
        let ctx = Context::new();
        ctx.cancel();
        let req = Request::without_params("anything", Id::from(1i64));
        let err = dispatcher.execute(&ctx, &[req], false).unwrap_err();
        assert!(matches!(err, DispatchError::Cancelled(_)));
    }
}
