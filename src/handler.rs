//! The handler trait invoked at the end of an interceptor chain.
//!
//! A trait for handlers that need to carry state, plus a blanket impl over
//! plain closures for the common case.

use crate::context::Context;
use crate::error::Error;
use crate::interceptor::RequestInfo;
use serde_json::value::RawValue;
use std::sync::Arc;

/// The result a handler or interceptor produces: a pre-encoded JSON result
/// fragment, or a protocol error.
pub type HandlerResult = Result<Box<RawValue>, Error>;

/// A registered method's business logic.
///
/// Receives the request's raw params (already namespace-resolved, not yet
/// interceptor-wrapped) and must return either an encoded result or a
/// protocol error.
pub trait Handler: Send + Sync {
    /// Invokes the handler.
    fn call(&self, ctx: &Context, params: Option<&RawValue>, info: &RequestInfo) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&Context, Option<&RawValue>, &RequestInfo) -> HandlerResult + Send + Sync,
{
    fn call(&self, ctx: &Context, params: Option<&RawValue>, info: &RequestInfo) -> HandlerResult {
        self(ctx, params, info)
    }
}

/// A shared, type-erased handler, as stored in the registry.
pub type BoxHandler = Arc<dyn Handler>;
