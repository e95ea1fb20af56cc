//! Ordered middleware composed around a registered handler.
//!
//! An interceptor chain is flattened into a single callable *at
//! registration time*, not rebuilt per call — batch traffic would
//! otherwise pay an allocation per request just to walk the middleware
//! list.

use crate::context::Context;
use crate::handler::{BoxHandler, Handler, HandlerResult};
use crate::id::Id;
use serde_json::value::RawValue;
use std::sync::Arc;

/// Per-invocation metadata handed to every interceptor and the terminal
/// handler: the fully-qualified method name, whether this request arrived
/// as part of a batch, and its id. Useful for logging, auth decisions, or
/// timing middleware that doesn't otherwise need to touch params/result.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// The full, namespace-qualified method name.
    pub method_full_name: String,
    /// Whether this request was part of a batch.
    pub is_batch: bool,
    /// The request's id.
    pub id: Id,
}

/// Middleware wrapping a handler.
///
/// An interceptor receives the same arguments a [`Handler`] does, plus the
/// downstream handler (`next`) it must explicitly invoke to continue the
/// chain. Returning without calling `next` short-circuits: no downstream
/// interceptor or the terminal handler ever runs.
pub trait Interceptor: Send + Sync {
    /// Runs this interceptor, optionally delegating to `next`.
    fn call(
        &self,
        ctx: &Context,
        params: Option<&RawValue>,
        info: &RequestInfo,
        next: &dyn Handler,
    ) -> HandlerResult;
}

impl<F> Interceptor for F
where
    F: Fn(&Context, Option<&RawValue>, &RequestInfo, &dyn Handler) -> HandlerResult + Send + Sync,
{
    fn call(
        &self,
        ctx: &Context,
        params: Option<&RawValue>,
        info: &RequestInfo,
        next: &dyn Handler,
    ) -> HandlerResult {
        self(ctx, params, info, next)
    }
}

/// A shared, type-erased interceptor, as stored on a registry namespace.
pub type BoxInterceptor = Arc<dyn Interceptor>;

/// Composes `interceptors` (declaration order, first-registered runs first)
/// around `base`, producing a single handler equivalent to invoking the
/// whole chain.
///
/// For `interceptors = [A, B]` and handler `H`, the result behaves as
/// `A(B(H))` — `A` is entered first and left last, matching the
/// enter/leave symmetry described for nested namespaces: a parent's
/// interceptors wrap around a child's.
pub fn compose(interceptors: &[BoxInterceptor], base: BoxHandler) -> BoxHandler {
    let mut handler = base;
    for interceptor in interceptors.iter().rev() {
        let inner = handler.clone();
        let interceptor = interceptor.clone();
        handler = Arc::new(
            move |ctx: &Context, params: Option<&RawValue>, info: &RequestInfo| {
                interceptor.call(ctx, params, info, inner.as_ref())
            },
        ) as BoxHandler;
    }
    handler
}
