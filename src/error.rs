//! The JSON-RPC 2.0 error object and the crate's internal error taxonomy.
//!
//! [`Error`] is the wire type: `{"code":N,"message":S,"data":J?}`. It carries
//! an optional internal `cause` for programmatic inspection — never
//! serialized, used by callers that want to log or match on the underlying
//! Rust error that produced a given JSON-RPC error.

use crate::request::Request;
use std::fmt;
use std::sync::Arc;

/// Invalid JSON was received by the server.
pub const CODE_PARSE_ERROR: i32 = -32700;
/// The JSON sent is not a valid request object.
pub const CODE_INVALID_REQUEST: i32 = -32600;
/// The requested method does not exist or is not available.
pub const CODE_METHOD_NOT_FOUND: i32 = -32601;
/// Invalid method parameter(s).
pub const CODE_INVALID_PARAMS: i32 = -32602;
/// Internal JSON-RPC error.
pub const CODE_INTERNAL_ERROR: i32 = -32603;

/// A JSON-RPC 2.0 error object.
///
/// `code` and `message` are always present; `data` is emitted only when set.
/// `cause`, if present, is never written to the wire — it exists purely so
/// the server process can inspect *why* an error occurred (for logging, for
/// example) without parsing its own `message` string back apart.
#[derive(Debug, Clone)]
pub struct Error {
    code: i32,
    message: String,
    data: Option<serde_json::Value>,
    cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Builds an application-defined error. `code` should stay outside the
    /// reserved `-32768..-32000` range unless you mean to collide with a
    /// protocol error on purpose.
    pub fn new(code: i32, message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Error {
            code,
            message: message.into(),
            data,
            cause: None,
        }
    }

    /// Attaches an internal cause to this error, for diagnostic inspection.
    /// Never affects the wire encoding.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// -32700 Parse error.
    pub fn parse_error() -> Self {
        Error::new(CODE_PARSE_ERROR, "Parse error", None)
    }

    /// -32600 Invalid Request.
    pub fn invalid_request() -> Self {
        Error::new(CODE_INVALID_REQUEST, "Invalid Request", None)
    }

    /// -32601 Method not found.
    pub fn method_not_found() -> Self {
        Error::new(CODE_METHOD_NOT_FOUND, "Method not found", None)
    }

    /// -32602 Invalid params, with a free-form detail string as `data`.
    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Error::new(
            CODE_INVALID_PARAMS,
            "Invalid params",
            Some(serde_json::Value::String(detail.into())),
        )
    }

    /// -32603 Internal error, wrapping an arbitrary Rust error as the cause.
    pub fn internal_error(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::new(CODE_INTERNAL_ERROR, "Internal error", None).with_cause(cause)
    }

    /// -32603 Internal error, with a message but no structured cause.
    pub fn internal_message(message: impl Into<String>) -> Self {
        Error::new(CODE_INTERNAL_ERROR, message, None)
    }

    /// The error code.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The opaque `data` payload, if any.
    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    /// The internal, never-serialized cause, if one was attached.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync)> {
        self.cause.as_deref()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            Some(data) => write!(
                f,
                "jsonrpc: code: {}, message: {}, data: {}",
                self.code, self.message, data
            ),
            None => write!(f, "jsonrpc: code: {}, message: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for Error {}

impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let len = if self.data.is_some() { 3 } else { 2 };
        let mut s = serializer.serialize_struct("Error", len)?;
        s.serialize_field("code", &self.code)?;
        s.serialize_field("message", &self.message)?;
        if let Some(data) = &self.data {
            s.serialize_field("data", data)?;
        }
        s.end()
    }
}

impl<'de> serde::Deserialize<'de> for Error {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        struct Wire {
            code: i32,
            message: String,
            #[serde(default)]
            data: Option<serde_json::Value>,
        }
        let wire = Wire::deserialize(deserializer)?;
        Ok(Error {
            code: wire.code,
            message: wire.message,
            data: wire.data,
            cause: None,
        })
    }
}

/// The diagnostic cause attached to an internal-error response synthesized
/// when a handler or interceptor panics.
///
/// Carries the offending request and the value the panic unwound with, so a
/// caller-supplied panic observer (or a log line) can render something
/// useful instead of just "-32603 Internal error".
#[derive(Debug)]
pub struct RecoveredError {
    /// The request whose handler panicked.
    pub request: Request,
    /// The panic payload, downcast to a string where possible.
    pub recovered: String,
}

impl fmt::Display for RecoveredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "recovered panic: {}, request: method={:?} id={:?}",
            self.recovered, self.request.method, self.request.id
        )
    }
}

impl std::error::Error for RecoveredError {}
