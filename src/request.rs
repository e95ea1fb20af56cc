//! The JSON-RPC 2.0 request object.

use crate::bufferpool;
use crate::encode_value::{self, EncodeError, EncodeValue};
use crate::error::Error;
use crate::id::Id;
use crate::response::Response;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// A JSON-RPC 2.0 request.
///
/// `params` is kept as a pre-decoded raw fragment rather than eagerly parsed
/// into a concrete type: the dispatcher doesn't know a handler's parameter
/// type, and most requests never have their params inspected more than once.
///
/// # Fields
///
/// * `jsonrpc` — protocol version, must be exactly `"2.0"`.
/// * `method` — the method name to invoke.
/// * `params` — the raw JSON fragment for parameters, if present.
/// * `id` — the four-state identifier (see [`Id`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub params: Option<Box<RawValue>>,
    #[serde(default, skip_serializing_if = "Id::is_absent")]
    pub id: Id,
    /// Set only on synthetic requests the decoder or dispatcher manufacture
    /// for `rpc.parseError` / `rpc.invalidRequest` / `rpc.internalError` —
    /// the human-readable cause, carried in-process and never put on the
    /// wire. Mirrors the unexported `err` field on the original's `Request`.
    #[serde(skip)]
    pub cause: Option<String>,
}

impl Request {
    /// Builds a request with protocol version `"2.0"`, encoding `params`
    /// through the shared [`EncodeValue`] dispatch.
    pub fn new<T: EncodeValue>(
        method: impl Into<String>,
        params: Option<&T>,
        id: Id,
    ) -> Result<Self, EncodeError> {
        let params = match params {
            Some(p) => Some(encode_value::encode(p)?),
            None => None,
        };
        Ok(Request {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            id,
            cause: None,
        })
    }

    /// Builds a request carrying no parameters.
    pub fn without_params(method: impl Into<String>, id: Id) -> Self {
        Request {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params: None,
            id,
            cause: None,
        }
    }

    /// Attaches an in-process-only cause string, used by the decoder and
    /// dispatcher when manufacturing `rpc.*` sentinel requests.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Decodes `params` into `T`. Fails with invalid-params when absent or
    /// malformed — the shared helper every handler reaches for.
    pub fn decode_params<T: for<'de> Deserialize<'de>>(&self) -> Result<T, Error> {
        let Some(params) = &self.params else {
            return Err(Error::invalid_params("missing params"));
        };
        serde_json::from_str(params.get())
            .map_err(|e| Error::invalid_params(format!("invalid params: {e}")))
    }

    /// Converts this request into an empty response shell: copies `jsonrpc`
    /// and `id`, leaving both `result` and `error` unset.
    pub fn to_response_shell(&self) -> Response {
        Response {
            jsonrpc: self.jsonrpc.clone(),
            result: None,
            error: None,
            id: self.id.clone(),
        }
    }

    /// Encodes this request as a single line (JSON object followed by `\n`).
    pub fn encode_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = bufferpool::get();
        serde_json::to_writer(&mut buf, self)?;
        buf.append_byte(b'\n');
        let out = buf.as_bytes().to_vec();
        buf.release();
        Ok(out)
    }
}
