//! The JSON-RPC 2.0 response object.

use crate::bufferpool;
use crate::encode_value::{self, EncodeError, EncodeValue};
use crate::error::Error;
use crate::id::Id;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// A JSON-RPC 2.0 response.
///
/// Carries both a `result` slot and an `error` slot so the type can
/// represent "not yet decided" during dispatch, but the encoder enforces the
/// wire invariant: exactly one of the two is ever emitted, and `error` wins
/// if both happen to be set.
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result: Option<Box<RawValue>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<Error>,
    pub id: Id,
}

impl Response {
    /// Builds a successful response, encoding `result` through the shared
    /// [`EncodeValue`] dispatch.
    pub fn success<T: EncodeValue>(result: &T, id: Id) -> Result<Self, EncodeError> {
        Ok(Response {
            jsonrpc: "2.0".to_string(),
            result: Some(encode_value::encode(result)?),
            error: None,
            id,
        })
    }

    /// Builds an error response.
    pub fn failure(error: Error, id: Id) -> Self {
        Response {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Decodes `result` into `T`. Fails with a distinguishable error when
    /// `result` is absent (either this is an error response, or the result
    /// was literally never set).
    pub fn decode_result<T: for<'de> Deserialize<'de>>(&self) -> Result<T, ResultDecodeError> {
        let Some(result) = &self.result else {
            return Err(ResultDecodeError::NilResult);
        };
        serde_json::from_str(result.get()).map_err(ResultDecodeError::Json)
    }

    /// A response must be sent iff its id is present or it carries an error.
    /// Notifications whose handler succeeded produce no wire output at all.
    pub fn is_sendable(&self) -> bool {
        self.id.is_present() || self.error.is_some()
    }

    /// Encodes this response as a single line (JSON object followed by
    /// `\n`). The encoder emits `"result":...` xor `"error":...`, and
    /// suppresses `result` entirely when `error` is set, regardless of
    /// whether `result` happens to also be populated.
    pub fn encode_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = bufferpool::get();
        self.encode_to(&mut buf)?;
        buf.append_byte(b'\n');
        let out = buf.as_bytes().to_vec();
        buf.release();
        Ok(out)
    }

    /// Encodes this response's JSON object (no trailing newline) onto `buf`,
    /// the primitive the stream encoder batches over.
    pub fn encode_to(&self, buf: &mut bufferpool::Buffer) -> Result<(), serde_json::Error> {
        buf.append_str(r#"{"jsonrpc":"#);
        serde_json::to_writer(&mut *buf, &self.jsonrpc)?;
        match &self.error {
            None => {
                buf.append_str(r#","result":"#);
                match &self.result {
                    Some(result) => buf.append_str(result.get()),
                    None => buf.append_str("null"),
                }
            }
            Some(error) => {
                buf.append_str(r#","error":"#);
                serde_json::to_writer(&mut *buf, error)?;
            }
        }
        buf.append_str(r#","id":"#);
        serde_json::to_writer(&mut *buf, &self.id)?;
        buf.append_byte(b'}');
        Ok(())
    }
}

/// Failure to decode a response's `result` field.
#[derive(Debug, thiserror::Error)]
pub enum ResultDecodeError {
    /// `result` was absent — either an error response, or a bug upstream.
    #[error("response has no result to decode")]
    NilResult,
    /// `result` was present but didn't parse as the requested type.
    #[error("failed to decode result: {0}")]
    Json(#[from] serde_json::Error),
}
