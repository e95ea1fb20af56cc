//! Serializes a slice of responses back onto a byte-oriented writer.
//!
//! One pooled buffer is acquired for the whole call: each response is
//! encoded into it, flushed through a buffered writer, and reset in turn —
//! no buffer survives past its own response.

use crate::bufferpool;
use crate::context::{Context, ContextCancelled};
use crate::response::Response;
use std::io::{BufWriter, Write};

/// A failure encoding or writing a response batch.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// Building a response's JSON failed (in practice, only reachable
    /// through pathological id state — ids and results are otherwise
    /// pre-validated by the time they reach the encoder).
    #[error("failed to encode response: {0}")]
    Json(#[from] serde_json::Error),
    /// The underlying writer failed.
    #[error("i/o error writing response stream: {0}")]
    Io(#[from] std::io::Error),
    /// The caller's context was cancelled mid-batch.
    #[error(transparent)]
    Cancelled(#[from] ContextCancelled),
}

/// Encodes response batches onto a buffered writer.
pub struct StreamEncoder<W> {
    dst: BufWriter<W>,
}

impl<W: Write> StreamEncoder<W> {
    /// Wraps `dst` in a buffered writer.
    pub fn new(dst: W) -> Self {
        StreamEncoder {
            dst: BufWriter::new(dst),
        }
    }

    /// Encodes `responses` as either a single object (`batch = false`,
    /// only the first response is ever emitted) or a `[...]` array
    /// (`batch = true`), each terminated by `\n`. An empty slice writes
    /// nothing and flushes nothing.
    pub fn encode(&mut self, responses: &[Response], batch: bool) -> Result<(), EncodeError> {
        self.encode_with_context(None, responses, batch)
    }

    /// As [`encode`](Self::encode), but checks `ctx` before each response
    /// and aborts the batch (returning [`EncodeError::Cancelled`]) as soon
    /// as it's done.
    pub fn encode_with_context(
        &mut self,
        ctx: Option<&Context>,
        responses: &[Response],
        batch: bool,
    ) -> Result<(), EncodeError> {
        if responses.is_empty() {
            return Ok(());
        }
        let responses = if batch { responses } else { &responses[..1] };

        let mut buf = bufferpool::get();
        let result: Result<(), EncodeError> = (|| {
            let last = responses.len() - 1;
            if batch {
                buf.append_byte(b'[');
            }
            for (i, resp) in responses.iter().enumerate() {
                if let Some(ctx) = ctx {
                    ctx.check()?;
                }
                resp.encode_to(&mut buf)?;
                if batch {
                    buf.append_byte(if i != last { b',' } else { b']' });
                    if i == last {
                        buf.append_byte(b'\n');
                    }
                } else {
                    buf.append_byte(b'\n');
                }
                self.dst.write_all(buf.as_bytes())?;
                buf.reset();
            }
            Ok(())
        })();
        buf.release();
        result?;
        self.dst.flush()?;
        Ok(())
    }

    /// Writes a single `\n`, the keep-alive emitted when a dispatch
    /// produced no sendable responses at all.
    pub fn write_keepalive(&mut self) -> Result<(), EncodeError> {
        self.dst.write_all(b"\n")?;
        self.dst.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Id;

    #[test]
    fn empty_slice_writes_nothing() {
        let mut enc = StreamEncoder::new(Vec::new());
        enc.encode(&[], false).unwrap();
        assert!(enc.dst.get_ref().is_empty());
    }

    #[test]
    fn unary_emits_only_first_response() {
        let mut enc = StreamEncoder::new(Vec::new());
        let responses = vec![
            Response::success(&1i64, Id::from(1i64)).unwrap(),
            Response::success(&2i64, Id::from(2i64)).unwrap(),
        ];
        enc.encode(&responses, false).unwrap();
        let out = String::from_utf8(enc.dst.into_inner().unwrap()).unwrap();
        assert_eq!(out, "{\"jsonrpc\":\"2.0\",\"result\":1,\"id\":1}\n");
    }

    #[test]
    fn batch_wraps_in_brackets_comma_separated() {
        let mut enc = StreamEncoder::new(Vec::new());
        let responses = vec![
            Response::success(&1i64, Id::from(1i64)).unwrap(),
            Response::success(&2i64, Id::from(2i64)).unwrap(),
        ];
        enc.encode(&responses, true).unwrap();
        let out = String::from_utf8(enc.dst.into_inner().unwrap()).unwrap();
        assert_eq!(
            out,
            "[{\"jsonrpc\":\"2.0\",\"result\":1,\"id\":1},{\"jsonrpc\":\"2.0\",\"result\":2,\"id\":2}]\n"
        );
    }

    #[test]
    fn cancelled_context_aborts_mid_batch() {
        let mut enc = StreamEncoder::new(Vec::new());
        let responses = vec![
            Response::success(&1i64, Id::from(1i64)).unwrap(),
            Response::success(&2i64, Id::from(2i64)).unwrap(),
        ];
        let ctx = Context::new();
        ctx.cancel();
        let err = enc.encode_with_context(Some(&ctx), &responses, true).unwrap_err();
        assert!(matches!(err, EncodeError::Cancelled(_)));
    }

    #[test]
    fn keepalive_writes_single_newline() {
        let mut enc = StreamEncoder::new(Vec::new());
        enc.write_keepalive().unwrap();
        assert_eq!(enc.dst.into_inner().unwrap(), b"\n");
    }
}
