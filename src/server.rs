//! The decode → dispatch → encode loop over a duplex byte stream.
//!
//! One decoder and one encoder wrap the stream, and the loop runs until the
//! decoder reports a clean EOF. A connection is served on whatever thread
//! calls [`serve`] — no async runtime involved, so a caller that wants
//! concurrent connections spawns one `std::thread` per connection itself.

use crate::context::Context;
use crate::dispatcher::Dispatcher;
use crate::logging;
use crate::stream_decoder::{DecodeError, StreamDecoder};
use crate::stream_encoder::{EncodeError, StreamEncoder};
use std::io::{BufRead, Write};

/// A failure serving a connection to completion.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// Decoding the request stream failed (other than clean EOF, which
    /// [`serve`] treats as ordinary shutdown rather than an error).
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Dispatch was aborted by context cancellation.
    #[error(transparent)]
    Dispatch(#[from] crate::dispatcher::DispatchError),
    /// Encoding or writing a response batch failed.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Serves one connection: decode a request (or batch), dispatch it against
/// `registry` via `dispatcher`, encode the result, repeat until the peer
/// closes the read end.
///
/// Returns `Ok(())` on clean EOF. Any other decode error, a dispatch
/// cancellation, or an encode failure ends the loop and is returned to the
/// caller; the transport is left in an unspecified state and should be
/// closed.
pub fn serve<R, W>(reader: R, writer: W, dispatcher: &Dispatcher, ctx: &Context) -> Result<(), ServeError>
where
    R: BufRead,
    W: Write,
{
    let mut decoder = StreamDecoder::from_buf_reader(reader);
    let mut encoder = StreamEncoder::new(writer);

    loop {
        let (requests, batch) = match decoder.decode_with_context(ctx) {
            Ok(decoded) => decoded,
            Err(DecodeError::Eof) => {
                logging::log("jsonrpc-runtime: connection closed, shutting down server loop");
                return Ok(());
            }
            Err(e) => {
                logging::log(&format!("jsonrpc-runtime: decode error, ending server loop: {e}"));
                return Err(e.into());
            }
        };

        let responses = dispatcher.execute(ctx, &requests, batch)?;
        if responses.is_empty() {
            encoder.write_keepalive()?;
        } else {
            encoder.encode_with_context(Some(ctx), &responses, batch)?;
        }
    }
}
