//! A streaming JSON-RPC 2.0 runtime: a decoder and encoder for the wire
//! format, a namespaced method registry with composable interceptors, and a
//! concurrent dispatcher, wired together by a server loop over any duplex
//! byte stream.
//!
//! No async runtime is required — concurrency within a batch uses
//! [`std::thread::scope`], and cancellation is cooperative via [`Context`].

pub mod bufferpool;
pub mod client;
pub mod context;
pub mod dispatcher;
pub mod encode_value;
pub mod error;
pub mod handler;
pub mod id;
pub mod interceptor;
pub mod logging;
pub mod registry;
pub mod request;
pub mod response;
pub mod server;
pub mod stream_decoder;
pub mod stream_encoder;

pub use context::Context;
pub use dispatcher::Dispatcher;
pub use error::Error;
pub use id::Id;
pub use registry::Registry;
pub use request::Request;
pub use response::Response;
pub use server::serve;
pub use stream_decoder::StreamDecoder;
pub use stream_encoder::StreamEncoder;
