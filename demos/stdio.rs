//! A minimal stdio JSON-RPC server: registers a `ping` method and serves
//! requests read from stdin, with responses written to stdout.
//!
//! Run it and type a request on one line:
//!
//! ```text
//! $ echo '{"jsonrpc":"2.0","method":"ping","id":1}' | cargo run --example stdio
//! {"jsonrpc":"2.0","result":"pong","id":1}
//! ```

use jsonrpc_runtime::context::Context;
use jsonrpc_runtime::dispatcher::Dispatcher;
use jsonrpc_runtime::handler::HandlerResult;
use jsonrpc_runtime::interceptor::RequestInfo;
use jsonrpc_runtime::registry::Registry;
use jsonrpc_runtime::serve;
use serde_json::value::RawValue;
use std::io::Write;

fn ping(
    _ctx: &Context,
    _params: Option<&RawValue>,
    _info: &RequestInfo,
) -> HandlerResult {
    Ok(RawValue::from_string("\"pong\"".to_string()).unwrap())
}

fn main() {
    let registry = Registry::new();
    registry
        .register("ping", ping, None::<&str>, None::<&str>)
        .expect("registering ping must succeed");

    let dispatcher = Dispatcher::new(registry);
    let ctx = Context::new();

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    eprintln!("jsonrpc-runtime stdio demo: listening on stdin, writing to stdout");

    if let Err(e) = serve(stdin.lock(), stdout.lock(), &dispatcher, &ctx) {
        eprintln!("server loop ended with error: {e}");
        std::process::exit(1);
    }
    std::io::stdout().flush().ok();
}
