//! A calculator service driven entirely in-process: requests are encoded,
//! run through the decoder/dispatcher/encoder pipeline exactly as a real
//! connection would, and the responses are matched back to their calls via
//! [`jsonrpc_runtime::client::PendingCalls`]. No socket or pipe is involved —
//! see `src/client.rs` for why that's out of scope here.

use jsonrpc_runtime::client::{IdGenerator, PendingCalls};
use jsonrpc_runtime::context::Context;
use jsonrpc_runtime::dispatcher::Dispatcher;
use jsonrpc_runtime::encode_value::{self, Json};
use jsonrpc_runtime::error::Error;
use jsonrpc_runtime::handler::{Handler, HandlerResult};
use jsonrpc_runtime::interceptor::{BoxInterceptor, RequestInfo};
use jsonrpc_runtime::logging;
use jsonrpc_runtime::registry::Registry;
use jsonrpc_runtime::request::Request;
use jsonrpc_runtime::response::Response;
use jsonrpc_runtime::stream_decoder::StreamDecoder;
use jsonrpc_runtime::stream_encoder::StreamEncoder;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::io::Cursor;
use std::sync::Arc;

#[derive(Deserialize)]
struct BinaryOp {
    a: f64,
    b: f64,
}

#[derive(Serialize)]
struct Sum {
    result: f64,
}

fn decode_params<T: for<'de> Deserialize<'de>>(params: Option<&RawValue>) -> Result<T, Error> {
    let Some(params) = params else {
        return Err(Error::invalid_params("missing params"));
    };
    serde_json::from_str(params.get()).map_err(|e| Error::invalid_params(format!("invalid params: {e}")))
}

fn add(_ctx: &Context, params: Option<&RawValue>, _info: &RequestInfo) -> HandlerResult {
    let op: BinaryOp = decode_params(params)?;
    encode_value::encode(&Json(Sum { result: op.a + op.b })).map_err(Error::internal_error)
}

fn divide(_ctx: &Context, params: Option<&RawValue>, _info: &RequestInfo) -> HandlerResult {
    let op: BinaryOp = decode_params(params)?;
    if op.b == 0.0 {
        return Err(Error::invalid_params("division by zero"));
    }
    encode_value::encode(&Json(Sum { result: op.a / op.b })).map_err(Error::internal_error)
}

/// Logs every call's full method name before it runs.
fn logging_interceptor(
    ctx: &Context,
    params: Option<&RawValue>,
    info: &RequestInfo,
    next: &dyn Handler,
) -> HandlerResult {
    logging::log(&format!("calculator: calling {}", info.method_full_name));
    next.call(ctx, params, info)
}

fn main() {
    let registry = Registry::new();
    registry.namespace("calculator", |ns| {
        ns.with([Arc::new(logging_interceptor) as BoxInterceptor]);
        ns.register("add", add, Some("BinaryOp"), Some("Sum")).unwrap();
        ns.register("divide", divide, Some("BinaryOp"), Some("Sum")).unwrap();
    });

    let dispatcher = Dispatcher::new(registry);
    let ctx = Context::new();
    let ids = IdGenerator::new();
    let pending = PendingCalls::new();

    let add_id = ids.next();
    let add_call = pending.register(add_id.clone());
    let add_req =
        Request::new("calculator.add", Some(&serde_json::json!({"a": 2.0, "b": 3.0})), add_id).unwrap();

    let divide_id = ids.next();
    let divide_call = pending.register(divide_id.clone());
    let divide_req = Request::new(
        "calculator.divide",
        Some(&serde_json::json!({"a": 1.0, "b": 0.0})),
        divide_id,
    )
    .unwrap();

    let wire = encode_batch(&[add_req, divide_req]);

    let mut decoder = StreamDecoder::from_buf_reader(Cursor::new(wire));
    let (requests, batch) = decoder.decode().expect("decode the batch we just encoded");
    let responses = dispatcher
        .execute(&ctx, &requests, batch)
        .expect("dispatch is not cancelled");

    let mut out = Vec::new();
    StreamEncoder::new(&mut out).encode(&responses, batch).unwrap();
    eprintln!("wire response: {}", String::from_utf8_lossy(&out));

    for resp in responses {
        pending.complete(resp);
    }

    let sum = add_call.wait().expect("add response arrives");
    println!("2 + 3 = {}", sum.decode_result::<Sum>().unwrap().result);

    let divide_resp: Response = divide_call.wait().expect("divide response arrives");
    match &divide_resp.error {
        Some(e) => println!("1 / 0 failed as expected: {}", e.message()),
        None => println!("1 / 0 = {}", divide_resp.decode_result::<Sum>().unwrap().result),
    }
}

fn encode_batch(requests: &[Request]) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(b'[');
    for (i, req) in requests.iter().enumerate() {
        if i != 0 {
            out.push(b',');
        }
        out.extend_from_slice(&serde_json::to_vec(req).unwrap());
    }
    out.push(b']');
    out
}
