#![no_main]

use libfuzzer_sys::fuzz_target;
use mcp_proxy::jsonrpc::JsonRpcRequest;

// `messages_handler` decodes the raw POST body as a
// `JsonRpcRequest` before ever looking at it; a malformed body must decode
// to `Err`, never panic.
fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<JsonRpcRequest>(data);
});
