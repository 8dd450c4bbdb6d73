#![no_main]

use libfuzzer_sys::fuzz_target;
use mcp_proxy::jsonrpc::InboundMessage;

// Every line read off a stdio upstream, and every `message` event's data
// off an SSE upstream, is decoded as an `InboundMessage` first, with the
// same inbound rule unified across both transports. Decode failures
// must be dropped by the caller, not panic the inbound loop.
fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<InboundMessage>(data);
});
