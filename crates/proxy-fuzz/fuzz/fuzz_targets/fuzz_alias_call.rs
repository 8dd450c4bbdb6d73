#![no_main]

use libfuzzer_sys::fuzz_target;
use mcp_proxy::Aggregator;

// The alias an inbound `tools/call` names is untrusted input looked up
// straight against the registry — no hex validation gates
// it first. Arbitrary alias text, against a registry with nothing
// registered, must always resolve to the `UnknownAlias` error envelope and
// never panic, regardless of byte content or length.
fuzz_target!(|data: &[u8]| {
    let alias = String::from_utf8_lossy(data);
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    runtime.block_on(async {
        let aggregator = Aggregator::new();
        let result = aggregator.call(&alias, serde_json::Value::Null).await;
        assert!(result.get("error").is_some());
    });
});
