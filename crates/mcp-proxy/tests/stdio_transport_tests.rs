//! Spec §8 invariant 4: the stdio transport preserves write order — bytes
//! handed to `send` in order A, B appear on the child's stdin in that
//! order, each followed by a newline. Driven directly against
//! [`Transport::Stdio`] with `cat` as the child (a pure byte echo), so the
//! bytes we read back are exactly what the transport wrote to stdin.

use mcp_proxy::config::UpstreamConfig;
use mcp_proxy::upstream::transport::Transport;

#[tokio::test]
async fn send_preserves_order_across_concurrent_calls() {
    let config = UpstreamConfig::Stdio { command: "cat".to_string(), args: vec![], env: None };
    let mut transport = Transport::new(&config);
    let mut handle = transport.start().await.expect("cat spawns");

    handle.outbound.send(r#"{"jsonrpc":"2.0","method":"a","params":{}}"#.to_string()).unwrap();
    handle.outbound.send(r#"{"jsonrpc":"2.0","method":"b","params":{}}"#.to_string()).unwrap();

    let first = handle.inbound.recv().await.expect("first echoed frame");
    let second = handle.inbound.recv().await.expect("second echoed frame");

    assert_eq!(first.method.as_deref(), Some("a"));
    assert_eq!(second.method.as_deref(), Some("b"));

    transport.close().await;
}

#[tokio::test]
async fn close_terminates_the_child_process() {
    let config = UpstreamConfig::Stdio { command: "cat".to_string(), args: vec![], env: None };
    let mut transport = Transport::new(&config);
    let _handle = transport.start().await.expect("cat spawns");

    // No direct handle to the child from here (it's owned by the Stdio
    // variant); closing must not panic or hang, which is the externally
    // observable contract.
    transport.close().await;
}
