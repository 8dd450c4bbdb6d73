//! Spec §8 invariant 5: decode failures never interrupt an inbound loop —
//! the loop continues with the next frame. Driven against `cat` as a pure
//! echo, so a malformed line bounces back unchanged and must be silently
//! dropped by the transport's own JSON decoding, while a later well-formed
//! line is still delivered.

use mcp_proxy::config::UpstreamConfig;
use mcp_proxy::upstream::transport::Transport;

#[tokio::test]
async fn malformed_frame_is_dropped_without_killing_the_inbound_loop() {
    let config = UpstreamConfig::Stdio { command: "cat".to_string(), args: vec![], env: None };
    let mut transport = Transport::new(&config);
    let mut handle = transport.start().await.expect("cat spawns");

    handle.outbound.send("not valid json at all {{{".to_string()).unwrap();
    handle.outbound.send(r#"{"jsonrpc":"2.0","method":"still_alive","params":{}}"#.to_string()).unwrap();

    let msg = handle.inbound.recv().await.expect("the valid frame after the bad one still arrives");
    assert_eq!(msg.method.as_deref(), Some("still_alive"));

    transport.close().await;
}

#[tokio::test]
async fn partial_line_at_eof_is_discarded_not_parsed() {
    // `printf` (no trailing newline) exits immediately after writing,
    // leaving an unterminated line for the reader to hit EOF on.
    let config = UpstreamConfig::Stdio {
        command: "printf".to_string(),
        args: vec![r#"{"jsonrpc":"2.0","method":"never_arrives","params":{}}"#.to_string()],
        env: None,
    };
    let mut transport = Transport::new(&config);
    let mut handle = transport.start().await.expect("printf spawns");

    // The inbound channel must close (EOF) without ever yielding the
    // partial, newline-less line as a message.
    assert!(handle.inbound.recv().await.is_none());

    transport.close().await;
}

#[tokio::test]
async fn multiple_malformed_frames_in_a_row_are_all_dropped() {
    let config = UpstreamConfig::Stdio { command: "cat".to_string(), args: vec![], env: None };
    let mut transport = Transport::new(&config);
    let mut handle = transport.start().await.expect("cat spawns");

    handle.outbound.send("{broken".to_string()).unwrap();
    handle.outbound.send("[1, 2,".to_string()).unwrap();
    handle.outbound.send("".to_string()).unwrap();
    handle.outbound.send(r#"{"jsonrpc":"2.0","method":"survivor","params":{}}"#.to_string()).unwrap();

    let msg = handle.inbound.recv().await.expect("the one valid frame arrives");
    assert_eq!(msg.method.as_deref(), Some("survivor"));

    transport.close().await;
}
