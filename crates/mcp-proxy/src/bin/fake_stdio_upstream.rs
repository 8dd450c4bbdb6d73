//! A minimal, configurable MCP stdio server used only as a test fixture by
//! `tests/*.rs` (spawned via `CARGO_BIN_EXE_fake_stdio_upstream`). Not part
//! of the public crate surface.
//!
//! Speaks newline-delimited JSON-RPC on stdin/stdout: answers `tools/list`
//! with one configurable tool, answers `tools/call` with the original tool
//! name and arguments it received (so tests can assert the alias was
//! resolved before the request reached here), and silently drops anything
//! without an `id` (the `initialize`/`notifications/initialized` handshake
//! notifications never expect a reply).

use std::io::{self, BufRead, Write};
use std::time::Duration;

fn main() {
    let mut tool_names = Vec::new();
    let mut call_delay_ms: u64 = 0;
    let mut never_reply_to_call = false;
    let mut drop_first_n_calls: u32 = 0;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--tool-name" => {
                tool_names.push(args.next().expect("--tool-name requires a value"));
            }
            "--call-delay-ms" => {
                call_delay_ms = args
                    .next()
                    .expect("--call-delay-ms requires a value")
                    .parse()
                    .expect("--call-delay-ms must be an integer");
            }
            "--never-reply-to-call" => never_reply_to_call = true,
            "--drop-first-n-calls" => {
                drop_first_n_calls = args
                    .next()
                    .expect("--drop-first-n-calls requires a value")
                    .parse()
                    .expect("--drop-first-n-calls must be an integer");
            }
            other => panic!("fake_stdio_upstream: unrecognized flag {other}"),
        }
    }
    if tool_names.is_empty() {
        tool_names.push("add".to_string());
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut calls_seen: u32 = 0;

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let Ok(msg) = serde_json::from_str::<serde_json::Value>(&line) else {
            // Decode failures are dropped, matching the proxy's own transport contract.
            continue;
        };

        let id = msg.get("id").cloned();
        let method = msg.get("method").and_then(serde_json::Value::as_str).unwrap_or_default();

        match (id, method) {
            (Some(id), "tools/list") => {
                let tools: Vec<_> = tool_names
                    .iter()
                    .map(|name| serde_json::json!({"name": name, "description": "a fixture tool"}))
                    .collect();
                let response = serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {"tools": tools},
                });
                write_line(&mut stdout, &response);
            }
            (Some(id), "tools/call") => {
                calls_seen += 1;
                if never_reply_to_call || calls_seen <= drop_first_n_calls {
                    continue;
                }
                if call_delay_ms > 0 {
                    std::thread::sleep(Duration::from_millis(call_delay_ms));
                }
                let params = msg.get("params").cloned().unwrap_or(serde_json::Value::Null);
                let response = serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {
                        "receivedName": params.get("name").cloned().unwrap_or(serde_json::Value::Null),
                        "arguments": params.get("arguments").cloned().unwrap_or(serde_json::Value::Null),
                    },
                });
                write_line(&mut stdout, &response);
            }
            _ => {
                // Notification (no id) or unrecognized method: no reply.
            }
        }
    }
}

fn write_line(stdout: &mut impl Write, value: &serde_json::Value) {
    let _ = writeln!(stdout, "{value}");
    let _ = stdout.flush();
}
