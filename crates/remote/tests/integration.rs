// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the ebb-remote server binary.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::process::{Child, Command, Stdio};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Helper to spawn a server process and clean it up on drop.
struct ServerProcess {
    child: Child,
    port: u16,
    _temp_dir: tempfile::TempDir,
}

impl ServerProcess {
    fn spawn() -> Self {
        let temp_dir = tempfile::tempdir().expect("create temp dir");

        // Use a port range that's less likely to conflict
        let port = 49152 + (std::process::id() % 1000) as u16;

        let child = Command::new(env!("CARGO_BIN_EXE_ebb-remote"))
            .arg("--bind")
            .arg(format!("127.0.0.1:{}", port))
            .arg("--data")
            .arg(temp_dir.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn server process");

        ServerProcess { child, port, _temp_dir: temp_dir }
    }

    fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[tokio::test]
async fn server_lifecycle() {
    let server = ServerProcess::spawn();

    // CI runners can be slow, so retry the connection generously
    let mut ws_stream = None;
    for _ in 0..20 {
        if let Ok(Ok((stream, _))) =
            tokio::time::timeout(Duration::from_millis(500), connect_async(&server.ws_url())).await
        {
            ws_stream = Some(stream);
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    let ws_stream = ws_stream.expect("should connect to server within retries");
    let (mut sink, mut stream) = ws_stream.split();

    let replay = serde_json::json!({
        "type": "replay",
        "seq": 5,
        "request": {
            "record_id": "op-1",
            "resource_type": "todo",
            "resource_id": "todo-1",
            "action": "create",
            "payload": {"title": "A"},
            "clock": {"dev1": 1}
        }
    });
    sink.send(Message::Text(replay.to_string().into())).await.expect("send replay");

    let response = tokio::time::timeout(Duration::from_secs(5), stream.next()).await;
    match response {
        Ok(Some(Ok(Message::Text(text)))) => {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["type"], "replayed");
            assert_eq!(value["seq"], 5);
        }
        other => panic!("Expected replayed, got {:?}", other),
    }
}
