// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test server utilities and WebSocket-level tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use ebb_core::{Action, ClientMessage, RejectionKind, ReplayRequest, ServerMessage, VectorClock};

use crate::server;
use crate::state::{ServerOptions, ServerState};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A server on a random port, stopped on `shutdown` or drop.
struct TestServer {
    addr: SocketAddr,
    _shutdown_tx: oneshot::Sender<()>,
}

impl TestServer {
    async fn start(options: ServerOptions) -> Self {
        let state = ServerState::in_memory(options);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            tokio::select! {
                result = server::serve(listener, state) => {
                    if let Err(e) = result {
                        eprintln!("Test server error: {}", e);
                    }
                }
                _ = shutdown_rx => {}
            }
        });

        TestServer { addr, _shutdown_tx: shutdown_tx }
    }

    async fn connect(&self) -> (SplitSink<Ws, Message>, SplitStream<Ws>) {
        let (ws, _) = connect_async(format!("ws://{}", self.addr)).await.unwrap();
        ws.split()
    }
}

async fn roundtrip(
    sink: &mut SplitSink<Ws, Message>,
    stream: &mut SplitStream<Ws>,
    msg: &ClientMessage,
) -> ServerMessage {
    sink.send(Message::Text(msg.to_json().unwrap().into())).await.unwrap();
    match tokio::time::timeout(Duration::from_secs(5), stream.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => ServerMessage::from_json(&text).unwrap(),
        other => panic!("expected a text frame, got {:?}", other),
    }
}

fn replay(seq: u64, record_id: &str, device: &str, counter: u64) -> ClientMessage {
    let mut clock = VectorClock::new();
    clock.set(device, counter);
    ClientMessage::replay(
        seq,
        None,
        ReplayRequest {
            record_id: record_id.into(),
            resource_type: "todo".into(),
            resource_id: "todo-1".into(),
            action: Action::Update,
            payload: json!({"by": device}),
            clock,
        },
    )
}

#[tokio::test]
async fn ping_pong() {
    let server = TestServer::start(ServerOptions::default()).await;
    let (mut sink, mut stream) = server.connect().await;

    let response = roundtrip(&mut sink, &mut stream, &ClientMessage::ping(42)).await;
    assert_eq!(response, ServerMessage::pong(42));
}

#[tokio::test]
async fn replay_answers_with_the_same_seq() {
    let server = TestServer::start(ServerOptions::default()).await;
    let (mut sink, mut stream) = server.connect().await;

    let response = roundtrip(&mut sink, &mut stream, &replay(7, "op-1", "dev1", 1)).await;
    match response {
        ServerMessage::Replayed { seq, ack } => {
            assert_eq!(seq, 7);
            assert!(ack.server_id.is_some());
        }
        other => panic!("expected replayed, got {:?}", other),
    }
}

#[tokio::test]
async fn concurrent_writers_see_a_conflict() {
    let server = TestServer::start(ServerOptions::default()).await;
    let (mut sink1, mut stream1) = server.connect().await;
    let (mut sink2, mut stream2) = server.connect().await;

    let first = roundtrip(&mut sink1, &mut stream1, &replay(1, "op-a", "dev1", 1)).await;
    assert!(matches!(first, ServerMessage::Replayed { .. }));

    let second = roundtrip(&mut sink2, &mut stream2, &replay(1, "op-b", "dev2", 1)).await;
    match second {
        ServerMessage::Rejected { rejection, .. } => {
            assert_eq!(rejection.kind, RejectionKind::Conflict);
            assert_eq!(rejection.remote.unwrap().payload, json!({"by": "dev1"}));
        }
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_frame_gets_an_error() {
    let server = TestServer::start(ServerOptions::default()).await;
    let (mut sink, mut stream) = server.connect().await;

    sink.send(Message::Text("{not json".into())).await.unwrap();
    match tokio::time::timeout(Duration::from_secs(5), stream.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => {
            let msg = ServerMessage::from_json(&text).unwrap();
            assert!(matches!(msg, ServerMessage::Error { .. }));
        }
        other => panic!("expected error frame, got {:?}", other),
    }

    // The connection stays usable.
    let response = roundtrip(&mut sink, &mut stream, &ClientMessage::ping(1)).await;
    assert_eq!(response, ServerMessage::pong(1));
}

#[tokio::test]
async fn handle_client_message_checks_the_token() {
    let state = ServerState::in_memory(ServerOptions { token: Some("t".into()), ..ServerOptions::default() });
    let text = replay(3, "op-1", "dev1", 1).to_json().unwrap();

    match server::handle_client_message(&text, &state).await {
        ServerMessage::Rejected { seq, rejection } => {
            assert_eq!(seq, 3);
            assert_eq!(rejection.kind, RejectionKind::Unauthorized);
        }
        other => panic!("expected unauthorized, got {:?}", other),
    }
}
