// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Replay client for the remote service.
//!
//! Sends one record at a time and waits for the answer carrying the same
//! sequence number. Anything that goes wrong below the protocol (connect
//! failure, closed socket, timeout) comes back as a `network` rejection, so
//! the coordinator only ever sees typed outcomes.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use ebb_core::protocol::{ClientMessage, ServerMessage};
use ebb_core::{Rejection, RejectionKind, ReplayAck, ReplayRequest};

use super::transport::{Transport, TransportError, TransportResult, WebSocketTransport};
use crate::config::RemoteConfig;
use crate::network::Probe;

/// The remote service as the coordinator sees it.
pub trait Remote: Send {
    /// Applies one queued mutation.
    fn replay(
        &mut self,
        request: ReplayRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ReplayAck, Rejection>> + Send + '_>>;
}

/// Configuration for the replay client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub token: Option<String>,
    /// How long to wait for the answer to one replay.
    pub request_timeout: Duration,
}

impl From<&RemoteConfig> for ClientConfig {
    fn from(remote: &RemoteConfig) -> Self {
        ClientConfig {
            url: remote.url.clone(),
            token: remote.token.clone(),
            request_timeout: Duration::from_millis(remote.request_timeout_ms),
        }
    }
}

/// Replays records over a [`Transport`], connecting lazily.
pub struct ReplayClient<T: Transport = WebSocketTransport> {
    config: ClientConfig,
    transport: T,
    next_seq: u64,
}

impl ReplayClient<WebSocketTransport> {
    /// Creates a client for the configured remote.
    pub fn new(remote: &RemoteConfig) -> Self {
        let transport = WebSocketTransport::new(Duration::from_millis(remote.connect_timeout_ms));
        ReplayClient::with_transport(ClientConfig::from(remote), transport)
    }
}

impl<T: Transport> ReplayClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        ReplayClient { config, transport, next_seq: 1 }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub async fn connect(&mut self) -> TransportResult<()> {
        if !self.transport.is_connected() {
            debug!(url = %self.config.url, "connecting");
            self.transport.connect(&self.config.url).await?;
        }
        Ok(())
    }

    /// Round-trips a ping and returns the elapsed time.
    pub async fn ping(&mut self) -> TransportResult<Duration> {
        self.connect().await?;
        let id = self.take_seq();
        let started = Instant::now();
        self.transport.send(ClientMessage::ping(id)).await?;

        let timeout = self.config.request_timeout;
        let answer = tokio::time::timeout(timeout, async {
            loop {
                match self.transport.recv().await? {
                    Some(ServerMessage::Pong { id: echoed }) if echoed == id => return Ok(()),
                    Some(other) => debug!(?other, "ignoring message while waiting for pong"),
                    None => return Err(TransportError::ConnectionClosed),
                }
            }
        })
        .await;

        match answer {
            Ok(result) => result.map(|()| started.elapsed()),
            Err(_) => {
                self.drop_connection().await;
                Err(TransportError::Timeout(timeout))
            }
        }
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Closes the connection so a late answer cannot be mistaken for the
    /// next one.
    async fn drop_connection(&mut self) {
        if let Err(e) = self.transport.disconnect().await {
            debug!(error = %e, "disconnect failed");
        }
    }

    async fn exchange(&mut self, request: ReplayRequest) -> TransportResult<ServerMessage> {
        self.connect().await?;
        let seq = self.take_seq();
        let msg = ClientMessage::replay(seq, self.config.token.clone(), request);
        self.transport.send(msg).await?;

        let timeout = self.config.request_timeout;
        let answer = tokio::time::timeout(timeout, async {
            loop {
                match self.transport.recv().await? {
                    Some(msg @ ServerMessage::Error { .. }) => return Ok(msg),
                    Some(msg) if msg.seq() == Some(seq) => return Ok(msg),
                    Some(other) => debug!(?other, seq, "ignoring unrelated message"),
                    None => return Err(TransportError::ConnectionClosed),
                }
            }
        })
        .await;

        match answer {
            Ok(result) => result,
            Err(_) => {
                self.drop_connection().await;
                Err(TransportError::Timeout(timeout))
            }
        }
    }
}

/// Probes the remote with a protocol ping over a dedicated connection.
///
/// Unlike a TCP connect, a pong proves the service itself answers, and the
/// round trip includes its processing time.
pub struct PingProbe<T: Transport = WebSocketTransport> {
    client: Mutex<ReplayClient<T>>,
}

impl PingProbe<WebSocketTransport> {
    pub fn new(remote: &RemoteConfig) -> Self {
        PingProbe::with_client(ReplayClient::new(remote))
    }
}

impl<T: Transport> PingProbe<T> {
    pub fn with_client(client: ReplayClient<T>) -> Self {
        PingProbe { client: Mutex::new(client) }
    }
}

impl<T: Transport> Probe for PingProbe<T> {
    fn probe(&self) -> Pin<Box<dyn Future<Output = Option<Duration>> + Send + '_>> {
        Box::pin(async move {
            let mut client = self.client.lock().await;
            match client.ping().await {
                Ok(rtt) => Some(rtt),
                Err(e) => {
                    debug!(url = %client.config.url, error = %e, "ping failed");
                    // Reconnect on the next probe.
                    if client.is_connected() {
                        client.drop_connection().await;
                    }
                    None
                }
            }
        })
    }
}

impl<T: Transport> Remote for ReplayClient<T> {
    fn replay(
        &mut self,
        request: ReplayRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ReplayAck, Rejection>> + Send + '_>> {
        Box::pin(async move {
            let record_id = request.record_id.clone();
            match self.exchange(request).await {
                Ok(ServerMessage::Replayed { ack, .. }) => Ok(ack),
                Ok(ServerMessage::Rejected { rejection, .. }) => Err(rejection),
                Ok(ServerMessage::Error { message }) => {
                    warn!(id = %record_id, %message, "remote reported an error");
                    Err(Rejection::new(RejectionKind::Server, message))
                }
                Ok(ServerMessage::Pong { .. }) => {
                    Err(Rejection::new(RejectionKind::Server, "unexpected pong"))
                }
                Err(e) => {
                    debug!(id = %record_id, error = %e, "replay did not reach the remote");
                    Err(Rejection::new(RejectionKind::Network, e.to_string()))
                }
            }
        })
    }
}
