//! Test helpers for integration tests
//!
//! Provides utilities for spawning test gateways, connecting WebSocket
//! clients, and waiting on gateway events.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, Response};
use serde_json::Value;
use stream_common::GatewayConfig;
use stream_gateway::events::GatewayEvent;
use stream_gateway::handlers::{EventRouter, LoggingChunkConsumer};
use stream_gateway::protocol::ServerMessage;
use stream_gateway::StreamGateway;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Upper bound on any single wait in a test
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Heartbeat interval used unless a test asks for another
pub const DEFAULT_TEST_HEARTBEAT_MS: u64 = 30_000;

/// Test gateway instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub gateway: StreamGateway,
    _handles: Vec<JoinHandle<()>>,
}

impl TestServer {
    /// Start a new test gateway
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config(DEFAULT_TEST_HEARTBEAT_MS)).await
    }

    /// Start a test gateway probing every `interval_ms`
    pub async fn start_with_heartbeat(interval_ms: u64) -> Result<Self> {
        Self::start_with_config(test_config(interval_ms)).await
    }

    /// Start a test gateway with custom config
    pub async fn start_with_config(config: GatewayConfig) -> Result<Self> {
        let listener = stream_gateway::bind(&config.server).await?;
        let addr = listener.local_addr()?;

        let gateway = StreamGateway::new(config);

        let router = EventRouter::new(gateway.dispatcher().clone(), Arc::new(LoggingChunkConsumer))
            .spawn(gateway.subscribe());
        let heartbeat = gateway.spawn_heartbeat();

        let serving = gateway.clone();
        let server = tokio::spawn(async move {
            stream_gateway::serve(listener, serving).await.ok();
        });

        let client = Client::builder().timeout(TEST_TIMEOUT).build()?;

        Ok(Self {
            addr,
            client,
            gateway,
            _handles: vec![router, heartbeat, server],
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// WebSocket URL for `path`
    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Connect a client to `path` and consume its welcome message
    pub async fn connect(&self, path: &str) -> Result<(WsClient, Welcome)> {
        let mut client = WsClient::connect(&self.ws_url(path)).await?;
        let welcome = client.recv_welcome().await?;
        Ok((client, welcome))
    }

    /// Wait until the gateway tracks exactly `count` connections
    pub async fn wait_for_connections(&self, count: usize) -> Result<()> {
        let registry = self.gateway.registry();
        wait_until(|| registry.connection_count() == count)
            .await
            .with_context(|| format!("expected {count} connections"))
    }
}

/// Create a test configuration on an ephemeral loopback port
pub fn test_config(heartbeat_interval_ms: u64) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.heartbeat.interval_ms = heartbeat_interval_ms;
    config
}

/// Fields of the handshake message
#[derive(Debug, Clone)]
pub struct Welcome {
    pub connection_id: String,
    pub session_id: String,
}

/// WebSocket test client
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Open a connection without reading anything
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = tokio::time::timeout(TEST_TIMEOUT, connect_async(url))
            .await
            .context("connect timed out")??;
        Ok(Self { stream })
    }

    /// Send a text frame
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Send a JSON value as a text frame
    pub async fn send_json(&mut self, value: &Value) -> Result<()> {
        self.send_text(value.to_string()).await
    }

    /// Send a binary frame
    pub async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.stream.send(Message::Binary(bytes)).await?;
        Ok(())
    }

    /// Close with a normal closure code
    pub async fn close(&mut self) -> Result<()> {
        self.stream
            .close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "done".into(),
            }))
            .await?;
        Ok(())
    }

    /// Next frame, or `None` once the stream ends
    pub async fn next_message(&mut self) -> Result<Option<Message>> {
        match tokio::time::timeout(TEST_TIMEOUT, self.stream.next()).await {
            Ok(Some(message)) => Ok(Some(message?)),
            Ok(None) => Ok(None),
            Err(_) => bail!("timed out waiting for a message"),
        }
    }

    /// Next text frame parsed as JSON, skipping pings
    pub async fn recv_json(&mut self) -> Result<Value> {
        loop {
            match self.next_message().await? {
                Some(Message::Text(text)) => return Ok(serde_json::from_str(&text)?),
                Some(Message::Ping(_) | Message::Pong(_)) => continue,
                Some(other) => bail!("expected text frame, got {other:?}"),
                None => bail!("stream ended"),
            }
        }
    }

    /// Read the welcome handshake
    pub async fn recv_welcome(&mut self) -> Result<Welcome> {
        let value = self.recv_json().await?;
        match ServerMessage::from_json(&value.to_string())? {
            ServerMessage::Welcome {
                connection_id,
                session_id,
                ..
            } => Ok(Welcome {
                connection_id,
                session_id,
            }),
            other => bail!("expected welcome, got {other}"),
        }
    }

    /// Read until a close frame arrives and return its code and reason
    pub async fn expect_close(&mut self) -> Result<(u16, String)> {
        loop {
            match self.next_message().await? {
                Some(Message::Close(Some(frame))) => {
                    return Ok((u16::from(frame.code), frame.reason.into_owned()));
                }
                Some(Message::Close(None)) => bail!("close frame without a code"),
                Some(_) => continue,
                None => bail!("stream ended without a close frame"),
            }
        }
    }

    /// Assert no text frame arrives within `window`
    pub async fn expect_silence(&mut self, window: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + window;
        loop {
            match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Err(_) => return Ok(()),
                Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
                Ok(Some(Ok(message))) => bail!("unexpected message {message:?}"),
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(None) => bail!("stream ended"),
            }
        }
    }

    /// Keep reading in the background so pings are answered
    pub fn spawn_reader(mut self) -> JoinHandle<Vec<Message>> {
        tokio::spawn(async move {
            let mut received = Vec::new();
            while let Some(Ok(message)) = self.stream.next().await {
                received.push(message);
            }
            received
        })
    }
}

/// Wait for the first event matching `select`
pub async fn next_event<T>(
    events: &mut broadcast::Receiver<GatewayEvent>,
    mut select: impl FnMut(GatewayEvent) -> Option<T>,
) -> Result<T> {
    let wait = async {
        loop {
            let event = events.recv().await?;
            if let Some(found) = select(event) {
                return Ok::<T, anyhow::Error>(found);
            }
        }
    };

    tokio::time::timeout(TEST_TIMEOUT, wait)
        .await
        .context("timed out waiting for event")?
}

/// Poll `condition` until it holds
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> Result<()> {
    let deadline = tokio::time::Instant::now() + TEST_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    bail!("condition not met within {TEST_TIMEOUT:?}")
}
