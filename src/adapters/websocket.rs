//! Persistent WebSocket command channel to the game server.
//!
//! `Disconnected -> Connecting -> Connected -> Disconnected -> ...` with a
//! reconnect scheduled after every drop or failed attempt. The client never
//! gives up.

use crate::core::scheduler::ReconnectPolicy;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{self, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct WsTransport {
    url: String,
    state: ConnectionState,
    writer: Option<SplitSink<WsStream, Message>>,
    reader: Option<SplitStream<WsStream>>,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    failures: u32,
    reconnect_at: Option<Instant>,
}

impl WsTransport {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            state: ConnectionState::Disconnected,
            writer: None,
            reader: None,
            policy,
            connect_timeout,
            failures: 0,
            reconnect_at: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// When the next connection attempt is due, if one is scheduled.
    pub fn reconnect_at(&self) -> Option<Instant> {
        self.reconnect_at
    }

    pub async fn connect(&mut self) {
        self.state = ConnectionState::Connecting;
        self.reconnect_at = None;
        tracing::info!("🔌 Connecting to {}", self.url);

        match time::timeout(self.connect_timeout, connect_async(self.url.as_str())).await {
            Ok(Ok((stream, _response))) => {
                let (writer, reader) = stream.split();
                self.writer = Some(writer);
                self.reader = Some(reader);
                self.state = ConnectionState::Connected;
                self.failures = 0;
                tracing::info!("✅ Connected to {}", self.url);
            }
            Ok(Err(e)) => {
                tracing::error!("❌ WebSocket connection to {} failed: {}", self.url, e);
                self.try_alternative_connection();
                self.schedule_reconnect();
            }
            Err(_) => {
                tracing::error!(
                    "❌ WebSocket connection to {} timed out after {:?}",
                    self.url,
                    self.connect_timeout
                );
                self.try_alternative_connection();
                self.schedule_reconnect();
            }
        }
    }

    /// Sends a text frame. Silently dropped when not connected; returns
    /// whether the frame went out.
    pub async fn send(&mut self, payload: String) -> bool {
        let writer = match self.writer.as_mut() {
            Some(writer) if self.state == ConnectionState::Connected => writer,
            _ => {
                tracing::debug!("Not connected, dropping outbound command");
                return false;
            }
        };

        match writer.send(Message::Text(payload)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("⚠️ Failed to send command: {}", e);
                self.handle_disconnect();
                false
            }
        }
    }

    /// Next inbound text frame. Pending forever while disconnected, and
    /// `None` once when the connection drops.
    ///
    /// Cancel safe.
    pub async fn next_frame(&mut self) -> Option<String> {
        loop {
            let reader = match self.reader.as_mut() {
                Some(reader) => reader,
                None => return std::future::pending().await,
            };

            match reader.next().await {
                Some(Ok(Message::Text(text))) => return Some(text),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(text),
                    Err(_) => tracing::warn!("⚠️ Ignoring non UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| format!("{} {}", f.code, f.reason))
                        .unwrap_or_else(|| "no reason".to_string());
                    tracing::info!("WebSocket closed by server ({})", reason);
                    self.handle_disconnect();
                    return None;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    tracing::error!("❌ WebSocket error: {}", e);
                    self.handle_disconnect();
                    return None;
                }
                None => {
                    tracing::info!("WebSocket stream ended");
                    self.handle_disconnect();
                    return None;
                }
            }
        }
    }

    fn handle_disconnect(&mut self) {
        self.writer = None;
        self.reader = None;
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.failures = self.failures.saturating_add(1);
        let delay = self.policy.next_delay(self.failures);
        self.reconnect_at = Some(Instant::now() + delay);
        tracing::info!(
            "🔁 Reconnecting in {:?} (attempt {})",
            delay,
            self.failures
        );
    }

    fn try_alternative_connection(&self) {
        // No secondary transport is wired up for the WebSocket mode yet.
        tracing::warn!(
            "⚠️ No alternative connection available for {}, waiting for the next reconnect",
            self.url
        );
    }
}
