//! Minimal Source RCON client.
//!
//! Packet layout, little endian: `size:i32 | id:i32 | type:i32 | body | 0 0`,
//! where `size` counts everything after itself.

use crate::core::classifier::check_console_reply;
use crate::domain::ports::{ConsoleConnector, ConsoleSession};
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub const SERVERDATA_AUTH: i32 = 3;
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;
pub const SERVERDATA_EXECCOMMAND: i32 = 2;
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

const MIN_PACKET_SIZE: i32 = 10;
const MAX_PACKET_SIZE: i32 = 4096 + MIN_PACKET_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub kind: i32,
    pub body: String,
}

impl Packet {
    pub fn new(id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let body = self.body.as_bytes();
        let size = (body.len() + MIN_PACKET_SIZE as usize) as i32;
        let mut buf = Vec::with_capacity(body.len() + 14);
        buf.extend_from_slice(&size.to_le_bytes());
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&self.kind.to_le_bytes());
        buf.extend_from_slice(body);
        buf.extend_from_slice(&[0, 0]);
        buf
    }

    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let size = reader.read_i32_le().await?;
        if !(MIN_PACKET_SIZE..=MAX_PACKET_SIZE).contains(&size) {
            return Err(SyncError::ProtocolError {
                message: format!("RCON packet size {} out of range", size),
            });
        }

        let mut payload = vec![0u8; size as usize];
        reader.read_exact(&mut payload).await?;

        let id = i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
        let kind = i32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
        let body_bytes = &payload[8..payload.len() - 2];
        let body = String::from_utf8_lossy(body_bytes)
            .trim_end_matches('\0')
            .to_string();

        Ok(Self { id, kind, body })
    }
}

async fn with_timeout<T>(
    operation: &str,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| SyncError::TimeoutError {
            operation: operation.to_string(),
            seconds: limit.as_secs(),
        })?
}

#[derive(Debug, Clone)]
pub struct RconConnector {
    address: String,
    password: Option<String>,
    timeout: Duration,
}

impl RconConnector {
    pub fn new(host: &str, port: u32, password: Option<String>, timeout: Duration) -> Self {
        Self {
            address: format!("{}:{}", host, port),
            password,
            timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl ConsoleConnector for RconConnector {
    type Session = RconSession;

    async fn connect(&self) -> Result<RconSession> {
        let stream = with_timeout("rcon connect", self.timeout, async {
            TcpStream::connect(&self.address)
                .await
                .map_err(SyncError::from)
        })
        .await?;

        let mut session = RconSession {
            stream,
            next_id: 0,
            timeout: self.timeout,
        };

        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            session.authenticate(password).await?;
        }

        tracing::debug!("RCON session opened to {}", self.address);
        Ok(session)
    }
}

pub struct RconSession {
    stream: TcpStream,
    next_id: i32,
    timeout: Duration,
}

impl RconSession {
    fn allocate_id(&mut self) -> i32 {
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.next_id
    }

    async fn authenticate(&mut self, password: &str) -> Result<()> {
        let id = self.allocate_id();
        with_timeout(
            "rcon auth",
            self.timeout,
            auth_exchange(&mut self.stream, id, password),
        )
        .await
    }

    async fn execute(&mut self, command: &str) -> Result<String> {
        let id = self.allocate_id();
        with_timeout(
            "rcon command",
            self.timeout,
            command_exchange(&mut self.stream, id, command),
        )
        .await
    }
}

async fn auth_exchange(stream: &mut TcpStream, id: i32, password: &str) -> Result<()> {
    stream
        .write_all(&Packet::new(id, SERVERDATA_AUTH, password).encode())
        .await?;

    // Some servers send an empty RESPONSE_VALUE before the auth result.
    loop {
        let packet = Packet::read_from(&mut *stream).await?;
        if packet.kind != SERVERDATA_AUTH_RESPONSE {
            continue;
        }
        if packet.id == -1 {
            return Err(SyncError::ProtocolError {
                message: "RCON authentication rejected".to_string(),
            });
        }
        return Ok(());
    }
}

async fn command_exchange(stream: &mut TcpStream, id: i32, command: &str) -> Result<String> {
    stream
        .write_all(&Packet::new(id, SERVERDATA_EXECCOMMAND, command).encode())
        .await?;

    loop {
        let packet = Packet::read_from(&mut *stream).await?;
        if packet.id == id && packet.kind == SERVERDATA_RESPONSE_VALUE {
            return Ok(packet.body);
        }
        tracing::debug!("Skipping RCON packet id={} type={}", packet.id, packet.kind);
    }
}

#[async_trait]
impl ConsoleSession for RconSession {
    async fn send(&mut self, command: &str) -> Result<String> {
        let reply = self.execute(command).await?;
        check_console_reply(reply)
    }

    async fn end(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
