//! In-memory transport
//!
//! [`MemoryConnector`] hands out `tokio::io::duplex` pipes. The controller
//! gets the near end as a normal [`TransportLink`]; the far end is delivered
//! as a [`MemoryPeer`] that plays the firmware in tests and simulations.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use grbllink_core::constants::is_realtime_byte;
use grbllink_core::ConnectionError;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;

use super::{Connector, LinkWriter, StreamLineSource, StreamSink, TransportLink};

const PIPE_CAPACITY: usize = 8192;

/// Connector producing in-memory links
#[derive(Debug)]
pub struct MemoryConnector {
    peers: mpsc::UnboundedSender<MemoryPeer>,
    refusing: AtomicBool,
    connections: AtomicUsize,
    delay: Duration,
}

impl MemoryConnector {
    /// Create a connector and the receiver on which peers are delivered
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MemoryPeer>) {
        Self::with_delay(Duration::ZERO)
    }

    /// Like [`MemoryConnector::new`] but every connect takes `delay`
    pub fn with_delay(delay: Duration) -> (Arc<Self>, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        let connector = Self {
            peers,
            refusing: AtomicBool::new(false),
            connections: AtomicUsize::new(0),
            delay,
        };
        (Arc::new(connector), rx)
    }

    /// Make subsequent connects fail
    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::SeqCst);
    }

    /// Connect attempts made so far
    pub fn attempts(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, address: &str) -> Result<TransportLink, ConnectionError> {
        let index = self.connections.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let refused = || ConnectionError::ConnectFailed {
            address: address.to_string(),
            reason: "connection refused".to_string(),
        };
        if self.refusing.load(Ordering::SeqCst) {
            return Err(refused());
        }

        let (near, far) = tokio::io::duplex(PIPE_CAPACITY);
        self.peers
            .send(MemoryPeer::new(index, far))
            .map_err(|_| refused())?;

        let (read, write) = tokio::io::split(near);
        Ok(TransportLink {
            writer: LinkWriter::spawn(StreamSink(write)),
            reader: Box::new(StreamLineSource::new(read)),
            peer: format!("memory://{}#{}", address, index),
        })
    }
}

/// What the controller wrote, as seen by the firmware
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerInput {
    /// A single real-time byte
    Realtime(u8),
    /// A text line without its terminator
    Line(String),
}

/// Firmware end of an in-memory link
#[derive(Debug)]
pub struct MemoryPeer {
    index: usize,
    stream: DuplexStream,
    inbound: VecDeque<u8>,
    line: Vec<u8>,
}

impl MemoryPeer {
    fn new(index: usize, stream: DuplexStream) -> Self {
        Self {
            index,
            stream,
            inbound: VecDeque::new(),
            line: Vec::new(),
        }
    }

    /// Zero-based connect attempt this peer belongs to
    pub fn index(&self) -> usize {
        self.index
    }

    /// Next item written by the controller; `None` once it closed the link
    pub async fn recv(&mut self) -> Option<PeerInput> {
        loop {
            while let Some(byte) = self.inbound.pop_front() {
                // The firmware picks real-time bytes out of the stream wherever they land
                if is_realtime_byte(byte) {
                    return Some(PeerInput::Realtime(byte));
                }
                if byte == b'\n' {
                    let line = String::from_utf8_lossy(&self.line).into_owned();
                    self.line.clear();
                    return Some(PeerInput::Line(line));
                }
                self.line.push(byte);
            }

            let mut buf = [0u8; 512];
            match self.stream.read(&mut buf).await {
                Ok(0) | Err(_) => return None,
                Ok(n) => self.inbound.extend(&buf[..n]),
            }
        }
    }

    /// Next text line, skipping real-time bytes
    pub async fn next_line(&mut self) -> Option<String> {
        loop {
            match self.recv().await? {
                PeerInput::Line(line) => return Some(line),
                PeerInput::Realtime(_) => continue,
            }
        }
    }

    /// Next real-time byte, skipping text lines
    pub async fn next_realtime(&mut self) -> Option<u8> {
        loop {
            match self.recv().await? {
                PeerInput::Realtime(byte) => return Some(byte),
                PeerInput::Line(_) => continue,
            }
        }
    }

    /// Write `text` followed by `\r\n`
    pub async fn send(&mut self, text: &str) -> std::io::Result<()> {
        self.stream.write_all(text.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await
    }
}
