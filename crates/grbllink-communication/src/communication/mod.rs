//! Communication layer
//!
//! Transports deliver newline-framed text in and accept lines and single
//! real-time bytes out. A connected transport is represented by a
//! [`TransportLink`]: a [`LinkWriter`] (which implements [`CommandSink`])
//! plus a [`LineSource`] the controller reads from.
//!
//! - TCP (grblHAL telnet): `tcp://host:port` or `host:port`
//! - WebSocket: `ws://host[:port][/path]`
//! - In-memory duplex link for tests and simulation

pub mod buffered;
pub mod framing;
pub mod heartbeat;
pub mod memory;
pub mod stream;
pub mod tcp;
pub mod websocket;
pub mod writer;

use async_trait::async_trait;
use grbllink_core::ConnectionError;

pub use buffered::{
    Acknowledgment, CommandChannel, CommandResponse, CommandResult, CommandTicket, Completion,
    Dispatched, FailedCommand,
};
pub use framing::LineFramer;
pub use heartbeat::{HeartbeatAction, LivenessMonitor};
pub use memory::{MemoryConnector, MemoryPeer, PeerInput};
pub use stream::StreamLineSource;
pub use writer::{ByteSink, LinkWriter, StreamSink};

/// grblHAL telnet port used when an address has none
pub const DEFAULT_TCP_PORT: u16 = 23;

/// Narrow capability to put bytes on the wire.
///
/// Implementations must not block: the controller calls these from its
/// event loop.
pub trait CommandSink: Send + Sync {
    /// Write one text command; the line terminator is appended here
    fn send_line(&self, line: &str) -> Result<(), ConnectionError>;

    /// Write one real-time byte ahead of any queued text
    fn send_realtime(&self, byte: u8) -> Result<(), ConnectionError>;
}

/// Inbound half of a transport
#[async_trait]
pub trait LineSource: Send {
    /// Next complete line. `None` once the peer has closed the stream.
    ///
    /// Must be cancel-safe: dropping the future loses no data.
    async fn next_line(&mut self) -> Option<Result<String, ConnectionError>>;
}

/// An open transport
pub struct TransportLink {
    /// Outbound half
    pub writer: LinkWriter,
    /// Inbound half
    pub reader: Box<dyn LineSource>,
    /// Peer description for logging
    pub peer: String,
}

impl std::fmt::Debug for TransportLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportLink")
            .field("peer", &self.peer)
            .finish()
    }
}

/// Opens transports for the controller
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a transport to `address`
    async fn connect(&self, address: &str) -> Result<TransportLink, ConnectionError>;
}

/// Parsed connection address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `host:port` for a raw TCP stream
    Tcp(String),
    /// Full `ws://` or `wss://` URL
    WebSocket(String),
}

impl Endpoint {
    /// Parse a user supplied address
    pub fn parse(address: &str) -> Result<Self, ConnectionError> {
        let address = address.trim();
        let invalid = || ConnectionError::InvalidAddress {
            address: address.to_string(),
        };

        if address.starts_with("ws://") || address.starts_with("wss://") {
            return match address.split_once("://") {
                Some((_, rest)) if !rest.is_empty() => Ok(Endpoint::WebSocket(address.to_string())),
                _ => Err(invalid()),
            };
        }

        let host_port = match address.split_once("://") {
            Some(("tcp", rest)) => rest,
            Some(_) => return Err(invalid()),
            None => address,
        };
        if host_port.is_empty() || host_port.contains('/') {
            return Err(invalid());
        }

        // A trailing `:port` is only a port if it parses; bare IPv6 needs brackets
        match host_port.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(Endpoint::Tcp(host_port.to_string()))
            }
            Some(_) if !host_port.ends_with(']') => Err(invalid()),
            _ => Ok(Endpoint::Tcp(format!("{}:{}", host_port, DEFAULT_TCP_PORT))),
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
            Endpoint::WebSocket(url) => write!(f, "{}", url),
        }
    }
}

/// Connector for real networks: TCP or WebSocket depending on the address
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkConnector;

#[async_trait]
impl Connector for NetworkConnector {
    async fn connect(&self, address: &str) -> Result<TransportLink, ConnectionError> {
        match Endpoint::parse(address)? {
            Endpoint::Tcp(addr) => tcp::connect(&addr).await,
            Endpoint::WebSocket(url) => websocket::connect(&url).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tcp_addresses() {
        assert_eq!(
            Endpoint::parse("192.168.1.50:23").unwrap(),
            Endpoint::Tcp("192.168.1.50:23".to_string())
        );
        assert_eq!(
            Endpoint::parse("tcp://cnc.local:2323").unwrap(),
            Endpoint::Tcp("cnc.local:2323".to_string())
        );
        assert_eq!(
            Endpoint::parse("cnc.local").unwrap(),
            Endpoint::Tcp("cnc.local:23".to_string())
        );
        assert_eq!(
            Endpoint::parse("[::1]:23").unwrap(),
            Endpoint::Tcp("[::1]:23".to_string())
        );
    }

    #[test]
    fn test_parse_websocket_addresses() {
        assert_eq!(
            Endpoint::parse("ws://192.168.1.50:81").unwrap(),
            Endpoint::WebSocket("ws://192.168.1.50:81".to_string())
        );
        assert!(Endpoint::parse("ws://").is_err());
    }

    #[test]
    fn test_parse_invalid_addresses() {
        assert!(Endpoint::parse("").is_err());
        assert!(Endpoint::parse("serial:///dev/ttyUSB0").is_err());
        assert!(Endpoint::parse("host:notaport").is_err());
        assert!(Endpoint::parse("host/path").is_err());
    }
}
