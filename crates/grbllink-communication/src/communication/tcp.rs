//! TCP transport (grblHAL telnet / raw socket)

use grbllink_core::ConnectionError;
use tokio::net::TcpStream;

use super::{LinkWriter, StreamLineSource, StreamSink, TransportLink};

/// Open a TCP connection to `addr` (`host:port`)
pub async fn connect(addr: &str) -> Result<TransportLink, ConnectionError> {
    tracing::debug!("Opening TCP connection to {}", addr);
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| ConnectionError::ConnectFailed {
            address: addr.to_string(),
            reason: e.to_string(),
        })?;

    // Real-time bytes are single-byte writes; Nagle would delay them
    if let Err(e) = stream.set_nodelay(true) {
        tracing::warn!("Failed to disable Nagle on {}: {}", addr, e);
    }

    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| addr.to_string());
    let (read, write) = stream.into_split();
    tracing::info!("TCP connection established to {}", peer);

    Ok(TransportLink {
        writer: LinkWriter::spawn(StreamSink(write)),
        reader: Box::new(StreamLineSource::new(read)),
        peer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::communication::CommandSink;

    #[tokio::test]
    async fn test_tcp_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 3];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(b"ok\r\n").await.unwrap();
            buf
        });

        let mut link = connect(&addr).await.unwrap();
        link.writer.send_line("$X").unwrap();
        assert_eq!(link.reader.next_line().await.unwrap().unwrap(), "ok");
        assert_eq!(&server.await.unwrap(), b"$X\n");
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = connect(&addr).await.unwrap_err();
        assert!(matches!(err, ConnectionError::ConnectFailed { .. }));
    }
}
