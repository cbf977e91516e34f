//! WebSocket transport
//!
//! grblHAL network builds expose the same line protocol over a WebSocket.
//! Outbound bytes are sent as binary frames; inbound text and binary frames
//! are fed through the line framer since a frame may carry several lines or
//! a fragment of one.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use grbllink_core::ConnectionError;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{ByteSink, LineFramer, LineSource, LinkWriter, TransportLink};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open a WebSocket connection to `url`
pub async fn connect(url: &str) -> Result<TransportLink, ConnectionError> {
    tracing::debug!("Opening WebSocket connection to {}", url);
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| ConnectionError::ConnectFailed {
            address: url.to_string(),
            reason: e.to_string(),
        })?;
    tracing::info!("WebSocket connection established to {}", url);

    let (write, read) = ws_stream.split();
    Ok(TransportLink {
        writer: LinkWriter::spawn(WsSink(write)),
        reader: Box::new(WsLineSource {
            read,
            framer: LineFramer::new(),
            ready: VecDeque::new(),
        }),
        peer: url.to_string(),
    })
}

fn ws_error(e: tokio_tungstenite::tungstenite::Error) -> ConnectionError {
    ConnectionError::WebSocketError {
        reason: e.to_string(),
    }
}

struct WsSink(SplitSink<WsStream, Message>);

#[async_trait]
impl ByteSink for WsSink {
    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        self.0
            .send(Message::Binary(bytes.to_vec().into()))
            .await
            .map_err(ws_error)
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.0.close().await.map_err(ws_error)
    }
}

struct WsLineSource {
    read: SplitStream<WsStream>,
    framer: LineFramer,
    ready: VecDeque<String>,
}

#[async_trait]
impl LineSource for WsLineSource {
    async fn next_line(&mut self) -> Option<Result<String, ConnectionError>> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Some(Ok(line));
            }
            match self.read.next().await? {
                Ok(Message::Text(text)) => {
                    let lines = self.framer.push(text.as_str().as_bytes());
                    self.ready.extend(lines);
                }
                Ok(Message::Binary(data)) => {
                    let lines = self.framer.push(&data);
                    self.ready.extend(lines);
                }
                Ok(Message::Close(frame)) => {
                    tracing::debug!("WebSocket closed by peer: {:?}", frame);
                    return None;
                }
                Ok(_) => {}
                Err(e) => return Some(Err(ws_error(e))),
            }
        }
    }
}
