//! Outbound half of a transport
//!
//! A single writer task owns the write side of the connection. Lines and
//! real-time bytes arrive on separate channels and the task always drains
//! real-time bytes first, so a feed hold or soft reset never waits behind
//! queued text.

use async_trait::async_trait;
use grbllink_core::ConnectionError;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::CommandSink;

/// Byte-level write side of a transport
#[async_trait]
pub trait ByteSink: Send + 'static {
    /// Write and flush `bytes`
    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ConnectionError>;

    /// Close the underlying stream
    async fn close(&mut self) -> Result<(), ConnectionError>;
}

/// [`ByteSink`] over any tokio writer
pub struct StreamSink<W>(pub W);

#[async_trait]
impl<W> ByteSink for StreamSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        self.0.write_all(bytes).await?;
        self.0.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.0.shutdown().await?;
        Ok(())
    }
}

/// Handle to the writer task. Dropping it closes the stream once pending
/// output is flushed.
#[derive(Debug)]
pub struct LinkWriter {
    lines: mpsc::UnboundedSender<Vec<u8>>,
    realtime: mpsc::UnboundedSender<u8>,
    task: JoinHandle<()>,
}

impl LinkWriter {
    /// Spawn the writer task for `sink`
    pub fn spawn<S: ByteSink>(sink: S) -> Self {
        let (lines, line_rx) = mpsc::unbounded_channel();
        let (realtime, realtime_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_writer(sink, line_rx, realtime_rx));
        Self {
            lines,
            realtime,
            task,
        }
    }

    /// Whether the writer task has stopped (write failure or closed stream)
    pub fn is_closed(&self) -> bool {
        self.task.is_finished() || self.lines.is_closed()
    }
}

impl CommandSink for LinkWriter {
    fn send_line(&self, line: &str) -> Result<(), ConnectionError> {
        if line.contains(['\n', '\r']) {
            return Err(ConnectionError::IoError {
                reason: format!("embedded line terminator in '{}'", line.escape_debug()),
            });
        }
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.lines.send(bytes).map_err(|_| writer_gone())
    }

    fn send_realtime(&self, byte: u8) -> Result<(), ConnectionError> {
        self.realtime.send(byte).map_err(|_| writer_gone())
    }
}

fn writer_gone() -> ConnectionError {
    ConnectionError::ConnectionLost {
        reason: "writer closed".to_string(),
    }
}

async fn run_writer<S: ByteSink>(
    mut sink: S,
    mut lines: mpsc::UnboundedReceiver<Vec<u8>>,
    mut realtime: mpsc::UnboundedReceiver<u8>,
) {
    loop {
        let result = tokio::select! {
            biased;
            Some(byte) = realtime.recv() => sink.write_bytes(&[byte]).await,
            Some(line) = lines.recv() => sink.write_bytes(&line).await,
            else => break,
        };
        if let Err(e) = result {
            tracing::warn!("Transport write failed: {}", e);
            return;
        }
    }

    if let Err(e) = sink.close().await {
        tracing::debug!("Error closing transport: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_realtime_bytes_jump_the_queue() {
        let (near, mut far) = tokio::io::duplex(256);
        let writer = LinkWriter::spawn(StreamSink(near));

        writer.send_line("G0 X10").unwrap();
        writer.send_realtime(b'!').unwrap();
        drop(writer);

        let mut out = Vec::new();
        far.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"!G0 X10\n");
    }

    #[tokio::test]
    async fn test_rejects_embedded_newline() {
        let (near, _far) = tokio::io::duplex(64);
        let writer = LinkWriter::spawn(StreamSink(near));
        assert!(writer.send_line("G0\nG1").is_err());
    }

    #[tokio::test]
    async fn test_send_after_peer_close_fails() {
        let (near, far) = tokio::io::duplex(64);
        let writer = LinkWriter::spawn(StreamSink(near));
        drop(far);

        // First write hits the broken pipe and stops the task
        let _ = writer.send_line("G0 X1");
        for _ in 0..50 {
            if writer.is_closed() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(writer.is_closed());
        assert!(writer.send_line("G0 X2").is_err());
    }
}
