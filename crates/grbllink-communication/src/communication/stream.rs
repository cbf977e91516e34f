//! Line source over a byte stream

use std::collections::VecDeque;

use async_trait::async_trait;
use grbllink_core::ConnectionError;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::{LineFramer, LineSource};

const READ_CHUNK: usize = 1024;

/// Reads a tokio stream and yields framed lines
pub struct StreamLineSource<R> {
    reader: R,
    framer: LineFramer,
    ready: VecDeque<String>,
    buf: Box<[u8]>,
}

impl<R> StreamLineSource<R> {
    /// Wrap the read half of a stream
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            framer: LineFramer::new(),
            ready: VecDeque::new(),
            buf: vec![0; READ_CHUNK].into_boxed_slice(),
        }
    }
}

#[async_trait]
impl<R> LineSource for StreamLineSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn next_line(&mut self) -> Option<Result<String, ConnectionError>> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Some(Ok(line));
            }
            // `read` is cancel-safe and framing happens after it completes
            match self.reader.read(&mut self.buf).await {
                Ok(0) => return None,
                Ok(n) => self.ready.extend(self.framer.push(&self.buf[..n])),
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_lines_then_eof() {
        let (mut far, near) = tokio::io::duplex(64);
        let mut source = StreamLineSource::new(near);

        far.write_all(b"Grbl 1.1f ['$' for help]\r\nok\r\n").await.unwrap();
        drop(far);

        assert_eq!(
            source.next_line().await.unwrap().unwrap(),
            "Grbl 1.1f ['$' for help]"
        );
        assert_eq!(source.next_line().await.unwrap().unwrap(), "ok");
        assert!(source.next_line().await.is_none());
    }
}
