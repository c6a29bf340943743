//! Adapters from common async shapes to [`ResponseSource`]

use super::{ResponseSource, TransportError};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Adapts a stream of byte chunks, such as an HTTP response body
pub struct ChunkStream<S> {
    inner: Option<S>,
}

impl<S> ChunkStream<S>
where
    S: Stream<Item = Result<Bytes, TransportError>> + Send + Unpin,
{
    pub fn new(inner: S) -> Self {
        Self { inner: Some(inner) }
    }
}

#[async_trait]
impl<S> ResponseSource for ChunkStream<S>
where
    S: Stream<Item = Result<Bytes, TransportError>> + Send + Unpin,
{
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        match self.inner.as_mut() {
            Some(stream) => stream.next().await.transpose(),
            None => Ok(None),
        }
    }

    async fn cancel(&mut self) {
        // Dropping the body stream releases the connection
        self.inner = None;
    }
}

/// Reads a response document from any [`AsyncRead`] in fixed-size chunks
pub struct ReaderSource<R> {
    reader: Option<R>,
    chunk_size: usize,
}

impl<R> ReaderSource<R>
where
    R: AsyncRead + Send + Unpin,
{
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader: Some(reader),
            chunk_size: chunk_size.max(1),
        }
    }
}

#[async_trait]
impl<R> ResponseSource for ReaderSource<R>
where
    R: AsyncRead + Send + Unpin,
{
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        let mut buf = BytesMut::zeroed(self.chunk_size);
        let n = reader.read(&mut buf[..]).await?;
        buf.truncate(n);
        if n == 0 {
            self.reader = None;
            return Ok(None);
        }
        Ok(Some(buf.freeze()))
    }

    async fn cancel(&mut self) {
        self.reader = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_chunk_stream_yields_chunks_in_order() {
        let chunks = vec![
            Ok(Bytes::from_static(b"{\"a\"")),
            Ok(Bytes::from_static(b":1}")),
        ];
        let mut source = ChunkStream::new(stream::iter(chunks));

        assert_eq!(source.next_chunk().await.unwrap().unwrap(), "{\"a\"");
        assert_eq!(source.next_chunk().await.unwrap().unwrap(), ":1}");
        assert!(source.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_chunk_stream_propagates_transport_errors() {
        let chunks = vec![
            Ok(Bytes::from_static(b"{")),
            Err(TransportError::ConnectionLost("reset".to_string())),
        ];
        let mut source = ChunkStream::new(stream::iter(chunks));

        assert!(source.next_chunk().await.unwrap().is_some());
        let err = source.next_chunk().await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionLost(_)));
    }

    #[tokio::test]
    async fn test_chunk_stream_cancel_stops_delivery() {
        let chunks = vec![Ok(Bytes::from_static(b"{}"))];
        let mut source = ChunkStream::new(stream::iter(chunks));

        source.cancel().await;
        assert!(source.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reader_source_respects_chunk_size() {
        let doc: &[u8] = b"{\"results\":[1,2,3]}";
        let mut source = ReaderSource::new(doc, 4);

        let mut collected = Vec::new();
        while let Some(chunk) = source.next_chunk().await.unwrap() {
            assert!(chunk.len() <= 4);
            collected.extend_from_slice(&chunk);
        }
        assert_eq!(collected, doc);
    }

    #[test]
    fn test_io_timeout_counts_as_timeout() {
        let err = TransportError::from(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "slow peer",
        ));
        assert!(err.is_timeout());
        assert!(!TransportError::Other("x".to_string()).is_timeout());
    }
}
