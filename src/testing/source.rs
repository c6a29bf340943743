use crate::source::{ResponseSource, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// What happens once the scripted chunks run out
enum Tail {
    End,
    Fail(Option<TransportError>),
    Hang,
}

/// Counters shared with a [`ScriptedSource`] after it has been moved away
#[derive(Debug, Clone, Default)]
pub struct SourceProbe {
    chunks_read: Arc<AtomicUsize>,
    cancels: Arc<AtomicUsize>,
}

impl SourceProbe {
    pub fn chunks_read(&self) -> usize {
        self.chunks_read.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

/// Replays a document in fixed-size chunks
pub struct ScriptedSource {
    chunks: VecDeque<Bytes>,
    total: usize,
    tail: Tail,
    probe: SourceProbe,
}

impl ScriptedSource {
    pub fn from_document(document: impl AsRef<[u8]>, chunk_size: usize) -> Self {
        let chunks: VecDeque<Bytes> = document
            .as_ref()
            .chunks(chunk_size.max(1))
            .map(Bytes::copy_from_slice)
            .collect();
        Self {
            total: chunks.len(),
            chunks,
            tail: Tail::End,
            probe: SourceProbe::default(),
        }
    }

    /// Fail with `err` after the last chunk
    pub fn then_fail(mut self, err: TransportError) -> Self {
        self.tail = Tail::Fail(Some(err));
        self
    }

    /// Never complete after the last chunk
    pub fn then_hang(mut self) -> Self {
        self.tail = Tail::Hang;
        self
    }

    pub fn probe(&self) -> SourceProbe {
        self.probe.clone()
    }

    /// Number of scripted chunks
    pub fn total_chunks(&self) -> usize {
        self.total
    }
}

#[async_trait]
impl ResponseSource for ScriptedSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        if let Some(chunk) = self.chunks.pop_front() {
            self.probe.chunks_read.fetch_add(1, Ordering::SeqCst);
            return Ok(Some(chunk));
        }
        match &mut self.tail {
            Tail::End => Ok(None),
            Tail::Fail(err) => match err.take() {
                Some(err) => Err(err),
                None => Ok(None),
            },
            Tail::Hang => futures::future::pending().await,
        }
    }

    async fn cancel(&mut self) {
        self.probe.cancels.fetch_add(1, Ordering::SeqCst);
        self.chunks.clear();
        self.tail = Tail::End;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_source_counts_and_fails() {
        let mut source = ScriptedSource::from_document("abcde", 2)
            .then_fail(TransportError::ConnectionLost("gone".to_string()));
        let probe = source.probe();
        assert_eq!(source.total_chunks(), 3);

        for _ in 0..3 {
            assert!(source.next_chunk().await.unwrap().is_some());
        }
        assert!(source.next_chunk().await.is_err());
        assert!(source.next_chunk().await.unwrap().is_none());
        assert_eq!(probe.chunks_read(), 3);

        source.cancel().await;
        assert_eq!(probe.cancels(), 1);
    }
}
