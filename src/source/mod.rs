//! Response stream sources
//!
//! A query response arrives as an ordered sequence of byte chunks that
//! together encode one JSON document. The splitter pulls chunks through the
//! [`ResponseSource`] trait and owns the source exclusively; `cancel` is how
//! it tells the transport to release the connection.

pub mod error;
pub mod reader;

pub use error::TransportError;
pub use reader::{ChunkStream, ReaderSource};

use async_trait::async_trait;
use bytes::Bytes;

/// Ordered chunks of one response document
#[async_trait]
pub trait ResponseSource: Send {
    /// Next chunk, or `None` once the document has been fully delivered
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError>;

    /// Release the underlying resource. Called at most once.
    async fn cancel(&mut self);
}

#[async_trait]
impl<S: ResponseSource + ?Sized> ResponseSource for Box<S> {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        (**self).next_chunk().await
    }

    async fn cancel(&mut self) {
        (**self).cancel().await
    }
}

/// Identifiers supplied by the response metadata, outside the document body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
    pub request_id: Option<String>,
    pub client_context_id: Option<String>,
}

impl ResponseMetadata {
    pub fn new(request_id: impl Into<String>, client_context_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            client_context_id: Some(client_context_id.into()),
        }
    }
}
