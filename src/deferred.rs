//! Handles for queries computed asynchronously by the service

use crate::config::StreamConfig;
use crate::error::Result;
use crate::result::QueryResult;
use crate::source::{ResponseMetadata, ResponseSource, TransportError};
use async_trait::async_trait;

/// Reference to a result the service will serve later
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredHandle {
    uri: String,
}

impl DeferredHandle {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Fetch the deferred result through `resolver` and open it
    pub async fn fetch<R>(&self, resolver: &R, config: &StreamConfig) -> Result<QueryResult>
    where
        R: HandleResolver + ?Sized,
    {
        tracing::debug!(uri = %self.uri, "fetching deferred result");
        let (source, metadata) = resolver.resolve(self).await?;
        Ok(QueryResult::open(source, metadata, config).await)
    }
}

/// Turns a handle into the response stream of the computed result
#[async_trait]
pub trait HandleResolver: Send + Sync {
    async fn resolve(
        &self,
        handle: &DeferredHandle,
    ) -> std::result::Result<(Box<dyn ResponseSource>, ResponseMetadata), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing::{ResponseDocument, ScriptedSource};
    use futures::TryStreamExt;
    use serde_json::json;

    struct FixedResolver {
        document: String,
    }

    #[async_trait]
    impl HandleResolver for FixedResolver {
        async fn resolve(
            &self,
            handle: &DeferredHandle,
        ) -> std::result::Result<(Box<dyn ResponseSource>, ResponseMetadata), TransportError>
        {
            if handle.uri() != "/result/7" {
                return Err(TransportError::HandleNotFound(handle.uri().to_string()));
            }
            let source = ScriptedSource::from_document(self.document.clone(), 16);
            Ok((Box::new(source), ResponseMetadata::new("r-7", "ctx-7")))
        }
    }

    #[tokio::test]
    async fn test_fetch_opens_the_deferred_result() {
        let resolver = FixedResolver {
            document: ResponseDocument::new()
                .results(vec![json!({"n": 1})])
                .status("success")
                .build(),
        };

        let handle = DeferredHandle::new("/result/7");
        let result = handle
            .fetch(&resolver, &StreamConfig::default())
            .await
            .unwrap();
        assert_eq!(result.request_id(), "r-7");

        let rows: Vec<_> = result.rows().try_collect().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(result.final_success().await);
    }

    #[tokio::test]
    async fn test_unknown_handle_is_a_transport_error() {
        let resolver = FixedResolver {
            document: String::new(),
        };
        let err = DeferredHandle::new("/result/8")
            .fetch(&resolver, &StreamConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TRANSPORT_HANDLE_NOT_FOUND);
    }
}
