//! The query result aggregate
//!
//! [`QueryResult::open`] spawns one producer task that splits the response
//! document into independently consumable channels. Channels can be read
//! concurrently from any number of tasks. Dropping the aggregate cancels
//! the producer and releases the response stream.

use crate::channel::{channel, channel_with_token, eventual, Demand, Eventual, Fanout};
use crate::config::StreamConfig;
use crate::coordinator::{Coordinator, ParseOutcome, Phase, Sinks};
use crate::deferred::DeferredHandle;
use crate::error::{common, Result};
use crate::model::{ErrorEntry, Metrics, Row, Status};
use crate::source::{ResponseMetadata, ResponseSource};
use crate::splitter::{Outcome, Splitter};
use futures::stream::BoxStream;
use serde_json::Value;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument};

pub struct QueryResult {
    parse_success: bool,
    request_id: String,
    client_context_id: String,
    handle: Mutex<Option<DeferredHandle>>,
    rows: Fanout<Row>,
    errors: Fanout<ErrorEntry>,
    warnings: Fanout<ErrorEntry>,
    signature: Eventual<Result<Option<Value>>>,
    metrics: Eventual<Result<Option<Metrics>>>,
    status: Eventual<Status>,
    final_success: Eventual<bool>,
    phase: watch::Receiver<Phase>,
    token: CancellationToken,
    demand: Demand,
}

impl QueryResult {
    /// Start demultiplexing `source` and wait until parse success is known.
    ///
    /// Never fails: problems with the response are reported through the
    /// channels and the terminal status.
    pub async fn open<S>(source: S, metadata: ResponseMetadata, config: &StreamConfig) -> Self
    where
        S: ResponseSource + 'static,
    {
        let token = CancellationToken::new();
        let demand = Demand::new();
        let (rows_pub, rows) =
            channel_with_token("rows", config.row_buffer, &demand, token.clone());
        let (errors_pub, errors) = channel("errors", config.error_buffer, &demand);
        let (warnings_pub, warnings) = channel("warnings", config.error_buffer, &demand);
        let (signature_res, signature) = eventual();
        let (metrics_res, metrics) = eventual();
        let (status_res, status) = eventual();
        let (final_res, final_success) = eventual();
        let (phase_tx, phase) = watch::channel(Phase::Pending);
        let (determined_tx, determined_rx) = oneshot::channel();

        let span = tracing::debug_span!(
            "query_result",
            request_id = metadata.request_id.as_deref().unwrap_or_default()
        );
        let coordinator = Coordinator::new(
            phase_tx,
            determined_tx,
            metadata,
            Sinks {
                rows: rows_pub,
                errors: errors_pub,
                warnings: warnings_pub,
                signature: signature_res,
                metrics: metrics_res,
                status: status_res,
                final_success: final_res,
            },
        );
        let splitter = Splitter::new(source, config.max_value_bytes);
        tokio::spawn(drive(splitter, coordinator, token.clone()).instrument(span));

        let outcome = determined_rx.await.unwrap_or_else(|_| ParseOutcome {
            parse_success: false,
            request_id: String::new(),
            client_context_id: String::new(),
            handle: None,
        });

        Self {
            parse_success: outcome.parse_success,
            request_id: outcome.request_id,
            client_context_id: outcome.client_context_id,
            handle: Mutex::new(outcome.handle),
            rows,
            errors,
            warnings,
            signature,
            metrics,
            status,
            final_success,
            phase,
            token,
            demand,
        }
    }

    /// Result rows in source order. Dropping the stream before it ends
    /// cancels the whole query.
    pub fn rows(&self) -> BoxStream<'static, Result<Row>> {
        self.rows.stream()
    }

    /// Errors reported by the service, in receipt order
    pub fn errors(&self) -> BoxStream<'static, Result<ErrorEntry>> {
        self.errors.stream()
    }

    /// Warnings reported by the service, in receipt order
    pub fn warnings(&self) -> BoxStream<'static, Result<ErrorEntry>> {
        self.warnings.stream()
    }

    /// Row signature, `None` when the response carried none
    pub async fn signature(&self) -> Result<Option<Value>> {
        self.wait(&self.signature)
            .await
            .unwrap_or_else(|| Err(common::abandoned("signature")))
    }

    /// Execution metrics, `None` when the response carried none
    pub async fn info(&self) -> Result<Option<Metrics>> {
        self.wait(&self.metrics)
            .await
            .unwrap_or_else(|| Err(common::abandoned("metrics")))
    }

    /// Terminal status. Waits for the end of the response.
    pub async fn status(&self) -> Status {
        self.wait(&self.status).await.unwrap_or(Status::Fatal)
    }

    /// True iff parsing succeeded and the status is `success`
    pub async fn final_success(&self) -> bool {
        self.wait(&self.final_success).await.unwrap_or(false)
    }

    pub fn parse_success(&self) -> bool {
        self.parse_success
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn client_context_id(&self) -> &str {
        &self.client_context_id
    }

    /// Deferred result handle. Can be taken once.
    pub fn handle(&self) -> Option<DeferredHandle> {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Stop the query and release the response stream
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Channels nobody subscribed to stop holding back parsing while we wait
    async fn wait<T: Clone>(&self, value: &Eventual<T>) -> Option<T> {
        if let Some(ready) = value.try_get() {
            return Some(ready);
        }
        let _reader = self.demand.reader();
        value.get().await
    }
}

impl Drop for QueryResult {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("request_id", &self.request_id)
            .field("client_context_id", &self.client_context_id)
            .field("parse_success", &self.parse_success)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

/// Producer task: split until done or cancelled, release the source once,
/// then settle every channel
async fn drive<S: ResponseSource>(
    mut splitter: Splitter<S>,
    mut coordinator: Coordinator,
    token: CancellationToken,
) {
    let outcome = tokio::select! {
        biased;
        _ = token.cancelled() => Outcome::Cancelled,
        outcome = splitter.run(&mut coordinator) => outcome,
    };
    debug!(?outcome, "splitter finished");
    splitter.release().await;
    coordinator.finish(outcome);
}
