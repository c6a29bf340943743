//! Completion coordinator
//!
//! Owns the producing half of every result channel, tracks the lifecycle
//! phase and emits the terminal status pair exactly once.

use crate::channel::{Publisher, Resolver, SendError};
use crate::deferred::DeferredHandle;
use crate::error::{Result, ResultError};
use crate::model::{ErrorEntry, Metrics, Row, Status};
use crate::source::ResponseMetadata;
use crate::splitter::{Outcome, Section, SectionSink};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{oneshot, watch};
use tracing::debug;

/// Lifecycle of a query result. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Pending,
    ParseDetermined,
    Streaming,
    Terminal,
}

/// Everything fixed at ParseDetermined
#[derive(Debug, Clone)]
pub(crate) struct ParseOutcome {
    pub parse_success: bool,
    pub request_id: String,
    pub client_context_id: String,
    pub handle: Option<DeferredHandle>,
}

/// Producing halves handed to the coordinator by the result aggregate
pub(crate) struct Sinks {
    pub rows: Publisher<Row>,
    pub errors: Publisher<ErrorEntry>,
    pub warnings: Publisher<ErrorEntry>,
    pub signature: Resolver<Result<Option<Value>>>,
    pub metrics: Resolver<Result<Option<Metrics>>>,
    pub status: Resolver<Status>,
    pub final_success: Resolver<bool>,
}

pub(crate) struct Coordinator {
    phase: watch::Sender<Phase>,
    determined: Option<oneshot::Sender<ParseOutcome>>,
    parse_success: Option<bool>,
    metadata: ResponseMetadata,
    wire_request_id: Option<String>,
    wire_client_context_id: Option<String>,
    rows: Publisher<Row>,
    errors: Publisher<ErrorEntry>,
    warnings: Publisher<ErrorEntry>,
    signature: Option<Resolver<Result<Option<Value>>>>,
    metrics: Option<Resolver<Result<Option<Metrics>>>>,
    status: Option<Resolver<Status>>,
    final_success: Option<Resolver<bool>>,
    wire_status: Option<Status>,
}

impl Coordinator {
    pub fn new(
        phase: watch::Sender<Phase>,
        determined: oneshot::Sender<ParseOutcome>,
        metadata: ResponseMetadata,
        sinks: Sinks,
    ) -> Self {
        Self {
            phase,
            determined: Some(determined),
            parse_success: None,
            metadata,
            wire_request_id: None,
            wire_client_context_id: None,
            rows: sinks.rows,
            errors: sinks.errors,
            warnings: sinks.warnings,
            signature: Some(sinks.signature),
            metrics: Some(sinks.metrics),
            status: Some(sinks.status),
            final_success: Some(sinks.final_success),
            wire_status: None,
        }
    }

    fn advance(&self, next: Phase) {
        self.phase.send_if_modified(|current| {
            let from = *current;
            if next > from {
                debug!(?from, to = ?next, "phase transition");
                *current = next;
                true
            } else {
                if next < from {
                    debug!(?from, to = ?next, "ignoring phase regression");
                }
                false
            }
        });
    }

    fn publisher(&self, section: Section) -> Option<&Publisher<ErrorEntry>> {
        match section {
            Section::Errors => Some(&self.errors),
            Section::Warnings => Some(&self.warnings),
            _ => None,
        }
    }

    /// Drive every channel to its end and emit the terminal status pair
    pub fn finish(&mut self, outcome: Outcome) {
        let pre_stream = self.determined.is_some();
        self.determine(false, None);

        let status = match &outcome {
            Outcome::Completed => self.wire_status.unwrap_or(Status::Unknown),
            Outcome::Cancelled => Status::Stopped,
            Outcome::Failed(err) if err.is_timeout() => Status::Timeout,
            Outcome::Failed(_) => Status::Fatal,
        };

        match outcome {
            Outcome::Failed(err) if !pre_stream => self.fail_all(err),
            _ => self.close_all(),
        }

        self.advance(Phase::Terminal);
        let final_success = self.parse_success == Some(true) && status.is_success();
        debug!(%status, final_success, "query result terminal");
        if let Some(resolver) = self.status.take() {
            resolver.resolve(status);
        }
        if let Some(resolver) = self.final_success.take() {
            resolver.resolve(final_success);
        }
    }

    fn close_all(&mut self) {
        self.rows.close();
        self.errors.close();
        self.warnings.close();
        if let Some(resolver) = self.signature.take() {
            resolver.resolve(Ok(None));
        }
        if let Some(resolver) = self.metrics.take() {
            resolver.resolve(Ok(None));
        }
    }

    fn fail_all(&mut self, err: ResultError) {
        self.rows.fail(err.clone());
        self.errors.fail(err.clone());
        self.warnings.fail(err.clone());
        if let Some(resolver) = self.signature.take() {
            resolver.resolve(Err(err.clone()));
        }
        if let Some(resolver) = self.metrics.take() {
            resolver.resolve(Err(err));
        }
    }
}

#[async_trait]
impl SectionSink for Coordinator {
    fn determine(&mut self, parse_success: bool, handle: Option<DeferredHandle>) {
        let Some(tx) = self.determined.take() else {
            if let Some(handle) = handle {
                debug!(uri = handle.uri(), "ignoring handle after parse determination");
            }
            return;
        };

        if handle.is_some() {
            // Deferred queries carry no inline rows
            self.rows.close();
        }
        let outcome = ParseOutcome {
            parse_success,
            request_id: self
                .metadata
                .request_id
                .clone()
                .or_else(|| self.wire_request_id.take())
                .unwrap_or_default(),
            client_context_id: self
                .metadata
                .client_context_id
                .clone()
                .or_else(|| self.wire_client_context_id.take())
                .unwrap_or_default(),
            handle,
        };
        self.parse_success = Some(parse_success);
        debug!(parse_success, "parse determined");
        // The aggregate may already be gone; nothing to tell it then
        let _ = tx.send(outcome);
        self.advance(Phase::ParseDetermined);
    }

    fn streaming(&mut self) {
        if self.determined.is_none() {
            self.advance(Phase::Streaming);
        }
    }

    fn identifier(&mut self, section: Section, value: String) {
        if self.determined.is_none() {
            debug!(key = section.key(), "ignoring identifier after parse determination");
            return;
        }
        match section {
            Section::RequestId => self.wire_request_id = Some(value),
            Section::ClientContextId => self.wire_client_context_id = Some(value),
            _ => {}
        }
    }

    async fn row(&mut self, row: Value) -> std::result::Result<(), SendError> {
        self.rows.send(Row::new(row)).await
    }

    async fn entry(
        &mut self,
        section: Section,
        entry: ErrorEntry,
    ) -> std::result::Result<(), SendError> {
        match self.publisher(section) {
            Some(publisher) => publisher.send(entry).await,
            None => Err(SendError::Closed),
        }
    }

    fn close(&mut self, section: Section) {
        match section {
            Section::Results => self.rows.close(),
            Section::Errors => self.errors.close(),
            Section::Warnings => self.warnings.close(),
            _ => {}
        }
    }

    fn signature(&mut self, signature: Value) {
        match self.signature.take() {
            Some(resolver) => resolver.resolve(Ok(Some(signature))),
            None => debug!("ignoring duplicate signature"),
        }
    }

    fn metrics(&mut self, metrics: Value) {
        match self.metrics.take() {
            Some(resolver) => resolver.resolve(Ok(Some(Metrics::from_value(metrics)))),
            None => debug!("ignoring duplicate metrics"),
        }
    }

    fn status(&mut self, status: Status) {
        if self.wire_status.is_some() {
            debug!(%status, "ignoring duplicate status");
            return;
        }
        self.wire_status = Some(status);
    }
}
