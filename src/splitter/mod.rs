//! Streaming section splitter
//!
//! Walks the root object of a response one key at a time and routes each
//! section to a [`SectionSink`]. Array sections are delivered element by
//! element so memory stays bounded by the largest single element.

pub mod scanner;
pub mod section;

pub use scanner::Scanner;
pub use section::Section;

use crate::channel::SendError;
use crate::deferred::DeferredHandle;
use crate::error::ResultError;
use crate::model::{ErrorEntry, Status};
use crate::source::ResponseSource;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{trace, warn};

/// Receives sections as the splitter encounters them
#[async_trait]
pub trait SectionSink: Send {
    /// Fix parseSuccess. Only the first call has any effect.
    fn determine(&mut self, parse_success: bool, handle: Option<DeferredHandle>);

    /// A section starts delivering to a channel or value
    fn streaming(&mut self);

    /// `requestID` or `clientContextID` read from the document
    fn identifier(&mut self, section: Section, value: String);

    async fn row(&mut self, row: Value) -> Result<(), SendError>;

    /// An element of the `errors` or `warnings` section
    async fn entry(&mut self, section: Section, entry: ErrorEntry) -> Result<(), SendError>;

    /// A streamed section has been fully delivered
    fn close(&mut self, section: Section);

    fn signature(&mut self, signature: Value);

    fn metrics(&mut self, metrics: Value);

    fn status(&mut self, status: Status);
}

/// How a splitter run ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed,
    Cancelled,
    Failed(ResultError),
}

enum Interrupt {
    Cancelled,
    Failed(ResultError),
}

impl From<ResultError> for Interrupt {
    fn from(err: ResultError) -> Self {
        Self::Failed(err)
    }
}

/// One-shot demultiplexer for a single response document
pub struct Splitter<S> {
    scanner: Scanner<S>,
}

impl<S: ResponseSource> Splitter<S> {
    pub fn new(source: S, max_value_bytes: usize) -> Self {
        Self {
            scanner: Scanner::new(source, max_value_bytes),
        }
    }

    /// Split the whole document into `sink`
    pub async fn run<K: SectionSink>(&mut self, sink: &mut K) -> Outcome {
        match self.split(sink).await {
            Ok(()) => Outcome::Completed,
            Err(Interrupt::Cancelled) => Outcome::Cancelled,
            Err(Interrupt::Failed(err)) => {
                warn!(offset = self.scanner.offset(), error = %err, "response stream failed");
                Outcome::Failed(err)
            }
        }
    }

    /// Release the underlying source
    pub async fn release(&mut self) {
        self.scanner.source_mut().cancel().await;
    }

    async fn split<K: SectionSink>(&mut self, sink: &mut K) -> Result<(), Interrupt> {
        self.scanner.begin_object().await?;

        let mut first = true;
        while let Some(key) = self.scanner.next_key(first).await? {
            first = false;
            let section = Section::from_key(&key);
            trace!(key = %key, offset = self.scanner.offset(), "section");

            match section {
                Section::Results => {
                    sink.determine(true, None);
                    sink.streaming();
                    self.stream_rows(sink).await?;
                }
                Section::Errors | Section::Warnings => {
                    // Warnings are only issued for statements that compiled
                    sink.determine(section == Section::Warnings, None);
                    sink.streaming();
                    self.stream_entries(sink, section).await?;
                }
                Section::Signature => {
                    let value = self.scanner.read_value().await?;
                    sink.streaming();
                    sink.signature(value);
                }
                Section::Metrics => {
                    let value = self.scanner.read_value().await?;
                    sink.streaming();
                    sink.metrics(value);
                }
                Section::Status => {
                    let status = match self.scanner.read_value().await? {
                        Value::String(s) => s.parse().unwrap_or(Status::Unknown),
                        other => {
                            warn!(value = %other, "status is not a string");
                            Status::Unknown
                        }
                    };
                    sink.determine(!status.is_fatal_class(), None);
                    sink.status(status);
                }
                Section::RequestId | Section::ClientContextId => {
                    match self.scanner.read_value().await? {
                        Value::String(s) => sink.identifier(section, s),
                        other => warn!(key = %key, value = %other, "identifier is not a string"),
                    }
                }
                Section::Handle => match self.scanner.read_value().await? {
                    Value::String(uri) if !uri.is_empty() => {
                        sink.determine(true, Some(DeferredHandle::new(uri)));
                    }
                    other => warn!(value = %other, "ignoring unusable handle"),
                },
                Section::Other => self.scanner.skip_value().await?,
            }
        }

        self.scanner.finish().await?;
        Ok(())
    }

    async fn stream_rows<K: SectionSink>(&mut self, sink: &mut K) -> Result<(), Interrupt> {
        if self.scanner.begin_array(Section::Results.key()).await? {
            let mut first = true;
            while self.scanner.next_element(first).await? {
                first = false;
                let row = self.scanner.read_value().await?;
                match sink.row(row).await {
                    Ok(()) | Err(SendError::Closed) => {}
                    Err(SendError::Cancelled) => return Err(Interrupt::Cancelled),
                }
            }
        }
        sink.close(Section::Results);
        Ok(())
    }

    async fn stream_entries<K: SectionSink>(
        &mut self,
        sink: &mut K,
        section: Section,
    ) -> Result<(), Interrupt> {
        if self.scanner.begin_array(section.key()).await? {
            let mut first = true;
            while self.scanner.next_element(first).await? {
                first = false;
                let value = self.scanner.read_value().await?;
                // Only the rows channel may stop the query
                match sink.entry(section, ErrorEntry::from_value(value)).await {
                    Ok(()) => {}
                    Err(err @ (SendError::Closed | SendError::Cancelled)) => {
                        trace!(section = section.key(), %err, "entry discarded");
                    }
                }
            }
        }
        sink.close(section);
        Ok(())
    }
}
