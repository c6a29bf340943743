//! # analytics-result
//!
//! Streaming demultiplexer for analytics query responses.
//!
//! A query response is one JSON document carrying rows, a signature,
//! metrics, errors, warnings and a status. [`QueryResult::open`] parses it
//! incrementally as bytes arrive and exposes every section as its own
//! asynchronous channel or value, with back-pressure and cancellation.
//!
//! ## Modules
//!
//! - `source` - Response stream boundary and adapters
//! - `splitter` - Incremental section splitter over the response document
//! - `channel` - Fan-out sequences and single-resolution values
//! - `coordinator` - Lifecycle phases and the terminal status pair
//! - `result` - The `QueryResult` aggregate
//! - `model` - Rows, error entries, metrics and status values
//! - `deferred` - Handles for asynchronously computed results
//! - `config` - Buffer sizes and limits
//! - `logging` - Tracing subscriber setup
//! - `testing` - Scripted sources and document builders for tests
pub mod channel;
pub mod config;
pub mod coordinator;
pub mod deferred;
pub mod error;
pub mod logging;
pub mod model;
pub mod result;
pub mod source;
pub mod splitter;

pub mod testing;

pub use config::StreamConfig;
pub use coordinator::Phase;
pub use deferred::{DeferredHandle, HandleResolver};
pub use error::{ErrorCode, Result, ResultError};
pub use model::{ErrorEntry, Metrics, Row, Status};
pub use result::QueryResult;
pub use source::{ChunkStream, ReaderSource, ResponseMetadata, ResponseSource, TransportError};
