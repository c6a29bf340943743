//! Testing utilities and fixtures
//!
//! Scripted response sources with failure injection and a builder for
//! response documents whose keys keep their insertion order.

pub mod document;
pub mod source;

pub use document::ResponseDocument;
pub use source::{ScriptedSource, SourceProbe};
