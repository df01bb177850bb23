//! Clinitag Domain Layer
//!
//! Core model for turning clinical protocol documents into structured tags.
//! This crate holds the value types and the trait seams every other layer
//! depends upon; infrastructure (SQLite, HTTP model backends, object storage)
//! lives in other crates.
//!
//! ## Key Concepts
//!
//! - **Document**: an uploaded protocol, immutable once registered
//! - **Chunk**: an overlapping word window of a document, the unit of extraction work
//! - **Tag**: a named clinical concept (e.g. `hipotensao`), unique by canonical name
//! - **Condition**: a typed activation rule attached to a tag
//! - **Execution log**: the recorded trace of one pipeline run

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod condition;
pub mod document;
pub mod execution;
pub mod tag;
pub mod traits;

// Re-exports for convenience
pub use chunk::{ChunkId, ChunkRecord};
pub use condition::{
    ComparisonOperator, Condition, ConditionKind, EventCondition, FieldCondition,
    NaturalLanguageCondition, TagReference, NATURAL_LANGUAGE_NAME,
};
pub use document::{Document, DocumentDescriptor, DocumentId};
pub use execution::{
    ExecutionEvent, ExecutionLog, ExecutionLogId, NewExecutionLog, RunCompletion, RunId,
    RunStatus,
};
pub use tag::{canonical_tag_key, derive_display_name, NewTag, Tag, TagId};
