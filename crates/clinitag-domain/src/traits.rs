//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the extraction pipeline and
//! infrastructure. Implementations live in `clinitag-store` (SQLite),
//! `clinitag-llm` (model backends) and `clinitag-extractor` (local
//! collaborators).

use crate::{
    ChunkId, ChunkRecord, Condition, Document, DocumentDescriptor, DocumentId, ExecutionEvent,
    ExecutionLog, ExecutionLogId, NewExecutionLog, NewTag, RunCompletion, RunId, Tag, TagId,
};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Text generation collaborator
///
/// Implemented by the infrastructure layer (clinitag-llm). Calls are
/// blocking and may take minutes; implementations must not retry internally.
///
/// The pipeline runs each call on the blocking pool under its own timeout.
/// A call that outlives that timeout is abandoned, not interrupted: its thread
/// keeps running until the call returns. Implementations should therefore
/// carry their own client-side timeout, no longer than the pipeline's.
pub trait ExtractionClient {
    /// Error type for generation failures
    type Error;

    /// Generate a completion for the prompt
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;
}

/// Common error type shared by every store trait
pub trait Storage {
    /// Error type for store operations
    type Error;
}

/// Registry of source documents
pub trait DocumentStore: Storage {
    /// Register a document, or return the existing record with the same
    /// identifier. The flag is `true` when a new record was created.
    fn register_document(
        &mut self,
        descriptor: &DocumentDescriptor,
    ) -> Result<(Document, bool), Self::Error>;

    /// Look a document up by identifier
    fn find_document(&self, identifier: &str) -> Result<Option<Document>, Self::Error>;

    /// List all registered documents
    fn list_documents(&self) -> Result<Vec<Document>, Self::Error>;
}

/// Per-chunk processing state, keyed by `(document, index)`
pub trait ChunkLedger: Storage {
    /// Fetch the record for `(document, index)`, creating it with `text` if
    /// absent. Must not create duplicates under concurrent callers. The flag
    /// is `true` when this call created the record.
    fn get_or_create_chunk(
        &mut self,
        document: DocumentId,
        index: u32,
        text: &str,
    ) -> Result<(ChunkRecord, bool), Self::Error>;

    /// Record a successful attempt: sets `processed`, clears `last_error`
    /// and increments `attempts`, in one step
    fn mark_success(&mut self, chunk: ChunkId) -> Result<ChunkRecord, Self::Error>;

    /// Record a failed attempt: keeps `processed = false`, stores the error
    /// and increments `attempts`, in one step
    fn mark_failure(&mut self, chunk: ChunkId, error: &str) -> Result<ChunkRecord, Self::Error>;

    /// All chunk records of a document, in index order
    fn list_chunks(&self, document: DocumentId) -> Result<Vec<ChunkRecord>, Self::Error>;
}

/// Tags and their conditions
pub trait TagStore: Storage {
    /// Fetch the tag with the same canonical key, creating it from `tag` if
    /// absent. Existing tags are returned unchanged. The flag is `true` when
    /// this call created the tag.
    fn get_or_create_tag(&mut self, tag: &NewTag) -> Result<(Tag, bool), Self::Error>;

    /// Attach a condition to a tag. Returns `false` when a structurally
    /// identical condition was already attached; nothing is ever updated.
    fn add_condition(&mut self, tag: TagId, condition: &Condition) -> Result<bool, Self::Error>;

    /// Look a tag up by name (case-insensitive)
    fn find_tag(&self, name: &str) -> Result<Option<Tag>, Self::Error>;

    /// List tags, optionally restricted to one category, ordered by canonical key
    fn list_tags(&self, category: Option<&str>) -> Result<Vec<Tag>, Self::Error>;

    /// Conditions attached to a tag, in insertion order
    fn conditions_for(&self, tag: TagId) -> Result<Vec<Condition>, Self::Error>;
}

/// Execution logs and their event traces
pub trait ExecutionLogStore: Storage {
    /// Open a log in the running state
    fn open_log(&mut self, log: &NewExecutionLog) -> Result<ExecutionLogId, Self::Error>;

    /// Append an event to a running log
    fn append_event(
        &mut self,
        log: ExecutionLogId,
        message: &str,
        metadata: Option<&Value>,
    ) -> Result<ExecutionEvent, Self::Error>;

    /// Finalize a running log. Finalizing a log twice is an error.
    fn finalize_log(
        &mut self,
        log: ExecutionLogId,
        completion: &RunCompletion,
    ) -> Result<ExecutionLog, Self::Error>;

    /// Look a log up by run id
    fn get_log(&self, run: RunId) -> Result<Option<ExecutionLog>, Self::Error>;

    /// Most recent logs, newest first
    fn recent_logs(&self, limit: usize) -> Result<Vec<ExecutionLog>, Self::Error>;

    /// Events of a log, in emission order
    fn events_for(&self, log: ExecutionLogId) -> Result<Vec<ExecutionEvent>, Self::Error>;
}

/// Object storage holding source documents
pub trait ObjectStorage {
    /// Error type for storage operations
    type Error;

    /// Store an object
    fn upload(&self, bucket: &str, name: &str, data: &mut dyn Read) -> Result<(), Self::Error>;

    /// Make an object available as a local file and return its path
    fn download(&self, bucket: &str, name: &str) -> Result<PathBuf, Self::Error>;

    /// Names of all objects in a bucket
    fn list(&self, bucket: &str) -> Result<Vec<String>, Self::Error>;
}

/// Full-text extraction from a local file
pub trait TextExtractor {
    /// Error type for extraction failures
    type Error;

    /// Extract the document's full text
    fn extract_text(&self, path: &Path) -> Result<String, Self::Error>;
}
