//! Error types for the extraction pipeline
//!
//! Two tiers: `ExtractorError` aborts a run and is recorded as its failure;
//! `ChunkError` fails a single chunk, is written to the chunk ledger, and
//! the run moves on to the next chunk.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Run-level errors. Any of these aborts the run.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// The document to extract from was never registered
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Store error (database unavailable, constraint failure, poisoned lock)
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid configuration or chunking parameters
    #[error("Configuration error: {0}")]
    Config(String),

    /// Object storage or text extraction failed
    #[error("Source error: {0}")]
    Source(String),

    /// The execution log could not be written
    #[error("Recorder error: {0}")]
    Recorder(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::Recorder(format!("Snapshot serialization failed: {}", e))
    }
}

/// Chunk-level errors. Recorded as the chunk's `last_error`; never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChunkError {
    /// Generator unreachable, non-success response, or timeout
    #[error("Generation failed: {0}")]
    Transport(String),

    /// Output could not be repaired into a JSON array
    #[error("Malformed extraction: {0}")]
    Malformed(String),
}

impl ChunkError {
    /// Classification of this error
    pub fn kind(&self) -> ChunkErrorKind {
        match self {
            ChunkError::Transport(_) => ChunkErrorKind::Transport,
            ChunkError::Malformed(_) => ChunkErrorKind::Malformed,
        }
    }
}

/// Classification of a chunk failure, as reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkErrorKind {
    /// See [`ChunkError::Transport`]
    Transport,
    /// See [`ChunkError::Malformed`]
    Malformed,
}

impl fmt::Display for ChunkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkErrorKind::Transport => f.write_str("transport"),
            ChunkErrorKind::Malformed => f.write_str("malformed"),
        }
    }
}
