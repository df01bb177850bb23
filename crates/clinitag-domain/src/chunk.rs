//! Chunk ledger records

use crate::DocumentId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Database identifier of a chunk record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId(pub i64);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted processing state of one chunk of a document
///
/// Keyed by `(document, index)`. The index is the chunk's position in the
/// chunker output, never an insertion counter, so re-creating the record
/// under concurrent writers always lands on the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Database identifier
    pub id: ChunkId,

    /// Owning document
    pub document: DocumentId,

    /// Zero-based position within the document
    pub index: u32,

    /// Raw chunk text
    pub text: String,

    /// Whether extraction succeeded for this chunk
    pub processed: bool,

    /// Number of processing attempts recorded
    pub attempts: u32,

    /// Error from the most recent failed attempt
    pub last_error: Option<String>,

    /// Creation timestamp (seconds since Unix epoch)
    pub created_at: u64,

    /// Last update timestamp (seconds since Unix epoch)
    pub updated_at: u64,
}

impl ChunkRecord {
    /// Whether the chunk has been attempted and is still waiting for a successful run
    pub fn needs_retry(&self) -> bool {
        !self.processed && self.attempts > 0
    }
}
