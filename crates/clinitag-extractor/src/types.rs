//! Request and report types for extraction runs

use crate::error::ChunkErrorKind;
use serde::{Deserialize, Serialize};

/// Request to extract tags from one registered document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Identifier of a registered document
    pub document: String,

    /// Version requested by the caller, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Full document text
    #[serde(skip_serializing)]
    pub text: String,
}

impl ExtractionRequest {
    /// Create a request for `document` with its extracted text
    pub fn new(document: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            version: None,
            text: text.into(),
        }
    }

    /// Set the requested version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Terminal classification of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// No chunk failed
    Complete,
    /// Some chunks succeeded and some failed
    Partial,
    /// Every attempted chunk failed
    Stalled,
}

/// A chunk that failed during the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkFailure {
    /// Chunk index
    pub index: u32,
    /// Failure classification
    pub kind: ChunkErrorKind,
    /// Error message, as stored in the ledger
    pub message: String,
}

/// Outcome of a run that reached the end of its chunk loop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Document identifier
    pub document: String,
    /// Document version
    pub version: String,
    /// Chunks the text was split into
    pub chunks_total: usize,
    /// Chunks already processed by an earlier run
    pub chunks_skipped: usize,
    /// Chunks processed successfully by this run
    pub chunks_succeeded: usize,
    /// Chunks that failed in this run
    pub chunk_failures: Vec<ChunkFailure>,
    /// Distinct tags after merging
    pub tags_extracted: usize,
    /// Tags created
    pub tags_created: usize,
    /// Tags that already existed
    pub tags_reused: usize,
    /// Conditions newly attached
    pub conditions_added: usize,
    /// Conditions already attached
    pub conditions_existing: usize,
    /// Tags and conditions dropped by validation
    pub rejected: usize,
    /// Overall status
    pub status: ReportStatus,
}

impl RunReport {
    /// Chunks marked processed after this run, including skipped ones
    pub fn chunks_processed(&self) -> usize {
        self.chunks_skipped + self.chunks_succeeded
    }

    /// Status implied by the chunk counts
    pub fn status_for(succeeded: usize, failed: usize) -> ReportStatus {
        match (succeeded, failed) {
            (_, 0) => ReportStatus::Complete,
            (0, _) => ReportStatus::Stalled,
            _ => ReportStatus::Partial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_for() {
        assert_eq!(RunReport::status_for(3, 0), ReportStatus::Complete);
        assert_eq!(RunReport::status_for(0, 0), ReportStatus::Complete);
        assert_eq!(RunReport::status_for(2, 1), ReportStatus::Partial);
        assert_eq!(RunReport::status_for(0, 3), ReportStatus::Stalled);
    }

    #[test]
    fn test_request_snapshot_omits_text() {
        let request = ExtractionRequest::new("sepse__v1__a.pdf", "texto longo").with_version("v1");
        let snapshot = serde_json::to_value(&request).unwrap();
        assert_eq!(snapshot, json!({"document": "sepse__v1__a.pdf", "version": "v1"}));
    }
}
