//! Clinitag Extractor
//!
//! Turns clinical protocol text into persisted tags and activation
//! conditions, using a text generator as an unreliable extraction oracle.
//!
//! # Architecture
//!
//! ```text
//! Text → Chunker → [Ledger gate → Prompt → Generator → Sanitizer] per chunk
//!      → Merge → Persister → TagStore
//! ```
//!
//! The whole run is wrapped by an [`ExecutionRecorder`], which opens an
//! execution log, appends the trace of events, and finalizes the log once.
//!
//! # Key Features
//!
//! - **Idempotent retries**: the chunk ledger records each chunk's outcome,
//!   and processed chunks are skipped when a document is re-submitted
//! - **Per-chunk failure isolation**: transport and parse failures fail one
//!   chunk, never the run
//! - **Output repair**: code fences and bare top-level objects are repaired
//!   before parsing
//! - **Deduplication**: tags merge by canonical name and conditions union by
//!   structure
//!
//! # Example Usage
//!
//! ```no_run
//! use clinitag_domain::traits::DocumentStore;
//! use clinitag_domain::DocumentDescriptor;
//! use clinitag_extractor::{ExtractionRequest, ExtractorConfig, TagExtractor};
//! use clinitag_llm::MockProvider;
//! use clinitag_store::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = SqliteStore::in_memory()?;
//! store.register_document(&DocumentDescriptor::from_object_path("sepse__v1__adulto.pdf"))?;
//!
//! let llm = MockProvider::new(r#"[{"name": "hipotensao"}]"#);
//! let extractor = TagExtractor::new(llm, store, ExtractorConfig::default())?;
//!
//! let request = ExtractionRequest::new("sepse__v1__adulto.pdf", "PAS < 90 mmHg indica hipotensão.");
//! let report = extractor.run(request).await?;
//!
//! println!("{} of {} chunks processed", report.chunks_succeeded, report.chunks_total);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod error;
mod config;
mod types;
mod prompt;
mod chunking;
mod sanitizer;
mod validate;
mod merge;
mod persist;
mod recorder;
mod extractor;
mod job;
mod source;


pub use error::{ChunkError, ChunkErrorKind, ExtractorError};
pub use config::ExtractorConfig;
pub use types::{ChunkFailure, ExtractionRequest, ReportStatus, RunReport};
pub use prompt::{ChunkPosition, PromptBuilder, CHUNK_PLACEHOLDER, POSITION_PLACEHOLDER};
pub use chunking::{split_into_chunks, Chunker};
pub use sanitizer::{sanitize, sanitize_and_parse};
pub use validate::{parse_condition, validate_tag, RejectionReason, TagCandidate};
pub use merge::{merge, CanonicalTag, ChunkExtraction, MergeOutcome, Rejection};
pub use persist::{PersistSummary, Persister};
pub use recorder::ExecutionRecorder;
pub use extractor::TagExtractor;
pub use job::{sync_documents, upload_document, ProtocolJob};
pub use source::{FileTextExtractor, LocalObjectStorage, SourceError};
