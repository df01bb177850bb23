//! Document registration and the per-document job entry point

use crate::error::ExtractorError;
use crate::extractor::TagExtractor;
use crate::types::RunReport;
use clinitag_domain::traits::{
    ChunkLedger, DocumentStore, ExecutionLogStore, ExtractionClient, ObjectStorage, TagStore,
    TextExtractor,
};
use clinitag_domain::{Document, DocumentDescriptor};
use std::fmt::Display;
use std::io::Read;
use tracing::{error, info};

/// Store an object and register it as a document
///
/// Returns the document record and whether it was newly registered. Uploading
/// over an already-registered name replaces the bytes but not the record.
pub fn upload_document<O, S>(
    storage: &O,
    store: &mut S,
    bucket: &str,
    name: &str,
    data: &mut dyn Read,
) -> Result<(Document, bool), ExtractorError>
where
    O: ObjectStorage,
    O::Error: Display,
    S: DocumentStore,
    S::Error: Display,
{
    storage
        .upload(bucket, name, data)
        .map_err(|e| ExtractorError::Source(e.to_string()))?;

    let descriptor = DocumentDescriptor::from_object_path(name);
    store
        .register_document(&descriptor)
        .map_err(|e| ExtractorError::Store(e.to_string()))
}

/// Register every object in `bucket` that has no document record yet
///
/// Returns the newly registered documents in object-name order.
pub fn sync_documents<O, S>(
    storage: &O,
    store: &mut S,
    bucket: &str,
) -> Result<Vec<Document>, ExtractorError>
where
    O: ObjectStorage,
    O::Error: Display,
    S: DocumentStore,
    S::Error: Display,
{
    let names = storage
        .list(bucket)
        .map_err(|e| ExtractorError::Source(e.to_string()))?;

    let mut registered = Vec::new();
    for name in names {
        let (document, created) = store
            .register_document(&DocumentDescriptor::from_object_path(&name))
            .map_err(|e| ExtractorError::Store(e.to_string()))?;
        if created {
            info!(document = %document.identifier, category = %document.category, "Registered document");
            registered.push(document);
        }
    }
    Ok(registered)
}

/// One unit of queued work: extract tags from a stored document
///
/// The job never reschedules itself; a failed run is returned to whoever
/// submitted it.
pub struct ProtocolJob<L, S, O, T> {
    extractor: TagExtractor<L, S>,
    storage: O,
    text_extractor: T,
    bucket: String,
}

impl<L, S, O, T> ProtocolJob<L, S, O, T>
where
    L: ExtractionClient + Send + Sync + 'static,
    L::Error: Display,
    S: DocumentStore + ChunkLedger + TagStore + ExecutionLogStore,
    S::Error: Display,
    O: ObjectStorage,
    O::Error: Display,
    T: TextExtractor,
    T::Error: Display,
{
    /// Create a job reading from the extractor's configured source bucket
    pub fn new(extractor: TagExtractor<L, S>, storage: O, text_extractor: T) -> Self {
        let bucket = extractor.config().source_bucket.clone();
        Self {
            extractor,
            storage,
            text_extractor,
            bucket,
        }
    }

    /// Extractor driving the runs
    pub fn extractor(&self) -> &TagExtractor<L, S> {
        &self.extractor
    }

    /// Download the document, extract its text and run extraction over it
    ///
    /// The whole job is one recorded run: an unregistered document or a text
    /// source failure leaves a failed execution log behind.
    pub async fn run(
        &self,
        identifier: &str,
        version: Option<&str>,
    ) -> Result<RunReport, ExtractorError> {
        self.extractor
            .run_with_source(identifier, version, || {
                self.load_text(identifier).inspect_err(|e| {
                    error!(document = identifier, "Could not load document text: {}", e);
                })
            })
            .await
    }

    fn load_text(&self, identifier: &str) -> Result<String, ExtractorError> {
        let path = self
            .storage
            .download(&self.bucket, identifier)
            .map_err(|e| ExtractorError::Source(e.to_string()))?;
        self.text_extractor
            .extract_text(&path)
            .map_err(|e| ExtractorError::Source(e.to_string()))
    }
}
