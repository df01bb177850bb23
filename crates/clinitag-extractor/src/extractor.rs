//! Core TagExtractor implementation

use crate::chunking::Chunker;
use crate::config::ExtractorConfig;
use crate::error::{ChunkError, ChunkErrorKind, ExtractorError};
use crate::merge::{merge, ChunkExtraction};
use crate::persist::Persister;
use crate::prompt::{ChunkPosition, PromptBuilder};
use crate::recorder::{lock, ExecutionRecorder};
use crate::sanitizer::sanitize_and_parse;
use crate::types::{ChunkFailure, ExtractionRequest, RunReport};
use clinitag_domain::traits::{
    ChunkLedger, DocumentStore, ExecutionLogStore, ExtractionClient, TagStore,
};
use serde_json::{json, Value};
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// The TagExtractor turns a registered document's text into persisted tags
///
/// Chunks are processed strictly in index order. A failed chunk is written to
/// the ledger before the next chunk starts; a parsed chunk is marked processed
/// only after its tags are persisted. A re-submitted run therefore sends every
/// chunk whose tags are not yet stored, and nothing else.
pub struct TagExtractor<L, S> {
    client: Arc<L>,
    store: Arc<Mutex<S>>,
    config: ExtractorConfig,
    chunker: Chunker,
    prompts: PromptBuilder,
    persister: Persister,
}

impl<L, S> TagExtractor<L, S>
where
    L: ExtractionClient + Send + Sync + 'static,
    L::Error: Display,
    S: DocumentStore + ChunkLedger + TagStore + ExecutionLogStore,
    S::Error: Display,
{
    /// Create a new TagExtractor owning its client and store
    pub fn new(client: L, store: S, config: ExtractorConfig) -> Result<Self, ExtractorError> {
        Self::from_shared(Arc::new(client), Arc::new(Mutex::new(store)), config)
    }

    /// Create a TagExtractor over a client and store shared with other workers
    pub fn from_shared(
        client: Arc<L>,
        store: Arc<Mutex<S>>,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;

        let chunker = Chunker::from_config(&config)?;
        let prompts = match &config.prompt_template {
            Some(template) => PromptBuilder::with_template(template.clone()),
            None => PromptBuilder::new(),
        };
        let persister = Persister::new(config.default_category.clone());

        Ok(Self {
            client,
            store,
            config,
            chunker,
            prompts,
            persister,
        })
    }

    /// Shared handle to the store
    pub fn store(&self) -> &Arc<Mutex<S>> {
        &self.store
    }

    /// Active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Run extraction over one document, recorded as one execution log
    ///
    /// Chunk failures do not fail the run; they are listed in the report and
    /// left unprocessed in the ledger. Run-level errors are recorded on the
    /// log and then returned.
    pub async fn run(&self, request: ExtractionRequest) -> Result<RunReport, ExtractorError> {
        let ExtractionRequest {
            document,
            version,
            text,
        } = request;
        self.run_with_source(&document, version.as_deref(), move || Ok(text))
            .await
    }

    /// Run extraction, loading the text once the document is known to exist
    ///
    /// `load_text` is called inside the recorded run, so a failure to fetch
    /// or extract the text fails the execution log like any other fatal error.
    pub async fn run_with_source<F>(
        &self,
        document: &str,
        version: Option<&str>,
        load_text: F,
    ) -> Result<RunReport, ExtractorError>
    where
        F: FnOnce() -> Result<String, ExtractorError>,
    {
        let input = json!({
            "document": document,
            "version": version,
            "window_size": self.config.window_size,
            "overlap": self.config.overlap,
        });

        let recorder =
            ExecutionRecorder::open(Arc::clone(&self.store), &self.config.agent_name, &input)?;
        let result = self.execute(&recorder, document, version, load_text).await;
        recorder.finish(result)
    }

    async fn execute<F>(
        &self,
        recorder: &ExecutionRecorder<S>,
        identifier: &str,
        version: Option<&str>,
        load_text: F,
    ) -> Result<RunReport, ExtractorError>
    where
        F: FnOnce() -> Result<String, ExtractorError>,
    {
        recorder.event(
            "Starting tag extraction",
            Some(json!({ "document": identifier })),
        )?;

        let document = lock(&self.store)?
            .find_document(identifier)
            .map_err(store_error)?
            .ok_or_else(|| ExtractorError::DocumentNotFound(identifier.to_string()))?;

        if let Some(version) = version {
            if version != document.version {
                warn!(
                    document = %document.identifier,
                    requested = %version,
                    registered = %document.version,
                    "Requested version differs from the registered document"
                );
            }
        }

        let text = load_text()?;
        let chunks = self.chunker.split(&text);
        let total = chunks.len();
        info!(document = %document.identifier, chunks = total, "Split document into chunks");
        recorder.event(
            "Split document into chunks",
            Some(json!({
                "chunks": total,
                "text_chars": text.chars().count(),
                "window_size": self.config.window_size,
                "overlap": self.config.overlap,
            })),
        )?;

        let mut extractions = Vec::new();
        let mut failures = Vec::new();
        let mut skipped = 0;

        for (i, text) in chunks.iter().enumerate() {
            let index = u32::try_from(i)
                .map_err(|_| ExtractorError::Config(format!("chunk index {} out of range", i)))?;

            let (record, created) = lock(&self.store)?
                .get_or_create_chunk(document.id, index, text)
                .map_err(store_error)?;

            if record.processed {
                debug!(index, "Chunk already processed, skipping");
                skipped += 1;
                continue;
            }
            if !created && record.needs_retry() {
                debug!(index, attempts = record.attempts, "Retrying chunk");
            }

            let position = ChunkPosition { index: i, total };
            match self.process_chunk(recorder, text, position).await? {
                Ok(tags) => {
                    debug!(index, tags = tags.len(), "Chunk parsed");
                    extractions.push(ChunkExtraction {
                        chunk_index: index,
                        chunk_id: record.id,
                        tags,
                    });
                }
                Err(error) => {
                    let message = error.to_string();
                    lock(&self.store)?
                        .mark_failure(record.id, &message)
                        .map_err(store_error)?;
                    warn!(index, "Chunk failed: {}", message);

                    let event = match error.kind() {
                        ChunkErrorKind::Transport => "Failed to generate for chunk",
                        ChunkErrorKind::Malformed => "Failed to parse chunk",
                    };
                    recorder.event(event, Some(json!({ "index": index, "error": message })))?;

                    failures.push(ChunkFailure {
                        index,
                        kind: error.kind(),
                        message,
                    });
                }
            }
        }

        let outcome = merge(&extractions);
        for rejection in &outcome.rejections {
            warn!(
                chunk = rejection.chunk_index,
                tag = ?rejection.tag,
                "Dropped extracted entry: {}",
                rejection.reason
            );
            recorder.event("Rejected extracted entry", Some(serde_json::to_value(rejection)?))?;
        }

        // Parsed chunks are only marked processed once their tags are stored
        let summary = {
            let mut store = lock(&self.store)?;
            let summary = self
                .persister
                .persist(&mut *store, &outcome.tags, document.id)
                .map_err(store_error)?;
            for extraction in &extractions {
                store.mark_success(extraction.chunk_id).map_err(store_error)?;
            }
            summary
        };

        let succeeded = extractions.len();
        let report = RunReport {
            document: document.identifier.clone(),
            version: document.version.clone(),
            chunks_total: total,
            chunks_skipped: skipped,
            chunks_succeeded: succeeded,
            status: RunReport::status_for(succeeded, failures.len()),
            chunk_failures: failures,
            tags_extracted: outcome.tags.len(),
            tags_created: summary.tags_created,
            tags_reused: summary.tags_reused,
            conditions_added: summary.conditions_added,
            conditions_existing: summary.conditions_existing,
            rejected: outcome.rejections.len(),
        };

        info!(
            document = %report.document,
            succeeded = report.chunks_succeeded,
            failed = report.chunk_failures.len(),
            skipped = report.chunks_skipped,
            tags_created = report.tags_created,
            "Tag extraction finished"
        );
        recorder.event(
            "Tag extraction finished",
            Some(json!({
                "status": report.status,
                "chunks_succeeded": report.chunks_succeeded,
                "chunks_failed": report.chunk_failures.len(),
                "tags_extracted": report.tags_extracted,
            })),
        )?;

        Ok(report)
    }

    /// Generate and parse one chunk. The outer error aborts the run; the
    /// inner one only fails this chunk.
    async fn process_chunk(
        &self,
        recorder: &ExecutionRecorder<S>,
        text: &str,
        position: ChunkPosition,
    ) -> Result<Result<Vec<Value>, ChunkError>, ExtractorError> {
        let prompt = self.prompts.build(text, position);
        recorder.event(
            "Sending prompt to LLM",
            Some(json!({
                "index": position.index,
                "position": position.label(),
                "prompt_chars": prompt.chars().count(),
            })),
        )?;

        let response = match self.generate(prompt).await {
            Ok(response) => response,
            Err(error) => return Ok(Err(error)),
        };

        let preview: String = response
            .chars()
            .take(self.config.response_preview_chars)
            .collect();
        recorder.event(
            "Received LLM response",
            Some(json!({
                "index": position.index,
                "response_chars": response.chars().count(),
                "preview": preview,
            })),
        )?;

        Ok(sanitize_and_parse(&response))
    }

    /// Call the client on the blocking pool, bounded by the generation timeout
    ///
    /// On timeout the blocking thread is detached and ends when the provider's
    /// own client timeout fires.
    async fn generate(&self, prompt: String) -> Result<String, ChunkError> {
        let client = Arc::clone(&self.client);
        let call = tokio::task::spawn_blocking(move || {
            client
                .generate(&prompt)
                .map_err(|e| ChunkError::Transport(e.to_string()))
        });

        match timeout(self.config.generation_timeout(), call).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(ChunkError::Transport(format!(
                "generation task failed: {}",
                join_error
            ))),
            Err(_) => Err(ChunkError::Transport(format!(
                "generation timed out after {}s",
                self.config.generation_timeout_secs
            ))),
        }
    }
}

fn store_error(e: impl Display) -> ExtractorError {
    ExtractorError::Store(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinitag_llm::MockProvider;
    use clinitag_store::SqliteStore;

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ExtractorConfig {
            overlap: 600,
            ..ExtractorConfig::default()
        };
        let result = TagExtractor::new(
            MockProvider::new("[]"),
            SqliteStore::in_memory().unwrap(),
            config,
        );
        assert!(matches!(result, Err(ExtractorError::Config(_))));
    }

    #[test]
    fn test_custom_template_is_used() {
        let config = ExtractorConfig {
            prompt_template: Some("Trecho {{position}}: {{chunk}}".to_string()),
            ..ExtractorConfig::default()
        };
        let extractor = TagExtractor::new(
            MockProvider::new("[]"),
            SqliteStore::in_memory().unwrap(),
            config,
        )
        .unwrap();
        let prompt = extractor
            .prompts
            .build("PAS < 90", ChunkPosition { index: 0, total: 1 });
        assert_eq!(prompt, "Trecho Parte 1 de 1: PAS < 90");
    }
}
