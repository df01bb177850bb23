//! Extract command implementation.

use super::{object_storage, open_store};
use crate::cli::ExtractArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use crate::provider::Provider;
use clinitag_domain::traits::ExtractionClient;
use clinitag_extractor::{FileTextExtractor, ProtocolJob, RunReport, TagExtractor};
use std::fmt::Display;
use tracing::info;

/// Execute the extract command.
pub async fn execute_extract(args: ExtractArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let provider = Provider::from_settings(&config.llm)?;
    info!(model = provider.model(), "Using generation backend");

    let report = run_extraction(provider, &args, config).await?;
    println!("{}", formatter.format_report(&report)?);
    Ok(())
}

/// Run one protocol job against the configured store and object storage.
pub async fn run_extraction<L>(client: L, args: &ExtractArgs, config: &Config) -> Result<RunReport>
where
    L: ExtractionClient + Send + Sync + 'static,
    L::Error: Display,
{
    let store = open_store(config)?;
    let extractor = TagExtractor::new(client, store, config.extractor.clone())?;
    let job = ProtocolJob::new(extractor, object_storage(config), FileTextExtractor);

    Ok(job.run(&args.document, args.version.as_deref()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::UploadArgs;
    use crate::commands::execute_upload;
    use crate::commands::testing::{quiet, temp_config};
    use crate::error::CliError;
    use clinitag_domain::traits::{ChunkLedger, DocumentStore, TagStore};
    use clinitag_extractor::{ExtractorError, ReportStatus};
    use clinitag_llm::MockProvider;
    use std::fs;
    use tempfile::TempDir;

    const PROTOCOL: &str = "Sepse grave com pressao sistolica abaixo de noventa exige reposicao volemica imediata";

    fn uploaded_config(dir: &TempDir) -> Config {
        let mut config = temp_config(dir);
        config.extractor.window_size = 6;
        config.extractor.overlap = 2;
        config.extractor.generation_timeout_secs = 5;

        let file = dir.path().join("infection_protocol__v2__sepse.txt");
        fs::write(&file, PROTOCOL).unwrap();
        execute_upload(UploadArgs { file, name: None }, &config, &quiet()).unwrap();
        config
    }

    fn args() -> ExtractArgs {
        ExtractArgs {
            document: "infection_protocol__v2__sepse.txt".to_string(),
            version: Some("v2".to_string()),
        }
    }

    #[tokio::test]
    async fn test_extract_persists_tags() {
        let dir = TempDir::new().unwrap();
        let config = uploaded_config(&dir);
        let provider = MockProvider::new(
            r#"[{"name": "hipotensao", "conditions": [{"type": "field", "name": "pressao_sistolica", "operator": "<", "value": 90}]}]"#,
        );

        let report = run_extraction(provider, &args(), &config).await.unwrap();
        assert_eq!(report.status, ReportStatus::Complete);
        assert_eq!(report.tags_created, 1);

        let store = open_store(&config).unwrap();
        let tag = store.find_tag("hipotensao").unwrap().unwrap();
        assert_eq!(store.conditions_for(tag.id).unwrap().len(), 1);

        let document = store.find_document(&args().document).unwrap().unwrap();
        let chunks = store.list_chunks(document.id).unwrap();
        assert_eq!(chunks.len(), report.chunks_total);
        assert!(chunks.iter().all(|c| c.processed));
    }

    #[tokio::test]
    async fn test_extract_unknown_document() {
        let dir = TempDir::new().unwrap();
        let config = temp_config(&dir);
        let result = run_extraction(MockProvider::default(), &args(), &config).await;
        assert!(matches!(
            result,
            Err(CliError::Extractor(ExtractorError::DocumentNotFound(_)))
        ));
    }
}
