//! Document upload, sync and listing.

use super::{object_storage, open_store};
use crate::cli::UploadArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use clinitag_domain::traits::DocumentStore;
use clinitag_extractor::{sync_documents, upload_document};
use std::fs::File;

/// Execute the upload command.
pub fn execute_upload(args: UploadArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let name = match args.name {
        Some(name) => name,
        None => args
            .file
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                CliError::InvalidInput(format!("Cannot derive a name from {}", args.file.display()))
            })?,
    };

    let mut file = File::open(&args.file)?;
    let storage = object_storage(config);
    let mut store = open_store(config)?;

    let (document, created) = upload_document(
        &storage,
        &mut store,
        &config.extractor.source_bucket,
        &name,
        &mut file,
    )?;

    if created {
        eprintln!("{}", formatter.success(&format!("Registered {}", document.identifier)));
    } else {
        eprintln!(
            "{}",
            formatter.info(&format!("{} was already registered; stored bytes replaced", document.identifier))
        );
    }
    println!("{}", formatter.format_documents(&[document])?);
    Ok(())
}

/// Execute the sync command.
pub fn execute_sync(config: &Config, formatter: &Formatter) -> Result<()> {
    let storage = object_storage(config);
    let mut store = open_store(config)?;

    let registered = sync_documents(&storage, &mut store, &config.extractor.source_bucket)?;
    eprintln!(
        "{}",
        formatter.info(&format!("{} new document(s) registered", registered.len()))
    );
    println!("{}", formatter.format_documents(&registered)?);
    Ok(())
}

/// Execute the documents command.
pub fn execute_documents(config: &Config, formatter: &Formatter) -> Result<()> {
    let store = open_store(config)?;
    let documents = store.list_documents()?;
    println!("{}", formatter.format_documents(&documents)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{quiet, temp_config};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_upload_registers_once() {
        let dir = TempDir::new().unwrap();
        let config = temp_config(&dir);
        let file = dir.path().join("infection_protocol__v2__sepse.txt");
        fs::write(&file, "Pressao sistolica abaixo de 90 mmHg").unwrap();

        for _ in 0..2 {
            let args = UploadArgs {
                file: file.clone(),
                name: None,
            };
            execute_upload(args, &config, &quiet()).unwrap();
        }

        let documents = open_store(&config).unwrap().list_documents().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].category, "infection_protocol");
        assert_eq!(documents[0].version, "v2");
    }

    #[test]
    fn test_upload_missing_file() {
        let dir = TempDir::new().unwrap();
        let args = UploadArgs {
            file: dir.path().join("absent.pdf"),
            name: None,
        };
        assert!(matches!(
            execute_upload(args, &temp_config(&dir), &quiet()),
            Err(CliError::Io(_))
        ));
    }

    #[test]
    fn test_sync_picks_up_stored_objects() {
        let dir = TempDir::new().unwrap();
        let config = temp_config(&dir);
        let bucket = config.storage_root.join(&config.extractor.source_bucket);
        fs::create_dir_all(&bucket).unwrap();
        fs::write(bucket.join("a.txt"), "a").unwrap();
        fs::write(bucket.join("b.txt"), "b").unwrap();

        execute_sync(&config, &quiet()).unwrap();
        execute_sync(&config, &quiet()).unwrap();

        let documents = open_store(&config).unwrap().list_documents().unwrap();
        assert_eq!(documents.len(), 2);
    }
}
