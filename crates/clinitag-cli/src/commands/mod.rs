//! Command implementations.

pub mod documents;
pub mod extract;
pub mod inspect;

pub use self::documents::{execute_documents, execute_sync, execute_upload};
pub use self::extract::execute_extract;
pub use self::inspect::{execute_chunks, execute_events, execute_runs, execute_tags};

use crate::config::Config;
use crate::error::Result;
use clinitag_extractor::LocalObjectStorage;
use clinitag_store::SqliteStore;
use std::fs;

/// Open the configured database, creating its directory on first use.
pub fn open_store(config: &Config) -> Result<SqliteStore> {
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(SqliteStore::new(&config.database_path)?)
}

/// Object storage rooted at the configured directory.
pub fn object_storage(config: &Config) -> LocalObjectStorage {
    LocalObjectStorage::new(&config.storage_root)
}
