//! Clinitag Storage Layer
//!
//! SQLite implementation of every store trait in `clinitag-domain`:
//! documents, the chunk ledger, tags with their conditions, and execution
//! logs.
//!
//! # Concurrency
//!
//! Get-or-create operations are `INSERT ... ON CONFLICT DO NOTHING` followed
//! by a `SELECT`, so two connections racing on the same key both end up with
//! the single row the unique constraint allows. Ledger outcomes are single
//! `UPDATE` statements that set the outcome and bump `attempts` together.
//!
//! # Examples
//!
//! ```
//! use clinitag_store::SqliteStore;
//! use clinitag_domain::DocumentDescriptor;
//! use clinitag_domain::traits::DocumentStore;
//!
//! let mut store = SqliteStore::in_memory().unwrap();
//! let descriptor = DocumentDescriptor::from_object_path("flowchart__v1__sepse.pdf");
//! let (document, created) = store.register_document(&descriptor).unwrap();
//! assert!(created);
//! assert_eq!(document.category, "flowchart");
//! ```

#![warn(missing_docs)]

mod chunks;
mod documents;
mod executions;
mod tags;

use clinitag_domain::traits::Storage;
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// How long a writer waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// JSON column could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Execution log is no longer running
    #[error("Execution log {0} is already finalized")]
    AlreadyFinalized(i64),
}

/// SQLite-based store
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share one store behind a mutex,
/// or open one store per thread against the same database file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use clinitag_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("clinitag.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // WAL lets readers proceed while another run holds the write lock
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }
}

impl Storage for SqliteStore {
    type Error = StoreError;
}

/// Seconds since the Unix epoch
pub(crate) fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs() as i64
}

/// Milliseconds since the Unix epoch
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as i64
}

/// Wrap a decoding failure so it can be returned from a row mapper
pub(crate) fn conversion_error(
    column: usize,
    kind: rusqlite::types::Type,
    err: StoreError,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, kind, Box::new(err))
}
