use crate::{now_secs, SqliteStore, StoreError};
use clinitag_domain::traits::ChunkLedger;
use clinitag_domain::{ChunkId, ChunkRecord, DocumentId};
use rusqlite::{params, OptionalExtension, Row};

const CHUNK_COLUMNS: &str =
    "id, document_id, chunk_index, text, processed, attempts, last_error, created_at, updated_at";

fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<ChunkRecord> {
    Ok(ChunkRecord {
        id: ChunkId(row.get(0)?),
        document: DocumentId(row.get(1)?),
        index: row.get(2)?,
        text: row.get(3)?,
        processed: row.get(4)?,
        attempts: row.get(5)?,
        last_error: row.get(6)?,
        created_at: row.get::<_, i64>(7)? as u64,
        updated_at: row.get::<_, i64>(8)? as u64,
    })
}

impl SqliteStore {
    fn chunk_by_id(&self, chunk: ChunkId) -> Result<ChunkRecord, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {CHUNK_COLUMNS} FROM document_chunks WHERE id = ?1"),
                params![chunk.0],
                chunk_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("chunk {}", chunk)))
    }
}

impl ChunkLedger for SqliteStore {
    fn get_or_create_chunk(
        &mut self,
        document: DocumentId,
        index: u32,
        text: &str,
    ) -> Result<(ChunkRecord, bool), Self::Error> {
        let now = now_secs();
        let inserted = self.conn.execute(
            "INSERT INTO document_chunks (document_id, chunk_index, text, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(document_id, chunk_index) DO NOTHING",
            params![document.0, index, text, now],
        )?;

        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT {CHUNK_COLUMNS} FROM document_chunks
                     WHERE document_id = ?1 AND chunk_index = ?2"
                ),
                params![document.0, index],
                chunk_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("chunk {}#{}", document, index)))?;

        Ok((record, inserted == 1))
    }

    fn mark_success(&mut self, chunk: ChunkId) -> Result<ChunkRecord, Self::Error> {
        let updated = self.conn.execute(
            "UPDATE document_chunks
             SET processed = 1, last_error = NULL, attempts = attempts + 1, updated_at = ?2
             WHERE id = ?1",
            params![chunk.0, now_secs()],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("chunk {}", chunk)));
        }
        self.chunk_by_id(chunk)
    }

    fn mark_failure(&mut self, chunk: ChunkId, error: &str) -> Result<ChunkRecord, Self::Error> {
        let updated = self.conn.execute(
            "UPDATE document_chunks
             SET processed = 0, last_error = ?2, attempts = attempts + 1, updated_at = ?3
             WHERE id = ?1",
            params![chunk.0, error, now_secs()],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("chunk {}", chunk)));
        }
        self.chunk_by_id(chunk)
    }

    fn list_chunks(&self, document: DocumentId) -> Result<Vec<ChunkRecord>, Self::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CHUNK_COLUMNS} FROM document_chunks WHERE document_id = ?1 ORDER BY chunk_index"
        ))?;
        let chunks = stmt
            .query_map(params![document.0], chunk_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(chunks)
    }
}
