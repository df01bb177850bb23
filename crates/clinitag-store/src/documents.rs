use crate::{now_secs, SqliteStore, StoreError};
use clinitag_domain::traits::DocumentStore;
use clinitag_domain::{Document, DocumentDescriptor, DocumentId};
use rusqlite::{params, OptionalExtension, Row};

const DOCUMENT_COLUMNS: &str = "id, identifier, name, category, version, uploaded_at";

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: DocumentId(row.get(0)?),
        identifier: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        version: row.get(4)?,
        uploaded_at: row.get::<_, i64>(5)? as u64,
    })
}

impl DocumentStore for SqliteStore {
    fn register_document(
        &mut self,
        descriptor: &DocumentDescriptor,
    ) -> Result<(Document, bool), Self::Error> {
        let inserted = self.conn.execute(
            "INSERT INTO documents (identifier, name, category, version, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(identifier) DO NOTHING",
            params![
                &descriptor.identifier,
                &descriptor.name,
                &descriptor.category,
                &descriptor.version,
                now_secs(),
            ],
        )?;

        let document = self
            .find_document(&descriptor.identifier)?
            .ok_or_else(|| StoreError::NotFound(format!("document {}", descriptor.identifier)))?;

        Ok((document, inserted == 1))
    }

    fn find_document(&self, identifier: &str) -> Result<Option<Document>, Self::Error> {
        let document = self
            .conn
            .query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE identifier = ?1"),
                params![identifier],
                document_from_row,
            )
            .optional()?;
        Ok(document)
    }

    fn list_documents(&self) -> Result<Vec<Document>, Self::Error> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY id"))?;
        let documents = stmt
            .query_map([], document_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(documents)
    }
}
