use crate::{conversion_error, now_secs, SqliteStore, StoreError};
use clinitag_domain::traits::TagStore;
use clinitag_domain::{
    canonical_tag_key, ChunkId, ComparisonOperator, Condition, ConditionKind, DocumentId,
    EventCondition, FieldCondition, NaturalLanguageCondition, NewTag, Tag, TagId, TagReference,
};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

const TAG_COLUMNS: &str = "id, name, canonical_key, display_name, description, category, \
                           is_active, document_id, chunk_id, created_at";

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: TagId(row.get(0)?),
        name: row.get(1)?,
        canonical_key: row.get(2)?,
        display_name: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        is_active: row.get(6)?,
        document: row.get::<_, Option<i64>>(7)?.map(DocumentId),
        chunk: row.get::<_, Option<i64>>(8)?.map(ChunkId),
        created_at: row.get::<_, i64>(9)? as u64,
    })
}

/// Flattened column values of one condition row
struct ConditionColumns<'a> {
    name: &'a str,
    field_path: Option<&'a str>,
    operator: Option<&'static str>,
    value: Option<f64>,
    status: Option<&'a str>,
    time_relation: Option<&'a str>,
    expression: Option<&'a str>,
}

impl<'a> ConditionColumns<'a> {
    fn of(condition: &'a Condition) -> Self {
        let base = ConditionColumns {
            name: condition.stored_name(),
            field_path: None,
            operator: None,
            value: None,
            status: None,
            time_relation: None,
            expression: None,
        };
        match condition {
            Condition::Field(c) => ConditionColumns {
                field_path: c.field_path.as_deref(),
                operator: c.operator.map(|op| op.as_str()),
                value: c.value,
                ..base
            },
            Condition::Tag(_) => base,
            Condition::Event(c) => ConditionColumns {
                status: c.status.as_deref(),
                time_relation: c.time_relation.as_deref(),
                ..base
            },
            Condition::NaturalLanguage(c) => ConditionColumns {
                expression: Some(c.expression.as_str()),
                ..base
            },
        }
    }
}

fn condition_from_row(row: &Row<'_>) -> rusqlite::Result<Condition> {
    let kind_str: String = row.get(0)?;
    let kind = ConditionKind::parse(&kind_str).ok_or_else(|| {
        conversion_error(
            0,
            Type::Text,
            StoreError::InvalidData(format!("Unknown condition type: {}", kind_str)),
        )
    })?;
    let name: String = row.get(1)?;

    let condition = match kind {
        ConditionKind::Field => {
            let operator = match row.get::<_, Option<String>>(3)? {
                Some(op) => Some(ComparisonOperator::parse(&op).ok_or_else(|| {
                    conversion_error(
                        3,
                        Type::Text,
                        StoreError::InvalidData(format!("Unknown operator: {}", op)),
                    )
                })?),
                None => None,
            };
            Condition::Field(FieldCondition {
                name,
                field_path: row.get(2)?,
                operator,
                value: row.get(4)?,
            })
        }
        ConditionKind::Tag => Condition::Tag(TagReference { name }),
        ConditionKind::Event => Condition::Event(EventCondition {
            name,
            status: row.get(5)?,
            time_relation: row.get(6)?,
        }),
        ConditionKind::NaturalLanguage => {
            let expression: Option<String> = row.get(7)?;
            Condition::NaturalLanguage(NaturalLanguageCondition {
                expression: expression.unwrap_or_default(),
            })
        }
    };
    Ok(condition)
}

impl TagStore for SqliteStore {
    fn get_or_create_tag(&mut self, tag: &NewTag) -> Result<(Tag, bool), Self::Error> {
        let key = tag.canonical_key();
        if key.is_empty() {
            return Err(StoreError::InvalidData("Tag name is empty".to_string()));
        }

        let inserted = self.conn.execute(
            "INSERT INTO tags (name, canonical_key, display_name, description, category,
                               is_active, document_id, chunk_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7, ?8)
             ON CONFLICT(canonical_key) DO NOTHING",
            params![
                tag.name.trim(),
                &key,
                &tag.display_name,
                &tag.description,
                &tag.category,
                tag.document.map(|d| d.0),
                tag.chunk.map(|c| c.0),
                now_secs(),
            ],
        )?;

        let stored = self
            .conn
            .query_row(
                &format!("SELECT {TAG_COLUMNS} FROM tags WHERE canonical_key = ?1"),
                params![&key],
                tag_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("tag {}", key)))?;

        Ok((stored, inserted == 1))
    }

    fn add_condition(&mut self, tag: TagId, condition: &Condition) -> Result<bool, Self::Error> {
        let columns = ConditionColumns::of(condition);
        let inserted = self.conn.execute(
            "INSERT INTO tag_conditions (tag_id, condition_type, name, field_path, operator, value,
                                         status, time_relation, expression, canonical_key, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(tag_id, canonical_key) DO NOTHING",
            params![
                tag.0,
                condition.kind().as_str(),
                columns.name,
                columns.field_path,
                columns.operator,
                columns.value,
                columns.status,
                columns.time_relation,
                columns.expression,
                condition.canonical_key(),
                now_secs(),
            ],
        )?;
        Ok(inserted == 1)
    }

    fn find_tag(&self, name: &str) -> Result<Option<Tag>, Self::Error> {
        let tag = self
            .conn
            .query_row(
                &format!("SELECT {TAG_COLUMNS} FROM tags WHERE canonical_key = ?1"),
                params![canonical_tag_key(name)],
                tag_from_row,
            )
            .optional()?;
        Ok(tag)
    }

    fn list_tags(&self, category: Option<&str>) -> Result<Vec<Tag>, Self::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TAG_COLUMNS} FROM tags
             WHERE ?1 IS NULL OR category = ?1
             ORDER BY canonical_key"
        ))?;
        let tags = stmt
            .query_map(params![category], tag_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    fn conditions_for(&self, tag: TagId) -> Result<Vec<Condition>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT condition_type, name, field_path, operator, value, status, time_relation, expression
             FROM tag_conditions WHERE tag_id = ?1 ORDER BY id",
        )?;
        let conditions = stmt
            .query_map(params![tag.0], condition_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(conditions)
    }
}
