//! Writing canonical tags to the tag store

use crate::merge::CanonicalTag;
use clinitag_domain::traits::TagStore;
use clinitag_domain::{derive_display_name, DocumentId, NewTag};
use serde::Serialize;
use tracing::debug;

/// Counts from one persistence pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistSummary {
    /// Tags created by this pass
    pub tags_created: usize,
    /// Tags that already existed
    pub tags_reused: usize,
    /// Conditions newly attached
    pub conditions_added: usize,
    /// Conditions that were already attached
    pub conditions_existing: usize,
}

/// Get-or-creates tags and attaches their conditions
///
/// Never updates an existing tag or condition. Provenance and display fields
/// only take effect when a tag is created.
#[derive(Debug, Clone)]
pub struct Persister {
    default_category: String,
}

impl Persister {
    /// Create a persister that files uncategorized tags under `default_category`
    pub fn new(default_category: impl Into<String>) -> Self {
        Self {
            default_category: default_category.into(),
        }
    }

    /// Persist every tag of a merge pass extracted from `document`
    pub fn persist<S: TagStore>(
        &self,
        store: &mut S,
        tags: &[CanonicalTag],
        document: DocumentId,
    ) -> Result<PersistSummary, S::Error> {
        let mut summary = PersistSummary::default();

        for canonical in tags {
            let new_tag = self.new_tag(canonical, document);
            let (tag, created) = store.get_or_create_tag(&new_tag)?;
            if created {
                summary.tags_created += 1;
            } else {
                summary.tags_reused += 1;
            }

            for condition in &canonical.conditions {
                if store.add_condition(tag.id, condition)? {
                    summary.conditions_added += 1;
                } else {
                    summary.conditions_existing += 1;
                }
            }

            debug!(
                tag = %tag.canonical_key,
                created,
                conditions = canonical.conditions.len(),
                "Persisted tag"
            );
        }

        Ok(summary)
    }

    fn new_tag(&self, canonical: &CanonicalTag, document: DocumentId) -> NewTag {
        NewTag {
            name: canonical.name.clone(),
            display_name: canonical
                .display_name
                .clone()
                .unwrap_or_else(|| derive_display_name(&canonical.name)),
            description: canonical.description.clone().unwrap_or_default(),
            category: canonical
                .category
                .clone()
                .unwrap_or_else(|| self.default_category.clone()),
            document: Some(document),
            chunk: Some(canonical.source_chunk),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinitag_domain::{ChunkId, Condition, TagReference};
    use clinitag_domain::traits::{ChunkLedger, DocumentStore};
    use clinitag_domain::DocumentDescriptor;
    use clinitag_store::SqliteStore;

    fn setup() -> (SqliteStore, DocumentId, ChunkId) {
        let mut store = SqliteStore::in_memory().unwrap();
        let (doc, _) = store
            .register_document(&DocumentDescriptor::from_object_path("sepse__v1__protocolo.pdf"))
            .unwrap();
        let (chunk, _) = store.get_or_create_chunk(doc.id, 0, "texto").unwrap();
        (store, doc.id, chunk.id)
    }

    fn canonical(name: &str, chunk: ChunkId, conditions: Vec<Condition>) -> CanonicalTag {
        CanonicalTag {
            key: name.to_lowercase(),
            name: name.to_string(),
            display_name: None,
            description: None,
            category: None,
            source_chunk: chunk,
            source_index: 0,
            conditions,
        }
    }

    fn tag_ref(name: &str) -> Condition {
        Condition::Tag(TagReference { name: name.to_string() })
    }

    #[test]
    fn test_defaults_applied_on_create() {
        let (mut store, doc, chunk) = setup();
        let persister = Persister::new("default");

        let summary = persister
            .persist(&mut store, &[canonical("HIPOTENSAO", chunk, vec![])], doc)
            .unwrap();
        assert_eq!(summary.tags_created, 1);

        let tag = store.find_tag("hipotensao").unwrap().unwrap();
        assert_eq!(tag.display_name, "Hipotensao");
        assert_eq!(tag.category, "default");
        assert_eq!(tag.description, "");
        assert_eq!(tag.document, Some(doc));
        assert_eq!(tag.chunk, Some(chunk));
        assert!(tag.is_active);
    }

    #[test]
    fn test_second_pass_reuses_and_counts_existing_conditions() {
        let (mut store, doc, chunk) = setup();
        let persister = Persister::new("default");
        let tags = [canonical("sepse", chunk, vec![tag_ref("febre"), tag_ref("hipotensao")])];

        let first = persister.persist(&mut store, &tags, doc).unwrap();
        assert_eq!(first.conditions_added, 2);

        let tags = [canonical(
            "Sepse",
            chunk,
            vec![tag_ref("febre"), tag_ref("taquicardia")],
        )];
        let second = persister.persist(&mut store, &tags, doc).unwrap();
        assert_eq!(
            second,
            PersistSummary {
                tags_created: 0,
                tags_reused: 1,
                conditions_added: 1,
                conditions_existing: 1,
            }
        );

        let tag = store.find_tag("sepse").unwrap().unwrap();
        assert_eq!(store.conditions_for(tag.id).unwrap().len(), 3);
    }

    #[test]
    fn test_existing_provenance_is_kept() {
        let (mut store, doc, chunk) = setup();
        let (other, _) = store
            .register_document(&DocumentDescriptor::from_object_path("renal__v2__lra.pdf"))
            .unwrap();
        let (other_chunk, _) = store.get_or_create_chunk(other.id, 0, "outro").unwrap();
        let persister = Persister::new("default");

        persister.persist(&mut store, &[canonical("febre", chunk, vec![])], doc).unwrap();
        persister
            .persist(&mut store, &[canonical("febre", other_chunk.id, vec![])], other.id)
            .unwrap();

        let tag = store.find_tag("febre").unwrap().unwrap();
        assert_eq!(tag.document, Some(doc));
        assert_eq!(tag.chunk, Some(chunk));
    }
}
