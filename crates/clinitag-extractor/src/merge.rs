//! Cross-chunk tag deduplication
//!
//! Overlapping windows mean the same tag is usually extracted from several
//! chunks. Merging keys tags by canonical name: the earliest chunk decides
//! the display fields and provenance, and conditions from every chunk are
//! unioned by their canonical serialization.

use crate::validate::{validate_tag, RejectionReason};
use clinitag_domain::{canonical_tag_key, ChunkId, Condition};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Raw tag objects parsed from one chunk's response
#[derive(Debug, Clone)]
pub struct ChunkExtraction {
    /// Chunk position within the document
    pub chunk_index: u32,
    /// Ledger record of the chunk
    pub chunk_id: ChunkId,
    /// Parsed array elements
    pub tags: Vec<Value>,
}

/// One tag after merging
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTag {
    /// Canonical key
    pub key: String,
    /// Name as first seen
    pub name: String,
    /// Display name from the first occurrence
    pub display_name: Option<String>,
    /// Description from the first occurrence
    pub description: Option<String>,
    /// Category from the first occurrence
    pub category: Option<String>,
    /// Chunk of the first occurrence
    pub source_chunk: ChunkId,
    /// Index of that chunk
    pub source_index: u32,
    /// Distinct conditions, ordered by canonical key
    pub conditions: Vec<Condition>,
}

/// A dropped tag or condition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    /// Chunk the rejected object came from
    pub chunk_index: u32,
    /// Owning tag, when the tag itself survived
    pub tag: Option<String>,
    /// What was wrong
    pub reason: RejectionReason,
}

/// Result of a merge pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Canonical tags, ordered by key
    pub tags: Vec<CanonicalTag>,
    /// Everything validation dropped, in chunk order
    pub rejections: Vec<Rejection>,
}

struct Accumulator {
    tag: CanonicalTag,
    conditions: BTreeMap<String, Condition>,
}

/// Merge per-chunk extractions into one canonical tag set
///
/// The result does not depend on the order of `extractions`.
pub fn merge(extractions: &[ChunkExtraction]) -> MergeOutcome {
    let mut ordered: Vec<&ChunkExtraction> = extractions.iter().collect();
    ordered.sort_by_key(|e| e.chunk_index);

    let mut merged: BTreeMap<String, Accumulator> = BTreeMap::new();
    let mut rejections = Vec::new();

    for extraction in ordered {
        for raw in &extraction.tags {
            let (candidate, reasons) = validate_tag(raw);
            let tag_name = candidate.as_ref().map(|c| c.name.clone());
            rejections.extend(reasons.into_iter().map(|reason| Rejection {
                chunk_index: extraction.chunk_index,
                tag: tag_name.clone(),
                reason,
            }));

            let Some(candidate) = candidate else {
                continue;
            };

            let key = canonical_tag_key(&candidate.name);
            let entry = merged.entry(key.clone()).or_insert_with(|| Accumulator {
                tag: CanonicalTag {
                    key,
                    name: candidate.name.clone(),
                    display_name: candidate.display_name.clone(),
                    description: candidate.description.clone(),
                    category: candidate.category.clone(),
                    source_chunk: extraction.chunk_id,
                    source_index: extraction.chunk_index,
                    conditions: Vec::new(),
                },
                conditions: BTreeMap::new(),
            });

            for condition in candidate.conditions {
                entry
                    .conditions
                    .entry(condition.canonical_key())
                    .or_insert(condition);
            }
        }
    }

    let tags = merged
        .into_values()
        .map(|acc| CanonicalTag {
            conditions: acc.conditions.into_values().collect(),
            ..acc.tag
        })
        .collect();

    MergeOutcome { tags, rejections }
}
