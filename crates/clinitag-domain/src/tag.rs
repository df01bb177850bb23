//! Tags - named clinical concepts extracted from protocols

use crate::{ChunkId, DocumentId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Database identifier of a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagId(pub i64);

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical identity of a tag name: trimmed and lowercased.
///
/// Tag names differing only in case or surrounding whitespace denote the
/// same tag.
///
/// # Examples
///
/// ```
/// use clinitag_domain::canonical_tag_key;
///
/// assert_eq!(canonical_tag_key("  Hipotensao "), "hipotensao");
/// ```
pub fn canonical_tag_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Display name for a tag that arrived without one: first letter uppercased,
/// the rest lowercased.
pub fn derive_display_name(name: &str) -> String {
    let mut chars = name.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// A persisted tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Database identifier
    pub id: TagId,

    /// Name as first seen
    pub name: String,

    /// Canonical key (unique)
    pub canonical_key: String,

    /// Human-readable label
    pub display_name: String,

    /// Free-text description
    pub description: String,

    /// Tag category
    pub category: String,

    /// Whether the tag participates in evaluation
    pub is_active: bool,

    /// Document the tag was first extracted from
    pub document: Option<DocumentId>,

    /// Chunk the tag was first extracted from
    pub chunk: Option<ChunkId>,

    /// Creation timestamp (seconds since Unix epoch)
    pub created_at: u64,
}

/// Attributes used when a tag is created for the first time
///
/// If a tag with the same canonical key already exists, none of these
/// fields are applied; the existing row wins.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTag {
    /// Tag name, as extracted
    pub name: String,
    /// Display name
    pub display_name: String,
    /// Description
    pub description: String,
    /// Category
    pub category: String,
    /// Provenance document
    pub document: Option<DocumentId>,
    /// Provenance chunk
    pub chunk: Option<ChunkId>,
}

impl NewTag {
    /// Canonical key of this tag's name
    pub fn canonical_key(&self) -> String {
        canonical_tag_key(&self.name)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: canonicalization is idempotent
        #[test]
        fn test_canonical_key_idempotent(name in "\\PC{0,40}") {
            let once = canonical_tag_key(&name);
            prop_assert_eq!(canonical_tag_key(&once), once);
        }

        /// Property: padding and case never change the canonical key
        #[test]
        fn test_canonical_key_ignores_padding(name in "[a-zA-Z_]{1,20}", pad in " {0,3}") {
            let padded = format!("{pad}{}{pad}", name.to_uppercase());
            prop_assert_eq!(canonical_tag_key(&padded), canonical_tag_key(&name));
        }
    }
}
