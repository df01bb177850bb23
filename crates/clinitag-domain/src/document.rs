//! Source documents (clinical protocols)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category assigned to objects whose name carries no category segment
pub const FALLBACK_CATEGORY: &str = "other";

/// Version assigned to objects whose name carries no version segment
pub const FALLBACK_VERSION: &str = "v1";

/// Database identifier of a registered document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub i64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered protocol document
///
/// Documents are immutable once stored. Chunks and tags reference them for
/// provenance; the extraction pipeline only ever reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Database identifier
    pub id: DocumentId,

    /// Object path in the source bucket (unique)
    pub identifier: String,

    /// Display name (the file name)
    pub name: String,

    /// Protocol category (e.g. "infection_protocol")
    pub category: String,

    /// Document version label (e.g. "v2")
    pub version: String,

    /// When the document was registered (seconds since Unix epoch)
    pub uploaded_at: u64,
}

/// Everything needed to register a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDescriptor {
    /// Object path in the source bucket
    pub identifier: String,

    /// Display name
    pub name: String,

    /// Protocol category
    pub category: String,

    /// Version label
    pub version: String,
}

impl DocumentDescriptor {
    /// Derive a descriptor from an object path.
    ///
    /// Object names follow the `category__version__rest.ext` convention, e.g.
    /// `infection_protocol__v2__sepse.pdf`. Names that do not carry both
    /// segments fall back to category `other` and version `v1`.
    ///
    /// # Examples
    ///
    /// ```
    /// use clinitag_domain::DocumentDescriptor;
    ///
    /// let d = DocumentDescriptor::from_object_path("uploads/flowchart__v3__sepse.pdf");
    /// assert_eq!(d.name, "flowchart__v3__sepse.pdf");
    /// assert_eq!(d.category, "flowchart");
    /// assert_eq!(d.version, "v3");
    /// ```
    pub fn from_object_path(path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        let parts: Vec<&str> = name.split("__").collect();

        let (category, version) = if parts.len() >= 3 && !parts[0].is_empty() && !parts[1].is_empty() {
            (parts[0].to_string(), parts[1].to_string())
        } else {
            (FALLBACK_CATEGORY.to_string(), FALLBACK_VERSION.to_string())
        };

        Self {
            identifier: path.to_string(),
            name,
            category,
            version,
        }
    }

    /// Override the version label
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_conventional_name() {
        let d = DocumentDescriptor::from_object_path("institutional_protocol__v2__abc.pdf");
        assert_eq!(d.identifier, "institutional_protocol__v2__abc.pdf");
        assert_eq!(d.category, "institutional_protocol");
        assert_eq!(d.version, "v2");
    }

    #[test]
    fn test_descriptor_strips_directories_from_name() {
        let d = DocumentDescriptor::from_object_path("a/b/flowchart__v1__x.pdf");
        assert_eq!(d.identifier, "a/b/flowchart__v1__x.pdf");
        assert_eq!(d.name, "flowchart__v1__x.pdf");
    }

    #[test]
    fn test_descriptor_fallback_for_plain_name() {
        let d = DocumentDescriptor::from_object_path("sepse.pdf");
        assert_eq!(d.category, FALLBACK_CATEGORY);
        assert_eq!(d.version, FALLBACK_VERSION);
    }

    #[test]
    fn test_descriptor_with_version() {
        let d = DocumentDescriptor::from_object_path("sepse.pdf").with_version("v7");
        assert_eq!(d.version, "v7");
    }
}
