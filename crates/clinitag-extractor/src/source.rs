//! Local collaborators for source documents
//!
//! `LocalObjectStorage` keeps one directory per bucket under a root
//! directory. `FileTextExtractor` reads PDFs through `pdf-extract` and any
//! other file as UTF-8 text.

use clinitag_domain::traits::{ObjectStorage, TextExtractor};
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from the local source collaborators
#[derive(Error, Debug)]
pub enum SourceError {
    /// Filesystem failure
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Bucket or object name that would escape the storage root
    #[error("Invalid object name: {0}")]
    InvalidName(String),

    /// Object does not exist
    #[error("Object not found: {bucket}/{name}")]
    NotFound {
        /// Bucket
        bucket: String,
        /// Object name
        name: String,
    },

    /// PDF text extraction failed
    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    /// Non-PDF file that is not valid UTF-8
    #[error("File is not UTF-8 text: {0}")]
    NotText(PathBuf),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> SourceError + '_ {
    move |source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Object storage backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
}

impl LocalObjectStorage {
    /// Storage rooted at `root`; bucket directories are created on demand
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, SourceError> {
        if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
            return Err(SourceError::InvalidName(bucket.to_string()));
        }
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, name: &str) -> Result<PathBuf, SourceError> {
        let relative = Path::new(name);
        let is_plain = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(SourceError::InvalidName(name.to_string()));
        }
        Ok(self.bucket_dir(bucket)?.join(relative))
    }
}

impl ObjectStorage for LocalObjectStorage {
    type Error = SourceError;

    fn upload(&self, bucket: &str, name: &str, data: &mut dyn Read) -> Result<(), Self::Error> {
        let path = self.object_path(bucket, name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let mut file = fs::File::create(&path).map_err(io_error(&path))?;
        let bytes = io::copy(data, &mut file).map_err(io_error(&path))?;
        debug!(bucket, name, bytes, "Stored object");
        Ok(())
    }

    fn download(&self, bucket: &str, name: &str) -> Result<PathBuf, Self::Error> {
        let path = self.object_path(bucket, name)?;
        if !path.is_file() {
            return Err(SourceError::NotFound {
                bucket: bucket.to_string(),
                name: name.to_string(),
            });
        }
        Ok(path)
    }

    fn list(&self, bucket: &str) -> Result<Vec<String>, Self::Error> {
        let dir = self.bucket_dir(bucket)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        collect_files(&dir, &dir, &mut names)?;
        names.sort();
        Ok(names)
    }
}

fn collect_files(base: &Path, dir: &Path, names: &mut Vec<String>) -> Result<(), SourceError> {
    for entry in fs::read_dir(dir).map_err(io_error(dir))? {
        let entry = entry.map_err(io_error(dir))?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(base, &path, names)?;
        } else if let Ok(relative) = path.strip_prefix(base) {
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            names.push(parts.join("/"));
        }
    }
    Ok(())
}

/// Extracts text from PDFs and plain-text files
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTextExtractor;

impl TextExtractor for FileTextExtractor {
    type Error = SourceError;

    fn extract_text(&self, path: &Path) -> Result<String, Self::Error> {
        let bytes = fs::read(path).map_err(io_error(path))?;

        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
            || bytes.starts_with(b"%PDF");

        if is_pdf {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| SourceError::Pdf(e.to_string()))
        } else {
            String::from_utf8(bytes).map_err(|_| SourceError::NotText(path.to_path_buf()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_upload_download_list() {
        let dir = TempDir::new().unwrap();
        let storage = LocalObjectStorage::new(dir.path());

        storage
            .upload("protocols", "sepse__v2__adulto.txt", &mut "PAS < 90".as_bytes())
            .unwrap();
        storage
            .upload("protocols", "renal/lra__v1__x.txt", &mut "creatinina".as_bytes())
            .unwrap();

        let path = storage.download("protocols", "sepse__v2__adulto.txt").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "PAS < 90");

        assert_eq!(
            storage.list("protocols").unwrap(),
            vec!["renal/lra__v1__x.txt", "sepse__v2__adulto.txt"]
        );
        assert!(storage.list("empty").unwrap().is_empty());
    }

    #[test]
    fn test_missing_object() {
        let dir = TempDir::new().unwrap();
        let storage = LocalObjectStorage::new(dir.path());
        assert!(matches!(
            storage.download("protocols", "nada.pdf"),
            Err(SourceError::NotFound { .. })
        ));
    }

    #[test]
    fn test_names_cannot_escape_root() {
        let dir = TempDir::new().unwrap();
        let storage = LocalObjectStorage::new(dir.path());
        for name in ["../x.txt", "/etc/passwd", "", "a/../../b"] {
            assert!(
                matches!(storage.download("protocols", name), Err(SourceError::InvalidName(_))),
                "{name} should be rejected"
            );
        }
        assert!(matches!(storage.list(".."), Err(SourceError::InvalidName(_))));
    }

    #[test]
    fn test_plain_text_extraction() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("protocolo.txt");
        fs::write(&path, "Lactato > 2 mmol/L").unwrap();
        assert_eq!(FileTextExtractor.extract_text(&path).unwrap(), "Lactato > 2 mmol/L");
    }

    #[test]
    fn test_binary_non_pdf_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("imagem.bin");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x81]).unwrap();
        assert!(matches!(
            FileTextExtractor.extract_text(&path),
            Err(SourceError::NotText(_))
        ));
    }
}
