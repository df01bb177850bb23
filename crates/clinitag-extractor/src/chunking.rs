//! Overlapping word-window chunking
//!
//! Chunk `i` covers words `[i * stride, i * stride + window_size)` with
//! `stride = window_size - overlap`. Output depends only on the text and the
//! two parameters, which is what makes a chunk's index a stable identifier
//! across runs.

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;

/// Splits text into overlapping word windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    window_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker. `overlap` must be strictly below `window_size`,
    /// otherwise the window would never advance.
    pub fn new(window_size: usize, overlap: usize) -> Result<Self, ExtractorError> {
        if window_size == 0 {
            return Err(ExtractorError::Config("window_size must be greater than 0".to_string()));
        }
        if overlap >= window_size {
            return Err(ExtractorError::Config(format!(
                "overlap ({}) must be less than window_size ({})",
                overlap, window_size
            )));
        }
        Ok(Self {
            window_size,
            overlap,
        })
    }

    /// Create a chunker from pipeline configuration
    pub fn from_config(config: &ExtractorConfig) -> Result<Self, ExtractorError> {
        Self::new(config.window_size, config.overlap)
    }

    /// Words the window advances by
    pub fn stride(&self) -> usize {
        self.window_size - self.overlap
    }

    /// Number of chunks produced for a text of `word_count` words
    pub fn chunk_count(&self, word_count: usize) -> usize {
        if word_count == 0 {
            return 0;
        }
        word_count.saturating_sub(self.overlap).div_ceil(self.stride()).max(1)
    }

    /// Split text on whitespace and rejoin each window with single spaces
    pub fn split(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut chunks = Vec::with_capacity(self.chunk_count(words.len()));

        let mut start = 0;
        while start < words.len() {
            let end = (start + self.window_size).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += self.stride();
        }

        chunks
    }
}

/// Split `text` into overlapping windows of `window_size` words
///
/// # Examples
///
/// ```
/// use clinitag_extractor::split_into_chunks;
///
/// let chunks = split_into_chunks("a b c d e", 3, 1).unwrap();
/// assert_eq!(chunks, vec!["a b c", "c d e"]);
///
/// assert!(split_into_chunks("a b c", 2, 2).is_err());
/// ```
pub fn split_into_chunks(
    text: &str,
    window_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ExtractorError> {
    Ok(Chunker::new(window_size, overlap)?.split(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        let chunker = Chunker::new(500, 50).unwrap();
        assert!(chunker.split("").is_empty());
        assert!(chunker.split("  \n\t ").is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunker = Chunker::new(500, 50).unwrap();
        let chunks = chunker.split("Pressão   sistólica\n< 90 mmHg");
        assert_eq!(chunks, vec!["Pressão sistólica < 90 mmHg"]);
    }

    #[test]
    fn test_windows_overlap() {
        let chunker = Chunker::new(4, 2).unwrap();
        let chunks = chunker.split(&words(8));
        assert_eq!(
            chunks,
            vec!["w0 w1 w2 w3", "w2 w3 w4 w5", "w4 w5 w6 w7"]
        );
    }

    #[test]
    fn test_no_trailing_overlap_only_window() {
        // 950 words: the second window ends exactly at the last word
        let chunker = Chunker::new(500, 50).unwrap();
        assert_eq!(chunker.split(&words(950)).len(), 2);
        assert_eq!(chunker.split(&words(951)).len(), 3);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(Chunker::new(50, 50), Err(ExtractorError::Config(_))));
        assert!(matches!(Chunker::new(50, 60), Err(ExtractorError::Config(_))));
        assert!(matches!(Chunker::new(0, 0), Err(ExtractorError::Config(_))));
    }

    #[test]
    fn test_zero_overlap() {
        let chunker = Chunker::new(3, 0).unwrap();
        assert_eq!(chunker.split(&words(7)).len(), 3);
    }
}
