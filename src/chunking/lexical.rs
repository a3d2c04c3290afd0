//! Fixed-size character splitter.
//!
//! Windows are capped at `chunk_size` characters. The cut point for each
//! window snaps to the largest separator available at or before the cap —
//! paragraph break, then line break, then space, then a hard cut — so words
//! are only severed when the text offers no boundary at all. Consecutive
//! windows overlap by `overlap` characters, measured back from the previous
//! window's end.

use crate::types::{Chunk, Document, IngestError};

const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

#[derive(Clone, Debug)]
pub struct LexicalSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl LexicalSplitter {
    /// Validates the size parameters eagerly: `chunk_size` must be positive
    /// and `overlap` strictly smaller than `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, IngestError> {
        if chunk_size == 0 {
            return Err(IngestError::SplitConfig(
                "chunk_size must be positive".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(IngestError::SplitConfig(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Splits one text into windows of at most `chunk_size` characters.
    ///
    /// A text no longer than `chunk_size` comes back as a single window;
    /// an empty text yields no windows.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary; lets the window math run on
        // character counts without ever slicing mid-codepoint.
        let bounds: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
        let char_count = bounds.len();
        let byte_at = |char_index: usize| -> usize {
            if char_index >= char_count {
                text.len()
            } else {
                bounds[char_index]
            }
        };

        let mut windows = Vec::new();
        let mut start = 0usize;
        loop {
            if char_count - start <= self.chunk_size {
                windows.push(text[byte_at(start)..].to_string());
                break;
            }

            let limit = start + self.chunk_size;
            let window = &text[byte_at(start)..byte_at(limit)];
            let end = match separator_cut(window) {
                Some(cut) => start + window[..cut].chars().count(),
                None => limit,
            };
            windows.push(text[byte_at(start)..byte_at(end)].to_string());

            let next = end.saturating_sub(self.overlap);
            // Separator snapping can shrink a window below the overlap; in
            // that case give up the overlap rather than looping in place.
            start = if next > start { next } else { end };
        }
        windows
    }

    /// Splits every document, inheriting metadata and assigning zero-based
    /// per-document chunk indices.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|document| {
                self.split_text(&document.content)
                    .into_iter()
                    .enumerate()
                    .map(|(index, content)| Chunk {
                        content,
                        metadata: document.metadata.clone(),
                        chunk_index: index,
                    })
            })
            .collect()
    }
}

/// Byte offset just past the best separator in `window`, if any.
fn separator_cut(window: &str) -> Option<usize> {
    for separator in SEPARATORS {
        if let Some(position) = window.rfind(separator) {
            if position > 0 {
                return Some(position + separator.len());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentMetadata;

    fn make_doc(content: &str) -> Document {
        Document::new(content, DocumentMetadata::new("test.txt", "text/plain"))
    }

    #[test]
    fn empty_text_yields_no_windows() {
        let splitter = LexicalSplitter::new(1000, 0).unwrap();
        assert!(splitter.split_text("").is_empty());
    }

    #[test]
    fn short_text_is_a_single_window() {
        let splitter = LexicalSplitter::new(1000, 0).unwrap();
        let windows = splitter.split_text("short text");
        assert_eq!(windows, vec!["short text".to_string()]);
    }

    #[test]
    fn unbroken_text_splits_at_exact_boundaries() {
        let text = "x".repeat(2500);
        let splitter = LexicalSplitter::new(1000, 0).unwrap();
        let windows = splitter.split_text(&text);
        let lengths: Vec<usize> = windows.iter().map(|w| w.chars().count()).collect();
        assert_eq!(lengths, vec![1000, 1000, 500]);
    }

    #[test]
    fn windows_never_exceed_chunk_size() {
        let text = "word ".repeat(500);
        let splitter = LexicalSplitter::new(128, 16).unwrap();
        for window in splitter.split_text(&text) {
            assert!(window.chars().count() <= 128);
        }
    }

    #[test]
    fn consecutive_windows_share_exact_overlap() {
        let text: String = ('a'..='z').cycle().take(1000).collect();
        let splitter = LexicalSplitter::new(100, 20).unwrap();
        let windows = splitter.split_text(&text);
        assert!(windows.len() > 1);
        for pair in windows.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let suffix: String = prev[prev.len() - 20..].iter().collect();
            assert!(pair[1].starts_with(&suffix));
        }
    }

    #[test]
    fn prefers_paragraph_break_over_word_cut() {
        let text = format!("{}\n\n{}", "a".repeat(80), "b".repeat(80));
        let splitter = LexicalSplitter::new(100, 0).unwrap();
        let windows = splitter.split_text(&text);
        assert_eq!(windows.len(), 2);
        assert!(windows[0].ends_with("\n\n"));
        assert_eq!(windows[1], "b".repeat(80));
    }

    #[test]
    fn falls_back_to_space_boundary() {
        let text = format!("{} {}", "a".repeat(60), "b".repeat(60));
        let splitter = LexicalSplitter::new(100, 0).unwrap();
        let windows = splitter.split_text(&text);
        assert_eq!(windows.len(), 2);
        assert!(windows[0].ends_with(' '));
        assert_eq!(windows[1], "b".repeat(60));
    }

    #[test]
    fn multibyte_text_is_never_sliced_mid_codepoint() {
        let text = "héllo wörld ".repeat(100);
        let splitter = LexicalSplitter::new(50, 10).unwrap();
        let windows = splitter.split_text(&text);
        assert!(!windows.is_empty());
        let total: usize = windows.iter().map(|w| w.chars().count()).sum();
        assert!(total >= text.chars().count());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        assert!(matches!(
            LexicalSplitter::new(100, 100),
            Err(IngestError::SplitConfig(_))
        ));
        assert!(matches!(
            LexicalSplitter::new(0, 0),
            Err(IngestError::SplitConfig(_))
        ));
    }

    #[test]
    fn document_indices_are_sequential_per_document() {
        let docs = vec![make_doc(&"x".repeat(2500)), make_doc("tiny")];
        let splitter = LexicalSplitter::new(1000, 0).unwrap();
        let chunks = splitter.split_documents(&docs);
        assert_eq!(chunks.len(), 4);
        assert_eq!(
            chunks.iter().map(|c| c.chunk_index).collect::<Vec<_>>(),
            vec![0, 1, 2, 0]
        );
        assert_eq!(chunks[3].content, "tiny");
    }

    #[test]
    fn metadata_is_inherited_unmodified() {
        let mut metadata = DocumentMetadata::new("docs/a.txt", "text/plain");
        metadata
            .extra
            .insert("team".to_string(), "search".to_string());
        let doc = Document::new("content here", metadata.clone());
        let splitter = LexicalSplitter::new(1000, 0).unwrap();
        let chunks = splitter.split_documents(&[doc]);
        assert_eq!(chunks[0].metadata, metadata);
    }

    mod proptest_lexical {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn split_never_panics(
                content in "\\PC{0,2000}",
                chunk_size in 1usize..500,
                overlap in 0usize..100,
            ) {
                prop_assume!(overlap < chunk_size);
                let splitter = LexicalSplitter::new(chunk_size, overlap).unwrap();
                let _ = splitter.split_text(&content);
            }

            #[test]
            fn windows_respect_chunk_size(
                content in "[a-z \\n]{0,1500}",
                chunk_size in 1usize..300,
            ) {
                let splitter = LexicalSplitter::new(chunk_size, 0).unwrap();
                for window in splitter.split_text(&content) {
                    prop_assert!(window.chars().count() <= chunk_size);
                }
            }

            #[test]
            fn zero_overlap_windows_cover_content(
                content in "[a-z]{1,1000}",
                chunk_size in 1usize..200,
            ) {
                let splitter = LexicalSplitter::new(chunk_size, 0).unwrap();
                let windows = splitter.split_text(&content);
                let rebuilt: String = windows.concat();
                prop_assert_eq!(rebuilt, content);
            }

            #[test]
            fn indices_are_gapless(
                content in "[a-z. \\n]{1,1000}",
                chunk_size in 1usize..200,
            ) {
                let splitter = LexicalSplitter::new(chunk_size, 0).unwrap();
                let chunks = splitter.split_documents(&[make_doc(&content)]);
                for (i, chunk) in chunks.iter().enumerate() {
                    prop_assert_eq!(chunk.chunk_index, i);
                }
            }
        }
    }
}
