//! Assembles sentence units into chunks at the detected boundaries.

use super::lexical::LexicalSplitter;
use super::types::{ChunkingError, SemanticChunk};

/// Merges the sentences between consecutive breakpoints into chunk texts.
///
/// `breakpoints` holds indices `i` meaning "boundary after sentence `i`".
/// Boundaries that would leave a group with fewer than `min_sentences`
/// members are skipped, and an undersized trailing group is folded into the
/// previous chunk. Every sentence lands in exactly one chunk, in order.
pub fn assemble(
    sentences: &[String],
    breakpoints: &[usize],
    min_sentences: usize,
) -> Vec<(String, usize)> {
    if sentences.is_empty() {
        return Vec::new();
    }
    let min_sentences = min_sentences.max(1);

    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut start = 0usize;
    for &breakpoint in breakpoints {
        let end = breakpoint + 1;
        if end >= sentences.len() {
            break;
        }
        if end - start >= min_sentences {
            groups.push((start, end));
            start = end;
        }
    }
    if start < sentences.len() {
        let tail = sentences.len() - start;
        if tail >= min_sentences || groups.is_empty() {
            groups.push((start, sentences.len()));
        } else if let Some(last) = groups.last_mut() {
            last.1 = sentences.len();
        }
    }

    groups
        .into_iter()
        .map(|(lo, hi)| (sentences[lo..hi].concat(), hi - lo))
        .collect()
}

/// Re-splits oversized chunk texts through the lexical cascade.
pub fn enforce_max_chars(
    chunks: Vec<(String, usize)>,
    max_chars: usize,
) -> Result<(Vec<(String, usize)>, bool), ChunkingError> {
    let splitter = LexicalSplitter::new(max_chars, 0)
        .map_err(|err| ChunkingError::Config(err.to_string()))?;

    let mut out = Vec::with_capacity(chunks.len());
    let mut fallback_used = false;
    for (content, sentence_count) in chunks {
        if content.chars().count() <= max_chars {
            out.push((content, sentence_count));
            continue;
        }
        fallback_used = true;
        for (index, piece) in splitter.split_text(&content).into_iter().enumerate() {
            // Sentence counts are no longer exact after a lexical re-split;
            // attribute them to the first piece.
            let count = if index == 0 { sentence_count } else { 0 };
            out.push((piece, count));
        }
    }
    Ok((out, fallback_used))
}

/// Wraps assembled texts into [`SemanticChunk`] values.
pub fn into_chunks(chunks: Vec<(String, usize)>) -> Vec<SemanticChunk> {
    chunks
        .into_iter()
        .map(|(content, sentence_count)| SemanticChunk::new(content, sentence_count))
        .collect()
}
