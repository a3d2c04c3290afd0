//! Sentence segmentation for the semantic chunker.
//!
//! Uses Unicode sentence boundaries (UAX #29) rather than a hand-rolled
//! punctuation scan. The returned units concatenate back to the input
//! byte-for-byte, which is what lets the assembler guarantee that no
//! sentence is dropped or duplicated across chunk boundaries.

use std::sync::OnceLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// Splits `text` into sentence units covering the whole input.
///
/// Whitespace-only boundary pieces are folded into their neighbors, so
/// every returned unit carries actual content (unless the input itself is
/// all whitespace, which yields that single unit).
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut units: Vec<String> = Vec::new();
    for piece in text.split_sentence_bounds() {
        match units.last_mut() {
            Some(last) if piece.trim().is_empty() => last.push_str(piece),
            Some(last) if last.trim().is_empty() => last.push_str(piece),
            _ => units.push(piece.to_string()),
        }
    }
    units
}

/// Embedding input for each sentence: the sentence plus `window` neighbors
/// on each side, whitespace-normalized. A window of 0 embeds each sentence
/// alone.
pub fn smoothing_windows(sentences: &[String], window: usize) -> Vec<String> {
    sentences
        .iter()
        .enumerate()
        .map(|(index, _)| {
            let lo = index.saturating_sub(window);
            let hi = (index + window + 1).min(sentences.len());
            normalize_whitespace(&sentences[lo..hi].concat())
        })
        .collect()
}

/// Collapses whitespace runs to single spaces and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    re.replace_all(text.trim(), " ").into_owned()
}
