#[cfg(test)]
mod tests;

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// Default upper bound on words per chunk
pub const DEFAULT_MAX_WORDS: usize = 150;

/// Lowercased, trailing-period-stripped tokens that never end a sentence
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "e.g", "i.e", "approx", "dept",
];

/// Whitespace that follows terminal punctuation, optionally after a closing quote or bracket
static SENTENCE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?<=[.!?])\s+|(?<=[.!?]["')\]])\s+"#).expect("valid regex")
});

/// Configuration for content chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum words per chunk; a single longer sentence still forms one chunk
    pub max_words: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.max_words)
    }
}

/// Split `text` into sentence-aligned chunks of at most `max_words` words.
///
/// Sentences are accumulated greedily; a chunk is closed as soon as the next
/// sentence would push it past `max_words`. Sentences are never split, so an
/// oversized sentence becomes a chunk of its own.
#[inline]
pub fn chunk_text(text: &str, max_words: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_word_count = 0;

    for sentence in split_sentences(text) {
        let sentence_words = count_words(&sentence);

        if current_word_count + sentence_words > max_words && !current.is_empty() {
            chunks.push(current.join(" "));
            current.clear();
            current_word_count = 0;
        }

        current_word_count += sentence_words;
        current.push(sentence);
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    debug!(
        "Chunked {} words into {} chunks (max {} words)",
        count_words(text),
        chunks.len(),
        max_words
    );

    chunks
}

/// Split text into trimmed, non-empty sentences in input order
#[inline]
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_BOUNDARY.find_iter(text).flatten() {
        push_piece(&mut pieces, text.get(start..boundary.start()).unwrap_or_default());
        start = boundary.end();
    }
    push_piece(&mut pieces, text.get(start..).unwrap_or_default());

    merge_abbreviations(pieces)
}

/// Whitespace-separated word count
#[inline]
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn push_piece(pieces: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        pieces.push(piece.to_string());
    }
}

/// Re-join pieces that were split right after an abbreviation such as "Dr."
fn merge_abbreviations(pieces: Vec<String>) -> Vec<String> {
    let mut sentences: Vec<String> = Vec::with_capacity(pieces.len());

    for piece in pieces {
        match sentences.last_mut() {
            Some(previous) if ends_with_abbreviation(previous) => {
                previous.push(' ');
                previous.push_str(&piece);
            }
            _ => sentences.push(piece),
        }
    }

    sentences
}

fn ends_with_abbreviation(sentence: &str) -> bool {
    let Some(last_word) = sentence.split_whitespace().next_back() else {
        return false;
    };

    if !last_word.ends_with('.') {
        return false;
    }

    let word = last_word
        .trim_start_matches(['(', '"', '\''])
        .trim_end_matches('.')
        .to_lowercase();
    ABBREVIATIONS.contains(&word.as_str()) || is_dotted_initialism(&word)
}

/// "u.s", "ph.d", "a.m": short letter groups joined by internal periods
fn is_dotted_initialism(word: &str) -> bool {
    word.contains('.')
        && word.split('.').all(|part| {
            (1..=3).contains(&part.len()) && part.chars().all(char::is_alphabetic)
        })
}
