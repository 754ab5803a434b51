//! Sentence-aware document chunking.
//!
//! This module provides the [`Chunker`] trait and [`SentenceChunker`], which
//! splits book text into chunks of roughly `max_words` words:
//!
//! 1. the text is normalized with [`clean_text`],
//! 2. split into sentences with [`split_sentences`],
//! 3. sentences are packed greedily into chunks of at most `max_words` words,
//! 4. a chunk still over the limit is re-packed along blank-line paragraphs.
//!
//! Content is never truncated or dropped. A single sentence longer than
//! `max_words` becomes a chunk of its own.

use std::sync::LazyLock;

use regex::Regex;

use crate::document::{Chunk, Document};

/// Characters outside word characters, whitespace, and `. , ! ? ; : - ( )`.
static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\w\s.,!?;:\-()]").expect("unreachable error: invalid character class")
});

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no usable text. Chunk
    /// indices are dense and start at 0.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Packs whole sentences into chunks bounded by a word count.
///
/// Each chunk carries the document source, a `chunk_{i}` page label, and its
/// index within the document.
///
/// # Example
///
/// ```rust
/// use book_rag::{Chunker, Document, SentenceChunker};
///
/// let chunker = SentenceChunker::new(6);
/// let chunks = chunker.chunk(&Document::new(
///     "intro.md",
///     "The cat sat. The dog ran. Birds flew high today.",
/// ));
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[0].content, "The cat sat. The dog ran.");
/// assert_eq!(chunks[1].page, "chunk_1");
/// ```
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    max_words: usize,
}

impl SentenceChunker {
    /// Create a new `SentenceChunker` targeting `max_words` words per chunk.
    pub fn new(max_words: usize) -> Self {
        Self { max_words }
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        chunk_text(&document.text, self.max_words)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| Chunk {
                content,
                source: document.source.clone(),
                page: format!("chunk_{chunk_index}"),
                chunk_index,
            })
            .collect()
    }
}

/// Split raw text into chunks of at most `max_words` words where possible.
///
/// Deterministic, never fails, and never returns an empty string.
pub fn chunk_text(text: &str, max_words: usize) -> Vec<String> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return Vec::new();
    }

    let sentence_chunks = merge_greedy(split_sentences(&cleaned), max_words, " ");

    let mut chunks = Vec::with_capacity(sentence_chunks.len());
    for chunk in sentence_chunks {
        if word_count(&chunk) > max_words {
            chunks.extend(split_paragraphs(&chunk, max_words));
        } else {
            chunks.push(chunk);
        }
    }
    chunks
}

/// Replace every character outside the safe set with a space, then collapse
/// whitespace runs to a single space and trim.
///
/// Word characters are Unicode-aware, so accented letters survive while
/// markup symbols such as `#`, `*`, `` ` `` and `<` do not.
pub fn clean_text(text: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(text, " ");
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split text after `.`, `!` or `?` followed by whitespace.
///
/// The terminal punctuation stays with its sentence and the whitespace run
/// between sentences is dropped. Text without terminal punctuation is
/// returned as a single sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = chars.peek() {
                if !next.is_whitespace() {
                    break;
                }
                end = j + next.len_utf8();
                chars.next();
            }
            if i > start {
                sentences.push(&text[start..i]);
            }
            start = end;
            prev = None;
            continue;
        }
        prev = Some(c);
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Re-pack text along blank-line (`\n\n`) boundaries into chunks of at most
/// `max_words` words. A paragraph larger than the limit is kept whole.
pub fn split_paragraphs(text: &str, max_words: usize) -> Vec<String> {
    let paragraphs = text.split("\n\n").map(str::trim).filter(|p| !p.is_empty());
    merge_greedy(paragraphs, max_words, "\n\n")
}

/// Number of whitespace-delimited words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Greedily accumulate pieces into chunks.
///
/// An empty running chunk always takes the next piece, so oversized pieces
/// are emitted whole instead of being dropped.
fn merge_greedy<'a>(
    pieces: impl IntoIterator<Item = &'a str>,
    max_words: usize,
    separator: &str,
) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_words = 0;

    for piece in pieces {
        let words = word_count(piece);
        if current.is_empty() {
            current.push_str(piece);
            current_words = words;
        } else if current_words + words > max_words {
            chunks.push(std::mem::take(&mut current));
            current.push_str(piece);
            current_words = words;
        } else {
            current.push_str(separator);
            current.push_str(piece);
            current_words += words;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
