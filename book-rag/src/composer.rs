//! Grounding-context selection and prompt composition.
//!
//! For every question the composer decides what the answer is grounded on:
//!
//! - user-selected text, when present, is used alone and the index is never
//!   searched;
//! - otherwise the [`Retriever`] is asked for the `top_k` closest chunks.
//!
//! An empty retrieval is answered with [`NO_RELEVANT_INFO_ANSWER`] without
//! calling the completion model. Everything else is turned into a prompt by
//! [`compose_prompt`].

use async_trait::async_trait;

use crate::document::RetrievedItem;
use crate::error::Result;

/// Fixed answer returned when retrieval finds nothing to ground on.
pub const NO_RELEVANT_INFO_ANSWER: &str =
    "I couldn't find relevant information in the book to answer your question.";

/// Source label for user-selected text.
pub const USER_SELECTION_SOURCE: &str = "user_selection";

/// Page label for user-selected text.
pub const USER_SELECTION_PAGE: &str = "selected";

/// Marker appended to source snippets that were cut short.
const ELLIPSIS: &str = "...";

/// Similarity search over previously ingested chunks.
///
/// Implementations embed the question themselves and return items ordered
/// by descending score.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `top_k` chunks relevant to `question`.
    async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<RetrievedItem>>;
}

/// The passages an answer is grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundingContext {
    /// Grounding passages, in prompt order.
    pub items: Vec<RetrievedItem>,
    /// Whether the passages are the user's own selection.
    pub selected_text_used: bool,
}

impl GroundingContext {
    /// Wrap user-selected text as the sole grounding passage.
    pub fn from_selection(text: impl Into<String>) -> Self {
        Self {
            items: vec![RetrievedItem {
                content: text.into(),
                source: USER_SELECTION_SOURCE.to_string(),
                page: USER_SELECTION_PAGE.to_string(),
                score: 1.0,
            }],
            selected_text_used: true,
        }
    }

    /// Use retrieved chunks as grounding passages.
    pub fn from_retrieval(items: Vec<RetrievedItem>) -> Self {
        Self { items, selected_text_used: false }
    }

    /// True when there is nothing to ground an answer on.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Passage contents joined by blank lines.
    pub fn context_text(&self) -> String {
        self.items.iter().map(|item| item.content.as_str()).collect::<Vec<_>>().join("\n\n")
    }
}

/// Choose the grounding context for a question.
///
/// A non-empty `selected_text` takes full precedence: the retriever is not
/// called. Otherwise the retriever results are returned unchanged.
///
/// # Errors
///
/// Propagates any error returned by the retriever.
pub async fn answer_context<R>(
    retriever: &R,
    question: &str,
    selected_text: Option<&str>,
    top_k: usize,
) -> Result<GroundingContext>
where
    R: Retriever + ?Sized,
{
    match selected_text {
        Some(text) if !text.is_empty() => Ok(GroundingContext::from_selection(text)),
        _ => {
            let items = retriever.retrieve(question, top_k).await?;
            Ok(GroundingContext::from_retrieval(items))
        }
    }
}

/// Build the completion prompt for `question` from its grounding context.
///
/// The question and passages are inserted verbatim.
pub fn compose_prompt(question: &str, context: &GroundingContext) -> String {
    let context_text = context.context_text();
    if context.selected_text_used {
        format!(
            "Based on the selected text below, please answer the user's question. \
             Only use information from the provided text.\n\n\
             Selected Text:\n{context_text}\n\n\
             Question: {question}\n\n\
             Answer concisely and accurately based on the provided text."
        )
    } else {
        format!(
            "Based on the following book content, please answer the user's question. \
             Only use information from the provided content.\n\n\
             Book Content:\n{context_text}\n\n\
             Question: {question}\n\n\
             Provide a comprehensive answer based on the book content. \
             If the information is not available in the provided content, say so clearly."
        )
    }
}

/// Shorten each item's content to `max_chars` characters for display.
///
/// Truncated content ends with `...`; source, page and score are unchanged.
pub fn format_sources(items: &[RetrievedItem], max_chars: usize) -> Vec<RetrievedItem> {
    items
        .iter()
        .map(|item| RetrievedItem {
            content: truncate_chars(&item.content, max_chars),
            source: item.source.clone(),
            page: item.page.clone(),
            score: item.score,
        })
        .collect()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}
