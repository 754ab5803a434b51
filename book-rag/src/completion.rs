//! Completion model trait for turning a grounded prompt into an answer.

use async_trait::async_trait;

use crate::error::Result;

/// A hosted language model that answers a single prompt.
///
/// Sampling parameters are fixed when the model is constructed, so every
/// call is made with the same temperature and output cap.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Generate a reply to `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// The model name, for logging.
    fn name(&self) -> &str;
}
