//! LLM integration for commit message generation.

pub mod error;
pub mod ollama;
#[cfg(test)]
pub(crate) mod test_utils;

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;

pub use error::AiError;
pub use ollama::OllamaClient;

/// Metadata about an AI client implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AiClientMetadata {
    /// Service provider name.
    pub provider: String,
    /// Model identifier.
    pub model: String,
}

/// Trait for AI text-generation clients.
pub trait AiClient: Send + Sync {
    /// Sends `prompt` and returns the complete generated text.
    ///
    /// Partial text is handed to `on_fragment` as it arrives, in order.
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        on_fragment: &'a mut (dyn FnMut(&str) + Send),
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

    /// Returns metadata about the AI client implementation.
    fn get_metadata(&self) -> AiClientMetadata;
}
