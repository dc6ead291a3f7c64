//! AI collaborator - Greeting and request texts plus illustrations.
//!
//! Callers treat every error as "use the canned fallback"; nothing in the
//! notification pipeline depends on the AI succeeding.

pub mod openai;

pub use openai::OpenAiClient;

use crate::errors::{Error, Result};
use async_trait::async_trait;

/// Generates texts and images from prompts.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Returns generated text for `prompt`.
    async fn generate_text(&self, prompt: &str) -> Result<String>;

    /// Returns the URL of an image generated for `prompt`.
    async fn generate_image(&self, prompt: &str) -> Result<String>;
}

/// Generator used when AI is switched off. Always fails, so callers fall back.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGenerator;

#[async_trait]
impl ContentGenerator for DisabledGenerator {
    async fn generate_text(&self, _prompt: &str) -> Result<String> {
        Err(Error::Ai {
            message: "AI generation is disabled".to_string(),
        })
    }

    async fn generate_image(&self, _prompt: &str) -> Result<String> {
        Err(Error::Ai {
            message: "AI generation is disabled".to_string(),
        })
    }
}
