//! OpenAI-compatible HTTP client.

use super::ContentGenerator;
use crate::config::settings::AiSettings;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Talks to `/v1/chat/completions` and `/v1/images/generations`.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    settings: AiSettings,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

impl OpenAiClient {
    /// Creates a client for `settings.api_url` authenticated with `api_key`.
    ///
    /// Every request gives up after `settings.timeout_secs`.
    pub fn new(api_key: impl Into<String>, settings: AiSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .map_err(|e| ai_error(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            settings,
        })
    }

    async fn post<B: Serialize + Sync, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}{path}", self.settings.api_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| ai_error(format!("Failed to send request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ai_error(format!("API error ({}): {error_text}", status.as_u16())));
        }

        response
            .json()
            .await
            .map_err(|e| ai_error(format!("Failed to parse response: {e}")))
    }
}

fn ai_error(message: String) -> Error {
    Error::Ai { message }
}

#[async_trait]
impl ContentGenerator for OpenAiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.settings.text_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        debug!("Requesting text from {}", self.settings.text_model);

        let response: ChatResponse = self.post("/v1/chat/completions", &request).await?;
        response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ai_error("Empty completion".to_string()))
    }

    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let request = ImageRequest {
            model: &self.settings.image_model,
            prompt,
            n: 1,
            size: "1024x1024",
        };
        debug!("Requesting image from {}", self.settings.image_model);

        let response: ImageResponse = self.post("/v1/images/generations", &request).await?;
        response
            .data
            .into_iter()
            .find_map(|image| image.url)
            .ok_or_else(|| ai_error("No image in response".to_string()))
    }
}
