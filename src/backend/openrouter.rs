//! OpenRouter REST-backed summarisation.
//!
//! Speaks the chat-completions wire format: a JSON request with a model id
//! and role/content messages, bearer-token authorised, one request per call.

use super::{compose_prompt, resolve_template, BackendError, SummarizeBackend};
use crate::config::Config;
use crate::style::StyleStore;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

const BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default fallback model when none is configured
const DEFAULT_MODEL: &str = "openai/gpt-4.1-nano";

/// Default timeout for HTTP requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

pub struct OpenRouterBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    styles: Arc<StyleStore>,
}

impl OpenRouterBackend {
    pub fn new(config: &Config, styles: Arc<StyleStore>) -> Result<Self, BackendError> {
        let api_key = config.api_key()?.to_string();
        let model = if config.backend.model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.backend.model.clone()
        };
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
            model,
            styles,
        })
    }
}

#[async_trait]
impl SummarizeBackend for OpenRouterBackend {
    async fn summarize(&self, content: &str, style_name: &str) -> Result<String, BackendError> {
        let start = Instant::now();

        let template = resolve_template(&self.styles, style_name)?;
        let prompt = compose_prompt(&template, content);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        // Keep the raw body for diagnostics on non-200 responses
        if status != StatusCode::OK {
            return Err(BackendError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let summary = decode_summary(&body)?;
        tracing::info!("summary generated in {:?}", start.elapsed());
        Ok(summary)
    }
}

/// Pull the summary out of a chat-completions response body
fn decode_summary(body: &str) -> Result<String, BackendError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| BackendError::RequestFailed(format!("failed to decode response: {e}")))?;

    if let Some(error) = response.error {
        return Err(BackendError::RequestFailed(format!(
            "OpenRouter API error: {}",
            error.message
        )));
    }

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(BackendError::EmptyResponse)?;

    let summary = choice.message.content;
    if summary.trim().is_empty() {
        return Err(BackendError::EmptyResponse);
    }
    Ok(summary)
}
