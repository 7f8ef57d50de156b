//! Summarisation backends.
//!
//! Two interchangeable backends implement [`SummarizeBackend`]: a Gemini
//! SDK-backed client with a small handle pool, and an OpenRouter REST client.
//! The pipeline depends only on the trait; the variant is chosen from
//! configuration at startup.

pub mod gemini;
pub mod openrouter;

pub use gemini::GeminiBackend;
pub use openrouter::OpenRouterBackend;

use crate::config::{Config, ConfigError};
use crate::style::{StyleError, StyleStore};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("style '{0}' not found")]
    StyleNotFound(String),
    #[error("style lookup failed: {0}")]
    StyleLookup(String),
    #[error("LLM request failed: {0}")]
    RequestFailed(String),
    #[error("backend returned status {status}: {body}")]
    BadStatus { status: u16, body: String },
    #[error("empty response from backend")]
    EmptyResponse,
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),
}

/// Turns extracted content and a style name into summary text.
#[async_trait]
pub trait SummarizeBackend: Send + Sync {
    /// Generate a summary of `content` conditioned on the named style.
    ///
    /// Resolves the style before any network call; a missing style is
    /// terminal and the backend is never contacted. Issues exactly one
    /// request per call with no internal retry.
    async fn summarize(&self, content: &str, style_name: &str) -> Result<String, BackendError>;
}

/// Select and construct the configured backend
pub fn from_config(
    config: &Config,
    styles: Arc<StyleStore>,
) -> Result<Arc<dyn SummarizeBackend>, BackendError> {
    match config.backend.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiBackend::new(config, styles)?)),
        "openrouter" => Ok(Arc::new(OpenRouterBackend::new(config, styles)?)),
        other => Err(BackendError::ConfigError(ConfigError::UnknownProvider(
            other.to_string(),
        ))),
    }
}

/// Compose the outbound prompt: template first, raw article text after.
///
/// No truncation or token budgeting is applied; oversized articles are passed
/// through as-is.
pub(crate) fn compose_prompt(template: &str, content: &str) -> String {
    format!("{}\n\n{}", template, content)
}

/// Resolve a style name to its prompt template
pub(crate) fn resolve_template(
    styles: &StyleStore,
    style_name: &str,
) -> Result<String, BackendError> {
    match styles.get_by_name(style_name) {
        Ok(style) => Ok(style.prompt_template),
        Err(StyleError::NotFound(_)) => Err(BackendError::StyleNotFound(style_name.to_string())),
        Err(e) => Err(BackendError::StyleLookup(e.to_string())),
    }
}
