//! Gemini SDK-backed summarisation.
//!
//! Keeps a small pool of client handles to amortise construction cost. The
//! pool is optimistic: acquisition never blocks (a fresh handle is created
//! when the pool is empty) and release discards the handle when the pool is
//! full.

use super::{compose_prompt, resolve_template, BackendError, SummarizeBackend};
use crate::config::Config;
use crate::style::StyleStore;
use async_trait::async_trait;
use rstructor::{GeminiClient, GeminiModel, LLMClient};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Maximum number of idle client handles kept for reuse
const POOL_CAPACITY: usize = 10;

pub struct GeminiBackend {
    api_key: String,
    model: String,
    pool: Mutex<Vec<GeminiClient>>,
    styles: Arc<StyleStore>,
}

impl GeminiBackend {
    pub fn new(config: &Config, styles: Arc<StyleStore>) -> Result<Self, BackendError> {
        let api_key = config.api_key()?.to_string();
        Ok(Self {
            api_key,
            model: config.backend.model.clone(),
            pool: Mutex::new(Vec::with_capacity(POOL_CAPACITY)),
            styles,
        })
    }

    /// Take an idle handle from the pool, or build a fresh one
    fn acquire(&self) -> Result<GeminiClient, BackendError> {
        if let Some(client) = self.pool.lock().unwrap().pop() {
            return Ok(client);
        }
        let client = GeminiClient::new(&self.api_key)
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?
            .model(parse_gemini_model(&self.model));
        Ok(client)
    }

    /// Return a handle to the pool, discarding it when the pool is full
    fn release(&self, client: GeminiClient) {
        let mut pool = self.pool.lock().unwrap();
        if pool.len() < POOL_CAPACITY {
            pool.push(client);
        }
    }
}

#[async_trait]
impl SummarizeBackend for GeminiBackend {
    async fn summarize(&self, content: &str, style_name: &str) -> Result<String, BackendError> {
        let start = Instant::now();

        let template = resolve_template(&self.styles, style_name)?;
        let prompt = compose_prompt(&template, content);

        let client = self.acquire()?;
        let result = client
            .generate_with_metadata(&prompt)
            .await
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;
        self.release(client);

        if result.text.trim().is_empty() {
            return Err(BackendError::EmptyResponse);
        }

        tracing::info!("summary generated in {:?}", start.elapsed());
        Ok(result.text)
    }
}

/// Parse a model string into a GeminiModel
fn parse_gemini_model(model: &str) -> GeminiModel {
    match model {
        "gemini-2.0-flash" => GeminiModel::Gemini20Flash,
        "gemini-2.5-flash" => GeminiModel::Gemini25Flash,
        "gemini-2.5-pro" => GeminiModel::Gemini25Pro,
        _ => GeminiModel::Gemini20Flash, // Default
    }
}
