//! The summarisation pipeline.
//!
//! Sequences extraction, style resolution, backend summarisation, language
//! normalisation, and history persistence. Every stage failure is terminal
//! for the request; persistence is part of the success contract, so a
//! summary that fails to persist is never returned as a success.

use crate::backend::{BackendError, SummarizeBackend};
use crate::extract::{ContentExtractor, ExtractError};
use crate::history::{HistoryError, HistoryStore, NewHistory};
use crate::style::{StyleError, StyleStore};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to extract content: {0}")]
    Extract(#[from] ExtractError),
    #[error("unknown style: {0}")]
    UnknownStyle(String),
    #[error("style lookup failed: {0}")]
    StyleLookup(StyleError),
    #[error("failed to generate summary: {0}")]
    Summarize(#[from] BackendError),
    #[error("failed to save history: {0}")]
    Persist(#[from] HistoryError),
}

/// The outward result of one successful pipeline run
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub summary: String,
    pub title: String,
    pub url: String,
    /// Identity of the persisted history record
    pub history_id: u64,
}

/// Orchestrates one summarisation request end to end.
///
/// Stages run strictly in sequence with no internal retries and no partial
/// results. Persistence is the only mutating stage and runs last, so no
/// rollback is ever needed.
pub struct Pipeline {
    extractor: Arc<dyn ContentExtractor>,
    styles: Arc<StyleStore>,
    history: Arc<HistoryStore>,
    backend: Arc<dyn SummarizeBackend>,
    default_style: String,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn ContentExtractor>,
        styles: Arc<StyleStore>,
        history: Arc<HistoryStore>,
        backend: Arc<dyn SummarizeBackend>,
        default_style: impl Into<String>,
    ) -> Self {
        Self {
            extractor,
            styles,
            history,
            backend,
            default_style: default_style.into(),
        }
    }

    /// Run the pipeline for one URL, persisting and returning the summary
    pub async fn run(
        &self,
        url: &str,
        style: Option<&str>,
    ) -> Result<PipelineResult, PipelineError> {
        let extracted = self.extractor.extract(url).await?;

        let style_name = match style {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.default_style.as_str(),
        };
        let style = self.styles.get_by_name(style_name).map_err(|e| match e {
            StyleError::NotFound(_) => PipelineError::UnknownStyle(style_name.to_string()),
            other => PipelineError::StyleLookup(other),
        })?;

        let summary = self
            .backend
            .summarize(&extracted.content, &style.name)
            .await?;

        let language = normalize_language(extracted.language.as_deref());

        let title = if extracted.title.trim().is_empty() {
            None
        } else {
            Some(extracted.title.clone())
        };

        let record = self.history.create(NewHistory {
            url: url.to_string(),
            title,
            content: extracted.content,
            summary: summary.clone(),
            style_id: style.id,
            language,
        })?;

        Ok(PipelineResult {
            summary,
            title: record.title.clone().unwrap_or_default(),
            url: record.url,
            history_id: record.id,
        })
    }
}

/// Accept a detected language only as a 2-letter code, lowercased.
///
/// Anything else degrades to absent rather than failing the request.
fn normalize_language(detected: Option<&str>) -> Option<String> {
    let lang = detected?.trim();
    if lang.len() == 2 && lang.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(lang.to_ascii_lowercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_language_accepts_two_letter_codes() {
        assert_eq!(normalize_language(Some("en")).as_deref(), Some("en"));
        assert_eq!(normalize_language(Some("EN")).as_deref(), Some("en"));
        assert_eq!(normalize_language(Some(" fr ")).as_deref(), Some("fr"));
    }

    #[test]
    fn normalize_language_drops_everything_else() {
        assert_eq!(normalize_language(None), None);
        assert_eq!(normalize_language(Some("")), None);
        assert_eq!(normalize_language(Some("eng")), None);
        assert_eq!(normalize_language(Some("ZZ_unlikely")), None);
        assert_eq!(normalize_language(Some("z9")), None);
    }
}
