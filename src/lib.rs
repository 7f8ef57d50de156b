//! # Precis
//!
//! A web service for style-conditioned webpage summarisation using LLMs.
//!
//! ## Features
//!
//! - **Readable extraction**: Fetches a page and strips boilerplate down to the article text
//! - **Style-conditioned summaries**: Named prompt templates stored alongside the history
//! - **Provider agnostic**: Supports Gemini (SDK) and OpenRouter (REST) backends
//! - **Durable history**: sled-backed records with pagination and substring search

pub mod backend;
pub mod config;
pub mod extract;
pub mod history;
pub mod pipeline;
pub mod server;
pub mod style;

pub use config::Config;
pub use extract::{ContentExtractor, ExtractedContent, WebExtractor};
pub use history::{HistoryRecord, HistoryStore};
pub use pipeline::Pipeline;
pub use style::{Style, StyleStore};
