//! Summarisation styles and the sled-backed style store.
//!
//! Styles are append-only reference data: read on every summarisation, written
//! rarely. The store keeps a read-through cache keyed by both id and name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// Tree holding styles keyed by big-endian id
pub(crate) const STYLES_TREE: &str = "styles";
/// Tree mapping style name to id, enforcing name uniqueness
const STYLE_NAMES_TREE: &str = "style_names";

#[derive(Error, Debug)]
pub enum StyleError {
    #[error("database error: {0}")]
    DbError(#[from] sled::Error),
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("invalid style: {0}")]
    Invalid(String),
    #[error("style not found: {0}")]
    NotFound(String),
}

/// A named prompt template controlling summary tone and format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub id: u64,
    /// Unique name, e.g. "concise"
    pub name: String,
    pub description: Option<String>,
    /// Text prepended to the article content when prompting the backend
    pub prompt_template: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a style; the store assigns id and timestamp
#[derive(Debug, Clone, Deserialize)]
pub struct NewStyle {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub prompt_template: String,
}

#[derive(Default)]
struct StyleCache {
    by_id: RwLock<HashMap<u64, Style>>,
    by_name: RwLock<HashMap<String, Style>>,
}

/// Sled-backed store for summarisation styles.
///
/// The cache is populated on create and on every successful read; there is no
/// invalidation path because styles are never updated or deleted.
pub struct StyleStore {
    db: sled::Db,
    tree: sled::Tree,
    names: sled::Tree,
    cache: StyleCache,
}

impl StyleStore {
    /// Open the style trees within an existing database
    pub fn open(db: &sled::Db) -> Result<Self, StyleError> {
        let tree = db.open_tree(STYLES_TREE)?;
        let names = db.open_tree(STYLE_NAMES_TREE)?;
        Ok(Self {
            db: db.clone(),
            tree,
            names,
            cache: StyleCache::default(),
        })
    }

    /// Create a style, assigning its identity
    pub fn create(&self, new: NewStyle) -> Result<Style, StyleError> {
        if new.name.trim().is_empty() {
            return Err(StyleError::Invalid("style name cannot be empty".to_string()));
        }
        if new.prompt_template.trim().is_empty() {
            return Err(StyleError::Invalid(
                "prompt template cannot be empty".to_string(),
            ));
        }
        if self.names.contains_key(new.name.as_bytes())? {
            return Err(StyleError::Invalid(format!(
                "style '{}' already exists",
                new.name
            )));
        }

        let style = Style {
            id: self.db.generate_id()?,
            name: new.name,
            description: new.description,
            prompt_template: new.prompt_template,
            created_at: Utc::now(),
        };
        let value = serde_json::to_vec(&style)?;
        self.tree.insert(style.id.to_be_bytes().to_vec(), value)?;
        self.names
            .insert(style.name.as_bytes(), style.id.to_be_bytes().to_vec())?;
        self.tree.flush()?;

        self.cache_put(&style);
        Ok(style)
    }

    /// Retrieve a style by identity
    pub fn get_by_id(&self, id: u64) -> Result<Style, StyleError> {
        // Check cache first
        if let Some(style) = self.cache.by_id.read().unwrap().get(&id) {
            return Ok(style.clone());
        }

        let data = self
            .tree
            .get(id.to_be_bytes())?
            .ok_or_else(|| StyleError::NotFound(format!("id {id}")))?;
        let style: Style = serde_json::from_slice(&data)?;

        self.cache_put(&style);
        Ok(style)
    }

    /// Retrieve a style by its unique name
    pub fn get_by_name(&self, name: &str) -> Result<Style, StyleError> {
        // Check cache first
        if let Some(style) = self.cache.by_name.read().unwrap().get(name) {
            return Ok(style.clone());
        }

        let id_bytes = self
            .names
            .get(name.as_bytes())?
            .ok_or_else(|| StyleError::NotFound(name.to_string()))?;
        let mut id = [0u8; 8];
        id.copy_from_slice(&id_bytes);
        let id = u64::from_be_bytes(id);

        let data = self
            .tree
            .get(id.to_be_bytes())?
            .ok_or_else(|| StyleError::NotFound(name.to_string()))?;
        let style: Style = serde_json::from_slice(&data)?;

        self.cache_put(&style);
        Ok(style)
    }

    /// List all styles, newest first
    pub fn list(&self) -> Result<Vec<Style>, StyleError> {
        let mut styles = Vec::new();
        for item in self.tree.iter() {
            let (_key, value) = item?;
            let style: Style = serde_json::from_slice(&value)?;
            self.cache_put(&style);
            styles.push(style);
        }
        styles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(styles)
    }

    /// Create the built-in styles if they are missing, so the default style
    /// always resolves on a fresh deployment
    pub fn seed_defaults(&self) -> Result<(), StyleError> {
        let defaults = [
            (
                "concise",
                "A few plain sentences covering the essentials",
                "Summarise the following article in a few concise sentences. \
                 Focus on the main argument and the most important facts.",
            ),
            (
                "detailed",
                "A thorough multi-paragraph summary",
                "Write a detailed summary of the following article. Cover the \
                 main argument, the supporting evidence, and any conclusions, \
                 in several paragraphs.",
            ),
            (
                "bullet-points",
                "Key takeaways as a bulleted list",
                "Summarise the following article as a short list of bullet \
                 points, one key takeaway per line.",
            ),
        ];

        for (name, description, template) in defaults {
            if self.names.contains_key(name.as_bytes())? {
                continue;
            }
            self.create(NewStyle {
                name: name.to_string(),
                description: Some(description.to_string()),
                prompt_template: template.to_string(),
            })?;
        }
        Ok(())
    }

    fn cache_put(&self, style: &Style) {
        self.cache
            .by_id
            .write()
            .unwrap()
            .insert(style.id, style.clone());
        self.cache
            .by_name
            .write()
            .unwrap()
            .insert(style.name.clone(), style.clone());
    }
}
