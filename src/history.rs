//! Sled-based storage for summarisation history.
//!
//! Records are written exactly once per successful pipeline run and never
//! mutated. Keys are big-endian record ids, so a reverse key scan yields
//! newest-first ordering.

use crate::style::{Style, STYLES_TREE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const HISTORY_TREE: &str = "history";

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("database error: {0}")]
    DbError(#[from] sled::Error),
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("invalid history record: {0}")]
    Invalid(String),
    #[error("history record not found: {0}")]
    NotFound(u64),
}

/// The durable result of one successful pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: u64,
    /// Source URL the content was extracted from
    pub url: String,
    pub title: Option<String>,
    /// Full extracted article text
    pub content: String,
    /// Generated summary
    pub summary: String,
    /// Identity of the style the summary was conditioned on
    pub style_id: u64,
    /// ISO 639-1 language code of the content, when detected
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a record; the store assigns id and timestamp
#[derive(Debug, Clone)]
pub struct NewHistory {
    pub url: String,
    pub title: Option<String>,
    pub content: String,
    pub summary: String,
    pub style_id: u64,
    pub language: Option<String>,
}

/// A history record joined against the style it referenced.
///
/// The style is None only if its row has vanished; no code path deletes
/// styles today.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryWithStyle {
    pub record: HistoryRecord,
    pub style: Option<Style>,
}

/// Sled-backed store for history records.
pub struct HistoryStore {
    db: sled::Db,
    tree: sled::Tree,
    styles: sled::Tree,
}

impl HistoryStore {
    /// Open the history tree within an existing database
    pub fn open(db: &sled::Db) -> Result<Self, HistoryError> {
        let tree = db.open_tree(HISTORY_TREE)?;
        let styles = db.open_tree(STYLES_TREE)?;
        Ok(Self {
            db: db.clone(),
            tree,
            styles,
        })
    }

    /// Validate and persist a record, assigning its identity
    pub fn create(&self, new: NewHistory) -> Result<HistoryRecord, HistoryError> {
        validate(&new)?;

        let record = HistoryRecord {
            id: self.db.generate_id()?,
            url: new.url,
            title: new.title,
            content: new.content,
            summary: new.summary,
            style_id: new.style_id,
            language: new.language,
            created_at: Utc::now(),
        };
        let value = serde_json::to_vec(&record)?;
        self.tree.insert(record.id.to_be_bytes().to_vec(), value)?;
        self.tree.flush()?;

        Ok(record)
    }

    /// Retrieve a record by identity
    pub fn get_by_id(&self, id: u64) -> Result<HistoryRecord, HistoryError> {
        let data = self
            .tree
            .get(id.to_be_bytes())?
            .ok_or(HistoryError::NotFound(id))?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Retrieve a record left-outer-joined against its style.
    ///
    /// Reads the styles tree directly rather than going through the style
    /// cache, mirroring a storage-level join.
    pub fn get_with_style(&self, id: u64) -> Result<HistoryWithStyle, HistoryError> {
        let record = self.get_by_id(id)?;
        let style = self.join_style(record.style_id)?;
        Ok(HistoryWithStyle { record, style })
    }

    /// List records ordered by creation time, descending
    pub fn list(&self, limit: usize, offset: usize) -> Result<Vec<HistoryRecord>, HistoryError> {
        let mut records = Vec::new();
        for item in self.tree.iter().rev().skip(offset).take(limit) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }

    /// List records with their styles joined, newest first
    pub fn list_with_styles(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<HistoryWithStyle>, HistoryError> {
        let mut records = Vec::new();
        for record in self.list(limit, offset)? {
            let style = self.join_style(record.style_id)?;
            records.push(HistoryWithStyle { record, style });
        }
        Ok(records)
    }

    /// Case-insensitive substring search over title and url, newest first
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<HistoryRecord>, HistoryError> {
        let needle = query.to_lowercase();
        let mut matches = Vec::new();
        for item in self.tree.iter().rev() {
            let (_key, value) = item?;
            let record: HistoryRecord = serde_json::from_slice(&value)?;
            let title_hit = record
                .title
                .as_deref()
                .map(|title| title.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if title_hit || record.url.to_lowercase().contains(&needle) {
                matches.push(record);
            }
        }
        Ok(matches.into_iter().skip(offset).take(limit).collect())
    }

    /// Total number of stored records
    pub fn count(&self) -> usize {
        self.tree.len()
    }

    fn join_style(&self, style_id: u64) -> Result<Option<Style>, HistoryError> {
        match self.styles.get(style_id.to_be_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }
}

/// Validation rules applied before any write
fn validate(new: &NewHistory) -> Result<(), HistoryError> {
    let parsed = Url::parse(&new.url)
        .map_err(|e| HistoryError::Invalid(format!("invalid URL: {e}")))?;
    if !parsed.has_host() {
        return Err(HistoryError::Invalid(
            "URL must be absolute with a host".to_string(),
        ));
    }
    if new.content.trim().is_empty() {
        return Err(HistoryError::Invalid("content cannot be empty".to_string()));
    }
    if new.summary.trim().is_empty() {
        return Err(HistoryError::Invalid("summary cannot be empty".to_string()));
    }
    if let Some(lang) = &new.language {
        if lang.len() != 2 || !lang.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(HistoryError::Invalid(format!(
                "language must be a 2-letter lowercase code, got '{lang}'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{NewStyle, StyleStore};
    use tempfile::TempDir;

    fn temp_stores() -> (TempDir, StyleStore, HistoryStore) {
        let dir = TempDir::new().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let styles = StyleStore::open(&db).unwrap();
        let history = HistoryStore::open(&db).unwrap();
        (dir, styles, history)
    }

    fn new_record(url: &str, title: &str, style_id: u64) -> NewHistory {
        NewHistory {
            url: url.to_string(),
            title: Some(title.to_string()),
            content: "The extracted article text.".to_string(),
            summary: "A short summary.".to_string(),
            style_id,
            language: Some("en".to_string()),
        }
    }

    #[test]
    fn create_assigns_identity() {
        let (_dir, _styles, history) = temp_stores();
        let record = history
            .create(new_record("https://example.com/a", "First", 1))
            .unwrap();
        assert_eq!(history.get_by_id(record.id).unwrap().url, record.url);
        assert_eq!(history.count(), 1);
    }

    #[test]
    fn validates_before_persisting() {
        let (_dir, _styles, history) = temp_stores();

        let mut bad_url = new_record("not-a-url", "Bad", 1);
        bad_url.url = "not-a-url".to_string();
        assert!(matches!(
            history.create(bad_url),
            Err(HistoryError::Invalid(_))
        ));

        let mut empty_summary = new_record("https://example.com/a", "Bad", 1);
        empty_summary.summary = "  ".to_string();
        assert!(matches!(
            history.create(empty_summary),
            Err(HistoryError::Invalid(_))
        ));

        let mut bad_language = new_record("https://example.com/a", "Bad", 1);
        bad_language.language = Some("EN".to_string());
        assert!(matches!(
            history.create(bad_language),
            Err(HistoryError::Invalid(_))
        ));

        let mut long_language = new_record("https://example.com/a", "Bad", 1);
        long_language.language = Some("eng".to_string());
        assert!(matches!(
            history.create(long_language),
            Err(HistoryError::Invalid(_))
        ));

        assert_eq!(history.count(), 0);
    }

    #[test]
    fn absent_language_is_allowed() {
        let (_dir, _styles, history) = temp_stores();
        let mut record = new_record("https://example.com/a", "First", 1);
        record.language = None;
        let created = history.create(record).unwrap();
        assert_eq!(created.language, None);
    }

    #[test]
    fn list_is_newest_first() {
        let (_dir, _styles, history) = temp_stores();
        for i in 0..3 {
            history
                .create(new_record(
                    &format!("https://example.com/{i}"),
                    &format!("Article {i}"),
                    1,
                ))
                .unwrap();
        }

        let listed = history.list(10, 0).unwrap();
        let urls: Vec<_> = listed.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/2",
                "https://example.com/1",
                "https://example.com/0"
            ]
        );
    }

    #[test]
    fn list_pagination() {
        let (_dir, _styles, history) = temp_stores();
        for i in 0..5 {
            history
                .create(new_record(
                    &format!("https://example.com/{i}"),
                    &format!("Article {i}"),
                    1,
                ))
                .unwrap();
        }

        let page = history.list(2, 1).unwrap();
        let urls: Vec<_> = page.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/3", "https://example.com/2"]);

        // Unchanged store returns the same sequence
        let again = history.list(2, 1).unwrap();
        let urls_again: Vec<_> = again.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, urls_again);
    }

    #[test]
    fn search_matches_title_or_url() {
        let (_dir, _styles, history) = temp_stores();
        history
            .create(new_record(
                "https://example.com/rust-release",
                "Rust 1.80 released",
                1,
            ))
            .unwrap();
        history
            .create(new_record("https://example.com/other", "Gardening tips", 1))
            .unwrap();

        let by_title = history.search("rust", 10, 0).unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].title.as_deref(), Some("Rust 1.80 released"));

        let by_url = history.search("example.com/other", 10, 0).unwrap();
        assert_eq!(by_url.len(), 1);

        let no_hit = history.search("cooking", 10, 0).unwrap();
        assert!(no_hit.is_empty());
    }

    #[test]
    fn get_with_style_joins() {
        let (_dir, styles, history) = temp_stores();
        let style = styles
            .create(NewStyle {
                name: "concise".to_string(),
                description: None,
                prompt_template: "Summarise this.".to_string(),
            })
            .unwrap();

        let record = history
            .create(new_record("https://example.com/a", "First", style.id))
            .unwrap();
        let joined = history.get_with_style(record.id).unwrap();
        assert_eq!(joined.style.as_ref().map(|s| s.name.as_str()), Some("concise"));

        // Dangling style reference degrades to None rather than failing
        let orphan = history
            .create(new_record("https://example.com/b", "Second", 9999))
            .unwrap();
        let joined = history.get_with_style(orphan.id).unwrap();
        assert!(joined.style.is_none());
    }

    #[test]
    fn missing_record_is_not_found() {
        let (_dir, _styles, history) = temp_stores();
        assert!(matches!(
            history.get_by_id(7),
            Err(HistoryError::NotFound(7))
        ));
    }
}
