//! Content extraction from web pages.
//!
//! Uses reqwest for fetching, scraper for the readability pass, and whatlang
//! for language identification.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;
use whatlang::{Detector, Lang};

/// User-Agent string mimicking a desktop browser; some sites reject
/// unrecognised clients outright
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Default timeout for HTTP requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Languages the detector is allowed to report
const DETECT_LANGUAGES: [Lang; 5] = [Lang::Eng, Lang::Ind, Lang::Spa, Lang::Fra, Lang::Deu];

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("failed to fetch URL: {0}")]
    FetchError(#[from] reqwest::Error),
    #[error("webpage returned status code {0}")]
    BadStatus(u16),
    #[error("no readable content found at URL")]
    NoContent,
}

/// Extracted content from a webpage
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// Page title
    pub title: String,
    /// Main text content with boilerplate removed
    pub content: String,
    /// ISO 639-1 language code, when detection is confident
    pub language: Option<String>,
    /// Site name from page metadata
    pub site_name: Option<String>,
    /// Author or byline
    pub author: Option<String>,
    /// Short excerpt or description
    pub excerpt: Option<String>,
    /// Lead image URL
    pub image_url: Option<String>,
    /// Publish timestamp, when the page declares one
    pub published: Option<DateTime<Utc>>,
}

/// Turns a URL into [`ExtractedContent`].
///
/// The pipeline depends on this trait rather than the concrete fetcher so
/// tests can substitute canned content.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ExtractedContent, ExtractError>;
}

/// Fetching extractor backed by a shared HTTP client.
pub struct WebExtractor {
    client: Client,
}

impl WebExtractor {
    /// Create an extractor with browser-mimicking headers and a bounded timeout
    pub fn new() -> Result<Self, ExtractError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ContentExtractor for WebExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedContent, ExtractError> {
        let parsed_url = parse_url(url)?;

        let start = Instant::now();
        let response = self.client.get(parsed_url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ExtractError::BadStatus(status.as_u16()));
        }
        let html = response.text().await?;

        let mut content = parse_article(&html)?;
        tracing::info!("content extraction completed in {:?}", start.elapsed());

        let lang_start = Instant::now();
        content.language = detect_language(&content.content);
        tracing::debug!("language detection completed in {:?}", lang_start.elapsed());

        Ok(content)
    }
}

/// Validate the URL shape before any network call
fn parse_url(raw: &str) -> Result<Url, ExtractError> {
    if raw.trim().is_empty() {
        return Err(ExtractError::InvalidUrl("URL cannot be empty".to_string()));
    }
    let parsed = Url::parse(raw).map_err(|e| ExtractError::InvalidUrl(e.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ExtractError::InvalidUrl(format!(
            "unsupported scheme: {}",
            parsed.scheme()
        )));
    }
    Ok(parsed)
}

/// Run the readability pass over a buffered HTML document
fn parse_article(html: &str) -> Result<ExtractedContent, ExtractError> {
    let document = Html::parse_document(html);

    let text = extract_text(&document);
    if text.trim().is_empty() {
        return Err(ExtractError::NoContent);
    }

    let title = extract_title(&document).unwrap_or_default();

    Ok(ExtractedContent {
        title,
        content: text,
        language: None,
        site_name: meta_content(&document, "meta[property='og:site_name']"),
        author: meta_content(&document, "meta[name='author']")
            .or_else(|| meta_content(&document, "meta[property='article:author']")),
        excerpt: meta_content(&document, "meta[property='og:description']")
            .or_else(|| meta_content(&document, "meta[name='description']")),
        image_url: meta_content(&document, "meta[property='og:image']"),
        published: meta_content(&document, "meta[property='article:published_time']")
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc)),
    })
}

/// Extract the page title from og:title, <title> or <h1>
fn extract_title(document: &Html) -> Option<String> {
    if let Some(title) = meta_content(document, "meta[property='og:title']") {
        return Some(title);
    }

    let title_selector = Selector::parse("title").unwrap();
    if let Some(element) = document.select(&title_selector).next() {
        let title: String = element.text().collect();
        if !title.trim().is_empty() {
            return Some(title.trim().to_string());
        }
    }

    // Fall back to first <h1>
    let h1_selector = Selector::parse("h1").unwrap();
    if let Some(element) = document.select(&h1_selector).next() {
        let title: String = element.text().collect();
        if !title.trim().is_empty() {
            return Some(title.trim().to_string());
        }
    }

    None
}

/// First matching meta tag's content attribute
fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Extract readable text content from the page
fn extract_text(document: &Html) -> String {
    // Try to find main content areas first
    let main_selectors = ["article", "main", "[role='main']", ".content", "#content"];

    for selector_str in main_selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let text = extract_text_from_element(&Html::parse_fragment(&element.html()));
                if !text.trim().is_empty() {
                    return text;
                }
            }
        }
    }

    // Fall back to extracting from body, excluding scripts/styles
    extract_text_from_element(document)
}

/// Extract text from paragraphs and headings, excluding scripts and styles
fn extract_text_from_element(document: &Html) -> String {
    let content_selector = Selector::parse("p, h1, h2, h3, h4, h5, h6, li").unwrap();

    let mut paragraphs: Vec<String> = Vec::new();

    for element in document.select(&content_selector) {
        let text: String = element.text().collect::<Vec<_>>().join(" ");
        let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");

        if !cleaned.is_empty() && cleaned.len() > 20 {
            paragraphs.push(cleaned);
        }
    }

    paragraphs.join("\n\n")
}

/// Identify the main text's language within a fixed closed set.
///
/// Returns the ISO 639-1 code, or None when the detector is not confident.
fn detect_language(text: &str) -> Option<String> {
    let detector = Detector::with_allowlist(DETECT_LANGUAGES.to_vec());
    let info = detector.detect(text)?;
    if !info.is_reliable() {
        return None;
    }
    iso639_1(info.lang()).map(str::to_string)
}

fn iso639_1(lang: Lang) -> Option<&'static str> {
    match lang {
        Lang::Eng => Some("en"),
        Lang::Ind => Some("id"),
        Lang::Spa => Some("es"),
        Lang::Fra => Some("fr"),
        Lang::Deu => Some("de"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Fallback Title</title>
  <meta property="og:title" content="Example Article">
  <meta property="og:site_name" content="Example News">
  <meta property="og:description" content="A piece about examples.">
  <meta property="og:image" content="https://example.com/lead.jpg">
  <meta name="author" content="Jane Doe">
  <meta property="article:published_time" content="2024-03-01T09:30:00Z">
</head>
<body>
  <nav><ul><li>Home</li><li>About</li></ul></nav>
  <article>
    <h1>Example Article</h1>
    <p>This is the opening paragraph of the article, long enough to keep.</p>
    <p>A second paragraph continues the story with further details here.</p>
  </article>
</body>
</html>"#;

    #[test]
    fn rejects_empty_and_malformed_urls() {
        assert!(matches!(parse_url(""), Err(ExtractError::InvalidUrl(_))));
        assert!(matches!(
            parse_url("   "),
            Err(ExtractError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_url("not a url"),
            Err(ExtractError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_url("/relative/path"),
            Err(ExtractError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_url("ftp://example.com/file"),
            Err(ExtractError::InvalidUrl(_))
        ));
        assert!(parse_url("https://example.com/article").is_ok());
    }

    #[test]
    fn parses_article_with_metadata() {
        let content = parse_article(ARTICLE_HTML).unwrap();
        assert_eq!(content.title, "Example Article");
        assert!(content.content.contains("opening paragraph"));
        assert!(!content.content.contains("Home"));
        assert_eq!(content.site_name.as_deref(), Some("Example News"));
        assert_eq!(content.author.as_deref(), Some("Jane Doe"));
        assert_eq!(content.excerpt.as_deref(), Some("A piece about examples."));
        assert_eq!(
            content.image_url.as_deref(),
            Some("https://example.com/lead.jpg")
        );
        assert!(content.published.is_some());
    }

    #[test]
    fn empty_page_is_no_content() {
        let result = parse_article("<html><body></body></html>");
        assert!(matches!(result, Err(ExtractError::NoContent)));
    }

    #[test]
    fn title_falls_back_to_title_tag() {
        let html = "<html><head><title>Only Title</title></head>\
                    <body><p>Some paragraph content that is long enough to keep.</p></body></html>";
        let content = parse_article(html).unwrap();
        assert_eq!(content.title, "Only Title");
    }

    #[test]
    fn detects_english_text() {
        let text = "The quick brown fox jumps over the lazy dog. \
                    This sentence and the ones around it are clearly written in English, \
                    which the detector should identify with high confidence.";
        assert_eq!(detect_language(text).as_deref(), Some("en"));
    }

    #[test]
    fn empty_text_has_no_language() {
        assert_eq!(detect_language(""), None);
    }
}
