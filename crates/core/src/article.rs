//! Article type produced by the content fetcher.
//!
//! An [`Article`] is the readable part of a web page: its title, byline,
//! content HTML, and the URL it was fetched from. The URL is kept so image
//! references in the content can be resolved later.

use url::Url;

/// Byline used when the page does not name an author.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// The readable content of a single web page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Article title as found by the readability heuristic.
    pub title: String,

    /// Author line, or [`UNKNOWN_AUTHOR`].
    pub byline: String,

    /// Extracted readable content as HTML.
    pub content: String,

    /// The URL the page was fetched from.
    pub source_url: Url,
}

impl Article {
    /// Creates a new Article, falling back to [`UNKNOWN_AUTHOR`] when the
    /// byline is missing or blank.
    pub fn new(title: String, byline: Option<String>, content: String, source_url: Url) -> Self {
        let byline = byline
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

        Self { title: title.trim().to_string(), byline, content, source_url }
    }

    /// Whether the content holds anything besides whitespace.
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}
