//! Content fetching and readable-article extraction.
//!
//! This module retrieves a page over HTTP and hands it to the readability
//! heuristic (`dom_smoothie`) to isolate the title, byline, and main content.

use std::time::Duration;

use dom_smoothie::Readability;
use reqwest::Client;
use url::Url;

use crate::{Article, EpubError, Result};

/// Desktop browser identification; some origins reject unidentified clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36";

/// HTTP client configuration for fetching pages and images.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// User-Agent sent with every request.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: DEFAULT_USER_AGENT.to_string() }
    }
}

impl FetchConfig {
    /// Builds the client shared by the article fetch and every image download.
    ///
    /// Redirects are followed with reqwest's default policy.
    pub fn build_client(&self) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout))
            .user_agent(&self.user_agent)
            .build()
            .map_err(EpubError::HttpError)
    }
}

/// Parses an article URL, accepting only `http` and `https`.
pub fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| EpubError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(EpubError::InvalidUrl(format!(
            "unsupported scheme '{other}' (expected http:// or https://)"
        ))),
    }
}

/// Fetches HTML content from a URL.
///
/// Non-success status codes are errors.
pub async fn fetch_url(client: &Client, url: &Url, config: &FetchConfig) -> Result<String> {
    let response = client
        .get(url.clone())
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| map_request_error(e, config))?;

    let content = response.text().await.map_err(|e| map_request_error(e, config))?;

    Ok(content)
}

/// Runs the readability heuristic over a fetched page.
pub fn extract_article(html: &str, source_url: &Url) -> Result<Article> {
    let mut reader = Readability::new(html, Some(source_url.as_str()), None)
        .map_err(|e| EpubError::HtmlParseError(format!("{e:?}")))?;

    let extracted = reader.parse().map_err(|e| {
        tracing::debug!(error = ?e, "readability heuristic rejected the document");
        EpubError::NoContent
    })?;

    let article = Article::new(
        extracted.title.to_string(),
        extracted.byline.map(|b| b.to_string()),
        extracted.content.to_string(),
        source_url.clone(),
    );

    if !article.has_content() {
        return Err(EpubError::NoContent);
    }

    Ok(article)
}

/// Fetches a page and extracts its readable article, reporting why it failed.
pub async fn try_fetch_article(client: &Client, url: &str, config: &FetchConfig) -> Result<Article> {
    let source_url = parse_url(url)?;
    let html = fetch_url(client, &source_url, config).await?;
    tracing::debug!(bytes = html.len(), url = %source_url, "fetched page");
    extract_article(&html, &source_url)
}

/// Fetches a page and extracts its readable article.
///
/// Failures are logged and collapsed to `None`; nothing is raised past this
/// boundary.
pub async fn fetch_article(client: &Client, url: &str, config: &FetchConfig) -> Option<Article> {
    match try_fetch_article(client, url, config).await {
        Ok(article) => Some(article),
        Err(e) => {
            tracing::error!(url, error = %e, "error fetching or parsing article");
            None
        }
    }
}

fn map_request_error(e: reqwest::Error, config: &FetchConfig) -> EpubError {
    if e.is_timeout() { EpubError::Timeout { timeout: config.timeout } } else { EpubError::HttpError(e) }
}
