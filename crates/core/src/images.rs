//! Image localization.
//!
//! Every `img` in an article body is resolved against the article URL,
//! downloaded into the workspace under a name derived from the SHA-256 of its
//! absolute URL, and its `src` rewritten to that bare filename. Downloads run
//! concurrently and fail independently: an image that cannot be fetched keeps
//! pointing at its remote URL.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use futures::future::join_all;
use html_escape::decode_html_entities;
use reqwest::Client;
use scraper::{Html, Selector};
use sha2::{Digest, Sha256};
use url::Url;

use crate::{Article, EpubError, Result};

/// Extension used when the image URL path has none.
pub const DEFAULT_IMAGE_EXTENSION: &str = ".jpg";

/// An image in the article body and the workspace file it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Absolute URL the image is downloaded from.
    pub url: Url,
    /// Bare filename inside the workspace.
    pub local_filename: String,
}

impl ImageReference {
    /// Pairs an absolute URL with its derived workspace filename.
    pub fn new(url: Url) -> Self {
        let local_filename = local_filename(&url);
        Self { url, local_filename }
    }
}

/// Derives the workspace filename for an absolute image URL.
///
/// Equal URLs always produce the same name.
pub fn local_filename(url: &Url) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());

    let extension = Path::new(url.path())
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{e}"))
        .unwrap_or_else(|| DEFAULT_IMAGE_EXTENSION.to_string());

    format!("{digest:x}{extension}")
}

/// Resolves an `img` source against the article URL.
///
/// Only `http` and `https` results are downloadable; `data:` URIs and other
/// schemes are left for the converter to handle as-is.
fn resolve_image_url(src: &str, base: &Url) -> std::result::Result<Url, String> {
    let url = base.join(src.trim()).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

/// Collects the distinct downloadable images of an HTML fragment in
/// document order.
///
/// Elements without a usable `src` are logged and skipped.
pub fn collect_image_references(html: &str, base: &Url) -> Result<Vec<ImageReference>> {
    let fragment = Html::parse_fragment(html);
    let selector = Selector::parse("img").map_err(|e| EpubError::HtmlParseError(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut references = Vec::new();

    for img in fragment.select(&selector) {
        let Some(src) = img.value().attr("src").map(str::trim).filter(|s| !s.is_empty()) else {
            tracing::debug!(element = %img.html(), "image without a source, skipping");
            continue;
        };

        match resolve_image_url(src, base) {
            Ok(url) => {
                if seen.insert(url.clone()) {
                    references.push(ImageReference::new(url));
                }
            }
            Err(reason) => tracing::warn!(src, reason = %reason, "invalid image URL, leaving as-is"),
        }
    }

    Ok(references)
}

/// Downloads one image into `dir` under its local filename.
pub async fn download_image(client: &Client, reference: &ImageReference, dir: &Path) -> Result<()> {
    let bytes = client
        .get(reference.url.clone())
        .send()
        .await
        .and_then(|r| r.error_for_status())?
        .bytes()
        .await?;

    tokio::fs::write(dir.join(&reference.local_filename), &bytes).await?;
    Ok(())
}

/// Rewrites `img` sources whose resolved URL appears in `localized`.
///
/// Any other markup passes through untouched.
pub fn rewrite_image_sources(html: &str, base: &Url, localized: &HashMap<Url, String>) -> Result<String> {
    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("img[src]", |el| {
                // lol_html hands back the raw attribute; collection saw it decoded.
                if let Some(src) = el.get_attribute("src")
                    && let Ok(url) = resolve_image_url(&decode_html_entities(&src), base)
                    && let Some(local) = localized.get(&url)
                {
                    el.set_attribute("src", local)?;
                }
                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| EpubError::HtmlParseError(e.to_string()))?;
    rewriter.end().map_err(|e| EpubError::HtmlParseError(e.to_string()))?;

    String::from_utf8(output).map_err(|e| EpubError::HtmlParseError(e.to_string()))
}

/// Downloads every image of the article into `workspace` and returns the
/// content with localized `src` attributes.
///
/// All downloads are awaited before rewriting; a failed download is logged
/// and its images keep their remote URL.
pub async fn localize_images(client: &Client, article: &Article, workspace: &Path) -> Result<String> {
    let references = collect_image_references(&article.content, &article.source_url)?;

    if references.is_empty() {
        tracing::info!("No images found in the article.");
        return Ok(article.content.clone());
    }

    tracing::info!(count = references.len(), "Found images. Downloading...");

    let downloads = references.iter().map(|reference| async move {
        let outcome = download_image(client, reference, workspace).await;
        (reference, outcome)
    });

    let mut localized = HashMap::new();
    for (reference, outcome) in join_all(downloads).await {
        match outcome {
            Ok(()) => {
                tracing::info!(url = %reference.url, file = %reference.local_filename, "downloaded image");
                localized.insert(reference.url.clone(), reference.local_filename.clone());
            }
            Err(e) => tracing::warn!(url = %reference.url, error = %e, "failed to download image"),
        }
    }

    if localized.is_empty() {
        return Ok(article.content.clone());
    }

    rewrite_image_sources(&article.content, &article.source_url, &localized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn base() -> Url {
        Url::parse("https://example.com/blog/post.html").unwrap()
    }

    fn article(content: &str, source_url: Url) -> Article {
        Article::new("Post".to_string(), None, content.to_string(), source_url)
    }

    #[test]
    fn test_local_filename_is_deterministic() {
        let a = Url::parse("https://cdn.example.com/a/cat.png").unwrap();
        let b = Url::parse("https://cdn.example.com/a/cat.png").unwrap();
        assert_eq!(local_filename(&a), local_filename(&b));
        assert_ne!(
            local_filename(&a),
            local_filename(&Url::parse("https://cdn.example.com/a/dog.png").unwrap())
        );
    }

    #[test]
    fn test_local_filename_keeps_extension() {
        let url = Url::parse("https://cdn.example.com/a/cat.png?w=600").unwrap();
        let name = local_filename(&url);
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), 64 + ".png".len());
        assert!(name[..64].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_local_filename_default_extension() {
        let url = Url::parse("https://cdn.example.com/images/12345").unwrap();
        assert!(local_filename(&url).ends_with(DEFAULT_IMAGE_EXTENSION));
    }

    #[test]
    fn test_collect_resolves_and_dedups() {
        let html = r#"<p><img src="img/a.png"><img src="/blog/img/a.png"><img src="https://other.org/b.gif"></p>"#;
        let refs = collect_image_references(html, &base()).unwrap();

        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].url.as_str(), "https://example.com/blog/img/a.png");
        assert_eq!(refs[1].url.as_str(), "https://other.org/b.gif");
    }

    #[test]
    fn test_collect_skips_unusable_sources() {
        let html = r#"<img><img src=""><img src="   "><img src="data:image/png;base64,AAAA"><img src="ok.jpg">"#;
        let refs = collect_image_references(html, &base()).unwrap();

        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].url.as_str(), "https://example.com/blog/ok.jpg");
    }

    #[test]
    fn test_rewrite_only_localized_sources() {
        let html = r#"<p><img src="a.png" alt="a"> and <img src="b.png" alt="b"></p>"#;
        let a = Url::parse("https://example.com/blog/a.png").unwrap();
        let localized = HashMap::from([(a.clone(), local_filename(&a))]);

        let rewritten = rewrite_image_sources(html, &base(), &localized).unwrap();

        assert!(rewritten.contains(&format!(r#"src="{}""#, local_filename(&a))));
        assert!(rewritten.contains(r#"src="b.png""#));
        assert!(rewritten.contains(r#"alt="a""#));
    }

    #[test]
    fn test_rewrite_matches_entity_encoded_query() {
        let html = r#"<p><img src="/media/p.png?w=1&amp;h=2"></p>"#;
        let refs = collect_image_references(html, &base()).unwrap();
        assert_eq!(refs[0].url.as_str(), "https://example.com/media/p.png?w=1&h=2");

        let localized = HashMap::from([(refs[0].url.clone(), refs[0].local_filename.clone())]);
        let rewritten = rewrite_image_sources(html, &base(), &localized).unwrap();

        assert_eq!(rewritten, format!(r#"<p><img src="{}"></p>"#, refs[0].local_filename));
    }

    #[tokio::test]
    async fn test_localize_rewrites_multi_parameter_urls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/p.png"))
            .and(query_param("w", "1"))
            .and(query_param("h", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let source = Url::parse(&format!("{}/posts/1", server.uri())).unwrap();
        let content = r#"<p><img src="/media/p.png?w=1&amp;h=2"></p>"#;
        let dir = TempDir::new().unwrap();

        let result = localize_images(&Client::new(), &article(content, source.clone()), dir.path()).await.unwrap();

        let name = local_filename(&source.join("/media/p.png?w=1&h=2").unwrap());
        assert_eq!(result, format!(r#"<p><img src="{name}"></p>"#));
        assert!(dir.path().join(&name).exists());
    }

    #[tokio::test]
    async fn test_localize_without_images_is_unchanged() {
        let dir = TempDir::new().unwrap();
        let content = "<div><p>Just words, <em>no pictures</em>.</p></div>";
        let client = Client::new();

        let result = localize_images(&client, &article(content, base()), dir.path()).await.unwrap();

        assert_eq!(result, content);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_localize_downloads_and_tolerates_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/ok.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG fake".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/media/gone.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = Url::parse(&format!("{}/posts/1", server.uri())).unwrap();
        let content = r#"<p><img src="/media/ok.png"></p><p><img src="/media/gone.png"></p><p><img src="/media/ok.png"></p>"#;
        let dir = TempDir::new().unwrap();
        let client = Client::new();

        let result = localize_images(&client, &article(content, source.clone()), dir.path()).await.unwrap();

        let ok = source.join("/media/ok.png").unwrap();
        let gone = source.join("/media/gone.png").unwrap();
        let ok_name = local_filename(&ok);

        assert_eq!(result.matches(&format!(r#"src="{ok_name}""#)).count(), 2);
        assert!(result.contains(r#"src="/media/gone.png""#));
        assert_eq!(std::fs::read(dir.path().join(&ok_name)).unwrap(), b"\x89PNG fake");
        assert!(!dir.path().join(local_filename(&gone)).exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
