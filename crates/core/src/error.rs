//! Error types for article-to-EPUB operations.
//!
//! [`EpubError`] covers every fatal condition the pipeline can hit: fetching
//! the page, extracting readable content, managing the workspace, and running
//! the converter. Per-image download failures never become an [`EpubError`]
//! that escapes the image localizer.
//!
//! # Example
//!
//! ```rust
//! use extract_epub_core::{EpubError, Result};
//!
//! fn require_content(html: &str) -> Result<&str> {
//!     if html.trim().is_empty() {
//!         return Err(EpubError::NoContent);
//!     }
//!     Ok(html)
//! }
//! ```

use thiserror::Error;

/// Main error type for the extraction and packaging pipeline.
#[derive(Error, Debug)]
pub enum EpubError {
    /// HTTP request errors from reqwest.
    ///
    /// Covers DNS failures, refused connections, and non-success status codes.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML could not be parsed or rewritten.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// The readability heuristic found nothing worth keeping.
    #[error("No content could be extracted from the document")]
    NoContent,

    /// Filesystem errors while writing images, the intermediate HTML, or the output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The per-run temporary directory could not be created.
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// The converter binary could not be started.
    #[error("Converter unavailable: {0}")]
    ConverterUnavailable(String),

    /// The converter ran and exited unsuccessfully.
    ///
    /// `stderr` holds the converter's own diagnostic output.
    #[error("Converter exited with {}: {stderr}", .status.map_or_else(|| "signal".to_string(), |c| format!("status {c}")))]
    ConverterFailed { status: Option<i32>, stderr: String },
}

/// Result type alias for EpubError.
pub type Result<T> = std::result::Result<T, EpubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EpubError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_timeout_error() {
        let err = EpubError::Timeout { timeout: 30 };
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn test_converter_failed_carries_stderr() {
        let err = EpubError::ConverterFailed { status: Some(64), stderr: "Unknown option --bogus".to_string() };
        let message = err.to_string();
        assert!(message.contains("status 64"));
        assert!(message.contains("Unknown option --bogus"));
    }

    #[test]
    fn test_converter_killed_by_signal() {
        let err = EpubError::ConverterFailed { status: None, stderr: String::new() };
        assert!(err.to_string().contains("signal"));
    }
}
