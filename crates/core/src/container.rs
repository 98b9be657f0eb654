//! E-book container assembly.
//!
//! The rewritten article HTML is written into the workspace and handed to a
//! [`Converter`], which turns it into an EPUB outside the workspace. The
//! production converter is [`PandocConverter`]; tests substitute their own.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::{EpubError, Result};

/// File name of the intermediate HTML inside the workspace.
pub const INPUT_HTML_FILENAME: &str = "article.html";

/// Extension of the finished e-book.
pub const EPUB_EXTENSION: &str = "epub";

/// Token used for the output name when a title has no characters at all.
pub const FALLBACK_FILENAME: &str = "article";

/// Container metadata passed to the converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
}

/// Converts an HTML file into an e-book.
///
/// `input` is relative to `cwd`, which is also where local image files
/// referenced by bare filename live. `output` is absolute.
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(&self, input: &Path, output: &Path, metadata: &BookMetadata, cwd: &Path) -> Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Converter backed by the external `pandoc` binary.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    binary_path: PathBuf,
}

impl PandocConverter {
    /// Uses an explicit pandoc binary.
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self { binary_path: binary_path.into() }
    }

    /// Looks for `pandoc` on `PATH`.
    pub fn from_path() -> Option<Self> {
        which::which("pandoc").ok().map(Self::new)
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn command(&self, input: &Path, output: &Path, metadata: &BookMetadata, cwd: &Path) -> Command {
        let mut command = Command::new(&self.binary_path);
        command
            .arg(input)
            .arg("-o")
            .arg(output)
            .arg("--metadata")
            .arg(format!("title={}", metadata.title))
            .arg("--metadata")
            .arg(format!("author={}", metadata.author))
            .arg("--resource-path=.")
            .current_dir(cwd);
        command
    }
}

#[async_trait]
impl Converter for PandocConverter {
    async fn convert(&self, input: &Path, output: &Path, metadata: &BookMetadata, cwd: &Path) -> Result<()> {
        tracing::info!(cwd = %cwd.display(), "running pandoc");

        let result = self
            .command(input, output, metadata, cwd)
            .output()
            .await
            .map_err(|e| EpubError::ConverterUnavailable(format!("failed to execute {}: {e}", self.binary_path.display())))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            tracing::error!(stderr = %stderr, "pandoc failed");
            return Err(EpubError::ConverterFailed { status: result.status.code(), stderr });
        }

        tracing::debug!(stdout = %String::from_utf8_lossy(&result.stdout).trim(), "pandoc output");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "pandoc"
    }
}

/// Turns a title into a filesystem-safe token.
///
/// Every character other than an ASCII letter or digit becomes `_` and the
/// result is lowercased. Distinct titles can map to the same token.
pub fn sanitize_title(title: &str) -> String {
    let token: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();

    if token.is_empty() { FALLBACK_FILENAME.to_string() } else { token }
}

/// Where the e-book for `title` lands inside `output_dir`.
pub fn output_path(output_dir: &Path, title: &str) -> Result<PathBuf> {
    let file = output_dir.join(format!("{}.{EPUB_EXTENSION}", sanitize_title(title)));
    Ok(std::path::absolute(file)?)
}

/// Writes `html` into the workspace and converts it into an EPUB in
/// `output_dir`, returning the absolute path of the result.
pub async fn build_container<C: Converter + ?Sized>(
    converter: &C, html: &str, metadata: &BookMetadata, workspace: &Path, output_dir: &Path,
) -> Result<PathBuf> {
    let input = Path::new(INPUT_HTML_FILENAME);
    tokio::fs::write(workspace.join(input), html).await?;

    tokio::fs::create_dir_all(output_dir).await?;
    let output = output_path(output_dir, &metadata.title)?;

    tracing::debug!(converter = converter.name(), output = %output.display(), "converting article");
    converter.convert(input, &output, metadata, workspace).await?;

    Ok(output)
}
