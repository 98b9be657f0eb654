//! Pipeline orchestration.
//!
//! [`Pipeline::run`] sequences one conversion:
//!
//! ```text
//! Fetching -> ExtractingImages -> BuildingContainer -> Done
//! ```
//!
//! Any of the first three stages may fail. The workspace is created right
//! after a successful fetch and removed before `run` returns, whatever the
//! outcome. `run` never touches the process; the caller turns the returned
//! [`RunOutcome`] into an exit code.

use std::fmt;
use std::path::PathBuf;

use reqwest::Client;

use crate::container::{BookMetadata, Converter, build_container};
use crate::fetch::{FetchConfig, fetch_article};
use crate::images::localize_images;
use crate::workspace::Workspace;
use crate::{Article, EpubError, Result};

/// Exit code of a successful run.
pub const EXIT_SUCCESS: u8 = 0;

/// Exit code of any fatal failure.
pub const EXIT_FAILURE: u8 = 1;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    ExtractingImages,
    BuildingContainer,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::ExtractingImages => "extracting images",
            Stage::BuildingContainer => "building container",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Settings for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// HTTP settings shared by the page fetch and image downloads.
    pub fetch: FetchConfig,
    /// Directory receiving the finished e-book.
    pub output_dir: PathBuf,
    /// Parent of the per-run workspace; the system temp directory when `None`.
    pub workspace_root: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { fetch: FetchConfig::default(), output_dir: PathBuf::from("."), workspace_root: None }
    }
}

/// Result of one pipeline run.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub success: bool,
    /// User-facing summary.
    pub message: String,
    pub exit_code: u8,
    /// Absolute path of the e-book on success.
    pub output: Option<PathBuf>,
    /// Stage that failed, if any.
    pub failed_stage: Option<Stage>,
}

impl RunOutcome {
    fn succeeded(output: PathBuf) -> Self {
        Self {
            success: true,
            message: format!("EPUB file created at: {}", output.display()),
            exit_code: EXIT_SUCCESS,
            output: Some(output),
            failed_stage: None,
        }
    }

    fn failed(stage: Stage, message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), exit_code: EXIT_FAILURE, output: None, failed_stage: Some(stage) }
    }
}

/// Article-to-EPUB pipeline over an injectable converter.
pub struct Pipeline<C> {
    config: PipelineConfig,
    client: Client,
    converter: C,
}

impl<C: Converter> Pipeline<C> {
    /// Builds a pipeline and its HTTP client.
    pub fn new(config: PipelineConfig, converter: C) -> Result<Self> {
        let client = config.fetch.build_client()?;
        Ok(Self { config, client, converter })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    /// Converts the article at `url` into an e-book.
    pub async fn run(&self, url: &str) -> RunOutcome {
        tracing::info!(url, stage = %Stage::Fetching, "attempting to extract article");

        let Some(article) = fetch_article(&self.client, url, &self.config.fetch).await.filter(Article::has_content)
        else {
            return RunOutcome::failed(Stage::Fetching, "Could not extract article content.");
        };

        tracing::info!(title = %article.title, byline = %article.byline, "article extracted");

        let workspace = match self.create_workspace() {
            Ok(workspace) => workspace,
            Err(e) => return RunOutcome::failed(Stage::ExtractingImages, e.to_string()),
        };
        tracing::info!(path = %workspace.path().display(), "created temporary directory");

        let result = self.package(&article, &workspace).await;

        match workspace.remove().await {
            Ok(path) => tracing::info!(path = %path.display(), "cleaned up temporary directory"),
            Err(e) => tracing::warn!(error = %e, "failed to clean up temporary directory"),
        }

        match result {
            Ok(output) => {
                tracing::info!(output = %output.display(), stage = %Stage::Done, "EPUB created");
                RunOutcome::succeeded(output)
            }
            Err((stage, e)) => {
                tracing::error!(stage = %stage, error = %e, "pipeline failed");
                RunOutcome::failed(stage, e.to_string())
            }
        }
    }

    fn create_workspace(&self) -> Result<Workspace> {
        match &self.config.workspace_root {
            Some(root) => Workspace::create_in(root),
            None => Workspace::create(),
        }
    }

    async fn package(&self, article: &Article, workspace: &Workspace) -> std::result::Result<PathBuf, (Stage, EpubError)> {
        tracing::info!(stage = %Stage::ExtractingImages, "localizing images");
        let html = localize_images(&self.client, article, workspace.path())
            .await
            .map_err(|e| (Stage::ExtractingImages, e))?;

        tracing::info!(stage = %Stage::BuildingContainer, converter = self.converter.name(), "creating EPUB file");
        let metadata = BookMetadata { title: article.title.clone(), author: article.byline.clone() };
        build_container(&self.converter, &html, &metadata, workspace.path(), &self.config.output_dir)
            .await
            .map_err(|e| (Stage::BuildingContainer, e))
    }
}
