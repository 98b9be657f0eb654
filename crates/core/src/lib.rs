pub mod article;
pub mod container;
pub mod error;
pub mod fetch;
pub mod images;
pub mod pipeline;
pub mod workspace;

pub use article::{Article, UNKNOWN_AUTHOR};
pub use container::{BookMetadata, Converter, PandocConverter, build_container, output_path, sanitize_title};
pub use error::{EpubError, Result};
pub use fetch::{DEFAULT_USER_AGENT, FetchConfig};
pub use fetch::{extract_article, fetch_article, fetch_url, try_fetch_article};
pub use images::{ImageReference, collect_image_references, local_filename, localize_images, rewrite_image_sources};
pub use pipeline::{EXIT_FAILURE, EXIT_SUCCESS, Pipeline, PipelineConfig, RunOutcome, Stage};
pub use workspace::Workspace;
