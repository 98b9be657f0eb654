mod echo;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use extract_epub_core::{
    DEFAULT_USER_AGENT, EXIT_FAILURE, FetchConfig, PandocConverter, Pipeline, PipelineConfig, RunOutcome,
};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extract an article and save it as an EPUB
#[derive(Parser, Debug)]
#[command(name = "extract-epub")]
#[command(version = VERSION)]
#[command(about = "Extract an article and save it as an EPUB", long_about = None)]
struct Args {
    /// URL of the article to convert
    #[arg(value_name = "URL")]
    url: String,

    /// Directory for the finished EPUB
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    output_dir: PathBuf,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Path to the pandoc binary (default: pandoc on PATH)
    #[arg(long, value_name = "PATH")]
    pandoc: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "extract_epub_core=debug,extract_epub=debug" } else { "extract_epub_core=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn converter(pandoc: Option<PathBuf>) -> PandocConverter {
    match pandoc {
        Some(path) => PandocConverter::new(path),
        None => PandocConverter::from_path().unwrap_or_else(|| {
            echo::print_warning("pandoc was not found on PATH; the conversion step will fail");
            PandocConverter::new("pandoc")
        }),
    }
}

async fn run(args: Args) -> anyhow::Result<RunOutcome> {
    let config = PipelineConfig {
        fetch: FetchConfig {
            timeout: args.timeout,
            user_agent: args.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        },
        output_dir: args.output_dir,
        workspace_root: None,
    };

    let pipeline = Pipeline::new(config, converter(args.pandoc)).context("Failed to set up HTTP client")?;
    tracing::debug!(
        pandoc = %pipeline.converter().binary_path().display(),
        output_dir = %pipeline.config().output_dir.display(),
        "pipeline ready"
    );

    echo::print_info(&format!("Attempting to extract article from: {}", args.url.bright_white().underline()));
    Ok(pipeline.run(&args.url).await)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    tracing::debug!(?args, "parsed arguments");

    if args.verbose {
        echo::print_banner();
    }

    match run(args).await {
        Ok(outcome) => {
            echo::print_outcome(&outcome);
            ExitCode::from(outcome.exit_code)
        }
        Err(e) => {
            echo::print_error(&format!("{e:#}"));
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
