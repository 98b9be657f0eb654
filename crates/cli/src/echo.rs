use std::path::Path;

use extract_epub_core::RunOutcome;
use owo_colors::OwoColorize;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "extract-epub".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Save a web article as an EPUB\n".dimmed());
}

pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print the final status line of a run, and where the book went or which
/// stage stopped it.
pub fn print_outcome(outcome: &RunOutcome) {
    if outcome.success {
        eprintln!("{} {}", "✓".green(), format!("Success! {}", outcome.message).bright_green());
        if let Some(path) = &outcome.output {
            print_epub_details(path);
        }
        return;
    }

    print_error(&format!("An error occurred during the process: {}", outcome.message));
    if let Some(stage) = outcome.failed_stage {
        eprintln!("  {} {}", "Stage:".dimmed(), stage.to_string().bright_white());
    }
}

fn print_epub_details(path: &Path) {
    eprintln!("  {} {}", "File:".dimmed(), path.display().bright_white());
    if let Ok(meta) = std::fs::metadata(path) {
        eprintln!("  {} {}", "Size:".dimmed(), format_size(meta.len()).bright_white());
    }
}

/// Format file size for display
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
