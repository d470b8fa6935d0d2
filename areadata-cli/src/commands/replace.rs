//! Replace command - delete an article's files and upload replacements.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use areadata::replace::{BatchReport, ResourceReplacer};
use areadata::upload::{PartTransferEngine, RetryPolicy, UploadProgressCallback};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::common::{build_client, load_config, require_article};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ReplaceArgs {
    /// Article ID (defaults to [figshare] article_id)
    #[arg(short, long)]
    pub article: Option<u64>,

    /// Concurrent part uploads per file (defaults to [upload] parallel)
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Attempts per part before giving up (defaults to [upload] max_attempts)
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Upload alongside the existing files instead of deleting them
    #[arg(long)]
    pub keep_existing: bool,

    /// Re-list the article after each delete (logged at debug level)
    #[arg(long)]
    pub relist: bool,

    /// Files to upload, in order
    #[arg(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,
}

/// Run the replace command.
pub fn run(args: ReplaceArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let article_id = require_article(args.article, &config)?;
    let client = build_client(&config)?;

    let parallel = args.parallel.unwrap_or(config.upload.parallel).max(1);
    let max_attempts = args.max_attempts.unwrap_or(config.upload.max_attempts);

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {msg} ({eta})",
        )
        .map_err(|e| CliError::Config(e.to_string()))?
        .progress_chars("=> "),
    );
    let progress_bar = bar.clone();
    let progress: UploadProgressCallback =
        Arc::new(move |bytes_sent, total_bytes, parts_done, total_parts| {
            progress_bar.set_length(total_bytes);
            progress_bar.set_position(bytes_sent);
            progress_bar.set_message(format!("parts {}/{}", parts_done, total_parts));
        });

    let engine = PartTransferEngine::new(client.clone())
        .with_policy(RetryPolicy::exponential(max_attempts))
        .with_concurrency(parallel)
        .with_progress(progress);
    let replacer = ResourceReplacer::new(client)
        .with_engine(engine)
        .with_keep_existing(args.keep_existing)
        .with_relist_after_delete(args.relist || config.upload.relist_after_delete);

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received interrupt, cancelling uploads...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    info!(
        article = article_id,
        files = args.files.len(),
        parallel,
        "Replacing article files"
    );

    let result = replacer.replace(article_id, &args.files, &cancel);
    bar.finish_and_clear();
    let report = result?;

    print_summary(article_id, &report);

    if cancel.is_cancelled() {
        return Err(CliError::Interrupted);
    }
    let failed = report.failed().count();
    if failed > 0 {
        return Err(CliError::UploadsFailed {
            failed,
            total: report.outcomes.len(),
        });
    }
    Ok(())
}

fn print_summary(article_id: u64, report: &BatchReport) {
    println!();
    println!("Article {}", article_id);
    println!("  Deleted:   {} file(s)", report.deleted.len());
    println!("  Uploaded:  {} file(s)", report.succeeded().count());
    println!("  Failed:    {} file(s)", report.failed().count());
    println!();

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(resource) => println!(
                "  {} {} (id {})",
                style("✓").green(),
                outcome.path.display(),
                resource.id
            ),
            Err(e) => println!(
                "  {} {}: {}",
                style("✗").red(),
                outcome.path.display(),
                e
            ),
        }
    }
}
