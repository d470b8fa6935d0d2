//! AREAdata CLI - Command-line interface
//!
//! Publishes freshly built climate data products by replacing the files of a
//! Figshare article.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use areadata::logging::{self, LoggingConfig};
use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::replace::ReplaceArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "areadata", version, about, long_about = None)]
struct Cli {
    /// Use this config file instead of ~/.areadata/config.ini
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to daily rolling files in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Delete an article's files and upload replacements
    Replace(ReplaceArgs),

    /// List the files of an article
    Files {
        /// Article ID (defaults to [figshare] article_id)
        #[arg(short, long)]
        article: Option<u64>,
    },

    /// List the articles of the account
    Articles,

    /// Create a new, empty article
    CreateArticle {
        /// Article title
        #[arg(short, long)]
        title: String,
    },

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = LoggingConfig::default();
    if cli.verbose {
        log_config = log_config.with_default_filter("areadata=debug,info");
    }
    if let Some(dir) = &cli.log_dir {
        log_config = log_config.with_log_dir(dir);
    }
    let _guard = match logging::init(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: failed to initialize logging: {}", e);
            None
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Replace(args) => commands::replace::run(args, config_path),
        Commands::Files { article } => commands::files::run(article, config_path),
        Commands::Articles => commands::articles::run_list(config_path),
        Commands::CreateArticle { title } => commands::articles::run_create(&title, config_path),
        Commands::Config(command) => commands::config::run(command, config_path),
    }
}
