//! Configuration CLI commands.
//!
//! Provides `config path` and `config show`.

use std::path::Path;

use areadata::config::{config_file_path, ConfigFile, TOKEN_ENV_VAR};
use clap::Subcommand;

use super::common::load_config;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration (token redacted)
    Show,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            let path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(config_file_path);
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let config = load_config(config_path)?;
            print!("{}", render(&config));
            Ok(())
        }
    }
}

fn render(config: &ConfigFile) -> String {
    let token = match config.resolve_token() {
        Ok(_) => "(set)",
        Err(_) => "(not set)",
    };
    let article = config
        .figshare
        .article_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "(not set)".to_string());

    let mut out = String::new();
    out.push_str("[figshare]\n");
    out.push_str(&format!("  base_url = {}\n", config.figshare.base_url));
    out.push_str(&format!(
        "  token_file = {}\n",
        config.figshare.token_file.display()
    ));
    out.push_str(&format!("  token = {} ({} or token_file)\n", token, TOKEN_ENV_VAR));
    out.push_str(&format!("  article_id = {}\n", article));
    out.push('\n');
    out.push_str("[upload]\n");
    out.push_str(&format!("  parallel = {}\n", config.upload.parallel));
    out.push_str(&format!("  max_attempts = {}\n", config.upload.max_attempts));
    out.push_str(&format!("  timeout_secs = {}\n", config.upload.timeout_secs));
    out.push_str(&format!(
        "  relist_after_delete = {}\n",
        config.upload.relist_after_delete
    ));
    out
}
