//! Common helpers shared across CLI commands.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use areadata::api::{ReqwestTransport, SessionClient};
use areadata::config::ConfigFile;

use crate::error::CliError;

/// Load the config file at `path`, or the default one (defaults if absent).
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Build an authenticated client from config.
pub fn build_client(config: &ConfigFile) -> Result<SessionClient, CliError> {
    let credential = config.resolve_token()?;
    let transport =
        ReqwestTransport::with_timeout(Duration::from_secs(config.upload.timeout_secs))?;
    Ok(SessionClient::new(
        Arc::new(transport),
        config.figshare.base_url.clone(),
        credential,
    ))
}

/// Article from the command line, falling back to `[figshare] article_id`.
pub fn require_article(cli_article: Option<u64>, config: &ConfigFile) -> Result<u64, CliError> {
    cli_article.or(config.figshare.article_id).ok_or_else(|| {
        CliError::Config(
            "No article specified. Use --article or set [figshare] article_id in config.ini."
                .to_string(),
        )
    })
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
