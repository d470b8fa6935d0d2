//! Files command - list the files of an article.

use std::path::Path;

use areadata::replace::ResourceReplacer;

use super::common::{build_client, format_size, load_config, require_article};
use crate::error::CliError;

/// Run the files command.
pub fn run(article: Option<u64>, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let article_id = require_article(article, &config)?;
    let replacer = ResourceReplacer::new(build_client(&config)?);

    let files = replacer.list_files(article_id)?;

    println!("Files of article {}:", article_id);
    if files.is_empty() {
        println!("  (none)");
    }
    for file in files {
        let size = file.size.map(format_size).unwrap_or_else(|| "-".to_string());
        println!("  {} - {} ({}, {})", file.id, file.name, file.status, size);
    }
    Ok(())
}
