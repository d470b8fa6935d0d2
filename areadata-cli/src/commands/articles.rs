//! Article commands - list the account's articles and create new ones.

use std::path::Path;

use areadata::replace::ResourceReplacer;

use super::common::{build_client, load_config};
use crate::error::CliError;

/// List the articles of the account.
pub fn run_list(config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let replacer = ResourceReplacer::new(build_client(&config)?);

    let articles = replacer.list_articles()?;

    println!("Articles:");
    if articles.is_empty() {
        println!("  (none)");
    }
    for article in articles {
        println!("  {} - {} ({})", article.id, article.title, article.url);
    }
    Ok(())
}

/// Create an article titled `title` and print its id.
pub fn run_create(title: &str, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let replacer = ResourceReplacer::new(build_client(&config)?);

    let id = replacer.create_article(title)?;

    println!("Created article {}", id);
    println!("Set article_id = {} in config.ini [figshare] to make it the default.", id);
    Ok(())
}
