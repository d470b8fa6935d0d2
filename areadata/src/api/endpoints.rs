//! Figshare account API endpoints, relative to the configured base URL.

/// Default base URL of the Figshare v2 API.
pub const DEFAULT_BASE_URL: &str = "https://api.figshare.com/v2";

/// Articles owned by the authenticated account.
pub fn articles() -> String {
    "account/articles".to_string()
}

/// Files attached to an article.
pub fn article_files(article_id: u64) -> String {
    format!("account/articles/{}/files", article_id)
}

/// A single file of an article (complete with POST, remove with DELETE).
pub fn article_file(article_id: u64, file_id: u64) -> String {
    format!("account/articles/{}/files/{}", article_id, file_id)
}

/// Upload service endpoint for one part.
pub fn upload_part(upload_url: &str, part_number: u32) -> String {
    format!("{}/{}", upload_url.trim_end_matches('/'), part_number)
}
