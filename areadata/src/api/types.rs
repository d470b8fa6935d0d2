//! Wire types for the Figshare account and upload APIs.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a remote file resource.
///
/// Figshare reports `created` for freshly registered files and `available`
/// once processing has finished; both spellings are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    #[serde(alias = "created")]
    Pending,
    Uploading,
    #[serde(alias = "available")]
    Complete,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileStatus::Pending => "pending",
            FileStatus::Uploading => "uploading",
            FileStatus::Complete => "complete",
            FileStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A file attached to an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResource {
    pub id: u64,
    pub name: String,
    #[serde(default = "default_status")]
    pub status: FileStatus,
    #[serde(default)]
    pub size: Option<u64>,
    /// Base URL of the upload service for this file.
    #[serde(default)]
    pub upload_url: Option<String>,
    /// MD5 computed by the service from the bytes it received.
    #[serde(default)]
    pub computed_md5: Option<String>,
    /// MD5 declared when the file was registered.
    #[serde(default)]
    pub supplied_md5: Option<String>,
}

fn default_status() -> FileStatus {
    FileStatus::Unknown
}

/// Body sent to register a new file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewFile {
    pub name: String,
    pub md5: String,
    pub size: u64,
}

/// Body sent to create an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewArticle {
    pub title: String,
}

/// Location reference returned by create calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Location {
    pub location: String,
}

/// An article owned by the authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArticleSummary {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// One part as described by the upload service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePart {
    pub part_no: u32,
    pub start_offset: u64,
    pub end_offset: u64,
}

/// Upload service description of a pending file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePlan {
    /// Some deployments echo the upload URL; the file's URL is used otherwise.
    #[serde(default, alias = "upload_url", alias = "uploadURL")]
    pub upload_url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub parts: Vec<WirePart>,
}
