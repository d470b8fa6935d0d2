//! Replacing the files of an article.
//!
//! A replace run deletes every file currently attached to the article, then
//! uploads each local file in order. Each file is isolated: a failure aborts
//! that file's session and is recorded, and the remaining files still run.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::{
    endpoints, ArticleSummary, FileResource, Location, Method, NewArticle, SessionClient,
};
use crate::digest::UploadDescriptor;
use crate::error::{UploadError, UploadResult};
use crate::upload::{PartTransferEngine, UploadSession};

/// Result of uploading one local file.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: UploadResult<FileResource>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Result of a replace run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Ids of the remote files removed before uploading.
    pub deleted: Vec<u64>,
    /// One outcome per local file, in the order given.
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| !o.is_success())
    }
}

/// Replaces the files of articles through one authenticated client.
#[derive(Debug, Clone)]
pub struct ResourceReplacer {
    client: SessionClient,
    engine: PartTransferEngine,
    keep_existing: bool,
    relist_after_delete: bool,
}

impl ResourceReplacer {
    /// Replacer using a sequential transfer engine with default retries.
    pub fn new(client: SessionClient) -> Self {
        let engine = PartTransferEngine::new(client.clone());
        Self {
            client,
            engine,
            keep_existing: false,
            relist_after_delete: false,
        }
    }

    pub fn with_engine(mut self, engine: PartTransferEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Upload alongside the existing files instead of deleting them first.
    pub fn with_keep_existing(mut self, keep: bool) -> Self {
        self.keep_existing = keep;
        self
    }

    /// List the article again after each delete and log what remains.
    pub fn with_relist_after_delete(mut self, relist: bool) -> Self {
        self.relist_after_delete = relist;
        self
    }

    pub fn client(&self) -> &SessionClient {
        &self.client
    }

    /// Files currently attached to `article_id`.
    pub fn list_files(&self, article_id: u64) -> UploadResult<Vec<FileResource>> {
        self.client.get_json(&endpoints::article_files(article_id))
    }

    pub fn delete_file(&self, article_id: u64, file_id: u64) -> UploadResult<()> {
        self.client
            .request::<()>(Method::Delete, &endpoints::article_file(article_id, file_id), None)?;
        Ok(())
    }

    /// Articles owned by the authenticated account.
    pub fn list_articles(&self) -> UploadResult<Vec<ArticleSummary>> {
        self.client.get_json(&endpoints::articles())
    }

    /// Create an empty article and return its id.
    pub fn create_article(&self, title: &str) -> UploadResult<u64> {
        let body = NewArticle {
            title: title.to_string(),
        };
        let location: Location = self.client.post_json(&endpoints::articles(), &body)?;
        let article: ArticleSummary = self.client.get_json_url(&location.location)?;
        info!(article = article.id, title = %title, "Created article");
        Ok(article.id)
    }

    /// Replace the files of `article_id` with `paths`.
    ///
    /// Failing to list or delete the existing files stops the run before any
    /// upload starts. Upload failures are reported per file. Once `cancel`
    /// fires, files not yet started are reported as [`UploadError::Cancelled`].
    pub fn replace(
        &self,
        article_id: u64,
        paths: &[PathBuf],
        cancel: &CancellationToken,
    ) -> UploadResult<BatchReport> {
        let mut report = BatchReport::default();

        if !self.keep_existing {
            report.deleted = self.delete_existing(article_id, cancel)?;
        }

        for path in paths {
            let result = if cancel.is_cancelled() {
                Err(UploadError::Cancelled)
            } else {
                self.upload_one(article_id, path, cancel)
            };

            match &result {
                Ok(resource) => info!(
                    path = %path.display(),
                    file_id = resource.id,
                    "Uploaded file"
                ),
                Err(e) => error!(path = %path.display(), error = %e, "Upload failed"),
            }

            report.outcomes.push(FileOutcome {
                path: path.clone(),
                result,
            });
        }

        info!(
            article = article_id,
            deleted = report.deleted.len(),
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            "Replace finished"
        );

        Ok(report)
    }

    /// Delete a snapshot of the article's current files.
    fn delete_existing(
        &self,
        article_id: u64,
        cancel: &CancellationToken,
    ) -> UploadResult<Vec<u64>> {
        let snapshot: Vec<u64> = self.list_files(article_id)?.iter().map(|f| f.id).collect();
        info!(article = article_id, count = snapshot.len(), "Deleting existing files");

        let mut deleted = Vec::with_capacity(snapshot.len());
        for file_id in snapshot {
            if cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }
            self.delete_file(article_id, file_id)?;
            debug!(article = article_id, file_id, "Deleted file");
            deleted.push(file_id);

            if self.relist_after_delete {
                match self.list_files(article_id) {
                    Ok(remaining) => debug!(
                        article = article_id,
                        remaining = remaining.len(),
                        "Files remaining after delete"
                    ),
                    Err(e) => warn!(article = article_id, error = %e, "Re-list failed"),
                }
            }
        }

        Ok(deleted)
    }

    /// Run one file through its session, aborting the session on failure.
    fn upload_one(
        &self,
        article_id: u64,
        path: &Path,
        cancel: &CancellationToken,
    ) -> UploadResult<FileResource> {
        let descriptor = UploadDescriptor::compute(path)?;
        debug!(
            path = %path.display(),
            md5 = %descriptor.digest_hex,
            size = descriptor.size_bytes,
            "Computed digest"
        );

        let mut session = UploadSession::create(&self.client, article_id, descriptor)?;

        match self.drive(&mut session, path, cancel) {
            Ok(resource) => Ok(resource),
            Err(e) => {
                session.abort();
                Err(e)
            }
        }
    }

    fn drive(
        &self,
        session: &mut UploadSession,
        path: &Path,
        cancel: &CancellationToken,
    ) -> UploadResult<FileResource> {
        session.fetch_plan()?;
        let plan = session.begin_transfer()?.clone();
        let report = self.engine.transfer(&plan, path, cancel)?;
        session.finalize(&report).cloned()
    }
}
