//! Lifecycle of one remote file resource.
//!
//! ```text
//! Created ──fetch_plan──> PlanFetched ──begin_transfer──> Transferring ──finalize──> Finalized
//!    │                         │                              │
//!    └─────────────────────────┴──────────── abort ───────────┴──> Aborted
//! ```

use tracing::{debug, info, warn};

use super::plan::PartitionPlan;
use super::transfer::TransferReport;
use crate::api::{
    endpoints, FileResource, FileStatus, Location, Method, NewFile, SessionClient, WirePlan,
};
use crate::digest::UploadDescriptor;
use crate::error::{UploadError, UploadResult};

/// Lifecycle state of an [`UploadSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    PlanFetched,
    Transferring,
    Finalized,
    Aborted,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Created => "Created",
            SessionState::PlanFetched => "PlanFetched",
            SessionState::Transferring => "Transferring",
            SessionState::Finalized => "Finalized",
            SessionState::Aborted => "Aborted",
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Finalized | SessionState::Aborted)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Upload of one local file into one article.
#[derive(Debug)]
pub struct UploadSession {
    client: SessionClient,
    article_id: u64,
    descriptor: UploadDescriptor,
    resource: FileResource,
    plan: Option<PartitionPlan>,
    state: SessionState,
}

impl UploadSession {
    /// Register the file with the article and load the full resource record.
    ///
    /// Empty files are rejected before any request is made. If the record
    /// cannot be loaded after registration, the registered file is deleted
    /// again before the error is returned.
    pub fn create(
        client: &SessionClient,
        article_id: u64,
        descriptor: UploadDescriptor,
    ) -> UploadResult<Self> {
        if descriptor.size_bytes == 0 {
            return Err(UploadError::InvalidDescriptor {
                path: descriptor.path.clone(),
                reason: "file is empty".to_string(),
            });
        }

        let body = NewFile {
            name: descriptor.name(),
            md5: descriptor.digest_hex.clone(),
            size: descriptor.size_bytes,
        };
        let location: Location = client.post_json(&endpoints::article_files(article_id), &body)?;
        info!(
            article = article_id,
            name = %body.name,
            location = %location.location,
            "Initiated file upload"
        );

        let resource: FileResource = match client.get_json_url(&location.location) {
            Ok(resource) => resource,
            Err(e) => {
                if let Err(cleanup) =
                    client.request_url::<()>(Method::Delete, &location.location, None)
                {
                    warn!(
                        location = %location.location,
                        error = %cleanup,
                        "Failed to clean up registered file"
                    );
                }
                return Err(e);
            }
        };
        debug!(file_id = resource.id, status = %resource.status, "Loaded file resource");

        Ok(Self {
            client: client.clone(),
            article_id,
            descriptor,
            resource,
            plan: None,
            state: SessionState::Created,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn resource(&self) -> &FileResource {
        &self.resource
    }

    pub fn descriptor(&self) -> &UploadDescriptor {
        &self.descriptor
    }

    pub fn article_id(&self) -> u64 {
        self.article_id
    }

    /// The plan, once fetched.
    pub fn plan(&self) -> Option<&PartitionPlan> {
        self.plan.as_ref()
    }

    /// Fetch and validate the partition plan from the upload service.
    ///
    /// The plan is fetched once; a plan that does not tile the file exactly
    /// is a [`UploadError::Protocol`] error.
    pub fn fetch_plan(&mut self) -> UploadResult<&PartitionPlan> {
        self.expect_state(SessionState::Created, SessionState::PlanFetched)?;

        let upload_url = self
            .resource
            .upload_url
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                UploadError::Protocol(format!(
                    "file {} has no upload URL",
                    self.resource.id
                ))
            })?;

        let wire: WirePlan = self.client.get_json_url(&upload_url)?;
        let plan = PartitionPlan::from_wire(wire, &upload_url, self.descriptor.size_bytes)?;
        debug!(file_id = self.resource.id, parts = plan.part_count(), "Fetched partition plan");

        self.state = SessionState::PlanFetched;
        Ok(&*self.plan.insert(plan))
    }

    /// Mark the start of part transfer.
    pub fn begin_transfer(&mut self) -> UploadResult<&PartitionPlan> {
        self.expect_state(SessionState::PlanFetched, SessionState::Transferring)?;
        self.state = SessionState::Transferring;
        self.plan
            .as_ref()
            .ok_or(UploadError::InvalidTransition {
                from: SessionState::Created.name(),
                to: SessionState::Transferring.name(),
            })
    }

    /// Signal completion and verify what the service received.
    ///
    /// `report` must account for every part of the plan; anything else is a
    /// caller error and no request is sent. After completion the resource is
    /// re-read and its size and digest compared with the local descriptor.
    pub fn finalize(&mut self, report: &TransferReport) -> UploadResult<&FileResource> {
        self.expect_state(SessionState::Transferring, SessionState::Finalized)?;
        let complete = self.plan.as_ref().is_some_and(|plan| report.covers(plan));
        if !complete {
            return Err(UploadError::InvalidTransition {
                from: "Transferring (incomplete)",
                to: SessionState::Finalized.name(),
            });
        }

        let endpoint = endpoints::article_file(self.article_id, self.resource.id);
        self.client.request::<()>(Method::Post, &endpoint, None)?;

        let resource: FileResource = self.client.get_json(&endpoint)?;
        self.verify(&resource)?;

        info!(
            article = self.article_id,
            file_id = resource.id,
            name = %resource.name,
            status = %resource.status,
            "Completed file upload"
        );

        self.resource = resource;
        self.state = SessionState::Finalized;
        Ok(&self.resource)
    }

    /// Best-effort removal of the partially uploaded resource.
    ///
    /// Failures are logged and swallowed. Does nothing once the session has
    /// reached a terminal state.
    pub fn abort(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        let endpoint = endpoints::article_file(self.article_id, self.resource.id);
        match self.client.request::<()>(Method::Delete, &endpoint, None) {
            Ok(_) => info!(file_id = self.resource.id, from = %self.state, "Aborted file upload"),
            Err(e) => warn!(
                file_id = self.resource.id,
                error = %e,
                "Failed to clean up aborted upload"
            ),
        }
        self.state = SessionState::Aborted;
    }

    fn expect_state(&self, expected: SessionState, to: SessionState) -> UploadResult<()> {
        if self.state != expected {
            return Err(UploadError::InvalidTransition {
                from: self.state.name(),
                to: to.name(),
            });
        }
        Ok(())
    }

    fn verify(&self, remote: &FileResource) -> UploadResult<()> {
        let name = self.descriptor.name();

        if let Some(size) = remote.size {
            if size != self.descriptor.size_bytes {
                return Err(UploadError::ChecksumMismatch {
                    name,
                    expected: format!("{} bytes", self.descriptor.size_bytes),
                    actual: format!("{} bytes", size),
                });
            }
        }

        if let Some(md5) = remote.computed_md5.as_deref().filter(|m| !m.is_empty()) {
            if !md5.eq_ignore_ascii_case(&self.descriptor.digest_hex) {
                return Err(UploadError::ChecksumMismatch {
                    name,
                    expected: self.descriptor.digest_hex.clone(),
                    actual: md5.to_string(),
                });
            }
        }

        if remote.status == FileStatus::Pending {
            warn!(file_id = remote.id, "File still pending after completion");
        }

        Ok(())
    }
}
