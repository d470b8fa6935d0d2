//! Part transfer engine.
//!
//! Sends every byte range of a [`PartitionPlan`] to its part endpoint. Two
//! strategies are available:
//!
//! - [`SequentialStrategy`] sends parts one after another through a single
//!   file handle.
//! - [`ParallelStrategy`] runs a bounded pool of scoped worker threads, each
//!   with its own file handle, pulling parts from a shared queue. The first
//!   fatal error cancels every queued part and stops in-flight retries.
//!
//! Transient failures are retried per part according to the [`RetryPolicy`];
//! non-transient failures surface immediately.

use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::plan::{PartSpec, PartitionPlan};
use super::policy::{backoff_sleep, RetryPolicy};
use super::progress::{ProgressCounters, ProgressReporter, UploadProgressCallback};
use crate::api::{Method, SessionClient};
use crate::error::{UploadError, UploadResult};

/// Outcome of one accepted part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartResult {
    pub part_number: u32,
    pub bytes: u64,
    /// Attempts it took, including the successful one.
    pub attempts: u32,
}

/// All accepted parts of one file, ordered by part number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub parts: Vec<PartResult>,
}

impl TransferReport {
    /// Whether every part of `plan`, and nothing else, was accepted.
    pub fn covers(&self, plan: &PartitionPlan) -> bool {
        let accepted: HashSet<u32> = self.parts.iter().map(|p| p.part_number).collect();
        accepted.len() == self.parts.len()
            && accepted.len() == plan.part_count()
            && plan
                .parts()
                .iter()
                .all(|p| accepted.contains(&p.part_number))
    }

    pub fn total_bytes(&self) -> u64 {
        self.parts.iter().map(|p| p.bytes).sum()
    }

    /// Number of parts that needed more than one attempt.
    pub fn retried_parts(&self) -> usize {
        self.parts.iter().filter(|p| p.attempts > 1).count()
    }
}

/// Everything a strategy needs to send the parts of one file.
pub struct TransferContext<'a> {
    pub client: &'a SessionClient,
    pub plan: &'a PartitionPlan,
    pub path: &'a Path,
    pub policy: &'a RetryPolicy,
    pub cancel: &'a CancellationToken,
    pub progress: &'a ProgressCounters,
}

/// Strategy for sending the parts of a plan.
pub trait TransferStrategy: Send + Sync {
    /// Send every part, returning the accepted parts in any order.
    fn execute(&self, ctx: &TransferContext<'_>) -> UploadResult<Vec<PartResult>>;
}

/// Sends parts one at a time through a single file handle.
#[derive(Debug, Default)]
pub struct SequentialStrategy;

impl SequentialStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl TransferStrategy for SequentialStrategy {
    fn execute(&self, ctx: &TransferContext<'_>) -> UploadResult<Vec<PartResult>> {
        let mut file = open(ctx.path)?;
        let mut results = Vec::with_capacity(ctx.plan.part_count());

        for part in ctx.plan.parts() {
            let result = send_part(ctx, part, &mut file, ctx.cancel)?;
            ctx.progress.record_part(result.bytes);
            results.push(result);
        }

        Ok(results)
    }
}

/// Sends parts concurrently with a bounded number of workers.
#[derive(Debug)]
pub struct ParallelStrategy {
    /// Maximum number of concurrent part transfers.
    pub workers: usize,
}

impl ParallelStrategy {
    /// Create a parallel strategy (minimum one worker).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }
}

impl Default for ParallelStrategy {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TransferStrategy for ParallelStrategy {
    fn execute(&self, ctx: &TransferContext<'_>) -> UploadResult<Vec<PartResult>> {
        let parts = ctx.plan.parts();
        let next = AtomicUsize::new(0);
        let results = Mutex::new(Vec::with_capacity(parts.len()));
        let first_error: Mutex<Option<UploadError>> = Mutex::new(None);
        // Cancelled by the first fatal part error or by the caller.
        let fail_fast = ctx.cancel.child_token();

        let record_error = |error: UploadError| {
            let mut slot = first_error.lock().unwrap_or_else(|p| p.into_inner());
            // A worker that merely observed the cancellation must not mask
            // the error that caused it.
            let replace = match slot.as_ref() {
                None => true,
                Some(UploadError::Cancelled) => !matches!(error, UploadError::Cancelled),
                Some(_) => false,
            };
            if replace {
                *slot = Some(error);
            }
        };

        let workers = self.workers.min(parts.len());
        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    let mut file = match open(ctx.path) {
                        Ok(f) => f,
                        Err(e) => {
                            record_error(e);
                            fail_fast.cancel();
                            return;
                        }
                    };

                    loop {
                        if fail_fast.is_cancelled() {
                            break;
                        }
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(part) = parts.get(index) else {
                            break;
                        };

                        match send_part(ctx, part, &mut file, &fail_fast) {
                            Ok(result) => {
                                ctx.progress.record_part(result.bytes);
                                results
                                    .lock()
                                    .unwrap_or_else(|p| p.into_inner())
                                    .push(result);
                            }
                            Err(e) => {
                                record_error(e);
                                fail_fast.cancel();
                                break;
                            }
                        }
                    }
                });
            }
        });

        if let Some(error) = first_error.into_inner().unwrap_or_else(|p| p.into_inner()) {
            return Err(error);
        }
        if ctx.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        Ok(results.into_inner().unwrap_or_else(|p| p.into_inner()))
    }
}

/// Drives part transfers for one file at a time.
#[derive(Clone)]
pub struct PartTransferEngine {
    client: SessionClient,
    policy: RetryPolicy,
    concurrency: usize,
    progress: Option<UploadProgressCallback>,
}

impl std::fmt::Debug for PartTransferEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartTransferEngine")
            .field("policy", &self.policy)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl PartTransferEngine {
    /// Sequential engine with the default retry policy.
    pub fn new(client: SessionClient) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
            concurrency: 1,
            progress: None,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Number of concurrent part transfers per file (1 = sequential).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress(mut self, callback: UploadProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send every part of `plan`, reading bytes from `path`.
    ///
    /// Returns only when all parts were accepted, or with the first fatal
    /// error. File handles are closed before returning in both cases.
    pub fn transfer(
        &self,
        plan: &PartitionPlan,
        path: &Path,
        cancel: &CancellationToken,
    ) -> UploadResult<TransferReport> {
        let on_disk = std::fs::metadata(path)
            .map_err(|e| UploadError::io(path, e))?
            .len();
        if on_disk != plan.size_bytes() {
            return Err(UploadError::InvalidDescriptor {
                path: path.to_path_buf(),
                reason: format!(
                    "file is {} bytes but the plan expects {}",
                    on_disk,
                    plan.size_bytes()
                ),
            });
        }

        let counters = Arc::new(ProgressCounters::new());
        let _reporter = self.progress.as_ref().map(|cb| {
            ProgressReporter::start_default(
                Arc::clone(&counters),
                plan.size_bytes(),
                plan.part_count(),
                Arc::clone(cb),
            )
        });

        let ctx = TransferContext {
            client: &self.client,
            plan,
            path,
            policy: &self.policy,
            cancel,
            progress: &counters,
        };

        info!(
            path = %path.display(),
            parts = plan.part_count(),
            bytes = plan.size_bytes(),
            concurrency = self.concurrency,
            "Transferring parts"
        );

        let mut parts = if self.concurrency <= 1 {
            SequentialStrategy::new().execute(&ctx)?
        } else {
            ParallelStrategy::new(self.concurrency).execute(&ctx)?
        };
        parts.sort_by_key(|p| p.part_number);

        let report = TransferReport { parts };
        debug_assert!(report.covers(plan));

        info!(
            path = %path.display(),
            bytes = report.total_bytes(),
            retried = report.retried_parts(),
            "All parts accepted"
        );

        Ok(report)
    }
}

fn open(path: &Path) -> UploadResult<File> {
    File::open(path).map_err(|e| UploadError::io(path, e))
}

/// Read the exact byte range of `part` from `file`.
fn read_part(file: &mut File, path: &Path, part: &PartSpec) -> UploadResult<Vec<u8>> {
    file.seek(SeekFrom::Start(part.start_offset))
        .map_err(|e| UploadError::io(path, e))?;

    let mut buffer = vec![0u8; part.len() as usize];
    file.read_exact(&mut buffer)
        .map_err(|e| UploadError::io(path, e))?;

    Ok(buffer)
}

/// Send one part, retrying transient failures against the same plan.
fn send_part(
    ctx: &TransferContext<'_>,
    part: &PartSpec,
    file: &mut File,
    cancel: &CancellationToken,
) -> UploadResult<PartResult> {
    if cancel.is_cancelled() {
        return Err(UploadError::Cancelled);
    }

    let bytes = read_part(file, ctx.path, part)?;
    let url = ctx.plan.part_url(part);
    let mut attempts = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        attempts += 1;

        match ctx.client.send_binary(Method::Put, &url, bytes.clone()) {
            Ok(_) => {
                debug!(
                    part = part.part_number,
                    start = part.start_offset,
                    end = part.end_offset,
                    attempts,
                    "Uploaded part"
                );
                return Ok(PartResult {
                    part_number: part.part_number,
                    bytes: part.len(),
                    attempts,
                });
            }
            Err(error) => match ctx.policy.retry_delay(&error, attempts) {
                Some(delay) => {
                    warn!(
                        part = part.part_number,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Part upload failed, retrying"
                    );
                    if !backoff_sleep(delay, cancel) {
                        return Err(UploadError::Cancelled);
                    }
                }
                None if error.is_transient() => {
                    return Err(UploadError::PartTransferFailed {
                        part_number: part.part_number,
                        attempts,
                        last_error: Box::new(error),
                    });
                }
                None => {
                    warn!(part = part.part_number, error = %error, "Part rejected");
                    return Err(error);
                }
            },
        }
    }
}
