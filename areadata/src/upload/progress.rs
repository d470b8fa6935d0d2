//! Progress reporting for part transfers.
//!
//! Workers update atomic counters; a reporter thread polls them and invokes
//! the caller's callback so UI updates never block a transfer.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Progress callback for a single file upload.
///
/// # Arguments
///
/// * `bytes_sent` - Bytes accepted by the upload service so far
/// * `total_bytes` - Size of the file
/// * `parts_done` - Number of parts accepted
/// * `total_parts` - Number of parts in the plan
pub type UploadProgressCallback = Arc<dyn Fn(u64, u64, usize, usize) + Send + Sync>;

/// Default interval between progress reports.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shared counters updated by transfer workers.
#[derive(Debug, Default)]
pub struct ProgressCounters {
    bytes_sent: AtomicU64,
    parts_done: AtomicUsize,
    done: AtomicBool,
}

impl ProgressCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a part of `bytes` bytes was accepted.
    pub fn record_part(&self, bytes: u64) {
        self.bytes_sent.fetch_add(bytes, Ordering::SeqCst);
        self.parts_done.fetch_add(1, Ordering::SeqCst);
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::SeqCst)
    }

    pub fn parts_done(&self) -> usize {
        self.parts_done.load(Ordering::SeqCst)
    }

    /// Signal that no more parts will be recorded.
    pub fn signal_done(&self) {
        self.done.store(true, Ordering::SeqCst);
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}

/// Background thread forwarding counter snapshots to a callback.
///
/// The reporter stops and emits a final snapshot when dropped.
pub struct ProgressReporter {
    handle: Option<JoinHandle<()>>,
    counters: Arc<ProgressCounters>,
}

impl ProgressReporter {
    /// Start polling `counters` every `poll_interval`.
    pub fn start(
        counters: Arc<ProgressCounters>,
        total_bytes: u64,
        total_parts: usize,
        callback: UploadProgressCallback,
        poll_interval: Duration,
    ) -> Self {
        let polled = Arc::clone(&counters);

        let handle = thread::spawn(move || {
            while !polled.is_done() {
                callback(polled.bytes_sent(), total_bytes, polled.parts_done(), total_parts);
                thread::sleep(poll_interval);
            }
            callback(polled.bytes_sent(), total_bytes, polled.parts_done(), total_parts);
        });

        Self {
            handle: Some(handle),
            counters,
        }
    }

    /// Start a reporter with the default 100ms poll interval.
    pub fn start_default(
        counters: Arc<ProgressCounters>,
        total_bytes: u64,
        total_parts: usize,
        callback: UploadProgressCallback,
    ) -> Self {
        Self::start(
            counters,
            total_bytes,
            total_parts,
            callback,
            DEFAULT_POLL_INTERVAL,
        )
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.counters.signal_done();
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}
