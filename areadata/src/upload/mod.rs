//! Chunked uploads of single files.
//!
//! An upload walks one [`UploadSession`] through its lifecycle: the file is
//! registered, the upload service hands back a [`PartitionPlan`], the
//! [`PartTransferEngine`] sends every part, and the session is finalized and
//! verified against the local MD5 digest.

mod plan;
mod policy;
mod progress;
mod session;
mod transfer;

pub use plan::{validate as validate_plan, PartSpec, PartitionPlan};
pub use policy::{
    backoff_sleep, RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_SECS,
};
pub use progress::{ProgressCounters, ProgressReporter, UploadProgressCallback};
pub use session::{SessionState, UploadSession};
pub use transfer::{
    ParallelStrategy, PartResult, PartTransferEngine, SequentialStrategy, TransferContext,
    TransferReport, TransferStrategy,
};
