//! AREAdata - publishing climate data products to Figshare
//!
//! This library replaces the files of a Figshare article with freshly
//! produced data files. Each file is uploaded through Figshare's chunked
//! upload protocol and verified against its local MD5 digest.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! use areadata::api::{Credential, ReqwestTransport, SessionClient};
//! use areadata::api::endpoints::DEFAULT_BASE_URL;
//! use areadata::replace::ResourceReplacer;
//! use tokio_util::sync::CancellationToken;
//!
//! let transport = Arc::new(ReqwestTransport::new()?);
//! let client = SessionClient::new(transport, DEFAULT_BASE_URL, Credential::new("token"));
//! let report = ResourceReplacer::new(client).replace(
//!     16587311,
//!     &[PathBuf::from("data/temperature.zip")],
//!     &CancellationToken::new(),
//! )?;
//! assert!(!report.has_failures());
//! # Ok::<(), areadata::error::UploadError>(())
//! ```

pub mod api;
pub mod config;
pub mod digest;
pub mod error;
pub mod logging;
pub mod replace;
pub mod retrieval;
pub mod upload;

pub use error::{UploadError, UploadResult};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
