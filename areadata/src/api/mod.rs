//! Figshare API access.
//!
//! - `transport`: the HTTP seam (`Transport` trait, reqwest implementation)
//! - `client`: authenticated request wrapper with JSON decoding
//! - `types`: wire types for files, articles and partition plans
//! - `endpoints`: endpoint paths relative to the API base URL

mod client;
pub mod endpoints;
mod transport;
mod types;

pub use client::{Credential, Decoded, SessionClient};
pub use transport::{
    Body, HttpRequest, HttpResponse, Method, ReqwestTransport, Transport, DEFAULT_TIMEOUT_SECS,
};
pub use types::{
    ArticleSummary, FileResource, FileStatus, Location, NewArticle, NewFile, WirePart, WirePlan,
};
