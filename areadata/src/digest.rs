//! MD5 digest calculation for upload descriptors.
//!
//! Figshare validates every upload against the MD5 and size declared when the
//! file is registered, so both are computed up front by streaming the file
//! through an incremental hasher.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{UploadError, UploadResult};

/// Size of the chunks fed to the hasher (1 MiB).
pub const DIGEST_CHUNK_SIZE: usize = 1024 * 1024;

/// Local metadata describing a file about to be uploaded.
///
/// Computed once per file before the session is created and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDescriptor {
    /// Path of the local file.
    pub path: PathBuf,
    /// Lowercase hexadecimal MD5 of the file contents.
    pub digest_hex: String,
    /// File length in bytes.
    pub size_bytes: u64,
}

impl UploadDescriptor {
    /// Compute the descriptor for a file on disk.
    pub fn compute(path: &Path) -> UploadResult<Self> {
        let (digest_hex, size_bytes) = compute(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            digest_hex,
            size_bytes,
        })
    }

    /// Name registered with the service (the path's final component).
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// Calculate the MD5 digest and byte length of a file.
///
/// # Errors
///
/// Returns [`UploadError::Io`] if the file cannot be opened or read.
pub fn compute(path: &Path) -> UploadResult<(String, u64)> {
    let mut file = File::open(path).map_err(|e| UploadError::io(path, e))?;

    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; DIGEST_CHUNK_SIZE];
    let mut size = 0u64;

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| UploadError::io(path, e))?;

        if bytes_read == 0 {
            break;
        }

        context.consume(&buffer[..bytes_read]);
        size += bytes_read as u64;
    }

    Ok((format!("{:x}", context.compute()), size))
}
