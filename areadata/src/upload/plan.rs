//! Server-issued partition plans.
//!
//! The upload service splits each file into numbered, inclusive byte ranges.
//! A plan is accepted only if its ranges are contiguous, non-overlapping,
//! start at zero and end exactly at the last byte of the file. Anything else
//! means client and server disagree about the file and is never retried.

use std::collections::HashSet;

use crate::api::{endpoints, WirePlan};
use crate::error::{UploadError, UploadResult};

/// One numbered byte range of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartSpec {
    pub part_number: u32,
    pub start_offset: u64,
    /// Inclusive.
    pub end_offset: u64,
}

impl PartSpec {
    /// Number of bytes covered by this part.
    pub fn len(&self) -> u64 {
        (self.end_offset - self.start_offset).saturating_add(1)
    }

    /// True only for an inverted range.
    pub fn is_empty(&self) -> bool {
        self.end_offset < self.start_offset
    }
}

/// Validated division of a file into addressable parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    upload_url: String,
    size_bytes: u64,
    parts: Vec<PartSpec>,
}

impl PartitionPlan {
    /// Build a plan, rejecting any range layout that does not tile
    /// `[0, size_bytes)` exactly.
    pub fn new(
        upload_url: impl Into<String>,
        size_bytes: u64,
        mut parts: Vec<PartSpec>,
    ) -> UploadResult<Self> {
        validate(&parts, size_bytes)?;
        parts.sort_by_key(|p| p.start_offset);
        Ok(Self {
            upload_url: upload_url.into(),
            size_bytes,
            parts,
        })
    }

    /// Convert the upload service's description, falling back to the file's
    /// upload URL when the plan does not carry one.
    pub fn from_wire(wire: WirePlan, file_upload_url: &str, size_bytes: u64) -> UploadResult<Self> {
        if let Some(reported) = wire.size {
            if reported != size_bytes {
                return Err(UploadError::Protocol(format!(
                    "plan is for {} bytes but the file has {}",
                    reported, size_bytes
                )));
            }
        }

        let upload_url = wire
            .upload_url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| file_upload_url.to_string());

        let parts = wire
            .parts
            .into_iter()
            .map(|p| PartSpec {
                part_number: p.part_no,
                start_offset: p.start_offset,
                end_offset: p.end_offset,
            })
            .collect();

        Self::new(upload_url, size_bytes, parts)
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Parts in offset order.
    pub fn parts(&self) -> &[PartSpec] {
        &self.parts
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Endpoint receiving the bytes of `part`.
    pub fn part_url(&self, part: &PartSpec) -> String {
        endpoints::upload_part(&self.upload_url, part.part_number)
    }
}

/// Check that `parts` tile `[0, size_bytes)` with unique part numbers.
///
/// Parts may arrive in any order; they are checked sorted by start offset.
pub fn validate(parts: &[PartSpec], size_bytes: u64) -> UploadResult<()> {
    if size_bytes == 0 {
        return Err(UploadError::Protocol(
            "plan describes an empty file".to_string(),
        ));
    }
    if parts.is_empty() {
        return Err(UploadError::Protocol("plan has no parts".to_string()));
    }

    let mut numbers = HashSet::with_capacity(parts.len());
    for part in parts {
        if part.end_offset < part.start_offset {
            return Err(UploadError::Protocol(format!(
                "part {} ends ({}) before it starts ({})",
                part.part_number, part.end_offset, part.start_offset
            )));
        }
        if !numbers.insert(part.part_number) {
            return Err(UploadError::Protocol(format!(
                "part number {} appears more than once",
                part.part_number
            )));
        }
    }

    let mut sorted: Vec<&PartSpec> = parts.iter().collect();
    sorted.sort_by_key(|p| (p.start_offset, p.end_offset));

    let mut expected_start = 0u64;
    for part in sorted {
        if part.start_offset > expected_start {
            return Err(UploadError::Protocol(format!(
                "gap before part {}: bytes {}..{} are not covered",
                part.part_number, expected_start, part.start_offset
            )));
        }
        if part.start_offset < expected_start {
            return Err(UploadError::Protocol(format!(
                "part {} overlaps the previous part at offset {}",
                part.part_number, part.start_offset
            )));
        }
        expected_start = part.end_offset.checked_add(1).ok_or_else(|| {
            UploadError::Protocol(format!(
                "part {} ends at the largest representable offset",
                part.part_number
            ))
        })?;
    }

    if expected_start != size_bytes {
        return Err(UploadError::Protocol(format!(
            "plan covers {} bytes but the file has {}",
            expected_start, size_bytes
        )));
    }

    Ok(())
}
