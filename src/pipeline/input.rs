//! Input enumeration: list the source folder and keep eligible SVG files.
//!
//! Listing order is whatever the filesystem returns; nothing here sorts.
//! Eligibility is an exact, case-sensitive extension match (`a.svg` yes,
//! `a.SVG` no), and directories are never eligible.

use crate::error::SvgPinError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Files found in the source folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceListing {
    /// Eligible file names, in listing order.
    pub eligible: Vec<String>,
    /// Entries skipped for having the wrong extension, being a directory, or
    /// having a non-UTF-8 name.
    pub skipped: usize,
}

/// Whether `file_name` ends in `.{extension}` exactly.
pub fn is_eligible(file_name: &str, extension: &str) -> bool {
    Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext == extension)
}

/// A source asset read from disk.
#[derive(Debug, Clone)]
pub struct SourceAsset {
    pub file_name: String,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// List `dir`, keeping eligible files in listing order.
///
/// # Errors
/// [`SvgPinError::EnumerationFailed`] when `dir` cannot be listed.
pub async fn list_sources(dir: &Path, extension: &str) -> Result<SourceListing, SvgPinError> {
    let enumeration_failed = |source| SvgPinError::EnumerationFailed {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(enumeration_failed)?;
    let mut listing = SourceListing::default();

    while let Some(entry) = entries.next_entry().await.map_err(enumeration_failed)? {
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!("Skipping non-UTF-8 file name {:?}", raw);
                listing.skipped += 1;
                continue;
            }
        };
        if !is_eligible(&name, extension) {
            debug!("Skipping {}", name);
            listing.skipped += 1;
            continue;
        }
        if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            debug!("Skipping directory {}", name);
            listing.skipped += 1;
            continue;
        }
        listing.eligible.push(name);
    }

    debug!(
        "{}: {} eligible, {} skipped",
        dir.display(),
        listing.eligible.len(),
        listing.skipped
    );
    Ok(listing)
}
