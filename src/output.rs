//! Result types returned by a pinning run.

use crate::error::AssetError;
use serde::{Deserialize, Serialize};

/// Everything derived for one successfully pinned file.
///
/// Each field matches the line committed to the corresponding ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub file_name: String,
    /// Base-58 CID (`hashes.txt`).
    pub cid: String,
    /// `0x` hex CID without the multihash prefix (`encoded-hashes.txt`).
    pub encoded_cid: String,
    /// Rendered Keccak-256 digest (`keccak-hashes.txt`).
    pub digest: String,
    /// Size of the bytes that were uploaded and hashed.
    pub uploaded_len: usize,
    pub duration_ms: u64,
}

/// A file that was skipped because one of its stages failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetFailure {
    pub file_name: String,
    pub error: AssetError,
}

/// Counters for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Files with the expected extension.
    pub eligible: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Directory entries that were not eligible.
    pub skipped: usize,
    pub total_duration_ms: u64,
}

/// The outcome of [`crate::run::run`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Successful files, in processing order (= ledger line order).
    pub records: Vec<AssetRecord>,
    pub failures: Vec<AssetFailure>,
    pub stats: RunStats,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
