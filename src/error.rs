//! Error types for the svgpin library.
//!
//! Two tiers reflect two distinct failure modes:
//!
//! * [`SvgPinError`] — **Fatal**: the run cannot proceed at all (the `svgs`
//!   folder cannot be listed, a ledger cannot be truncated, a failed commit
//!   could not be rolled back). Returned as `Err(SvgPinError)` from
//!   [`crate::run::run`].
//!
//! * [`AssetError`] — **Non-fatal**: one file failed (malformed SVG, upload
//!   rejected, bad CID) but the batch carries on. Stored inside
//!   [`crate::output::AssetFailure`] so callers can inspect partial success.
//!
//! Stage-level errors ([`CidError`], [`CanonicalizeError`], [`UploadError`])
//! convert into [`AssetError`] via `From`, so the per-file pipeline can use `?`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the svgpin library.
#[derive(Debug, Error)]
pub enum SvgPinError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The source folder could not be listed.
    #[error("Failed to list source folder '{path}': {source}")]
    EnumerationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Ledger errors ─────────────────────────────────────────────────────
    /// A ledger file could not be created or truncated at run start.
    #[error("Failed to reset ledger '{path}': {source}")]
    LedgerResetFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A commit failed and its partial lines could not be removed, so the
    /// ledgers no longer line up.
    #[error("Ledgers are misaligned: {0}")]
    LedgerMisaligned(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single SVG file.
///
/// No ledger receives any line for a file that ends in one of these.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum AssetError {
    /// The source file could not be read.
    #[error("{file}: read failed: {detail}")]
    Read { file: String, detail: String },

    /// The bytes are not well-formed SVG/XML.
    #[error("{file}: malformed SVG: {detail}")]
    Malformed { file: String, detail: String },

    /// The canonical copy could not be written to the optimized folder.
    #[error("{file}: writing optimized copy failed: {detail}")]
    WriteCanonical { file: String, detail: String },

    /// The storage network rejected or never answered the upload.
    #[error("{file}: upload failed: {detail}")]
    Upload { file: String, detail: String },

    /// The storage network answered with a CID that cannot be re-encoded.
    #[error("{file}: invalid CID: {detail}")]
    InvalidCid { file: String, detail: String },

    /// Appending to a ledger failed; every ledger was rolled back.
    #[error("{file}: ledger write failed: {detail}")]
    LedgerWrite { file: String, detail: String },
}

impl AssetError {
    /// Name of the file this error belongs to.
    pub fn file(&self) -> &str {
        match self {
            AssetError::Read { file, .. }
            | AssetError::Malformed { file, .. }
            | AssetError::WriteCanonical { file, .. }
            | AssetError::Upload { file, .. }
            | AssetError::InvalidCid { file, .. }
            | AssetError::LedgerWrite { file, .. } => file,
        }
    }
}

/// A per-file ledger commit failed.
#[derive(Debug, Error)]
pub enum LedgerCommitError {
    /// Opening or appending to a ledger failed. Every ledger was restored
    /// to its length before the commit.
    #[error("append to '{path}' failed: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Restoring a ledger after a failed append also failed.
    #[error("could not roll back '{path}': {source}")]
    Rollback {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An earlier rollback failed; no further lines are accepted.
    #[error("ledgers are misaligned after an earlier failed rollback")]
    Poisoned,
}

/// Failure decoding or re-encoding a base-58 content identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CidError {
    /// A character outside the base-58 alphabet.
    #[error("'{cid}' is not valid base-58: {reason}")]
    InvalidBase58 { cid: String, reason: String },

    /// Fewer than the 2 prefix bytes after decoding.
    #[error("'{cid}' decodes to {len} byte(s); at least 2 are required")]
    Truncated { cid: String, len: usize },
}

/// The input could not be parsed as well-formed XML.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalizeError {
    #[error("not valid UTF-8: {0}")]
    Utf8(String),

    #[error("{0}")]
    Malformed(String),
}

/// A single upload attempt failed.
#[derive(Debug, Error)]
pub enum UploadError {
    /// `IPFS_KEY` / `IPFS_SECRET` were not configured.
    #[error("storage credentials are not configured (set IPFS_KEY and IPFS_SECRET)")]
    MissingCredentials,

    #[error("request to {endpoint} failed: {reason}")]
    Network { endpoint: String, reason: String },

    #[error("request to {endpoint} timed out after {secs}s")]
    Timeout { endpoint: String, secs: u64 },

    /// Non-2xx reply.
    #[error("HTTP {status} from {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Reply parsed but carried no `Hash` field.
    #[error("no Hash found in response from {endpoint}")]
    MissingHash { endpoint: String },

    #[error("unreadable response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl AssetError {
    pub(crate) fn from_cid(file: &str, e: CidError) -> Self {
        AssetError::InvalidCid {
            file: file.to_string(),
            detail: e.to_string(),
        }
    }

    pub(crate) fn from_canonicalize(file: &str, e: CanonicalizeError) -> Self {
        AssetError::Malformed {
            file: file.to_string(),
            detail: e.to_string(),
        }
    }

    pub(crate) fn from_upload(file: &str, e: UploadError) -> Self {
        AssetError::Upload {
            file: file.to_string(),
            detail: e.to_string(),
        }
    }

    pub(crate) fn from_commit(file: &str, e: LedgerCommitError) -> Self {
        AssetError::LedgerWrite {
            file: file.to_string(),
            detail: e.to_string(),
        }
    }
}
