//! # svgpin
//!
//! Pin a folder of SVG files to IPFS and record, per file, the CID, the CID
//! re-encoded as `bytes32`-style hex, and a Keccak-256 digest, in plain-text
//! ledgers that stay line-aligned.
//!
//! ## Pipeline Overview
//!
//! ```text
//! <root>/svgs/*.svg
//!  │
//!  ├─ 1. Input      list the folder, keep *.svg in listing order
//!  ├─ 2. Canonical  minify deterministically, " → '   (canonical variant)
//!  ├─ 3. Upload     multipart POST to the IPFS add endpoint
//!  ├─ 4. CID        base-58 → 0x hex, multihash prefix dropped
//!  ├─ 5. Digest     keccak256 over the file or the <svg> body
//!  └─ 6. Ledger     hashes.txt · encoded-hashes.txt · keccak-hashes.txt · pretty.txt
//! ```
//!
//! Files are processed one at a time. A file that fails any stage is
//! reported and left out of every ledger; the run carries on.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use svgpin::{run, Credentials, PinConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut builder = PinConfig::builder();
//!     if let Some(creds) = Credentials::from_env() {
//!         builder = builder.credentials(creds);
//!     }
//!     let report = run("./collection", &builder.build()?).await?;
//!     eprintln!("{}/{} pinned", report.stats.succeeded, report.stats.eligible);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `svgpin` binary (clap + anyhow + tracing-subscriber + dotenvy) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod run;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Credentials, PinConfig, PinConfigBuilder, Variant};
pub use error::{
    AssetError, CanonicalizeError, CidError, LedgerCommitError, SvgPinError, UploadError,
};
pub use output::{AssetFailure, AssetRecord, RunReport, RunStats};
pub use pipeline::canonical::{canonicalize, CanonicalizeOptions};
pub use pipeline::cid::{decode_cid, encode_cid};
pub use pipeline::digest::{digest, digest_body, render_digest, DigestMode};
pub use pipeline::upload::{ContentStore, IpfsStore};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use run::{run, run_sync};
pub use stream::{run_stream, AssetStream};
