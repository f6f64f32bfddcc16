//! Pipeline stages for pinning one SVG file.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the orchestrator in [`crate::run`] stays a straight line.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ canonical ──▶ upload ──▶ cid ──▶ digest ──▶ ledger
//! (list)    (minify)      (IPFS)    (0x)    (keccak)   (append)
//! ```
//!
//! 1. [`input`]     — list `svgs/`, keep `*.svg` in listing order
//! 2. [`canonical`] — deterministic minification, `"` → `'` (canonical variant only)
//! 3. [`upload`]    — one multipart POST to the IPFS `add` endpoint; the only
//!    stage with network I/O
//! 4. [`cid`]       — base-58 CID → `0x` hex without the multihash prefix
//! 5. [`digest`]    — Keccak-256 over the full bytes or the `<svg>` body
//! 6. [`ledger`]    — buffered per-file entry appended to every ledger

pub mod canonical;
pub mod cid;
pub mod digest;
pub mod input;
pub mod ledger;
pub mod upload;
