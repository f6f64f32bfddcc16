//! Keccak-256 digests over SVG bytes.
//!
//! The digest is what gets compared on-chain, so it uses the original
//! Keccak padding (`keccak256` in Solidity), not NIST SHA3-256.

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

/// Digest length in bytes.
pub const DIGEST_LEN: usize = 32;

/// Which bytes are fed to the hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DigestMode {
    /// The whole input.
    Full,
    /// The input with its outer `<svg …>` / `</svg>` wrapper removed.
    Body,
}

/// Opening tag anchored at the very start, closing tag at the very end.
/// The attribute run is non-greedy so the first `>` ends the opening tag.
static RE_SVG_WRAPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s-u)\A<svg(?:\s[^>]*?)?>(.*)</svg>\z").unwrap());

/// Keccak-256 of `bytes`.
pub fn digest(bytes: &[u8]) -> [u8; DIGEST_LEN] {
    Keccak256::digest(bytes).into()
}

/// Keccak-256 of the body inside the outer `<svg>` wrapper.
///
/// Input without such a wrapper is hashed unchanged.
pub fn digest_body(bytes: &[u8]) -> [u8; DIGEST_LEN] {
    digest(strip_svg_wrapper(bytes))
}

/// Dispatch on [`DigestMode`].
pub fn digest_with(mode: DigestMode, bytes: &[u8]) -> [u8; DIGEST_LEN] {
    match mode {
        DigestMode::Full => digest(bytes),
        DigestMode::Body => digest_body(bytes),
    }
}

/// Lowercase hex, optionally `0x`-prefixed.
pub fn render_digest(d: &[u8; DIGEST_LEN], prefixed: bool) -> String {
    if prefixed {
        format!("0x{}", hex::encode(d))
    } else {
        hex::encode(d)
    }
}

fn strip_svg_wrapper(bytes: &[u8]) -> &[u8] {
    match RE_SVG_WRAPPER.captures(bytes).and_then(|c| c.get(1)) {
        Some(body) => &bytes[body.range()],
        None => bytes,
    }
}
