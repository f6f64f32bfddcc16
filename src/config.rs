//! Configuration types for a pinning run.
//!
//! Everything a run needs is carried in one [`PinConfig`], constructed once
//! at startup and passed by reference into the uploader and the orchestrator.
//! Pure pipeline stages never read the process environment themselves; only
//! [`Credentials::from_env`] does, and only when the caller asks it to.

use crate::error::SvgPinError;
use crate::pipeline::digest::DigestMode;
use crate::pipeline::upload::ContentStore;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default IPFS ingestion endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://ipfs.infura.io:5001/api/v0/add";

/// Environment variable holding the storage-network project key.
pub const ENV_KEY: &str = "IPFS_KEY";

/// Environment variable holding the storage-network project secret.
pub const ENV_SECRET: &str = "IPFS_SECRET";

/// Configuration for a pinning run.
///
/// Built via [`PinConfig::builder()`] or using [`PinConfig::default()`].
///
/// # Example
/// ```rust
/// use svgpin::{PinConfig, Variant};
///
/// let config = PinConfig::builder()
///     .variant(Variant::Raw)
///     .upload_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.variant, Variant::Raw);
/// ```
#[derive(Clone)]
pub struct PinConfig {
    /// Which pipeline to run. Default: [`Variant::Canonical`].
    pub variant: Variant,

    /// Repeat the canonicalization preset until the output is stable. Default: true.
    pub multipass: bool,

    /// IPFS `add` endpoint URL. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Basic-auth credential pair. When `None` every upload fails with
    /// [`crate::error::UploadError::MissingCredentials`] (per file, not fatal).
    pub credentials: Option<Credentials>,

    /// Per-upload timeout in seconds. Default: 120.
    pub upload_timeout_secs: u64,

    /// Source folder name under the root. Default: `svgs`.
    pub source_dir: String,

    /// Folder under the root receiving canonical copies. Must already exist.
    /// Default: `optimized-svgs`.
    pub optimized_dir: String,

    /// Eligible file extension, matched exactly and case-sensitively. Default: `svg`.
    pub extension: String,

    /// Pre-constructed store. Takes precedence over `endpoint`/`credentials`.
    pub store: Option<Arc<dyn ContentStore>>,

    /// Optional per-file progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            multipass: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials: None,
            upload_timeout_secs: 120,
            source_dir: "svgs".to_string(),
            optimized_dir: "optimized-svgs".to_string(),
            extension: "svg".to_string(),
            store: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PinConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinConfig")
            .field("variant", &self.variant)
            .field("multipass", &self.multipass)
            .field("endpoint", &self.endpoint)
            .field("credentials", &self.credentials)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .field("source_dir", &self.source_dir)
            .field("optimized_dir", &self.optimized_dir)
            .field("extension", &self.extension)
            .field("store", &self.store.as_ref().map(|_| "<dyn ContentStore>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl PinConfig {
    /// Create a new builder for `PinConfig`.
    pub fn builder() -> PinConfigBuilder {
        PinConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PinConfig`].
#[derive(Debug)]
pub struct PinConfigBuilder {
    config: PinConfig,
}

impl PinConfigBuilder {
    pub fn variant(mut self, variant: Variant) -> Self {
        self.config.variant = variant;
        self
    }

    pub fn multipass(mut self, v: bool) -> Self {
        self.config.multipass = v;
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.upload_timeout_secs = secs;
        self
    }

    pub fn source_dir(mut self, name: impl Into<String>) -> Self {
        self.config.source_dir = name.into();
        self
    }

    pub fn optimized_dir(mut self, name: impl Into<String>) -> Self {
        self.config.optimized_dir = name.into();
        self
    }

    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.config.extension = ext.into();
        self
    }

    pub fn store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.config.store = Some(store);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PinConfig, SvgPinError> {
        let c = &self.config;
        if c.upload_timeout_secs == 0 {
            return Err(SvgPinError::InvalidConfig(
                "Upload timeout must be ≥ 1 second".into(),
            ));
        }
        let is_http = c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://");
        if c.store.is_none() && !is_http {
            return Err(SvgPinError::InvalidConfig(format!(
                "Endpoint must be an HTTP/HTTPS URL, got '{}'",
                c.endpoint
            )));
        }
        if c.extension.is_empty() || c.extension.starts_with('.') {
            return Err(SvgPinError::InvalidConfig(format!(
                "Extension must be non-empty and given without a dot, got '{}'",
                c.extension
            )));
        }
        for (what, dir) in [("source", &c.source_dir), ("optimized", &c.optimized_dir)] {
            if dir.is_empty() {
                return Err(SvgPinError::InvalidConfig(format!(
                    "The {what} folder name must not be empty"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Credentials ──────────────────────────────────────────────────────────

/// Basic-auth key/secret pair for the storage network.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    /// Read `IPFS_KEY` / `IPFS_SECRET` from the process environment.
    ///
    /// Returns `None` unless both are present and non-empty.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var(ENV_KEY).ok().filter(|k| !k.is_empty())?;
        let secret = std::env::var(ENV_SECRET).ok().filter(|s| !s.is_empty())?;
        Some(Self { key, secret })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The two pipelines.
///
/// They hash different bytes on purpose: `Raw` hashes the file exactly as
/// it sits on disk, `Canonical` hashes the body of the canonical form. Pick
/// one explicitly; digests from the two are not comparable.
///
/// | | Raw | Canonical |
/// |-|-----|-----------|
/// | canonicalize | no | yes |
/// | optimized copy | no | `optimized-svgs/<name>` |
/// | digest input | whole file | inside `<svg …>…</svg>` |
/// | digest prefix | none | `0x` |
/// | `pretty.txt` | no | yes |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Variant {
    /// Upload and hash the file bytes unchanged.
    Raw,
    /// Canonicalize first, hash the body, write the human-readable report. (default)
    #[default]
    Canonical,
}

impl Variant {
    pub fn canonicalizes(self) -> bool {
        matches!(self, Variant::Canonical)
    }

    pub fn digest_mode(self) -> DigestMode {
        match self {
            Variant::Raw => DigestMode::Full,
            Variant::Canonical => DigestMode::Body,
        }
    }

    /// Whether digests in `keccak-hashes.txt` carry the `0x` prefix.
    pub fn prefixes_digest(self) -> bool {
        matches!(self, Variant::Canonical)
    }

    pub fn writes_pretty(self) -> bool {
        matches!(self, Variant::Canonical)
    }
}
