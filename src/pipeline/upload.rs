//! Storage upload: one IPFS `add` round-trip per file.
//!
//! The store sits behind [`ContentStore`] so the orchestrator can be driven
//! by the real HTTP client or by an in-memory stand-in. [`IpfsStore`] sends
//! the bytes as a single multipart `file` part with basic auth and reads the
//! `Hash` field from the JSON reply. There is no retry: a failure here is
//! reported for the file and the batch moves on.

use crate::config::{Credentials, PinConfig};
use crate::error::{SvgPinError, UploadError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// MIME type sent with every uploaded part.
pub const SVG_MIME: &str = "image/svg+xml";

/// Anything that can store bytes and hand back their base-58 CID.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes` under `file_name` and return the assigned CID.
    async fn put(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, UploadError>;
}

/// Reply body of `POST /api/v0/add`.
#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: Option<String>,
}

/// HTTP client for an IPFS `add` endpoint (Infura-style, basic auth).
#[derive(Debug, Clone)]
pub struct IpfsStore {
    client: reqwest::Client,
    endpoint: String,
    credentials: Option<Credentials>,
    timeout_secs: u64,
}

impl IpfsStore {
    pub fn new(
        endpoint: impl Into<String>,
        credentials: Option<Credentials>,
        timeout_secs: u64,
    ) -> Result<Self, SvgPinError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("svgpin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SvgPinError::Internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            credentials,
            timeout_secs,
        })
    }

    pub fn from_config(config: &PinConfig) -> Result<Self, SvgPinError> {
        Self::new(
            config.endpoint.clone(),
            config.credentials.clone(),
            config.upload_timeout_secs,
        )
    }

    fn network_error(&self, e: reqwest::Error) -> UploadError {
        if e.is_timeout() {
            UploadError::Timeout {
                endpoint: self.endpoint.clone(),
                secs: self.timeout_secs,
            }
        } else {
            UploadError::Network {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl ContentStore for IpfsStore {
    async fn put(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, UploadError> {
        let creds = self
            .credentials
            .as_ref()
            .ok_or(UploadError::MissingCredentials)?;

        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(SVG_MIME)
            .map_err(|e| self.network_error(e))?;
        let form = Form::new().part("file", part);

        debug!("POST {} ({} bytes, {})", self.endpoint, size, file_name);
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&creds.key, Some(&creds.secret))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.network_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.network_error(e))?;

        if !status.is_success() {
            return Err(UploadError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body: body.trim().chars().take(200).collect(),
            });
        }

        parse_add_response(&self.endpoint, &body)
    }
}

/// Extract `Hash` from an `add` reply.
///
/// The endpoint streams one JSON object per line; for a single file the
/// first object is the one that matters.
fn parse_add_response(endpoint: &str, body: &str) -> Result<String, UploadError> {
    let line = body
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| UploadError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: "empty body".into(),
        })?;

    let reply: AddResponse =
        serde_json::from_str(line).map_err(|e| UploadError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

    match reply.hash {
        Some(hash) if !hash.is_empty() => Ok(hash),
        _ => Err(UploadError::MissingHash {
            endpoint: endpoint.to_string(),
        }),
    }
}

/// Resolve the store for a run: a pre-built one wins, otherwise build an
/// [`IpfsStore`] from the endpoint and credentials in `config`.
pub fn resolve_store(config: &PinConfig) -> Result<Arc<dyn ContentStore>, SvgPinError> {
    if let Some(ref store) = config.store {
        return Ok(Arc::clone(store));
    }
    Ok(Arc::new(IpfsStore::from_config(config)?))
}
