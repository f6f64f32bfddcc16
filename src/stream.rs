//! Streaming run API: emit each file's outcome as soon as it is committed.
//!
//! Unlike [`crate::run::run`], which returns only after the whole folder is
//! done, [`run_stream`] yields one item per eligible file. Files are still
//! processed strictly one after another, in listing order, so items arrive
//! in the same order as the ledger lines. If a failed commit cannot be
//! rolled back, every later item fails with
//! [`crate::error::AssetError::LedgerWrite`] instead of ending the stream.

use crate::config::PinConfig;
use crate::error::SvgPinError;
use crate::output::{AssetFailure, AssetRecord};
use crate::run::Pinner;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::{info, warn};

/// A boxed stream of per-file outcomes.
pub type AssetStream = Pin<Box<dyn Stream<Item = Result<AssetRecord, AssetFailure>> + Send>>;

/// Reset the ledgers, list the source folder, and return a stream that pins
/// one file per poll.
///
/// # Returns
/// - `Ok(AssetStream)` — a stream of `Result<AssetRecord, AssetFailure>`
/// - `Err(SvgPinError)` — the ledgers could not be reset or the folder listed
///
/// # Example
/// ```rust,no_run
/// use svgpin::{run_stream, PinConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PinConfig::default();
/// let mut stream = run_stream("./collection", &config).await?;
/// while let Some(item) = stream.next().await {
///     match item {
///         Ok(r) => println!("{} → {}", r.file_name, r.cid),
///         Err(f) => eprintln!("{}", f.error),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn run_stream(
    root: impl AsRef<Path>,
    config: &PinConfig,
) -> Result<AssetStream, SvgPinError> {
    let root = root.as_ref();
    info!("Starting streaming run: {}", root.display());

    let pinner = Arc::new(Pinner::new(root, config)?);
    pinner.ledger().reset().await?;
    let listing = pinner.list().await?;
    info!("{} eligible file(s)", listing.eligible.len());

    let s = stream::iter(listing.eligible).then(move |file_name| {
        let pinner = Arc::clone(&pinner);
        async move {
            let result = pinner.process_asset(&file_name).await;
            result.map_err(|error| {
                warn!("Error processing {}: {}", file_name, error);
                AssetFailure { file_name, error }
            })
        }
    });

    Ok(Box::pin(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;
    use crate::pipeline::upload::ContentStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Fails every second upload.
    struct Alternating(AtomicUsize);

    #[async_trait]
    impl ContentStore for Alternating {
        async fn put(&self, _: &str, _: Vec<u8>) -> Result<String, UploadError> {
            if self.0.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                Ok("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG".into())
            } else {
                Err(UploadError::MissingHash {
                    endpoint: "mock".into(),
                })
            }
        }
    }

    #[tokio::test]
    async fn yields_one_item_per_eligible_file_in_ledger_order() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("svgs")).unwrap();
        std::fs::create_dir(dir.path().join("optimized-svgs")).unwrap();
        for name in ["a.svg", "b.svg", "c.svg", "skip.txt"] {
            std::fs::write(dir.path().join("svgs").join(name), "<svg><rect/></svg>").unwrap();
        }
        let config = PinConfig::builder()
            .store(Arc::new(Alternating(AtomicUsize::new(0))))
            .build()
            .unwrap();

        let items: Vec<_> = run_stream(dir.path(), &config).await.unwrap().collect().await;

        assert_eq!(items.len(), 3);
        assert_eq!(items.iter().filter(|i| i.is_ok()).count(), 2);
        let pinned: Vec<_> = items
            .iter()
            .filter_map(|i| i.as_ref().ok())
            .map(|r| r.cid.clone())
            .collect();
        let hashes = std::fs::read_to_string(dir.path().join("hashes.txt")).unwrap();
        assert_eq!(hashes.lines().collect::<Vec<_>>(), pinned);
    }
}
