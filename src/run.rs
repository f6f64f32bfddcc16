//! Eager (whole-folder) run entry points.
//!
//! [`run`] resets the ledgers, lists `<root>/svgs`, and pushes every
//! eligible file through [`Pinner::process_asset`] one at a time, in listing
//! order. A failing file is reported and skipped; only a missing source
//! folder, an unwritable ledger at reset, or a commit that could not be
//! rolled back ends the run early. Use
//! [`crate::stream::run_stream`] to receive per-file results as they land.

use crate::config::{PinConfig, Variant};
use crate::error::{AssetError, SvgPinError};
use crate::output::{AssetFailure, AssetRecord, RunReport, RunStats};
use crate::pipeline::canonical::{canonicalize, CanonicalizeOptions};
use crate::pipeline::cid::encode_cid;
use crate::pipeline::digest::{digest_with, render_digest};
use crate::pipeline::input::{list_sources, SourceAsset, SourceListing};
use crate::pipeline::ledger::{Ledger, LedgerEntry};
use crate::pipeline::upload::{resolve_store, ContentStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pin every eligible SVG under `<root>/svgs` and rebuild the ledgers.
///
/// # Returns
/// `Ok(RunReport)` once every eligible file has been attempted, even if
/// some failed (check `report.failures`).
///
/// # Errors
/// Returns `Err(SvgPinError)` only for fatal errors:
/// - a ledger cannot be created or truncated
/// - the source folder cannot be listed (ledgers are already empty by then)
/// - a failed ledger commit could not be rolled back
pub async fn run(root: impl AsRef<Path>, config: &PinConfig) -> Result<RunReport, SvgPinError> {
    let total_start = Instant::now();
    let root = root.as_ref();
    info!("Starting run: {} ({:?})", root.display(), config.variant);

    // ── Step 1: Resolve store ────────────────────────────────────────────
    let pinner = Pinner::new(root, config)?;

    // ── Step 2: Truncate ledgers ─────────────────────────────────────────
    pinner.ledger().reset().await?;

    // ── Step 3: Enumerate sources ────────────────────────────────────────
    let listing = pinner.list().await?;
    let total = listing.eligible.len();
    info!("{} eligible file(s) in {}", total, pinner.source_dir().display());

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }

    // ── Step 4: Process files sequentially ───────────────────────────────
    let mut records = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (i, file_name) in listing.eligible.iter().enumerate() {
        let index = i + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_asset_start(file_name, index, total);
        }

        match pinner.process_asset(file_name).await {
            Ok(record) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_asset_complete(file_name, index, total, &record.cid);
                }
                records.push(record);
            }
            Err(error) => {
                warn!("Error processing {}: {}", file_name, error);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_asset_error(file_name, index, total, &error.to_string());
                }
                let detail = error.to_string();
                failures.push(AssetFailure {
                    file_name: file_name.clone(),
                    error,
                });
                if pinner.ledger().is_poisoned() {
                    return Err(SvgPinError::LedgerMisaligned(detail));
                }
            }
        }
    }

    // ── Step 5: Stats ────────────────────────────────────────────────────
    let stats = RunStats {
        eligible: total,
        succeeded: records.len(),
        failed: failures.len(),
        skipped: listing.skipped,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Run complete: {}/{} pinned, {} failed, {} skipped, {}ms",
        stats.succeeded, stats.eligible, stats.failed, stats.skipped, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total, stats.succeeded);
    }

    Ok(RunReport {
        records,
        failures,
        stats,
    })
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(root: impl AsRef<Path>, config: &PinConfig) -> Result<RunReport, SvgPinError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SvgPinError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(root, config))
}

/// Per-run state shared by every file: resolved folders, store and ledgers.
pub struct Pinner {
    source_dir: PathBuf,
    optimized_dir: PathBuf,
    extension: String,
    variant: Variant,
    canonicalize: CanonicalizeOptions,
    store: Arc<dyn ContentStore>,
    ledger: Ledger,
}

impl Pinner {
    pub fn new(root: &Path, config: &PinConfig) -> Result<Self, SvgPinError> {
        Ok(Self {
            source_dir: root.join(&config.source_dir),
            optimized_dir: root.join(&config.optimized_dir),
            extension: config.extension.clone(),
            variant: config.variant,
            canonicalize: CanonicalizeOptions {
                multipass: config.multipass,
            },
            store: resolve_store(config)?,
            ledger: Ledger::new(root, config.variant),
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub async fn list(&self) -> Result<SourceListing, SvgPinError> {
        list_sources(&self.source_dir, &self.extension).await
    }

    async fn read(&self, file_name: &str) -> Result<SourceAsset, AssetError> {
        let path = self.source_dir.join(file_name);
        let bytes = tokio::fs::read(&path).await.map_err(|e| AssetError::Read {
            file: file_name.to_string(),
            detail: e.to_string(),
        })?;
        Ok(SourceAsset {
            file_name: file_name.to_string(),
            path,
            bytes,
        })
    }

    /// Run one file through every stage and commit its ledger entry.
    ///
    /// Order: read → canonicalize → write optimized copy → upload →
    /// encode CID → digest → commit. Nothing reaches any ledger unless every
    /// earlier stage succeeded.
    pub async fn process_asset(&self, file_name: &str) -> Result<AssetRecord, AssetError> {
        let start = Instant::now();
        let asset = self.read(file_name).await?;
        debug!("Read {} ({} bytes)", asset.path.display(), asset.bytes.len());

        let (payload, canonical_text) = if self.variant.canonicalizes() {
            let bytes = canonicalize(&asset.bytes, &self.canonicalize)
                .map_err(|e| AssetError::from_canonicalize(file_name, e))?;
            let out_path = self.optimized_dir.join(file_name);
            tokio::fs::write(&out_path, &bytes)
                .await
                .map_err(|e| AssetError::WriteCanonical {
                    file: file_name.to_string(),
                    detail: format!("{}: {}", out_path.display(), e),
                })?;
            debug!(
                "Canonicalized {}: {} → {} bytes",
                file_name,
                asset.bytes.len(),
                bytes.len()
            );
            let text = String::from_utf8_lossy(&bytes).into_owned();
            (bytes, Some(text))
        } else {
            (asset.bytes, None)
        };

        info!("Uploading {}...", file_name);
        let cid = self
            .store
            .put(file_name, payload.clone())
            .await
            .map_err(|e| AssetError::from_upload(file_name, e))?;
        info!("Hash for {}: {}", file_name, cid);

        let encoded_cid = encode_cid(&cid).map_err(|e| AssetError::from_cid(file_name, e))?;
        let digest = render_digest(
            &digest_with(self.variant.digest_mode(), &payload),
            self.variant.prefixes_digest(),
        );
        debug!("{}: encoded {} keccak {}", file_name, encoded_cid, digest);

        let entry = LedgerEntry::new(
            file_name,
            &cid,
            &encoded_cid,
            &digest,
            canonical_text.as_deref(),
        );
        self.ledger
            .commit(&entry)
            .await
            .map_err(|e| AssetError::from_commit(file_name, e))?;

        Ok(AssetRecord {
            file_name: file_name.to_string(),
            cid,
            encoded_cid,
            digest,
            uploaded_len: payload.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;
    use crate::pipeline::digest::digest;
    use crate::progress::BatchProgressCallback;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Hands out CIDs from a list and remembers what it was given.
    struct ScriptedStore {
        replies: Mutex<Vec<Result<String, ()>>>,
        seen: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl ScriptedStore {
        fn new(replies: Vec<Result<&str, ()>>) -> Arc<Self> {
            let mut replies: Vec<_> = replies.into_iter().map(|r| r.map(String::from)).collect();
            replies.reverse();
            Arc::new(Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ContentStore for ScriptedStore {
        async fn put(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, UploadError> {
            self.seen.lock().unwrap().push((file_name.to_string(), bytes));
            match self.replies.lock().unwrap().pop() {
                Some(Ok(cid)) => Ok(cid),
                _ => Err(UploadError::Status {
                    endpoint: "mock".into(),
                    status: 500,
                    body: "boom".into(),
                }),
            }
        }
    }

    fn fixture(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("svgs")).unwrap();
        std::fs::create_dir(dir.path().join("optimized-svgs")).unwrap();
        for (name, body) in files {
            std::fs::write(dir.path().join("svgs").join(name), body).unwrap();
        }
        dir
    }

    fn config(store: Arc<ScriptedStore>, variant: Variant) -> PinConfig {
        PinConfig::builder()
            .variant(variant)
            .store(store)
            .build()
            .unwrap()
    }

    fn ledger_lines(dir: &TempDir, name: &str) -> Vec<String> {
        std::fs::read_to_string(dir.path().join(name))
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn raw_variant_hashes_file_bytes_unprefixed() {
        let body = "<svg width=\"1\">\n  <rect/>\n</svg>\n";
        let dir = fixture(&[("a.svg", body)]);
        let store = ScriptedStore::new(vec![Ok("QmTzQ1")]);

        let report = run(dir.path(), &config(store.clone(), Variant::Raw)).await.unwrap();

        assert_eq!(report.stats.succeeded, 1);
        assert_eq!(store.seen.lock().unwrap()[0].1, body.as_bytes());
        assert_eq!(
            ledger_lines(&dir, "keccak-hashes.txt"),
            vec![hex::encode(digest(body.as_bytes()))]
        );
        assert!(!dir.path().join("pretty.txt").exists());
        assert!(!dir.path().join("optimized-svgs/a.svg").exists());
    }

    #[tokio::test]
    async fn canonical_variant_uploads_canonical_bytes() {
        let dir = fixture(&[("a.svg", "<svg width=\"1\">\n  <rect/>\n</svg>\n")]);
        let store = ScriptedStore::new(vec![Ok("QmTzQ1")]);

        let report = run(dir.path(), &config(store.clone(), Variant::Canonical))
            .await
            .unwrap();

        let canonical = b"<svg width='1'><rect/></svg>";
        assert_eq!(store.seen.lock().unwrap()[0].1, canonical);
        assert_eq!(
            std::fs::read(dir.path().join("optimized-svgs/a.svg")).unwrap(),
            canonical
        );
        assert_eq!(
            report.records[0].digest,
            format!("0x{}", hex::encode(digest(b"<rect/>")))
        );
        assert_eq!(report.records[0].encoded_cid, "0xcbea6a");
    }

    #[tokio::test]
    async fn undecodable_cid_leaves_every_ledger_untouched() {
        // "0" is outside the base-58 alphabet. The file must not appear in
        // hashes.txt even though the upload itself succeeded.
        let dir = fixture(&[("a.svg", "<svg/>")]);
        let store = ScriptedStore::new(vec![Ok("Qm0bad")]);

        let report = run(dir.path(), &config(store, Variant::Canonical)).await.unwrap();

        assert_eq!(report.stats.failed, 1);
        assert!(matches!(report.failures[0].error, AssetError::InvalidCid { .. }));
        for ledger in ["hashes.txt", "encoded-hashes.txt", "keccak-hashes.txt", "pretty.txt"] {
            assert!(ledger_lines(&dir, ledger).is_empty(), "{ledger}");
        }
    }

    #[tokio::test]
    async fn malformed_svg_is_skipped_before_upload() {
        let dir = fixture(&[("bad.svg", "<svg><g></svg>")]);
        let store = ScriptedStore::new(vec![Ok("QmTzQ1")]);

        let report = run(dir.path(), &config(store.clone(), Variant::Canonical))
            .await
            .unwrap();

        assert!(matches!(report.failures[0].error, AssetError::Malformed { .. }));
        assert!(store.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_optimized_folder_fails_per_file() {
        let dir = fixture(&[("a.svg", "<svg/>")]);
        std::fs::remove_dir(dir.path().join("optimized-svgs")).unwrap();
        let store = ScriptedStore::new(vec![Ok("QmTzQ1")]);

        let report = run(dir.path(), &config(store, Variant::Canonical)).await.unwrap();

        assert_eq!(report.stats.failed, 1);
        assert!(matches!(
            report.failures[0].error,
            AssetError::WriteCanonical { .. }
        ));
    }

    #[tokio::test]
    async fn missing_source_folder_is_fatal_after_reset() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("hashes.txt"), "old\n").unwrap();
        let store = ScriptedStore::new(vec![]);

        let err = run(dir.path(), &config(store, Variant::Raw)).await.unwrap_err();

        assert!(matches!(err, SvgPinError::EnumerationFailed { .. }));
        assert_eq!(std::fs::read_to_string(dir.path().join("hashes.txt")).unwrap(), "");
    }

    /// Succeeds, but on the second upload turns `encoded-hashes.txt` into a
    /// directory so that file's commit cannot open it.
    struct SabotagingStore {
        root: PathBuf,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl ContentStore for SabotagingStore {
        async fn put(&self, _: &str, _: Vec<u8>) -> Result<String, UploadError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls == 2 {
                let encoded = self.root.join("encoded-hashes.txt");
                std::fs::remove_file(&encoded).unwrap();
                std::fs::create_dir(&encoded).unwrap();
            }
            Ok("QmTzQ1".to_string())
        }
    }

    #[tokio::test]
    async fn failed_commit_keeps_ledgers_aligned() {
        let dir = fixture(&[("a.svg", "<svg/>"), ("b.svg", "<svg><rect/></svg>")]);
        let store = Arc::new(SabotagingStore {
            root: dir.path().to_path_buf(),
            calls: Mutex::new(0),
        });
        let config = PinConfig::builder()
            .variant(Variant::Raw)
            .store(store)
            .build()
            .unwrap();

        let report = run(dir.path(), &config).await.unwrap();

        assert_eq!(report.stats.succeeded, 1);
        assert_eq!(report.stats.failed, 1);
        assert!(matches!(report.failures[0].error, AssetError::LedgerWrite { .. }));
        assert_eq!(ledger_lines(&dir, "hashes.txt"), vec!["QmTzQ1"]);
        assert_eq!(
            ledger_lines(&dir, "keccak-hashes.txt"),
            vec![report.records[0].digest.clone()]
        );
    }

    /// Records every progress event as a string.
    #[derive(Default)]
    struct EventLog(Mutex<Vec<String>>);

    impl BatchProgressCallback for EventLog {
        fn on_run_start(&self, total: usize) {
            self.0.lock().unwrap().push(format!("run_start {total}"));
        }

        fn on_asset_start(&self, _: &str, index: usize, total: usize) {
            self.0.lock().unwrap().push(format!("start {index}/{total}"));
        }

        fn on_asset_complete(&self, _: &str, index: usize, total: usize, cid: &str) {
            self.0.lock().unwrap().push(format!("complete {index}/{total} {cid}"));
        }

        fn on_asset_error(&self, file_name: &str, index: usize, total: usize, _: &str) {
            self.0.lock().unwrap().push(format!("error {index}/{total} {file_name}"));
        }

        fn on_run_complete(&self, total: usize, success_count: usize) {
            self.0
                .lock()
                .unwrap()
                .push(format!("run_complete {success_count}/{total}"));
        }
    }

    #[tokio::test]
    async fn progress_events_follow_processing_order() {
        let dir = fixture(&[
            ("a.svg", "<svg/>"),
            ("b.svg", "<svg/>"),
            ("c.svg", "<svg/>"),
        ]);
        let store = ScriptedStore::new(vec![Ok("QmTzQ1"), Err(()), Ok("QmTzQ1")]);
        let events = Arc::new(EventLog::default());
        let config = PinConfig::builder()
            .store(store)
            .progress_callback(events.clone())
            .build()
            .unwrap();

        let report = run(dir.path(), &config).await.unwrap();

        let failed = &report.failures[0].file_name;
        assert_eq!(
            *events.0.lock().unwrap(),
            vec![
                "run_start 3".to_string(),
                "start 1/3".to_string(),
                "complete 1/3 QmTzQ1".to_string(),
                "start 2/3".to_string(),
                format!("error 2/3 {failed}"),
                "start 3/3".to_string(),
                "complete 3/3 QmTzQ1".to_string(),
                "run_complete 2/3".to_string(),
            ]
        );
    }

    #[test]
    fn run_sync_works_outside_a_runtime() {
        let dir = fixture(&[("a.svg", "<svg/>")]);
        let store = ScriptedStore::new(vec![Ok("QmTzQ1")]);
        let report = run_sync(dir.path(), &config(store, Variant::Raw)).unwrap();
        assert_eq!(report.records[0].cid, "QmTzQ1");
    }
}
