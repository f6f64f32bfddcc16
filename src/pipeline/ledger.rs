//! Plain-text ledgers: line-aligned CIDs, encoded CIDs and digests.
//!
//! Line *n* of `hashes.txt`, `encoded-hashes.txt` and `keccak-hashes.txt`
//! always describe the same file. To keep it that way every line for a file
//! is rendered into a [`LedgerEntry`] first and only then committed:
//!
//! 1. every target ledger is opened and its length recorded
//! 2. the lines are appended, ledger by ledger, each flushed before the next
//! 3. if any open or append fails, every ledger that grew is truncated back
//!
//! A file that fails anywhere in its pipeline therefore leaves no trace in
//! any ledger. If step 3 itself fails the [`Ledger`] is poisoned and refuses
//! every later commit.

use crate::config::Variant;
use crate::error::{LedgerCommitError, SvgPinError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

/// One output log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerKind {
    /// `hashes.txt` — base-58 CIDs.
    Hashes,
    /// `encoded-hashes.txt` — `0x` hex CIDs without the multihash prefix.
    EncodedHashes,
    /// `keccak-hashes.txt` — Keccak-256 digests.
    KeccakHashes,
    /// `pretty.txt` — one human-readable block per file.
    Pretty,
}

impl LedgerKind {
    pub fn file_name(self) -> &'static str {
        match self {
            LedgerKind::Hashes => "hashes.txt",
            LedgerKind::EncodedHashes => "encoded-hashes.txt",
            LedgerKind::KeccakHashes => "keccak-hashes.txt",
            LedgerKind::Pretty => "pretty.txt",
        }
    }

    /// Ledgers written by `variant`, in commit order.
    pub fn for_variant(variant: Variant) -> Vec<LedgerKind> {
        let mut kinds = vec![
            LedgerKind::Hashes,
            LedgerKind::EncodedHashes,
            LedgerKind::KeccakHashes,
        ];
        if variant.writes_pretty() {
            kinds.push(LedgerKind::Pretty);
        }
        kinds
    }
}

/// The buffered lines for one file, ready to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    lines: Vec<(LedgerKind, String)>,
}

impl LedgerEntry {
    /// Render every line for one file.
    ///
    /// `canonical` is the canonical SVG text; when present, a `pretty.txt`
    /// block is included.
    pub fn new(
        file_name: &str,
        cid: &str,
        encoded_cid: &str,
        digest: &str,
        canonical: Option<&str>,
    ) -> Self {
        let mut lines = vec![
            (LedgerKind::Hashes, cid.to_string()),
            (LedgerKind::EncodedHashes, encoded_cid.to_string()),
            (LedgerKind::KeccakHashes, digest.to_string()),
        ];
        if let Some(svg) = canonical {
            lines.push((
                LedgerKind::Pretty,
                pretty_block(file_name, cid, encoded_cid, digest, svg),
            ));
        }
        Self { lines }
    }

    pub fn lines(&self) -> &[(LedgerKind, String)] {
        &self.lines
    }
}

/// Six-line report block; the sixth line is the blank separator added by
/// [`append_line`].
fn pretty_block(file_name: &str, cid: &str, encoded_cid: &str, digest: &str, svg: &str) -> String {
    format!(
        "File: {file_name}\n\
         IPFS URI: ipfs://{cid}\n\
         Encoded URI: {encoded_cid}\n\
         Keccak: {digest}\n\
         SVG: {svg}\n"
    )
}

async fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path).await
}

async fn write_line(file: &mut File, text: &str) -> std::io::Result<()> {
    let mut buf = String::with_capacity(text.len() + 1);
    buf.push_str(text);
    buf.push('\n');
    file.write_all(buf.as_bytes()).await?;
    file.flush().await
}

/// Append `text` and a newline to `path`, flushing before returning.
pub async fn append_line(path: &Path, text: &str) -> std::io::Result<()> {
    let mut file = open_append(path).await?;
    write_line(&mut file, text).await
}

/// One ledger opened for a commit, with its length beforehand.
struct Target<'e> {
    path: PathBuf,
    file: File,
    len_before: u64,
    text: &'e str,
}

/// The set of ledgers under a root folder.
#[derive(Debug)]
pub struct Ledger {
    root: PathBuf,
    kinds: Vec<LedgerKind>,
    poisoned: AtomicBool,
}

impl Ledger {
    pub fn new(root: impl Into<PathBuf>, variant: Variant) -> Self {
        Self {
            root: root.into(),
            kinds: LedgerKind::for_variant(variant),
            poisoned: AtomicBool::new(false),
        }
    }

    pub fn path(&self, kind: LedgerKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    pub fn kinds(&self) -> &[LedgerKind] {
        &self.kinds
    }

    /// Create or truncate every ledger for this variant.
    pub async fn reset(&self) -> Result<(), SvgPinError> {
        for &kind in &self.kinds {
            let path = self.path(kind);
            tokio::fs::write(&path, b"")
                .await
                .map_err(|source| SvgPinError::LedgerResetFailed {
                    path: path.clone(),
                    source,
                })?;
            debug!("Reset {}", path.display());
        }
        Ok(())
    }

    /// Whether a failed rollback left the ledgers misaligned.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }

    /// Append every line of `entry` to its ledger, in commit order, or
    /// nothing at all.
    ///
    /// Lines for ledgers this `Ledger` does not manage are ignored.
    pub async fn commit(&self, entry: &LedgerEntry) -> Result<(), LedgerCommitError> {
        if self.is_poisoned() {
            return Err(LedgerCommitError::Poisoned);
        }

        let mut targets = Vec::with_capacity(entry.lines().len());
        for (kind, text) in entry.lines() {
            if !self.kinds.contains(kind) {
                continue;
            }
            let path = self.path(*kind);
            let opened = match open_append(&path).await {
                Ok(file) => file.metadata().await.map(|m| (file, m.len())),
                Err(e) => Err(e),
            };
            match opened {
                Ok((file, len_before)) => targets.push(Target {
                    path,
                    file,
                    len_before,
                    text: text.as_str(),
                }),
                // Nothing has been written yet.
                Err(source) => return Err(LedgerCommitError::Append { path, source }),
            }
        }

        let mut failure = None;
        for target in targets.iter_mut() {
            if let Err(source) = write_line(&mut target.file, target.text).await {
                failure = Some(LedgerCommitError::Append {
                    path: target.path.clone(),
                    source,
                });
                break;
            }
        }
        let Some(failure) = failure else {
            return Ok(());
        };

        warn!("{}; rolling back this entry", failure);
        for target in targets.iter_mut() {
            if let Err(source) = rollback(target).await {
                self.poisoned.store(true, Ordering::SeqCst);
                error!("Rollback of {} failed: {}", target.path.display(), source);
                return Err(LedgerCommitError::Rollback {
                    path: target.path.clone(),
                    source,
                });
            }
        }
        Err(failure)
    }
}

/// Truncate `target` back to its pre-commit length if it grew.
async fn rollback(target: &mut Target<'_>) -> std::io::Result<()> {
    let len_now = target.file.metadata().await?.len();
    if len_now != target.len_before {
        target.file.set_len(target.len_before).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read(path: PathBuf) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[tokio::test]
    async fn reset_truncates_existing_ledgers() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("hashes.txt"), "stale\n").unwrap();
        let ledger = Ledger::new(dir.path(), Variant::Canonical);
        ledger.reset().await.unwrap();
        for &kind in ledger.kinds() {
            assert_eq!(read(ledger.path(kind)), "", "{kind:?}");
        }
        assert_eq!(ledger.kinds().len(), 4);
    }

    #[tokio::test]
    async fn raw_variant_has_no_pretty_ledger() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::new(dir.path(), Variant::Raw);
        ledger.reset().await.unwrap();
        assert!(!dir.path().join("pretty.txt").exists());

        let entry = LedgerEntry::new("a.svg", "Qm1", "0x01", "ab", Some("<svg/>"));
        ledger.commit(&entry).await.unwrap();
        assert!(!dir.path().join("pretty.txt").exists());
        assert_eq!(read(ledger.path(LedgerKind::KeccakHashes)), "ab\n");
    }

    #[tokio::test]
    async fn commits_stay_line_aligned() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::new(dir.path(), Variant::Canonical);
        ledger.reset().await.unwrap();

        for (i, name) in ["a.svg", "b.svg", "c.svg"].iter().enumerate() {
            let entry = LedgerEntry::new(
                name,
                &format!("Qm{i}"),
                &format!("0x0{i}"),
                &format!("0xd{i}"),
                Some("<svg/>"),
            );
            ledger.commit(&entry).await.unwrap();
        }

        assert_eq!(read(ledger.path(LedgerKind::Hashes)), "Qm0\nQm1\nQm2\n");
        assert_eq!(read(ledger.path(LedgerKind::EncodedHashes)), "0x00\n0x01\n0x02\n");
        assert_eq!(read(ledger.path(LedgerKind::KeccakHashes)), "0xd0\n0xd1\n0xd2\n");
        assert_eq!(read(ledger.path(LedgerKind::Pretty)).lines().count(), 18);
    }

    #[test]
    fn pretty_block_layout() {
        let entry = LedgerEntry::new("a.svg", "QmX", "0xaa", "0xbb", Some("<svg/>"));
        let (kind, block) = entry.lines().last().unwrap();
        assert_eq!(*kind, LedgerKind::Pretty);
        assert_eq!(
            block,
            "File: a.svg\nIPFS URI: ipfs://QmX\nEncoded URI: 0xaa\nKeccak: 0xbb\nSVG: <svg/>\n"
        );
    }

    #[tokio::test]
    async fn unopenable_ledger_leaves_the_others_untouched() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::new(dir.path(), Variant::Raw);
        ledger.reset().await.unwrap();
        ledger
            .commit(&LedgerEntry::new("a.svg", "Qm1", "0x01", "d1", None))
            .await
            .unwrap();

        let encoded = ledger.path(LedgerKind::EncodedHashes);
        std::fs::remove_file(&encoded).unwrap();
        std::fs::create_dir(&encoded).unwrap();

        let err = ledger
            .commit(&LedgerEntry::new("b.svg", "Qm2", "0x02", "d2", None))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerCommitError::Append { ref path, .. } if *path == encoded));
        assert_eq!(read(ledger.path(LedgerKind::Hashes)), "Qm1\n");
        assert_eq!(read(ledger.path(LedgerKind::KeccakHashes)), "d1\n");
        assert!(!ledger.is_poisoned());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_append_rolls_back_earlier_ledgers() {
        // Writes to /dev/full open fine and then fail with ENOSPC.
        if !Path::new("/dev/full").exists() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::new(dir.path(), Variant::Canonical);
        ledger.reset().await.unwrap();
        ledger
            .commit(&LedgerEntry::new("a.svg", "Qm1", "0x01", "0xd1", Some("<svg/>")))
            .await
            .unwrap();

        let keccak = ledger.path(LedgerKind::KeccakHashes);
        std::fs::remove_file(&keccak).unwrap();
        std::os::unix::fs::symlink("/dev/full", &keccak).unwrap();

        let err = ledger
            .commit(&LedgerEntry::new("b.svg", "Qm2", "0x02", "0xd2", Some("<svg/>")))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerCommitError::Append { .. }), "got: {err}");
        assert_eq!(read(ledger.path(LedgerKind::Hashes)), "Qm1\n");
        assert_eq!(read(ledger.path(LedgerKind::EncodedHashes)), "0x01\n");
        assert_eq!(read(ledger.path(LedgerKind::Pretty)).lines().count(), 6);
        assert!(!ledger.is_poisoned());
    }

    #[test]
    fn append_line_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.txt");
        tokio_test::block_on(append_line(&path, "one")).unwrap();
        tokio_test::block_on(append_line(&path, "two")).unwrap();
        assert_eq!(read(path), "one\ntwo\n");
    }
}
