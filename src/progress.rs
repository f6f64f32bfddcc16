//! Progress-callback trait for per-file pinning events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::PinConfigBuilder::progress_callback`] to receive events
//! as the orchestrator works through the source folder. Files are processed
//! one at a time, so events for different files never overlap.
//!
//! # Example
//!
//! ```rust
//! use svgpin::{BatchProgressCallback, PinConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     pinned: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_asset_complete(&self, file_name: &str, index: usize, total: usize, cid: &str) {
//!         self.pinned.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{index}/{total} {file_name} → {cid}");
//!     }
//! }
//!
//! let config = PinConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { pinned: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each file.
///
/// All methods default to no-ops so callers only override what they need.
/// `index` is 1-based over the eligible files.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once, after enumeration, with the number of eligible files.
    fn on_run_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before a file is read.
    fn on_asset_start(&self, file_name: &str, index: usize, total: usize) {
        let _ = (file_name, index, total);
    }

    /// Called after a file's ledger entry has been committed.
    fn on_asset_complete(&self, file_name: &str, index: usize, total: usize, cid: &str) {
        let _ = (file_name, index, total, cid);
    }

    /// Called when a file is skipped because a stage failed.
    fn on_asset_error(&self, file_name: &str, index: usize, total: usize, error: &str) {
        let _ = (file_name, index, total, error);
    }

    /// Called once after every eligible file has been attempted.
    fn on_run_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PinConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
