//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ExtractorConfigBuilder::progress_callback`] to receive
//! events as the Extractor walks the input directory. The library itself
//! only logs through `tracing`; all console rendering lives in callbacks.
//!
//! # Example
//!
//! ```rust
//! use exam2json::{BatchProgressCallback, ExtractorConfig};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl BatchProgressCallback for Printer {
//!     fn on_file_start(&self, index: usize, total: usize, input: &Path) {
//!         eprintln!("Processing {}/{}: {}", index, total, input.display());
//!     }
//! }
//!
//! let config = ExtractorConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the Extractor as it processes each file.
///
/// Files are processed one at a time, so calls never overlap; the trait is
/// still `Send + Sync` so a callback can be shared with other tasks. All
/// methods default to no-ops.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after the input directory has been listed.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before each file is examined.
    ///
    /// # Arguments
    /// * `index`: 1-indexed position in the batch
    /// * `total`: number of files in the batch
    /// * `input`: path of the input file
    fn on_file_start(&self, index: usize, total: usize, input: &Path) {
        let _ = (index, total, input);
    }

    /// Called when the output already exists and the file is skipped.
    fn on_file_skipped(&self, index: usize, total: usize, output: &Path) {
        let _ = (index, total, output);
    }

    /// Called after a validated output file has been written.
    ///
    /// * `records`: number of records in the written collection
    fn on_file_converted(&self, index: usize, total: usize, output: &Path, records: usize) {
        let _ = (index, total, output, records);
    }

    /// Called when a file fails; the batch continues afterwards.
    ///
    /// * `kind` : short failure label (see [`crate::FileError::kind`])
    /// * `error`: human-readable error description
    fn on_file_error(&self, index: usize, total: usize, kind: &str, error: &str) {
        let _ = (index, total, kind, error);
    }

    /// Called once after every file has been attempted.
    fn on_batch_complete(&self, converted: usize, skipped: usize, failed: usize) {
        let _ = (converted, skipped, failed);
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractorConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
