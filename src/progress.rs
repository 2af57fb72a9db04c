//! Progress-callback trait for per-invoice batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::RenameConfigBuilder::progress_callback`] to receive an
//! event for every file the batch driver touches. The CLI uses it to print
//! one ✓/✗ line per invoice under a progress bar.
//!
//! Files are processed one at a time, so events for a batch never
//! interleave. The trait is still `Send + Sync` so a callback can be shared
//! with other tasks.
//!
//! # Example
//!
//! ```rust
//! use edgequake_invoice_rename::{BatchProgressCallback, ProcessedInvoice, RenameConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counting {
//!     renamed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for Counting {
//!     fn on_file_complete(&self, _index: usize, _total: usize, record: &ProcessedInvoice) {
//!         self.renamed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{} -> {}", record.original_name, record.output_name);
//!     }
//! }
//!
//! let config = RenameConfig::builder()
//!     .progress_callback(Arc::new(Counting { renamed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::ProcessedInvoice;
use std::sync::Arc;

/// Called by the batch driver as it works through the input directory.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after enumeration, before the first file.
    ///
    /// Not called when there is nothing to do; see [`Self::on_nothing_to_do`].
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called when the input directory holds no eligible invoices.
    fn on_nothing_to_do(&self) {}

    /// Called just before a file is read.
    fn on_file_start(&self, index: usize, total_files: usize, file_name: &str) {
        let _ = (index, total_files, file_name);
    }

    /// Called when a file was renamed and its original moved.
    fn on_file_complete(&self, index: usize, total_files: usize, record: &ProcessedInvoice) {
        let _ = (index, total_files, record);
    }

    /// Called when a file failed; the original stays where it was.
    fn on_file_error(&self, index: usize, total_files: usize, file_name: &str, error: &str) {
        let _ = (index, total_files, file_name, error);
    }

    /// Called once after every file has been attempted.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RenameConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        total: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_files: usize) {
            self.total.store(total_files, Ordering::SeqCst);
        }

        fn on_file_start(&self, _index: usize, _total: usize, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_complete(&self, _index: usize, _total: usize, _record: &ProcessedInvoice) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_error(&self, _index: usize, _total: usize, _name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn record() -> ProcessedInvoice {
        ProcessedInvoice {
            original_name: "a.pdf".into(),
            output_name: "250615_shell.pdf".into(),
            processed_name: "a.pdf".into(),
            issue_date: "250615".into(),
            issuer_name: "Shell".into(),
            attempts: 1,
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_file_start(1, 2, "a.pdf");
        cb.on_file_complete(1, 2, &record());
        cb.on_file_error(2, 2, "b.pdf", "boom");
        cb.on_batch_complete(2, 1);
        cb.on_nothing_to_do();
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_batch_start(2);
        tracker.on_file_start(1, 2, "a.pdf");
        tracker.on_file_complete(1, 2, &record());
        tracker.on_file_start(2, 2, "b.pdf");
        tracker.on_file_error(2, 2, "b.pdf", "timeout");

        assert_eq!(tracker.total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }
}
