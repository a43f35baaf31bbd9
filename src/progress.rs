//! Progress-callback trait for per-URL batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the batch works through the URL list. The CLI uses this to drive
//! its progress bar; library callers can forward events anywhere they like.
//!
//! # Example
//!
//! ```rust
//! use url2pdf::{BatchProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_url_complete(&self, index: usize, total: usize, url: &str, _pdf: &std::path::Path) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{index}/{total} done: {url}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the batch driver as it processes each URL.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is always 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once, after the URL list has been read.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before a URL is fetched.
    fn on_url_start(&self, index: usize, total: usize, url: &str) {
        let _ = (index, total, url);
    }

    /// Called when a URL has been written to `pdf_path`.
    fn on_url_complete(&self, index: usize, total: usize, url: &str, pdf_path: &Path) {
        let _ = (index, total, url, pdf_path);
    }

    /// Called when a URL failed; the batch continues with the next one.
    fn on_url_error(&self, index: usize, total: usize, url: &str, error: &str) {
        let _ = (index, total, url, error);
    }

    /// Called once after every URL has been attempted.
    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        let _ = (total, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
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
        batch_total: AtomicUsize,
        batch_succeeded: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total: usize) {
            self.batch_total.store(total, Ordering::SeqCst);
        }

        fn on_url_start(&self, _index: usize, _total: usize, _url: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_url_complete(&self, _index: usize, _total: usize, _url: &str, _pdf_path: &Path) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_url_error(&self, _index: usize, _total: usize, _url: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, succeeded: usize) {
            self.batch_succeeded.store(succeeded, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_url_start(1, 2, "http://a.example/");
        cb.on_url_complete(1, 2, "http://a.example/", Path::new("a.pdf"));
        cb.on_url_error(2, 2, "http://b.example/", "boom");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(3);
        assert_eq!(tracker.batch_total.load(Ordering::SeqCst), 3);

        tracker.on_url_start(1, 3, "u1");
        tracker.on_url_complete(1, 3, "u1", Path::new("1.pdf"));
        tracker.on_url_start(2, 3, "u2");
        tracker.on_url_complete(2, 3, "u2", Path::new("2.pdf"));
        tracker.on_url_start(3, 3, "u3");
        tracker.on_url_error(3, 3, "u3", "HTTP 500");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);

        tracker.on_batch_complete(3, 2);
        assert_eq!(tracker.batch_succeeded.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10);
        cb.on_url_start(1, 10, "http://a.example/");
    }
}
