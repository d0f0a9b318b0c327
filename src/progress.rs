//! Progress-callback trait for per-slot batch events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::batch::BatchOptionsBuilder::progress_callback`] to receive events
//! as each document slot is converted.
//!
//! # Example
//!
//! ```rust
//! use evrak_jpeg::{BatchOptions, ConversionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_slot_complete(&self, key: &str, output_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{key} done ({output_len} bytes)");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let options = BatchOptions::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::SlotError;
use std::sync::Arc;

/// Called by the batch driver as it works through document slots.
///
/// All methods have default no-op implementations. With
/// `concurrency > 1` the per-slot methods may be called concurrently from
/// different tasks, so shared state needs `Mutex` or atomics.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any slot starts.
    fn on_batch_start(&self, total_slots: usize) {
        let _ = total_slots;
    }

    /// Called just before a slot's conversion begins.
    fn on_slot_start(&self, key: &str) {
        let _ = key;
    }

    /// Called when a slot produced its JPEG.
    ///
    /// # Arguments
    /// * `key`: slot key, e.g. `"diploma"`
    /// * `output_len`: JPEG size in bytes
    fn on_slot_complete(&self, key: &str, output_len: usize) {
        let _ = (key, output_len);
    }

    /// Called when a slot failed; the batch carries on with the others.
    fn on_slot_error(&self, key: &str, error: &SlotError) {
        let _ = (key, error);
    }

    /// Called once after every slot has been attempted.
    fn on_batch_complete(&self, total_slots: usize, succeeded: usize) {
        let _ = (total_slots, succeeded);
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Type stored in [`crate::batch::BatchOptions`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        starts: AtomicUsize,
        completes: AtomicUsize,
        failed_keys: Mutex<Vec<String>>,
        succeeded: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_slots: usize) {
            self.started_total.store(total_slots, Ordering::SeqCst);
        }

        fn on_slot_start(&self, _key: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_slot_complete(&self, _key: &str, _output_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_slot_error(&self, key: &str, _error: &SlotError) {
            self.failed_keys.lock().unwrap().push(key.to_string());
        }

        fn on_batch_complete(&self, _total_slots: usize, succeeded: usize) {
            self.succeeded.store(succeeded, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(3);
        cb.on_slot_start("diploma");
        cb.on_slot_complete("diploma", 1024);
        cb.on_slot_error("sabika_kaydi", &SlotError::timeout("sabika_kaydi", 5));
        cb.on_batch_complete(3, 2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(2);
        tracker.on_slot_start("diploma");
        tracker.on_slot_complete("diploma", 100);
        tracker.on_slot_start("saglik_raporu");
        tracker.on_slot_error("saglik_raporu", &SlotError::timeout("saglik_raporu", 1));
        tracker.on_batch_complete(2, 1);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.failed_keys.lock().unwrap(), vec!["saglik_raporu"]);
        assert_eq!(tracker.succeeded.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(1);
        cb.on_slot_complete("biyometrik", 512);
    }
}
