//! Batch driver: convert several document slots, isolating failures.
//!
//! A session usually holds a few keyed slots (`sabika_kaydi`, `diploma`,
//! `saglik_raporu`, plus the portrait photo). Each slot runs through its own
//! pipeline; a failure is recorded against that slot and the rest carry on.
//!
//! [`convert_batch`] waits for every slot and returns results in submission
//! order. [`convert_stream`] yields each [`SlotResult`] as soon as it is
//! ready, in completion order when `concurrency > 1`.

use crate::config::{BiometricConfig, RenderConfig};
use crate::convert::{normalize_biometric_photo, rasterize_first_page};
use crate::document::{ConversionOutput, SourceDocument};
use crate::error::{ConvertError, SlotError};
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio_stream::Stream;
use tracing::{info, warn};

// ── Slots ────────────────────────────────────────────────────────────────

/// Which pipeline a slot goes through.
#[derive(Debug, Clone)]
pub enum Job {
    /// First page of a PDF to JPEG.
    Rasterize(RenderConfig),
    /// Portrait photo to a photo-ID JPEG.
    Biometric(BiometricConfig),
}

/// One keyed document awaiting conversion.
#[derive(Debug, Clone)]
pub struct Slot {
    pub key: String,
    pub document: SourceDocument,
    pub job: Job,
}

impl Slot {
    pub fn rasterize(key: impl Into<String>, document: SourceDocument, config: RenderConfig) -> Self {
        Self {
            key: key.into(),
            document,
            job: Job::Rasterize(config),
        }
    }

    pub fn biometric(
        key: impl Into<String>,
        document: SourceDocument,
        config: BiometricConfig,
    ) -> Self {
        Self {
            key: key.into(),
            document,
            job: Job::Biometric(config),
        }
    }
}

// ── Options ──────────────────────────────────────────────────────────────

/// Batch-level knobs.
#[derive(Clone)]
pub struct BatchOptions {
    /// Slots converted at the same time. Default: 1 (one after another).
    pub concurrency: usize,

    /// Give up on a slot after this many seconds. Default: no limit.
    ///
    /// Work already handed to the blocking pool runs to completion in the
    /// background; only its result is discarded.
    pub slot_timeout_secs: Option<u64>,

    /// Optional per-slot event sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            slot_timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOptions")
            .field("concurrency", &self.concurrency)
            .field("slot_timeout_secs", &self.slot_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl BatchOptions {
    pub fn builder() -> BatchOptionsBuilder {
        BatchOptionsBuilder {
            options: Self::default(),
        }
    }
}

/// Builder for [`BatchOptions`].
pub struct BatchOptionsBuilder {
    options: BatchOptions,
}

impl BatchOptionsBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.options.concurrency = n.max(1);
        self
    }

    pub fn slot_timeout_secs(mut self, secs: u64) -> Self {
        self.options.slot_timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.options.progress_callback = Some(cb);
        self
    }

    pub fn build(self) -> Result<BatchOptions, ConvertError> {
        if self.options.slot_timeout_secs == Some(0) {
            return Err(ConvertError::InvalidConfig(
                "slot_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(self.options)
    }
}

// ── Results ──────────────────────────────────────────────────────────────

/// Outcome of one slot. Exactly one of `output` / `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotResult {
    /// Position in the submitted slot list.
    pub index: usize,
    pub key: String,
    pub output: Option<ConversionOutput>,
    pub error: Option<SlotError>,
    pub duration_ms: u64,
}

impl SlotResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate counts for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_slots: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_duration_ms: u64,
}

/// Everything [`convert_batch`] produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// One entry per slot, in submission order.
    pub results: Vec<SlotResult>,
    pub stats: BatchStats,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.stats.failed == 0
    }
}

/// A boxed stream of slot results.
pub type SlotStream = Pin<Box<dyn Stream<Item = SlotResult> + Send>>;

// ── Drivers ──────────────────────────────────────────────────────────────

/// Convert every slot and return once all have been attempted.
///
/// Never fails as a whole: each slot's error is kept in its
/// [`SlotResult`]. Check [`BatchReport::all_succeeded`].
pub async fn convert_batch(slots: Vec<Slot>, options: &BatchOptions) -> BatchReport {
    let start = Instant::now();
    let total = slots.len();
    info!(
        "Starting batch: {} slots, concurrency {}",
        total,
        options.concurrency.max(1)
    );

    if let Some(ref cb) = options.progress_callback {
        cb.on_batch_start(total);
    }

    let mut results: Vec<SlotResult> = slot_futures(slots, options)
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;
    results.sort_by_key(|r| r.index);

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let stats = BatchStats {
        total_slots: total,
        succeeded,
        failed: total - succeeded,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Batch complete: {}/{} slots, {}ms total",
        succeeded, total, stats.total_duration_ms
    );

    if let Some(ref cb) = options.progress_callback {
        cb.on_batch_complete(total, succeeded);
    }

    BatchReport { results, stats }
}

/// Synchronous wrapper around [`convert_batch`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_batch_sync(
    slots: Vec<Slot>,
    options: &BatchOptions,
) -> Result<BatchReport, ConvertError> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
    Ok(rt.block_on(convert_batch(slots, options)))
}

/// Convert slots, yielding each result as soon as it completes.
///
/// `on_batch_start` fires immediately; `on_batch_complete` is not fired,
/// since the caller decides when the stream is finished.
pub fn convert_stream(slots: Vec<Slot>, options: &BatchOptions) -> SlotStream {
    if let Some(ref cb) = options.progress_callback {
        cb.on_batch_start(slots.len());
    }
    let concurrency = options.concurrency.max(1);
    Box::pin(slot_futures(slots, options).buffer_unordered(concurrency))
}

fn slot_futures(
    slots: Vec<Slot>,
    options: &BatchOptions,
) -> impl futures::Stream<Item = impl std::future::Future<Output = SlotResult> + Send> + Send {
    let timeout = options.slot_timeout_secs;
    let callback = options.progress_callback.clone();
    stream::iter(slots.into_iter().enumerate().map(move |(index, slot)| {
        run_slot(index, slot, timeout, callback.clone())
    }))
}

async fn run_slot(
    index: usize,
    slot: Slot,
    timeout_secs: Option<u64>,
    callback: Option<ProgressCallback>,
) -> SlotResult {
    if let Some(ref cb) = callback {
        cb.on_slot_start(&slot.key);
    }
    let start = Instant::now();

    let conversion = convert_slot(&slot);
    let outcome = match timeout_secs {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), conversion).await {
            Ok(result) => result.map_err(|e| SlotError::from_convert(&slot.key, &e)),
            Err(_) => Err(SlotError::timeout(&slot.key, secs)),
        },
        None => conversion
            .await
            .map_err(|e| SlotError::from_convert(&slot.key, &e)),
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    match outcome {
        Ok(output) => {
            if let Some(ref cb) = callback {
                cb.on_slot_complete(&slot.key, output.len());
            }
            SlotResult {
                index,
                key: slot.key,
                output: Some(output),
                error: None,
                duration_ms,
            }
        }
        Err(error) => {
            warn!("{}", error);
            if let Some(ref cb) = callback {
                cb.on_slot_error(&slot.key, &error);
            }
            SlotResult {
                index,
                key: slot.key,
                output: None,
                error: Some(error),
                duration_ms,
            }
        }
    }
}

async fn convert_slot(slot: &Slot) -> Result<ConversionOutput, ConvertError> {
    match &slot.job {
        Job::Rasterize(config) => rasterize_first_page(&slot.document, config).await,
        Job::Biometric(config) => normalize_biometric_photo(&slot.document, config).await,
    }
}
