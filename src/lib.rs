//! # evrak-jpeg
//!
//! Turn application paperwork into uniform JPEGs: the first page of each PDF
//! document, plus a portrait photo normalized to a standard photo-ID size.
//!
//! ## Pipelines
//!
//! ```text
//! PDF ──► Page Rasterizer ─────────────────────────────────────► JPEG
//!          render page 1 at scale (pdfium, spawn_blocking)
//!          viewport = floor(points × scale), white backdrop
//!
//! Photo ─► Biometric Normalizer ──────────────────────────────► JPEG
//!          decode → [segment + whiten] → center crop → Lanczos3 → encode
//!          35x45 mm = 413×531 px, 50x60 mm = 591×709 px (300 DPI)
//! ```
//!
//! Both pipelines are async, run their CPU-heavy steps on the blocking pool,
//! and return a [`ConversionOutput`] or a [`ConvertError`]. The
//! [`batch`] driver runs several keyed slots and keeps one slot's failure
//! from affecting the others.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use evrak_jpeg::{rasterize_first_page, RenderConfig, SourceDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bytes = std::fs::read("diploma.pdf")?;
//!     let output = rasterize_first_page(&SourceDocument::pdf(bytes), &RenderConfig::default()).await?;
//!     std::fs::write("diploma.jpeg", &output.bytes)?;
//!     eprintln!("{}x{}", output.width, output.height);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `evrak2jpeg` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `onnx`  | off     | `segmentation::OnnxSegmenter` backed by ONNX Runtime |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! evrak-jpeg = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! The rasterizer loads libpdfium at runtime; see [`engine`] for the lookup
//! order. The photo pipeline never needs it.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod convert;
pub mod document;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod naming;
pub mod pipeline;
pub mod progress;
pub mod segmentation;
pub mod surface;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{
    convert_batch, convert_batch_sync, convert_stream, BatchOptions, BatchOptionsBuilder,
    BatchReport, BatchStats, Job, Slot, SlotResult, SlotStream,
};
pub use config::{
    BiometricConfig, BiometricConfigBuilder, RenderConfig, RenderConfigBuilder, TargetSize,
    DEFAULT_QUALITY, DEFAULT_SCALE,
};
pub use convert::{
    normalize_biometric_photo, normalize_biometric_photo_sync, rasterize_first_page,
    rasterize_first_page_sync,
};
pub use document::{ConversionOutput, MediaKind, SourceDocument};
pub use error::{ConvertError, ErrorKind, SlotError, Step};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use segmentation::{SegmentationError, Segmenter};
pub use surface::{ForegroundMask, RasterSurface};
