//! Foreground/background segmentation: the one capability background
//! whitening depends on.
//!
//! The model is external and may be absent, so the pipeline only sees the
//! single-method [`Segmenter`] trait. Implementations shipped here:
//!
//! | Type | Use |
//! |------|-----|
//! | [`UniformSegmenter`] | deterministic all-foreground / all-background stub |
//! | [`CheckerboardSegmenter`] | deterministic alternating-cell stub |
//! | [`CallbackSegmenter`] | adapts a "results ready" callback API to one awaited result |
//! | [`SerializedSegmenter`] | gate allowing one in-flight call at a time |
//! | `OnnxSegmenter` | selfie-segmentation ONNX model (feature `onnx`) |

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::{ModelVariant, OnnxSegmenter};

use crate::surface::{ForegroundMask, RasterSurface};
use futures::future::BoxFuture;
use image::{GrayImage, Luma, RgbaImage};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{oneshot, Mutex};
use tracing::debug;

/// Why a segmentation call produced no mask.
#[derive(Debug, Clone, Error)]
pub enum SegmentationError {
    /// The model could not be loaded or reached.
    #[error("segmentation model unavailable: {0}")]
    Unavailable(String),

    /// The model ran but failed on this input.
    #[error("segmentation failed: {0}")]
    Failed(String),

    /// The one-shot result was never delivered.
    #[error("segmentation result was dropped before completion")]
    Dropped,
}

/// Produces a foreground mask aligned to a surface.
///
/// Exactly one result is expected per call. Implementations need not be
/// reentrant; wrap them in [`SerializedSegmenter`] (the
/// [`crate::config::BiometricConfigBuilder::segmenter`] setter does this)
/// before sharing them between concurrent conversions.
pub trait Segmenter: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Compute the mask for `surface`. The mask must have the surface's
    /// dimensions.
    fn segment<'a>(
        &'a self,
        surface: &'a RasterSurface,
    ) -> BoxFuture<'a, Result<ForegroundMask, SegmentationError>>;
}

// ── Serialization gate ───────────────────────────────────────────────────

/// Wraps a segmenter so at most one call is in flight at a time.
///
/// The gate is held by a spawned task that drives the backend call to
/// completion, not by the caller. A caller that is dropped mid-call (a slot
/// timeout, say) leaves the gate closed until the backend has actually
/// finished, so the next submission never overlaps an abandoned one.
pub struct SerializedSegmenter {
    inner: Arc<dyn Segmenter>,
    gate: Arc<Mutex<()>>,
}

impl SerializedSegmenter {
    pub fn new(inner: Arc<dyn Segmenter>) -> Self {
        Self {
            inner,
            gate: Arc::new(Mutex::new(())),
        }
    }
}

impl Segmenter for SerializedSegmenter {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn segment<'a>(
        &'a self,
        surface: &'a RasterSurface,
    ) -> BoxFuture<'a, Result<ForegroundMask, SegmentationError>> {
        Box::pin(async move {
            let guard = self.gate.clone().lock_owned().await;
            let inner = self.inner.clone();
            let pixels = surface.clone();

            let call = tokio::spawn(async move {
                let _guard = guard;
                inner.segment(&pixels).await
            });
            call.await.map_err(|e| {
                SegmentationError::Failed(format!("{} task panicked: {}", self.inner.name(), e))
            })?
        })
    }
}

// ── Deterministic stubs ──────────────────────────────────────────────────

/// Returns the same mask value for every pixel.
#[derive(Debug, Clone, Copy)]
pub struct UniformSegmenter {
    value: u8,
}

impl UniformSegmenter {
    /// Every pixel is foreground; whitening becomes a no-op on opaque input.
    pub fn foreground() -> Self {
        Self { value: 255 }
    }

    /// Every pixel is background; whitening yields a blank white surface.
    pub fn background() -> Self {
        Self { value: 0 }
    }
}

impl Segmenter for UniformSegmenter {
    fn name(&self) -> &str {
        if self.value == 0 {
            "uniform-background"
        } else {
            "uniform-foreground"
        }
    }

    fn segment<'a>(
        &'a self,
        surface: &'a RasterSurface,
    ) -> BoxFuture<'a, Result<ForegroundMask, SegmentationError>> {
        let (w, h) = surface.dimensions();
        Box::pin(async move { Ok(ForegroundMask::uniform(w, h, self.value)) })
    }
}

/// Alternating foreground/background square cells, starting with foreground
/// at the top-left.
#[derive(Debug, Clone, Copy)]
pub struct CheckerboardSegmenter {
    cell: u32,
}

impl CheckerboardSegmenter {
    pub fn new(cell: u32) -> Self {
        Self { cell: cell.max(1) }
    }
}

impl Segmenter for CheckerboardSegmenter {
    fn name(&self) -> &str {
        "checkerboard"
    }

    fn segment<'a>(
        &'a self,
        surface: &'a RasterSurface,
    ) -> BoxFuture<'a, Result<ForegroundMask, SegmentationError>> {
        let (w, h) = surface.dimensions();
        let cell = self.cell;
        Box::pin(async move {
            let alpha = GrayImage::from_fn(w, h, |x, y| {
                if ((x / cell) + (y / cell)) % 2 == 0 {
                    Luma([255])
                } else {
                    Luma([0])
                }
            });
            Ok(ForegroundMask::new(alpha))
        })
    }
}

// ── Callback adapter ─────────────────────────────────────────────────────

/// Delivers the single result of a callback-style segmentation request.
pub type MaskResponder = Box<dyn FnOnce(Result<ForegroundMask, SegmentationError>) + Send>;

type SubmitFn = dyn Fn(RgbaImage, MaskResponder) + Send + Sync;

/// Adapts a submit-then-callback model API into an awaited result.
///
/// `submit` receives a copy of the pixels and a responder; the backend calls
/// the responder exactly once, from any thread, when results are ready. A
/// responder dropped without being called surfaces as
/// [`SegmentationError::Dropped`].
pub struct CallbackSegmenter {
    name: String,
    submit: Box<SubmitFn>,
}

impl CallbackSegmenter {
    pub fn new<F>(name: impl Into<String>, submit: F) -> Self
    where
        F: Fn(RgbaImage, MaskResponder) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            submit: Box::new(submit),
        }
    }
}

impl Segmenter for CallbackSegmenter {
    fn name(&self) -> &str {
        &self.name
    }

    fn segment<'a>(
        &'a self,
        surface: &'a RasterSurface,
    ) -> BoxFuture<'a, Result<ForegroundMask, SegmentationError>> {
        Box::pin(async move {
            let (tx, rx) = oneshot::channel();
            let responder: MaskResponder = Box::new(move |result| {
                // Receiver gone means the conversion was abandoned.
                let _ = tx.send(result);
            });
            debug!("Submitting {}x{} surface to {}", surface.width(), surface.height(), self.name);
            (self.submit)(surface.as_rgba().clone(), responder);
            rx.await.map_err(|_| SegmentationError::Dropped)?
        })
    }
}
