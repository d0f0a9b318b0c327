//! Single-document conversion entry points.
//!
//! Each call turns one [`SourceDocument`] into one JPEG. For several
//! documents at once, with per-slot error isolation and progress events,
//! use [`crate::batch::convert_batch`].

use crate::config::{BiometricConfig, RenderConfig};
use crate::document::{ConversionOutput, MediaKind, SourceDocument};
use crate::error::ConvertError;
use crate::pipeline::{crop, decode, encode, render, whiten};
use std::time::Instant;
use tracing::{debug, info};

/// Render the first page of a PDF and encode it as JPEG.
///
/// Output width and height equal the page's size in points times
/// `config.scale`, floored. Later pages are never rendered.
///
/// # Errors
/// - [`ConvertError::Decode`] if the document is not a readable PDF or has
///   no pages.
/// - [`ConvertError::InvalidConfig`] for a non-positive scale.
/// - [`ConvertError::PdfiumBindingFailed`] if libpdfium cannot be loaded.
/// - [`ConvertError::Encode`] if the JPEG encoder fails.
pub async fn rasterize_first_page(
    doc: &SourceDocument,
    config: &RenderConfig,
) -> Result<ConversionOutput, ConvertError> {
    let start = Instant::now();
    config.validate()?;
    info!(
        "Rasterizing first page ({} bytes, scale {})",
        doc.len(),
        config.scale
    );

    let surface = render::render_first_page(doc, config.scale).await?;
    let (width, height) = surface.dimensions();
    debug!("Rendered page 1 to {}x{}", width, height);

    let quality = config.quality;
    let bytes = tokio::task::spawn_blocking(move || encode::encode_surface(surface, quality))
        .await
        .map_err(|e| ConvertError::Internal(format!("Encode task panicked: {}", e)))??;

    info!(
        "Page rasterized: {}x{}, {} bytes JPEG in {}ms",
        width,
        height,
        bytes.len(),
        start.elapsed().as_millis()
    );

    Ok(ConversionOutput {
        bytes,
        width,
        height,
        source_kind: MediaKind::Pdf,
    })
}

/// Normalize a portrait photo to a standard photo-ID size.
///
/// Steps run in a fixed order: decode, optional background whitening,
/// center crop to the target aspect, Lanczos3 scale to exact pixels, then
/// JPEG encode. Output dimensions always equal
/// [`crate::config::TargetSize::pixel_size`].
///
/// Whitening is never skipped silently: with `whiten_background` set and no
/// usable segmenter the call fails with
/// [`ConvertError::SegmentationUnavailable`].
pub async fn normalize_biometric_photo(
    doc: &SourceDocument,
    config: &BiometricConfig,
) -> Result<ConversionOutput, ConvertError> {
    let start = Instant::now();
    let target = config.target_size.pixel_size();
    info!(
        "Normalizing photo ({} bytes) to {} ({}x{} px), whiten={}",
        doc.len(),
        config.target_size,
        target.0,
        target.1,
        config.whiten_background
    );

    // ── Step 1: Decode ───────────────────────────────────────────────────
    doc.require_kind(MediaKind::RasterImage)?;
    let decode_doc = doc.clone();
    let surface = tokio::task::spawn_blocking(move || decode::decode_raster(&decode_doc))
        .await
        .map_err(|e| ConvertError::Internal(format!("Decode task panicked: {}", e)))??;
    debug!("Decoded {}x{}", surface.width(), surface.height());

    // ── Step 2: Segment (whitening only) ─────────────────────────────────
    let mask = if config.whiten_background {
        Some(whiten::fetch_mask(&surface, config.segmenter.as_ref()).await?)
    } else {
        None
    };

    // ── Steps 3-6: Composite, crop, scale, encode ────────────────────────
    let quality = config.quality;
    let bytes = tokio::task::spawn_blocking(move || {
        let surface = match mask {
            Some(mask) => whiten::composite_on_white(surface, &mask)?,
            None => surface,
        };
        let surface = crop::crop_and_scale(surface, target)?;
        encode::encode_surface(surface, quality)
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("Compositing task panicked: {}", e)))??;

    info!(
        "Photo normalized: {}x{}, {} bytes JPEG in {}ms",
        target.0,
        target.1,
        bytes.len(),
        start.elapsed().as_millis()
    );

    Ok(ConversionOutput {
        bytes,
        width: target.0,
        height: target.1,
        source_kind: MediaKind::RasterImage,
    })
}

/// Synchronous wrapper around [`rasterize_first_page`].
///
/// Creates a temporary tokio runtime internally.
pub fn rasterize_first_page_sync(
    doc: &SourceDocument,
    config: &RenderConfig,
) -> Result<ConversionOutput, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(rasterize_first_page(doc, config))
}

/// Synchronous wrapper around [`normalize_biometric_photo`].
pub fn normalize_biometric_photo_sync(
    doc: &SourceDocument,
    config: &BiometricConfig,
) -> Result<ConversionOutput, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(normalize_biometric_photo(doc, config))
}
