//! Configuration types for both conversion pipelines.
//!
//! [`RenderConfig`] drives the Page Rasterizer, [`BiometricConfig`] drives the
//! Biometric Normalizer. Both are plain values passed per call and built via
//! their builders, which clamp out-of-range numbers instead of rejecting them.

use crate::error::ConvertError;
use crate::geometry::{mm_to_px, PHOTO_DPI};
use crate::segmentation::{Segmenter, SerializedSegmenter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// JPEG quality used when the caller does not pick one.
pub const DEFAULT_QUALITY: f32 = 0.92;

/// Page render scale used when the caller does not pick one.
pub const DEFAULT_SCALE: f32 = 2.0;

const MIN_QUALITY: f32 = 0.01;

fn clamp_quality(q: f32) -> f32 {
    if q.is_nan() {
        DEFAULT_QUALITY
    } else {
        q.clamp(MIN_QUALITY, 1.0)
    }
}

// ── Page Rasterizer ──────────────────────────────────────────────────────

/// Configuration for rendering the first page of a PDF.
///
/// # Example
/// ```rust
/// use evrak_jpeg::RenderConfig;
///
/// let config = RenderConfig::builder().scale(1.5).quality(0.9).build().unwrap();
/// assert_eq!(config.scale, 1.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Multiplier applied to the page's intrinsic size in points. Default: 2.0.
    ///
    /// At 2.0 a US Letter page (612×792 pt) renders to 1224×1584 px.
    pub scale: f32,

    /// JPEG quality in (0, 1]. Default: 0.92.
    pub quality: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl RenderConfig {
    pub fn builder() -> RenderConfigBuilder {
        RenderConfigBuilder {
            config: Self::default(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConvertError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ConvertError::InvalidConfig(format!(
                "scale must be a positive number, got {}",
                self.scale
            )));
        }
        Ok(())
    }
}

/// Builder for [`RenderConfig`].
#[derive(Debug)]
pub struct RenderConfigBuilder {
    config: RenderConfig,
}

impl RenderConfigBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale;
        self
    }

    pub fn quality(mut self, quality: f32) -> Self {
        self.config.quality = clamp_quality(quality);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RenderConfig, ConvertError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Biometric Normalizer ─────────────────────────────────────────────────

/// Standard photo-ID print sizes, in millimetres (width × height).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetSize {
    /// 35 × 45 mm, the common passport/ID photo. (default)
    #[default]
    #[serde(rename = "35x45")]
    Size35x45,
    /// 50 × 60 mm.
    #[serde(rename = "50x60")]
    Size50x60,
}

impl TargetSize {
    pub fn label(&self) -> &'static str {
        match self {
            TargetSize::Size35x45 => "35x45",
            TargetSize::Size50x60 => "50x60",
        }
    }

    /// Physical size in millimetres.
    pub fn millimetres(&self) -> (f64, f64) {
        match self {
            TargetSize::Size35x45 => (35.0, 45.0),
            TargetSize::Size50x60 => (50.0, 60.0),
        }
    }

    /// Output pixel size at 300 DPI: 413×531 or 591×709.
    pub fn pixel_size(&self) -> (u32, u32) {
        let (w, h) = self.millimetres();
        (mm_to_px(w, PHOTO_DPI), mm_to_px(h, PHOTO_DPI))
    }

    /// Parse a size label, falling back to `35x45` for anything unrecognised.
    ///
    /// Unknown labels are not an error; the fallback is logged.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "35x45" => TargetSize::Size35x45,
            "50x60" => TargetSize::Size50x60,
            other => {
                warn!("Unknown target size '{}', falling back to 35x45", other);
                TargetSize::Size35x45
            }
        }
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Configuration for normalizing a portrait photo.
///
/// # Example
/// ```rust
/// use evrak_jpeg::{BiometricConfig, TargetSize};
///
/// let config = BiometricConfig::builder()
///     .target_size(TargetSize::Size50x60)
///     .whiten_background(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.target_size.pixel_size(), (591, 709));
/// ```
#[derive(Clone)]
pub struct BiometricConfig {
    /// Output print size. Default: 35x45.
    pub target_size: TargetSize,

    /// Replace the background with solid white. Default: true.
    ///
    /// Requires `segmenter`; a conversion with whitening on and no segmenter
    /// fails with [`ConvertError::SegmentationUnavailable`].
    pub whiten_background: bool,

    /// JPEG quality in (0, 1]. Default: 0.92.
    pub quality: f32,

    /// Foreground/background model used for whitening.
    pub segmenter: Option<Arc<dyn Segmenter>>,
}

impl Default for BiometricConfig {
    fn default() -> Self {
        Self {
            target_size: TargetSize::default(),
            whiten_background: true,
            quality: DEFAULT_QUALITY,
            segmenter: None,
        }
    }
}

impl fmt::Debug for BiometricConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BiometricConfig")
            .field("target_size", &self.target_size)
            .field("whiten_background", &self.whiten_background)
            .field("quality", &self.quality)
            .field("segmenter", &self.segmenter.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}

impl BiometricConfig {
    pub fn builder() -> BiometricConfigBuilder {
        BiometricConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`BiometricConfig`].
#[derive(Debug)]
pub struct BiometricConfigBuilder {
    config: BiometricConfig,
}

impl BiometricConfigBuilder {
    pub fn target_size(mut self, size: TargetSize) -> Self {
        self.config.target_size = size;
        self
    }

    /// Set the size from a label such as `"50x60"`; see [`TargetSize::from_label`].
    pub fn target_size_label(mut self, label: &str) -> Self {
        self.config.target_size = TargetSize::from_label(label);
        self
    }

    pub fn whiten_background(mut self, v: bool) -> Self {
        self.config.whiten_background = v;
        self
    }

    pub fn quality(mut self, quality: f32) -> Self {
        self.config.quality = clamp_quality(quality);
        self
    }

    /// Use `segmenter` for whitening. Calls into it are serialized, one
    /// submission at a time, across every conversion sharing this config.
    pub fn segmenter(mut self, segmenter: Arc<dyn Segmenter>) -> Self {
        self.config.segmenter = Some(Arc::new(SerializedSegmenter::new(segmenter)));
        self
    }

    pub fn build(self) -> Result<BiometricConfig, ConvertError> {
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let r = RenderConfig::default();
        assert_eq!(r.scale, 2.0);
        assert_eq!(r.quality, 0.92);

        let b = BiometricConfig::default();
        assert_eq!(b.target_size, TargetSize::Size35x45);
        assert!(b.whiten_background);
        assert_eq!(b.quality, 0.92);
        assert!(b.segmenter.is_none());
    }

    #[test]
    fn target_pixel_sizes() {
        assert_eq!(TargetSize::Size35x45.pixel_size(), (413, 531));
        assert_eq!(TargetSize::Size50x60.pixel_size(), (591, 709));
    }

    #[test]
    fn unknown_label_falls_back() {
        assert_eq!(TargetSize::from_label("50x60"), TargetSize::Size50x60);
        assert_eq!(TargetSize::from_label(" 50X60 "), TargetSize::Size50x60);
        assert_eq!(TargetSize::from_label("40x50"), TargetSize::Size35x45);
        assert_eq!(TargetSize::from_label(""), TargetSize::Size35x45);
    }

    #[test]
    fn target_size_serde_uses_labels() {
        let json = serde_json::to_string(&TargetSize::Size50x60).unwrap();
        assert_eq!(json, "\"50x60\"");
        let back: TargetSize = serde_json::from_str("\"35x45\"").unwrap();
        assert_eq!(back, TargetSize::Size35x45);
    }

    #[test]
    fn quality_is_clamped() {
        let r = RenderConfig::builder().quality(4.0).build().unwrap();
        assert_eq!(r.quality, 1.0);
        let r = RenderConfig::builder().quality(0.0).build().unwrap();
        assert_eq!(r.quality, MIN_QUALITY);
        let b = BiometricConfig::builder().quality(f32::NAN).build().unwrap();
        assert_eq!(b.quality, DEFAULT_QUALITY);
    }

    #[test]
    fn non_positive_scale_rejected() {
        assert!(RenderConfig::builder().scale(0.0).build().is_err());
        assert!(RenderConfig::builder().scale(-1.0).build().is_err());
        assert!(RenderConfig::builder().scale(f32::NAN).build().is_err());
    }

    #[test]
    fn debug_hides_segmenter_internals() {
        let b = BiometricConfig::builder()
            .segmenter(Arc::new(crate::segmentation::UniformSegmenter::foreground()))
            .build()
            .unwrap();
        let dbg = format!("{b:?}");
        assert!(dbg.contains("uniform-foreground"), "got: {dbg}");
    }
}
