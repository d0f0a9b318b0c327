//! Owned pixel buffers passed between pipeline steps.
//!
//! A [`RasterSurface`] is moved from step to step; each step consumes its
//! input and returns a new surface, so a superseded buffer is freed as soon
//! as the next one exists.

use crate::error::{ConvertError, Step};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, RgbaImage};

/// An RGBA pixel buffer with `width, height ≥ 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSurface {
    pixels: RgbaImage,
}

impl RasterSurface {
    /// Wrap an existing buffer, rejecting empty ones.
    pub fn from_rgba(pixels: RgbaImage, step: Step) -> Result<Self, ConvertError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(ConvertError::compositing(
                step,
                format!("empty surface {}x{}", pixels.width(), pixels.height()),
            ));
        }
        Ok(Self { pixels })
    }

    pub fn from_image(image: DynamicImage, step: Step) -> Result<Self, ConvertError> {
        Self::from_rgba(image.into_rgba8(), step)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }

    /// Composite onto solid white and drop the alpha channel.
    ///
    /// Fully opaque pixels come through unchanged.
    pub fn flatten_onto_white(self) -> RgbImage {
        let (w, h) = self.dimensions();
        let mut out = RgbImage::new(w, h);
        for (dst, src) in out.pixels_mut().zip(self.pixels.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = Rgb([over_white(r, a), over_white(g, a), over_white(b, a)]);
        }
        out
    }
}

/// `c·α + 255·(1−α)` in 8-bit fixed point, exact for α = 255.
#[inline]
pub(crate) fn over_white(c: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8
}

/// Per-pixel foreground confidence aligned to a surface.
///
/// 255 keeps a pixel, 0 discards it; values in between blend.
#[derive(Debug, Clone, PartialEq)]
pub struct ForegroundMask {
    alpha: GrayImage,
}

impl ForegroundMask {
    pub fn new(alpha: GrayImage) -> Self {
        Self { alpha }
    }

    /// A mask of one constant value.
    pub fn uniform(width: u32, height: u32, value: u8) -> Self {
        Self {
            alpha: GrayImage::from_pixel(width, height, Luma([value])),
        }
    }

    /// Build a mask from per-pixel confidences in [0, 1], row-major.
    pub fn from_confidences(width: u32, height: u32, values: &[f32]) -> Option<Self> {
        if values.len() != width as usize * height as usize {
            return None;
        }
        let data = values
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();
        GrayImage::from_raw(width, height, data).map(Self::new)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.alpha.dimensions()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.alpha
    }

    /// Fraction of the mask at full foreground.
    pub fn coverage(&self) -> f64 {
        let total = self.alpha.len();
        if total == 0 {
            return 0.0;
        }
        let fg = self.alpha.as_raw().iter().filter(|&&v| v == 255).count();
        fg as f64 / total as f64
    }
}
