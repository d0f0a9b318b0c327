//! Center crop to the target aspect ratio, then resample to exact pixels.

use crate::error::{ConvertError, Step};
use crate::geometry::center_crop;
use crate::surface::RasterSurface;
use image::imageops::{self, FilterType};
use tracing::debug;

/// Crop the largest centred region with the aspect ratio of `target`, then
/// scale it to exactly `target` pixels.
///
/// When the crop already has the target size the resample is skipped.
pub fn crop_and_scale(
    surface: RasterSurface,
    target: (u32, u32),
) -> Result<RasterSurface, ConvertError> {
    let crop = center_crop(surface.dimensions(), target)?;
    debug!(
        "Crop {}x{} at ({}, {}) from {}x{}",
        crop.width,
        crop.height,
        crop.x,
        crop.y,
        surface.width(),
        surface.height()
    );

    let source = surface.into_rgba();
    let cropped = imageops::crop_imm(&source, crop.x, crop.y, crop.width, crop.height).to_image();
    drop(source);
    let cropped = RasterSurface::from_rgba(cropped, Step::Crop)?;

    if cropped.dimensions() == target {
        return Ok(cropped);
    }

    let scaled = imageops::resize(cropped.as_rgba(), target.0, target.1, FilterType::Lanczos3);
    if scaled.dimensions() != target {
        return Err(ConvertError::compositing(
            Step::Scale,
            format!(
                "resampler produced {}x{}, expected {}x{}",
                scaled.width(),
                scaled.height(),
                target.0,
                target.1
            ),
        ));
    }
    RasterSurface::from_rgba(scaled, Step::Scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid(w: u32, h: u32) -> RasterSurface {
        RasterSurface::from_rgba(RgbaImage::from_pixel(w, h, Rgba([40, 80, 120, 255])), Step::Decode)
            .unwrap()
    }

    #[test]
    fn landscape_source_reaches_exact_target() {
        let out = crop_and_scale(solid(400, 300), (413, 531)).unwrap();
        assert_eq!(out.dimensions(), (413, 531));
    }

    #[test]
    fn exact_size_is_passed_through() {
        let src = RgbaImage::from_fn(35, 45, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let surface = RasterSurface::from_rgba(src.clone(), Step::Decode).unwrap();
        let out = crop_and_scale(surface, (35, 45)).unwrap();
        assert_eq!(out.as_rgba(), &src);
    }

    #[test]
    fn crop_takes_the_center() {
        // 6x2 source, square target: columns 2 and 3 survive.
        let src = RgbaImage::from_fn(6, 2, |x, _| Rgba([x as u8 * 10, 0, 0, 255]));
        let surface = RasterSurface::from_rgba(src, Step::Decode).unwrap();
        let out = crop_and_scale(surface, (2, 2)).unwrap();
        assert_eq!(out.dimensions(), (2, 2));
        assert_eq!(out.as_rgba().get_pixel(0, 0).0[0], 20);
        assert_eq!(out.as_rgba().get_pixel(1, 1).0[0], 30);
    }

    #[test]
    fn uniform_colour_survives_resampling() {
        let out = crop_and_scale(solid(100, 100), (35, 45)).unwrap();
        assert!(out.as_rgba().pixels().all(|p| p.0 == [40, 80, 120, 255]));
    }
}
