//! Pure dimension math: physical sizes to pixels, viewports, center crops.
//!
//! Nothing in here touches pixels, so every rule of the output contract
//! (floored viewports, exact photo sizes, aspect-preserving crops) is unit
//! tested without a decoder or a PDF engine.

use crate::error::{ConvertError, Step};

/// Resolution photo-ID sizes are specified at.
pub const PHOTO_DPI: f64 = 300.0;

const MM_PER_INCH: f64 = 25.4;

/// Convert a physical length in millimetres to a pixel count at `dpi`.
///
/// `px = round(mm / 25.4 × dpi)`
pub fn mm_to_px(mm: f64, dpi: f64) -> u32 {
    (mm / MM_PER_INCH * dpi).round() as u32
}

/// Largest viewport axis the renderer accepts.
pub const MAX_AXIS_PX: u32 = i32::MAX as u32;

/// Pixel size of a rendered page: intrinsic size × scale, floored per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Viewport for a page of `page_width × page_height` points at `scale`.
    ///
    /// A floored axis of zero, or any non-finite input, is rejected rather
    /// than producing an empty surface. Axes are capped at [`MAX_AXIS_PX`]
    /// because pdfium takes signed 32-bit target sizes.
    pub fn at_scale(page_width: f32, page_height: f32, scale: f32) -> Result<Self, ConvertError> {
        let w = (page_width as f64 * scale as f64).floor();
        let h = (page_height as f64 * scale as f64).floor();

        if !w.is_finite() || !h.is_finite() {
            return Err(ConvertError::compositing(
                Step::Render,
                format!("non-finite viewport for page {page_width}x{page_height} at scale {scale}"),
            ));
        }
        if w < 1.0 || h < 1.0 || w > MAX_AXIS_PX as f64 || h > MAX_AXIS_PX as f64 {
            return Err(ConvertError::compositing(
                Step::Render,
                format!("viewport {w}x{h} is out of range"),
            ));
        }

        Ok(Self {
            width: w as u32,
            height: h as u32,
        })
    }
}

/// A sub-rectangle of a source surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The maximal centered sub-rectangle of `source` with the aspect ratio of
/// `target`.
///
/// A source relatively wider than the target keeps its full height and loses
/// width; otherwise it keeps its full width and loses height. Only cropping
/// happens here, so the later scale step never distorts.
pub fn center_crop(source: (u32, u32), target: (u32, u32)) -> Result<CropBox, ConvertError> {
    let (sw, sh) = source;
    let (tw, th) = target;
    if sw == 0 || sh == 0 || tw == 0 || th == 0 {
        return Err(ConvertError::compositing(
            Step::Crop,
            format!("cannot crop {sw}x{sh} to aspect of {tw}x{th}"),
        ));
    }

    let (swf, shf) = (sw as f64, sh as f64);
    let target_ratio = tw as f64 / th as f64;
    let source_ratio = swf / shf;

    let (crop_w, crop_h) = if source_ratio > target_ratio {
        (shf * target_ratio, shf)
    } else {
        (swf, swf / target_ratio)
    };
    let crop_w = crop_w.round();
    let crop_h = crop_h.round();

    if !crop_w.is_finite() || !crop_h.is_finite() {
        return Err(ConvertError::compositing(
            Step::Crop,
            format!("non-finite crop {crop_w}x{crop_h}"),
        ));
    }

    let crop_w = crop_w.clamp(1.0, swf);
    let crop_h = crop_h.clamp(1.0, shf);
    let x = ((swf - crop_w) / 2.0).round();
    let y = ((shf - crop_h) / 2.0).round();

    Ok(CropBox {
        x: x as u32,
        y: y as u32,
        width: crop_w as u32,
        height: crop_h as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_sizes_at_300_dpi() {
        assert_eq!(mm_to_px(35.0, PHOTO_DPI), 413);
        assert_eq!(mm_to_px(45.0, PHOTO_DPI), 531);
        assert_eq!(mm_to_px(50.0, PHOTO_DPI), 591);
        assert_eq!(mm_to_px(60.0, PHOTO_DPI), 709);
    }

    #[test]
    fn letter_page_viewports() {
        assert_eq!(
            Viewport::at_scale(612.0, 792.0, 2.0).unwrap(),
            Viewport {
                width: 1224,
                height: 1584
            }
        );
        assert_eq!(
            Viewport::at_scale(612.0, 792.0, 1.5).unwrap(),
            Viewport {
                width: 918,
                height: 1188
            }
        );
    }

    #[test]
    fn viewport_floors() {
        // A4 in points: 595.28 x 841.89
        let vp = Viewport::at_scale(595.28, 841.89, 2.0).unwrap();
        assert_eq!((vp.width, vp.height), (1190, 1683));
    }

    #[test]
    fn viewport_rejects_degenerate() {
        assert!(Viewport::at_scale(612.0, 792.0, 0.0001).is_err());
        assert!(Viewport::at_scale(f32::NAN, 792.0, 1.0).is_err());
        assert!(Viewport::at_scale(612.0, 792.0, f32::INFINITY).is_err());
    }

    #[test]
    fn viewport_beyond_signed_range_is_compositing_error() {
        let err = Viewport::at_scale(612.0, 792.0, 5e6).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Compositing {
                step: Step::Render,
                ..
            }
        ));

        let widest = Viewport::at_scale(1.0, 1.0, MAX_AXIS_PX as f32 / 2.0).unwrap();
        assert!(widest.width as i64 <= i32::MAX as i64);
    }

    #[test]
    fn landscape_photo_crops_width() {
        let crop = center_crop((4000, 3000), (413, 531)).unwrap();
        assert_eq!(crop.height, 3000);
        assert_eq!(crop.width, 2333);
        assert_eq!(crop.x, 834);
        assert_eq!(crop.y, 0);
    }

    #[test]
    fn tall_photo_crops_height() {
        let crop = center_crop((1000, 3000), (413, 531)).unwrap();
        assert_eq!(crop.width, 1000);
        assert_eq!(crop.height, 1286); // round(1000 / (413/531)) = round(1285.71)
        assert_eq!(crop.x, 0);
        assert_eq!(crop.y, 857); // round((3000 - 1286) / 2)
    }

    #[test]
    fn exact_ratio_is_untouched() {
        let crop = center_crop((826, 1062), (413, 531)).unwrap();
        assert_eq!(
            crop,
            CropBox {
                x: 0,
                y: 0,
                width: 826,
                height: 1062
            }
        );
    }

    #[test]
    fn crop_preserves_ratio_and_bounds() {
        let targets = [(413u32, 531u32), (591, 709)];
        let sources = [(1u32, 1u32), (3, 7), (640, 480), (480, 640), (4032, 3024), (17, 999)];
        for &(tw, th) in &targets {
            let r = tw as f64 / th as f64;
            for &(sw, sh) in &sources {
                let c = center_crop((sw, sh), (tw, th)).unwrap();
                assert!(c.width >= 1 && c.height >= 1);
                assert!(c.width <= sw && c.height <= sh, "{c:?} exceeds {sw}x{sh}");
                assert!(c.x + c.width <= sw && c.y + c.height <= sh);
                // Ratio within one pixel of rounding on the cropped axis.
                let expected_w = c.height as f64 * r;
                let expected_h = c.width as f64 / r;
                assert!(
                    (c.width as f64 - expected_w).abs() <= 1.0
                        || (c.height as f64 - expected_h).abs() <= 1.0,
                    "{c:?} for {sw}x{sh} -> {tw}x{th}"
                );
                let cx = (sw - c.width) as f64 / 2.0;
                let cy = (sh - c.height) as f64 / 2.0;
                assert!((c.x as f64 - cx).abs() <= 1.0);
                assert!((c.y as f64 - cy).abs() <= 1.0);
            }
        }
    }

    #[test]
    fn zero_sized_crop_is_error() {
        let err = center_crop((0, 10), (413, 531)).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Compositing {
                step: Step::Crop,
                ..
            }
        ));
    }
}
