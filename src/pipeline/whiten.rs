//! Background whitening: stencil the subject with its mask, then fill
//! everything behind it with opaque white.

use crate::error::{ConvertError, Step};
use crate::segmentation::Segmenter;
use crate::surface::{over_white, ForegroundMask, RasterSurface};
use image::Rgba;
use std::sync::Arc;
use tracing::debug;

/// Ask `segmenter` for the foreground mask of `surface`.
///
/// A missing segmenter, a segmenter error, or a mask whose size differs from
/// the surface all end the conversion.
pub async fn fetch_mask(
    surface: &RasterSurface,
    segmenter: Option<&Arc<dyn Segmenter>>,
) -> Result<ForegroundMask, ConvertError> {
    let segmenter = segmenter.ok_or_else(|| ConvertError::SegmentationUnavailable {
        reason: "no segmentation model is configured".to_string(),
    })?;

    let mask = segmenter
        .segment(surface)
        .await
        .map_err(|e| ConvertError::SegmentationUnavailable {
            reason: format!("{}: {}", segmenter.name(), e),
        })?;

    if mask.dimensions() != surface.dimensions() {
        return Err(ConvertError::compositing(
            Step::Composite,
            format!(
                "mask is {}x{} but the image is {}x{}",
                mask.dimensions().0,
                mask.dimensions().1,
                surface.width(),
                surface.height()
            ),
        ));
    }

    debug!(
        "{} mask ready, {:.1}% foreground",
        segmenter.name(),
        mask.coverage() * 100.0
    );
    Ok(mask)
}

/// Keep `surface` where the mask is foreground and paint white elsewhere.
///
/// Source alpha is scaled by mask confidence, then the result is laid over
/// white. Every output pixel is fully opaque.
pub fn composite_on_white(
    surface: RasterSurface,
    mask: &ForegroundMask,
) -> Result<RasterSurface, ConvertError> {
    if mask.dimensions() != surface.dimensions() {
        return Err(ConvertError::compositing(
            Step::Composite,
            "mask and image sizes differ",
        ));
    }

    let mut pixels = surface.into_rgba();
    for (px, m) in pixels.pixels_mut().zip(mask.as_gray().pixels()) {
        let [r, g, b, a] = px.0;
        let kept = ((a as u32 * m.0[0] as u32 + 127) / 255) as u8;
        *px = Rgba([
            over_white(r, kept),
            over_white(g, kept),
            over_white(b, kept),
            255,
        ]);
    }

    RasterSurface::from_rgba(pixels, Step::Composite)
}

/// Segment `surface` and composite it onto white in one call.
pub async fn whiten_background(
    surface: RasterSurface,
    segmenter: Option<&Arc<dyn Segmenter>>,
) -> Result<RasterSurface, ConvertError> {
    let mask = fetch_mask(&surface, segmenter).await?;
    composite_on_white(surface, &mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::segmentation::{CheckerboardSegmenter, SegmentationError, UniformSegmenter};
    use futures::future::BoxFuture;
    use image::RgbaImage;

    fn gradient(w: u32, h: u32) -> RasterSurface {
        let img = RgbaImage::from_fn(w, h, |x, y| Rgba([(x * 30) as u8, (y * 50) as u8, 99, 255]));
        RasterSurface::from_rgba(img, Step::Decode).unwrap()
    }

    fn arc(s: impl Segmenter + 'static) -> Arc<dyn Segmenter> {
        Arc::new(s)
    }

    #[tokio::test]
    async fn full_foreground_is_identity_on_opaque_input() {
        let src = gradient(6, 4);
        let seg = arc(UniformSegmenter::foreground());
        let out = whiten_background(src.clone(), Some(&seg)).await.unwrap();
        assert_eq!(out, src);
    }

    #[tokio::test]
    async fn full_background_is_blank_white() {
        let seg = arc(UniformSegmenter::background());
        let out = whiten_background(gradient(6, 4), Some(&seg)).await.unwrap();
        assert!(out.as_rgba().pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[tokio::test]
    async fn checkerboard_mixes_source_and_white() {
        let src = gradient(4, 4);
        let seg = arc(CheckerboardSegmenter::new(2));
        let out = whiten_background(src.clone(), Some(&seg)).await.unwrap();
        assert_eq!(out.as_rgba().get_pixel(1, 1), src.as_rgba().get_pixel(1, 1));
        assert_eq!(out.as_rgba().get_pixel(3, 0).0, [255, 255, 255, 255]);
        assert_eq!(out.as_rgba().get_pixel(3, 3), src.as_rgba().get_pixel(3, 3));
    }

    #[tokio::test]
    async fn missing_segmenter_is_unavailable() {
        let err = whiten_background(gradient(2, 2), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SegmentationUnavailable);
    }

    struct WrongSize;

    impl Segmenter for WrongSize {
        fn name(&self) -> &str {
            "wrong-size"
        }

        fn segment<'a>(
            &'a self,
            _surface: &'a RasterSurface,
        ) -> BoxFuture<'a, Result<ForegroundMask, SegmentationError>> {
            Box::pin(async { Ok(ForegroundMask::uniform(1, 1, 255)) })
        }
    }

    #[tokio::test]
    async fn misaligned_mask_is_compositing_error() {
        let seg = arc(WrongSize);
        let err = whiten_background(gradient(3, 3), Some(&seg)).await.unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Compositing {
                step: Step::Composite,
                ..
            }
        ));
    }

    struct Broken;

    impl Segmenter for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn segment<'a>(
            &'a self,
            _surface: &'a RasterSurface,
        ) -> BoxFuture<'a, Result<ForegroundMask, SegmentationError>> {
            Box::pin(async { Err(SegmentationError::Unavailable("model file missing".into())) })
        }
    }

    #[tokio::test]
    async fn segmenter_failure_names_the_model() {
        let seg = arc(Broken);
        let err = whiten_background(gradient(3, 3), Some(&seg)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SegmentationUnavailable);
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn transparent_source_under_foreground_becomes_white() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        let src = RasterSurface::from_rgba(img, Step::Decode).unwrap();
        let out = composite_on_white(src, &ForegroundMask::uniform(2, 2, 255)).unwrap();
        assert!(out.as_rgba().pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }
}
