//! PDF rasterisation: render the first page to a surface via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is synchronous and
//! keeps thread-local state. `tokio::task::spawn_blocking` moves the work to
//! the blocking pool so async worker threads never stall on a large render.
//!
//! Only page index 0 is ever opened; later pages are never visited.

use crate::document::{MediaKind, SourceDocument};
use crate::engine;
use crate::error::{ConvertError, Step};
use crate::geometry::Viewport;
use crate::surface::RasterSurface;
use image::imageops::FilterType;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

/// Render page 1 of `doc` at `scale` into an opaque surface.
///
/// The surface is exactly `floor(width × scale) × floor(height × scale)`
/// pixels, where width/height are the page's intrinsic size in points.
pub async fn render_first_page(
    doc: &SourceDocument,
    scale: f32,
) -> Result<RasterSurface, ConvertError> {
    doc.require_kind(MediaKind::Pdf)?;
    let bytes = doc.shared_bytes();

    tokio::task::spawn_blocking(move || render_first_page_blocking(&bytes, scale))
        .await
        .map_err(|e| ConvertError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of first-page rendering.
fn render_first_page_blocking(bytes: &[u8], scale: f32) -> Result<RasterSurface, ConvertError> {
    let pdfium = engine::bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| pdf_decode_error(format!("{:?}", e)))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages == 0 {
        return Err(pdf_decode_error("document has no pages".to_string()));
    }
    info!("PDF loaded: {} pages, rendering page 1", total_pages);

    let page = pages
        .get(0)
        .map_err(|e| pdf_decode_error(format!("page 1: {:?}", e)))?;

    let viewport = Viewport::at_scale(page.width().value, page.height().value, scale)?;
    debug!(
        "Page 1 is {}x{} pt → viewport {}x{} px at scale {}",
        page.width().value,
        page.height().value,
        viewport.width,
        viewport.height,
        scale
    );

    let render_config = PdfRenderConfig::new()
        .set_target_width(viewport.width as i32)
        .set_target_height(viewport.height as i32)
        .set_clear_color(PdfColor::WHITE)
        .render_form_data(true)
        .render_annotations(true);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| pdf_decode_error(format!("rendering page 1: {:?}", e)))?;

    let image = bitmap.as_image();
    drop(bitmap);

    RasterSurface::from_image(fit_to_viewport(image, viewport), Step::Render)
}

/// Guarantee the rendered image is exactly the viewport size.
///
/// pdfium normally honours the target size; anything else is resampled so
/// the output always satisfies the floored-viewport rule.
pub(crate) fn fit_to_viewport(image: DynamicImage, viewport: Viewport) -> DynamicImage {
    if (image.width(), image.height()) == (viewport.width, viewport.height) {
        return image;
    }
    warn!(
        "pdfium returned {}x{}, resampling to viewport {}x{}",
        image.width(),
        image.height(),
        viewport.width,
        viewport.height
    );
    image.resize_exact(viewport.width, viewport.height, FilterType::CatmullRom)
}

fn pdf_decode_error(detail: String) -> ConvertError {
    ConvertError::Decode {
        kind: MediaKind::Pdf,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use image::{Rgba, RgbaImage};

    #[test]
    fn matching_render_is_passed_through() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(918, 1188, Rgba([9, 8, 7, 255])));
        let vp = Viewport::at_scale(612.0, 792.0, 1.5).unwrap();
        let out = fit_to_viewport(img.clone(), vp);
        assert_eq!(out, img);
    }

    #[test]
    fn off_by_one_render_is_resampled_to_viewport() {
        let vp = Viewport::at_scale(595.28, 841.89, 2.0).unwrap();
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1191, 1684, Rgba([255; 4])));
        let out = fit_to_viewport(img, vp);
        assert_eq!((out.width(), out.height()), (1190, 1683));

        let surface = RasterSurface::from_image(out, Step::Render).unwrap();
        assert_eq!(surface.dimensions(), (vp.width, vp.height));
    }

    #[tokio::test]
    async fn raster_document_is_rejected_before_binding() {
        let doc = SourceDocument::image(vec![0xFF, 0xD8, 0xFF]);
        let err = render_first_page(&doc, 2.0).await.unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Decode {
                kind: MediaKind::Pdf,
                ..
            }
        ));
    }
}
