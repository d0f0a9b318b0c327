//! Raster image decoding.

use crate::document::{MediaKind, SourceDocument};
use crate::error::{ConvertError, Step};
use crate::surface::RasterSurface;
use tracing::debug;

/// Decode a raster-image document to an RGBA surface at native resolution.
pub fn decode_raster(doc: &SourceDocument) -> Result<RasterSurface, ConvertError> {
    doc.require_kind(MediaKind::RasterImage)?;

    let image = image::load_from_memory(doc.bytes()).map_err(|e| ConvertError::Decode {
        kind: MediaKind::RasterImage,
        detail: e.to_string(),
    })?;

    debug!("Decoded image → {}x{} px", image.width(), image.height());
    RasterSurface::from_image(image, Step::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    #[test]
    fn decodes_png_at_native_size() {
        let img = RgbImage::from_pixel(7, 3, Rgb([9, 9, 9]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        let surface = decode_raster(&SourceDocument::image(buf)).unwrap();
        assert_eq!(surface.dimensions(), (7, 3));
        assert_eq!(surface.as_rgba().get_pixel(0, 0).0, [9, 9, 9, 255]);
    }

    #[test]
    fn truncated_bytes_fail_to_decode() {
        let err = decode_raster(&SourceDocument::image(vec![0x89, b'P', b'N', b'G'])).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Decode {
                kind: MediaKind::RasterImage,
                ..
            }
        ));
    }

    #[test]
    fn pdf_declared_document_is_rejected() {
        let err = decode_raster(&SourceDocument::pdf(b"%PDF-1.4".to_vec())).unwrap_err();
        assert_eq!(err.step(), Step::Decode);
    }
}
