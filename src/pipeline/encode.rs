//! JPEG encoding of the final surface.
//!
//! JPEG carries no alpha, so surfaces are flattened onto white first. The
//! caller-facing quality is a fraction in (0, 1]; the encoder takes 1–100.

use crate::error::ConvertError;
use crate::surface::RasterSurface;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use tracing::debug;

/// Map a (0, 1] quality fraction to the encoder's 1–100 scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    if !quality.is_finite() {
        return 92;
    }
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Flatten `surface` to opaque RGB and encode it.
///
/// The surface is consumed; its buffer is released before the encoded bytes
/// are returned.
pub fn encode_surface(surface: RasterSurface, quality: f32) -> Result<Vec<u8>, ConvertError> {
    let rgb = surface.flatten_onto_white();
    encode_jpeg(&rgb, quality)
}

/// Encode an opaque RGB buffer as JPEG.
pub fn encode_jpeg(rgb: &RgbImage, quality: f32) -> Result<Vec<u8>, ConvertError> {
    let q = jpeg_quality(quality);
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, q)
        .encode_image(rgb)
        .map_err(|e| ConvertError::Encode {
            detail: e.to_string(),
        })?;

    if buf.is_empty() {
        return Err(ConvertError::Encode {
            detail: "encoder produced an empty buffer".into(),
        });
    }

    debug!(
        "Encoded {}x{} JPEG (q={}) → {} bytes",
        rgb.width(),
        rgb.height(),
        q,
        buf.len()
    );
    Ok(buf)
}
