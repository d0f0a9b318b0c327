//! Input and output value types shared by both pipelines.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// What a [`SourceDocument`]'s bytes claim to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Pdf,
    RasterImage,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Pdf => f.write_str("PDF"),
            MediaKind::RasterImage => f.write_str("raster image"),
        }
    }
}

/// Raw bytes of a user-supplied file plus the kind they were declared as.
///
/// Cloning is cheap: the buffer is shared, never copied or mutated.
#[derive(Clone)]
pub struct SourceDocument {
    bytes: Arc<[u8]>,
    kind: MediaKind,
}

impl SourceDocument {
    pub fn new(bytes: impl Into<Vec<u8>>, kind: MediaKind) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
            kind,
        }
    }

    pub fn pdf(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(bytes, MediaKind::Pdf)
    }

    pub fn image(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(bytes, MediaKind::RasterImage)
    }

    /// Declare the kind from the content itself.
    ///
    /// `%PDF` magic selects [`MediaKind::Pdf`]; anything the `image` crate
    /// recognises is a raster image. Everything else is a decode error.
    pub fn sniff(bytes: impl Into<Vec<u8>>) -> Result<Self, ConvertError> {
        let bytes = bytes.into();
        let kind = sniff_kind(&bytes)?;
        Ok(Self::new(bytes, kind))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Fail with a decode error unless this document was declared as `expected`.
    pub(crate) fn require_kind(&self, expected: MediaKind) -> Result<(), ConvertError> {
        if self.kind != expected {
            return Err(ConvertError::Decode {
                kind: expected,
                detail: format!("document was declared as {}", self.kind),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDocument")
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn sniff_kind(bytes: &[u8]) -> Result<MediaKind, ConvertError> {
    if bytes.starts_with(b"%PDF") {
        return Ok(MediaKind::Pdf);
    }
    match image::guess_format(bytes) {
        Ok(_) => Ok(MediaKind::RasterImage),
        Err(e) => {
            let mut magic = [0u8; 4];
            let n = bytes.len().min(4);
            magic[..n].copy_from_slice(&bytes[..n]);
            Err(ConvertError::Decode {
                kind: MediaKind::RasterImage,
                detail: format!("unrecognised file type (first bytes: {magic:?}): {e}"),
            })
        }
    }
}

/// The terminal artifact of either pipeline: a JPEG buffer and its size.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// JPEG-encoded bytes. Never empty on success.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub source_kind: MediaKind,
}

impl ConversionOutput {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ConversionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionOutput")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("source_kind", &self.source_kind)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    #[test]
    fn sniff_pdf_magic() {
        let doc = SourceDocument::sniff(b"%PDF-1.4\n%...".to_vec()).unwrap();
        assert_eq!(doc.kind(), MediaKind::Pdf);
    }

    #[test]
    fn sniff_png() {
        let img = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        let doc = SourceDocument::sniff(buf).unwrap();
        assert_eq!(doc.kind(), MediaKind::RasterImage);
    }

    #[test]
    fn sniff_garbage_is_decode_error() {
        let err = SourceDocument::sniff(b"hello world".to_vec()).unwrap_err();
        assert!(matches!(err, ConvertError::Decode { .. }));
    }

    #[test]
    fn require_kind_mismatch() {
        let doc = SourceDocument::image(vec![0u8; 8]);
        let err = doc.require_kind(MediaKind::Pdf).unwrap_err();
        assert!(err.to_string().contains("declared as raster image"));
    }
}
