//! Error types for the evrak-jpeg library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`]: **Fatal for one conversion**: a single pipeline call
//!   (rasterize or normalize) could not produce an output. Returned as
//!   `Err(ConvertError)` from [`crate::convert::rasterize_first_page`] and
//!   [`crate::convert::normalize_biometric_photo`].
//!
//! * [`SlotError`]: **Non-fatal for a batch**: one document slot failed but
//!   its siblings keep going. Stored inside [`crate::batch::SlotResult`] so
//!   callers can report each failure by slot, step, and kind.

use crate::document::MediaKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline step at which a conversion failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Decode,
    Render,
    Segment,
    Composite,
    Crop,
    Scale,
    Encode,
    /// Outside any pipeline step (config validation, engine binding, timeouts).
    Setup,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::Decode => "decode",
            Step::Render => "render",
            Step::Segment => "segment",
            Step::Composite => "composite",
            Step::Crop => "crop",
            Step::Scale => "scale",
            Step::Encode => "encode",
            Step::Setup => "setup",
        };
        f.write_str(s)
    }
}

/// Discriminant callers match on to pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Decode,
    SegmentationUnavailable,
    Compositing,
    Encode,
    InvalidConfig,
    EngineUnavailable,
    Timeout,
    Internal,
}

/// All errors a single conversion can end with.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The bytes are not a valid document of the declared kind.
    #[error("Could not decode {kind} input: {detail}")]
    Decode { kind: MediaKind, detail: String },

    // ── Segmentation errors ───────────────────────────────────────────────
    /// Whitening was requested but the segmentation model is missing or failed.
    #[error("Background segmentation unavailable: {reason}")]
    SegmentationUnavailable { reason: String },

    // ── Pixel pipeline errors ─────────────────────────────────────────────
    /// Mask stencil, crop, or scale step could not run on the computed geometry.
    #[error("Compositing failed during {step}: {detail}")]
    Compositing { step: Step, detail: String },

    /// The JPEG encoder did not produce a buffer.
    #[error("JPEG encoding failed: {detail}")]
    Encode { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or its directory).\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide; prebuilt binaries are published at\n\
    https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    pub(crate) fn compositing(step: Step, detail: impl Into<String>) -> Self {
        ConvertError::Compositing {
            step,
            detail: detail.into(),
        }
    }

    /// The pipeline step this error was raised in.
    pub fn step(&self) -> Step {
        match self {
            ConvertError::Decode { .. } => Step::Decode,
            ConvertError::SegmentationUnavailable { .. } => Step::Segment,
            ConvertError::Compositing { step, .. } => *step,
            ConvertError::Encode { .. } => Step::Encode,
            ConvertError::InvalidConfig(_)
            | ConvertError::PdfiumBindingFailed(_)
            | ConvertError::Internal(_) => Step::Setup,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::Decode { .. } => ErrorKind::Decode,
            ConvertError::SegmentationUnavailable { .. } => ErrorKind::SegmentationUnavailable,
            ConvertError::Compositing { .. } => ErrorKind::Compositing,
            ConvertError::Encode { .. } => ErrorKind::Encode,
            ConvertError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            ConvertError::PdfiumBindingFailed(_) => ErrorKind::EngineUnavailable,
            ConvertError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// A non-fatal error for a single document slot.
///
/// The batch continues past it; the presentation layer renders `message`
/// and can branch on `kind`.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("Slot '{slot}': {step} failed: {message}")]
pub struct SlotError {
    pub slot: String,
    pub step: Step,
    pub kind: ErrorKind,
    pub message: String,
}

impl SlotError {
    pub fn from_convert(slot: impl Into<String>, err: &ConvertError) -> Self {
        Self {
            slot: slot.into(),
            step: err.step(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn timeout(slot: impl Into<String>, secs: u64) -> Self {
        Self {
            slot: slot.into(),
            step: Step::Setup,
            kind: ErrorKind::Timeout,
            message: format!("conversion timed out after {secs}s"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_display_names_kind() {
        let e = ConvertError::Decode {
            kind: MediaKind::Pdf,
            detail: "bad xref".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("PDF"), "got: {msg}");
        assert!(msg.contains("bad xref"));
        assert_eq!(e.step(), Step::Decode);
        assert_eq!(e.kind(), ErrorKind::Decode);
    }

    #[test]
    fn compositing_reports_its_step() {
        let e = ConvertError::compositing(Step::Crop, "non-finite crop width");
        assert_eq!(e.step(), Step::Crop);
        assert!(e.to_string().contains("crop"));
    }

    #[test]
    fn segmentation_unavailable_kind() {
        let e = ConvertError::SegmentationUnavailable {
            reason: "no segmenter configured".into(),
        };
        assert_eq!(e.kind(), ErrorKind::SegmentationUnavailable);
        assert_eq!(e.step(), Step::Segment);
        assert_eq!(
            e.to_string(),
            "Background segmentation unavailable: no segmenter configured"
        );
    }

    #[test]
    fn slot_error_carries_context() {
        let e = ConvertError::Encode {
            detail: "empty buffer".into(),
        };
        let slot = SlotError::from_convert("diploma", &e);
        assert_eq!(slot.slot, "diploma");
        assert_eq!(slot.kind, ErrorKind::Encode);
        assert!(slot.to_string().contains("diploma"));
        assert!(slot.to_string().contains("encode"));
    }

    #[test]
    fn slot_error_serialises_snake_case() {
        let slot = SlotError::timeout("saglik_raporu", 30);
        let json = serde_json::to_string(&slot).unwrap();
        assert!(json.contains("\"kind\":\"timeout\""), "got: {json}");
        assert!(json.contains("\"step\":\"setup\""));
    }
}
