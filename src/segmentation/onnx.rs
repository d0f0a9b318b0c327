//! Selfie-segmentation model run through ONNX Runtime.
//!
//! Expects a MediaPipe-style selfie segmenter exported to ONNX: one NHWC
//! float input in [0, 1] and one confidence output of shape `[1, H, W, 1]`
//! or `[1, H, W]`, 1.0 meaning "person".

use super::{SegmentationError, Segmenter};
use crate::surface::{ForegroundMask, RasterSurface};
use futures::future::BoxFuture;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use ndarray::Array4;
use ort::session::{Session, SessionOutputs};
use ort::value::TensorRef;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Which model export is loaded; decides the input resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    /// Square 256×256 input, best for portrait photos. (default)
    #[default]
    General,
    /// 256×144 input, faster, tuned for wide frames.
    Landscape,
}

impl ModelVariant {
    /// Model input size as (width, height).
    pub fn input_size(&self) -> (u32, u32) {
        match self {
            ModelVariant::General => (256, 256),
            ModelVariant::Landscape => (256, 144),
        }
    }
}

/// ONNX-backed [`Segmenter`].
pub struct OnnxSegmenter {
    session: Arc<Mutex<Session>>,
    variant: ModelVariant,
}

impl OnnxSegmenter {
    /// Load a model from disk.
    pub fn from_file<P: AsRef<Path>>(
        model_path: P,
        variant: ModelVariant,
    ) -> Result<Self, SegmentationError> {
        let model_path = model_path.as_ref();
        info!("Loading segmentation model from {:?}", model_path);

        let session = Session::builder()
            .map_err(|e| SegmentationError::Unavailable(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| SegmentationError::Unavailable(format!("{}: {e}", model_path.display())))?;

        debug!("Segmentation model loaded ({:?})", variant);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            variant,
        })
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }
}

impl Segmenter for OnnxSegmenter {
    fn name(&self) -> &str {
        match self.variant {
            ModelVariant::General => "onnx-selfie-general",
            ModelVariant::Landscape => "onnx-selfie-landscape",
        }
    }

    fn segment<'a>(
        &'a self,
        surface: &'a RasterSurface,
    ) -> BoxFuture<'a, Result<ForegroundMask, SegmentationError>> {
        let session = Arc::clone(&self.session);
        let variant = self.variant;
        let pixels = surface.as_rgba().clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || infer(&session, variant, &pixels))
                .await
                .map_err(|e| SegmentationError::Failed(format!("inference task panicked: {e}")))?
        })
    }
}

fn infer(
    session: &Mutex<Session>,
    variant: ModelVariant,
    pixels: &RgbaImage,
) -> Result<ForegroundMask, SegmentationError> {
    let (src_w, src_h) = pixels.dimensions();
    let (in_w, in_h) = variant.input_size();

    let resized = imageops::resize(pixels, in_w, in_h, FilterType::Triangle);
    let mut input = Array4::<f32>::zeros((1, in_h as usize, in_w as usize, 3));
    for (x, y, p) in resized.enumerate_pixels() {
        for c in 0..3 {
            input[[0, y as usize, x as usize, c]] = p[c] as f32 / 255.0;
        }
    }

    let mut session = session
        .lock()
        .map_err(|_| SegmentationError::Unavailable("model session poisoned".into()))?;

    let input_tensor = TensorRef::from_array_view(input.view())
        .map_err(|e| SegmentationError::Failed(e.to_string()))?;

    // Name first: `run` borrows the session mutably.
    let output_name = session.outputs[0].name.clone();

    let outputs: SessionOutputs = session
        .run(ort::inputs![input_tensor])
        .map_err(|e| SegmentationError::Failed(e.to_string()))?;

    let (shape, data) = outputs[output_name.as_str()]
        .try_extract_tensor::<f32>()
        .map_err(|e| SegmentationError::Failed(e.to_string()))?;

    let (out_h, out_w) = match shape.len() {
        3 => (shape[1] as u32, shape[2] as u32),
        4 => (shape[1] as u32, shape[2] as u32),
        _ => {
            return Err(SegmentationError::Failed(format!(
                "unexpected mask shape {:?}",
                shape.to_vec()
            )))
        }
    };

    let small = ForegroundMask::from_confidences(out_w, out_h, data).ok_or_else(|| {
        SegmentationError::Failed(format!(
            "mask has {} values, expected {}x{}",
            data.len(),
            out_w,
            out_h
        ))
    })?;

    let aligned = imageops::resize(small.as_gray(), src_w, src_h, FilterType::Triangle);
    debug!("Mask {}x{} → {}x{}", out_w, out_h, src_w, src_h);

    Ok(ForegroundMask::new(aligned))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_input_sizes() {
        assert_eq!(ModelVariant::General.input_size(), (256, 256));
        assert_eq!(ModelVariant::Landscape.input_size(), (256, 144));
    }

    #[test]
    fn missing_model_is_unavailable() {
        let err = OnnxSegmenter::from_file("/definitely/not/a/model.onnx", ModelVariant::General)
            .err()
            .expect("loading a missing file must fail");
        assert!(matches!(err, SegmentationError::Unavailable(_)));
    }
}
