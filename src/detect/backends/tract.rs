#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, DetectionCandidate};
use crate::frame::Frame;

/// Values per detection row in an SSD `DetectionOutput` tensor:
/// `(image_id, label, confidence, x1, y1, x2, y2)`.
const SSD_ROW_LEN: usize = 7;

/// Tract-based backend for ONNX SSD face detectors.
///
/// Expects a single-input model taking `[1, 3, size, size]` BGR floats with
/// per-channel mean subtraction (the res10 300x300 family) and producing a
/// `[1, 1, N, 7]` detection tensor with normalized box coordinates.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_size: u32,
    mean_bgr: [f32; 3],
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32, mean_bgr: [f32; 3]) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::info!(
            "TractBackend: loaded {} ({}x{} input)",
            model_path.display(),
            input_size,
            input_size
        );

        Ok(Self {
            model,
            input_size,
            mean_bgr,
        })
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let side = self.input_size;
        let resized = imageops::resize(frame.image(), side, side, FilterType::Triangle);
        let mean = self.mean_bgr;
        tract_ndarray::Array4::from_shape_fn(
            (1, 3, side as usize, side as usize),
            |(_, channel, y, x)| {
                // Model channels are BGR; image channels are RGB.
                let rgb = resized.get_pixel(x as u32, y as u32).0;
                rgb[2 - channel] as f32 - mean[channel]
            },
        )
        .into_tensor()
    }

    fn extract_candidates(
        &self,
        outputs: TVec<TValue>,
        width: u32,
        height: u32,
    ) -> Result<Vec<DetectionCandidate>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let rows = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let values = rows
            .as_slice()
            .ok_or_else(|| anyhow!("model output tensor is not contiguous"))?;
        if values.len() % SSD_ROW_LEN != 0 {
            return Err(anyhow!(
                "model output has {} values, not a multiple of {}",
                values.len(),
                SSD_ROW_LEN
            ));
        }

        Ok(values
            .chunks_exact(SSD_ROW_LEN)
            .map(|row| {
                DetectionCandidate::new(
                    row[2] as f64,
                    BoundingBox::from_normalized([row[3], row[4], row[5], row[6]], width, height),
                )
            })
            .collect())
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<DetectionCandidate>> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.extract_candidates(outputs, frame.width(), frame.height())
    }
}
