use std::path::Path;

use anyhow::Result;
use log::debug;
use portrait_utils::{OnnxModelSettings, timing_guard};

use super::onnx::{OnnxRunner, TensorSpec, f32_data, image_tensor};
use crate::collaborators::FaceLandmarker;
use crate::landmarks::FACE_MESH_POINTS;
use crate::types::{Landmark, PixelImage};

/// Face-mesh network returning 478 `(x, y, z)` points in input pixels.
///
/// A second single-value output, when present, is a face presence logit;
/// faces scoring below the configured threshold are reported as missing.
#[derive(Debug)]
pub struct OnnxLandmarker {
    runner: OnnxRunner,
    spec: TensorSpec,
    presence_threshold: f32,
}

impl OnnxLandmarker {
    pub fn load(settings: &OnnxModelSettings, path: &Path) -> Result<Self> {
        Ok(Self {
            runner: OnnxRunner::load("landmarker", path)?,
            spec: TensorSpec::from_settings(settings),
            presence_threshold: settings.score_threshold,
        })
    }
}

impl FaceLandmarker for OnnxLandmarker {
    fn detect_landmarks(&self, image: &PixelImage) -> Result<Option<Vec<Landmark>>> {
        let _guard = timing_guard("portrait_core::models::landmarker", log::Level::Debug);
        let input = image_tensor(image, &self.spec)?;
        let outputs = self.runner.run(input)?;

        if let Some(presence) = outputs.get(1) {
            let logits = f32_data(presence, "presence")?;
            if let [logit] = logits {
                let score = sigmoid(*logit);
                if score < self.presence_threshold {
                    debug!("face presence {score:.3} below {:.3}", self.presence_threshold);
                    return Ok(None);
                }
            }
        }

        let coords = f32_data(&outputs[0], "landmarks")?;
        Ok(normalize_mesh(coords, self.spec.width as f32, self.spec.height as f32))
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Keep the first 478 `(x, y)` pairs of an `x, y, z` stream, scaled to `[0, 1]`.
fn normalize_mesh(coords: &[f32], input_width: f32, input_height: f32) -> Option<Vec<Landmark>> {
    if coords.len() < FACE_MESH_POINTS * 3 {
        debug!("landmark output too short: {} values", coords.len());
        return None;
    }
    Some(
        coords
            .chunks_exact(3)
            .take(FACE_MESH_POINTS)
            .map(|p| Landmark::new(p[0] / input_width, p[1] / input_height))
            .collect(),
    )
}
