use std::path::Path;

use anyhow::Result;
use log::debug;
use portrait_utils::{OnnxModelSettings, timing_guard};
use tract_onnx::prelude::Tensor;

use super::onnx::{OnnxRunner, TensorSpec, f32_data, image_tensor};
use crate::collaborators::FaceDetector;
use crate::types::{BoundingBox, FaceDetection, PixelImage};

const STRIDES: [usize; 3] = [8, 16, 32];
const OUTPUTS_PER_STRIDE: usize = 4; // cls, obj, bbox, kps
const ROW_LEN: usize = 15; // bbox (4) + landmarks (10) + score (1)

/// One decoded detector row in model-input pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RawFace {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    right_eye: (f32, f32),
    left_eye: (f32, f32),
    score: f32,
}

impl RawFace {
    fn from_row(row: &[f32]) -> Self {
        Self {
            x: row[0],
            y: row[1],
            w: row[2],
            h: row[3],
            right_eye: (row[4], row[5]),
            left_eye: (row[6], row[7]),
            score: row[14],
        }
    }
}

/// YuNet-style face detector.
///
/// Accepts graphs that emit either one fused `[N, 15]` tensor or the twelve
/// raw per-stride heads, which are decoded on the CPU.
#[derive(Debug)]
pub struct OnnxFaceDetector {
    runner: OnnxRunner,
    spec: TensorSpec,
    score_threshold: f32,
}

impl OnnxFaceDetector {
    pub fn load(settings: &OnnxModelSettings, path: &Path) -> Result<Self> {
        Ok(Self {
            runner: OnnxRunner::load("face detector", path)?,
            spec: TensorSpec::from_settings(settings).raw_bgr(),
            score_threshold: settings.score_threshold,
        })
    }

    fn rows(&self, outputs: Vec<Tensor>) -> Result<Vec<f32>> {
        match outputs.len() {
            1 => Ok(f32_data(&outputs[0], "detector")?.to_vec()),
            len if len == STRIDES.len() * OUTPUTS_PER_STRIDE => {
                decode_stride_heads(&outputs, self.spec.width as usize, self.spec.height as usize)
            }
            other => anyhow::bail!(
                "unexpected number of detector outputs: expected 1 or {}, got {}",
                STRIDES.len() * OUTPUTS_PER_STRIDE,
                other
            ),
        }
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect_first_face(&self, image: &PixelImage) -> Result<Option<FaceDetection>> {
        let _guard = timing_guard("portrait_core::models::face_detector", log::Level::Debug);
        let input = image_tensor(image, &self.spec)?;
        let rows = self.rows(self.runner.run(input)?)?;
        anyhow::ensure!(
            rows.len() % ROW_LEN == 0,
            "detector output length {} is not a multiple of {ROW_LEN}",
            rows.len()
        );

        let sx = image.width() as f32 / self.spec.width as f32;
        let sy = image.height() as f32 / self.spec.height as f32;
        let best = best_face(&rows, self.score_threshold);
        debug!(
            "{} candidate rows, best score {:?}",
            rows.len() / ROW_LEN,
            best.map(|face| face.score)
        );
        Ok(best.map(|face| to_detection(&face, sx, sy)))
    }
}

fn best_face(rows: &[f32], threshold: f32) -> Option<RawFace> {
    rows.chunks_exact(ROW_LEN)
        .map(RawFace::from_row)
        .filter(|face| face.score.is_finite() && face.score >= threshold && face.w > 0.0 && face.h > 0.0)
        .max_by(|a, b| a.score.total_cmp(&b.score))
}

/// Scale a model-space face back to the source image.
///
/// Rotation comes from the line between the eyes: level eyes give 0 and a
/// head tilted counter-clockwise (as seen in the image) gives a positive
/// angle.
fn to_detection(face: &RawFace, sx: f32, sy: f32) -> FaceDetection {
    let dx = (face.left_eye.0 - face.right_eye.0) * sx;
    let dy = (face.left_eye.1 - face.right_eye.1) * sy;
    let rotation_z = if dx == 0.0 && dy == 0.0 {
        0.0
    } else {
        -dy.atan2(dx).to_degrees()
    };
    FaceDetection {
        bbox: BoundingBox {
            x: face.x * sx,
            y: face.y * sy,
            width: face.w * sx,
            height: face.h * sy,
        },
        rotation_z,
        score: face.score,
    }
}

/// Turn the per-stride `cls`, `obj`, `bbox` and `kps` heads into fused rows.
fn decode_stride_heads(outputs: &[Tensor], input_w: usize, input_h: usize) -> Result<Vec<f32>> {
    let pad_w = input_w.div_ceil(32) * 32;
    let pad_h = input_h.div_ceil(32) * 32;
    let mut fused = Vec::new();

    for (index, &stride) in STRIDES.iter().enumerate() {
        let (cols, rows) = (pad_w / stride, pad_h / stride);
        let cells = cols * rows;
        let cls = f32_data(&outputs[index], "cls")?;
        let obj = f32_data(&outputs[index + STRIDES.len()], "obj")?;
        let bbox = f32_data(&outputs[index + STRIDES.len() * 2], "bbox")?;
        let kps = f32_data(&outputs[index + STRIDES.len() * 3], "kps")?;
        anyhow::ensure!(
            cls.len() == cells && obj.len() == cells && bbox.len() == cells * 4 && kps.len() == cells * 10,
            "stride {stride} heads do not match a {cols}x{rows} grid"
        );

        let s = stride as f32;
        for cell in 0..cells {
            let (col, row) = ((cell % cols) as f32, (cell / cols) as f32);
            let score = (cls[cell].clamp(0.0, 1.0) * obj[cell].clamp(0.0, 1.0)).sqrt();
            let b = &bbox[cell * 4..cell * 4 + 4];
            let (cx, cy) = ((col + b[0]) * s, (row + b[1]) * s);
            let (w, h) = (b[2].exp() * s, b[3].exp() * s);
            fused.extend_from_slice(&[cx - w * 0.5, cy - h * 0.5, w, h]);
            for point in kps[cell * 10..cell * 10 + 10].chunks_exact(2) {
                fused.push((point[0] + col) * s);
                fused.push((point[1] + row) * s);
            }
            fused.push(if score.is_finite() { score } else { 0.0 });
        }
    }
    Ok(fused)
}
