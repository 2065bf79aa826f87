use std::path::Path;

use anyhow::Result;
use portrait_utils::{OnnxModelSettings, TensorLayout, confidence_to_size, timing_guard};

use super::onnx::{OnnxRunner, TensorSpec, f32_data, image_tensor};
use crate::collaborators::PersonSegmenter;
use crate::types::{ConfidenceBuffer, PixelImage};

/// Selfie segmentation network producing per-pixel person confidence.
///
/// Single-channel outputs are read as person probability. Multi-class outputs
/// treat channel 0 as background, so confidence is `1 - background`.
#[derive(Debug)]
pub struct OnnxSegmenter {
    runner: OnnxRunner,
    spec: TensorSpec,
}

impl OnnxSegmenter {
    pub fn load(settings: &OnnxModelSettings, path: &Path) -> Result<Self> {
        Ok(Self {
            runner: OnnxRunner::load("segmenter", path)?,
            spec: TensorSpec::from_settings(settings),
        })
    }
}

impl PersonSegmenter for OnnxSegmenter {
    fn segment(&self, image: &PixelImage) -> Result<ConfidenceBuffer> {
        let _guard = timing_guard("portrait_core::models::segmenter", log::Level::Debug);
        let input = image_tensor(image, &self.spec)?;
        let outputs = self.runner.run(input)?;
        let output = &outputs[0];
        let (height, width, values) =
            person_confidence(output.shape(), f32_data(output, "segmenter")?, self.spec.layout)?;
        let resized = confidence_to_size(values, width, height, image.width(), image.height())?;
        Ok(ConfidenceBuffer::new(resized))
    }
}

/// Collapse a `[1, H, W, C]` / `[1, C, H, W]` (or 3-d without batch) output
/// to one person confidence per pixel.
fn person_confidence(
    shape: &[usize],
    data: &[f32],
    layout: TensorLayout,
) -> Result<(u32, u32, Vec<f32>)> {
    let dims: Vec<usize> = match shape {
        [1, rest @ ..] if rest.len() == 3 => rest.to_vec(),
        [a, b, c] => vec![*a, *b, *c],
        [h, w] => match layout {
            TensorLayout::Nhwc => vec![*h, *w, 1],
            TensorLayout::Nchw => vec![1, *h, *w],
        },
        other => anyhow::bail!("unexpected segmenter output shape {other:?}"),
    };
    let (h, w, c) = match layout {
        TensorLayout::Nhwc => (dims[0], dims[1], dims[2]),
        TensorLayout::Nchw => (dims[1], dims[2], dims[0]),
    };
    anyhow::ensure!(
        c > 0 && data.len() == h * w * c,
        "segmenter output has {} values for shape {shape:?}",
        data.len()
    );

    let at = |y: usize, x: usize, ch: usize| match layout {
        TensorLayout::Nhwc => data[(y * w + x) * c + ch],
        TensorLayout::Nchw => data[ch * h * w + y * w + x],
    };
    let mut values = Vec::with_capacity(h * w);
    for y in 0..h {
        for x in 0..w {
            let person = if c == 1 { at(y, x, 0) } else { 1.0 - at(y, x, 0) };
            values.push(person.clamp(0.0, 1.0));
        }
    }
    Ok((h as u32, w as u32, values))
}
