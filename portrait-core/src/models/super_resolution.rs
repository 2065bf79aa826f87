use std::path::Path;

use anyhow::Result;
use ndarray::Array3;
use portrait_utils::{OnnxModelSettings, TensorLayout};
use tract_onnx::prelude::Tensor;

use super::onnx::{OnnxRunner, f32_data};
use crate::collaborators::SuperResolutionModel;

/// ESRGAN-style network run on fixed-size RGB tiles in `[0, 1]`.
#[derive(Debug)]
pub struct OnnxSuperResolution {
    runner: OnnxRunner,
    layout: TensorLayout,
}

impl OnnxSuperResolution {
    pub fn load(settings: &OnnxModelSettings, path: &Path) -> Result<Self> {
        Ok(Self {
            runner: OnnxRunner::load("super resolution", path)?,
            layout: settings.layout,
        })
    }
}

impl SuperResolutionModel for OnnxSuperResolution {
    fn infer(&self, tile: &Array3<f32>) -> Result<Array3<f32>> {
        let input = tile_to_tensor(tile, self.layout)?;
        let outputs = self.runner.run(input)?;
        tensor_to_tile(outputs[0].shape(), f32_data(&outputs[0], "super resolution")?, self.layout)
    }
}

fn tile_to_tensor(tile: &Array3<f32>, layout: TensorLayout) -> Result<Tensor> {
    let (h, w, c) = tile.dim();
    anyhow::ensure!(c == 3, "expected an RGB tile, got {c} channels");
    let data: Vec<f32> = match layout {
        TensorLayout::Nhwc => tile.iter().copied().collect(),
        TensorLayout::Nchw => tile.view().permuted_axes([2, 0, 1]).iter().copied().collect(),
    };
    let shape = match layout {
        TensorLayout::Nhwc => [1, h, w, 3],
        TensorLayout::Nchw => [1, 3, h, w],
    };
    Tensor::from_shape(&shape, &data).map_err(|e| anyhow::anyhow!("failed to build tile tensor: {e}"))
}

fn tensor_to_tile(shape: &[usize], data: &[f32], layout: TensorLayout) -> Result<Array3<f32>> {
    let (h, w) = match (layout, shape) {
        (TensorLayout::Nhwc, [1, h, w, 3]) => (*h, *w),
        (TensorLayout::Nchw, [1, 3, h, w]) => (*h, *w),
        _ => anyhow::bail!("unexpected super resolution output shape {shape:?} for {layout}"),
    };
    anyhow::ensure!(data.len() == h * w * 3, "super resolution output is truncated");
    Ok(match layout {
        TensorLayout::Nhwc => Array3::from_shape_fn((h, w, 3), |(y, x, c)| data[(y * w + x) * 3 + c]),
        TensorLayout::Nchw => Array3::from_shape_fn((h, w, 3), |(y, x, c)| data[c * h * w + y * w + x]),
    })
}
