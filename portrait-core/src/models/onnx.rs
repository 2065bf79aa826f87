use std::{fmt::Write, path::Path};

use anyhow::{Context, Result};
use image::RgbaImage;
use log::{debug, warn};
use portrait_utils::{OnnxModelSettings, TensorLayout, resize_rgba};
use tract_onnx::prelude::{
    Framework, Graph, InferenceModelExt, IntoTensor, SimplePlan, Tensor, TypedFact, TypedOp, tvec,
};

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// How pixel values are written into an input tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TensorSpec {
    pub width: u32,
    pub height: u32,
    pub layout: TensorLayout,
    /// Divide by 255 so values land in `[0, 1]`; otherwise keep raw 0..=255.
    pub unit_range: bool,
    /// Write channels as B, G, R.
    pub bgr: bool,
}

impl TensorSpec {
    /// RGB in `[0, 1]` at the model's configured size and layout.
    pub fn from_settings(settings: &OnnxModelSettings) -> Self {
        Self {
            width: settings.input_width,
            height: settings.input_height,
            layout: settings.layout,
            unit_range: true,
            bgr: false,
        }
    }

    pub fn raw_bgr(mut self) -> Self {
        self.unit_range = false;
        self.bgr = true;
        self
    }

    fn shape(&self) -> [usize; 4] {
        let (w, h) = (self.width as usize, self.height as usize);
        match self.layout {
            TensorLayout::Nhwc => [1, h, w, 3],
            TensorLayout::Nchw => [1, 3, h, w],
        }
    }
}

/// Resize `image` to `spec` and pack it as a batch-of-one f32 tensor.
pub fn image_tensor(image: &RgbaImage, spec: &TensorSpec) -> Result<Tensor> {
    anyhow::ensure!(
        spec.width > 0 && spec.height > 0,
        "model input size must be non-zero"
    );
    let resized = resize_rgba(image, spec.width, spec.height);
    let (w, h) = (spec.width as usize, spec.height as usize);
    let scale = if spec.unit_range { 1.0 / 255.0 } else { 1.0 };
    let order: [usize; 3] = if spec.bgr { [2, 1, 0] } else { [0, 1, 2] };

    let mut data = vec![0f32; w * h * 3];
    for (x, y, px) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for (slot, &channel) in order.iter().enumerate() {
            let index = match spec.layout {
                TensorLayout::Nhwc => (y * w + x) * 3 + slot,
                TensorLayout::Nchw => slot * w * h + y * w + x,
            };
            data[index] = px[channel] as f32 * scale;
        }
    }
    Tensor::from_shape(&spec.shape(), &data)
        .map_err(|e| anyhow::anyhow!("failed to build input tensor: {e}"))
}

/// A loaded, runnable ONNX graph shared by the model adapters.
#[derive(Debug)]
pub struct OnnxRunner {
    runnable: RunnableModel,
    label: &'static str,
}

impl OnnxRunner {
    /// Parse and optimize the graph, falling back to a decluttered plan when
    /// optimization fails.
    pub fn load<P: AsRef<Path>>(label: &'static str, model_path: P) -> Result<Self> {
        let path = model_path.as_ref();
        anyhow::ensure!(
            path.exists(),
            "{label} model file not found: {}",
            path.display()
        );

        let runnable = match load_runnable_model(label, path, true) {
            Ok(model) => {
                debug!("{label} model {} optimized successfully", path.display());
                model
            }
            Err(opt_err) => {
                let optimize_msg = format!("{opt_err}");
                let mut chain_msg = String::new();
                for cause in opt_err.chain() {
                    let _ = writeln!(&mut chain_msg, "  - {cause}");
                }
                warn!(
                    "{label} model {} failed optimized load ({optimize_msg}); falling back to decluttered graph.\nError chain:\n{}",
                    path.display(),
                    chain_msg.trim_end()
                );
                let decluttered = load_runnable_model(label, path, false).with_context(|| {
                    format!("fallback to decluttered {label} graph failed after optimize error: {optimize_msg}")
                })?;
                debug!("{label} model {} running in decluttered mode", path.display());
                decluttered
            }
        };

        Ok(Self { runnable, label })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Run one input and return every output as an owned tensor.
    pub fn run(&self, input: Tensor) -> Result<Vec<Tensor>> {
        let outputs = self
            .runnable
            .run(tvec![input.into()])
            .map_err(|e| anyhow::anyhow!("{} execution failed: {e}", self.label))?;
        let tensors: Vec<Tensor> = outputs
            .into_iter()
            .map(|value| value.into_tensor())
            .collect();
        anyhow::ensure!(!tensors.is_empty(), "{} model produced no outputs", self.label);
        Ok(tensors)
    }
}

fn load_runnable_model(label: &str, path: &Path, optimized: bool) -> Result<RunnableModel> {
    let model = tract_onnx::onnx()
        .model_for_path(path)
        .with_context(|| format!("failed to parse ONNX graph from {}", path.display()))?;

    if optimized {
        model
            .into_optimized()
            .map_err(|e| anyhow::anyhow!("unable to optimize {label} graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make {label} graph runnable: {e}"))
    } else {
        model
            .into_typed()
            .map_err(|e| anyhow::anyhow!("unable to type-check {label} graph: {e}"))?
            .into_decluttered()
            .map_err(|e| anyhow::anyhow!("unable to declutter {label} graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make {label} graph runnable: {e}"))
    }
}

/// Borrow a tensor's data as `f32`.
pub(crate) fn f32_data<'a>(tensor: &'a Tensor, what: &str) -> Result<&'a [f32]> {
    tensor
        .as_slice::<f32>()
        .map_err(|e| anyhow::anyhow!("{what} output not f32: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loading_missing_model_fails() {
        let err = OnnxRunner::load("segmenter", "missing.onnx").unwrap_err();
        assert!(format!("{err}").contains("not found"));
    }

    #[test]
    fn invalid_model_produces_useful_error() {
        let mut temp = NamedTempFile::new().expect("temp file");
        temp.write_all(b"not a real onnx file")
            .expect("write mock model");

        let err = OnnxRunner::load("landmarker", temp.path()).expect_err("invalid ONNX should fail");
        let message = format!("{err:#}");
        assert!(
            message.contains("failed to parse ONNX") || message.contains("unable to optimize"),
            "Unexpected error message: {message}"
        );
    }

    fn spec(layout: TensorLayout) -> TensorSpec {
        TensorSpec {
            width: 2,
            height: 1,
            layout,
            unit_range: true,
            bgr: false,
        }
    }

    fn two_pixels() -> RgbaImage {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([255, 0, 51, 255]));
        image.put_pixel(1, 0, Rgba([0, 102, 0, 255]));
        image
    }

    #[test]
    fn nhwc_tensor_interleaves_channels() {
        let tensor = image_tensor(&two_pixels(), &spec(TensorLayout::Nhwc)).unwrap();
        assert_eq!(tensor.shape(), &[1, 1, 2, 3]);
        let data = tensor.as_slice::<f32>().unwrap();
        let expected = [1.0, 0.0, 0.2, 0.0, 0.4, 0.0];
        for (got, want) in data.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "{data:?}");
        }
    }

    #[test]
    fn nchw_raw_bgr_tensor_is_planar() {
        let tensor = image_tensor(&two_pixels(), &spec(TensorLayout::Nchw).raw_bgr()).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 1, 2]);
        let data = tensor.as_slice::<f32>().unwrap();
        // B plane, G plane, R plane.
        assert_eq!(data, &[51.0, 0.0, 0.0, 102.0, 255.0, 0.0]);
    }

    #[test]
    fn zero_sized_spec_is_rejected() {
        let mut bad = spec(TensorLayout::Nhwc);
        bad.width = 0;
        assert!(image_tensor(&two_pixels(), &bad).is_err());
    }
}
