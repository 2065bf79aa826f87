//! ONNX-backed implementations of the collaborator traits and the registry
//! that loads them on demand.

mod detector;
mod landmarker;
mod onnx;
mod segmenter;
mod slot;
mod super_resolution;

pub use detector::OnnxFaceDetector;
pub use landmarker::OnnxLandmarker;
pub use onnx::{OnnxRunner, TensorSpec, image_tensor};
pub use segmenter::OnnxSegmenter;
pub use slot::ModelSlot;
pub use super_resolution::OnnxSuperResolution;

use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use log::warn;
use portrait_utils::{ModelSettings, OnnxModelSettings};

use crate::collaborators::{
    Collaborators, FaceDetector, FaceLandmarker, PersonSegmenter, SuperResolutionModel,
};

/// Lazily loaded models, one slot per collaborator.
///
/// Create one per process and pass it to whoever builds pipelines; models are
/// loaded on first use and shared by every later run.
pub struct ModelRegistry {
    face_detector: ModelSlot<dyn FaceDetector>,
    segmenter: ModelSlot<dyn PersonSegmenter>,
    landmarker: ModelSlot<dyn FaceLandmarker>,
    super_resolution: ModelSlot<dyn SuperResolutionModel>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("loaded", &self.loaded())
            .finish()
    }
}

fn model_path(settings: &OnnxModelSettings, label: &str) -> Result<PathBuf> {
    let path = settings
        .path
        .as_deref()
        .with_context(|| format!("no {label} model configured"))?;
    Ok(PathBuf::from(path))
}

impl ModelRegistry {
    pub const fn new() -> Self {
        Self {
            face_detector: ModelSlot::new("face detector"),
            segmenter: ModelSlot::new("segmenter"),
            landmarker: ModelSlot::new("landmarker"),
            super_resolution: ModelSlot::new("super resolution"),
        }
    }

    /// Load (or reuse) every model and bundle them for a pipeline run.
    ///
    /// The detector, segmenter and landmarker are required. A super-resolution
    /// model that is unconfigured or fails to load only disables upscaling.
    pub fn collaborators(&self, settings: &ModelSettings) -> Result<Collaborators> {
        let face_detector = self.face_detector.get_or_init(|| {
            let cfg = &settings.face_detector;
            let model = OnnxFaceDetector::load(cfg, &model_path(cfg, "face detector")?)?;
            Ok(Arc::new(model) as Arc<dyn FaceDetector>)
        })?;
        let segmenter = self.segmenter.get_or_init(|| {
            let cfg = &settings.segmenter;
            let model = OnnxSegmenter::load(cfg, &model_path(cfg, "segmenter")?)?;
            Ok(Arc::new(model) as Arc<dyn PersonSegmenter>)
        })?;
        let landmarker = self.landmarker.get_or_init(|| {
            let cfg = &settings.landmarker;
            let model = OnnxLandmarker::load(cfg, &model_path(cfg, "landmarker")?)?;
            Ok(Arc::new(model) as Arc<dyn FaceLandmarker>)
        })?;

        let super_resolution = if settings.super_resolution.path.is_some() {
            self.super_resolution
                .get_or_init(|| {
                    let cfg = &settings.super_resolution;
                    let model =
                        OnnxSuperResolution::load(cfg, &model_path(cfg, "super resolution")?)?;
                    Ok(Arc::new(model) as Arc<dyn SuperResolutionModel>)
                })
                .map_err(|err| warn!("upscaling disabled: {err:#}"))
                .ok()
        } else {
            None
        };

        Ok(Collaborators {
            face_detector,
            segmenter,
            landmarker,
            super_resolution,
        })
    }

    /// Names of the models currently held.
    pub fn loaded(&self) -> Vec<&'static str> {
        [
            (self.face_detector.name(), self.face_detector.is_loaded()),
            (self.segmenter.name(), self.segmenter.is_loaded()),
            (self.landmarker.name(), self.landmarker.is_loaded()),
            (self.super_resolution.name(), self.super_resolution.is_loaded()),
        ]
        .into_iter()
        .filter_map(|(name, loaded)| loaded.then_some(name))
        .collect()
    }

    /// Drop every cached model; the next `collaborators` call reloads them.
    pub fn release_all(&self) {
        self.face_detector.release();
        self.segmenter.release();
        self.landmarker.release();
        self.super_resolution.release();
    }
}
