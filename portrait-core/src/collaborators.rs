//! Black-box model contracts the pipeline depends on.
//!
//! Implementations wrap real networks (see [`crate::models`]) or, in tests,
//! return canned answers. All of them must be shareable across runs.

use std::{fmt, sync::Arc};

use anyhow::Result;
use ndarray::Array3;

use crate::types::{ConfidenceBuffer, FaceDetection, Landmark, PixelImage};

/// Person segmentation over a whole image.
pub trait PersonSegmenter: Send + Sync {
    /// One confidence per pixel, row-major, `width * height` long.
    fn segment(&self, image: &PixelImage) -> Result<ConfidenceBuffer>;
}

pub trait FaceDetector: Send + Sync {
    /// The first (most confident) face, if any.
    fn detect_first_face(&self, image: &PixelImage) -> Result<Option<FaceDetection>>;
}

pub trait FaceLandmarker: Send + Sync {
    /// Ordered, fixed-length landmark list normalised to `image`.
    fn detect_landmarks(&self, image: &PixelImage) -> Result<Option<Vec<Landmark>>>;
}

/// A super-resolution network applied one tile at a time.
pub trait SuperResolutionModel: Send + Sync {
    /// `tile` is `(tile_input, tile_input, 3)` RGB in `[0, 1]`; the result must be
    /// `(tile_output, tile_output, 3)`.
    fn infer(&self, tile: &Array3<f32>) -> Result<Array3<f32>>;
}

/// The models one pipeline run is allowed to call.
#[derive(Clone)]
pub struct Collaborators {
    pub face_detector: Arc<dyn FaceDetector>,
    pub segmenter: Arc<dyn PersonSegmenter>,
    pub landmarker: Arc<dyn FaceLandmarker>,
    /// Without it, upscaling is skipped even when requested.
    pub super_resolution: Option<Arc<dyn SuperResolutionModel>>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("super_resolution", &self.super_resolution.is_some())
            .finish_non_exhaustive()
    }
}
