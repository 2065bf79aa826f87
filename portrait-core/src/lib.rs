//! Portrait enhancement core.
//!
//! Builds alpha masks for the face, eyes and hair of a portrait, filters and
//! blends those regions, restores the overall tone and optionally upscales
//! with a tiled super-resolution model. The models themselves are reached
//! through the traits in [`collaborators`]; [`models`] provides `tract-onnx`
//! implementations.

/// Confidence buffer to alpha mask conversion.
pub mod alpha_codec;
/// Mask-weighted compositing.
pub mod blend;
/// Model traits the pipeline depends on.
pub mod collaborators;
/// Polygon rasterization into masks.
pub mod contour;
pub mod error;
/// Face-mesh index sets and part masks.
pub mod landmarks;
/// Union, subtraction and region restriction of masks.
pub mod mask_compositor;
/// Face+hair, hair-tone and hair masks.
pub mod masks;
pub mod models;
/// The end-to-end enhancement run.
pub mod pipeline;
/// Writing a processed crop back into the full image.
pub mod recompose;
/// Feathering and dilation.
pub mod refine;
/// Face detection to head region.
pub mod region;
pub mod region_filter;
/// Background runs with supersession.
pub mod session;
/// Mean-based tone correction.
pub mod tone;
pub mod types;
/// Tiled super-resolution.
pub mod upscale;

pub use alpha_codec::{hard_alpha_mask, soft_alpha_mask};
pub use blend::{BlendStrategy, blend, blend_in_place};
pub use collaborators::{
    Collaborators, FaceDetector, FaceLandmarker, PersonSegmenter, SuperResolutionModel,
};
pub use contour::closed_contour_mask;
pub use error::{EnhanceError, MissKind};
pub use landmarks::{
    ear_line_region, eye_line_roll, eye_mask, face_contour_mask, part_mask,
};
pub use mask_compositor::{KeepRegion, intersect, restrict_to_region, subtract, union};
pub use masks::{
    PortraitMasks, face_and_hair_mask, face_and_hair_mask_within, hair_mask, hair_tone_mask,
};
pub use models::{ModelRegistry, ModelSlot};
pub use pipeline::{EnhanceOutcome, EnhanceStatus, PortraitEnhancer, UpscaleReport};
pub use recompose::blend_cropped_region_back;
pub use refine::{dilate, feather};
pub use region::{detect_face_with_hair_region, face_with_hair_region};
pub use region_filter::{apply_within_mask, filter_within_mask};
pub use session::{CancelToken, EnhancementSession, SessionMessage};
pub use tone::{match_tone_by_mean, match_tone_by_mean_masked};
pub use types::{
    AlphaMask, BoundingBox, ConfidenceBuffer, FaceDetection, Landmark, PixelImage, PixelPoint,
    RegionRect,
};
pub use upscale::{
    ScalePreset, TiledUpscaler, compute_scale_preset, compute_scale_preset_with_budget,
};

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
