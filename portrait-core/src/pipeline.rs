//! End-to-end portrait enhancement.
//!
//! [`PortraitEnhancer::run`] locates the head, builds face, eye and optional
//! hair masks on the crop, filters and blends each region, restores the
//! overall tone, optionally upscales, and writes the crop back into the
//! source image through the person mask. Any miss or model failure leaves the
//! source image untouched and is reported in [`EnhanceStatus`]; nothing in
//! here panics or returns an error to the caller.

use std::fmt;

use log::{Level, debug, info, warn};
use portrait_utils::{
    EnhanceSettings, FilterKind, HairCutoff, apply_eye_filter, apply_region_filter, crop_rgba,
    resize_rgba, sharpen_hair, timing_guard,
};

use crate::alpha_codec::hard_alpha_mask;
use crate::blend::{blend, blend_in_place};
use crate::collaborators::Collaborators;
use crate::error::{EnhanceError, MissKind, Result};
use crate::landmarks::{ear_line_region, eye_line_roll, eye_mask, face_contour_mask};
use crate::mask_compositor::KeepRegion;
use crate::masks::{PortraitMasks, face_and_hair_mask_within, hair_mask};
use crate::recompose::blend_cropped_region_back;
use crate::refine::feather;
use crate::region::detect_face_with_hair_region;
use crate::region_filter::filter_within_mask;
use crate::session::CancelToken;
use crate::tone::{match_tone_by_mean, match_tone_by_mean_masked};
use crate::types::{PixelImage, RegionRect};
use crate::upscale::TiledUpscaler;

/// What happened to the upscale step of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpscaleReport {
    NotRequested,
    /// Requested, but no super-resolution model is available.
    Unavailable,
    Upscaled,
    /// The model failed; the enhanced crop kept its resolution.
    Failed(String),
}

/// Outcome of one run. Everything except `Enhanced` means the returned image
/// is the unmodified input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnhanceStatus {
    Enhanced { upscale: UpscaleReport },
    DetectionMiss(MissKind),
    ShapeMismatch(String),
    InferenceFailure(String),
    Cancelled,
}

impl EnhanceStatus {
    pub fn is_enhanced(&self) -> bool {
        matches!(self, EnhanceStatus::Enhanced { .. })
    }

    /// Short label for reports and logs.
    pub fn label(&self) -> &'static str {
        match self {
            EnhanceStatus::Enhanced { .. } => "enhanced",
            EnhanceStatus::DetectionMiss(_) => "detection_miss",
            EnhanceStatus::ShapeMismatch(_) => "shape_mismatch",
            EnhanceStatus::InferenceFailure(_) => "inference_failure",
            EnhanceStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EnhanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnhanceStatus::Enhanced { upscale } => match upscale {
                UpscaleReport::Upscaled => f.write_str("Enhanced and upscaled."),
                UpscaleReport::Failed(reason) => {
                    write!(f, "Enhanced; upscaling failed ({reason}).")
                }
                UpscaleReport::Unavailable => {
                    f.write_str("Enhanced; no upscaling model available.")
                }
                UpscaleReport::NotRequested => f.write_str("Enhanced."),
            },
            EnhanceStatus::DetectionMiss(kind) => f.write_str(kind.advice()),
            EnhanceStatus::ShapeMismatch(detail) => write!(f, "Internal size mismatch: {detail}"),
            EnhanceStatus::InferenceFailure(detail) => write!(f, "Model failure: {detail}"),
            EnhanceStatus::Cancelled => f.write_str("Cancelled."),
        }
    }
}

impl From<&EnhanceError> for EnhanceStatus {
    fn from(err: &EnhanceError) -> Self {
        match err {
            EnhanceError::DetectionMiss(kind) => EnhanceStatus::DetectionMiss(*kind),
            // Too few contour points means the landmarks were unusable.
            EnhanceError::InsufficientPoints { .. } => {
                EnhanceStatus::DetectionMiss(MissKind::NoLandmarks)
            }
            EnhanceError::ShapeMismatch { .. } => EnhanceStatus::ShapeMismatch(err.to_string()),
            EnhanceError::InferenceFailure { stage, source } => {
                EnhanceStatus::InferenceFailure(format!("{stage}: {source:#}"))
            }
            EnhanceError::Cancelled => EnhanceStatus::Cancelled,
        }
    }
}

/// The image a run produced plus how it got there.
#[derive(Debug, Clone)]
pub struct EnhanceOutcome {
    pub image: PixelImage,
    pub status: EnhanceStatus,
    /// Head region the work happened in, once detection succeeded.
    pub region: Option<RegionRect>,
    /// Intermediate masks, when requested.
    pub masks: Option<PortraitMasks>,
}

impl EnhanceOutcome {
    fn unchanged(image: &PixelImage, err: &EnhanceError) -> Self {
        Self {
            image: image.clone(),
            status: EnhanceStatus::from(err),
            region: None,
            masks: None,
        }
    }
}

/// Portrait enhancement bound to a set of models and default settings.
#[derive(Debug, Clone)]
pub struct PortraitEnhancer {
    collaborators: Collaborators,
    settings: EnhanceSettings,
}

impl PortraitEnhancer {
    pub fn new(collaborators: Collaborators, settings: EnhanceSettings) -> Self {
        Self {
            collaborators,
            settings,
        }
    }

    pub fn settings(&self) -> &EnhanceSettings {
        &self.settings
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Enhance with the configured settings, overriding the filter and
    /// whether to upscale.
    pub fn enhance_portrait(
        &self,
        image: &PixelImage,
        filter: FilterKind,
        upscale_enabled: bool,
    ) -> EnhanceOutcome {
        let mut settings = self.settings.clone();
        settings.filter = filter;
        settings.upscale.enabled = upscale_enabled;
        self.run(image, &settings, &CancelToken::never(), false)
    }

    /// Full pipeline with explicit settings and cancellation.
    pub fn run(
        &self,
        image: &PixelImage,
        settings: &EnhanceSettings,
        cancel: &CancelToken,
        keep_masks: bool,
    ) -> EnhanceOutcome {
        let _guard = timing_guard("portrait_core::enhance_portrait", Level::Info);
        match self.run_stages(image, settings, cancel, keep_masks) {
            Ok(outcome) => {
                info!("{}", outcome.status);
                outcome
            }
            Err(err) => {
                match &err {
                    EnhanceError::DetectionMiss(_) | EnhanceError::Cancelled => {
                        info!("image left unchanged: {err}")
                    }
                    _ => warn!("image left unchanged: {err:#}"),
                }
                EnhanceOutcome::unchanged(image, &err)
            }
        }
    }

    fn run_stages(
        &self,
        image: &PixelImage,
        settings: &EnhanceSettings,
        cancel: &CancelToken,
        keep_masks: bool,
    ) -> Result<EnhanceOutcome> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(EnhanceError::ShapeMismatch {
                op: "enhance_portrait",
                detail: "input image is empty".into(),
            });
        }

        let region = detect_face_with_hair_region(
            image,
            self.collaborators.face_detector.as_ref(),
            &settings.region,
        )
        .map_err(|e| EnhanceError::inference("face detection", e))?
        .ok_or(EnhanceError::DetectionMiss(MissKind::NoFace))?;
        if region.is_empty() {
            return Err(EnhanceError::DetectionMiss(MissKind::EmptyRegion));
        }
        cancel.check()?;

        let crop = crop_rgba(image, region.left, region.top, region.width, region.height);
        let (cw, ch) = crop.dimensions();

        let person = {
            let _guard = timing_guard("portrait_core::segment", Level::Debug);
            let confidence = self
                .collaborators
                .segmenter
                .segment(&crop)
                .map_err(|e| EnhanceError::inference("segmentation", e))?;
            hard_alpha_mask(&confidence, cw, ch, settings.masks.person_threshold)?
        };
        cancel.check()?;

        let landmarks = {
            let _guard = timing_guard("portrait_core::landmarks", Level::Debug);
            self.collaborators
                .landmarker
                .detect_landmarks(&crop)
                .map_err(|e| EnhanceError::inference("landmark detection", e))?
                .ok_or(EnhanceError::DetectionMiss(MissKind::NoLandmarks))?
        };
        cancel.check()?;

        let masks_timer = timing_guard("portrait_core::masks", Level::Debug);
        let face_contour = face_contour_mask(&landmarks, cw, ch)?;
        let hair_region = match settings.masks.hair_cutoff {
            HairCutoff::TopFraction => KeepRegion::TopFraction(settings.masks.hair_region_fraction),
            HairCutoff::EarLine => {
                ear_line_region(&landmarks, cw, ch, settings.masks.ear_line_margin)?
            }
        };
        let face_and_hair = face_and_hair_mask_within(&person, &face_contour, hair_region)?;
        let roll = if settings.masks.counter_rotate_eyes {
            eye_line_roll(&landmarks, cw, ch)
        } else {
            None
        };
        let eyes = eye_mask(&landmarks, cw, ch, roll)?;
        if face_and_hair.is_empty() || eyes.is_empty() {
            return Err(EnhanceError::DetectionMiss(MissKind::EmptyMask));
        }
        let hair = if settings.hair.enabled {
            Some(hair_mask(&crop, &person, &eyes, &settings.masks)?)
        } else {
            None
        };
        let radius = settings.masks.feather_radius;
        let face_feathered = feather(&face_and_hair, radius);
        let eyes_feathered = feather(&eyes, radius);
        drop(masks_timer);
        debug!(
            "masks: person {} px, face+hair {} px, eyes {} px",
            person.coverage(),
            face_and_hair.coverage(),
            eyes.coverage()
        );
        cancel.check()?;

        let filter_timer = timing_guard("portrait_core::filter_blend", Level::Debug);
        let kind = settings.filter;
        let strategy = settings.blend.strategy;
        let filtered_face =
            filter_within_mask(&crop, &face_and_hair, |img| apply_region_filter(img, kind))?;
        let filtered_eyes = filter_within_mask(&crop, &eyes, |img| apply_eye_filter(img, kind))?;
        cancel.check()?;

        let mut enhanced = blend(&crop, &filtered_face, &face_feathered, strategy)?;
        blend_in_place(&mut enhanced, &filtered_eyes, &eyes_feathered, strategy)?;
        if let Some(hair) = &hair {
            let sheen = settings.hair.sheen;
            let textured = filter_within_mask(&enhanced, hair, |img| sharpen_hair(img, sheen))?;
            blend_in_place(&mut enhanced, &textured, &feather(hair, radius), strategy)?;
        }
        let enhanced = if settings.blend.masked_tone_match {
            match_tone_by_mean_masked(&crop, &enhanced, &face_feathered)?
        } else {
            match_tone_by_mean(&crop, &enhanced)?
        };
        drop(filter_timer);
        cancel.check()?;

        let (enhanced, upscale) = self.maybe_upscale(enhanced, settings);
        cancel.check()?;

        let processed = resize_rgba(&enhanced, region.width, region.height);
        let output = blend_cropped_region_back(image, &processed, &person, region.left, region.top);

        let masks = keep_masks.then(|| PortraitMasks {
            person,
            face_contour,
            face_and_hair,
            eyes,
            hair,
            face_feathered,
            eyes_feathered,
        });
        Ok(EnhanceOutcome {
            image: output,
            status: EnhanceStatus::Enhanced { upscale },
            region: Some(region),
            masks,
        })
    }

    fn maybe_upscale(
        &self,
        image: PixelImage,
        settings: &EnhanceSettings,
    ) -> (PixelImage, UpscaleReport) {
        if !settings.upscale.enabled {
            return (image, UpscaleReport::NotRequested);
        }
        let Some(model) = &self.collaborators.super_resolution else {
            debug!("upscale requested but no super-resolution model is loaded");
            return (image, UpscaleReport::Unavailable);
        };
        let upscaler = TiledUpscaler::new(model.clone(), settings.upscale.clone());
        match upscaler.try_upscale(&image) {
            Ok(upscaled) => (upscaled, UpscaleReport::Upscaled),
            Err(err) => {
                warn!("upscaling failed, keeping original resolution: {err:#}");
                (image, UpscaleReport::Failed(err.to_string()))
            }
        }
    }
}
