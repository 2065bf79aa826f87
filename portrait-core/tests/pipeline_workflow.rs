mod common;

use std::sync::Arc;

use common::{
    BrokenUpscaler, FailingSegmenter, FixedDetector, NoLandmarks, UniformSegmenter,
    assert_untouched_outside_region, collaborators, head_region, portrait, ring_mesh,
};
use image::RgbaImage;
use portrait_core::{
    CancelToken, EnhanceStatus, KeepRegion, MissKind, PortraitEnhancer, UpscaleReport,
    ear_line_region, eye_mask,
};
use portrait_utils::{EnhanceSettings, FilterKind, HairCutoff};

fn enhancer() -> PortraitEnhancer {
    PortraitEnhancer::new(collaborators(), EnhanceSettings::default())
}

#[test]
fn no_face_returns_original_with_miss() {
    let mut models = collaborators();
    models.face_detector = Arc::new(FixedDetector(None));
    let enhancer = PortraitEnhancer::new(models, EnhanceSettings::default());

    let source = portrait();
    let outcome = enhancer.enhance_portrait(&source, FilterKind::Natural, true);
    assert_eq!(outcome.status, EnhanceStatus::DetectionMiss(MissKind::NoFace));
    assert_eq!(outcome.image, source);
    assert!(outcome.region.is_none());
}

#[test]
fn missing_landmarks_return_original() {
    let mut models = collaborators();
    models.landmarker = Arc::new(NoLandmarks);
    let enhancer = PortraitEnhancer::new(models, EnhanceSettings::default());

    let source = portrait();
    let outcome = enhancer.enhance_portrait(&source, FilterKind::Sharp, false);
    assert_eq!(
        outcome.status,
        EnhanceStatus::DetectionMiss(MissKind::NoLandmarks)
    );
    assert_eq!(outcome.image, source);
}

#[test]
fn segmentation_failure_is_reported_not_raised() {
    let mut models = collaborators();
    models.segmenter = Arc::new(FailingSegmenter);
    let enhancer = PortraitEnhancer::new(models, EnhanceSettings::default());

    let source = portrait();
    let outcome = enhancer.enhance_portrait(&source, FilterKind::Soft, false);
    match &outcome.status {
        EnhanceStatus::InferenceFailure(detail) => {
            assert!(detail.contains("segmentation"), "{detail}");
        }
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(outcome.image, source);
}

#[test]
fn low_person_confidence_leaves_nothing_to_recompose() {
    let mut models = collaborators();
    models.segmenter = Arc::new(UniformSegmenter(0.2));
    let enhancer = PortraitEnhancer::new(models, EnhanceSettings::default());

    // The face contour alone still yields a mask, but recomposition is gated
    // by the empty person mask, so the output equals the input.
    let source = portrait();
    let outcome = enhancer.enhance_portrait(&source, FilterKind::Sharp, false);
    assert!(outcome.status.is_enhanced());
    assert_eq!(outcome.image, source);
}

#[test]
fn every_filter_enhances_inside_the_head_region_only() {
    let source = portrait();
    for kind in FilterKind::ALL {
        let outcome = enhancer().enhance_portrait(&source, kind, false);
        assert_eq!(
            outcome.status,
            EnhanceStatus::Enhanced {
                upscale: UpscaleReport::NotRequested
            },
            "{kind}"
        );
        assert_eq!(outcome.image.dimensions(), source.dimensions());
        assert_untouched_outside_region(&source, &outcome.image);
        assert_ne!(outcome.image, source, "{kind} changed nothing");
        assert_eq!(outcome.region, Some(head_region()));
    }
}

#[test]
fn upscaling_keeps_output_size() {
    let source = portrait();
    let outcome = enhancer().enhance_portrait(&source, FilterKind::Natural, true);
    assert_eq!(
        outcome.status,
        EnhanceStatus::Enhanced {
            upscale: UpscaleReport::Upscaled
        }
    );
    assert_eq!(outcome.image.dimensions(), source.dimensions());
    assert_untouched_outside_region(&source, &outcome.image);
}

#[test]
fn failed_upscale_still_delivers_enhancement() {
    let mut models = collaborators();
    models.super_resolution = Some(Arc::new(BrokenUpscaler));
    let enhancer = PortraitEnhancer::new(models, EnhanceSettings::default());

    let source = portrait();
    let outcome = enhancer.enhance_portrait(&source, FilterKind::Clear, true);
    assert!(matches!(
        outcome.status,
        EnhanceStatus::Enhanced {
            upscale: UpscaleReport::Failed(_)
        }
    ));
    assert_ne!(outcome.image, source);
}

#[test]
fn missing_upscaler_is_reported() {
    let mut models = collaborators();
    models.super_resolution = None;
    let enhancer = PortraitEnhancer::new(models, EnhanceSettings::default());

    let outcome = enhancer.enhance_portrait(&portrait(), FilterKind::Natural, true);
    assert_eq!(
        outcome.status,
        EnhanceStatus::Enhanced {
            upscale: UpscaleReport::Unavailable
        }
    );
}

#[test]
fn masks_are_kept_on_request_in_crop_coordinates() {
    let mut settings = EnhanceSettings::default();
    settings.hair.enabled = true;
    settings.upscale.enabled = false;

    let outcome = enhancer().run(&portrait(), &settings, &CancelToken::never(), true);
    let masks = outcome.masks.expect("masks requested");
    let region = head_region();
    for (name, mask) in masks.named() {
        assert_eq!(mask.dimensions(), (region.width, region.height), "{name}");
    }
    assert!(masks.hair.is_some());
    assert!(!masks.face_and_hair.is_empty());
    assert!(!masks.eyes.is_empty());
    // Eyes lie inside the face outline.
    assert!(masks.eyes.coverage() < masks.face_contour.coverage());
}

#[test]
fn ear_line_cutoff_limits_hair_rows() {
    let mut settings = EnhanceSettings::default();
    settings.upscale.enabled = false;
    settings.masks.hair_cutoff = HairCutoff::EarLine;
    settings.masks.ear_line_margin = 0;
    settings.masks.counter_rotate_eyes = true;

    let outcome = enhancer().run(&portrait(), &settings, &CancelToken::never(), true);
    assert!(outcome.status.is_enhanced(), "{}", outcome.status);
    let masks = outcome.masks.expect("masks requested");

    let region = head_region();
    let KeepRegion::Rect(band) =
        ear_line_region(&ring_mesh(), region.width, region.height, 0).unwrap()
    else {
        panic!("ear line yields a rectangle");
    };
    // The lower ear sits well below the default 0.65 cut.
    assert!(band.height > region.height * 3 / 4 && band.height < region.height);
    assert_eq!(masks.face_contour.alpha(0, band.height - 1), 0);
    assert!(masks.face_and_hair.alpha(0, band.height - 1) > 0);
    for y in band.height..region.height {
        for x in 0..region.width {
            assert_eq!(
                masks.face_and_hair.alpha(x, y),
                masks.face_contour.alpha(x, y),
                "hair below the ear line at ({x}, {y})"
            );
        }
    }
    // Level eyes need no counter-rotation.
    assert_eq!(
        masks.eyes,
        eye_mask(&ring_mesh(), region.width, region.height, None).unwrap()
    );
}

#[test]
fn masks_are_not_kept_by_default() {
    let outcome = enhancer().enhance_portrait(&portrait(), FilterKind::Natural, false);
    assert!(outcome.masks.is_none());
}

#[test]
fn empty_image_is_a_shape_mismatch() {
    let outcome = enhancer().enhance_portrait(&RgbaImage::new(0, 0), FilterKind::Natural, false);
    assert!(matches!(outcome.status, EnhanceStatus::ShapeMismatch(_)));
}

#[test]
fn status_messages_are_user_facing() {
    assert_eq!(
        EnhanceStatus::DetectionMiss(MissKind::NoFace).to_string(),
        MissKind::NoFace.advice()
    );
    assert_eq!(EnhanceStatus::Cancelled.label(), "cancelled");
}
