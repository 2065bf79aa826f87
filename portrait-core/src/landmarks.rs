//! Face-mesh landmark index sets and the masks built from them.
//!
//! Indices refer to the 478-point face mesh (468 surface points plus ten iris
//! points). Each contour list is ordered around the outline it describes.

use image::Luma;
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

use crate::contour::closed_contour_mask;
use crate::error::{EnhanceError, MissKind, Result};
use crate::mask_compositor::{KeepRegion, union};
use crate::types::{AlphaMask, Landmark, PixelPoint, RegionRect};

/// Landmarks a full face mesh reports.
pub const FACE_MESH_POINTS: usize = 478;

pub const FACE_OVAL: &[usize] = &[
    10, 338, 297, 332, 284, 251, 389, 356, 454, 323, 361, 288, 397, 365, 379, 378, 400, 377, 152,
    148, 176, 149, 150, 136, 172, 58, 132, 93, 234, 127, 162, 21, 54, 103, 67, 109,
];

pub const LEFT_EYE: &[usize] = &[
    33, 246, 161, 160, 159, 158, 157, 173, 133, 155, 154, 153, 145, 144, 163, 7,
];

pub const RIGHT_EYE: &[usize] = &[
    263, 466, 388, 387, 386, 385, 384, 398, 362, 382, 381, 380, 374, 373, 390, 249,
];

pub const LEFT_EYEBROW: &[usize] = &[70, 63, 105, 66, 107, 55, 65, 52, 53, 46];

pub const RIGHT_EYEBROW: &[usize] = &[336, 296, 334, 293, 300, 276, 283, 282, 295, 285];

pub const OUTER_LIPS: &[usize] = &[
    61, 146, 91, 181, 84, 17, 314, 405, 321, 375, 291, 308, 324, 318, 402, 317, 14, 87, 178, 88,
    95,
];

pub const INNER_LIPS: &[usize] = &[78, 95, 88, 178, 87, 14, 317, 402, 318, 324, 308, 291];

pub const NOSE_BRIDGE: &[usize] = &[6, 197, 195, 5, 4, 1, 19, 94];

pub const NOSE_BOTTOM: &[usize] = &[168, 417, 146, 91, 181, 84, 17, 314, 405];

pub const LEFT_IRIS: &[usize] = &[468, 469, 470, 471, 472];

pub const RIGHT_IRIS: &[usize] = &[473, 474, 475, 476, 477];

/// Face-oval points beside the ears (image left, image right).
pub const EAR_POINTS: [usize; 2] = [127, 356];

/// Outer eye corners (image left, image right).
pub const EYE_CORNERS: [usize; 2] = [33, 263];

/// Pixel positions of `indices` in a `width` x `height` crop.
///
/// A missing index means the landmarker returned a shorter mesh than
/// expected, which is reported as a landmark miss.
pub fn contour_points(
    landmarks: &[Landmark],
    indices: &[usize],
    width: u32,
    height: u32,
) -> Result<Vec<PixelPoint>> {
    indices
        .iter()
        .map(|&i| {
            landmarks
                .get(i)
                .map(|lm| lm.to_pixel(width, height))
                .ok_or(EnhanceError::DetectionMiss(MissKind::NoLandmarks))
        })
        .collect()
}

/// Filled polygon through the landmarks named by `indices`.
pub fn part_mask(
    landmarks: &[Landmark],
    indices: &[usize],
    width: u32,
    height: u32,
) -> Result<AlphaMask> {
    let points = contour_points(landmarks, indices, width, height)?;
    closed_contour_mask(&points, width, height)
}

/// The jawline-to-forehead face outline.
pub fn face_contour_mask(landmarks: &[Landmark], width: u32, height: u32) -> Result<AlphaMask> {
    part_mask(landmarks, FACE_OVAL, width, height)
}

/// Both eye outlines in one mask.
///
/// With `roll_degrees` the mask is turned clockwise by that angle about the
/// crop centre, undoing a counter-clockwise head tilt.
pub fn eye_mask(
    landmarks: &[Landmark],
    width: u32,
    height: u32,
    roll_degrees: Option<f32>,
) -> Result<AlphaMask> {
    let left = part_mask(landmarks, LEFT_EYE, width, height)?;
    let right = part_mask(landmarks, RIGHT_EYE, width, height)?;
    let eyes = union(&left, &right)?;
    match roll_degrees {
        Some(roll) if roll != 0.0 && roll.is_finite() => {
            let turned = rotate_about_center(
                &eyes.alpha_plane(),
                roll.to_radians(),
                Interpolation::Nearest,
                Luma([0]),
            );
            Ok(AlphaMask::from_alpha_plane(&turned))
        }
        _ => Ok(eyes),
    }
}

/// Head roll in degrees from the outer eye corners.
///
/// Level eyes give 0; a head tilted counter-clockwise in the image gives a
/// positive angle. `None` when the mesh is short or the corners coincide.
pub fn eye_line_roll(landmarks: &[Landmark], width: u32, height: u32) -> Option<f32> {
    let left = landmarks.get(EYE_CORNERS[0])?;
    let right = landmarks.get(EYE_CORNERS[1])?;
    let mut dx = (right.x - left.x) * width as f32;
    let mut dy = (right.y - left.y) * height as f32;
    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    // A line's roll is taken modulo 180 degrees, whichever corner comes first.
    if dx < 0.0 {
        dx = -dx;
        dy = -dy;
    }
    Some(-dy.atan2(dx).to_degrees())
}

/// Hair region reaching `margin` rows below the lower ear landmark.
pub fn ear_line_region(
    landmarks: &[Landmark],
    width: u32,
    height: u32,
    margin: u32,
) -> Result<KeepRegion> {
    let [left, right] = EAR_POINTS.map(|i| landmarks.get(i));
    let (Some(left), Some(right)) = (left, right) else {
        return Err(EnhanceError::DetectionMiss(MissKind::NoLandmarks));
    };
    let ear_y = left.y.max(right.y).max(0.0) * height as f32;
    let rows = (ear_y + margin as f32) as u32;
    Ok(KeepRegion::Rect(RegionRect::new(0, 0, width, rows.min(height))))
}
