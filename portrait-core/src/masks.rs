//! Composite masks built from segmentation and landmarks.
//!
//! These sit one level above [`crate::mask_compositor`]: each function
//! combines primitive masks into a region the pipeline filters or blends.

use portrait_utils::MaskSettings;

use crate::error::{Result, ensure_same_dims};
use crate::mask_compositor::{KeepRegion, restrict_to_region, subtract, union};
use crate::refine::dilate;
use crate::types::{AlphaMask, PixelImage};

/// Person alpha above which a pixel can be hair.
const HAIR_PERSON_ALPHA: u8 = 128;
/// Mean RGB range for hair-like tones (dark to mid brown).
const HAIR_BRIGHTNESS: std::ops::RangeInclusive<u16> = 20..=110;
/// Hair is close to grey: max and min channel stay within this spread.
const HAIR_MAX_SPREAD: u8 = 30;
/// Hair rows lie between these fractions of the crop height.
const HAIR_ROWS: (f32, f32) = (0.15, 0.5);

/// Face plus the hair above it.
///
/// The person mask minus the face contour leaves hair, neck and shoulders;
/// keeping only the top `hair_region_fraction` of rows drops the body before
/// the face is added back.
pub fn face_and_hair_mask(
    person: &AlphaMask,
    face: &AlphaMask,
    hair_region_fraction: f32,
) -> Result<AlphaMask> {
    face_and_hair_mask_within(person, face, KeepRegion::TopFraction(hair_region_fraction))
}

/// [`face_and_hair_mask`] with hair kept only inside `hair_region`, for
/// instance the band above the ears from
/// [`ear_line_region`](crate::landmarks::ear_line_region).
pub fn face_and_hair_mask_within(
    person: &AlphaMask,
    face: &AlphaMask,
    hair_region: KeepRegion,
) -> Result<AlphaMask> {
    let outside_face = subtract(person, face, None)?;
    let hair = restrict_to_region(&outside_face, hair_region);
    union(face, &hair)
}

/// Pixels whose colour looks like hair inside the person silhouette.
///
/// A pixel qualifies when its person weight exceeds 128, its mean channel
/// value is in `20..=110`, its channels differ by less than 30 and its row is
/// in the band between 15% and 50% of the height. Qualifying pixels are fully
/// opaque.
pub fn hair_tone_mask(image: &PixelImage, person: &AlphaMask) -> Result<AlphaMask> {
    ensure_same_dims("hair_tone_mask", image.dimensions(), person.dimensions())?;
    let (width, height) = image.dimensions();
    let top = (height as f32 * HAIR_ROWS.0) as u32;
    let bottom = (height as f32 * HAIR_ROWS.1) as u32;

    Ok(AlphaMask::from_fn(width, height, |x, y| {
        if y < top || y >= bottom || person.alpha(x, y) <= HAIR_PERSON_ALPHA {
            return 0;
        }
        let px = image.get_pixel(x, y);
        let (r, g, b) = (px[0], px[1], px[2]);
        let brightness = (r as u16 + g as u16 + b as u16) / 3;
        let spread = r.max(g).max(b) - r.min(g).min(b);
        if HAIR_BRIGHTNESS.contains(&brightness) && spread < HAIR_MAX_SPREAD {
            255
        } else {
            0
        }
    }))
}

/// Hair-tone mask with the (dilated) eyes cut out.
///
/// Dark irises and lashes pass the hair tone test; dilating the eye mask and
/// removing everything above `hair_eye_cutoff` keeps them out of the hair
/// pass.
pub fn hair_mask(
    image: &PixelImage,
    person: &AlphaMask,
    eyes: &AlphaMask,
    settings: &MaskSettings,
) -> Result<AlphaMask> {
    let tone = hair_tone_mask(image, person)?;
    let grown_eyes = dilate(eyes, settings.eye_dilate_radius);
    subtract(&tone, &grown_eyes, Some(settings.hair_eye_cutoff))
}

/// Every intermediate mask of one run, in crop coordinates.
///
/// Only collected when a caller asks for it (mask dumps, debugging).
#[derive(Debug, Clone)]
pub struct PortraitMasks {
    pub person: AlphaMask,
    pub face_contour: AlphaMask,
    pub face_and_hair: AlphaMask,
    pub eyes: AlphaMask,
    pub hair: Option<AlphaMask>,
    pub face_feathered: AlphaMask,
    pub eyes_feathered: AlphaMask,
}

impl PortraitMasks {
    /// `(name, mask)` pairs in a stable order, suitable for file names.
    pub fn named(&self) -> Vec<(&'static str, &AlphaMask)> {
        let mut out = vec![
            ("person", &self.person),
            ("face_contour", &self.face_contour),
            ("face_and_hair", &self.face_and_hair),
            ("eyes", &self.eyes),
        ];
        if let Some(hair) = &self.hair {
            out.push(("hair", hair));
        }
        out.push(("face_feathered", &self.face_feathered));
        out.push(("eyes_feathered", &self.eyes_feathered));
        out
    }
}
