use anyhow::Result;
use log::debug;
use portrait_utils::{RegionSettings, timing_guard};

use crate::collaborators::FaceDetector;
use crate::types::{BoundingBox, PixelImage, RegionRect};

/// Grow a face box into a head region: the top moves up by
/// `hair_extension * face height`, the bottom down by `chin_extension * face
/// height`, left and right stay put. The result is clamped to the image.
pub fn face_with_hair_region(
    bbox: &BoundingBox,
    image_width: u32,
    image_height: u32,
    settings: &RegionSettings,
) -> RegionRect {
    let (w, h) = (image_width as f32, image_height as f32);
    let left = bbox.x.clamp(0.0, w);
    let right = (bbox.x + bbox.width).clamp(0.0, w);
    let top = (bbox.y - settings.hair_extension * bbox.height).clamp(0.0, h);
    let bottom = (bbox.y + bbox.height + settings.chin_extension * bbox.height).clamp(0.0, h);

    let (left, top) = (left as u32, top as u32);
    let (right, bottom) = (right as u32, bottom as u32);
    RegionRect::new(
        left,
        top,
        right.saturating_sub(left),
        bottom.saturating_sub(top),
    )
}

/// Detect the first face and return its padded head region, or `None` when
/// no face is found.
pub fn detect_face_with_hair_region(
    image: &PixelImage,
    detector: &dyn FaceDetector,
    settings: &RegionSettings,
) -> Result<Option<RegionRect>> {
    let _guard = timing_guard("portrait_core::detect_region", log::Level::Debug);
    let Some(face) = detector.detect_first_face(image)? else {
        debug!("no face in {}x{} image", image.width(), image.height());
        return Ok(None);
    };
    let rect = face_with_hair_region(&face.bbox, image.width(), image.height(), settings);
    debug!(
        "face at ({:.0}, {:.0}) {:.0}x{:.0}, rotation {:.1} -> region {:?}",
        face.bbox.x, face.bbox.y, face.bbox.width, face.bbox.height, face.rotation_z, rect
    );
    Ok(Some(rect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FaceDetection;
    use image::RgbaImage;

    struct FixedDetector(Option<FaceDetection>);

    impl FaceDetector for FixedDetector {
        fn detect_first_face(&self, _image: &PixelImage) -> Result<Option<FaceDetection>> {
            Ok(self.0)
        }
    }

    fn bbox(x: f32, y: f32, width: f32, height: f32) -> BoundingBox {
        BoundingBox {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn extends_top_and_bottom_only() {
        let rect = face_with_hair_region(
            &bbox(100.0, 200.0, 80.0, 100.0),
            400,
            400,
            &RegionSettings::default(),
        );
        assert_eq!(rect, RegionRect::new(100, 170, 80, 135));
    }

    #[test]
    fn clamps_to_image_bounds() {
        let rect = face_with_hair_region(
            &bbox(-10.0, 5.0, 60.0, 90.0),
            40,
            90,
            &RegionSettings::default(),
        );
        assert_eq!(rect, RegionRect::new(0, 0, 40, 90));
    }

    #[test]
    fn padding_is_configurable() {
        let settings = RegionSettings {
            hair_extension: 0.5,
            chin_extension: 0.0,
        };
        let rect = face_with_hair_region(&bbox(10.0, 100.0, 50.0, 50.0), 200, 200, &settings);
        assert_eq!(rect, RegionRect::new(10, 75, 50, 75));
    }

    #[test]
    fn no_face_returns_none() {
        let image = RgbaImage::new(32, 32);
        let region = detect_face_with_hair_region(
            &image,
            &FixedDetector(None),
            &RegionSettings::default(),
        )
        .unwrap();
        assert!(region.is_none());
    }

    #[test]
    fn detected_face_is_padded() {
        let image = RgbaImage::new(200, 200);
        let detector = FixedDetector(Some(FaceDetection {
            bbox: bbox(50.0, 60.0, 40.0, 40.0),
            rotation_z: 0.0,
            score: 0.95,
        }));
        let region =
            detect_face_with_hair_region(&image, &detector, &RegionSettings::default()).unwrap();
        assert_eq!(region, Some(RegionRect::new(50, 48, 40, 54)));
    }
}
