//! Canned collaborators for pipeline and session tests.
#![allow(dead_code)]

use std::sync::{Arc, Condvar, Mutex};

use anyhow::Result;
use image::{Rgba, RgbaImage};
use ndarray::Array3;
use portrait_core::landmarks::{FACE_MESH_POINTS, FACE_OVAL, LEFT_EYE, RIGHT_EYE};
use portrait_core::{
    BoundingBox, Collaborators, ConfidenceBuffer, FaceDetection, FaceDetector, FaceLandmarker,
    Landmark, PersonSegmenter, PixelImage, RegionRect, SuperResolutionModel,
    face_with_hair_region,
};
use portrait_utils::RegionSettings;

/// Face box used by [`FixedDetector::centered`] on a 200x200 image.
pub const FACE_BOX: BoundingBox = BoundingBox {
    x: 40.0,
    y: 40.0,
    width: 80.0,
    height: 80.0,
};

/// Head region the pipeline derives from [`FACE_BOX`] on [`portrait`].
pub fn head_region() -> RegionRect {
    face_with_hair_region(&FACE_BOX, 200, 200, &RegionSettings::default())
}

pub fn portrait() -> RgbaImage {
    RgbaImage::from_fn(200, 200, |x, y| {
        let checker = if (x / 2 + y / 2) % 2 == 0 { 40 } else { 0 };
        Rgba([
            (90 + x / 4 + checker) as u8,
            (70 + y / 4) as u8,
            (60 + checker) as u8,
            255,
        ])
    })
}

pub struct FixedDetector(pub Option<FaceDetection>);

impl FixedDetector {
    pub fn centered() -> Self {
        Self(Some(FaceDetection {
            bbox: FACE_BOX,
            rotation_z: 0.0,
            score: 0.98,
        }))
    }
}

impl FaceDetector for FixedDetector {
    fn detect_first_face(&self, _image: &PixelImage) -> Result<Option<FaceDetection>> {
        Ok(self.0)
    }
}

/// Blocks every detection until [`Gate::open`] is called.
#[derive(Clone, Default)]
pub struct Gate(Arc<(Mutex<bool>, Condvar)>);

impl Gate {
    pub fn open(&self) {
        let (lock, cvar) = &*self.0;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }

    fn wait(&self) {
        let (lock, cvar) = &*self.0;
        let mut open = lock.lock().unwrap();
        while !*open {
            open = cvar.wait(open).unwrap();
        }
    }
}

pub struct GatedDetector {
    pub gate: Gate,
    pub inner: FixedDetector,
}

impl FaceDetector for GatedDetector {
    fn detect_first_face(&self, image: &PixelImage) -> Result<Option<FaceDetection>> {
        self.gate.wait();
        self.inner.detect_first_face(image)
    }
}

/// Segments everything as person with the given confidence.
pub struct UniformSegmenter(pub f32);

impl PersonSegmenter for UniformSegmenter {
    fn segment(&self, image: &PixelImage) -> Result<ConfidenceBuffer> {
        Ok(ConfidenceBuffer::filled(
            (image.width() * image.height()) as usize,
            self.0,
        ))
    }
}

pub struct FailingSegmenter;

impl PersonSegmenter for FailingSegmenter {
    fn segment(&self, _image: &PixelImage) -> Result<ConfidenceBuffer> {
        anyhow::bail!("segmentation backend unavailable")
    }
}

/// A face mesh with an oval outline and two round eyes; other points sit at
/// the centre.
pub struct RingLandmarker;

fn ring(mesh: &mut [Landmark], indices: &[usize], cx: f32, cy: f32, r: f32) {
    for (k, &idx) in indices.iter().enumerate() {
        let angle = k as f32 / indices.len() as f32 * std::f32::consts::TAU;
        mesh[idx] = Landmark::new(cx + r * angle.cos(), cy + r * angle.sin());
    }
}

pub fn ring_mesh() -> Vec<Landmark> {
    let mut mesh = vec![Landmark::new(0.5, 0.5); FACE_MESH_POINTS];
    ring(&mut mesh, FACE_OVAL, 0.5, 0.6, 0.35);
    ring(&mut mesh, LEFT_EYE, 0.65, 0.5, 0.08);
    ring(&mut mesh, RIGHT_EYE, 0.35, 0.5, 0.08);
    mesh
}

impl FaceLandmarker for RingLandmarker {
    fn detect_landmarks(&self, _image: &PixelImage) -> Result<Option<Vec<Landmark>>> {
        Ok(Some(ring_mesh()))
    }
}

pub struct NoLandmarks;

impl FaceLandmarker for NoLandmarks {
    fn detect_landmarks(&self, _image: &PixelImage) -> Result<Option<Vec<Landmark>>> {
        Ok(None)
    }
}

/// Nearest-neighbour 4x "super resolution".
pub struct NearestX4;

impl SuperResolutionModel for NearestX4 {
    fn infer(&self, tile: &Array3<f32>) -> Result<Array3<f32>> {
        let (h, w, _) = tile.dim();
        Ok(Array3::from_shape_fn((h * 4, w * 4, 3), |(y, x, c)| {
            tile[(y / 4, x / 4, c)]
        }))
    }
}

pub struct BrokenUpscaler;

impl SuperResolutionModel for BrokenUpscaler {
    fn infer(&self, _tile: &Array3<f32>) -> Result<Array3<f32>> {
        anyhow::bail!("out of memory")
    }
}

pub fn collaborators() -> Collaborators {
    Collaborators {
        face_detector: Arc::new(FixedDetector::centered()),
        segmenter: Arc::new(UniformSegmenter(0.9)),
        landmarker: Arc::new(RingLandmarker),
        super_resolution: Some(Arc::new(NearestX4)),
    }
}

/// Pixels outside the head region must match the source exactly.
pub fn assert_untouched_outside_region(source: &RgbaImage, output: &RgbaImage) {
    let region = head_region();
    for (x, y, px) in source.enumerate_pixels() {
        if !region.contains(x, y) {
            assert_eq!(output.get_pixel(x, y), px, "pixel ({x}, {y}) changed");
        }
    }
}
