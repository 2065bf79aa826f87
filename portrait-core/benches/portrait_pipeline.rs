use std::{hint::black_box, sync::Arc};

use anyhow::Result;
use criterion::{Criterion, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};
use ndarray::Array3;
use portrait_core::landmarks::{FACE_MESH_POINTS, FACE_OVAL, LEFT_EYE, RIGHT_EYE};
use portrait_core::{
    AlphaMask, BlendStrategy, BoundingBox, Collaborators, ConfidenceBuffer, FaceDetection,
    FaceDetector, FaceLandmarker, Landmark, PersonSegmenter, PixelImage, PortraitEnhancer,
    SuperResolutionModel, TiledUpscaler, blend, eye_mask, face_and_hair_mask, face_contour_mask,
    feather, hard_alpha_mask,
};
use portrait_utils::{EnhanceSettings, FilterKind, UpscaleSettings};

fn build_source_image() -> RgbaImage {
    RgbaImage::from_fn(1024, 1024, |x, y| {
        let val = ((x + y) % 255) as u8;
        Rgba([val, 255u8.saturating_sub(val), val / 2 + 60, 255])
    })
}

fn mesh() -> Vec<Landmark> {
    let mut mesh = vec![Landmark::new(0.5, 0.5); FACE_MESH_POINTS];
    for (indices, cx, cy, r) in [
        (FACE_OVAL, 0.5, 0.6, 0.35),
        (LEFT_EYE, 0.65, 0.5, 0.06),
        (RIGHT_EYE, 0.35, 0.5, 0.06),
    ] {
        for (k, &idx) in indices.iter().enumerate() {
            let angle = k as f32 / indices.len() as f32 * std::f32::consts::TAU;
            mesh[idx] = Landmark::new(cx + r * angle.cos(), cy + r * angle.sin());
        }
    }
    mesh
}

struct Fixed;

impl FaceDetector for Fixed {
    fn detect_first_face(&self, _image: &PixelImage) -> Result<Option<FaceDetection>> {
        Ok(Some(FaceDetection {
            bbox: BoundingBox {
                x: 320.0,
                y: 360.0,
                width: 384.0,
                height: 384.0,
            },
            rotation_z: 0.0,
            score: 0.95,
        }))
    }
}

impl PersonSegmenter for Fixed {
    fn segment(&self, image: &PixelImage) -> Result<ConfidenceBuffer> {
        Ok(ConfidenceBuffer::filled(
            (image.width() * image.height()) as usize,
            0.9,
        ))
    }
}

impl FaceLandmarker for Fixed {
    fn detect_landmarks(&self, _image: &PixelImage) -> Result<Option<Vec<Landmark>>> {
        Ok(Some(mesh()))
    }
}

struct NearestX4;

impl SuperResolutionModel for NearestX4 {
    fn infer(&self, tile: &Array3<f32>) -> Result<Array3<f32>> {
        let (h, w, _) = tile.dim();
        Ok(Array3::from_shape_fn((h * 4, w * 4, 3), |(y, x, c)| {
            tile[(y / 4, x / 4, c)]
        }))
    }
}

fn mask_benchmark(c: &mut Criterion) {
    let (w, h) = (512, 640);
    let person =
        hard_alpha_mask(&ConfidenceBuffer::filled((w * h) as usize, 0.9), w, h, 0.6).unwrap();
    let landmarks = mesh();

    c.bench_function("face_eye_masks_512x640", |b| {
        b.iter(|| {
            let face = face_contour_mask(black_box(&landmarks), w, h).unwrap();
            let face_hair = face_and_hair_mask(&person, &face, 0.65).unwrap();
            let eyes = eye_mask(&landmarks, w, h, None).unwrap();
            black_box((feather(&face_hair, 5), feather(&eyes, 5)));
        });
    });
}

fn blend_benchmark(c: &mut Criterion) {
    let base = build_source_image();
    let overlay = RgbaImage::from_pixel(1024, 1024, Rgba([200, 150, 120, 255]));
    let mask = AlphaMask::from_fn(1024, 1024, |x, y| ((x ^ y) & 0xff) as u8);

    let mut group = c.benchmark_group("blend_1024");
    for strategy in [BlendStrategy::Linear, BlendStrategy::Normalized] {
        group.bench_function(strategy.to_string(), |b| {
            b.iter(|| black_box(blend(black_box(&base), &overlay, &mask, strategy).unwrap()));
        });
    }
    group.finish();
}

fn upscale_benchmark(c: &mut Criterion) {
    let image = RgbaImage::from_fn(384, 480, |x, y| Rgba([x as u8, y as u8, 90, 255]));
    let mut group = c.benchmark_group("tiled_upscale_384x480");
    group.sample_size(20);
    for parallel_tiles in [false, true] {
        let upscaler = TiledUpscaler::new(
            Arc::new(NearestX4),
            UpscaleSettings {
                parallel_tiles,
                ..UpscaleSettings::default()
            },
        );
        let label = if parallel_tiles { "parallel" } else { "sequential" };
        group.bench_function(label, |b| {
            b.iter(|| black_box(upscaler.try_upscale(black_box(&image)).unwrap()));
        });
    }
    group.finish();
}

fn pipeline_benchmark(c: &mut Criterion) {
    let image = build_source_image();
    let fixed = Arc::new(Fixed);
    let enhancer = PortraitEnhancer::new(
        Collaborators {
            face_detector: fixed.clone(),
            segmenter: fixed.clone(),
            landmarker: fixed,
            super_resolution: None,
        },
        EnhanceSettings::default(),
    );

    let mut group = c.benchmark_group("enhance_portrait_1024");
    group.sample_size(10);
    for kind in FilterKind::ALL {
        group.bench_function(kind.as_label(), |b| {
            b.iter(|| black_box(enhancer.enhance_portrait(black_box(&image), kind, false)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    mask_benchmark,
    blend_benchmark,
    upscale_benchmark,
    pipeline_benchmark
);
criterion_main!(benches);
