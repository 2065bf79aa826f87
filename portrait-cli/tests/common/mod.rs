//! Shared helpers for CLI integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use portrait_utils::AppSettings;

const MODEL_DIRS: [&str; 2] = ["models", "../models"];

/// Resolve every configured model against the usual model directories.
///
/// Returns settings with absolute model paths, or `None` when any of the
/// required models (detector, segmenter, landmarker) is missing.
pub fn settings_with_local_models() -> Option<AppSettings> {
    let mut settings = AppSettings::default();
    let models = &mut settings.models;
    for slot in [
        &mut models.face_detector,
        &mut models.segmenter,
        &mut models.landmarker,
    ] {
        let file = Path::new(slot.path.as_deref()?).file_name()?.to_owned();
        let found = find_model(Path::new(&file))?;
        slot.path = Some(found.display().to_string());
    }

    let upscaler = models
        .super_resolution
        .path
        .as_deref()
        .and_then(|p| Path::new(p).file_name().map(|f| f.to_owned()))
        .and_then(|file| find_model(Path::new(&file)));
    models.super_resolution.path = upscaler.map(|p| p.display().to_string());
    Some(settings)
}

fn find_model(file: &Path) -> Option<PathBuf> {
    MODEL_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(file))
        .find(|p| p.exists())
        .and_then(|p| p.canonicalize().ok())
}

pub fn find_fixture_image() -> Option<PathBuf> {
    ["fixtures/images/006.jpg", "../fixtures/images/006.jpg"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Write a flat gray image with no face in it.
pub fn write_blank_image(path: &Path) {
    RgbaImage::from_pixel(96, 96, Rgba([128, 128, 128, 255]))
        .save(path)
        .expect("save blank image");
}

/// Settings file whose detector points somewhere that does not exist.
pub fn write_broken_model_config(path: &Path) {
    let mut settings = AppSettings::default();
    settings.models.face_detector.path = Some("no/such/detector.onnx".to_string());
    settings.save_to_path(path).expect("save settings");
}
