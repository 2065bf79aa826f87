use std::{fs, path::Path};

use anyhow::{Context, Result};
use image::{DynamicImage, ImageBuffer, Luma, Rgba, RgbaImage, imageops, imageops::FilterType};
use ndarray::Array3;

/// Load an image from disk as RGBA8.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
    let path_ref = path.as_ref();
    let image = image::open(path_ref)
        .with_context(|| format!("failed to open image {}", path_ref.display()))?;
    Ok(image.to_rgba8())
}

/// Save an RGBA image, creating parent directories.
///
/// Formats without an alpha channel (JPEG) get the RGB channels only.
pub fn save_rgba<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }
    let opaque_only = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "jpg" | "jpeg"));
    let result = if opaque_only {
        DynamicImage::ImageRgba8(image.clone()).to_rgb8().save(path)
    } else {
        image.save(path)
    };
    result.with_context(|| format!("failed to save image {}", path.display()))
}

/// Bilinear resize to an exact size. Same-size requests return a copy.
pub fn resize_rgba(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Triangle)
}

/// Copy out a sub-rectangle. The rectangle must lie inside the image.
pub fn crop_rgba(image: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> RgbaImage {
    imageops::crop_imm(image, x, y, width, height).to_image()
}

/// RGB channels as an `(height, width, 3)` array scaled to `[0, 1]`.
pub fn rgba_to_hwc(image: &RgbaImage) -> Array3<f32> {
    let (width, height) = image.dimensions();
    let mut array = Array3::<f32>::zeros((height as usize, width as usize, 3));
    for (x, y, pixel) in image.enumerate_pixels() {
        for c in 0..3 {
            array[(y as usize, x as usize, c)] = pixel[c] as f32 / 255.0;
        }
    }
    array
}

/// Inverse of [`rgba_to_hwc`]: clamps to `[0, 1]`, scales to 8-bit, alpha opaque.
pub fn hwc_to_rgba(array: &Array3<f32>) -> Result<RgbaImage> {
    let shape = array.shape();
    anyhow::ensure!(
        shape[2] == 3,
        "expected 3 channels in HWC array, got {}",
        shape[2]
    );
    let (height, width) = (shape[0] as u32, shape[1] as u32);
    Ok(RgbaImage::from_fn(width, height, |x, y| {
        let (xi, yi) = (x as usize, y as usize);
        let channel = |c: usize| (array[(yi, xi, c)].clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([channel(0), channel(1), channel(2), 255])
    }))
}

/// Bilinearly resample a row-major float map (e.g. segmentation confidence).
pub fn confidence_to_size(
    values: Vec<f32>,
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
) -> Result<Vec<f32>> {
    if (src_width, src_height) == (dst_width, dst_height) {
        return Ok(values);
    }
    let len = values.len();
    let map: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_raw(src_width, src_height, values).with_context(|| {
            format!("confidence map of {len} values does not fit {src_width}x{src_height}")
        })?;
    let resized = imageops::resize(&map, dst_width, dst_height, FilterType::Triangle);
    Ok(resized.into_raw())
}
