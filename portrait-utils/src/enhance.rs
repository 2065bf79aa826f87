//! Region and eye filters used by the portrait pipeline.
//!
//! Every filter is a pure `&RgbaImage -> RgbaImage` function that keeps the
//! alpha channel and zeroes RGB wherever alpha is 0, so masked selections never
//! pick up colour from fully transparent pixels.

use std::{fmt, str::FromStr};

use image::{Rgba, RgbaImage, imageops};
use serde::{Deserialize, Serialize};

const EPSILON: f32 = 1e-6;

/// Look of the enhancement applied to the face region.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Local contrast plus high-boost sharpening.
    Sharp,
    /// Smoothed skin with a warm cast.
    Soft,
    /// Lifted local contrast with a faint glow.
    Clear,
    /// Light smoothing and a gentle gamma.
    #[default]
    Natural,
}

impl FilterKind {
    pub const ALL: [FilterKind; 4] = [
        FilterKind::Sharp,
        FilterKind::Soft,
        FilterKind::Clear,
        FilterKind::Natural,
    ];

    pub fn as_label(self) -> &'static str {
        match self {
            FilterKind::Sharp => "Sharp",
            FilterKind::Soft => "Soft",
            FilterKind::Clear => "Clear",
            FilterKind::Natural => "Natural",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_label().to_ascii_lowercase())
    }
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sharp" => Ok(FilterKind::Sharp),
            "soft" => Ok(FilterKind::Soft),
            "clear" => Ok(FilterKind::Clear),
            "natural" => Ok(FilterKind::Natural),
            other => Err(format!(
                "invalid filter '{other}'; expected sharp, soft, clear or natural"
            )),
        }
    }
}

/// Resolution bucket that scales filter strength with image size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl QualityTier {
    /// `High` from 1920x1080 pixels, `Medium` from 1280x720.
    pub fn for_dimensions(width: u32, height: u32) -> Self {
        let pixels = u64::from(width) * u64::from(height);
        if pixels >= 1920 * 1080 {
            QualityTier::High
        } else if pixels >= 1280 * 720 {
            QualityTier::Medium
        } else {
            QualityTier::Low
        }
    }
}

/// Apply the whole-region filter for `kind`.
pub fn apply_region_filter(image: &RgbaImage, kind: FilterKind) -> RgbaImage {
    let tier = QualityTier::for_dimensions(image.width(), image.height());
    let out = match kind {
        FilterKind::Sharp => {
            let equalized = equalize_luma(image, 0.5);
            unsharp_mask(&equalized, 0.4, 1.0)
        }
        FilterKind::Soft => {
            let (sigma, tone) = match tier {
                QualityTier::High => (3.0, [3.0, 1.5, 0.0]),
                QualityTier::Medium => (2.0, [2.0, 1.0, 0.0]),
                QualityTier::Low => (1.2, [1.0, 0.5, 0.0]),
            };
            let smoothed = smooth(image, sigma, 0.6);
            shift_channels(&smoothed, tone)
        }
        FilterKind::Clear => {
            let equalized = equalize_luma(image, 0.35);
            let glow = imageops::blur(&equalized, 15.0);
            add_weighted(&equalized, 0.98, &glow, 0.05)
        }
        FilterKind::Natural => {
            let (sigma, mix, gamma) = match tier {
                QualityTier::High => (1.6, 0.5, 1.05),
                QualityTier::Medium => (1.3, 0.4, 1.0),
                QualityTier::Low => (1.0, 0.3, 0.95),
            };
            apply_gamma(&smooth(image, sigma, mix), gamma)
        }
    };
    clear_transparent(out)
}

/// Apply the eye-region filter paired with `kind`.
pub fn apply_eye_filter(image: &RgbaImage, kind: FilterKind) -> RgbaImage {
    let out = match kind {
        FilterKind::Sharp => unsharp_mask(image, 0.8, 2.5),
        FilterKind::Soft => brighten(&smooth(image, 1.0, 0.6), -10),
        FilterKind::Clear => scale_offset(image, 1.15, 2.0),
        FilterKind::Natural => apply_gamma(image, 1.05),
    };
    clear_transparent(out)
}

/// Bring out hair texture with an unsharp mask of the given strength.
pub fn sharpen_hair(image: &RgbaImage, sheen: f32) -> RgbaImage {
    clear_transparent(unsharp_mask(image, sheen, 1.5))
}

fn map_rgb(image: &RgbaImage, mut f: impl FnMut(usize, u8) -> u8) -> RgbaImage {
    let mut out = image.clone();
    for px in out.pixels_mut() {
        for c in 0..3 {
            px[c] = f(c, px[c]);
        }
    }
    out
}

fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn clear_transparent(mut image: RgbaImage) -> RgbaImage {
    for px in image.pixels_mut() {
        if px[3] == 0 {
            *px = Rgba([0, 0, 0, 0]);
        }
    }
    image
}

fn unsharp_mask(image: &RgbaImage, amount: f32, sigma: f32) -> RgbaImage {
    if amount <= 0.0 || sigma <= 0.0 {
        return image.clone();
    }
    let blurred = imageops::blur(image, sigma);
    let mut out = image.clone();
    for (px, b) in out.pixels_mut().zip(blurred.pixels()) {
        for c in 0..3 {
            let s = px[c] as f32;
            px[c] = to_u8(s + amount * (s - b[c] as f32));
        }
    }
    out
}

/// Mix a Gaussian-smoothed copy back in; `mix` = 1 is fully smoothed.
fn smooth(image: &RgbaImage, sigma: f32, mix: f32) -> RgbaImage {
    if sigma <= 0.0 || mix <= 0.0 {
        return image.clone();
    }
    let blurred = imageops::blur(image, sigma);
    add_weighted(image, 1.0 - mix, &blurred, mix)
}

/// `a * wa + b * wb` on RGB, alpha from `a`.
fn add_weighted(a: &RgbaImage, wa: f32, b: &RgbaImage, wb: f32) -> RgbaImage {
    let mut out = a.clone();
    for (px, other) in out.pixels_mut().zip(b.pixels()) {
        for c in 0..3 {
            px[c] = to_u8(px[c] as f32 * wa + other[c] as f32 * wb);
        }
    }
    out
}

fn shift_channels(image: &RgbaImage, shift: [f32; 3]) -> RgbaImage {
    map_rgb(image, |c, v| to_u8(v as f32 + shift[c]))
}

fn brighten(image: &RgbaImage, offset: i32) -> RgbaImage {
    if offset == 0 {
        return image.clone();
    }
    map_rgb(image, |_, v| (v as i32 + offset).clamp(0, 255) as u8)
}

fn scale_offset(image: &RgbaImage, gain: f32, offset: f32) -> RgbaImage {
    map_rgb(image, |_, v| to_u8(v as f32 * gain + offset))
}

/// `gamma > 1` lifts midtones.
fn apply_gamma(image: &RgbaImage, gamma: f32) -> RgbaImage {
    if (gamma - 1.0).abs() < EPSILON || gamma <= 0.0 {
        return image.clone();
    }
    let inv = 1.0 / gamma;
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = to_u8((i as f32 / 255.0).powf(inv) * 255.0);
    }
    map_rgb(image, |_, v| lut[v as usize])
}

fn luma(px: &Rgba<u8>) -> u8 {
    to_u8(0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32)
}

fn equalization_lut(hist: &[u32; 256], total: u32) -> Option<[u8; 256]> {
    let mut cdf = [0u32; 256];
    let mut cumulative = 0u32;
    let mut cdf_min = None;
    for (idx, count) in hist.iter().enumerate() {
        cumulative += *count;
        cdf[idx] = cumulative;
        if cdf_min.is_none() && *count > 0 {
            cdf_min = Some(cumulative);
        }
    }
    let cdf_min = cdf_min?;
    if cdf_min >= total {
        return None;
    }
    let denom = (total - cdf_min) as f32;
    let mut lut = [0u8; 256];
    for (entry, value) in lut.iter_mut().zip(cdf) {
        *entry = to_u8(value.saturating_sub(cdf_min) as f32 / denom * 255.0);
    }
    Some(lut)
}

/// Histogram-equalize luma over visible pixels and shift RGB by a fraction of the change.
fn equalize_luma(image: &RgbaImage, strength: f32) -> RgbaImage {
    let mut hist = [0u32; 256];
    let mut total = 0u32;
    for px in image.pixels().filter(|px| px[3] > 0) {
        hist[luma(px) as usize] += 1;
        total += 1;
    }
    let Some(lut) = equalization_lut(&hist, total) else {
        return image.clone();
    };

    let mut out = image.clone();
    for px in out.pixels_mut() {
        let y = luma(px);
        let delta = (lut[y as usize] as f32 - y as f32) * strength;
        for c in 0..3 {
            px[c] = to_u8(px[c] as f32 + delta);
        }
    }
    out
}
