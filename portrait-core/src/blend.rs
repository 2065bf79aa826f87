//! Mask-weighted compositing of a filtered overlay onto a base image.
//!
//! For weight `w = mask.alpha / 255` the visible result is
//! `base * (1 - w) + overlay * w`. Two numeric strategies are provided (see
//! [`BlendStrategy`]); they agree within one level whenever the overlay is
//! opaque. [`BlendStrategy::Linear`] is the default.

pub use portrait_utils::BlendStrategy;

use image::Rgba;

use crate::error::{Result, ensure_same_dims};
use crate::types::{AlphaMask, PixelImage};

/// Composite `overlay` onto a copy of `base`.
pub fn blend(
    base: &PixelImage,
    overlay: &PixelImage,
    mask: &AlphaMask,
    strategy: BlendStrategy,
) -> Result<PixelImage> {
    let mut out = base.clone();
    blend_in_place(&mut out, overlay, mask, strategy)?;
    Ok(out)
}

/// Composite `overlay` directly into `base`.
///
/// Same result as [`blend`] but writes into the caller's buffer, saving an
/// allocation. `base` is left untouched when the sizes disagree.
pub fn blend_in_place(
    base: &mut PixelImage,
    overlay: &PixelImage,
    mask: &AlphaMask,
    strategy: BlendStrategy,
) -> Result<()> {
    ensure_same_dims("blend", base.dimensions(), overlay.dimensions())?;
    ensure_same_dims("blend", base.dimensions(), mask.dimensions())?;

    for (x, y, px) in base.enumerate_pixels_mut() {
        let weight = mask.alpha(x, y);
        if weight == 0 {
            continue;
        }
        let over = overlay.get_pixel(x, y);
        *px = match strategy {
            BlendStrategy::Linear => lerp_pixel(px, over, weight),
            BlendStrategy::Normalized => source_over(px, over, weight),
        };
    }
    Ok(())
}

fn lerp_pixel(base: &Rgba<u8>, over: &Rgba<u8>, weight: u8) -> Rgba<u8> {
    let w = weight as f32 / 255.0;
    let mut out = *base;
    for c in 0..4 {
        let b = base[c] as f32;
        out[c] = (b + (over[c] as f32 - b) * w).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// `x / 255` rounded, exact for every product of two bytes.
#[inline]
fn div255(x: u32) -> u32 {
    let x = x + 128;
    (x + (x >> 8)) >> 8
}

/// Mask the overlay (dst-in), then draw it over the base (src-over), in
/// 8-bit fixed point.
fn source_over(base: &Rgba<u8>, over: &Rgba<u8>, weight: u8) -> Rgba<u8> {
    let w = div255(over[3] as u32 * weight as u32);
    let inv = 255 - w;
    let mut out = *base;
    for c in 0..3 {
        out[c] = div255(base[c] as u32 * inv + over[c] as u32 * w) as u8;
    }
    out[3] = (w + div255(base[3] as u32 * inv)).min(255) as u8;
    out
}
