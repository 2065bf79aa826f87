//! Set operations over alpha masks.
//!
//! All binary operations require both masks to share dimensions.

use crate::error::{Result, ensure_same_dims};
use crate::types::{AlphaMask, RegionRect};

/// Part of a mask to keep in [`restrict_to_region`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeepRegion {
    /// Keep pixels inside the rectangle.
    Rect(RegionRect),
    /// Keep the top `fraction` of rows (`0.65` keeps rows `y < 0.65 * height`).
    TopFraction(f32),
}

fn combine(
    op: &'static str,
    a: &AlphaMask,
    b: &AlphaMask,
    f: impl Fn(u8, u8) -> u8,
) -> Result<AlphaMask> {
    ensure_same_dims(op, a.dimensions(), b.dimensions())?;
    let (width, height) = a.dimensions();
    Ok(AlphaMask::from_fn(width, height, |x, y| {
        f(a.alpha(x, y), b.alpha(x, y))
    }))
}

/// Remove `sub` from `full`.
///
/// Without a cutoff the result is `max(full - sub, 0)`, which keeps soft
/// edges. With `Some(cutoff)`, any pixel where `sub >= cutoff` drops to 0 and
/// every other pixel keeps `full` unchanged.
pub fn subtract(full: &AlphaMask, sub: &AlphaMask, cutoff: Option<u8>) -> Result<AlphaMask> {
    match cutoff {
        None => combine("subtract", full, sub, |f, s| f.saturating_sub(s)),
        Some(cutoff) => combine("subtract", full, sub, |f, s| if s >= cutoff { 0 } else { f }),
    }
}

/// Per-pixel maximum.
pub fn union(a: &AlphaMask, b: &AlphaMask) -> Result<AlphaMask> {
    combine("union", a, b, u8::max)
}

/// Per-pixel minimum; on hard masks this is a logical AND.
pub fn intersect(a: &AlphaMask, b: &AlphaMask) -> Result<AlphaMask> {
    combine("intersect", a, b, u8::min)
}

/// Zero every pixel outside `region`.
pub fn restrict_to_region(mask: &AlphaMask, region: KeepRegion) -> AlphaMask {
    let (width, height) = mask.dimensions();
    let keep = match region {
        KeepRegion::Rect(rect) => rect.clamped_to(width, height),
        KeepRegion::TopFraction(fraction) => {
            let rows = (height as f32 * fraction.clamp(0.0, 1.0)) as u32;
            RegionRect::new(0, 0, width, rows)
        }
    };
    AlphaMask::from_fn(width, height, |x, y| {
        if keep.contains(x, y) {
            mask.alpha(x, y)
        } else {
            0
        }
    })
}
