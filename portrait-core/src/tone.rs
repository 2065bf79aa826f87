use crate::error::{Result, ensure_same_dims};
use crate::types::{AlphaMask, PixelImage};

fn channel_means(image: &PixelImage, mask: Option<&AlphaMask>) -> Option<[f64; 3]> {
    let mut sums = [0f64; 3];
    let mut count = 0u64;
    for (x, y, px) in image.enumerate_pixels() {
        if mask.is_some_and(|m| m.alpha(x, y) == 0) {
            continue;
        }
        for c in 0..3 {
            sums[c] += px[c] as f64;
        }
        count += 1;
    }
    (count > 0).then(|| sums.map(|s| s / count as f64))
}

fn shift_toward(
    reference: &PixelImage,
    target: &PixelImage,
    mask: Option<&AlphaMask>,
) -> Result<PixelImage> {
    ensure_same_dims("match_tone", reference.dimensions(), target.dimensions())?;
    if let Some(mask) = mask {
        ensure_same_dims("match_tone", target.dimensions(), mask.dimensions())?;
    }
    let (Some(reference_mean), Some(target_mean)) =
        (channel_means(reference, mask), channel_means(target, mask))
    else {
        return Ok(target.clone());
    };
    let diff = [0, 1, 2].map(|c| reference_mean[c] - target_mean[c]);

    let mut out = target.clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        if mask.is_some_and(|m| m.alpha(x, y) == 0) {
            continue;
        }
        for c in 0..3 {
            px[c] = (px[c] as f64 + diff[c]).round().clamp(0.0, 255.0) as u8;
        }
    }
    Ok(out)
}

/// Shift `target`'s per-channel RGB mean onto `reference`'s.
///
/// Undoes the global colour cast a filter introduces relative to the
/// unfiltered source. Alpha is untouched and results are clamped to 8 bits.
pub fn match_tone_by_mean(reference: &PixelImage, target: &PixelImage) -> Result<PixelImage> {
    shift_toward(reference, target, None)
}

/// [`match_tone_by_mean`] restricted to pixels where `mask` has weight, for
/// both the means and the correction. Pixels outside the mask are unchanged.
pub fn match_tone_by_mean_masked(
    reference: &PixelImage,
    target: &PixelImage,
    mask: &AlphaMask,
) -> Result<PixelImage> {
    shift_toward(reference, target, Some(mask))
}
