use portrait_utils::resize_rgba;

use crate::types::{AlphaMask, PixelImage};

/// Write a processed crop back into a copy of the full image.
///
/// `region_mask` is resized to the processed crop first; every pixel with
/// non-zero mask weight is copied to `(offset_x + x, offset_y + y)`. Writes
/// that fall outside `original` are skipped, and an empty crop or mask leaves
/// the copy untouched.
pub fn blend_cropped_region_back(
    original: &PixelImage,
    processed: &PixelImage,
    region_mask: &AlphaMask,
    offset_x: u32,
    offset_y: u32,
) -> PixelImage {
    let mut out = original.clone();
    let (width, height) = processed.dimensions();
    if width == 0 || height == 0 || region_mask.width() == 0 || region_mask.height() == 0 {
        return out;
    }
    let mask = if region_mask.dimensions() == (width, height) {
        region_mask.clone()
    } else {
        AlphaMask::from_image(&resize_rgba(region_mask.as_image(), width, height))
    };

    for (x, y, px) in processed.enumerate_pixels() {
        if mask.alpha(x, y) == 0 {
            continue;
        }
        let (Some(tx), Some(ty)) = (offset_x.checked_add(x), offset_y.checked_add(y)) else {
            continue;
        };
        if tx < out.width() && ty < out.height() {
            out.put_pixel(tx, ty, *px);
        }
    }
    out
}
