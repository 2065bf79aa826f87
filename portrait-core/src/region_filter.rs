use crate::error::{Result, ensure_same_dims};
use crate::types::{AlphaMask, PixelImage};

/// Take `filtered` wherever the mask has any weight, `original` elsewhere.
///
/// This is a hard selection; weighted mixing happens later in
/// [`crate::blend`]. All three inputs must share dimensions.
pub fn apply_within_mask(
    original: &PixelImage,
    filtered: &PixelImage,
    mask: &AlphaMask,
) -> Result<PixelImage> {
    ensure_same_dims("apply_within_mask", original.dimensions(), filtered.dimensions())?;
    ensure_same_dims("apply_within_mask", original.dimensions(), mask.dimensions())?;

    let mut out = original.clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        if mask.alpha(x, y) > 0 {
            *px = *filtered.get_pixel(x, y);
        }
    }
    Ok(out)
}

/// Run `filter` over `image` and keep its output only inside `mask`.
pub fn filter_within_mask(
    image: &PixelImage,
    mask: &AlphaMask,
    filter: impl Fn(&PixelImage) -> PixelImage,
) -> Result<PixelImage> {
    ensure_same_dims("filter_within_mask", image.dimensions(), mask.dimensions())?;
    let filtered = filter(image);
    apply_within_mask(image, &filtered, mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EnhanceError;
    use image::{Rgba, RgbaImage};

    #[test]
    fn selects_by_nonzero_alpha() {
        let original = RgbaImage::from_pixel(3, 1, Rgba([10, 10, 10, 255]));
        let filtered = RgbaImage::from_pixel(3, 1, Rgba([200, 0, 0, 255]));
        let mask = AlphaMask::from_fn(3, 1, |x, _| [0, 1, 255][x as usize]);

        let out = apply_within_mask(&original, &filtered, &mask).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [10, 10, 10, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [200, 0, 0, 255]);
        assert_eq!(out.get_pixel(2, 0).0, [200, 0, 0, 255]);
    }

    #[test]
    fn empty_mask_returns_original() {
        let original = RgbaImage::from_fn(4, 4, |x, y| Rgba([x as u8, y as u8, 7, 255]));
        let out =
            filter_within_mask(&original, &AlphaMask::empty(4, 4), |img| {
                RgbaImage::from_pixel(img.width(), img.height(), Rgba([1, 2, 3, 4]))
            })
            .unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn rejects_mismatched_inputs() {
        let a = RgbaImage::new(4, 4);
        let b = RgbaImage::new(4, 3);
        assert!(matches!(
            apply_within_mask(&a, &b, &AlphaMask::empty(4, 4)),
            Err(EnhanceError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            apply_within_mask(&a, &a, &AlphaMask::empty(3, 4)),
            Err(EnhanceError::ShapeMismatch { .. })
        ));
    }
}
