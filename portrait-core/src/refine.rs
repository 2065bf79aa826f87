use image::{ImageBuffer, Luma};
use imageproc::{distance_transform::Norm, filter::gaussian_blur_f32, morphology};

use crate::types::AlphaMask;

/// Gaussian sigma for an odd kernel extent, as derived for unspecified sigmas
/// in common vision libraries: `0.3 * ((k - 1) / 2 - 1) + 0.8`.
fn sigma_for_kernel(radius: u32) -> f32 {
    let ksize = (radius | 1) as f32;
    0.3 * ((ksize - 1.0) * 0.5 - 1.0) + 0.8
}

/// Soften mask edges by blurring the alpha channel.
///
/// `radius` is the kernel extent (3, 5 and 7 are typical); even values round
/// up to the next odd size and 0 returns the mask unchanged. Only alpha is
/// touched, and because the blur is a weighted average no output weight
/// exceeds the largest input weight around it.
pub fn feather(mask: &AlphaMask, radius: u32) -> AlphaMask {
    if radius == 0 || mask.width() == 0 || mask.height() == 0 {
        return mask.clone();
    }
    // Blur in f32 and round; a u8 blur truncates and loses a level.
    let weights: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(mask.width(), mask.height(), |x, y| {
            Luma([f32::from(mask.alpha(x, y))])
        });
    let blurred = gaussian_blur_f32(&weights, sigma_for_kernel(radius));
    AlphaMask::from_fn(mask.width(), mask.height(), |x, y| {
        blurred.get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8
    })
}

/// Grow the included area by `radius` pixels (square neighbourhood).
///
/// Any pixel within `radius` of a non-zero weight becomes fully included;
/// weights already present are kept if they are higher. Used to close gaps in
/// landmark-derived masks before they are cut out of another mask.
pub fn dilate(mask: &AlphaMask, radius: u8) -> AlphaMask {
    if radius == 0 {
        return mask.clone();
    }
    let grown = morphology::dilate(&mask.alpha_plane(), Norm::LInf, radius);
    AlphaMask::from_fn(mask.width(), mask.height(), |x, y| {
        grown.get_pixel(x, y)[0].max(mask.alpha(x, y))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(size: u32, at: (u32, u32)) -> AlphaMask {
        AlphaMask::from_fn(size, size, |x, y| if (x, y) == at { 255 } else { 0 })
    }

    #[test]
    fn kernel_sigma_matches_reference_values() {
        assert!((sigma_for_kernel(3) - 0.8).abs() < 1e-6);
        assert!((sigma_for_kernel(5) - 1.1).abs() < 1e-6);
        assert!((sigma_for_kernel(7) - 1.4).abs() < 1e-6);
        assert_eq!(sigma_for_kernel(4), sigma_for_kernel(5));
    }

    #[test]
    fn feather_preserves_dimensions_and_bounds() {
        let mask = AlphaMask::from_fn(20, 12, |x, _| if x < 10 { 255 } else { 0 });
        for radius in [3, 5, 7] {
            let soft = feather(&mask, radius);
            assert_eq!(soft.dimensions(), mask.dimensions());
            assert!(soft.alpha(0, 6) >= 254);
            assert!(soft.alpha(19, 6) <= 1);
            let edge = soft.alpha(10, 6);
            assert!(edge > 0 && edge < 255, "edge {edge} at radius {radius}");
        }
    }

    #[test]
    fn feather_never_exceeds_neighbourhood_max() {
        let mask = AlphaMask::from_fn(16, 16, |x, y| if x > 4 && y > 4 { 120 } else { 30 });
        let soft = feather(&mask, 5);
        assert!(soft.alphas().all(|a| (30..=120).contains(&a)));
        // Far from the step the weights are untouched.
        assert_eq!(soft.alpha(0, 0), 30);
        assert_eq!(soft.alpha(15, 15), 120);
        // Across the step they are mixed.
        assert!((31..120).contains(&soft.alpha(5, 10)));
    }

    #[test]
    fn feather_keeps_uniform_masks() {
        let mask = AlphaMask::filled(9, 9, 200);
        assert_eq!(feather(&mask, 5), mask);
        assert_eq!(feather(&mask, 0), mask);
    }

    #[test]
    fn dilate_grows_by_radius() {
        let grown = dilate(&dot(11, (5, 5)), 3);
        assert_eq!(grown.alpha(2, 2), 255);
        assert_eq!(grown.alpha(8, 8), 255);
        assert_eq!(grown.alpha(1, 5), 0);
        assert_eq!(grown.coverage(), 49);
    }

    #[test]
    fn dilate_zero_is_identity() {
        let mask = dot(5, (1, 1));
        assert_eq!(dilate(&mask, 0), mask);
    }
}
