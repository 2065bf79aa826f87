use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

use crate::error::{EnhanceError, Result};
use crate::types::{AlphaMask, PixelPoint};

/// Fill the closed polygon through `points` with alpha 255.
///
/// Points are pixel coordinates used in the given order; the last point joins
/// the first. A pixel is included when its centre falls inside the polygon.
/// Points outside the canvas are allowed and simply clip.
pub fn closed_contour_mask(points: &[PixelPoint], width: u32, height: u32) -> Result<AlphaMask> {
    if points.len() < 3 {
        return Err(EnhanceError::InsufficientPoints { got: points.len() });
    }
    let Some(mut pixmap) = Pixmap::new(width, height) else {
        return Err(EnhanceError::ShapeMismatch {
            op: "closed_contour_mask",
            detail: format!("cannot rasterize onto {width}x{height}"),
        });
    };

    // Vertices sit on pixel centres so a point names the pixel it lands in.
    let centre = |p: &PixelPoint| (p.x as f32 + 0.5, p.y as f32 + 0.5);
    let mut builder = PathBuilder::new();
    let (x0, y0) = centre(&points[0]);
    builder.move_to(x0, y0);
    for point in &points[1..] {
        let (x, y) = centre(point);
        builder.line_to(x, y);
    }
    builder.close();

    if let Some(path) = builder.finish() {
        let mut paint = Paint::default();
        paint.set_color_rgba8(255, 255, 255, 255);
        paint.anti_alias = false;
        pixmap.fill_path(
            &path,
            &paint,
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    let coverage = pixmap.data();
    Ok(AlphaMask::from_fn(width, height, |x, y| {
        coverage[((y * width + x) * 4 + 3) as usize]
    }))
}
