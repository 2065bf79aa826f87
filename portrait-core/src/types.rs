//! Value types shared by the mask, blend and upscale stages.

use image::{GrayImage, Luma, Rgba, RgbaImage};

/// 8-bit RGBA buffer every stage consumes and produces.
pub type PixelImage = RgbaImage;

/// An image whose alpha channel is a per-pixel inclusion weight.
///
/// 0 excludes a pixel from the masked operation, 255 fully includes it and
/// anything between is a fractional blend weight. RGB is white wherever alpha
/// is non-zero and carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaMask(RgbaImage);

impl AlphaMask {
    /// A mask with the same weight everywhere.
    pub fn filled(width: u32, height: u32, alpha: u8) -> Self {
        Self(RgbaImage::from_pixel(width, height, mask_pixel(alpha)))
    }

    /// A mask excluding every pixel.
    pub fn empty(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0)
    }

    /// Build from a single-channel plane of weights.
    pub fn from_alpha_plane(plane: &GrayImage) -> Self {
        let (width, height) = plane.dimensions();
        Self(RgbaImage::from_fn(width, height, |x, y| {
            mask_pixel(plane.get_pixel(x, y)[0])
        }))
    }

    /// Build from an existing RGBA image, keeping only its alpha.
    pub fn from_image(image: &RgbaImage) -> Self {
        let mut mask = image.clone();
        for px in mask.pixels_mut() {
            *px = mask_pixel(px[3]);
        }
        Self(mask)
    }

    /// Build by evaluating `f(x, y)` for every pixel's weight.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u8) -> Self {
        Self(RgbaImage::from_fn(width, height, |x, y| mask_pixel(f(x, y))))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    #[inline]
    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        self.0.get_pixel(x, y)[3]
    }

    #[inline]
    pub fn set_alpha(&mut self, x: u32, y: u32, alpha: u8) {
        self.0.put_pixel(x, y, mask_pixel(alpha));
    }

    /// Alpha values in row-major order.
    pub fn alphas(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.pixels().map(|px| px[3])
    }

    /// `true` when no pixel is included.
    pub fn is_empty(&self) -> bool {
        self.alphas().all(|a| a == 0)
    }

    /// Number of pixels with non-zero weight.
    pub fn coverage(&self) -> usize {
        self.alphas().filter(|&a| a > 0).count()
    }

    /// The weights as a single-channel image.
    pub fn alpha_plane(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            Luma([self.alpha(x, y)])
        })
    }

    /// Opaque grayscale rendering (RGB = weight) for inspecting a mask.
    pub fn to_visualization(&self) -> RgbaImage {
        let mut out = self.0.clone();
        for px in out.pixels_mut() {
            let a = px[3];
            *px = Rgba([a, a, a, 255]);
        }
        out
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.0
    }

    pub fn into_image(self) -> RgbaImage {
        self.0
    }
}

#[inline]
pub(crate) fn mask_pixel(alpha: u8) -> Rgba<u8> {
    if alpha == 0 {
        Rgba([0, 0, 0, 0])
    } else {
        Rgba([255, 255, 255, alpha])
    }
}

/// Per-pixel segmentation confidences in `[0, 1]`, row-major.
///
/// Conversions always read from the first element, so a buffer can be
/// converted any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceBuffer {
    values: Vec<f32>,
}

impl ConfidenceBuffer {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn filled(len: usize, value: f32) -> Self {
        Self::new(vec![value; len])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

impl From<Vec<f32>> for ConfidenceBuffer {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

/// Integer rectangle in the coordinate space of a parent image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegionRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl RegionRect {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.left.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.top.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intersect with a `width` x `height` parent.
    pub fn clamped_to(&self, width: u32, height: u32) -> Self {
        let left = self.left.min(width);
        let top = self.top.min(height);
        Self {
            left,
            top,
            width: self.right().min(width) - left,
            height: self.bottom().min(height) - top,
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }
}

/// Axis-aligned face box in pixel space of the image it was detected in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// The first face a detector reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDetection {
    pub bbox: BoundingBox,
    /// In-plane head rotation in degrees, positive counter-clockwise.
    pub rotation_z: f32,
    pub score: f32,
}

/// Facial landmark normalised to `[0, 1]` relative to the analysed crop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Pixel position in a `width` x `height` image, truncated toward zero.
    pub fn to_pixel(self, width: u32, height: u32) -> PixelPoint {
        PixelPoint {
            x: (self.x * width as f32) as i32,
            y: (self.y * height as f32) as i32,
        }
    }
}

/// Integer pixel coordinate; may fall outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}
