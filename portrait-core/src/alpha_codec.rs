//! Conversions from segmentation confidence to alpha masks.

use crate::error::{EnhanceError, Result};
use crate::types::{AlphaMask, ConfidenceBuffer};

fn check_len(op: &'static str, confidence: &ConfidenceBuffer, width: u32, height: u32) -> Result<()> {
    let expected = width as usize * height as usize;
    if confidence.len() == expected {
        Ok(())
    } else {
        Err(EnhanceError::ShapeMismatch {
            op,
            detail: format!(
                "confidence buffer has {} values, {width}x{height} needs {expected}",
                confidence.len()
            ),
        })
    }
}

/// Keep the confidence gradient: `alpha = round(c * 255)`.
pub fn soft_alpha_mask(
    confidence: &ConfidenceBuffer,
    width: u32,
    height: u32,
) -> Result<AlphaMask> {
    check_len("soft_alpha_mask", confidence, width, height)?;
    let values = confidence.values();
    Ok(AlphaMask::from_fn(width, height, |x, y| {
        let c = values[(y * width + x) as usize];
        (c * 255.0).round().clamp(0.0, 255.0) as u8
    }))
}

/// Binary mask: 255 where `c >= threshold`, 0 elsewhere.
pub fn hard_alpha_mask(
    confidence: &ConfidenceBuffer,
    width: u32,
    height: u32,
    threshold: f32,
) -> Result<AlphaMask> {
    check_len("hard_alpha_mask", confidence, width, height)?;
    let values = confidence.values();
    Ok(AlphaMask::from_fn(width, height, |x, y| {
        if values[(y * width + x) as usize] >= threshold {
            255
        } else {
            0
        }
    }))
}
