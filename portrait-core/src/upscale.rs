//! Fixed-grid tiled super-resolution.
//!
//! The image is (optionally) pre-shrunk to respect a pixel budget,
//! stretched to a whole number of tiles, pushed through the model one tile at a
//! time and reassembled on a canvas `scale` times larger. Tiles never overlap,
//! so faint seams at tile borders are expected.

use std::sync::Arc;

use anyhow::anyhow;
use image::{RgbaImage, imageops};
use log::{debug, warn};
use portrait_utils::{
    PixelBudget, UpscaleSettings, crop_rgba, hwc_to_rgba, resize_rgba, rgba_to_hwc, timing_guard,
};
use rayon::prelude::*;

use crate::collaborators::SuperResolutionModel;
use crate::error::{EnhanceError, Result};
use crate::types::PixelImage;

/// Sizes decided once per upscale call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalePreset {
    /// Factor applied to the input before tiling; `1.0` means untouched.
    pub input_scale_ratio: f32,
    /// Linear magnification of the model (`tile_output / tile_input`).
    pub output_scale_factor: u32,
    /// Input size after the pre-shrink.
    pub resized_width: u32,
    pub resized_height: u32,
    /// Size the result is brought to when a pre-shrink happened.
    pub final_output_width: u32,
    pub final_output_height: u32,
}

/// Work out the pre-shrink for a `width` x `height` input.
///
/// Inputs with more than `max_output_pixels` pixels are scaled by
/// `sqrt(max_output_pixels / (width * height))`; anything smaller keeps a
/// ratio of exactly `1.0`.
pub fn compute_scale_preset(
    width: u32,
    height: u32,
    tile_input: u32,
    tile_output: u32,
    max_output_pixels: u64,
) -> Result<ScalePreset> {
    compute_scale_preset_with_budget(
        width,
        height,
        tile_input,
        tile_output,
        max_output_pixels,
        PixelBudget::Input,
    )
}

/// [`compute_scale_preset`] with a choice of what the budget limits.
///
/// With [`PixelBudget::Output`] the magnified size `width * height * scale^2`
/// is compared instead, and the ratio brings the final output onto the budget.
pub fn compute_scale_preset_with_budget(
    width: u32,
    height: u32,
    tile_input: u32,
    tile_output: u32,
    max_output_pixels: u64,
    budget: PixelBudget,
) -> Result<ScalePreset> {
    if width == 0 || height == 0 {
        return Err(EnhanceError::ShapeMismatch {
            op: "compute_scale_preset",
            detail: format!("cannot upscale a {width}x{height} image"),
        });
    }
    if tile_input == 0 || tile_output < tile_input || tile_output % tile_input != 0 {
        return Err(EnhanceError::ShapeMismatch {
            op: "compute_scale_preset",
            detail: format!(
                "tile output {tile_output} is not a whole multiple of tile input {tile_input}"
            ),
        });
    }

    let scale = tile_output / tile_input;
    let pixels = u64::from(width) * u64::from(height);
    let measured = match budget {
        PixelBudget::Input => pixels,
        PixelBudget::Output => pixels * u64::from(scale) * u64::from(scale),
    };

    let (ratio, resized_width, resized_height) = if measured > max_output_pixels {
        let ratio = (max_output_pixels as f64 / measured as f64).sqrt();
        let shrink = |side: u32| ((side as f64 * ratio) as u32).max(1);
        (ratio as f32, shrink(width), shrink(height))
    } else {
        (1.0, width, height)
    };

    Ok(ScalePreset {
        input_scale_ratio: ratio,
        output_scale_factor: scale,
        resized_width,
        resized_height,
        final_output_width: resized_width * scale,
        final_output_height: resized_height * scale,
    })
}

/// Runs a [`SuperResolutionModel`] over an image tile by tile.
#[derive(Clone)]
pub struct TiledUpscaler {
    model: Arc<dyn SuperResolutionModel>,
    settings: UpscaleSettings,
}

impl TiledUpscaler {
    pub fn new(model: Arc<dyn SuperResolutionModel>, settings: UpscaleSettings) -> Self {
        Self { model, settings }
    }

    pub fn settings(&self) -> &UpscaleSettings {
        &self.settings
    }

    pub fn preset_for(&self, width: u32, height: u32) -> Result<ScalePreset> {
        compute_scale_preset_with_budget(
            width,
            height,
            self.settings.tile_input,
            self.settings.tile_output,
            self.settings.max_output_pixels,
            self.settings.budget,
        )
    }

    /// Upscale, falling back to a copy of `image` on any failure.
    pub fn upscale(&self, image: &PixelImage) -> PixelImage {
        match self.try_upscale(image) {
            Ok(upscaled) => upscaled,
            Err(err) => {
                warn!("upscaling failed, keeping original resolution: {err:#}");
                image.clone()
            }
        }
    }

    /// Upscale, reporting failures to the caller.
    ///
    /// Without a pre-shrink the result is the padded grid magnified, i.e.
    /// `ceil(w / tile) * tile_output` wide; with one it is resized to the
    /// preset's final size.
    pub fn try_upscale(&self, image: &PixelImage) -> Result<PixelImage> {
        let _guard = timing_guard("portrait_core::upscale", log::Level::Debug);
        let preset = self.preset_for(image.width(), image.height())?;
        let tile_in = self.settings.tile_input;
        let tile_out = self.settings.tile_output;

        let shrunk = preset.input_scale_ratio < 1.0;
        let source = if shrunk {
            resize_rgba(image, preset.resized_width, preset.resized_height)
        } else {
            image.clone()
        };

        let x_tiles = source.width().div_ceil(tile_in);
        let y_tiles = source.height().div_ceil(tile_in);
        let padded = resize_rgba(&source, x_tiles * tile_in, y_tiles * tile_in);
        debug!(
            "upscaling {}x{} as {}x{} tiles (ratio {:.3})",
            image.width(),
            image.height(),
            x_tiles,
            y_tiles,
            preset.input_scale_ratio
        );

        let grid: Vec<(u32, u32)> = (0..y_tiles)
            .flat_map(|ty| (0..x_tiles).map(move |tx| (tx, ty)))
            .collect();
        let run = |&(tx, ty): &(u32, u32)| {
            self.infer_tile(&crop_rgba(&padded, tx * tile_in, ty * tile_in, tile_in, tile_in))
        };
        // Both paths yield tiles in grid order.
        let tiles: Vec<RgbaImage> = if self.settings.parallel_tiles {
            grid.par_iter().map(run).collect::<Result<_>>()?
        } else {
            grid.iter().map(run).collect::<Result<_>>()?
        };

        let mut canvas = RgbaImage::new(x_tiles * tile_out, y_tiles * tile_out);
        for (&(tx, ty), tile) in grid.iter().zip(&tiles) {
            imageops::replace(
                &mut canvas,
                tile,
                i64::from(tx * tile_out),
                i64::from(ty * tile_out),
            );
        }

        if shrunk {
            Ok(resize_rgba(
                &canvas,
                preset.final_output_width,
                preset.final_output_height,
            ))
        } else {
            Ok(canvas)
        }
    }

    fn infer_tile(&self, tile: &RgbaImage) -> Result<RgbaImage> {
        let input = rgba_to_hwc(tile);
        let output = self
            .model
            .infer(&input)
            .map_err(|err| EnhanceError::inference("super_resolution", err))?;
        let edge = self.settings.tile_output as usize;
        if output.shape() != [edge, edge, 3] {
            return Err(EnhanceError::inference(
                "super_resolution",
                anyhow!(
                    "model returned tile of shape {:?}, expected [{edge}, {edge}, 3]",
                    output.shape()
                ),
            ));
        }
        hwc_to_rgba(&output).map_err(|err| EnhanceError::inference("super_resolution", err))
    }
}
