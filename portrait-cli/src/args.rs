//! Command-line argument definitions for portrait-cli.

use clap::{ArgAction, Parser};
use portrait_utils::{BlendStrategy, FilterKind};
use std::path::PathBuf;

/// Enhance portraits: filter the face and eyes, restore tone and optionally
/// upscale, for one image or a directory of images.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct EnhanceArgs {
    /// Path to an image file or a directory containing images.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file (single input) or directory (directory input).
    #[arg(short, long)]
    pub output: PathBuf,

    /// Filter applied to the face and eyes: sharp, soft, clear or natural.
    #[arg(short, long)]
    pub filter: Option<FilterKind>,

    /// Skip super-resolution even when a model is configured.
    #[arg(long = "no-upscale", action = ArgAction::SetTrue)]
    pub no_upscale: bool,

    /// Run upscaling tiles on the thread pool.
    #[arg(long = "parallel-tiles", action = ArgAction::SetTrue)]
    pub parallel_tiles: bool,

    /// Also run the hair texture pass.
    #[arg(long, action = ArgAction::SetTrue)]
    pub hair: bool,

    /// Blend strategy: linear or normalized.
    #[arg(long, value_name = "STRATEGY")]
    pub blend: Option<BlendStrategy>,

    /// Override the person segmentation threshold (0.0-1.0).
    #[arg(long)]
    pub person_threshold: Option<f32>,

    /// Override the mask feather kernel size.
    #[arg(long)]
    pub feather_radius: Option<u32>,

    /// Optional settings JSON. Defaults to `config/portrait_settings.json` when present, otherwise built-in parameters.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory to write the intermediate masks of every image.
    #[arg(long, value_name = "DIR")]
    pub dump_masks: Option<PathBuf>,

    /// Write a JSON status report for every processed image.
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Enable telemetry timing logs (defaults to settings file).
    #[arg(long, action = ArgAction::SetTrue)]
    pub telemetry: bool,

    /// Override telemetry logging level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub telemetry_level: Option<String>,
}
