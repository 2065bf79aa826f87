//! Common helpers shared across the portrait enhancement crates.

/// Persistent settings for models, masks, blending and upscaling.
pub mod config;
/// Region and eye filters (sharpen, soften, clarify, naturalize).
pub mod enhance;
/// Image loading, resizing, and tensor conversion.
pub mod image_utils;
/// Instrumentation helpers for optional stage timing.
pub mod telemetry;

use std::path::Path;

use anyhow::Result;
use log::LevelFilter;

pub use config::{
    AppSettings, BlendSettings, BlendStrategy, EnhanceSettings, HairCutoff, HairSettings,
    MaskSettings, ModelSettings, OnnxModelSettings, PixelBudget, RegionSettings,
    TelemetrySettings, TensorLayout, UpscaleSettings,
};
pub use enhance::{FilterKind, QualityTier, apply_eye_filter, apply_region_filter, sharpen_hair};
pub use image_utils::{
    confidence_to_size, crop_rgba, hwc_to_rgba, load_image, resize_rgba, rgba_to_hwc, save_rgba,
};
pub use telemetry::{
    TimingGuard, configure as configure_telemetry, telemetry_allows, telemetry_enabled,
    telemetry_level, timing_guard, timing_guard_if,
};

/// Log target used by [`telemetry`] guards.
pub const TELEMETRY_TARGET: &str = "portrait::telemetry";

/// Initialize logging once for the CLI and tests.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies. Telemetry
/// records are always let through so [`configure_telemetry`] alone decides
/// whether stage timings show up.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module(TELEMETRY_TARGET, LevelFilter::Trace);

    // A second init (tests, embedding apps) is harmless.
    let _ = builder.try_init();
    Ok(())
}

/// Validate that a path exists and resolve it to an absolute path.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<std::path::PathBuf> {
    let path = path.as_ref();
    anyhow::ensure!(path.exists(), "path does not exist: {}", path.display());
    Ok(path.canonicalize()?)
}
