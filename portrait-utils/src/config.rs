//! Shared configuration types for the portrait enhancement workspace.
//!
//! Every threshold, radius and budget the pipeline uses lives here so call sites
//! never hard-code them. The defaults reproduce the tuned values of the
//! enhancement flow; alternates seen in related flows are noted per field.

use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::enhance::FilterKind;

/// Memory layout expected by an ONNX model's image input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TensorLayout {
    /// `[1, height, width, 3]`
    #[default]
    Nhwc,
    /// `[1, 3, height, width]`
    Nchw,
}

impl fmt::Display for TensorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TensorLayout::Nhwc => "nhwc",
            TensorLayout::Nchw => "nchw",
        })
    }
}

impl FromStr for TensorLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nhwc" => Ok(TensorLayout::Nhwc),
            "nchw" => Ok(TensorLayout::Nchw),
            other => Err(format!(
                "invalid tensor layout '{other}'; expected 'nhwc' or 'nchw'"
            )),
        }
    }
}

/// How a filtered overlay is weighted onto its base.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlendStrategy {
    /// Per-channel linear interpolation with `w = mask.alpha / 255`.
    #[default]
    Linear,
    /// Integer source-over compositing of the overlay after it is masked (dst-in).
    Normalized,
}

impl fmt::Display for BlendStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlendStrategy::Linear => "linear",
            BlendStrategy::Normalized => "normalized",
        })
    }
}

impl FromStr for BlendStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" | "lerp" => Ok(BlendStrategy::Linear),
            "normalized" | "porter-duff" => Ok(BlendStrategy::Normalized),
            other => Err(format!(
                "invalid blend strategy '{other}'; expected 'linear' or 'normalized'"
            )),
        }
    }
}

/// Location and input geometry of one ONNX model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OnnxModelSettings {
    /// Path to the `.onnx` file. `None` disables the collaborator.
    pub path: Option<String>,
    /// Square-or-not input resolution the graph expects.
    pub input_width: u32,
    pub input_height: u32,
    pub layout: TensorLayout,
    /// Minimum score for detections or presence checks.
    pub score_threshold: f32,
}

impl OnnxModelSettings {
    fn with(path: &str, width: u32, height: u32, layout: TensorLayout, score: f32) -> Self {
        Self {
            path: Some(path.to_string()),
            input_width: width,
            input_height: height,
            layout,
            score_threshold: score,
        }
    }
}

impl Default for OnnxModelSettings {
    fn default() -> Self {
        Self {
            path: None,
            input_width: 256,
            input_height: 256,
            layout: TensorLayout::Nhwc,
            score_threshold: 0.5,
        }
    }
}

/// The four model collaborators the pipeline consumes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelSettings {
    pub face_detector: OnnxModelSettings,
    pub segmenter: OnnxModelSettings,
    pub landmarker: OnnxModelSettings,
    pub super_resolution: OnnxModelSettings,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            face_detector: OnnxModelSettings::with(
                "models/face_detection_yunet_2023mar_640.onnx",
                640,
                640,
                TensorLayout::Nchw,
                0.9,
            ),
            segmenter: OnnxModelSettings::with(
                "models/selfie_multiclass_256x256.onnx",
                256,
                256,
                TensorLayout::Nhwc,
                0.5,
            ),
            landmarker: OnnxModelSettings::with(
                "models/face_landmarker.onnx",
                256,
                256,
                TensorLayout::Nhwc,
                0.5,
            ),
            super_resolution: OnnxModelSettings::with(
                "models/real_esrgan_general_x4v3.onnx",
                128,
                128,
                TensorLayout::Nchw,
                0.0,
            ),
        }
    }
}

/// Padding applied around the detected face to form the head region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegionSettings {
    /// Fraction of face height added above the face box for hair.
    pub hair_extension: f32,
    /// Fraction of face height added below the face box for the chin.
    pub chin_extension: f32,
}

impl Default for RegionSettings {
    fn default() -> Self {
        Self {
            hair_extension: 0.30,
            chin_extension: 0.05,
        }
    }
}

/// Mask construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MaskSettings {
    /// Person segmentation confidence for a hard mask (0.75 in the stricter flow).
    pub person_threshold: f32,
    /// Hair candidates are kept only in the top fraction of the crop (0.85 in looser flows).
    pub hair_region_fraction: f32,
    /// Feather kernel extent applied before every blend (3 and 7 elsewhere).
    pub feather_radius: u32,
    /// Dilation of the eye mask before it is cut out of the hair mask.
    pub eye_dilate_radius: u8,
    /// Eye alpha at or above this removes hair outright.
    pub hair_eye_cutoff: u8,
    /// Where hair candidates above the face stop.
    pub hair_cutoff: HairCutoff,
    /// Rows kept below the lower ear landmark with [`HairCutoff::EarLine`].
    pub ear_line_margin: u32,
    /// Counter-rotate the eye mask by the head roll read from the eye corners.
    pub counter_rotate_eyes: bool,
}

impl Default for MaskSettings {
    fn default() -> Self {
        Self {
            person_threshold: 0.6,
            hair_region_fraction: 0.65,
            feather_radius: 5,
            eye_dilate_radius: 3,
            hair_eye_cutoff: 50,
            hair_cutoff: HairCutoff::TopFraction,
            ear_line_margin: 20,
            counter_rotate_eyes: false,
        }
    }
}

/// Lower edge of the hair region in the face+hair mask.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HairCutoff {
    /// Top `hair_region_fraction` of the crop.
    #[default]
    TopFraction,
    /// Down to the lower of the two ear landmarks plus `ear_line_margin`.
    EarLine,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlendSettings {
    pub strategy: BlendStrategy,
    /// Restrict tone matching to the feathered face+hair mask.
    pub masked_tone_match: bool,
}

impl Default for BlendSettings {
    fn default() -> Self {
        Self {
            strategy: BlendStrategy::Linear,
            masked_tone_match: true,
        }
    }
}

/// Tiled super-resolution parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpscaleSettings {
    pub enabled: bool,
    /// Edge of an input tile in pixels.
    pub tile_input: u32,
    /// Edge of the tile the model returns.
    pub tile_output: u32,
    /// Pixel budget that triggers pre-downscaling.
    pub max_output_pixels: u64,
    /// Which image `max_output_pixels` is measured against.
    pub budget: PixelBudget,
    /// Run tile inference on the rayon pool. Output is unchanged.
    pub parallel_tiles: bool,
}

impl Default for UpscaleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tile_input: 128,
            tile_output: 512,
            max_output_pixels: 2048 * 2048,
            budget: PixelBudget::Input,
            parallel_tiles: false,
        }
    }
}

/// What the upscale pixel budget is compared with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PixelBudget {
    /// Shrink only inputs larger than the budget, to exactly the budget.
    #[default]
    Input,
    /// Shrink whenever the magnified output would exceed the budget, so the
    /// output itself fits.
    Output,
}

/// Optional hair pass layered after the face and eye blends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HairSettings {
    pub enabled: bool,
    /// Unsharp strength used to bring out hair texture.
    pub sheen: f32,
}

impl Default for HairSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            sheen: 0.5,
        }
    }
}

/// Everything one `enhance_portrait` run needs besides the models.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EnhanceSettings {
    pub filter: FilterKind,
    pub region: RegionSettings,
    pub masks: MaskSettings,
    pub blend: BlendSettings,
    pub upscale: UpscaleSettings,
    pub hair: HairSettings,
}

/// Settings controlling optional runtime telemetry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    /// error, warn, info, debug or trace.
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

impl TelemetrySettings {
    /// Resolve the configured level string, falling back to debug.
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(self.level.trim()).unwrap_or(LevelFilter::Debug)
    }
}

/// Persistent application settings consumed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppSettings {
    pub models: ModelSettings,
    pub enhance: EnhanceSettings,
    pub telemetry: TelemetrySettings,
}

impl AppSettings {
    /// Load settings from a JSON file. Missing sections take their defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let settings: AppSettings = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))?;
        Ok(settings)
    }

    /// Write settings as pretty-printed JSON, creating parent directories.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize settings JSON")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write settings file {}", path.display()))?;
        Ok(())
    }
}

/// Default location of persisted settings (`config/portrait_settings.json`).
pub fn default_settings_path() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join("config/portrait_settings.json"))
        .unwrap_or_else(|_| PathBuf::from("config/portrait_settings.json"))
}
