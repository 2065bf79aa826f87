//! JSON status report written by `--report`.

use std::{
    fs::{self, File},
    path::Path,
};

use anyhow::{Context, Result};
use portrait_core::{EnhanceStatus, RegionRect, UpscaleReport};
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq)]
pub struct RegionRecord {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl From<RegionRect> for RegionRecord {
    fn from(rect: RegionRect) -> Self {
        Self {
            left: rect.left,
            top: rect.top,
            width: rect.width,
            height: rect.height,
        }
    }
}

/// Result of one image.
#[derive(Debug, Serialize)]
pub struct ImageReport {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// `enhanced`, `detection_miss`, `inference_failure`, ... or `error`
    /// when the image could not be read or written.
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upscale: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub masks: Vec<String>,
}

impl ImageReport {
    pub fn from_status(input: &Path, status: &EnhanceStatus, region: Option<RegionRect>) -> Self {
        let upscale = match status {
            EnhanceStatus::Enhanced { upscale } => Some(match upscale {
                UpscaleReport::NotRequested => "not_requested",
                UpscaleReport::Unavailable => "unavailable",
                UpscaleReport::Upscaled => "upscaled",
                UpscaleReport::Failed(_) => "failed",
            }),
            _ => None,
        };
        Self {
            input: input.display().to_string(),
            output: None,
            status: status.label().to_string(),
            message: status.to_string(),
            upscale,
            region: region.map(RegionRecord::from),
            masks: Vec::new(),
        }
    }

    pub fn error(input: &Path, err: &anyhow::Error) -> Self {
        Self {
            input: input.display().to_string(),
            output: None,
            status: "error".to_string(),
            message: format!("{err:#}"),
            upscale: None,
            region: None,
            masks: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub fn write_report(path: &Path, reports: &[ImageReport]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, reports)
        .with_context(|| format!("failed to write report JSON to {}", path.display()))
}
