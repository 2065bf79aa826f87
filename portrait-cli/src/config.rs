//! Configuration loading and CLI override logic.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};
use portrait_utils::{AppSettings, config::default_settings_path, normalize_path};

use crate::args::EnhanceArgs;

/// Load application settings from a file or use defaults.
pub fn load_settings(config_path: Option<&PathBuf>) -> Result<AppSettings> {
    if let Some(path) = config_path {
        let resolved = normalize_path(path)?;
        let settings = AppSettings::load_from_path(&resolved)?;
        info!("Loaded settings from {}", resolved.display());
        Ok(settings)
    } else {
        let default_path = default_settings_path();
        if default_path.exists() {
            let settings = AppSettings::load_from_path(&default_path).with_context(|| {
                format!(
                    "failed to load default settings from {}",
                    default_path.display()
                )
            })?;
            info!("Loaded settings from {}", default_path.display());
            Ok(settings)
        } else {
            Ok(AppSettings::default())
        }
    }
}

/// Apply command-line arguments to override loaded or default settings.
pub fn apply_cli_overrides(settings: &mut AppSettings, args: &EnhanceArgs) {
    if args.telemetry {
        settings.telemetry.enabled = true;
    }
    if let Some(level) = args.telemetry_level.as_ref() {
        let normalized = level.trim();
        if !normalized.is_empty() {
            let lower = normalized.to_ascii_lowercase();
            settings.telemetry.level = lower.clone();
            if lower == "off" {
                settings.telemetry.enabled = false;
            }
        }
    }

    let enhance = &mut settings.enhance;
    if let Some(filter) = args.filter {
        enhance.filter = filter;
    }
    if args.no_upscale {
        enhance.upscale.enabled = false;
    }
    if args.parallel_tiles {
        enhance.upscale.parallel_tiles = true;
    }
    if args.hair {
        enhance.hair.enabled = true;
    }
    if let Some(strategy) = args.blend {
        enhance.blend.strategy = strategy;
    }
    if let Some(threshold) = args.person_threshold {
        if (0.0..=1.0).contains(&threshold) {
            enhance.masks.person_threshold = threshold;
        } else {
            warn!("ignoring --person-threshold {threshold}; expected a value in 0.0..=1.0");
        }
    }
    if let Some(radius) = args.feather_radius {
        enhance.masks.feather_radius = radius;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use portrait_utils::{BlendStrategy, FilterKind};

    fn parse(extra: &[&str]) -> EnhanceArgs {
        let mut argv = vec!["portrait-cli", "-i", "in.png", "-o", "out.png"];
        argv.extend_from_slice(extra);
        EnhanceArgs::try_parse_from(argv).expect("parse")
    }

    #[test]
    fn overrides_are_applied() {
        let mut settings = AppSettings::default();
        let args = parse(&[
            "--filter",
            "clear",
            "--no-upscale",
            "--hair",
            "--blend",
            "normalized",
            "--feather-radius",
            "7",
            "--person-threshold",
            "0.75",
            "--telemetry",
        ]);
        apply_cli_overrides(&mut settings, &args);

        assert_eq!(settings.enhance.filter, FilterKind::Clear);
        assert!(!settings.enhance.upscale.enabled);
        assert!(settings.enhance.hair.enabled);
        assert_eq!(settings.enhance.blend.strategy, BlendStrategy::Normalized);
        assert_eq!(settings.enhance.masks.feather_radius, 7);
        assert_eq!(settings.enhance.masks.person_threshold, 0.75);
        assert!(settings.telemetry.enabled);
    }

    #[test]
    fn out_of_range_threshold_is_ignored() {
        let mut settings = AppSettings::default();
        apply_cli_overrides(&mut settings, &parse(&["--person-threshold", "1.5"]));
        assert_eq!(settings.enhance.masks.person_threshold, 0.6);
    }

    #[test]
    fn telemetry_level_off_disables() {
        let mut settings = AppSettings::default();
        settings.telemetry.enabled = true;
        apply_cli_overrides(&mut settings, &parse(&["--telemetry-level", "OFF"]));
        assert!(!settings.telemetry.enabled);
        assert_eq!(settings.telemetry.level, "off");
    }

    #[test]
    fn explicit_config_must_exist() {
        let missing = PathBuf::from("definitely/not/here.json");
        assert!(load_settings(Some(&missing)).is_err());
    }
}
