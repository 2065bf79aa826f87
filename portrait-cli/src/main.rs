//! Portrait enhancement command-line tool.

mod args;
mod config;
mod input;
mod report;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use portrait_core::{CancelToken, ModelRegistry, PortraitEnhancer, PortraitMasks};
use portrait_utils::{
    EnhanceSettings, configure_telemetry, init_logging, load_image, normalize_path, save_rgba,
};

use crate::{
    args::EnhanceArgs,
    config::{apply_cli_overrides, load_settings},
    input::{ProcessingItem, plan_outputs, stem_of},
    report::{ImageReport, write_report},
};

fn main() -> Result<()> {
    init_logging(log::LevelFilter::Info)?;
    let args = EnhanceArgs::parse();

    let mut settings = load_settings(args.config.as_ref())?;
    apply_cli_overrides(&mut settings, &args);
    configure_telemetry(
        settings.telemetry.enabled,
        settings.telemetry.level_filter(),
    );

    let input_path = normalize_path(&args.input)?;
    let items = plan_outputs(&input_path, &args.output)?;

    let mut models = settings.models.clone();
    if !settings.enhance.upscale.enabled {
        models.super_resolution.path = None;
    }
    let registry = ModelRegistry::new();
    let collaborators = registry.collaborators(&models)?;
    info!("Models ready: {}", registry.loaded().join(", "));
    let enhancer = PortraitEnhancer::new(collaborators, settings.enhance.clone());

    info!(
        "Processing {} image(s) with the {} filter...",
        items.len(),
        settings.enhance.filter
    );
    let mut reports = Vec::with_capacity(items.len());
    for item in &items {
        let report = match process_item(
            &enhancer,
            &settings.enhance,
            item,
            args.dump_masks.as_deref(),
        ) {
            Ok(report) => report,
            Err(err) => {
                warn!("Failed to process {}: {err:#}", item.source.display());
                ImageReport::error(&item.source, &err)
            }
        };
        reports.push(report);
    }

    if let Some(report_path) = args.report.as_ref() {
        write_report(report_path, &reports)?;
        info!("Wrote report to {}", report_path.display());
    }

    let enhanced = reports.iter().filter(|r| r.status == "enhanced").count();
    info!("{enhanced} of {} image(s) enhanced", reports.len());
    if reports.iter().all(ImageReport::is_error) {
        anyhow::bail!("all images failed; no output written");
    }
    Ok(())
}

fn process_item(
    enhancer: &PortraitEnhancer,
    settings: &EnhanceSettings,
    item: &ProcessingItem,
    dump_dir: Option<&Path>,
) -> Result<ImageReport> {
    let image = load_image(&item.source)?;
    let outcome = enhancer.run(&image, settings, &CancelToken::never(), dump_dir.is_some());
    info!("{} -> {}", item.source.display(), outcome.status);

    save_rgba(&outcome.image, &item.destination)?;
    let mut report = ImageReport::from_status(&item.source, &outcome.status, outcome.region);
    report.output = Some(item.destination.display().to_string());

    if let (Some(dir), Some(masks)) = (dump_dir, outcome.masks.as_ref()) {
        let written = dump_masks(dir, &stem_of(&item.source), masks)?;
        report.masks = written
            .iter()
            .map(|path| path.display().to_string())
            .collect();
    }
    Ok(report)
}

/// Save every mask as a black-and-white PNG named `<stem>_<mask>.png`.
fn dump_masks(dir: &Path, stem: &str, masks: &PortraitMasks) -> Result<Vec<PathBuf>> {
    masks
        .named()
        .into_iter()
        .map(|(name, mask)| {
            let path = dir.join(format!("{stem}_{name}.png"));
            save_rgba(&mask.to_visualization(), &path)?;
            Ok(path)
        })
        .collect()
}
