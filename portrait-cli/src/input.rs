//! Input collection and output path planning.

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::debug;
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// One image to enhance and where its result goes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingItem {
    pub source: PathBuf,
    pub destination: PathBuf,
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Collect all image paths from a file or directory.
pub fn collect_images(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        anyhow::bail!(
            "input path is neither file nor directory: {}",
            path.display()
        );
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        if is_image(entry.path()) {
            images.push(entry.path().to_path_buf());
        } else {
            debug!("Skipping non-image file {}", entry.path().display());
        }
    }
    images.sort();
    Ok(images)
}

/// Pair every input image with its output path.
///
/// A file input writes to `output` as given. A directory input mirrors its
/// layout under `output`, keeping file names.
pub fn plan_outputs(input: &Path, output: &Path) -> Result<Vec<ProcessingItem>> {
    let images = collect_images(input)?;
    if images.is_empty() {
        anyhow::bail!(
            "no images found at {} (supported extensions: {})",
            input.display(),
            IMAGE_EXTENSIONS.join(", ")
        );
    }

    if input.is_file() {
        return Ok(vec![ProcessingItem {
            source: input.to_path_buf(),
            destination: output.to_path_buf(),
        }]);
    }

    Ok(images
        .into_iter()
        .map(|source| {
            let relative = source.strip_prefix(input).unwrap_or(&source).to_path_buf();
            ProcessingItem {
                destination: output.join(relative),
                source,
            }
        })
        .collect())
}

/// File stem used to name per-image side outputs such as mask dumps.
pub fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}
