//! Screenshot inspection
//!
//! The capture is reviewed by a human; inspection only catches screenshots
//! that are obviously broken (missing, truncated, blank) before anyone
//! bothers to look. Nothing here persists - the PNG on disk is the run's
//! only artifact.

use std::path::{Path, PathBuf};

use image::GenericImageView;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{HarnessError, HarnessResult};

/// What the harness knows about the captured screenshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureReport {
    pub path: PathBuf,
    pub bytes: u64,
    pub width: u32,
    pub height: u32,
    /// SHA-256 of the file, hex encoded. Lets a reviewer compare runs
    /// without opening the images.
    pub sha256: String,
    /// Every sampled pixel is identical - an all-one-color frame.
    pub uniform: bool,
}

/// Inspect the screenshot the flow wrote.
pub fn inspect(path: &Path) -> HarnessResult<CaptureReport> {
    if !path.exists() {
        return Err(HarnessError::CaptureMissing(path.to_path_buf()));
    }

    let data = std::fs::read(path)?;
    if data.is_empty() {
        return Err(HarnessError::CaptureEmpty(path.to_path_buf()));
    }

    let img = image::load_from_memory(&data)
        .map_err(|e| HarnessError::CaptureUndecodable(path.to_path_buf(), e))?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(HarnessError::CaptureEmpty(path.to_path_buf()));
    }

    let mut hasher = Sha256::new();
    hasher.update(&data);
    let sha256 = hex::encode(hasher.finalize());

    let uniform = is_uniform(&img);
    if uniform {
        warn!(
            "screenshot {} is a single flat color; the page may not have rendered",
            path.display()
        );
    }

    debug!(
        "captured {}x{} px, {} bytes, sha256 {}",
        width,
        height,
        data.len(),
        sha256
    );

    Ok(CaptureReport {
        path: path.to_path_buf(),
        bytes: data.len() as u64,
        width,
        height,
        sha256,
        uniform,
    })
}

/// Sample a pixel grid instead of every pixel; a 16x16 grid is plenty to
/// catch a flat frame.
fn is_uniform(img: &image::DynamicImage) -> bool {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let step_x = (width / 16).max(1);
    let step_y = (height / 16).max(1);

    let first = *rgba.get_pixel(0, 0);
    for y in (0..height).step_by(step_y as usize) {
        for x in (0..width).step_by(step_x as usize) {
            if *rgba.get_pixel(x, y) != first {
                return false;
            }
        }
    }
    true
}
