//! Error types for the verification harness

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("playwright not found; install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("node executable not found on PATH")]
    NodeNotFound,

    #[error("app failed to start: {0}")]
    AppSpawn(String),

    #[error("app never became ready at {url} after {attempts} attempts")]
    AppNotReady { url: String, attempts: usize },

    #[error("flow script failed: {0}")]
    Script(String),

    #[error("flow timed out after {0}s")]
    RunTimeout(u64),

    #[error("screenshot not written: {}", .0.display())]
    CaptureMissing(PathBuf),

    #[error("screenshot is empty: {}", .0.display())]
    CaptureEmpty(PathBuf),

    #[error("screenshot {} did not decode: {}", .0.display(), .1)]
    CaptureUndecodable(PathBuf, #[source] image::ImageError),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config encode error: {0}")]
    ConfigEncode(#[from] toml::ser::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
