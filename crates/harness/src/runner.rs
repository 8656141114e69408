//! Run orchestration and top-level configuration

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::app::{AppConfig, AppHandle};
use crate::browser::{BrowserConfig, PlaywrightRunner, StepFailure, StepReport};
use crate::capture::{self, CaptureReport};
use crate::error::HarnessResult;
use crate::flow::FlowConfig;
use crate::script;

/// Complete harness configuration, loadable from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub app: AppConfig,
    pub browser: BrowserConfig,
    pub flow: FlowConfig,
}

impl RunnerConfig {
    /// Load configuration from a TOML file. A missing file means
    /// defaults; sections and keys left out of the file keep theirs.
    pub fn load(path: &Path) -> HarnessResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> HarnessResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Result of one verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub ok: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Steps the flow completed, in order.
    pub steps: Vec<StepReport>,
    /// Set when the flow stopped early or the capture failed inspection.
    pub failed: Option<StepFailure>,
    /// Present when the flow completed and the screenshot was inspected.
    pub capture: Option<CaptureReport>,
}

/// Drives one verification run end to end: app readiness, the browser
/// flow, and capture inspection.
pub struct Runner {
    config: RunnerConfig,
    app: Option<AppHandle>,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config, app: None }
    }

    /// The Playwright program this configuration would run.
    pub fn script(&self) -> HarnessResult<String> {
        let flow = self.resolved_flow()?;
        Ok(script::build_script(
            &self.config.browser,
            &self.config.app.base_url,
            &flow.steps(),
        ))
    }

    /// Screenshot paths are resolved against the harness cwd; node runs
    /// somewhere else entirely.
    fn resolved_flow(&self) -> HarnessResult<FlowConfig> {
        let mut flow = self.config.flow.clone();
        if !flow.screenshot.is_absolute() {
            flow.screenshot = std::env::current_dir()?.join(&flow.screenshot);
        }
        Ok(flow)
    }

    /// Run the verification. Flow failures come back inside the report;
    /// an `Err` means the harness itself could not do its job.
    pub async fn run(&mut self) -> HarnessResult<RunReport> {
        let started_at = Utc::now();
        let t0 = Instant::now();

        let flow = self.resolved_flow()?;
        if let Some(parent) = flow.screenshot.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Check the toolchain before spawning anything.
        let runner = PlaywrightRunner::new(self.config.browser.clone())?;

        let app = AppHandle::start(self.config.app.clone()).await?;
        self.app = Some(app);

        let steps = flow.steps();
        info!(
            "driving {} steps against {}",
            steps.len(),
            self.config.app.base_url
        );
        let program = script::build_script(&self.config.browser, &self.config.app.base_url, &steps);
        let outcome = runner.run(&program).await?;

        let mut failed = outcome.failure;
        let mut capture = None;

        match &failed {
            Some(failure) => {
                error!(
                    "flow failed at {}: {}",
                    failure.label.as_deref().unwrap_or("startup"),
                    failure.error
                );
            }
            None => match capture::inspect(&flow.screenshot) {
                Ok(report) => {
                    info!(
                        "captured {} ({}x{}, sha256 {})",
                        report.path.display(),
                        report.width,
                        report.height,
                        &report.sha256[..12]
                    );
                    capture = Some(report);
                }
                Err(e) => {
                    error!("screenshot inspection failed: {}", e);
                    failed = Some(StepFailure {
                        step: None,
                        label: Some(format!("inspect:{}", flow.screenshot.display())),
                        error: e.to_string(),
                    });
                }
            },
        }

        let duration_ms = t0.elapsed().as_millis() as u64;
        let ok = failed.is_none();
        if ok {
            info!("verification passed in {} ms", duration_ms);
        }

        Ok(RunReport {
            ok,
            started_at,
            duration_ms,
            steps: outcome.steps,
            failed,
            capture,
        })
    }

    /// Tear down a spawned app early; dropping the runner does this too.
    pub fn stop_app(&mut self) {
        if let Some(mut app) = self.app.take() {
            app.stop();
        }
    }
}
