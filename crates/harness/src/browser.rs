//! Script execution under node and the stdout progress protocol

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::error::{HarnessError, HarnessResult};

/// Browser engine to drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Chromium => "chromium",
            Engine::Firefox => "firefox",
            Engine::Webkit => "webkit",
        }
    }
}

/// Configuration for browser execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Browser engine.
    pub engine: Engine,

    /// Run without a visible window.
    pub headless: bool,

    /// Viewport dimensions for the page context.
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Directory whose `node_modules` resolves `playwright`; node runs with
    /// this as its working directory.
    pub node_dir: PathBuf,

    /// Wall-clock limit for the whole flow, in seconds.
    pub run_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            engine: Engine::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            node_dir: PathBuf::from("."),
            run_timeout_secs: 120,
        }
    }
}

/// A step the generated script completed, as reported on stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    /// 1-based position in the flow.
    pub step: usize,
    pub label: String,
    /// Milliseconds since the script started.
    pub ms: u64,
}

/// Terminal failure of a run. The script names the step that failed;
/// failures after the flow itself (screenshot inspection) reuse the shape
/// with no step index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: Option<usize>,
    pub label: Option<String>,
    pub error: String,
}

/// Everything the script reported before exiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptOutcome {
    pub steps: Vec<StepReport>,
    pub failure: Option<StepFailure>,
}

/// One line of the stdout protocol.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProtocolLine {
    Progress {
        step: usize,
        label: String,
        ms: u64,
    },
    Final {
        ok: bool,
        #[serde(default)]
        step: Option<usize>,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
}

fn parse_line(line: &str) -> Option<ProtocolLine> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

fn tail_of(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= max {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - max;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &trimmed[start..])
}

/// Runs generated Playwright scripts.
pub struct PlaywrightRunner {
    config: BrowserConfig,
}

impl PlaywrightRunner {
    /// Create a runner, verifying the toolchain up front so a missing
    /// install fails before the app is touched.
    pub fn new(config: BrowserConfig) -> HarnessResult<Self> {
        Self::check_playwright_installed(&config)?;
        Ok(Self { config })
    }

    fn check_playwright_installed(config: &BrowserConfig) -> HarnessResult<()> {
        let status = std::process::Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(&config.node_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(HarnessError::PlaywrightNotFound),
        }
    }

    /// Execute the script and collect the protocol it reports.
    ///
    /// Fails with `Err` only for harness-level problems (node missing, run
    /// timeout, no result line at all); a flow that ran and failed at a
    /// step comes back as `Ok` with [`ScriptOutcome::failure`] set.
    pub async fn run(&self, script: &str) -> HarnessResult<ScriptOutcome> {
        let dir = tempfile::tempdir()?;
        let script_path = dir.path().join("flow.js");
        std::fs::write(&script_path, script)?;

        debug!("running flow script: {}", script_path.display());

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(&self.config.node_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => HarnessError::NodeNotFound,
                _ => HarnessError::Io(e),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HarnessError::Script("stdout not captured".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| HarnessError::Script("stderr not captured".into()))?;

        // Drain stderr concurrently so a chatty node process cannot block
        // on a full pipe while we read stdout.
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let deadline = Instant::now() + Duration::from_secs(self.config.run_timeout_secs);
        let mut lines = BufReader::new(stdout).lines();
        let mut steps: Vec<StepReport> = Vec::new();
        let mut failure: Option<StepFailure> = None;
        let mut finished_ok = false;

        loop {
            let line = match timeout_at(deadline, lines.next_line()).await {
                Ok(read) => read?,
                Err(_) => {
                    warn!(
                        "flow timed out; killing node (last completed step: {})",
                        steps.last().map(|s| s.label.as_str()).unwrap_or("none")
                    );
                    let _ = child.kill().await;
                    stderr_task.abort();
                    return Err(HarnessError::RunTimeout(self.config.run_timeout_secs));
                }
            };
            let Some(line) = line else { break };

            match parse_line(&line) {
                Some(ProtocolLine::Progress { step, label, ms }) => {
                    debug!("step {} done: {} ({} ms)", step, label, ms);
                    steps.push(StepReport { step, label, ms });
                }
                Some(ProtocolLine::Final { ok: true, .. }) => {
                    finished_ok = true;
                }
                Some(ProtocolLine::Final {
                    ok: false,
                    step,
                    label,
                    error,
                }) => {
                    failure = Some(StepFailure {
                        step,
                        label,
                        error: error.unwrap_or_else(|| "unknown error".into()),
                    });
                }
                None => debug!("ignoring non-protocol output: {}", line),
            }
        }

        let status = match timeout_at(deadline, child.wait()).await {
            Ok(waited) => waited?,
            Err(_) => {
                let _ = child.kill().await;
                stderr_task.abort();
                return Err(HarnessError::RunTimeout(self.config.run_timeout_secs));
            }
        };
        let stderr_text = stderr_task.await.unwrap_or_default();

        if let Some(failure) = failure {
            return Ok(ScriptOutcome {
                steps,
                failure: Some(failure),
            });
        }

        if finished_ok {
            if !status.success() {
                warn!("node exited with {} after a successful flow", status);
            }
            return Ok(ScriptOutcome {
                steps,
                failure: None,
            });
        }

        // The script died without reporting a result; surface whatever node
        // printed instead.
        let tail = tail_of(&stderr_text, 2000);
        if tail.is_empty() {
            Err(HarnessError::Script(format!(
                "node exited with {status} before reporting a result"
            )))
        } else {
            Err(HarnessError::Script(format!(
                "node exited with {status}: {tail}"
            )))
        }
    }
}
