//! App management - attaching to or spawning the web app under verification

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{HarnessError, HarnessResult};

/// Configuration for reaching (or launching) the app.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL the browser drives.
    pub base_url: String,

    /// Path probed for readiness. The app has no dedicated health
    /// endpoint; any page that proves the server answers will do.
    pub ready_path: String,

    /// Command that launches the app (e.g. `npm run dev`). None attaches
    /// to an already-running instance.
    pub command: Option<Vec<String>>,

    /// Working directory for the command.
    pub dir: Option<PathBuf>,

    /// How long to wait for the app to respond, in seconds.
    pub ready_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            ready_path: "/login".to_string(),
            command: None,
            dir: None,
            ready_timeout_secs: 60,
        }
    }
}

/// Handle to the app under verification.
pub struct AppHandle {
    child: Option<Child>,
    base_url: String,
}

impl AppHandle {
    /// Spawn the app when a command is configured, then wait until it
    /// responds over HTTP.
    pub async fn start(config: AppConfig) -> HarnessResult<Self> {
        let child = match &config.command {
            Some(argv) => {
                let (program, args) = argv.split_first().ok_or_else(|| {
                    HarnessError::Config("app command must not be empty".into())
                })?;

                info!("spawning app: {}", argv.join(" "));

                let mut cmd = Command::new(program);
                cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
                if let Some(dir) = &config.dir {
                    cmd.current_dir(dir);
                }

                let mut child = cmd.spawn().map_err(|e| {
                    HarnessError::AppSpawn(format!("failed to spawn {program}: {e}"))
                })?;

                // A dev server is chatty; an undrained pipe would block it
                // once full.
                if let Some(stdout) = child.stdout.take() {
                    drain_into_log("stdout", stdout);
                }
                if let Some(stderr) = child.stderr.take() {
                    drain_into_log("stderr", stderr);
                }
                Some(child)
            }
            None => None,
        };

        let handle = AppHandle {
            child,
            base_url: config.base_url.clone(),
        };

        handle.wait_until_ready(&config).await?;
        Ok(handle)
    }

    /// Poll the ready path until the app answers or the timeout elapses.
    /// Anything below 5xx counts: login pages redirect, and a dev server
    /// that is still compiling responds with 500s.
    async fn wait_until_ready(&self, config: &AppConfig) -> HarnessResult<()> {
        let ready_url = format!(
            "{}{}",
            config.base_url.trim_end_matches('/'),
            config.ready_path
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let timeout = Duration::from_secs(config.ready_timeout_secs);
        let mut attempts = 0;

        while start.elapsed() < timeout {
            attempts += 1;

            match client.get(&ready_url).send().await {
                Ok(resp) if !resp.status().is_server_error() => {
                    info!("app is serving at {} ({})", ready_url, resp.status());
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("readiness probe returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("waiting for app at {}...", ready_url);
                    }
                    // Connection refused is expected while the app starts.
                    if !e.is_connect() && !e.is_timeout() {
                        warn!("readiness probe error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(500)).await;
        }

        Err(HarnessError::AppNotReady {
            url: ready_url,
            attempts,
        })
    }

    /// Base URL the flow runs against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop a spawned app; attach-only handles leave the app alone.
    pub fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        info!("stopping app (pid: {})", child.id());

        // Graceful shutdown first, then force.
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = child.kill();
        let _ = child.wait();
    }
}

impl Drop for AppHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Forward a child stream to the log, one line at a time. The reader
/// thread exits when the stream hits EOF.
fn drain_into_log(name: &'static str, stream: impl Read + Send + 'static) {
    std::thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            match line {
                Ok(line) => debug!("app {}: {}", name, line),
                Err(_) => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn attaches_once_the_app_responds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let config = AppConfig {
            base_url: server.uri(),
            ready_timeout_secs: 5,
            ..Default::default()
        };
        let handle = AppHandle::start(config).await.expect("app should be ready");
        assert_eq!(handle.base_url(), server.uri());
    }

    #[tokio::test]
    async fn a_compiling_dev_server_is_not_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = AppConfig {
            base_url: server.uri(),
            ready_timeout_secs: 1,
            ..Default::default()
        };
        let err = AppHandle::start(config)
            .await
            .err()
            .expect("a 500-only app must not count as ready");
        match err {
            HarnessError::AppNotReady { attempts, .. } => assert!(attempts >= 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn client_errors_count_as_serving() {
        // An auth wall on the probed path still proves the server is up.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let config = AppConfig {
            base_url: server.uri(),
            ready_timeout_secs: 5,
            ..Default::default()
        };
        assert!(AppHandle::start(config).await.is_ok());
    }

    #[tokio::test]
    async fn empty_app_command_is_rejected() {
        let config = AppConfig {
            command: Some(vec![]),
            ..Default::default()
        };
        let err = AppHandle::start(config)
            .await
            .err()
            .expect("empty command must fail");
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[tokio::test]
    async fn a_chatty_app_is_not_blocked_on_its_pipes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        // Well past the 64 KiB pipe buffer, then a marker file to prove
        // the command ran to completion instead of blocking on a write.
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("flushed");
        let config = AppConfig {
            base_url: server.uri(),
            command: Some(vec![
                "sh".into(),
                "-c".into(),
                format!("head -c 200000 /dev/zero; : > {}", marker.display()),
            ]),
            ready_timeout_secs: 5,
            ..Default::default()
        };
        let _handle = AppHandle::start(config).await.expect("app should be ready");

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !marker.exists() && std::time::Instant::now() < deadline {
            sleep(Duration::from_millis(50)).await;
        }
        assert!(marker.exists(), "spawned app never finished writing");
    }
}
