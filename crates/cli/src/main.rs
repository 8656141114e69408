//! quotecheck - drives the quotes app's discount flow end to end
//!
//! Signs into the app, opens a quote's edit page, applies a percentage
//! discount, saves, and captures a screenshot for review. Exit code 0
//! means the flow ran and the capture looks sane, 1 means the flow (or
//! the capture) failed, 2 means the harness itself could not run.

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quotecheck_harness::browser::Engine;
use quotecheck_harness::{Runner, RunnerConfig};

mod output;

use output::OutputFormat;

/// Drive the quotes app through login and a discount edit, then capture
/// a verification screenshot.
#[derive(Parser, Debug)]
#[command(name = "quotecheck")]
#[command(author, version, about)]
struct Args {
    /// TOML config file (missing file means defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the app
    #[arg(long)]
    base_url: Option<String>,

    /// Path probed until the app responds
    #[arg(long)]
    ready_path: Option<String>,

    /// Command that launches the app, whitespace separated (e.g. "npm
    /// run dev"); without it the harness attaches to a running instance
    #[arg(long)]
    app_cmd: Option<String>,

    /// Working directory for --app-cmd
    #[arg(long)]
    app_dir: Option<PathBuf>,

    /// Seconds to wait for the app to respond
    #[arg(long)]
    ready_timeout_secs: Option<u64>,

    /// Account email for login
    #[arg(long, env = "QUOTECHECK_EMAIL")]
    email: Option<String>,

    /// Account password for login
    #[arg(long, env = "QUOTECHECK_PASSWORD")]
    password: Option<String>,

    /// Company owning the quote
    #[arg(long)]
    company_id: Option<String>,

    /// Quote whose edit page is exercised
    #[arg(long)]
    quote_id: Option<String>,

    /// Discount type option value
    #[arg(long)]
    discount_type: Option<String>,

    /// Discount value to type in
    #[arg(long)]
    discount_value: Option<String>,

    /// Screenshot output path
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Capture the full scrollable page
    #[arg(long)]
    full_page: bool,

    /// Selector wait timeout in milliseconds
    #[arg(long)]
    wait_timeout_ms: Option<u64>,

    /// Browser engine (chromium, firefox, webkit)
    #[arg(long)]
    engine: Option<String>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,

    /// Viewport width
    #[arg(long)]
    viewport_width: Option<u32>,

    /// Viewport height
    #[arg(long)]
    viewport_height: Option<u32>,

    /// Directory whose node_modules provides playwright
    #[arg(long)]
    node_dir: Option<PathBuf>,

    /// Seconds before the whole browser run is aborted
    #[arg(long)]
    run_timeout_secs: Option<u64>,

    /// Report format
    #[arg(long, default_value = "table")]
    format: OutputFormat,

    /// Print the generated Playwright script and exit
    #[arg(long)]
    print_script: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    // Logs go to stderr so the report on stdout stays parseable.
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    match rt.block_on(run(args)) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(2);
        }
    }
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let mut config = match &args.config {
        Some(path) => {
            if path.exists() {
                info!("loading config from {}", path.display());
            } else {
                warn!("config file {} not found, using defaults", path.display());
            }
            RunnerConfig::load(path)?
        }
        None => RunnerConfig::default(),
    };
    apply_overrides(&mut config, &args)?;

    let mut runner = Runner::new(config);

    if args.print_script {
        print!("{}", runner.script()?);
        return Ok(true);
    }

    let report = runner.run().await?;
    output::print_report(&report, args.format);
    Ok(report.ok)
}

/// Command-line flags win over the config file.
fn apply_overrides(config: &mut RunnerConfig, args: &Args) -> anyhow::Result<()> {
    if let Some(v) = &args.base_url {
        config.app.base_url = v.clone();
    }
    if let Some(v) = &args.ready_path {
        config.app.ready_path = v.clone();
    }
    if let Some(cmd) = &args.app_cmd {
        let argv: Vec<String> = cmd.split_whitespace().map(str::to_string).collect();
        if argv.is_empty() {
            anyhow::bail!("--app-cmd must not be empty");
        }
        config.app.command = Some(argv);
    }
    if let Some(v) = &args.app_dir {
        config.app.dir = Some(v.clone());
    }
    if let Some(v) = args.ready_timeout_secs {
        config.app.ready_timeout_secs = v;
    }

    if let Some(v) = &args.email {
        config.flow.email = v.clone();
    }
    if let Some(v) = &args.password {
        config.flow.password = v.clone();
    }
    if let Some(v) = &args.company_id {
        config.flow.company_id = v.clone();
    }
    if let Some(v) = &args.quote_id {
        config.flow.quote_id = v.clone();
    }
    if let Some(v) = &args.discount_type {
        config.flow.discount_type = v.clone();
    }
    if let Some(v) = &args.discount_value {
        config.flow.discount_value = v.clone();
    }
    if let Some(v) = &args.screenshot {
        config.flow.screenshot = v.clone();
    }
    if args.full_page {
        config.flow.full_page = true;
    }
    if let Some(v) = args.wait_timeout_ms {
        config.flow.wait_timeout_ms = v;
    }

    if let Some(v) = &args.engine {
        config.browser.engine = match v.as_str() {
            "firefox" => Engine::Firefox,
            "webkit" => Engine::Webkit,
            _ => Engine::Chromium,
        };
    }
    if args.headed {
        config.browser.headless = false;
    }
    if let Some(v) = args.viewport_width {
        config.browser.viewport_width = v;
    }
    if let Some(v) = args.viewport_height {
        config.browser.viewport_height = v;
    }
    if let Some(v) = &args.node_dir {
        config.browser.node_dir = v.clone();
    }
    if let Some(v) = args.run_timeout_secs {
        config.browser.run_timeout_secs = v;
    }

    Ok(())
}
