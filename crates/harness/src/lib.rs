//! Quotecheck verification harness
//!
//! Drives the quotes web app's login and discount-edit flow through a
//! real browser and captures a screenshot for manual review. Rust stays
//! in control end to end:
//!
//! ```text
//! Runner
//!   |- AppHandle::start()      spawn or attach, poll until serving
//!   |- FlowConfig::steps()     the fixed step sequence
//!   |- build_script(..)        one Playwright program for the whole flow
//!   |- PlaywrightRunner::run() node + JSON progress protocol on stdout
//!   `- capture::inspect()      screenshot sanity checks + hash
//! ```
//!
//! The whole flow runs in a single browser session so the login cookie
//! survives into the quote edit. The screenshot is the run's only
//! persisted output; everything else is logs and the in-memory
//! [`RunReport`].

pub mod app;
pub mod browser;
pub mod capture;
pub mod error;
pub mod flow;
pub mod runner;
pub mod script;
pub mod step;

pub use error::{HarnessError, HarnessResult};
pub use flow::FlowConfig;
pub use runner::{RunReport, Runner, RunnerConfig};
pub use step::Step;
