//! Web Vision - headless browser login-flow testing with visual artifacts.
//!
//! This crate provides:
//! - A five-step login scenario driven through a headless browser
//! - Per-step screenshots and downsized frames assembled into a looping GIF
//! - A Markdown report with a pass/fail summary
//! - A Playwright bridge for real runs and a scripted mock browser for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use web_vision::browser::PlaywrightLauncher;
//! use web_vision::config::{self, RunConfig};
//! use web_vision::frames;
//! use web_vision::harness::run_login_check;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RunConfig::from(config::get());
//! let imaging = frames::detect(true);
//! let outcome = run_login_check(&PlaywrightLauncher::default(), &config, imaging.as_ref()).await?;
//! println!("{}/{} steps passed", outcome.run.passed(), outcome.run.total());
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod frames;
pub mod harness;
pub mod output;
pub mod report;
pub mod runner;

// Re-export result types
pub use runner::{RunResult, StepOutcome, StepResult, StepStatus};

// Re-export harness types
pub use harness::{
    HarnessError, HarnessResult, RunOutcome, Step, StepAction, login_steps, run_login_check, run_scenario,
};

// Re-export browser capability and implementations
pub use browser::{
    Browser, BrowserError, BrowserLauncher, BrowserResult, MockFault, MockLauncher, Page, PlaywrightConfig,
    PlaywrightLauncher,
};

// Re-export imaging
pub use frames::{AnimationOutcome, FrameError, FrameResult, FrameSize, ImageCodec, Imaging, NoImaging};

// Re-export configuration and output layout
pub use config::{Config, RunConfig};
pub use output::OutputLayout;
pub use report::{ReportContext, render_report, write_report};
