//! End-to-end run: directories, browser session, animation, report, manifest.

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::browser::BrowserLauncher;
use crate::config::RunConfig;
use crate::frames::{AnimationOptions, AnimationOutcome, FrameSequence, Imaging, write_animation};
use crate::harness::login::login_steps;
use crate::harness::session::run_session;
use crate::harness::steps::StepContext;
use crate::harness::types::{HarnessError, HarnessResult, Step};
use crate::output::OutputLayout;
use crate::report::{ReportContext, write_report};
use crate::runner::RunResult;

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run: RunResult,
    pub animation: AnimationOutcome,
    /// Number of frames captured during the run
    pub frames_captured: usize,
    pub timestamp: DateTime<Local>,
    #[serde(skip)]
    pub layout: OutputLayout,
}

/// Run the login scenario and write all artifacts
pub async fn run_login_check<L: BrowserLauncher>(
    launcher: &L,
    config: &RunConfig,
    imaging: &dyn Imaging,
) -> HarnessResult<RunOutcome> {
    run_scenario(launcher, config, imaging, &login_steps(config)).await
}

/// Run any step list through the full pipeline.
///
/// Only output-directory and report I/O failures are returned as errors;
/// browser and imaging failures are recorded in the outcome.
pub async fn run_scenario<L: BrowserLauncher>(
    launcher: &L,
    config: &RunConfig,
    imaging: &dyn Imaging,
    steps: &[Step],
) -> HarnessResult<RunOutcome> {
    let timestamp = Local::now();
    let layout = OutputLayout::new(config);
    layout
        .init()
        .map_err(|e| HarnessError::Setup(format!("cannot create {}: {}", layout.dir.display(), e)))?;
    let stale = layout.clear_screenshots()?;
    if stale > 0 {
        debug!(count = stale, "Removed screenshots from an earlier run");
    }
    info!(output = %layout.dir.display(), base_url = %config.base_url, "Output directories ready");

    let mut frames = FrameSequence::new();
    let ctx = StepContext {
        layout: &layout,
        imaging,
        frame_size: config.frame_size,
    };
    let run = run_session(launcher, steps, &ctx, &mut frames).await;
    info!(passed = run.passed(), total = run.total(), "Steps finished");

    let options = AnimationOptions::default().frame_delay_ms(config.frame_delay_ms);
    let animation = match write_animation(imaging, &frames, &layout.animation_path, &options) {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(error = %err, "Animation generation failed");
            AnimationOutcome::Failed { error: err.to_string() }
        }
    };

    let report_ctx = ReportContext::new(
        &layout,
        &config.base_url,
        launcher.engine(),
        config.frame_size,
        options.fps(),
        animation.clone(),
        timestamp,
    );
    write_report(&layout.report_path, &run, &report_ctx)?;
    layout.write_manifest(&run, timestamp)?;

    Ok(RunOutcome {
        run,
        animation,
        frames_captured: frames.len(),
        timestamp,
        layout,
    })
}
