//! Browser session lifecycle around the step runner.

use tracing::{error, info, warn};

use crate::browser::{Browser, BrowserLauncher};
use crate::frames::FrameSequence;
use crate::harness::login::RUN_STEP_NAME;
use crate::harness::steps::{StepContext, run_steps};
use crate::harness::types::Step;
use crate::runner::RunResult;

/// Launch a browser, run `steps` on a fresh page and close the browser.
///
/// The browser is closed on every path once it has been launched. Launch and
/// page errors come back as a run with a single failed `Test execution` step.
pub async fn run_session<L: BrowserLauncher>(
    launcher: &L,
    steps: &[Step],
    ctx: &StepContext<'_>,
    frames: &mut FrameSequence,
) -> RunResult {
    info!(engine = launcher.engine(), "Launching browser");
    let mut browser = match launcher.launch().await {
        Ok(browser) => browser,
        Err(err) => {
            error!(error = %err, "Browser launch failed");
            return RunResult::aborted(RUN_STEP_NAME, err.to_string());
        }
    };

    let run = match browser.new_page().await {
        Ok(mut page) => run_steps(&mut page, steps, ctx, frames).await,
        Err(err) => {
            error!(error = %err, "Could not open a page");
            RunResult::aborted(RUN_STEP_NAME, err.to_string())
        }
    };

    if let Err(err) = browser.close().await {
        warn!(error = %err, "Browser did not close cleanly");
    } else {
        info!("Browser closed");
    }

    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{MockFault, MockLauncher};
    use crate::config::RunConfig;
    use crate::frames::{FrameSize, NoImaging};
    use crate::harness::login::login_steps;
    use crate::output::OutputLayout;

    async fn session_with(launcher: &MockLauncher) -> RunResult {
        let tmp = tempfile::tempdir().unwrap();
        let config = RunConfig::new("http://localhost:3000", tmp.path(), FrameSize::default());
        let layout = OutputLayout::new(&config);
        layout.init().unwrap();
        let ctx = StepContext {
            layout: &layout,
            imaging: &NoImaging,
            frame_size: config.frame_size,
        };
        let mut frames = FrameSequence::new();
        run_session(launcher, &login_steps(&config), &ctx, &mut frames).await
    }

    #[tokio::test]
    async fn test_browser_closed_after_run() {
        let launcher = MockLauncher::new();
        let run = session_with(&launcher).await;
        assert!(run.all_passed());
        assert_eq!(launcher.launch_count(), 1);
        assert_eq!(launcher.close_count(), 1);
    }

    #[tokio::test]
    async fn test_browser_closed_after_failing_steps() {
        let launcher = MockLauncher::new().fault(MockFault::Unreachable);
        let run = session_with(&launcher).await;
        assert_eq!(run.total(), 5);
        assert_eq!(run.passed(), 0);
        assert_eq!(launcher.close_count(), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_becomes_single_failed_step() {
        let launcher = MockLauncher::new().fault(MockFault::LaunchFailure("chromium not installed".to_string()));
        let run = session_with(&launcher).await;
        assert_eq!(run.total(), 1);
        assert_eq!(run.passed(), 0);
        assert_eq!(run.steps[0].name, RUN_STEP_NAME);
        assert_eq!(
            run.steps[0].error(),
            Some("Browser launch failed: chromium not installed")
        );
        assert_eq!(launcher.close_count(), 0);
    }
}
