//! Step runner: executes scenario steps against a page, one at a time.
//!
//! Every step goes through [`run_step`], which turns whatever happens during
//! the step into a [`StepResult`]. A failing step never stops the steps after
//! it.

use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::browser::{BrowserError, Page};
use crate::frames::{FrameError, FrameSequence, FrameSize, Imaging};
use crate::harness::types::{Step, StepAction};
use crate::output::{OutputLayout, screenshot_file_name};
use crate::runner::{RunResult, StepResult};

/// What a step needs besides the page
pub struct StepContext<'a> {
    pub layout: &'a OutputLayout,
    pub imaging: &'a dyn Imaging,
    pub frame_size: FrameSize,
}

/// Anything that can go wrong inside one step; rendered verbatim in the report
#[derive(Debug, Error)]
enum StepError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Failed to save screenshot {path}: {source}")]
    Screenshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What a passed step leaves behind
struct StepArtifacts {
    screenshot: String,
    observed_text: Option<String>,
}

/// Run every step in order and collect their results
pub async fn run_steps<P: Page>(
    page: &mut P,
    steps: &[Step],
    ctx: &StepContext<'_>,
    frames: &mut FrameSequence,
) -> RunResult {
    let mut run = RunResult::new();
    for (index, step) in steps.iter().enumerate() {
        let result = run_step(page, index + 1, step, ctx, frames).await;
        run.push(result);
    }
    run
}

/// Run one step and capture its outcome. `number` starts at 1.
pub async fn run_step<P: Page>(
    page: &mut P,
    number: usize,
    step: &Step,
    ctx: &StepContext<'_>,
    frames: &mut FrameSequence,
) -> StepResult {
    info!(step = number, name = %step.name, action = %step.action, "Running step");

    match execute(page, number, step, ctx, frames).await {
        Ok(artifacts) => {
            info!(step = number, screenshot = %artifacts.screenshot, "Step passed");
            StepResult::passed(&step.name, artifacts.screenshot, artifacts.observed_text)
        }
        Err(err) => {
            error!(step = number, name = %step.name, error = %err, "Step failed");
            StepResult::failed(&step.name, err.to_string())
        }
    }
}

async fn execute<P: Page>(
    page: &mut P,
    number: usize,
    step: &Step,
    ctx: &StepContext<'_>,
    frames: &mut FrameSequence,
) -> Result<StepArtifacts, StepError> {
    perform(page, &step.action).await?;

    let png = page.screenshot().await?;

    if let Some(frame) = ctx.imaging.capture_frame(&png, ctx.frame_size)? {
        frames.push(frame);
        debug!(step = number, frames = frames.len(), "Frame captured");
    }

    let file_name = screenshot_file_name(number, &step.slug);
    let path = ctx.layout.screenshot_path(&file_name);
    fs::write(&path, &png).map_err(|source| StepError::Screenshot {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), bytes = png.len(), "Screenshot saved");

    let observed_text = match &step.read_text {
        Some(selector) => {
            let text = page.text_content(selector).await?;
            info!(step = number, selector = %selector, text = ?text, "Read page text");
            text
        }
        None => None,
    };

    Ok(StepArtifacts {
        screenshot: file_name,
        observed_text,
    })
}

async fn perform<P: Page>(page: &mut P, action: &StepAction) -> Result<(), BrowserError> {
    match action {
        StepAction::Navigate {
            url,
            wait_for_network_idle,
        } => {
            page.goto(url).await?;
            if *wait_for_network_idle {
                page.wait_for_network_idle().await?;
            }
            Ok(())
        }
        StepAction::Fill { selector, value, .. } => page.fill(selector, value).await,
        StepAction::Click { selector } => page.click(selector).await,
        StepAction::ClickAndAwaitNavigation { selector, timeout_ms } => {
            page.click_and_wait_for_navigation(selector, *timeout_ms).await
        }
        StepAction::WaitForSelector { selector, timeout_ms } => page.wait_for_selector(selector, *timeout_ms).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{Browser, BrowserLauncher, MockFault, MockLauncher};
    use crate::config::RunConfig;
    use crate::frames::{ImageCodec, NoImaging};
    use crate::harness::login::{SUBMIT_SELECTOR, USERNAME_SELECTOR, login_steps};

    async fn run_with(launcher: MockLauncher, imaging: &dyn Imaging) -> (RunResult, FrameSequence, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let config = RunConfig::new("http://localhost:3000", tmp.path(), FrameSize::new(32, 32).unwrap());
        let layout = OutputLayout::new(&config);
        layout.init().unwrap();

        let ctx = StepContext {
            layout: &layout,
            imaging,
            frame_size: config.frame_size,
        };
        let mut browser = launcher.launch().await.unwrap();
        let mut page = browser.new_page().await.unwrap();
        let mut frames = FrameSequence::new();
        let run = run_steps(&mut page, &login_steps(&config), &ctx, &mut frames).await;
        browser.close().await.unwrap();
        (run, frames, tmp)
    }

    #[tokio::test]
    async fn test_all_steps_pass() {
        let (run, frames, tmp) = run_with(MockLauncher::new(), &ImageCodec).await;

        assert_eq!(run.total(), 5);
        assert_eq!(run.passed(), 5);
        assert_eq!(frames.len(), 5);
        assert!(frames.iter().all(|f| (f.width(), f.height()) == (32, 32)));
        assert_eq!(run.steps[4].observed_text(), Some("Welcome back, admin!"));
        assert!(tmp.path().join("screenshots/05_login_success.png").exists());
    }

    #[tokio::test]
    async fn test_failed_step_does_not_stop_later_steps() {
        let launcher = MockLauncher::new().fault(MockFault::MissingElement(USERNAME_SELECTOR.to_string()));
        let (run, frames, _tmp) = run_with(launcher, &ImageCodec).await;

        assert_eq!(run.total(), 5);
        assert!(!run.steps[1].is_passed());
        assert!(run.steps[1].error().unwrap().contains(USERNAME_SELECTOR));
        // Without a username the login never navigates
        assert!(run.steps[3].error().unwrap().contains("timeout"));
        assert!(!run.steps[4].is_passed());
        assert_eq!(frames.len(), 2);
    }

    #[tokio::test]
    async fn test_no_imaging_skips_frames_only() {
        let (run, frames, tmp) = run_with(MockLauncher::new(), &NoImaging).await;

        assert_eq!(run.passed(), 5);
        assert!(frames.is_empty());
        assert_eq!(fs::read_dir(tmp.path().join("screenshots")).unwrap().count(), 5);
    }

    #[tokio::test]
    async fn test_screenshot_failure_fails_each_step() {
        let launcher = MockLauncher::new().fault(MockFault::ScreenshotFailure);
        let (run, frames, _tmp) = run_with(launcher, &ImageCodec).await;

        assert_eq!(run.passed(), 0);
        assert!(frames.is_empty());
        assert!(run.steps.iter().all(|s| s.error() == Some("Browser error: screenshot capture failed")));
    }

    #[tokio::test]
    async fn test_perform_click_without_navigation() {
        let launcher = MockLauncher::new();
        let mut browser = launcher.launch().await.unwrap();
        let mut page = browser.new_page().await.unwrap();
        perform(
            &mut page,
            &StepAction::Navigate {
                url: "http://localhost:3000/login.html".to_string(),
                wait_for_network_idle: false,
            },
        )
        .await
        .unwrap();
        perform(
            &mut page,
            &StepAction::Click {
                selector: SUBMIT_SELECTOR.to_string(),
            },
        )
        .await
        .unwrap();
    }
}
