//! Markdown report generation.
//!
//! The report has a fixed structure: test information, the animation, one
//! section per step, a summary table, the conclusion and an appendix
//! describing the artifacts.

use chrono::{DateTime, Local};
use std::fmt::{self, Write};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::frames::{AnimationOutcome, FrameSize};
use crate::output::OutputLayout;
use crate::runner::RunResult;

/// Report title
pub const REPORT_TITLE: &str = "Login Function Test Report";

/// Conclusion line when every step passed
pub const ALL_PASSED_CONCLUSION: &str = "✅ **All login tests passed**";

/// Conclusion line when at least one step failed
pub const SOME_FAILED_CONCLUSION: &str = "⚠️ **Some tests failed, please check**";

const TESTER: &str = "web-vision automation";
const TEST_TYPE: &str = "Functional test";

/// Run metadata shown in the report
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub timestamp: DateTime<Local>,
    pub base_url: String,
    /// Browser engine description, e.g. "Chromium (Playwright)"
    pub engine: String,
    pub host: String,
    pub frame_size: FrameSize,
    pub fps: u32,
    pub animation: AnimationOutcome,
    /// Name of the output root, used for the file tree
    pub output_name: String,
    /// Animation path relative to the report
    pub animation_ref: String,
    /// Screenshot directory relative to the report
    pub screenshot_dir_ref: String,
}

impl ReportContext {
    pub fn new(
        layout: &OutputLayout,
        base_url: &str,
        engine: &str,
        frame_size: FrameSize,
        fps: u32,
        animation: AnimationOutcome,
        timestamp: DateTime<Local>,
    ) -> Self {
        let output_name = layout
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| layout.dir.to_string_lossy().to_string());
        let screenshot_dir_ref = layout.screenshot_ref("");
        Self {
            timestamp,
            base_url: base_url.to_string(),
            engine: engine.to_string(),
            host: host_name(),
            frame_size,
            fps,
            animation,
            output_name,
            animation_ref: layout.animation_ref(),
            screenshot_dir_ref: screenshot_dir_ref.trim_end_matches('/').to_string(),
        }
    }
}

/// Local host name, or "unknown"
pub fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Conclusion line for a run
pub fn conclusion(run: &RunResult) -> &'static str {
    if run.all_passed() {
        ALL_PASSED_CONCLUSION
    } else {
        SOME_FAILED_CONCLUSION
    }
}

/// Render the full report
pub fn render_report(run: &RunResult, ctx: &ReportContext) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_markdown(&mut out, run, ctx);
    out
}

/// Render and write the report, replacing any earlier one
pub fn write_report(path: &Path, run: &RunResult, ctx: &ReportContext) -> std::io::Result<()> {
    let markdown = render_report(run, ctx);
    fs::write(path, markdown)?;
    info!(path = %path.display(), "Report written");
    Ok(())
}

fn write_markdown(out: &mut String, run: &RunResult, ctx: &ReportContext) -> fmt::Result {
    writeln!(out, "# {}", REPORT_TITLE)?;
    writeln!(out)?;

    write_information(out, ctx)?;
    write_animation(out, ctx)?;
    write_steps(out, run, ctx)?;
    write_summary(out, run, ctx)?;
    write_conclusion(out, run)?;
    write_appendix(out, run, ctx)
}

fn write_information(out: &mut String, ctx: &ReportContext) -> fmt::Result {
    writeln!(out, "## Test information")?;
    writeln!(out)?;
    writeln!(out, "| Item | Value |")?;
    writeln!(out, "|------|-------|")?;
    writeln!(out, "| Test time | {} |", ctx.timestamp.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "| Tester | {} |", TESTER)?;
    writeln!(
        out,
        "| Test environment | {} / {} (host: {}) |",
        cell(&ctx.engine),
        cell(&ctx.base_url),
        cell(&ctx.host)
    )?;
    writeln!(out, "| Test type | {} |", TEST_TYPE)?;
    writeln!(out)
}

fn write_animation(out: &mut String, ctx: &ReportContext) -> fmt::Result {
    writeln!(out, "## Test process animation")?;
    writeln!(out)?;
    match &ctx.animation {
        AnimationOutcome::Written { .. } => {
            writeln!(out, "![Test process animation]({})", ctx.animation_ref)?;
        }
        AnimationOutcome::NoFrames => {
            writeln!(out, "_No frames were captured, so no animation was generated._")?;
        }
        AnimationOutcome::Unavailable => {
            writeln!(out, "_Frame capture is unavailable, so no animation was generated._")?;
        }
        AnimationOutcome::Failed { error } => {
            writeln!(out, "_Animation generation failed: {}_", error)?;
        }
    }
    writeln!(out)
}

fn write_steps(out: &mut String, run: &RunResult, ctx: &ReportContext) -> fmt::Result {
    writeln!(out, "## Test steps")?;
    writeln!(out)?;
    for (i, step) in run.steps.iter().enumerate() {
        writeln!(out, "### Step {}: {}", i + 1, step.name)?;
        writeln!(out)?;
        writeln!(out, "**Status:** {}", step.status())?;
        writeln!(out)?;

        if let Some(screenshot) = step.screenshot() {
            writeln!(out, "![{}]({}/{})", step.name, ctx.screenshot_dir_ref, screenshot)?;
            writeln!(out)?;
        }
        if let Some(text) = step.observed_text() {
            writeln!(out, "**Page text:** {}", text)?;
            writeln!(out)?;
        }
        if let Some(error) = step.error() {
            writeln!(out, "**Error:**")?;
            writeln!(out)?;
            writeln!(out, "```text")?;
            writeln!(out, "{}", error)?;
            writeln!(out, "```")?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn write_summary(out: &mut String, run: &RunResult, ctx: &ReportContext) -> fmt::Result {
    writeln!(out, "## Test results summary")?;
    writeln!(out)?;
    writeln!(out, "| # | Step | Status | Details |")?;
    writeln!(out, "|---|------|--------|---------|")?;
    for (i, step) in run.steps.iter().enumerate() {
        let details = match (step.screenshot(), step.error()) {
            (_, Some(error)) => format!("`{}`", cell(&single_line(error))),
            (Some(screenshot), None) => format!("[view]({}/{})", ctx.screenshot_dir_ref, screenshot),
            (None, None) => String::new(),
        };
        writeln!(out, "| {} | {} | {} | {} |", i + 1, cell(&step.name), step.status(), details)?;
    }
    writeln!(out)
}

fn write_conclusion(out: &mut String, run: &RunResult) -> fmt::Result {
    writeln!(out, "## Conclusion")?;
    writeln!(out)?;
    writeln!(out, "| Metric | Value |")?;
    writeln!(out, "|--------|-------|")?;
    writeln!(out, "| Total steps | {} |", run.total())?;
    writeln!(out, "| Passed | {} |", run.passed())?;
    writeln!(out, "| Failed | {} |", run.failed())?;
    writeln!(out, "| Pass rate | **{}%** |", run.pass_rate_percent())?;
    writeln!(out)?;
    writeln!(out, "{}", conclusion(run))?;
    writeln!(out)
}

fn write_appendix(out: &mut String, run: &RunResult, ctx: &ReportContext) -> fmt::Result {
    writeln!(out, "## Appendix")?;
    writeln!(out)?;
    writeln!(out, "- Browser: {}", ctx.engine)?;
    writeln!(out, "- Animation: GIF, {} @ {}fps", ctx.frame_size, ctx.fps)?;
    writeln!(out, "- Screenshots: PNG, full viewport")?;
    writeln!(out)?;
    writeln!(out, "Output files:")?;
    writeln!(out)?;
    writeln!(out, "```text")?;
    writeln!(out, "{}/", ctx.output_name)?;
    if ctx.animation.is_written() {
        writeln!(out, "├── {}", ctx.animation_ref)?;
    }
    writeln!(out, "├── {}", crate::config::REPORT_FILE_NAME)?;
    writeln!(out, "├── {}", crate::config::MANIFEST_FILE_NAME)?;
    writeln!(out, "└── {}/", ctx.screenshot_dir_ref)?;
    let screenshots: Vec<&str> = run.steps.iter().filter_map(|s| s.screenshot()).collect();
    for (i, screenshot) in screenshots.iter().enumerate() {
        let branch = if i + 1 == screenshots.len() { "└──" } else { "├──" };
        writeln!(out, "    {} {}", branch, screenshot)?;
    }
    writeln!(out, "```")
}

/// Escape a value for use inside a table cell
fn cell(value: &str) -> String {
    value.replace('|', "\\|")
}

/// Collapse line breaks and backticks so text fits in an inline code span
fn single_line(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('`', "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::StepResult;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn context(animation: AnimationOutcome) -> ReportContext {
        ReportContext {
            timestamp: Local.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
            base_url: "http://localhost:3000".to_string(),
            engine: "Chromium (Playwright)".to_string(),
            host: "ci-runner".to_string(),
            frame_size: FrameSize::default(),
            fps: 10,
            animation,
            output_name: "test_output".to_string(),
            animation_ref: "test_process.gif".to_string(),
            screenshot_dir_ref: "screenshots".to_string(),
        }
    }

    fn written() -> AnimationOutcome {
        AnimationOutcome::Written {
            path: PathBuf::from("test_output/test_process.gif"),
            frames: 2,
            bytes: 2048,
        }
    }

    fn two_step_run(second_passes: bool) -> RunResult {
        let mut run = RunResult::new();
        run.push(StepResult::passed("Open login page", "01_login_page.png", None));
        if second_passes {
            run.push(StepResult::passed(
                "Verify login success",
                "02_login_success.png",
                Some("Welcome back, admin!".to_string()),
            ));
        } else {
            run.push(StepResult::failed(
                "Verify login success",
                "timeout after 5000ms: waiting for selector '.user-dashboard'",
            ));
        }
        run
    }

    #[test]
    fn test_conclusion_section_all_passed() {
        let mut out = String::new();
        write_conclusion(&mut out, &two_step_run(true)).unwrap();
        assert_eq!(
            out,
            "## Conclusion\n\
             \n\
             | Metric | Value |\n\
             |--------|-------|\n\
             | Total steps | 2 |\n\
             | Passed | 2 |\n\
             | Failed | 0 |\n\
             | Pass rate | **100%** |\n\
             \n\
             ✅ **All login tests passed**\n\
             \n"
        );
    }

    #[test]
    fn test_conclusion_section_some_failed() {
        let mut out = String::new();
        write_conclusion(&mut out, &two_step_run(false)).unwrap();
        assert!(out.contains("| Passed | 1 |"));
        assert!(out.contains("| Failed | 1 |"));
        assert!(out.contains("| Pass rate | **50%** |"));
        assert!(out.contains(SOME_FAILED_CONCLUSION));
        assert!(!out.contains(ALL_PASSED_CONCLUSION));
    }

    #[test]
    fn test_summary_table() {
        let mut out = String::new();
        write_summary(&mut out, &two_step_run(false), &context(written())).unwrap();
        assert_eq!(
            out,
            "## Test results summary\n\
             \n\
             | # | Step | Status | Details |\n\
             |---|------|--------|---------|\n\
             | 1 | Open login page | ✅ Passed | [view](screenshots/01_login_page.png) |\n\
             | 2 | Verify login success | ❌ Failed | `timeout after 5000ms: waiting for selector '.user-dashboard'` |\n\
             \n"
        );
    }

    #[test]
    fn test_table_cells_escape_pipes() {
        assert_eq!(cell("a|b"), "a\\|b");
        let mut out = String::new();
        let run = RunResult::aborted("Open | close", "pipe | broke\nat `line 2`");
        write_summary(&mut out, &run, &context(AnimationOutcome::NoFrames)).unwrap();
        assert!(out.contains("| 1 | Open \\| close | ❌ Failed | `pipe \\| broke at 'line 2'` |"));
    }

    #[test]
    fn test_step_sections_reference_screenshot_or_error() {
        let report = render_report(&two_step_run(false), &context(written()));
        assert!(report.contains("### Step 1: Open login page"));
        assert!(report.contains("![Open login page](screenshots/01_login_page.png)"));
        assert!(report.contains("### Step 2: Verify login success"));
        assert!(report.contains("timeout after 5000ms: waiting for selector '.user-dashboard'"));
        assert!(!report.contains("02_login_success.png"));
    }

    #[test]
    fn test_metadata_and_animation() {
        let report = render_report(&two_step_run(true), &context(written()));
        assert!(report.starts_with("# Login Function Test Report\n"));
        assert!(report.contains("| Test time | 2026-03-14 09:30:00 |"));
        assert!(report.contains("| Tester | web-vision automation |"));
        assert!(report.contains("| Test environment | Chromium (Playwright) / http://localhost:3000 (host: ci-runner) |"));
        assert!(report.contains("![Test process animation](test_process.gif)"));
        assert!(report.contains("**Page text:** Welcome back, admin!"));
        assert!(report.contains("- Animation: GIF, 128x128 @ 10fps"));
    }

    #[test]
    fn test_missing_animation_is_explained() {
        let report = render_report(&two_step_run(true), &context(AnimationOutcome::Unavailable));
        assert!(!report.contains("![Test process animation]"));
        assert!(report.contains("Frame capture is unavailable"));
        assert!(!report.contains("├── test_process.gif"));
    }

    #[test]
    fn test_appendix_file_tree() {
        let mut out = String::new();
        write_appendix(&mut out, &two_step_run(true), &context(written())).unwrap();
        assert!(out.ends_with(
            "test_output/\n\
             ├── test_process.gif\n\
             ├── test_report.md\n\
             ├── results.json\n\
             └── screenshots/\n    \
             ├── 01_login_page.png\n    \
             └── 02_login_success.png\n\
             ```\n"
        ));
    }

    #[test]
    fn test_write_report_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test_report.md");
        fs::write(&path, "stale").unwrap();

        write_report(&path, &two_step_run(true), &context(written())).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("stale"));
        assert!(text.contains(ALL_PASSED_CONCLUSION));
    }
}
