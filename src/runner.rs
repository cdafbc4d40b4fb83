//! Types for test run results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pass/fail status of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepStatus {
    Passed,
    Failed,
}

impl StepStatus {
    /// Status marker used in reports and console output
    pub fn marker(&self) -> &'static str {
        match self {
            StepStatus::Passed => "✅",
            StepStatus::Failed => "❌",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Passed => write!(f, "{} Passed", self.marker()),
            StepStatus::Failed => write!(f, "{} Failed", self.marker()),
        }
    }
}

/// Outcome of one step: a screenshot on success, an error message on failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "UPPERCASE")]
pub enum StepOutcome {
    Passed {
        /// Screenshot file name, relative to the screenshot directory
        screenshot: String,
        /// Text read back from the page after the step, if the step reads any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        observed_text: Option<String>,
    },
    Failed {
        /// Diagnostic from the automation or imaging layer
        error: String,
    },
}

/// Result of a single step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Human-readable step name
    pub name: String,

    #[serde(flatten)]
    pub outcome: StepOutcome,
}

impl StepResult {
    pub fn passed(name: impl Into<String>, screenshot: impl Into<String>, observed_text: Option<String>) -> Self {
        Self {
            name: name.into(),
            outcome: StepOutcome::Passed {
                screenshot: screenshot.into(),
                observed_text,
            },
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: StepOutcome::Failed { error: error.into() },
        }
    }

    pub fn status(&self) -> StepStatus {
        match self.outcome {
            StepOutcome::Passed { .. } => StepStatus::Passed,
            StepOutcome::Failed { .. } => StepStatus::Failed,
        }
    }

    pub fn is_passed(&self) -> bool {
        self.status() == StepStatus::Passed
    }

    pub fn screenshot(&self) -> Option<&str> {
        match &self.outcome {
            StepOutcome::Passed { screenshot, .. } => Some(screenshot),
            StepOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            StepOutcome::Passed { .. } => None,
            StepOutcome::Failed { error } => Some(error),
        }
    }

    pub fn observed_text(&self) -> Option<&str> {
        match &self.outcome {
            StepOutcome::Passed { observed_text, .. } => observed_text.as_deref(),
            StepOutcome::Failed { .. } => None,
        }
    }
}

/// Result of a complete run.
///
/// Counts are derived from `steps`, so `passed() <= total()` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Step results in execution order
    pub steps: Vec<StepResult>,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// A run that failed before or outside the step runner
    pub fn aborted(step_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            steps: vec![StepResult::failed(step_name, error)],
        }
    }

    pub fn push(&mut self, result: StepResult) {
        self.steps.push(result);
    }

    pub fn total(&self) -> usize {
        self.steps.len()
    }

    pub fn passed(&self) -> usize {
        self.steps.iter().filter(|s| s.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    /// Whether every step passed (false for an empty run)
    pub fn all_passed(&self) -> bool {
        self.total() > 0 && self.passed() == self.total()
    }

    /// Pass rate as a whole percentage, rounded down
    pub fn pass_rate_percent(&self) -> usize {
        match self.total() {
            0 => 0,
            total => self.passed() * 100 / total,
        }
    }

    /// JSON summary including derived counts
    pub fn to_manifest(&self) -> serde_json::Value {
        serde_json::json!({
            "total": self.total(),
            "passed": self.passed(),
            "failed": self.failed(),
            "pass_rate_percent": self.pass_rate_percent(),
            "steps": self.steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_of(statuses: &[bool]) -> RunResult {
        let mut run = RunResult::new();
        for (i, passed) in statuses.iter().enumerate() {
            if *passed {
                run.push(StepResult::passed(format!("step {}", i), format!("{:02}.png", i), None));
            } else {
                run.push(StepResult::failed(format!("step {}", i), "boom"));
            }
        }
        run
    }

    #[test]
    fn test_counts_follow_steps() {
        let run = run_of(&[true, false, true, true, false]);
        assert_eq!(run.total(), 5);
        assert_eq!(run.passed(), 3);
        assert_eq!(run.failed(), 2);
        assert!(!run.all_passed());
    }

    #[test]
    fn test_pass_rate_rounds_down() {
        assert_eq!(run_of(&[true, true, false]).pass_rate_percent(), 66);
        assert_eq!(run_of(&[true, false, false]).pass_rate_percent(), 33);
        assert_eq!(run_of(&[true; 5]).pass_rate_percent(), 100);
        assert_eq!(run_of(&[false; 5]).pass_rate_percent(), 0);
        assert_eq!(RunResult::new().pass_rate_percent(), 0);
    }

    #[test]
    fn test_pass_rate_matches_floor_for_all_small_runs() {
        for total in 1..=12usize {
            for passed in 0..=total {
                let statuses: Vec<bool> = (0..total).map(|i| i < passed).collect();
                let run = run_of(&statuses);
                let expected = (passed as f64 * 100.0 / total as f64).floor() as usize;
                assert_eq!(run.pass_rate_percent(), expected, "{}/{}", passed, total);
                assert!(run.passed() <= run.total());
            }
        }
    }

    #[test]
    fn test_outcome_accessors_are_exclusive() {
        let ok = StepResult::passed("Open", "01_login_page.png", Some("hi".to_string()));
        assert_eq!(ok.screenshot(), Some("01_login_page.png"));
        assert_eq!(ok.error(), None);
        assert_eq!(ok.observed_text(), Some("hi"));

        let bad = StepResult::failed("Open", "timeout after 5000ms: waiting");
        assert_eq!(bad.screenshot(), None);
        assert_eq!(bad.error(), Some("timeout after 5000ms: waiting"));
        assert_eq!(bad.status(), StepStatus::Failed);
    }

    #[test]
    fn test_aborted_run_has_single_failed_step() {
        let run = RunResult::aborted("Test execution", "Browser launch failed: no chromium");
        assert_eq!(run.total(), 1);
        assert_eq!(run.passed(), 0);
        assert_eq!(run.steps[0].error(), Some("Browser launch failed: no chromium"));
    }

    #[test]
    fn test_step_result_serialization() {
        let ok = StepResult::passed("Open login page", "01_login_page.png", None);
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({
                "name": "Open login page",
                "status": "PASSED",
                "screenshot": "01_login_page.png"
            })
        );

        let bad = StepResult::failed("Enter username", "No element matches selector 'x'");
        let json = serde_json::to_string(&bad).unwrap();
        let back: StepResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bad);
    }

    #[test]
    fn test_manifest_includes_counts() {
        let manifest = run_of(&[true, false]).to_manifest();
        assert_eq!(manifest["total"], 2);
        assert_eq!(manifest["passed"], 1);
        assert_eq!(manifest["pass_rate_percent"], 50);
        assert_eq!(manifest["steps"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(StepStatus::Passed.to_string(), "✅ Passed");
        assert_eq!(StepStatus::Failed.to_string(), "❌ Failed");
    }
}
