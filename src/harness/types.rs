use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One named step of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Human-readable name shown in logs and the report (e.g. "Enter username")
    pub name: String,

    /// Filename slug for the step screenshot (e.g. "username_filled")
    pub slug: String,

    /// Browser interaction performed by the step
    pub action: StepAction,

    /// Selector whose text is read back after the screenshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_text: Option<String>,
}

impl Step {
    pub fn new(name: impl Into<String>, slug: impl Into<String>, action: StepAction) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            action,
            read_text: None,
        }
    }

    /// Read the text of `selector` once the step has passed
    pub fn read_text(mut self, selector: impl Into<String>) -> Self {
        self.read_text = Some(selector.into());
        self
    }
}

/// A single browser interaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    /// Load a URL, optionally waiting for the network to go idle
    Navigate { url: String, wait_for_network_idle: bool },

    /// Type text into an input
    Fill {
        selector: String,
        value: String,
        /// Hide the value in logs
        #[serde(default)]
        masked: bool,
    },

    /// Click without expecting a navigation
    Click { selector: String },

    /// Click and wait, bounded, for the navigation it triggers
    ClickAndAwaitNavigation { selector: String, timeout_ms: u64 },

    /// Wait, bounded, for an element to appear
    WaitForSelector { selector: String, timeout_ms: u64 },
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepAction::Navigate { url, .. } => write!(f, "navigate to {}", url),
            StepAction::Fill { selector, masked: true, .. } => write!(f, "fill {} with ***", selector),
            StepAction::Fill { selector, value, .. } => write!(f, "fill {} with '{}'", selector, value),
            StepAction::Click { selector } => write!(f, "click {}", selector),
            StepAction::ClickAndAwaitNavigation { selector, timeout_ms } => {
                write!(f, "click {} and wait {}ms for navigation", selector, timeout_ms)
            }
            StepAction::WaitForSelector { selector, timeout_ms } => {
                write!(f, "wait {}ms for {}", timeout_ms, selector)
            }
        }
    }
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that stop artifacts from being produced.
///
/// Browser failures never show up here; they become failed steps.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Output directories could not be prepared
    #[error("Setup error: {0}")]
    Setup(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
