//! Browser automation capability traits and errors.
//!
//! The step runner only talks to a browser through these traits. Two
//! implementations ship with the crate: the Playwright bridge for real runs
//! and the scripted mock browser used by `demo` and the test-suite.

use async_trait::async_trait;
use thiserror::Error;

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// Error types for browser operations
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Browser process could not be started
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// A bounded wait elapsed
    #[error("timeout after {timeout_ms}ms: {action}")]
    Timeout { action: String, timeout_ms: u64 },

    /// No element matched a selector
    #[error("No element matches selector '{0}'")]
    ElementNotFound(String),

    /// Navigation failed (DNS, connection refused, bad status)
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// The automation layer reported an error
    #[error("Browser error: {0}")]
    Driver(String),

    /// The bridge process spoke something unexpected or went away
    #[error("Browser protocol error: {0}")]
    Protocol(String),

    /// Browser already closed
    #[error("Browser session closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BrowserError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BrowserError::Timeout { .. })
    }
}

/// Page-level automation capabilities.
///
/// Each call is one browser operation; callers await it before issuing the
/// next, so implementations never see overlapping operations.
#[async_trait]
pub trait Page: Send {
    /// Navigate to an absolute URL
    async fn goto(&mut self, url: &str) -> BrowserResult<()>;

    /// Wait until the network has been idle
    async fn wait_for_network_idle(&mut self) -> BrowserResult<()>;

    /// Fill an input element with text
    async fn fill(&mut self, selector: &str, text: &str) -> BrowserResult<()>;

    /// Click an element
    async fn click(&mut self, selector: &str) -> BrowserResult<()>;

    /// Click an element and wait for the navigation it triggers
    async fn click_and_wait_for_navigation(&mut self, selector: &str, timeout_ms: u64) -> BrowserResult<()>;

    /// Wait for a navigation that is already underway
    async fn wait_for_navigation(&mut self, timeout_ms: u64) -> BrowserResult<()>;

    /// Wait for an element to appear
    async fn wait_for_selector(&mut self, selector: &str, timeout_ms: u64) -> BrowserResult<()>;

    /// Read the text content of the first matching element
    async fn text_content(&mut self, selector: &str) -> BrowserResult<Option<String>>;

    /// Capture the viewport as PNG bytes
    async fn screenshot(&mut self) -> BrowserResult<Vec<u8>>;
}

/// A running browser instance
#[async_trait]
pub trait Browser: Send {
    type Page: Page;

    /// Open a new page (tab)
    async fn new_page(&mut self) -> BrowserResult<Self::Page>;

    /// Shut the browser down. Calling it twice is harmless.
    async fn close(&mut self) -> BrowserResult<()>;
}

/// Starts browser instances
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    type Browser: Browser;

    /// Launch a headless browser
    async fn launch(&self) -> BrowserResult<Self::Browser>;

    /// Human-readable engine description for reports (e.g. "Chromium (Playwright)")
    fn engine(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_mentions_timeout() {
        let err = BrowserError::Timeout {
            action: "waiting for navigation".to_string(),
            timeout_ms: 5000,
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "timeout after 5000ms: waiting for navigation");
    }

    #[test]
    fn test_element_not_found_message() {
        let err = BrowserError::ElementNotFound("#missing".to_string());
        assert!(!err.is_timeout());
        assert!(err.to_string().contains("#missing"));
    }
}
