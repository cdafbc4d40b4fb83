//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for web-vision, supporting:
//! - Environment variables for all configurable values
//! - Defaults matching the stock login scenario (`http://localhost:3000`, 128x128 frames)
//! - An immutable [`RunConfig`] record resolved once per run
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `WEB_VISION_BASE_URL` | Base URL of the application under test | `http://localhost:3000` |
//! | `WEB_VISION_OUTPUT_DIR` | Root directory for all artifacts | `test_output` |
//! | `WEB_VISION_FRAME_SIZE` | Animation frame size (`WxH`, `N`, or a preset) | `128x128` |
//! | `WEB_VISION_FRAMES` | Set to `0`, `false` or `off` to disable frame capture | enabled |
//! | `WEB_VISION_NODE` | Node.js binary used by the Playwright bridge | `node` |
//! | `WEB_VISION_ACTION_TIMEOUT_MS` | Bound for navigation and selector waits | `5000` |
//!
//! # Example
//!
//! ```bash
//! export WEB_VISION_BASE_URL="http://127.0.0.1:8080"
//! export WEB_VISION_FRAME_SIZE="slack"
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::frames::FrameSize;

// ============================================================================
// Default Values
// ============================================================================

/// Default base URL of the application under test
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Default output root
pub const DEFAULT_OUTPUT_DIR: &str = "test_output";

/// Default frame size preset
pub const DEFAULT_FRAME_SIZE: &str = "128x128";

/// Default frame width (pixels)
pub const DEFAULT_FRAME_WIDTH: u32 = 128;

/// Default frame height (pixels)
pub const DEFAULT_FRAME_HEIGHT: u32 = 128;

/// Display duration of one animation frame (milliseconds, 10 fps)
pub const DEFAULT_FRAME_DELAY_MS: u32 = 100;

/// Bound for navigation and selector waits (milliseconds)
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5000;

/// Default Node.js binary
pub const DEFAULT_NODE_BINARY: &str = "node";

/// Screenshot directory name under the output root
pub const SCREENSHOT_DIR_NAME: &str = "screenshots";

/// Animation file name under the output root
pub const ANIMATION_FILE_NAME: &str = "test_process.gif";

/// Report file name under the output root
pub const REPORT_FILE_NAME: &str = "test_report.md";

/// JSON manifest file name under the output root
pub const MANIFEST_FILE_NAME: &str = "results.json";

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the base URL
pub const ENV_BASE_URL: &str = "WEB_VISION_BASE_URL";

/// Environment variable for the output root
pub const ENV_OUTPUT_DIR: &str = "WEB_VISION_OUTPUT_DIR";

/// Environment variable for the frame size
pub const ENV_FRAME_SIZE: &str = "WEB_VISION_FRAME_SIZE";

/// Environment variable toggling frame capture
pub const ENV_FRAMES: &str = "WEB_VISION_FRAMES";

/// Environment variable for the Node.js binary
pub const ENV_NODE_BINARY: &str = "WEB_VISION_NODE";

/// Environment variable for the action timeout
pub const ENV_ACTION_TIMEOUT: &str = "WEB_VISION_ACTION_TIMEOUT_MS";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for web-vision
#[derive(Debug, Clone)]
pub struct Config {
    /// Target application settings
    pub target: TargetSettings,
    /// Artifact settings
    pub artifacts: ArtifactSettings,
    /// Browser bridge settings
    pub browser: BrowserSettings,
}

/// Settings describing the application under test
#[derive(Debug, Clone)]
pub struct TargetSettings {
    /// Base URL, without trailing slash
    pub base_url: String,
}

/// Settings for screenshots, frames and reports
#[derive(Debug, Clone)]
pub struct ArtifactSettings {
    /// Output root
    pub output_dir: String,
    /// Downsized frame resolution
    pub frame_size: FrameSize,
    /// Whether frame capture is enabled
    pub frames_enabled: bool,
}

/// Settings for the browser automation bridge
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Node.js binary
    pub node_binary: String,
    /// Bound for navigation and selector waits (milliseconds)
    pub action_timeout_ms: u64,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            target: TargetSettings::from_env(),
            artifacts: ArtifactSettings::from_env(),
            browser: BrowserSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            target: TargetSettings::defaults(),
            artifacts: ArtifactSettings::defaults(),
            browser: BrowserSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl TargetSettings {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var(ENV_BASE_URL)
                .map(|url| normalize_base_url(&url))
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ArtifactSettings {
    pub fn from_env() -> Self {
        Self {
            output_dir: env::var(ENV_OUTPUT_DIR).unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.to_string()),
            frame_size: env::var(ENV_FRAME_SIZE)
                .ok()
                .and_then(|s| parse_frame_size(&s))
                .unwrap_or_default(),
            frames_enabled: env::var(ENV_FRAMES)
                .map(|v| parse_toggle(&v))
                .unwrap_or(true),
        }
    }

    pub fn defaults() -> Self {
        Self {
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            frame_size: FrameSize::default(),
            frames_enabled: true,
        }
    }
}

impl BrowserSettings {
    pub fn from_env() -> Self {
        Self {
            node_binary: env::var(ENV_NODE_BINARY).unwrap_or_else(|_| DEFAULT_NODE_BINARY.to_string()),
            action_timeout_ms: env::var(ENV_ACTION_TIMEOUT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_ACTION_TIMEOUT_MS),
        }
    }

    pub fn defaults() -> Self {
        Self {
            node_binary: DEFAULT_NODE_BINARY.to_string(),
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
        }
    }
}

// ============================================================================
// Run Configuration
// ============================================================================

/// Immutable per-run configuration record.
///
/// Every artifact path is derived from `output_dir` when the record is built
/// and nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub base_url: String,
    pub frame_size: FrameSize,
    pub output_dir: PathBuf,
    pub screenshot_dir: PathBuf,
    pub animation_path: PathBuf,
    pub report_path: PathBuf,
    pub frame_delay_ms: u32,
    pub action_timeout_ms: u64,
}

impl RunConfig {
    /// Build a run configuration rooted at `output_dir`
    pub fn new(base_url: &str, output_dir: impl AsRef<Path>, frame_size: FrameSize) -> Self {
        let output_dir = output_dir.as_ref().to_path_buf();
        Self {
            base_url: normalize_base_url(base_url),
            frame_size,
            screenshot_dir: output_dir.join(SCREENSHOT_DIR_NAME),
            animation_path: output_dir.join(ANIMATION_FILE_NAME),
            report_path: output_dir.join(REPORT_FILE_NAME),
            output_dir,
            frame_delay_ms: DEFAULT_FRAME_DELAY_MS,
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
        }
    }

    /// Override the navigation/selector wait bound
    pub fn action_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.action_timeout_ms = timeout_ms;
        self
    }

    /// Resolve the full URL for a path on the application under test
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Path to the JSON manifest written next to the report
    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(MANIFEST_FILE_NAME)
    }
}

impl From<&Config> for RunConfig {
    fn from(config: &Config) -> Self {
        RunConfig::new(
            &config.target.base_url,
            &config.artifacts.output_dir,
            config.artifacts.frame_size,
        )
        .action_timeout_ms(config.browser.action_timeout_ms)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a frame size string into a [`FrameSize`].
/// Supports: "thumb" (64x64), "slack" (128x128), "large" (256x256), "N" or "WxH"
pub fn parse_frame_size(size: &str) -> Option<FrameSize> {
    let (width, height) = match size.trim().to_lowercase().as_str() {
        "thumb" => (64, 64),
        "slack" => (128, 128),
        "large" => (256, 256),
        custom => match custom.split_once('x') {
            Some((w, h)) => (w.trim().parse().ok()?, h.trim().parse().ok()?),
            None => {
                let n = custom.parse().ok()?;
                (n, n)
            }
        },
    };
    FrameSize::new(width, height)
}

fn parse_toggle(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "0" | "false" | "off" | "no"
    )
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_size_presets() {
        assert_eq!(parse_frame_size("thumb"), FrameSize::new(64, 64));
        assert_eq!(parse_frame_size("slack"), FrameSize::new(128, 128));
        assert_eq!(parse_frame_size("LARGE"), FrameSize::new(256, 256));
    }

    #[test]
    fn test_parse_frame_size_custom() {
        assert_eq!(parse_frame_size("200x100"), FrameSize::new(200, 100));
        assert_eq!(parse_frame_size("96"), FrameSize::new(96, 96));
    }

    #[test]
    fn test_parse_frame_size_invalid() {
        assert_eq!(parse_frame_size("invalid"), None);
        assert_eq!(parse_frame_size("0x10"), None);
        assert_eq!(parse_frame_size("10x"), None);
    }

    #[test]
    fn test_parse_toggle() {
        assert!(parse_toggle("1"));
        assert!(parse_toggle("yes"));
        assert!(!parse_toggle("0"));
        assert!(!parse_toggle("Off"));
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.target.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.artifacts.output_dir, DEFAULT_OUTPUT_DIR);
        assert_eq!(config.artifacts.frame_size, FrameSize::default());
        assert!(config.artifacts.frames_enabled);
        assert_eq!(config.browser.action_timeout_ms, DEFAULT_ACTION_TIMEOUT_MS);
    }

    #[test]
    fn test_run_config_paths() {
        let run = RunConfig::new("http://localhost:3000/", "out", FrameSize::default());
        assert_eq!(run.base_url, "http://localhost:3000");
        assert_eq!(run.screenshot_dir, PathBuf::from("out/screenshots"));
        assert_eq!(run.animation_path, PathBuf::from("out/test_process.gif"));
        assert_eq!(run.report_path, PathBuf::from("out/test_report.md"));
        assert_eq!(run.manifest_path(), PathBuf::from("out/results.json"));
        assert_eq!(run.url("/login.html"), "http://localhost:3000/login.html");
    }

    #[test]
    fn test_run_config_from_defaults() {
        let run = RunConfig::from(&Config::defaults());
        assert_eq!(run.frame_delay_ms, 100);
        assert_eq!(run.action_timeout_ms, 5000);
        assert_eq!(run.frame_size, FrameSize::new(128, 128).unwrap());
    }
}
