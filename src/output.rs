//! Output directory layout for run artifacts.
//!
//! Everything a run produces lives under one output root:
//!
//! ```text
//! test_output/
//! ├── test_process.gif
//! ├── test_report.md
//! ├── results.json
//! └── screenshots/
//!     ├── 01_login_page.png
//!     └── ...
//! ```

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::runner::RunResult;

/// Artifact locations for one run
#[derive(Debug, Clone)]
pub struct OutputLayout {
    /// Output root
    pub dir: PathBuf,
    /// Screenshot directory
    pub screenshot_dir: PathBuf,
    /// Animation file
    pub animation_path: PathBuf,
    /// Markdown report
    pub report_path: PathBuf,
    /// JSON manifest
    pub manifest_path: PathBuf,
}

impl OutputLayout {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            dir: config.output_dir.clone(),
            screenshot_dir: config.screenshot_dir.clone(),
            animation_path: config.animation_path.clone(),
            report_path: config.report_path.clone(),
            manifest_path: config.manifest_path(),
        }
    }

    /// Create the output and screenshot directories
    pub fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::create_dir_all(&self.screenshot_dir)?;
        Ok(())
    }

    /// Path of the screenshot for a step
    pub fn screenshot_path(&self, file_name: &str) -> PathBuf {
        self.screenshot_dir.join(file_name)
    }

    /// Screenshot reference as used from the report's directory
    pub fn screenshot_ref(&self, file_name: &str) -> String {
        let dir_name = self
            .screenshot_dir
            .strip_prefix(&self.dir)
            .unwrap_or(&self.screenshot_dir);
        format!("{}/{}", dir_name.to_string_lossy().replace('\\', "/"), file_name)
    }

    /// Animation reference as used from the report's directory
    pub fn animation_ref(&self) -> String {
        file_name_of(&self.animation_path)
    }

    /// List all PNG files in the screenshot directory, sorted by name
    pub fn list_screenshots(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut captures = Vec::new();
        if self.screenshot_dir.exists() {
            for entry in fs::read_dir(&self.screenshot_dir)? {
                let path = entry?.path();
                if path.extension().map(|e| e == "png").unwrap_or(false) {
                    captures.push(path);
                }
            }
        }
        captures.sort();
        Ok(captures)
    }

    /// Remove screenshots left by an earlier run; returns how many were removed
    pub fn clear_screenshots(&self) -> std::io::Result<usize> {
        let stale = self.list_screenshots()?;
        for path in &stale {
            fs::remove_file(path)?;
        }
        Ok(stale.len())
    }

    /// Write the JSON manifest of a run
    pub fn write_manifest(&self, run: &RunResult, timestamp: DateTime<Local>) -> std::io::Result<()> {
        let mut manifest = run.to_manifest();
        if let serde_json::Value::Object(map) = &mut manifest {
            map.insert(
                "timestamp".to_string(),
                serde_json::Value::String(timestamp.to_rfc3339()),
            );
        }
        fs::write(&self.manifest_path, serde_json::to_string_pretty(&manifest)?)?;
        Ok(())
    }
}

/// File name for a step screenshot: `{NN}_{slug}.png`, numbered from 1
pub fn screenshot_file_name(step_number: usize, slug: &str) -> String {
    format!("{:02}_{}.png", step_number, sanitize_slug(slug))
}

/// Sanitize a slug for use in filenames
pub fn sanitize_slug(slug: &str) -> String {
    slug.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' | '_' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect()
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
