// Core types for frame capture and animation encoding

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{DEFAULT_FRAME_DELAY_MS, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH};

/// Resolution of the downsized animation frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    width: u32,
    height: u32,
}

impl FrameSize {
    /// Create a frame size; both dimensions must be non-zero
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
        }
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A downsized RGBA snapshot of the page at one step
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbaImage,
}

impl Frame {
    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// Ordered, append-only sequence of frames collected during a run
#[derive(Debug, Clone, Default)]
pub struct FrameSequence {
    frames: Vec<Frame>,
}

impl FrameSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn as_slice(&self) -> &[Frame] {
        &self.frames
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }
}

/// Encoding parameters for the animated summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationOptions {
    /// Display duration of each frame (milliseconds)
    pub frame_delay_ms: u32,
    /// Loop forever instead of playing once
    pub loop_forever: bool,
    /// Spend more encoding time on a finer GIF palette
    pub optimize: bool,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            frame_delay_ms: DEFAULT_FRAME_DELAY_MS,
            loop_forever: true,
            optimize: true,
        }
    }
}

impl AnimationOptions {
    pub fn frame_delay_ms(mut self, delay_ms: u32) -> Self {
        self.frame_delay_ms = delay_ms;
        self
    }

    /// Frames per second implied by the frame delay
    pub fn fps(&self) -> u32 {
        1000 / self.frame_delay_ms.max(1)
    }
}

/// What the frame encoder did with the captured frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnimationOutcome {
    /// Animation written to `path`
    Written {
        path: PathBuf,
        frames: usize,
        bytes: u64,
    },
    /// Imaging was available but no frame was captured
    NoFrames,
    /// Imaging capability is absent; encoding skipped
    Unavailable,
    /// Encoding failed; the run carries on without an animation
    Failed { error: String },
}

impl AnimationOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, AnimationOutcome::Written { .. })
    }
}

/// Result type for frame operations
pub type FrameResult<T> = Result<T, FrameError>;

/// Error types for frame capture and encoding
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Failed to decode screenshot: {0}")]
    Decode(String),

    #[error("Failed to encode animation: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for FrameError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(io) => FrameError::Io(io),
            image::ImageError::Encoding(e) => FrameError::Encode(e.to_string()),
            other => FrameError::Decode(other.to_string()),
        }
    }
}
