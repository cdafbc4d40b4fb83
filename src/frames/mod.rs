pub mod codec;
pub mod types;

pub use codec::{ImageCodec, Imaging, NoImaging, detect, write_animation};
pub use types::{AnimationOptions, AnimationOutcome, Frame, FrameError, FrameResult, FrameSequence, FrameSize};
