//! Imaging capability: screenshot decoding, frame resizing and GIF encoding.
//!
//! The capability is chosen once at startup through [`detect`]. When frame
//! capture is disabled the [`NoImaging`] implementation is used, so the step
//! runner and the encoder are written once against [`Imaging`].

use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::FilterType;
use image::{Delay, Frame as GifFrame};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::types::{AnimationOptions, AnimationOutcome, Frame, FrameResult, FrameSequence, FrameSize};

/// GIF quantizer sample factor for a finer palette (1 = best quality, 30 = fastest)
const OPTIMIZED_QUANTIZER_SPEED: i32 = 10;

/// GIF quantizer sample factor for fast, coarser-palette encoding
const FAST_QUANTIZER_SPEED: i32 = 30;

/// Trait for imaging backends
///
/// Implementations:
/// - `ImageCodec` decodes, resizes and encodes with the `image` crate
/// - `NoImaging` stands in when frame capture is disabled
pub trait Imaging: Send + Sync {
    /// Whether frames can be captured and encoded
    fn is_available(&self) -> bool;

    /// Decode a PNG screenshot and downsize it to `size`.
    /// Returns `None` when the capability is absent.
    fn capture_frame(&self, png: &[u8], size: FrameSize) -> FrameResult<Option<Frame>>;

    /// Encode `frames` as an animated image at `path`
    fn encode_animation(&self, frames: &[Frame], path: &Path, options: &AnimationOptions) -> FrameResult<()>;
}

/// Imaging backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl Imaging for ImageCodec {
    fn is_available(&self) -> bool {
        true
    }

    fn capture_frame(&self, png: &[u8], size: FrameSize) -> FrameResult<Option<Frame>> {
        let decoded = image::load_from_memory(png)?;
        let resized = decoded.resize_exact(size.width(), size.height(), FilterType::Triangle);
        Ok(Some(Frame::from_image(resized.to_rgba8())))
    }

    fn encode_animation(&self, frames: &[Frame], path: &Path, options: &AnimationOptions) -> FrameResult<()> {
        let speed = if options.optimize {
            OPTIMIZED_QUANTIZER_SPEED
        } else {
            FAST_QUANTIZER_SPEED
        };
        let mut gif = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut gif, speed);
            if options.loop_forever {
                encoder.set_repeat(Repeat::Infinite)?;
            }

            let delay = Delay::from_numer_denom_ms(options.frame_delay_ms, 1);
            encoder.encode_frames(
                frames
                    .iter()
                    .map(|frame| GifFrame::from_parts(frame.image().clone(), 0, 0, delay)),
            )?;
            // Dropping the encoder writes the GIF trailer.
        }
        fs::write(path, &gif)?;
        Ok(())
    }
}

/// Absent imaging capability
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImaging;

impl Imaging for NoImaging {
    fn is_available(&self) -> bool {
        false
    }

    fn capture_frame(&self, _png: &[u8], _size: FrameSize) -> FrameResult<Option<Frame>> {
        Ok(None)
    }

    fn encode_animation(&self, _frames: &[Frame], _path: &Path, _options: &AnimationOptions) -> FrameResult<()> {
        Ok(())
    }
}

/// Select the imaging capability for this run
pub fn detect(frames_enabled: bool) -> Box<dyn Imaging> {
    if frames_enabled {
        Box::new(ImageCodec)
    } else {
        warn!("Frame capture disabled, animation generation will be skipped");
        Box::new(NoImaging)
    }
}

/// Encode the captured frames into the animation file.
///
/// Nothing is written when imaging is unavailable or no frame was captured;
/// a stale animation from an earlier run is removed in both cases so the
/// output directory only ever holds this run's artifacts.
pub fn write_animation(
    imaging: &dyn Imaging,
    frames: &FrameSequence,
    path: &Path,
    options: &AnimationOptions,
) -> FrameResult<AnimationOutcome> {
    if !imaging.is_available() {
        info!("Skipping animation generation (imaging unavailable)");
        remove_stale(path)?;
        return Ok(AnimationOutcome::Unavailable);
    }

    if frames.is_empty() {
        warn!("No frames captured, animation not written");
        remove_stale(path)?;
        return Ok(AnimationOutcome::NoFrames);
    }

    imaging.encode_animation(frames.as_slice(), path, options)?;
    let bytes = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    info!(
        path = %path.display(),
        frames = frames.len(),
        bytes,
        "Animation saved"
    );

    Ok(AnimationOutcome::Written {
        path: path.to_path_buf(),
        frames: frames.len(),
        bytes,
    })
}

fn remove_stale(path: &Path) -> FrameResult<()> {
    if path.exists() {
        debug!(path = %path.display(), "Removing stale animation");
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::FrameError;
    use image::codecs::gif::GifDecoder;
    use image::{AnimationDecoder, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_of(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    #[test]
    fn test_capture_frame_resizes_to_configured_size() {
        let png = png_of(640, 480, [10, 20, 30, 255]);
        let size = FrameSize::new(128, 128).unwrap();
        let frame = ImageCodec.capture_frame(&png, size).unwrap().unwrap();
        assert_eq!((frame.width(), frame.height()), (128, 128));
    }

    #[test]
    fn test_capture_frame_rejects_garbage() {
        let result = ImageCodec.capture_frame(b"not a png", FrameSize::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_no_imaging_captures_nothing() {
        let png = png_of(16, 16, [0, 0, 0, 255]);
        let frame = NoImaging.capture_frame(&png, FrameSize::default()).unwrap();
        assert!(frame.is_none());
        assert!(!NoImaging.is_available());
    }

    #[test]
    fn test_write_animation_encodes_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        let size = FrameSize::new(32, 24).unwrap();

        let mut frames = FrameSequence::new();
        for shade in [0u8, 80, 160] {
            let png = png_of(100, 100, [shade, shade, shade, 255]);
            frames.push(ImageCodec.capture_frame(&png, size).unwrap().unwrap());
        }

        let outcome = write_animation(&ImageCodec, &frames, &path, &AnimationOptions::default()).unwrap();
        match outcome {
            AnimationOutcome::Written { frames, bytes, .. } => {
                assert_eq!(frames, 3);
                assert!(bytes > 0);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let decoder = GifDecoder::new(fs::File::open(&path).unwrap()).unwrap();
        let decoded = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(decoded.len(), 3);
        for frame in &decoded {
            assert_eq!(frame.buffer().dimensions(), (32, 24));
            assert_eq!(frame.delay().numer_denom_ms(), (100, 1));
        }
    }

    #[test]
    fn test_fast_encoding_keeps_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let size = FrameSize::new(24, 24).unwrap();
        let mut frames = FrameSequence::new();
        for shade in [30u8, 200] {
            let png = png_of(48, 48, [shade, 0, 255 - shade, 255]);
            frames.push(ImageCodec.capture_frame(&png, size).unwrap().unwrap());
        }

        for optimize in [true, false] {
            let path = dir.path().join(format!("anim_{}.gif", optimize));
            let options = AnimationOptions {
                optimize,
                ..AnimationOptions::default()
            };
            ImageCodec.encode_animation(frames.as_slice(), &path, &options).unwrap();

            let decoder = GifDecoder::new(fs::File::open(&path).unwrap()).unwrap();
            assert_eq!(decoder.into_frames().collect_frames().unwrap().len(), 2);
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_animation_reports_write_failure() {
        let size = FrameSize::new(16, 16).unwrap();
        let mut frames = FrameSequence::new();
        for shade in [0u8, 255] {
            let png = png_of(64, 64, [shade, shade, shade, 255]);
            frames.push(ImageCodec.capture_frame(&png, size).unwrap().unwrap());
        }

        // Every write to /dev/full fails with ENOSPC
        let path = Path::new("/dev/full");
        let options = AnimationOptions::default();
        assert!(ImageCodec.encode_animation(frames.as_slice(), path, &options).is_err());
        match write_animation(&ImageCodec, &frames, path, &options) {
            Err(FrameError::Io(_)) => {}
            other => panic!("expected an I/O error, got {:?}", other),
        }
    }

    #[test]
    fn test_write_animation_without_frames_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        fs::write(&path, b"stale").unwrap();

        let outcome =
            write_animation(&ImageCodec, &FrameSequence::new(), &path, &AnimationOptions::default()).unwrap();
        assert_eq!(outcome, AnimationOutcome::NoFrames);
        assert!(!path.exists());
    }

    #[test]
    fn test_write_animation_unavailable_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        let mut frames = FrameSequence::new();
        frames.push(Frame::from_image(RgbaImage::new(8, 8)));

        let outcome = write_animation(&NoImaging, &frames, &path, &AnimationOptions::default()).unwrap();
        assert_eq!(outcome, AnimationOutcome::Unavailable);
        assert!(!path.exists());
    }

    #[test]
    fn test_detect_honours_toggle() {
        assert!(detect(true).is_available());
        assert!(!detect(false).is_available());
    }
}
