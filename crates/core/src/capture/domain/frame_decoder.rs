use std::path::Path;

use crate::capture::domain::capture_options::Resolution;
use crate::shared::frame::Frame;

/// An open, sequential stream of decoded frames.
///
/// Failures are reported as `None`/`false` rather than errors; the source
/// that owns the stream decides what an absent frame means.
pub trait FrameStream: Send {
    /// Decodes the next frame, or `None` when nothing could be read.
    fn read(&mut self) -> Option<Frame>;

    /// Repositions so the next `read` yields frame `frame_index`.
    /// Returns `false` if the stream refused the request.
    fn seek(&mut self, frame_index: usize) -> bool;

    /// Frame rate as reported by the container or device. May be 0.
    fn fps(&self) -> f64;
}

/// A live capture device. Each setter returns whether the device accepted
/// the setting.
pub trait CameraDevice: FrameStream {
    fn set_buffer_size(&mut self, frames: u32) -> bool;

    fn set_resolution(&mut self, resolution: Resolution) -> bool;

    fn set_autofocus(&mut self, enabled: bool) -> bool;

    fn set_fourcc(&mut self, fourcc: [u8; 4]) -> bool;
}

/// Codec capability the capture sources are built on.
///
/// Implementations never panic on bad input: anything that cannot be
/// decoded or opened yields `None`.
pub trait FrameDecoder: Send + Sync {
    /// Decodes a still image file.
    fn decode_image(&self, path: &Path) -> Option<Frame>;

    /// Opens a seekable video file.
    fn open_video(&self, path: &Path) -> Option<Box<dyn FrameStream>>;

    /// Opens the camera with the given device index.
    fn open_camera(&self, index: u32) -> Option<Box<dyn CameraDevice>>;
}
