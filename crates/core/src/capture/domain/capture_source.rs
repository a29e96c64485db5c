use std::fmt;

use crate::capture::domain::capture_error::CaptureError;
use crate::shared::frame::Frame;

/// The medium a capture source was resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Image,
    Dir,
    Video,
    Camera,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Image => "IMAGE",
            SourceKind::Dir => "DIR",
            SourceKind::Video => "VIDEO",
            SourceKind::Camera => "CAMERA",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sequential stream of frames, whatever the underlying medium.
///
/// `read` blocks until a frame is available or the source is exhausted.
/// `Ok(None)` means there is no more data; callers stop reading. Only
/// camera sources return `Err`, when the device fails mid-stream.
pub trait CaptureSource: Send {
    fn read(&mut self) -> Result<Option<Frame>, CaptureError>;

    fn frame_rate(&self) -> f64;

    fn kind(&self) -> SourceKind;
}
