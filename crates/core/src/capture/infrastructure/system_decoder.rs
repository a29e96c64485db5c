use std::path::Path;

use crate::capture::domain::frame_decoder::{CameraDevice, FrameDecoder, FrameStream};
use crate::capture::infrastructure::ffmpeg_video_stream::FfmpegVideoStream;
use crate::capture::infrastructure::image_crate_decoder::ImageCrateDecoder;
use crate::shared::frame::Frame;

/// The default codec stack: `image` for stills, ffmpeg for video files and
/// V4L2 for cameras. Cameras are unavailable off Linux.
#[derive(Default)]
pub struct SystemDecoder {
    images: ImageCrateDecoder,
}

impl SystemDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameDecoder for SystemDecoder {
    fn decode_image(&self, path: &Path) -> Option<Frame> {
        self.images.decode_image(path)
    }

    fn open_video(&self, path: &Path) -> Option<Box<dyn FrameStream>> {
        match FfmpegVideoStream::open(path) {
            Ok(stream) => Some(Box::new(stream)),
            Err(e) => {
                log::debug!("SystemDecoder: no video at {}: {e}", path.display());
                None
            }
        }
    }

    #[cfg(target_os = "linux")]
    fn open_camera(&self, index: u32) -> Option<Box<dyn CameraDevice>> {
        use crate::capture::infrastructure::v4l2_camera::V4l2Camera;

        match V4l2Camera::open(index) {
            Ok(camera) => Some(Box::new(camera)),
            Err(e) => {
                log::debug!("SystemDecoder: no camera /dev/video{index}: {e}");
                None
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn open_camera(&self, index: u32) -> Option<Box<dyn CameraDevice>> {
        log::debug!("SystemDecoder: camera {index} requested but cameras need V4L2");
        None
    }
}
