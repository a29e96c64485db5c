use std::path::Path;

use crate::capture::domain::frame_decoder::{CameraDevice, FrameDecoder, FrameStream};
use crate::shared::frame::Frame;

/// Decodes still images with the pure-Rust `image` crate.
///
/// Only still images are supported; `open_video` and `open_camera` always
/// return `None`. Combine with other backends through
/// [`SystemDecoder`](super::system_decoder::SystemDecoder).
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageCrateDecoder;

/// Converts a decoded image of any pixel layout to a tightly packed RGB frame.
pub(crate) fn rgb_frame(img: image::DynamicImage) -> Frame {
    let rgb = img.into_rgb8();
    let (width, height) = rgb.dimensions();
    Frame::new(rgb.into_raw(), width, height, 3, 0)
}

fn decode(path: &Path) -> image::ImageResult<image::DynamicImage> {
    image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
}

impl FrameDecoder for ImageCrateDecoder {
    /// The format is sniffed from the file's leading bytes; the extension is
    /// only a fallback for formats without a signature.
    fn decode_image(&self, path: &Path) -> Option<Frame> {
        match decode(path) {
            Ok(img) => Some(rgb_frame(img)),
            Err(e) => {
                log::debug!("ImageCrateDecoder: {}: {e}", path.display());
                None
            }
        }
    }

    fn open_video(&self, _path: &Path) -> Option<Box<dyn FrameStream>> {
        None
    }

    fn open_camera(&self, _index: u32) -> Option<Box<dyn CameraDevice>> {
        None
    }
}
