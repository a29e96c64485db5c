use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::capture::domain::capture_error::{CaptureError, ProbeError};
use crate::capture::domain::capture_source::{CaptureSource, SourceKind};
use crate::capture::domain::frame_decoder::FrameDecoder;
use crate::capture::domain::read_metrics::{record_since, ReadMetrics};
use crate::shared::constants::STILL_FRAME_RATE;
use crate::shared::frame::Frame;

/// A single still image presented as a stream.
///
/// Non-looping sources yield the image once; looping sources yield a fresh
/// copy on every read and never end.
pub struct ImageSource {
    frame: Option<Frame>,
    looping: bool,
    metrics: Arc<dyn ReadMetrics>,
}

impl ImageSource {
    pub fn open(
        path: &Path,
        looping: bool,
        decoder: &dyn FrameDecoder,
        metrics: Arc<dyn ReadMetrics>,
    ) -> Result<Self, ProbeError> {
        if !is_readable_file(path) {
            return Err(ProbeError::invalid_input(format!(
                "Can't find the image by {}",
                path.display()
            )));
        }

        let frame = decoder.decode_image(path).ok_or_else(|| {
            ProbeError::open_error(format!("Can't open the image from {}", path.display()))
        })?;
        log::debug!(
            "ImageSource: image {}, {}x{}",
            path.display(),
            frame.width(),
            frame.height()
        );

        Ok(Self {
            frame: Some(frame),
            looping,
            metrics,
        })
    }
}

fn is_readable_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false) && fs::File::open(path).is_ok()
}

impl CaptureSource for ImageSource {
    fn read(&mut self) -> Result<Option<Frame>, CaptureError> {
        let start = Instant::now();
        let frame = if self.looping {
            self.frame.clone()
        } else {
            self.frame.take()
        };
        if frame.is_some() {
            record_since(self.metrics.as_ref(), start);
        }
        Ok(frame)
    }

    fn frame_rate(&self) -> f64 {
        STILL_FRAME_RATE
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Image
    }
}
