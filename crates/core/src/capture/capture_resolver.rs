use std::path::Path;
use std::sync::Arc;

use crate::capture::domain::camera_source::CameraSource;
use crate::capture::domain::capture_error::{CaptureError, ProbeError};
use crate::capture::domain::capture_options::CaptureOptions;
use crate::capture::domain::capture_source::{CaptureSource, SourceKind};
use crate::capture::domain::directory_source::DirectorySource;
use crate::capture::domain::frame_decoder::FrameDecoder;
use crate::capture::domain::image_source::ImageSource;
use crate::capture::domain::read_metrics::{NullReadMetrics, ReadMetrics};
use crate::capture::domain::video_source::VideoSource;
use crate::capture::infrastructure::system_decoder::SystemDecoder;

/// Probe order. Cheap, specific interpretations come first so that a camera
/// is only activated when nothing on disk matches.
const PROBE_ORDER: [SourceKind; 4] = [
    SourceKind::Image,
    SourceKind::Dir,
    SourceKind::Video,
    SourceKind::Camera,
];

/// Turns an input descriptor into a capture source by trying each source
/// kind in turn.
pub struct CaptureResolver {
    decoder: Arc<dyn FrameDecoder>,
    metrics: Arc<dyn ReadMetrics>,
}

impl CaptureResolver {
    pub fn new(decoder: Arc<dyn FrameDecoder>, metrics: Arc<dyn ReadMetrics>) -> Self {
        Self { decoder, metrics }
    }

    /// Opens `input` as the first source kind that accepts it.
    ///
    /// When every kind declines, the error lists the "matched but failed"
    /// diagnostics if there are any, otherwise the structural mismatches.
    pub fn open(
        &self,
        input: &str,
        options: &CaptureOptions,
    ) -> Result<Box<dyn CaptureSource>, CaptureError> {
        if options.read_length_limit == 0 {
            return Err(CaptureError::ZeroReadLengthLimit);
        }

        let mut invalid_inputs = Vec::new();
        let mut open_errors = Vec::new();

        for kind in PROBE_ORDER {
            match self.probe(kind, input, options) {
                Ok(source) => {
                    log::info!("Opened {input} as {kind}");
                    return Ok(source);
                }
                Err(ProbeError::InvalidInput(message)) => {
                    log::debug!("{kind} rejected {input}: {message}");
                    invalid_inputs.push(message);
                }
                Err(ProbeError::OpenError(message)) => {
                    log::debug!("{kind} failed to open {input}: {message}");
                    open_errors.push(message);
                }
            }
        }

        let messages = if open_errors.is_empty() {
            invalid_inputs
        } else {
            open_errors
        };
        Err(CaptureError::Unresolved { messages })
    }

    fn probe(
        &self,
        kind: SourceKind,
        input: &str,
        options: &CaptureOptions,
    ) -> Result<Box<dyn CaptureSource>, ProbeError> {
        let path = Path::new(input);
        let metrics = Arc::clone(&self.metrics);
        Ok(match kind {
            SourceKind::Image => Box::new(ImageSource::open(
                path,
                options.looping,
                self.decoder.as_ref(),
                metrics,
            )?),
            SourceKind::Dir => Box::new(DirectorySource::open(
                path,
                options.looping,
                options.initial_frame_index,
                options.read_length_limit,
                Arc::clone(&self.decoder),
                metrics,
            )?),
            SourceKind::Video => Box::new(VideoSource::open(
                path,
                options.looping,
                options.initial_frame_index,
                options.read_length_limit,
                self.decoder.as_ref(),
                metrics,
            )?),
            SourceKind::Camera => Box::new(CameraSource::open(
                input,
                options.looping,
                options.initial_frame_index,
                options.read_length_limit,
                options.camera_resolution,
                self.decoder.as_ref(),
                metrics,
            )?),
        })
    }
}

impl Default for CaptureResolver {
    fn default() -> Self {
        Self::new(Arc::new(SystemDecoder::new()), Arc::new(NullReadMetrics))
    }
}

/// Opens `input` with the system codecs and no metrics.
pub fn open_images_capture(
    input: &str,
    options: &CaptureOptions,
) -> Result<Box<dyn CaptureSource>, CaptureError> {
    CaptureResolver::default().open(input, options)
}
