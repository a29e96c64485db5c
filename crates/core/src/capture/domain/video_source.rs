use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::capture::domain::capture_error::{CaptureError, ProbeError};
use crate::capture::domain::capture_source::{CaptureSource, SourceKind};
use crate::capture::domain::frame_decoder::{FrameDecoder, FrameStream};
use crate::capture::domain::read_metrics::{record_since, ReadMetrics};
use crate::shared::frame::Frame;

/// A seekable video file.
///
/// Emits at most `read_length_limit` frames per pass, starting at
/// `initial_frame_index`. Looping seeks back to that frame. A failed
/// decode never raises: it surfaces as `Ok(None)` and still counts
/// toward the pass.
pub struct VideoSource {
    stream: Box<dyn FrameStream>,
    emitted: usize,
    initial_frame_index: usize,
    read_length_limit: usize,
    looping: bool,
    metrics: Arc<dyn ReadMetrics>,
}

impl VideoSource {
    pub fn open(
        path: &Path,
        looping: bool,
        initial_frame_index: usize,
        read_length_limit: usize,
        decoder: &dyn FrameDecoder,
        metrics: Arc<dyn ReadMetrics>,
    ) -> Result<Self, ProbeError> {
        let mut stream = decoder.open_video(path).ok_or_else(|| {
            ProbeError::invalid_input(format!("Can't open the video from {}", path.display()))
        })?;
        if !stream.seek(initial_frame_index) {
            return Err(ProbeError::open_error(format!(
                "Can't set frame {initial_frame_index} to begin {} with",
                path.display()
            )));
        }
        log::debug!(
            "VideoSource: opened {} at frame {initial_frame_index} ({:.2} fps)",
            path.display(),
            stream.fps()
        );

        Ok(Self {
            stream,
            emitted: 0,
            initial_frame_index,
            read_length_limit,
            looping,
            metrics,
        })
    }

    /// Seeks to the start of the pass and reads its first frame.
    fn restart_pass(&mut self) -> Option<Option<Frame>> {
        if !(self.looping && self.stream.seek(self.initial_frame_index)) {
            return None;
        }
        self.emitted = 1;
        Some(self.stream.read())
    }
}

impl CaptureSource for VideoSource {
    fn read(&mut self) -> Result<Option<Frame>, CaptureError> {
        let start = Instant::now();

        let frame = if self.emitted >= self.read_length_limit {
            self.restart_pass().flatten()
        } else {
            match self.stream.read() {
                Some(frame) => {
                    self.emitted += 1;
                    Some(frame)
                }
                None => match self.restart_pass() {
                    Some(frame) => frame,
                    None => {
                        self.emitted += 1;
                        None
                    }
                },
            }
        };

        if frame.is_some() {
            record_since(self.metrics.as_ref(), start);
        }
        Ok(frame)
    }

    fn frame_rate(&self) -> f64 {
        self.stream.fps()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Video
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::read_metrics::NullReadMetrics;
    use crate::capture::test_support::{solid_frames, CountingMetrics, FakeDecoder, ScriptedStream};
    use approx::assert_relative_eq;

    const PATH: &str = "/videos/clip.mp4";

    fn open_with(
        stream: ScriptedStream,
        looping: bool,
        initial: usize,
        limit: usize,
    ) -> Result<VideoSource, ProbeError> {
        let decoder = FakeDecoder::default().with_video(PATH, stream);
        VideoSource::open(
            Path::new(PATH),
            looping,
            initial,
            limit,
            &decoder,
            Arc::new(NullReadMetrics),
        )
    }

    fn indices(source: &mut VideoSource, reads: usize) -> Vec<Option<usize>> {
        (0..reads)
            .map(|_| source.read().unwrap().map(|f| f.index()))
            .collect()
    }

    #[test]
    fn test_reads_from_initial_frame_to_end() {
        let stream = ScriptedStream::new(solid_frames(5), 25.0);
        let mut source = open_with(stream, false, 2, usize::MAX).unwrap();
        assert_eq!(indices(&mut source, 4), vec![Some(2), Some(3), Some(4), None]);
    }

    #[test]
    fn test_limit_stops_non_looping() {
        let stream = ScriptedStream::new(solid_frames(5), 25.0);
        let mut source = open_with(stream, false, 0, 2).unwrap();
        assert_eq!(indices(&mut source, 3), vec![Some(0), Some(1), None]);
    }

    #[test]
    fn test_limit_restarts_looping() {
        let stream = ScriptedStream::new(solid_frames(5), 25.0);
        let mut source = open_with(stream, true, 1, 2).unwrap();
        assert_eq!(
            indices(&mut source, 5),
            vec![Some(1), Some(2), Some(1), Some(2), Some(1)]
        );
    }

    #[test]
    fn test_end_of_stream_restarts_looping() {
        let stream = ScriptedStream::new(solid_frames(3), 25.0);
        let mut source = open_with(stream, true, 0, usize::MAX).unwrap();
        assert_eq!(
            indices(&mut source, 5),
            vec![Some(0), Some(1), Some(2), Some(0), Some(1)]
        );
    }

    #[test]
    fn test_failed_read_counts_toward_pass() {
        // Two frames, limit three: the empty third read is counted, so the
        // fourth read finds the limit reached and stays empty.
        let stream = ScriptedStream::new(solid_frames(2), 25.0);
        let mut source = open_with(stream, false, 0, 3).unwrap();
        assert_eq!(indices(&mut source, 2), vec![Some(0), Some(1)]);
        assert!(source.read().unwrap().is_none());
        assert_eq!(source.emitted, 3);
        assert!(source.read().unwrap().is_none());
        assert_eq!(source.emitted, 3);
    }

    #[test]
    fn test_looping_with_refused_seek_yields_none() {
        let stream = ScriptedStream::new(solid_frames(2), 25.0);
        let seeks = stream.seeks();
        let mut source = open_with(stream, false, 0, usize::MAX).unwrap();
        source.looping = true;
        source.read().unwrap();
        source.read().unwrap();

        // Swap in a stream that refuses every seek.
        source.stream = Box::new(ScriptedStream::new(Vec::new(), 25.0).refusing_seek());
        assert!(source.read().unwrap().is_none());
        assert_eq!(*seeks.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_seek_rejected_is_open_error() {
        let stream = ScriptedStream::new(solid_frames(2), 25.0).refusing_seek();
        let err = open_with(stream, false, 0, 1).err().unwrap();
        assert!(err.is_open_error());
    }

    #[test]
    fn test_unopenable_is_invalid_input() {
        let decoder = FakeDecoder::default();
        let err = VideoSource::open(
            Path::new("/videos/missing.mp4"),
            false,
            0,
            1,
            &decoder,
            Arc::new(NullReadMetrics),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ProbeError::InvalidInput(_)));
    }

    #[test]
    fn test_frame_rate_passes_through() {
        let source = open_with(ScriptedStream::new(solid_frames(1), 0.0), false, 0, 1).unwrap();
        assert_relative_eq!(source.frame_rate(), 0.0);
        assert_eq!(source.kind(), SourceKind::Video);

        let source = open_with(ScriptedStream::new(solid_frames(1), 29.97), false, 0, 1).unwrap();
        assert_relative_eq!(source.frame_rate(), 29.97);
    }

    #[test]
    fn test_metrics_skip_empty_reads() {
        let decoder =
            FakeDecoder::default().with_video(PATH, ScriptedStream::new(solid_frames(2), 25.0));
        let metrics = Arc::new(CountingMetrics::default());
        let mut source =
            VideoSource::open(Path::new(PATH), false, 0, usize::MAX, &decoder, metrics.clone())
                .unwrap();
        while source.read().unwrap().is_some() {}
        assert_eq!(metrics.reads(), 2);
    }
}
