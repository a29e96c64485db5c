use std::sync::Arc;
use std::time::Instant;

use crate::capture::domain::capture_error::{CaptureError, ProbeError};
use crate::capture::domain::capture_options::Resolution;
use crate::capture::domain::capture_source::{CaptureSource, SourceKind};
use crate::capture::domain::frame_decoder::{CameraDevice, FrameDecoder};
use crate::capture::domain::read_metrics::{record_since, ReadMetrics};
use crate::shared::constants::{CAMERA_BUFFER_FRAMES, CAMERA_FOURCC, DEFAULT_CAMERA_FPS};
use crate::shared::frame::Frame;

/// A live camera addressed by device index.
///
/// Unlike a video file, a failed read here means the device faulted, so it
/// is returned as [`CaptureError::CameraRead`] rather than as end of stream.
/// Looping cameras have no frame limit.
pub struct CameraSource {
    device: Box<dyn CameraDevice>,
    index: u32,
    emitted: usize,
    read_length_limit: usize,
    metrics: Arc<dyn ReadMetrics>,
}

impl CameraSource {
    pub fn open(
        input: &str,
        looping: bool,
        initial_frame_index: usize,
        read_length_limit: usize,
        resolution: Resolution,
        decoder: &dyn FrameDecoder,
        metrics: Arc<dyn ReadMetrics>,
    ) -> Result<Self, ProbeError> {
        let index = input
            .trim()
            .parse::<u32>()
            .map_err(|_| ProbeError::invalid_input(format!("Can't find the camera {input}")))?;
        let mut device = decoder
            .open_camera(index)
            .ok_or_else(|| ProbeError::invalid_input(format!("Can't open the camera {index}")))?;

        configure(device.as_mut(), index, resolution);

        if !device.seek(initial_frame_index) {
            return Err(ProbeError::open_error(format!(
                "Can't skip to frame {initial_frame_index} on camera {index}"
            )));
        }
        log::debug!("CameraSource: opened camera {index} ({:.2} fps)", device.fps());

        Ok(Self {
            device,
            index,
            emitted: 0,
            read_length_limit: if looping {
                usize::MAX
            } else {
                read_length_limit
            },
            metrics,
        })
    }
}

/// Applies the capture settings. A refused setting is not fatal; the device
/// keeps whatever it negotiated.
fn configure(device: &mut dyn CameraDevice, index: u32, resolution: Resolution) {
    if !device.set_buffer_size(CAMERA_BUFFER_FRAMES) {
        log::warn!("CameraSource: camera {index} refused buffer size {CAMERA_BUFFER_FRAMES}");
    }
    if !device.set_resolution(resolution) {
        log::warn!("CameraSource: camera {index} refused resolution {resolution}");
    }
    if !device.set_autofocus(true) {
        log::warn!("CameraSource: camera {index} has no autofocus control");
    }
    if !device.set_fourcc(CAMERA_FOURCC) {
        log::warn!(
            "CameraSource: camera {index} refused format {}",
            String::from_utf8_lossy(&CAMERA_FOURCC)
        );
    }
}

impl CaptureSource for CameraSource {
    fn read(&mut self) -> Result<Option<Frame>, CaptureError> {
        let start = Instant::now();

        if self.emitted >= self.read_length_limit {
            return Ok(None);
        }
        let frame = self
            .device
            .read()
            .ok_or(CaptureError::CameraRead { index: self.index })?
            .with_index(self.emitted);
        self.emitted += 1;

        record_since(self.metrics.as_ref(), start);
        Ok(Some(frame))
    }

    fn frame_rate(&self) -> f64 {
        let fps = self.device.fps();
        if fps > 0.0 {
            fps
        } else {
            DEFAULT_CAMERA_FPS
        }
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Camera
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::read_metrics::NullReadMetrics;
    use crate::capture::test_support::{
        solid_frames, CameraSettings, CountingMetrics, FakeDecoder, ScriptedCamera,
    };
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn open_with(
        camera: ScriptedCamera,
        looping: bool,
        initial: usize,
        limit: usize,
    ) -> Result<CameraSource, ProbeError> {
        let decoder = FakeDecoder::default().with_camera(0, camera);
        CameraSource::open(
            "0",
            looping,
            initial,
            limit,
            Resolution::new(640, 480),
            &decoder,
            Arc::new(NullReadMetrics),
        )
    }

    #[test]
    fn test_applies_device_configuration() {
        let camera = ScriptedCamera::new(solid_frames(1), 30.0);
        let settings = camera.settings();
        open_with(camera, false, 0, 1).unwrap();

        assert_eq!(
            *settings.lock().unwrap(),
            CameraSettings {
                buffer_size: Some(1),
                resolution: Some(Resolution::new(640, 480)),
                autofocus: Some(true),
                fourcc: Some(*b"MJPG"),
            }
        );
    }

    #[test]
    fn test_refused_settings_are_not_fatal() {
        let camera = ScriptedCamera::new(solid_frames(1), 30.0).refusing_settings();
        let mut source = open_with(camera, false, 0, 1).unwrap();
        assert!(source.read().unwrap().is_some());
    }

    #[test]
    fn test_limit_ends_non_looping() {
        let mut source = open_with(ScriptedCamera::new(solid_frames(5), 30.0), false, 0, 2).unwrap();
        assert_eq!(source.read().unwrap().unwrap().index(), 0);
        assert_eq!(source.read().unwrap().unwrap().index(), 1);
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn test_looping_ignores_limit() {
        let mut source = open_with(ScriptedCamera::new(solid_frames(5), 30.0), true, 0, 2).unwrap();
        for _ in 0..5 {
            assert!(source.read().unwrap().is_some());
        }
    }

    #[test]
    fn test_read_failure_is_fatal() {
        let mut source =
            open_with(ScriptedCamera::new(solid_frames(1), 30.0), false, 0, usize::MAX).unwrap();
        source.read().unwrap().unwrap();

        let err = source.read().unwrap_err();
        assert!(matches!(err, CaptureError::CameraRead { index: 0 }));
    }

    #[test]
    fn test_initial_frames_are_discarded() {
        let frames = solid_frames(4);
        let third = frames[2].clone();
        let mut source = open_with(ScriptedCamera::new(frames, 30.0), false, 2, 5).unwrap();
        assert_eq!(source.read().unwrap().unwrap().data(), third.data());
    }

    #[test]
    fn test_failed_skip_is_open_error() {
        let err = open_with(ScriptedCamera::new(solid_frames(2), 30.0), false, 3, 1)
            .err()
            .unwrap();
        assert!(err.is_open_error());
    }

    #[rstest]
    #[case::word("front")]
    #[case::negative("-1")]
    #[case::path("/dev/video0")]
    #[case::empty("")]
    #[case::too_large("99999999999")]
    fn test_malformed_index_is_invalid_input(#[case] input: &str) {
        let decoder = FakeDecoder::default();
        let err = CameraSource::open(
            input,
            false,
            0,
            1,
            Resolution::default(),
            &decoder,
            Arc::new(NullReadMetrics),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ProbeError::InvalidInput(_)));
        assert_eq!(decoder.calls(), 0);
    }

    #[test]
    fn test_missing_device_is_invalid_input() {
        let decoder = FakeDecoder::default();
        let err = CameraSource::open(
            "3",
            false,
            0,
            1,
            Resolution::default(),
            &decoder,
            Arc::new(NullReadMetrics),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ProbeError::InvalidInput(_)));
    }

    #[rstest]
    #[case::reported(25.0, 25.0)]
    #[case::zero(0.0, 30.0)]
    #[case::negative(-1.0, 30.0)]
    fn test_frame_rate_fallback(#[case] reported: f64, #[case] expected: f64) {
        let source = open_with(ScriptedCamera::new(Vec::new(), reported), false, 0, 1).unwrap();
        assert_relative_eq!(source.frame_rate(), expected);
        assert_eq!(source.kind(), SourceKind::Camera);
    }

    #[test]
    fn test_metrics_record_each_frame() {
        let decoder =
            FakeDecoder::default().with_camera(0, ScriptedCamera::new(solid_frames(3), 30.0));
        let metrics = Arc::new(CountingMetrics::default());
        let mut source = CameraSource::open(
            "0",
            false,
            0,
            3,
            Resolution::default(),
            &decoder,
            metrics.clone(),
        )
        .unwrap();
        while source.read().unwrap().is_some() {}
        assert_eq!(metrics.reads(), 3);
    }
}
