//! Scripted stand-ins for codec backends, shared by the capture tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::capture::domain::capture_options::Resolution;
use crate::capture::domain::frame_decoder::{CameraDevice, FrameDecoder, FrameStream};
use crate::capture::domain::read_metrics::ReadMetrics;
use crate::shared::frame::Frame;

/// 2x2 RGB frame filled with `value`.
pub(crate) fn solid_frame(value: u8) -> Frame {
    Frame::new(vec![value; 12], 2, 2, 3, 0)
}

pub(crate) fn solid_frames(count: usize) -> Vec<Frame> {
    (0..count).map(|i| solid_frame(i as u8 * 10)).collect()
}

fn flat_image(value: u8) -> image::RgbImage {
    image::RgbImage::from_pixel(4, 3, image::Rgb([value, value, value]))
}

/// Writes a 4x3 image whose every pixel is `[value; 3]`, encoded in the
/// format the extension names.
pub(crate) fn write_image(path: &Path, value: u8) {
    flat_image(value).save(path).unwrap();
}

/// Like [`write_image`], but always PNG bytes whatever the file is called.
pub(crate) fn write_png(path: &Path, value: u8) {
    flat_image(value)
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

#[derive(Default)]
pub(crate) struct CountingMetrics {
    reads: AtomicUsize,
}

impl CountingMetrics {
    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl ReadMetrics for CountingMetrics {
    fn record_read(&self, _elapsed: Duration) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }
}

/// Seekable stream over a fixed list of frames.
#[derive(Clone, Default)]
pub(crate) struct ScriptedStream {
    frames: Vec<Frame>,
    position: usize,
    fps: f64,
    refuse_seek: bool,
    seeks: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedStream {
    pub(crate) fn new(frames: Vec<Frame>, fps: f64) -> Self {
        Self {
            frames,
            fps,
            ..Self::default()
        }
    }

    pub(crate) fn refusing_seek(mut self) -> Self {
        self.refuse_seek = true;
        self
    }

    /// Every seek target requested so far, across clones.
    pub(crate) fn seeks(&self) -> Arc<Mutex<Vec<usize>>> {
        Arc::clone(&self.seeks)
    }
}

impl FrameStream for ScriptedStream {
    fn read(&mut self) -> Option<Frame> {
        let frame = self.frames.get(self.position)?.clone();
        self.position += 1;
        Some(frame.with_index(self.position - 1))
    }

    fn seek(&mut self, frame_index: usize) -> bool {
        self.seeks.lock().unwrap().push(frame_index);
        if self.refuse_seek || frame_index > self.frames.len() {
            return false;
        }
        self.position = frame_index;
        true
    }

    fn fps(&self) -> f64 {
        self.fps
    }
}

/// Settings a [`ScriptedCamera`] was asked to apply.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct CameraSettings {
    pub buffer_size: Option<u32>,
    pub resolution: Option<Resolution>,
    pub autofocus: Option<bool>,
    pub fourcc: Option<[u8; 4]>,
}

/// Camera that delivers `frames` and then fails every read.
#[derive(Clone, Default)]
pub(crate) struct ScriptedCamera {
    frames: Vec<Frame>,
    position: usize,
    fps: f64,
    refuse_settings: bool,
    settings: Arc<Mutex<CameraSettings>>,
}

impl ScriptedCamera {
    pub(crate) fn new(frames: Vec<Frame>, fps: f64) -> Self {
        Self {
            frames,
            fps,
            ..Self::default()
        }
    }

    pub(crate) fn refusing_settings(mut self) -> Self {
        self.refuse_settings = true;
        self
    }

    pub(crate) fn settings(&self) -> Arc<Mutex<CameraSettings>> {
        Arc::clone(&self.settings)
    }
}

impl FrameStream for ScriptedCamera {
    fn read(&mut self) -> Option<Frame> {
        let frame = self.frames.get(self.position)?.clone();
        self.position += 1;
        Some(frame)
    }

    fn seek(&mut self, frame_index: usize) -> bool {
        (0..frame_index).all(|_| self.read().is_some())
    }

    fn fps(&self) -> f64 {
        self.fps
    }
}

impl CameraDevice for ScriptedCamera {
    fn set_buffer_size(&mut self, frames: u32) -> bool {
        self.settings.lock().unwrap().buffer_size = Some(frames);
        !self.refuse_settings
    }

    fn set_resolution(&mut self, resolution: Resolution) -> bool {
        self.settings.lock().unwrap().resolution = Some(resolution);
        !self.refuse_settings
    }

    fn set_autofocus(&mut self, enabled: bool) -> bool {
        self.settings.lock().unwrap().autofocus = Some(enabled);
        !self.refuse_settings
    }

    fn set_fourcc(&mut self, fourcc: [u8; 4]) -> bool {
        self.settings.lock().unwrap().fourcc = Some(fourcc);
        !self.refuse_settings
    }
}

/// Decoder whose images, videos and cameras are registered up front.
/// Counts every call so tests can assert nothing was touched.
#[derive(Default)]
pub(crate) struct FakeDecoder {
    images: HashMap<PathBuf, Frame>,
    videos: HashMap<PathBuf, ScriptedStream>,
    cameras: HashMap<u32, ScriptedCamera>,
    calls: AtomicUsize,
}

impl FakeDecoder {
    pub(crate) fn with_image(mut self, path: impl Into<PathBuf>, frame: Frame) -> Self {
        self.images.insert(path.into(), frame);
        self
    }

    pub(crate) fn with_video(mut self, path: impl Into<PathBuf>, stream: ScriptedStream) -> Self {
        self.videos.insert(path.into(), stream);
        self
    }

    pub(crate) fn with_camera(mut self, index: u32, camera: ScriptedCamera) -> Self {
        self.cameras.insert(index, camera);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FrameDecoder for FakeDecoder {
    fn decode_image(&self, path: &Path) -> Option<Frame> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.images.get(path).cloned()
    }

    fn open_video(&self, path: &Path) -> Option<Box<dyn FrameStream>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let stream = self.videos.get(path)?.clone();
        Some(Box::new(stream))
    }

    fn open_camera(&self, index: u32) -> Option<Box<dyn CameraDevice>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let camera = self.cameras.get(&index)?.clone();
        Some(Box::new(camera))
    }
}
