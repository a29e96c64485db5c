use ouroboros::self_referencing;
use v4l::buffer::Type;
use v4l::control::{Control, Value};
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::FourCC;

use crate::capture::domain::capture_options::Resolution;
use crate::capture::domain::frame_decoder::{CameraDevice, FrameStream};
use crate::capture::infrastructure::image_crate_decoder::rgb_frame;
use crate::shared::constants::CAMERA_BUFFER_FRAMES;
use crate::shared::frame::Frame;

/// V4L2_CID_FOCUS_AUTO from linux/v4l2-controls.h.
const V4L2_CID_FOCUS_AUTO: u32 = 0x009a_090c;

/// A V4L2 camera (`/dev/videoN`).
///
/// Settings are applied to the device node while it is idle; the mmap
/// stream is started lazily on the first read, with the configured number
/// of driver buffers. MJPG frames are decoded to RGB; RGB3 frames are
/// passed through.
pub struct V4l2Camera {
    index: u32,
    state: CameraState,
    buffer_count: u32,
    width: u32,
    height: u32,
    fourcc: FourCC,
    fps: f64,
}

enum CameraState {
    Idle(v4l::Device),
    Streaming(StreamingDevice),
    Failed,
}

#[self_referencing]
struct StreamingDevice {
    device: v4l::Device,
    #[borrows(device)]
    #[covariant]
    stream: MmapStream<'this>,
}

impl V4l2Camera {
    pub fn open(index: u32) -> std::io::Result<Self> {
        let device = v4l::Device::new(index as usize)?;
        let format = device.format()?;
        let fps = device
            .params()
            .map(|params| {
                let interval = params.interval;
                if interval.numerator == 0 {
                    0.0
                } else {
                    interval.denominator as f64 / interval.numerator as f64
                }
            })
            .unwrap_or(0.0);

        log::info!(
            "V4l2Camera: opened /dev/video{index} ({}x{} {}, {fps:.1} fps)",
            format.width,
            format.height,
            format.fourcc
        );

        Ok(Self {
            index,
            state: CameraState::Idle(device),
            buffer_count: CAMERA_BUFFER_FRAMES,
            width: format.width,
            height: format.height,
            fourcc: format.fourcc,
            fps,
        })
    }

    fn idle_device(&self) -> Option<&v4l::Device> {
        match &self.state {
            CameraState::Idle(device) => Some(device),
            _ => None,
        }
    }

    /// Reads the current format, lets `change` edit it, and applies it.
    /// Returns the format the driver settled on.
    fn update_format(&mut self, change: impl FnOnce(&mut v4l::Format)) -> Option<v4l::Format> {
        let device = self.idle_device()?;
        let mut format = device.format().ok()?;
        change(&mut format);
        match device.set_format(&format) {
            Ok(applied) => {
                self.width = applied.width;
                self.height = applied.height;
                self.fourcc = applied.fourcc;
                Some(applied)
            }
            Err(e) => {
                log::debug!("V4l2Camera: set_format on /dev/video{}: {e}", self.index);
                None
            }
        }
    }

    fn start_streaming(&mut self) -> bool {
        let state = std::mem::replace(&mut self.state, CameraState::Failed);
        self.state = match state {
            CameraState::Idle(device) => {
                let buffer_count = self.buffer_count;
                let built = StreamingDeviceTryBuilder {
                    device,
                    stream_builder: |device| {
                        MmapStream::with_buffers(device, Type::VideoCapture, buffer_count)
                    },
                }
                .try_build();
                match built {
                    Ok(streaming) => CameraState::Streaming(streaming),
                    Err(e) => {
                        log::warn!("V4l2Camera: can't start /dev/video{}: {e}", self.index);
                        CameraState::Failed
                    }
                }
            }
            other => other,
        };
        matches!(self.state, CameraState::Streaming(_))
    }

    fn capture(&mut self) -> Option<Vec<u8>> {
        if !matches!(self.state, CameraState::Streaming(_)) && !self.start_streaming() {
            return None;
        }
        let CameraState::Streaming(streaming) = &mut self.state else {
            return None;
        };
        match streaming.with_stream_mut(|stream| stream.next().map(|(buf, _)| buf.to_vec())) {
            Ok(buf) => Some(buf),
            Err(e) => {
                log::warn!("V4l2Camera: capture from /dev/video{} failed: {e}", self.index);
                None
            }
        }
    }

    fn to_frame(&self, buf: Vec<u8>) -> Option<Frame> {
        match &self.fourcc.repr {
            b"MJPG" => image::load_from_memory_with_format(&buf, image::ImageFormat::Jpeg)
                .map(rgb_frame)
                .map_err(|e| log::warn!("V4l2Camera: corrupt MJPG frame: {e}"))
                .ok(),
            b"RGB3" if buf.len() == (self.width * self.height * 3) as usize => {
                Some(Frame::new(buf, self.width, self.height, 3, 0))
            }
            _ => {
                log::warn!(
                    "V4l2Camera: unsupported capture format {} on /dev/video{}",
                    self.fourcc,
                    self.index
                );
                None
            }
        }
    }
}

impl FrameStream for V4l2Camera {
    fn read(&mut self) -> Option<Frame> {
        let buf = self.capture()?;
        self.to_frame(buf)
    }

    /// A live device cannot rewind; seeking discards `frame_index` frames.
    fn seek(&mut self, frame_index: usize) -> bool {
        (0..frame_index).all(|_| self.capture().is_some())
    }

    fn fps(&self) -> f64 {
        self.fps
    }
}

impl CameraDevice for V4l2Camera {
    fn set_buffer_size(&mut self, frames: u32) -> bool {
        if self.idle_device().is_none() || frames == 0 {
            return false;
        }
        self.buffer_count = frames;
        true
    }

    fn set_resolution(&mut self, resolution: Resolution) -> bool {
        self.update_format(|format| {
            format.width = resolution.width;
            format.height = resolution.height;
        })
        .is_some_and(|applied| applied.width == resolution.width && applied.height == resolution.height)
    }

    fn set_autofocus(&mut self, enabled: bool) -> bool {
        let Some(device) = self.idle_device() else {
            return false;
        };
        device
            .set_control(Control {
                id: V4L2_CID_FOCUS_AUTO,
                value: Value::Boolean(enabled),
            })
            .is_ok()
    }

    fn set_fourcc(&mut self, fourcc: [u8; 4]) -> bool {
        self.update_format(|format| format.fourcc = FourCC::new(&fourcc))
            .is_some_and(|applied| applied.fourcc.repr == fourcc)
    }
}
