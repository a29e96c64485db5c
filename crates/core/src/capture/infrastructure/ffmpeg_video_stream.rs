use std::path::Path;

use crate::capture::domain::frame_decoder::FrameStream;
use crate::shared::frame::Frame;

/// Decodes a video file via ffmpeg-next (libavformat + libavcodec).
///
/// Frames come out as RGB24. Seeking rewinds to the start of the file and
/// decodes forward, which is exact regardless of keyframe placement.
pub struct FfmpegVideoStream {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    video_stream_index: usize,
    width: u32,
    height: u32,
    fps: f64,
    position: usize,
    flushing: bool,
    done: bool,
}

// Safety: FfmpegVideoStream is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegVideoStream {}

impl FfmpegVideoStream {
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            video_stream_index,
            width,
            height,
            fps,
            position: 0,
            flushing: false,
            done: false,
        })
    }

    fn try_receive(&mut self) -> Option<Frame> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return None;
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
            log::warn!("FfmpegVideoStream: scaling failed: {e}");
            return None;
        }

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.position);
        self.position += 1;
        Some(frame)
    }

    fn decode_next(&mut self) -> Option<Frame> {
        if self.done {
            return None;
        }

        if let Some(frame) = self.try_receive() {
            return Some(frame);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(frame) = self.try_receive() {
                    return Some(frame);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }

            if let Some(frame) = self.try_receive() {
                return Some(frame);
            }
        }
    }

    fn rewind(&mut self) -> bool {
        if let Err(e) = self.ictx.seek(0, ..) {
            log::debug!("FfmpegVideoStream: rewind failed: {e}");
            return false;
        }
        self.decoder.flush();
        self.position = 0;
        self.flushing = false;
        self.done = false;
        true
    }
}

impl FrameStream for FfmpegVideoStream {
    fn read(&mut self) -> Option<Frame> {
        self.decode_next()
    }

    fn seek(&mut self, frame_index: usize) -> bool {
        if frame_index == self.position && !self.done {
            return true;
        }
        if !self.rewind() {
            return false;
        }
        while self.position < frame_index {
            if self.decode_next().is_none() {
                return false;
            }
        }
        true
    }

    fn fps(&self) -> f64 {
        self.fps
    }
}

/// Packs the first plane of an RGB24 frame row by row, dropping the
/// per-row alignment padding ffmpeg leaves after `width * 3` bytes.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let row_len = width as usize * 3;
    rgb_frame
        .data(0)
        .chunks(rgb_frame.stride(0))
        .take(height as usize)
        .flat_map(|row| &row[..row_len])
        .copied()
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Writes an MPEG-4 clip with one flat gray frame per entry of `levels`.
    pub(crate) fn write_gray_clip(path: &Path, levels: &[u8], width: u32, height: u32, fps: i32) {
        use ffmpeg_next::format::Pixel;
        use ffmpeg_next::util::frame::video::Video;
        use ffmpeg_next::Rational;

        ffmpeg_next::init().unwrap();
        let mut octx = ffmpeg_next::format::output(path).unwrap();
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut settings = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        settings.set_width(width);
        settings.set_height(height);
        settings.set_format(Pixel::YUV420P);
        settings.set_time_base(Rational(1, fps));
        settings.set_frame_rate(Some(Rational(fps, 1)));
        if global_header {
            settings.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }
        let mut encoder = settings.open_with(ffmpeg_next::Dictionary::new()).unwrap();

        octx.add_stream(Some(codec))
            .unwrap()
            .set_parameters(&encoder);
        octx.write_header().unwrap();
        let stream_time_base = octx.stream(0).unwrap().time_base();

        let mut to_yuv = ffmpeg_next::software::scaling::Context::get(
            Pixel::RGB24,
            width,
            height,
            Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .unwrap();

        // One extra step with no level flushes the encoder.
        let steps = levels.iter().copied().map(Some).chain(std::iter::once(None));
        for (pts, level) in steps.enumerate() {
            match level {
                Some(level) => {
                    let mut rgb = Video::new(Pixel::RGB24, width, height);
                    let stride = rgb.stride(0);
                    for row in rgb.data_mut(0).chunks_mut(stride).take(height as usize) {
                        row[..width as usize * 3].fill(level);
                    }
                    let mut yuv = Video::empty();
                    to_yuv.run(&rgb, &mut yuv).unwrap();
                    yuv.set_pts(Some(pts as i64));
                    encoder.send_frame(&yuv).unwrap();
                }
                None => encoder.send_eof().unwrap(),
            }

            let mut packet = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut packet).is_ok() {
                packet.set_stream(0);
                packet.rescale_ts(Rational(1, fps), stream_time_base);
                packet.write_interleaved(&mut octx).unwrap();
            }
        }
        octx.write_trailer().unwrap();
    }

    /// 160x120 at 30 fps; frame `i` has gray level `i * 40`.
    fn test_video(dir: &Path, num_frames: usize) -> PathBuf {
        let path = dir.join("test.mp4");
        let levels: Vec<u8> = (0..num_frames).map(|i| (i * 40) as u8).collect();
        write_gray_clip(&path, &levels, 160, 120, 30);
        path
    }

    #[test]
    fn test_open_reports_fps() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video(dir.path(), 5);
        let stream = FfmpegVideoStream::open(&path).unwrap();
        assert!(stream.fps() > 0.0);
    }

    #[test]
    fn test_open_nonexistent_fails() {
        assert!(FfmpegVideoStream::open(Path::new("/nonexistent/test.mp4")).is_err());
    }

    #[test]
    fn test_reads_every_frame_then_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video(dir.path(), 5);
        let mut stream = FfmpegVideoStream::open(&path).unwrap();

        let mut count = 0;
        while let Some(frame) = stream.read() {
            assert_eq!(frame.index(), count);
            assert_eq!(frame.channels(), 3);
            assert_eq!(frame.data().len(), 160 * 120 * 3);
            count += 1;
        }
        assert_eq!(count, 5);
        assert!(stream.read().is_none());
    }

    #[test]
    fn test_seek_positions_next_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video(dir.path(), 5);
        let mut stream = FfmpegVideoStream::open(&path).unwrap();

        assert!(stream.seek(3));
        let frame = stream.read().unwrap();
        assert_eq!(frame.index(), 3);
        assert!((frame.mean_intensity() - 120.0).abs() <= 8.0);
    }

    #[test]
    fn test_seek_after_end_rewinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video(dir.path(), 3);
        let mut stream = FfmpegVideoStream::open(&path).unwrap();
        while stream.read().is_some() {}

        assert!(stream.seek(0));
        assert_eq!(stream.read().unwrap().index(), 0);
    }

    #[test]
    fn test_seek_past_end_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video(dir.path(), 3);
        let mut stream = FfmpegVideoStream::open(&path).unwrap();
        assert!(!stream.seek(10));
    }
}
