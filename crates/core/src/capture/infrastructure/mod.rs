pub mod ffmpeg_video_stream;
pub mod image_crate_decoder;
pub mod system_decoder;
#[cfg(target_os = "linux")]
pub mod v4l2_camera;
