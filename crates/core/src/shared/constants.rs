/// Frame rate reported by still-image and directory sources.
pub const STILL_FRAME_RATE: f64 = 1.0;

/// Frame rate assumed for a camera that does not report a positive rate.
pub const DEFAULT_CAMERA_FPS: f64 = 30.0;

/// Capture format requested from cameras.
pub const CAMERA_FOURCC: [u8; 4] = *b"MJPG";

/// Frames buffered inside the camera driver; one keeps reads close to live.
pub const CAMERA_BUFFER_FRAMES: u32 = 1;

pub const DEFAULT_CAMERA_RESOLUTION: (u32, u32) = (1280, 720);
