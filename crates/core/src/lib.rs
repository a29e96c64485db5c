//! Frame sources over still images, image directories, video files and
//! cameras, behind one resolver that picks the right one from a string.

pub mod capture {
    pub mod capture_resolver;
    pub mod domain {
        pub mod camera_source;
        pub mod capture_error;
        pub mod capture_options;
        pub mod capture_source;
        pub mod directory_source;
        pub mod frame_decoder;
        pub mod image_source;
        pub mod read_metrics;
        pub mod video_source;
    }
    pub mod infrastructure;
    #[cfg(test)]
    pub(crate) mod test_support;
}

pub mod shared {
    pub mod constants;
    pub mod frame;
}

pub use capture::capture_resolver::{open_images_capture, CaptureResolver};
pub use capture::domain::capture_error::CaptureError;
pub use capture::domain::capture_options::{CaptureOptions, Resolution};
pub use capture::domain::capture_source::{CaptureSource, SourceKind};
