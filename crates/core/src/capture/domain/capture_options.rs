use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shared::constants::DEFAULT_CAMERA_RESOLUTION;

/// Requested capture size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        let (width, height) = DEFAULT_CAMERA_RESOLUTION;
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    /// Parses `"WIDTHxHEIGHT"`, e.g. `"1280x720"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
        let width = w
            .parse::<u32>()
            .map_err(|e| format!("invalid width '{w}': {e}"))?;
        let height = h
            .parse::<u32>()
            .map_err(|e| format!("invalid height '{h}': {e}"))?;
        if width == 0 || height == 0 {
            return Err(format!("resolution must be non-zero, got '{s}'"));
        }
        Ok(Self { width, height })
    }
}

/// Caller-owned settings shared by every source kind.
///
/// `read_length_limit` counts frames emitted per pass before the source
/// loops or stops. It must be positive; the resolver rejects zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    pub looping: bool,
    pub initial_frame_index: usize,
    pub read_length_limit: usize,
    pub camera_resolution: Resolution,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            looping: false,
            initial_frame_index: 0,
            read_length_limit: usize::MAX,
            camera_resolution: Resolution::default(),
        }
    }
}

impl CaptureOptions {
    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_initial_frame_index(mut self, index: usize) -> Self {
        self.initial_frame_index = index;
        self
    }

    pub fn with_read_length_limit(mut self, limit: usize) -> Self {
        self.read_length_limit = limit;
        self
    }

    pub fn with_camera_resolution(mut self, resolution: Resolution) -> Self {
        self.camera_resolution = resolution;
        self
    }

    /// Loads options from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let options = serde_json::from_str(&json)
            .map_err(|e| format!("invalid capture options in {}: {e}", path.display()))?;
        Ok(options)
    }
}
