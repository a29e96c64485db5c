use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::capture::domain::capture_error::{CaptureError, ProbeError};
use crate::capture::domain::capture_source::{CaptureSource, SourceKind};
use crate::capture::domain::frame_decoder::FrameDecoder;
use crate::capture::domain::read_metrics::{record_since, ReadMetrics};
use crate::shared::constants::STILL_FRAME_RATE;
use crate::shared::frame::Frame;

/// Images of a directory, in lexicographic file-name order.
///
/// The listing is taken once at construction. Entries are decoded lazily,
/// one per `read`, and entries that fail to decode are skipped. Decodable
/// entries are counted to honor `initial_frame_index`; on a looping restart
/// that count is re-derived from the start of the listing, so a directory
/// whose files change between passes is tolerated.
pub struct DirectorySource {
    dir: PathBuf,
    names: Vec<PathBuf>,
    file_cursor: usize,
    emitted: usize,
    initial_frame_index: usize,
    read_length_limit: usize,
    looping: bool,
    decoder: Arc<dyn FrameDecoder>,
    metrics: Arc<dyn ReadMetrics>,
}

impl DirectorySource {
    pub fn open(
        dir: &Path,
        looping: bool,
        initial_frame_index: usize,
        read_length_limit: usize,
        decoder: Arc<dyn FrameDecoder>,
        metrics: Arc<dyn ReadMetrics>,
    ) -> Result<Self, ProbeError> {
        let entries = fs::read_dir(dir).map_err(|_| {
            ProbeError::invalid_input(format!("Can't find the dir by {}", dir.display()))
        })?;
        let mut names: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| PathBuf::from(entry.file_name()))
            .collect();
        if names.is_empty() {
            return Err(ProbeError::open_error(format!(
                "The dir {} is empty",
                dir.display()
            )));
        }
        names.sort();

        let mut source = Self {
            dir: dir.to_path_buf(),
            names,
            file_cursor: 0,
            emitted: 0,
            initial_frame_index,
            read_length_limit,
            looping,
            decoder,
            metrics,
        };

        // Park the cursor on the first entry to emit; `read` decodes it again.
        match source.find_initial_entry() {
            Some((position, _)) => {
                source.file_cursor = position;
                Ok(source)
            }
            None => Err(ProbeError::open_error(format!(
                "Can't read the first image from {}",
                dir.display()
            ))),
        }
    }

    fn decode(&self, position: usize) -> Option<Frame> {
        let path = self.dir.join(&self.names[position]);
        let frame = self.decoder.decode_image(&path);
        match &frame {
            Some(f) => log::debug!(
                "DirectorySource: image {}, {}x{}",
                self.names[position].display(),
                f.width(),
                f.height()
            ),
            None => log::debug!(
                "DirectorySource: skipping undecodable {}",
                self.names[position].display()
            ),
        }
        frame
    }

    /// Scans from the top of the listing for the `initial_frame_index`-th
    /// decodable entry. Returns its position and frame.
    fn find_initial_entry(&self) -> Option<(usize, Frame)> {
        let mut decodable = 0;
        for position in 0..self.names.len() {
            if let Some(frame) = self.decode(position) {
                decodable += 1;
                if decodable > self.initial_frame_index {
                    return Some((position, frame));
                }
            }
        }
        None
    }

    fn next_in_pass(&mut self) -> Option<Frame> {
        while self.file_cursor < self.names.len() && self.emitted < self.read_length_limit {
            let position = self.file_cursor;
            self.file_cursor += 1;
            if let Some(frame) = self.decode(position) {
                self.emitted += 1;
                return Some(frame);
            }
        }
        None
    }

    fn restart_pass(&mut self) -> Option<Frame> {
        self.file_cursor = self.names.len();
        let (position, frame) = self.find_initial_entry()?;
        self.file_cursor = position + 1;
        self.emitted = 1;
        Some(frame)
    }
}

impl CaptureSource for DirectorySource {
    fn read(&mut self) -> Result<Option<Frame>, CaptureError> {
        let start = Instant::now();

        let mut frame = self.next_in_pass();
        if frame.is_none() && self.looping {
            frame = self.restart_pass();
        }

        let frame = frame.map(|f| f.with_index(self.initial_frame_index + self.emitted - 1));
        if frame.is_some() {
            record_since(self.metrics.as_ref(), start);
        }
        Ok(frame)
    }

    fn frame_rate(&self) -> f64 {
        STILL_FRAME_RATE
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Dir
    }
}
