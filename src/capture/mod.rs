//! Frame sources for calibration and scanning.
//!
//! This module provides:
//! - The `FrameSource` trait the scanner pulls frames through
//! - `ImageSequenceSource`, a directory of numbered still frames

#[cfg(test)]
pub mod memory;
pub mod sequence;

pub use sequence::ImageSequenceSource;

use anyhow::Result;
use image::RgbaImage;

/// A seekable stream of frames with a known rate.
pub trait FrameSource {
    /// Positions the stream so the next `read_frame` returns frame `index`.
    fn seek(&mut self, index: u64) -> Result<()>;

    /// Reads the frame at the current position and advances.
    ///
    /// Returns `Ok(None)` at the end of the stream.
    fn read_frame(&mut self) -> Result<Option<RgbaImage>>;

    /// Frames per second.
    fn frame_rate(&self) -> f64;

    fn total_frames(&self) -> u64;

    /// Seeks to `index` and reads that frame.
    fn frame_at(&mut self, index: u64) -> Result<Option<RgbaImage>> {
        self.seek(index)?;
        self.read_frame()
    }

    /// Length of the stream in seconds.
    fn duration_secs(&self) -> f64 {
        let rate = self.frame_rate();
        if rate > 0.0 {
            self.total_frames() as f64 / rate
        } else {
            0.0
        }
    }
}
