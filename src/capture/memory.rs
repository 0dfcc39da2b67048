//! In-memory frame source for tests.

use anyhow::Result;
use image::RgbaImage;

use super::FrameSource;

pub struct MemorySource {
    frames: Vec<RgbaImage>,
    rate: f64,
    cursor: u64,
}

impl MemorySource {
    pub fn new(frames: Vec<RgbaImage>, rate: f64) -> Self {
        Self {
            frames,
            rate,
            cursor: 0,
        }
    }
}

impl FrameSource for MemorySource {
    fn seek(&mut self, index: u64) -> Result<()> {
        self.cursor = index;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<RgbaImage>> {
        let frame = self.frames.get(self.cursor as usize).cloned();
        self.cursor += 1;
        Ok(frame)
    }

    fn frame_rate(&self) -> f64 {
        self.rate
    }

    fn total_frames(&self) -> u64 {
        self.frames.len() as u64
    }
}
