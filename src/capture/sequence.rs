//! Still-frame sequence source.
//!
//! Reads a directory of exported frames (e.g. `frame_0001.png`, `frame_0002.png`)
//! in numeric order. The frame rate is supplied by configuration because
//! still images carry no timing.

use anyhow::{anyhow, bail, Context, Result};
use image::RgbaImage;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use super::FrameSource;

/// File extensions accepted as frames.
const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Last run of digits in a file stem, e.g. `42` in `take2_frame_0042`.
const FRAME_NUMBER_PATTERN: &str = r"(\d+)\D*$";

pub struct ImageSequenceSource {
    frames: Vec<PathBuf>,
    rate: f64,
    cursor: u64,
}

impl ImageSequenceSource {
    /// Lists the frames in `dir`, ordered by the number in their names.
    pub fn open(dir: &Path, rate: f64) -> Result<Self> {
        if rate <= 0.0 {
            bail!("Frame rate must be positive, got {}", rate);
        }

        let number_regex = Regex::new(FRAME_NUMBER_PATTERN)?;
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to open frame directory: {}", dir.display()))?;

        let mut frames: Vec<(Option<u64>, PathBuf)> = Vec::new();
        for entry in entries {
            let path = entry.context("Failed to read frame directory entry")?.path();
            if !is_frame_file(&path) {
                continue;
            }
            let number = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|stem| frame_number(stem, &number_regex));
            frames.push((number, path));
        }

        if frames.is_empty() {
            bail!("No frames found in {}", dir.display());
        }

        // Numbered frames first in numeric order, unnumbered ones after by name.
        frames.sort_by(|(na, pa), (nb, pb)| match (na, nb) {
            (Some(a), Some(b)) => a.cmp(b).then_with(|| pa.cmp(pb)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => pa.cmp(pb),
        });

        crate::log(&format!(
            "Frame sequence: {} frames at {:.2} fps from {}",
            frames.len(),
            rate,
            dir.display()
        ));

        Ok(Self {
            frames: frames.into_iter().map(|(_, p)| p).collect(),
            rate,
            cursor: 0,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn seek(&mut self, index: u64) -> Result<()> {
        self.cursor = index;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<RgbaImage>> {
        let Some(path) = self.frames.get(self.cursor as usize) else {
            return Ok(None);
        };
        let img = image::open(path)
            .map_err(|e| anyhow!("Failed to decode frame {}: {}", path.display(), e))?
            .to_rgba8();
        self.cursor += 1;
        Ok(Some(img))
    }

    fn frame_rate(&self) -> f64 {
        self.rate
    }

    fn total_frames(&self) -> u64 {
        self.frames.len() as u64
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

fn frame_number(stem: &str, regex: &Regex) -> Option<u64> {
    regex
        .captures(stem)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use tempfile::tempdir;

    fn write_frame(dir: &Path, name: &str, shade: u8) {
        let img: RgbaImage = ImageBuffer::from_pixel(4, 4, Rgba([shade, shade, shade, 255]));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_frame_number_uses_last_digits() {
        let regex = Regex::new(FRAME_NUMBER_PATTERN).unwrap();
        assert_eq!(frame_number("take2_frame_0042", &regex), Some(42));
        assert_eq!(frame_number("frame10b", &regex), Some(10));
        assert_eq!(frame_number("cover", &regex), None);
    }

    #[test]
    fn test_frames_ordered_numerically() {
        let dir = tempdir().unwrap();
        write_frame(dir.path(), "frame_10.png", 30);
        write_frame(dir.path(), "frame_2.png", 20);
        write_frame(dir.path(), "frame_1.png", 10);
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequenceSource::open(dir.path(), 1.0).unwrap();
        assert_eq!(source.total_frames(), 3);

        let shades: Vec<u8> = (0..3)
            .map(|i| source.frame_at(i).unwrap().unwrap().get_pixel(0, 0)[0])
            .collect();
        assert_eq!(shades, vec![10, 20, 30]);
    }

    #[test]
    fn test_read_past_end_returns_none() {
        let dir = tempdir().unwrap();
        write_frame(dir.path(), "0001.png", 0);

        let mut source = ImageSequenceSource::open(dir.path(), 25.0).unwrap();
        assert!(source.read_frame().unwrap().is_some());
        assert!(source.read_frame().unwrap().is_none());
        assert!(source.frame_at(5).unwrap().is_none());
        assert!((source.duration_secs() - 0.04).abs() < 1e-9);
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(ImageSequenceSource::open(dir.path(), 1.0).is_err());
        assert!(ImageSequenceSource::open(dir.path(), 0.0).is_err());
    }
}
