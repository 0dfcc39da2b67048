//! Coordinate conversion between the rendered view and the source frame.
//!
//! The view pipeline is: crop (source space) → scale to fit the display
//! bounds → rotate clockwise by the current quadrant. `ViewTransform`
//! inverts that pipeline for clicks and replays it for drawing, so points
//! are always stored in source space and never move when the view changes.

use anyhow::{anyhow, bail, Result};

/// View rotation in clockwise quarter turns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Builds a rotation from a quadrant number (0..=3).
    pub fn from_quadrant(quadrant: u8) -> Result<Self> {
        match quadrant {
            0 => Ok(Self::Deg0),
            1 => Ok(Self::Deg90),
            2 => Ok(Self::Deg180),
            3 => Ok(Self::Deg270),
            _ => Err(anyhow!("Invalid rotation quadrant: {}", quadrant)),
        }
    }

    pub fn quadrant(self) -> u8 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 1,
            Self::Deg180 => 2,
            Self::Deg270 => 3,
        }
    }

    /// Next quadrant in the 0 → 1 → 2 → 3 → 0 cycle.
    pub fn next(self) -> Self {
        match self {
            Self::Deg0 => Self::Deg90,
            Self::Deg90 => Self::Deg180,
            Self::Deg180 => Self::Deg270,
            Self::Deg270 => Self::Deg0,
        }
    }

    /// True when the rotated view swaps width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// An axis-aligned crop of the source frame, in source pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Normalizes two drag corners into a rectangle clamped to the frame.
    ///
    /// The corners may be given in any order. Returns an error if the
    /// resulting rectangle has no area inside the frame.
    pub fn from_corners(a: (i32, i32), b: (i32, i32), frame_size: (u32, u32)) -> Result<Self> {
        let (fw, fh) = (frame_size.0 as i32, frame_size.1 as i32);
        let x0 = a.0.min(b.0).clamp(0, fw);
        let y0 = a.1.min(b.1).clamp(0, fh);
        let x1 = a.0.max(b.0).clamp(0, fw);
        let y1 = a.1.max(b.1).clamp(0, fh);

        if x1 <= x0 || y1 <= y0 {
            bail!(
                "Malformed crop rectangle ({}, {})-({}, {}) in {}x{} frame",
                a.0,
                a.1,
                b.0,
                b.1,
                fw,
                fh
            );
        }

        Ok(Self {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }

    /// The whole frame as a crop.
    pub fn full(frame_size: (u32, u32)) -> Self {
        Self {
            x: 0,
            y: 0,
            width: frame_size.0,
            height: frame_size.1,
        }
    }

    /// Combined width + height, compared against the minimum crop extent.
    pub fn extent(&self) -> u32 {
        self.width + self.height
    }
}

/// Rotation and crop history of the calibration view.
///
/// Only the most recent crop is applied; earlier ones are kept for undo.
#[derive(Clone, Debug, Default)]
pub struct ViewState {
    pub rotation: Rotation,
    crops: Vec<CropRect>,
}

impl ViewState {
    pub fn current_crop(&self) -> Option<CropRect> {
        self.crops.last().copied()
    }

    pub fn push_crop(&mut self, crop: CropRect) {
        self.crops.push(crop);
    }

    /// Drops the most recent crop. Returns false if there was nothing to undo.
    pub fn undo_crop(&mut self) -> bool {
        self.crops.pop().is_some()
    }

    pub fn crop_history_len(&self) -> usize {
        self.crops.len()
    }

    pub fn rotate(&mut self) {
        self.rotation = self.rotation.next();
    }
}

/// Picks the display scale for a (cropped) frame of the given size.
///
/// Frames larger than `max_size` on their long side are shrunk to it,
/// frames smaller than `min_size` are enlarged to it, anything else is shown 1:1.
pub fn fit_scale(width: u32, height: u32, min_size: u32, max_size: u32) -> f64 {
    let longest = width.max(height);
    if longest == 0 {
        return 1.0;
    }
    if longest > max_size {
        max_size as f64 / longest as f64
    } else if longest < min_size {
        min_size as f64 / longest as f64
    } else {
        1.0
    }
}

/// A snapshot of the view pipeline for one rendered frame.
#[derive(Clone, Copy, Debug)]
pub struct ViewTransform {
    crop: CropRect,
    rotation: Rotation,
    scale: f64,
    scaled_size: (u32, u32),
}

impl ViewTransform {
    pub fn new(frame_size: (u32, u32), view: &ViewState, min_size: u32, max_size: u32) -> Self {
        let crop = view
            .current_crop()
            .unwrap_or_else(|| CropRect::full(frame_size));
        let scale = fit_scale(crop.width, crop.height, min_size, max_size);
        let scaled_size = (
            ((crop.width as f64 * scale).round() as u32).max(1),
            ((crop.height as f64 * scale).round() as u32).max(1),
        );

        Self {
            crop,
            rotation: view.rotation,
            scale,
            scaled_size,
        }
    }

    pub fn crop(&self) -> CropRect {
        self.crop
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Size of the cropped frame after scaling, before rotation.
    pub fn scaled_size(&self) -> (u32, u32) {
        self.scaled_size
    }

    /// Size of the rendered view.
    pub fn display_size(&self) -> (u32, u32) {
        let (w, h) = self.scaled_size;
        if self.rotation.swaps_axes() { (h, w) } else { (w, h) }
    }

    pub fn contains_display(&self, point: (i32, i32)) -> bool {
        let (w, h) = self.display_size();
        point.0 >= 0 && point.1 >= 0 && point.0 < w as i32 && point.1 < h as i32
    }

    /// Display pixel → source pixel: undo rotation, then scale, then crop offset.
    pub fn to_source(&self, display: (i32, i32)) -> (i32, i32) {
        let (sw, sh) = (self.scaled_size.0 as i64, self.scaled_size.1 as i64);
        let (dx, dy) = (display.0 as i64, display.1 as i64);

        let (x, y) = match self.rotation {
            Rotation::Deg0 => (dx, dy),
            Rotation::Deg90 => (dy, sh - 1 - dx),
            Rotation::Deg180 => (sw - 1 - dx, sh - 1 - dy),
            Rotation::Deg270 => (sw - 1 - dy, dx),
        };

        // Rounding can land one past the last crop pixel when upscaled.
        let sx = ((x as f64 / self.scale).round() as i32).clamp(0, self.crop.width as i32 - 1);
        let sy = ((y as f64 / self.scale).round() as i32).clamp(0, self.crop.height as i32 - 1);
        (sx + self.crop.x as i32, sy + self.crop.y as i32)
    }

    /// Source pixel → display pixel; the inverse of `to_source`.
    pub fn to_display(&self, source: (i32, i32)) -> (i32, i32) {
        let (sw, sh) = (self.scaled_size.0 as i64, self.scaled_size.1 as i64);
        let x = ((source.0 - self.crop.x as i32) as f64 * self.scale).round() as i64;
        let y = ((source.1 - self.crop.y as i32) as f64 * self.scale).round() as i64;

        let (dx, dy) = match self.rotation {
            Rotation::Deg0 => (x, y),
            Rotation::Deg90 => (sh - 1 - y, x),
            Rotation::Deg180 => (sw - 1 - x, sh - 1 - y),
            Rotation::Deg270 => (y, sw - 1 - x),
        };

        (dx as i32, dy as i32)
    }

    /// Maps an on-screen direction to the matching source-space direction.
    ///
    /// Used to nudge points so that "up" follows the rotated view.
    pub fn direction_to_source(&self, dx: i32, dy: i32) -> (i32, i32) {
        match self.rotation {
            Rotation::Deg0 => (dx, dy),
            Rotation::Deg90 => (dy, -dx),
            Rotation::Deg180 => (-dx, -dy),
            Rotation::Deg270 => (-dy, dx),
        }
    }
}
