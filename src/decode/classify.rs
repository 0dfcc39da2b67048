use image::{Rgba, RgbaImage};

use super::table::SegmentReading;
use crate::calibration::state::SEGMENTS_PER_DIGIT;

/// Reference colours of a lit and an unlit segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorReference {
    pub on: [u8; 3],
    pub off: [u8; 3],
}

impl ColorReference {
    pub fn new(on: [u8; 3], off: [u8; 3]) -> Self {
        Self { on, off }
    }

    /// Classifies a pixel as lit when it is strictly closer to the "on" colour.
    ///
    /// Distance is the summed absolute channel difference; alpha is ignored.
    pub fn is_lit(&self, pixel: &Rgba<u8>) -> bool {
        let rgb = [pixel[0], pixel[1], pixel[2]];
        color_distance(rgb, self.on) < color_distance(rgb, self.off)
    }
}

/// Sum of absolute per-channel differences.
pub fn color_distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as i32 - *y as i32).unsigned_abs())
        .sum()
}

/// Returns the pixel at a source-space position, or `None` outside the frame.
pub fn sample_pixel(frame: &RgbaImage, position: (i32, i32)) -> Option<Rgba<u8>> {
    let (x, y) = position;
    if x < 0 || y < 0 || x as u32 >= frame.width() || y as u32 >= frame.height() {
        return None;
    }
    Some(*frame.get_pixel(x as u32, y as u32))
}

/// Reads the on/off state of seven role-ordered positions from a raw frame.
///
/// Positions outside the frame read as off.
pub fn read_segments(
    frame: &RgbaImage,
    positions: &[(i32, i32); SEGMENTS_PER_DIGIT],
    reference: &ColorReference,
) -> SegmentReading {
    let mut reading = [false; SEGMENTS_PER_DIGIT];
    for (slot, position) in reading.iter_mut().zip(positions.iter()) {
        *slot = match sample_pixel(frame, *position) {
            Some(pixel) => reference.is_lit(&pixel),
            None => {
                crate::log(&format!(
                    "Segment at ({}, {}) is outside the {}x{} frame, reading as off",
                    position.0,
                    position.1,
                    frame.width(),
                    frame.height()
                ));
                false
            }
        };
    }
    reading
}
