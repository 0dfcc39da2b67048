//! Segment classification and digit decoding.
//!
//! This module provides:
//! - The seven-segment truth table with nearest-match fallback (`table`)
//! - Two-reference-colour on/off classification of sampled pixels (`classify`)

pub mod classify;
pub mod table;

pub use classify::{read_segments, ColorReference};
pub use table::{decode, Decoded, SegmentReading};

use image::RgbaImage;

use crate::calibration::state::SEGMENTS_PER_DIGIT;

/// High-level function: raw frame + role-ordered positions → decoded digit.
pub fn decode_digit(
    frame: &RgbaImage,
    positions: &[(i32, i32); SEGMENTS_PER_DIGIT],
    reference: &ColorReference,
) -> (SegmentReading, Decoded) {
    let reading = read_segments(frame, positions, reference);
    (reading, decode(&reading))
}
