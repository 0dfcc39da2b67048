//! Seven-segment truth table with nearest-match error correction.

use crate::calibration::state::SEGMENTS_PER_DIGIT;

/// On/off state of the seven segments, indexed by `SegmentRole::index()`.
pub type SegmentReading = [bool; SEGMENTS_PER_DIGIT];

/// Canonical glyphs for 0-9 in role order:
/// top, top-left, top-right, middle, bottom-left, bottom-right, bottom.
pub const DIGIT_TABLE: [SegmentReading; 10] = [
    [true, true, true, false, true, true, true],     // 0
    [false, false, true, false, false, true, false], // 1
    [true, false, true, true, true, false, true],    // 2
    [true, false, true, true, false, true, true],    // 3
    [false, true, true, true, false, true, false],   // 4
    [true, true, false, true, false, true, true],    // 5
    [true, true, false, true, true, true, true],     // 6
    [true, false, true, false, false, true, false],  // 7
    [true, true, true, true, true, true, true],      // 8
    [true, true, true, true, false, true, true],     // 9
];

/// Result of decoding one digit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decoded {
    /// True when the reading matched a canonical glyph exactly
    pub exact: bool,
    /// The matching digit, or the nearest one when `exact` is false
    pub value: u8,
}

/// Number of segments that differ between two readings.
pub fn hamming(a: &SegmentReading, b: &SegmentReading) -> u32 {
    a.iter().zip(b.iter()).filter(|(x, y)| x != y).count() as u32
}

/// Decodes a seven-segment reading into a digit.
///
/// Exact table matches return `exact = true`. Anything else returns the
/// glyph with the fewest differing segments; on a tie the lowest digit wins.
pub fn decode(reading: &SegmentReading) -> Decoded {
    if let Some(value) = DIGIT_TABLE.iter().position(|glyph| glyph == reading) {
        return Decoded {
            exact: true,
            value: value as u8,
        };
    }

    let mut best = 0;
    let mut best_distance = u32::MAX;
    for (value, glyph) in DIGIT_TABLE.iter().enumerate() {
        let d = hamming(glyph, reading);
        // Strictly smaller only, so earlier digits keep ties.
        if d < best_distance {
            best = value;
            best_distance = d;
        }
    }

    Decoded {
        exact: false,
        value: best as u8,
    }
}
