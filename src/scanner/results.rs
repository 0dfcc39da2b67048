//! Time-indexed scan results.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::decode::SegmentReading;

/// Decoded readout of all digits at one sampled second.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reading {
    /// Frame index the sample was taken from
    pub frame: u64,
    /// Digit values, most significant first
    pub digits: Vec<u8>,
    /// Per digit: true when the value was an exact table match
    pub exact: Vec<bool>,
    /// Per digit: raw on/off state of the seven segments
    pub segments: Vec<SegmentReading>,
}

impl Reading {
    /// True when every digit matched a canonical glyph.
    pub fn is_exact(&self) -> bool {
        self.exact.iter().all(|e| *e)
    }

    /// Concatenated digits, e.g. "0427".
    pub fn text(&self) -> String {
        self.digits.iter().map(|d| char::from(b'0' + d)).collect()
    }

    /// Digits read as a number with `decimal_places` digits after the point.
    pub fn value(&self, decimal_places: u32) -> f64 {
        let whole = self
            .digits
            .iter()
            .fold(0u64, |acc, d| acc.saturating_mul(10).saturating_add(*d as u64));
        whole as f64 / 10f64.powi(decimal_places as i32)
    }

    /// Digits with the decimal point inserted, e.g. "04.27".
    ///
    /// Short readings are zero-padded to keep an integer digit, so `05` with
    /// two places is "0.05", matching `value`.
    pub fn formatted(&self, decimal_places: u32) -> String {
        let places = decimal_places as usize;
        if places == 0 {
            return self.text();
        }
        let text = format!("{:0>width$}", self.text(), width = places + 1);
        let (int_part, frac_part) = text.split_at(text.len() - places);
        format!("{}.{}", int_part, frac_part)
    }
}

/// Ordered mapping from sampled second to reading.
///
/// Entries are only ever added; a second that already has a reading keeps it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScanResults {
    readings: BTreeMap<u64, Reading>,
}

impl ScanResults {
    /// Records a reading. Returns false if the second was already sampled.
    pub fn record(&mut self, second: u64, reading: Reading) -> bool {
        if self.readings.contains_key(&second) {
            return false;
        }
        self.readings.insert(second, reading);
        true
    }

    #[cfg(test)]
    pub fn get(&self, second: u64) -> Option<&Reading> {
        self.readings.get(&second)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &Reading)> {
        self.readings.iter().map(|(s, r)| (*s, r))
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<(u64, &Reading)> {
        self.readings.iter().next_back().map(|(s, r)| (*s, r))
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Number of samples that needed the fallback decode.
    pub fn broken_count(&self) -> usize {
        self.readings.values().filter(|r| !r.is_exact()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(digits: &[u8]) -> Reading {
        Reading {
            frame: 0,
            digits: digits.to_vec(),
            exact: vec![true; digits.len()],
            segments: vec![[false; 7]; digits.len()],
        }
    }

    #[test]
    fn test_text_and_value() {
        let r = reading(&[0, 4, 2, 7]);
        assert_eq!(r.text(), "0427");
        assert!((r.value(0) - 427.0).abs() < 1e-9);
        assert!((r.value(2) - 4.27).abs() < 1e-9);
        assert_eq!(r.formatted(2), "04.27");
        assert_eq!(r.formatted(0), "0427");
    }

    #[test]
    fn test_formatted_pads_short_readings() {
        for (digits, places, expected) in [
            (&[0, 5][..], 2, "0.05"),
            (&[5][..], 2, "0.05"),
            (&[1, 2, 3][..], 3, "0.123"),
            (&[1, 2, 3][..], 2, "1.23"),
        ] {
            let r = reading(digits);
            let text = r.formatted(places);
            assert_eq!(text, expected);
            let parsed: f64 = text.parse().unwrap();
            assert!((parsed - r.value(places)).abs() < 1e-9, "{} vs {}", text, r.value(places));
        }
    }

    #[test]
    fn test_record_is_append_only() {
        let mut results = ScanResults::default();
        assert!(results.record(3, reading(&[1])));
        assert!(!results.record(3, reading(&[2])));
        assert_eq!(results.get(3).unwrap().digits, vec![1]);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_iteration_is_ordered() {
        let mut results = ScanResults::default();
        results.record(5, reading(&[5]));
        results.record(1, reading(&[1]));
        results.record(3, reading(&[3]));

        let seconds: Vec<u64> = results.iter().map(|(s, _)| s).collect();
        assert_eq!(seconds, vec![1, 3, 5]);
        assert_eq!(results.latest().unwrap().0, 5);
    }

    #[test]
    fn test_broken_count() {
        let mut results = ScanResults::default();
        results.record(0, reading(&[1, 2]));
        let mut broken = reading(&[1, 3]);
        broken.exact[1] = false;
        results.record(1, broken);
        assert_eq!(results.broken_count(), 1);
        assert!(!results.get(1).unwrap().is_exact());
    }
}
