//! Timeline scanner.
//!
//! Samples one frame per second of the source, decodes every calibrated
//! digit and records the reading. The delay before the next step grows
//! while readings keep needing the fallback decode and drops back to the
//! minimum after an exact one.

use anyhow::{bail, Result};
use image::RgbaImage;
use std::time::Duration;

use crate::calibration::state::Calibration;
use crate::capture::FrameSource;
use crate::config::AppConfig;
use crate::decode::{decode_digit, ColorReference};
use crate::scanner::results::{Reading, ScanResults};

/// Exponential backoff between scan steps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Backoff {
    min: Duration,
    fail: Duration,
    max: Duration,
    /// Consecutive non-exact readings
    failures: u32,
}

impl Backoff {
    pub fn new(min: Duration, fail: Duration, max: Duration) -> Self {
        Self {
            min,
            fail,
            max,
            failures: 0,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Duration::from_millis(config.scan_min_delay_ms),
            Duration::from_millis(config.scan_fail_delay_ms),
            Duration::from_millis(config.scan_max_delay_ms),
        )
    }

    /// Delay to wait before the next step.
    pub fn delay(&self) -> Duration {
        if self.failures == 0 {
            return self.min;
        }
        let factor = 1u32.checked_shl(self.failures - 1).unwrap_or(u32::MAX);
        self.fail.saturating_mul(factor).min(self.max)
    }

    pub fn record(&mut self, exact: bool) {
        if exact {
            self.failures = 0;
        } else {
            self.failures = self.failures.saturating_add(1);
        }
    }
}

/// Result of one scanner step.
#[derive(Debug)]
pub enum ScanStep {
    /// A second was sampled; carries the frame that was read
    Sampled { second: u64, frame: RgbaImage },
    /// The timeline is exhausted
    Finished,
}

/// Walks the source timeline one second at a time.
pub struct Scanner {
    /// Next second to sample
    second: u64,
    start_second: u64,
    frame_rate: f64,
    total_frames: u64,
    reference: ColorReference,
    backoff: Backoff,
    results: ScanResults,
    finished: bool,
}

impl Scanner {
    pub fn new(config: &AppConfig, frame_rate: f64, total_frames: u64) -> Self {
        Self {
            second: config.start_offset_secs,
            start_second: config.start_offset_secs,
            frame_rate,
            total_frames,
            reference: ColorReference::new(config.on_color, config.off_color),
            backoff: Backoff::from_config(config),
            results: ScanResults::default(),
            finished: false,
        }
    }

    /// Frame index sampled for a given second.
    pub fn frame_index(&self, second: u64) -> u64 {
        (self.frame_rate * second as f64).round() as u64
    }

    /// Samples the next second and decodes every digit.
    ///
    /// Each digit's `is_broken` flag is updated from its decode. The
    /// calibration must have been sorted.
    pub fn step(
        &mut self,
        calibration: &mut Calibration,
        source: &mut dyn FrameSource,
    ) -> Result<ScanStep> {
        if self.finished {
            return Ok(ScanStep::Finished);
        }

        let second = self.second;
        let index = self.frame_index(second);
        let frame = if index < self.total_frames {
            source.frame_at(index)?
        } else {
            None
        };
        let Some(frame) = frame else {
            crate::log(&format!(
                "Scan finished at {}s: {} readings, {} needed correction",
                second,
                self.results.len(),
                self.results.broken_count()
            ));
            self.finished = true;
            return Ok(ScanStep::Finished);
        };

        let digit_count = calibration.digits().len();
        let mut reading = Reading {
            frame: index,
            digits: Vec::with_capacity(digit_count),
            exact: Vec::with_capacity(digit_count),
            segments: Vec::with_capacity(digit_count),
        };

        for digit_index in 0..digit_count {
            let Some(positions) = calibration.segment_positions(digit_index) else {
                bail!("Digit {} was not sorted before scanning", digit_index + 1);
            };
            let (segments, decoded) = decode_digit(&frame, &positions, &self.reference);
            calibration.digits_mut()[digit_index].is_broken = !decoded.exact;

            reading.digits.push(decoded.value);
            reading.exact.push(decoded.exact);
            reading.segments.push(segments);
        }

        let exact = reading.is_exact();
        if !exact {
            crate::log(&format!(
                "{}s (frame {}): corrected reading {}",
                second,
                index,
                reading.text()
            ));
        }
        self.backoff.record(exact);
        self.results.record(second, reading);
        self.second += 1;

        Ok(ScanStep::Sampled { second, frame })
    }

    /// Wait before the next step.
    pub fn delay(&self) -> Duration {
        self.backoff.delay()
    }

    /// Fraction of the timeline sampled so far, in 0..=1.
    pub fn progress(&self) -> f32 {
        if self.finished {
            return 1.0;
        }
        let total_secs = if self.frame_rate > 0.0 {
            (self.total_frames as f64 / self.frame_rate).ceil() as u64
        } else {
            0
        };
        let expected = total_secs.saturating_sub(self.start_second);
        if expected == 0 {
            return 1.0;
        }
        let done = self.second.saturating_sub(self.start_second);
        (done as f32 / expected as f32).clamp(0.0, 1.0)
    }

    /// Next second to be sampled.
    pub fn next_second(&self) -> u64 {
        self.second
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn results(&self) -> &ScanResults {
        &self.results
    }
}
