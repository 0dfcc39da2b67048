//! Chart generation using plotters.
//!
//! Plots the decoded value over the scanned timeline. Samples that needed
//! the fallback decode are marked so they can be checked by eye.

use anyhow::{Context, Result};
use plotters::prelude::*;
use std::path::Path;

use crate::scanner::ScanResults;

const CHART_SIZE: (u32, u32) = (1200, 700);
const LINE_COLOR: RGBColor = RGBColor(80, 120, 200);
const CORRECTED_COLOR: RGBColor = RGBColor(220, 80, 80);
const GRID_COLOR: RGBColor = RGBColor(220, 220, 220);

/// One plotted sample.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Sample {
    second: f64,
    value: f64,
    exact: bool,
}

fn samples(results: &ScanResults, decimal_places: u32) -> Vec<Sample> {
    results
        .iter()
        .map(|(second, reading)| Sample {
            second: second as f64,
            value: reading.value(decimal_places),
            exact: reading.is_exact(),
        })
        .collect()
}

/// Axis bounds padded by 5% of the range, never collapsing to zero width.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((max - min) * 0.05).max(0.5);
    (min - pad, max + pad)
}

/// Generates a line chart of value over time.
pub fn generate_value_chart(
    results: &ScanResults,
    decimal_places: u32,
    output_path: &Path,
) -> Result<()> {
    let points = samples(results, decimal_places);
    let (x_min, x_max) = padded_range(points.iter().map(|p| p.second));
    let (y_min, y_max) = padded_range(points.iter().map(|p| p.value));

    let root = BitMapBackend::new(output_path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)
        .context("Failed to fill chart background")?;

    let title = format!(
        "Reading over time ({} samples, {} corrected)",
        results.len(),
        results.broken_count()
    );

    let mut chart = ChartBuilder::on(&root)
        .caption(&title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .context("Failed to build value chart")?;

    let precision = decimal_places as usize;
    chart
        .configure_mesh()
        .x_desc("Second")
        .y_desc("Value")
        .x_label_formatter(&|x| format!("{:.0}", x))
        .y_label_formatter(&|y| format!("{:.*}", precision, y))
        .light_line_style(GRID_COLOR)
        .draw()
        .context("Failed to draw mesh")?;

    chart.draw_series(LineSeries::new(
        points.iter().map(|p| (p.second, p.value)),
        LINE_COLOR.stroke_width(2),
    ))?;

    chart.draw_series(
        points
            .iter()
            .filter(|p| !p.exact)
            .map(|p| Circle::new((p.second, p.value), 5, CORRECTED_COLOR.filled())),
    )?;

    root.present().context("Failed to save chart")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Reading;

    #[test]
    fn test_padded_range() {
        let (lo, hi) = padded_range([0.0, 100.0].into_iter());
        assert!((lo + 5.0).abs() < 1e-9);
        assert!((hi - 105.0).abs() < 1e-9);

        // A flat series still gets a visible band.
        let (lo, hi) = padded_range([3.0, 3.0].into_iter());
        assert!(lo < 3.0 && hi > 3.0);

        assert_eq!(padded_range(std::iter::empty()), (0.0, 1.0));
    }

    #[test]
    fn test_samples_apply_decimal_places() {
        let mut results = ScanResults::default();
        results.record(
            7,
            Reading {
                frame: 210,
                digits: vec![1, 2, 5],
                exact: vec![true, true, false],
                segments: vec![[false; 7]; 3],
            },
        );

        let s = samples(&results, 2);
        assert_eq!(s.len(), 1);
        assert!((s[0].second - 7.0).abs() < 1e-9);
        assert!((s[0].value - 1.25).abs() < 1e-9);
        assert!(!s[0].exact);
    }
}
