//! Result export.
//!
//! This module provides:
//! - CSV rows appended as each second is sampled
//! - JSON dump of the complete result map
//! - PNG chart of the value over time
//!
//! Each scan writes into its own timestamped folder under the output directory.

pub mod charts;
pub mod csv_writer;
pub mod export;

use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::scanner::ScanResults;

/// Output folder of one scan.
pub struct SessionOutput {
    dir: PathBuf,
    csv_path: PathBuf,
    /// Number of readings already appended to the CSV
    written: usize,
    source: String,
    frame_rate: f64,
    decimal_places: u32,
}

impl SessionOutput {
    /// Creates `<root>/<YYYYMMDD_HHMMSS>/` and the CSV header.
    pub fn create(root: &Path, config: &AppConfig, frame_rate: f64) -> Result<Self> {
        let dir = root.join(Local::now().format("%Y%m%d_%H%M%S").to_string());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output folder: {}", dir.display()))?;

        let csv_path = dir.join("results.csv");
        csv_writer::init_csv(&csv_path)?;
        crate::log(&format!("Writing results to {}", dir.display()));

        Ok(Self {
            dir,
            csv_path,
            written: 0,
            source: config.source_path.clone(),
            frame_rate,
            decimal_places: config.decimal_places,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Rows appended to the CSV so far.
    pub fn rows_written(&self) -> usize {
        self.written
    }

    /// Appends readings recorded since the last call.
    pub fn sync(&mut self, results: &ScanResults) -> Result<()> {
        for (second, reading) in results.iter().skip(self.written) {
            csv_writer::append_to_csv(&self.csv_path, second, reading, self.decimal_places)?;
            self.written += 1;
        }
        Ok(())
    }

    /// Writes the remaining CSV rows, the JSON dump and the chart.
    pub fn finish(&mut self, results: &ScanResults) -> Result<()> {
        self.sync(results)?;

        let json_path = self.dir.join("results.json");
        export::export_to_json(
            results,
            &self.source,
            self.frame_rate,
            self.decimal_places,
            &json_path,
        )?;
        crate::log(&format!("Results JSON saved: {}", json_path.display()));

        if results.is_empty() {
            crate::log("No readings, skipping chart");
            return Ok(());
        }
        let chart_path = self.dir.join("results.png");
        charts::generate_value_chart(results, self.decimal_places, &chart_path)?;
        crate::log(&format!("Chart saved: {}", chart_path.display()));

        Ok(())
    }
}
