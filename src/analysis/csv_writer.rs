//! CSV writer for scan results.
//!
//! Writes one row per sampled second in append-only mode, so a crash or an
//! aborted session keeps every reading taken so far.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::scanner::Reading;

/// CSV header row.
/// Columns: sampled second, frame index, digit string, numeric value, exact match flag
const CSV_HEADER: &str = "second,frame,reading,value,exact";

/// Initializes CSV file with header if it doesn't exist or is empty.
///
/// If the file exists and has content, this does nothing (preserves existing data).
pub fn init_csv(path: &Path) -> Result<()> {
    if path.exists() {
        let file = File::open(path).context("Failed to open existing CSV")?;
        let reader = BufReader::new(file);
        if reader.lines().next().is_some() {
            return Ok(());
        }
    }

    let mut file = File::create(path).context("Failed to create CSV file")?;
    writeln!(file, "{}", CSV_HEADER).context("Failed to write CSV header")?;
    Ok(())
}

/// Appends one reading to the CSV file.
///
/// Opens the file in append mode for each write.
pub fn append_to_csv(
    path: &Path,
    second: u64,
    reading: &Reading,
    decimal_places: u32,
) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open CSV for append")?;

    // Format: second,frame,reading,value,exact
    let line = format!(
        "{},{},{},{},{}",
        second,
        reading.frame,
        reading.text(),
        reading.formatted(decimal_places),
        reading.is_exact(),
    );

    writeln!(file, "{}", line).context("Failed to write CSV row")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn reading(frame: u64, digits: &[u8], exact: bool) -> Reading {
        Reading {
            frame,
            digits: digits.to_vec(),
            exact: vec![exact; digits.len()],
            segments: vec![[false; 7]; digits.len()],
        }
    }

    #[test]
    fn test_init_csv_creates_header() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("results.csv");

        init_csv(&csv_path).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(content.starts_with(CSV_HEADER));
    }

    #[test]
    fn test_init_csv_preserves_existing() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("results.csv");
        std::fs::write(&csv_path, "existing,data\n1,2,3\n").unwrap();

        init_csv(&csv_path).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(content.starts_with("existing,data"));
    }

    #[test]
    fn test_append_rows() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("results.csv");
        init_csv(&csv_path).unwrap();

        append_to_csv(&csv_path, 0, &reading(0, &[1, 2, 5], true), 1).unwrap();
        append_to_csv(&csv_path, 1, &reading(30, &[1, 2, 8], false), 1).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "0,0,125,12.5,true");
        assert_eq!(lines[2], "1,30,128,12.8,false");
    }

    #[test]
    fn test_value_column_keeps_leading_zero() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("results.csv");
        init_csv(&csv_path).unwrap();

        append_to_csv(&csv_path, 0, &reading(0, &[0, 5], true), 2).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(content.lines().nth(1), Some("0,0,05,0.05,true"));
    }
}
