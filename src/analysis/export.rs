//! JSON export for scan results.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::scanner::ScanResults;

/// Summary plus every reading, as written to results.json.
#[derive(Serialize)]
struct ResultsDump<'a> {
    source: &'a str,
    frame_rate: f64,
    decimal_places: u32,
    samples: usize,
    corrected: usize,
    readings: &'a ScanResults,
}

/// Export scan results to a JSON file.
///
/// The output is pretty-printed for human readability.
pub fn export_to_json(
    results: &ScanResults,
    source: &str,
    frame_rate: f64,
    decimal_places: u32,
    output_path: &Path,
) -> Result<()> {
    let dump = ResultsDump {
        source,
        frame_rate,
        decimal_places,
        samples: results.len(),
        corrected: results.broken_count(),
        readings: results,
    };
    let json =
        serde_json::to_string_pretty(&dump).context("Failed to serialize results to JSON")?;

    let mut file = File::create(output_path)
        .context(format!("Failed to create JSON file: {}", output_path.display()))?;

    file.write_all(json.as_bytes())
        .context("Failed to write JSON data")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Reading;
    use tempfile::tempdir;

    #[test]
    fn test_export_to_json() {
        let mut results = ScanResults::default();
        results.record(
            0,
            Reading {
                frame: 0,
                digits: vec![4, 2],
                exact: vec![true, false],
                segments: vec![[false; 7]; 2],
            },
        );

        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        export_to_json(&results, "frames", 30.0, 1, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["samples"], 1);
        assert_eq!(value["corrected"], 1);
        assert_eq!(value["readings"]["0"]["digits"][1], 2);
        assert_eq!(value["readings"]["0"]["exact"][1], false);
    }
}
