//! Segment Reader
//!
//! Calibrates the segment positions of a seven-segment display on a
//! reference frame, then scans a frame sequence and decodes the displayed
//! number once per second.
//!
//! Usage: `segment-reader [FRAME_DIR]` (defaults to `source_path` in config.json)

mod analysis;
mod calibration;
mod capture;
mod config;
mod decode;
mod gui;
mod paths;
mod scanner;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use calibration::Session;
use capture::{FrameSource, ImageSequenceSource};
use config::AppConfig;

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join("segment_reader.log");
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn main() -> Result<()> {
    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);
        let log_path = paths::get_logs_dir().join("segment_reader.log");
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
        {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));

    paths::ensure_directories()?;

    let mut config = AppConfig::load_default_location();
    if let Some(path) = std::env::args().nth(1) {
        log(&format!("Source path from command line: {}", path));
        config.source_path = path;
    }

    let source_dir = PathBuf::from(&config.source_path);
    let mut source = ImageSequenceSource::open(&source_dir, config.frame_rate)?;
    log(&format!(
        "Source: {} frames, {:.1}s",
        source.total_frames(),
        source.duration_secs()
    ));

    // The first frame is the reference the operator calibrates on.
    let reference = source
        .frame_at(0)?
        .context("Frame source has no reference frame")?;

    let output_root = config.output_root();
    let session = Session::new(reference, config)?;

    log("Starting GUI application...");
    match gui::run_gui(session, Box::new(source), output_root) {
        Ok(()) => {
            log("GUI application exited normally");
            Ok(())
        }
        Err(e) => {
            log(&format!("GUI error: {}", e));
            Err(anyhow!("GUI error: {}", e))
        }
    }
}
