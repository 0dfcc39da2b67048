//! Configuration for calibration and scanning.
//!
//! Loads settings from config.json at startup. Provides the frame source
//! location, reference colours for segment classification, geometry limits
//! for the calibration stages, and the scan backoff timings.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory of numbered still frames to calibrate on and scan
    pub source_path: String,
    /// Frames per second of the source sequence
    pub frame_rate: f64,
    /// First sampled second of the timeline
    pub start_offset_secs: u64,
    /// Number of digits after the decimal point when reading values as numbers
    pub decimal_places: u32,
    /// Reference colour of a lit segment [R, G, B]
    pub on_color: [u8; 3],
    /// Reference colour of an unlit segment [R, G, B]
    pub off_color: [u8; 3],
    /// Initial view rotation in clockwise quarter turns (0..=3)
    pub initial_rotation: u8,
    /// Views whose larger side exceeds this are downscaled to it
    pub max_display_size: u32,
    /// Views whose larger side is below this are upscaled to it
    pub min_display_size: u32,
    /// Minimum source-space distance between two placed points
    pub min_point_distance: f64,
    /// Minimum width + height of a crop, in source pixels
    pub min_crop_extent: u32,
    /// Source pixels moved per nudge key press while fixing
    pub nudge_step: i32,
    /// Display-space radius for picking a point while fixing
    pub pick_radius: f64,
    /// Delay between scan steps after an exact reading (milliseconds)
    pub scan_min_delay_ms: u64,
    /// Delay after the first fallback reading; doubles on each further one (milliseconds)
    pub scan_fail_delay_ms: u64,
    /// Upper bound of the scan backoff (milliseconds)
    pub scan_max_delay_ms: u64,
    /// How long a transient notice stays in the window title (milliseconds)
    pub notice_ms: u64,
    /// Output folder for results, relative to the executable directory
    pub output_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_path: "frames".to_string(),
            frame_rate: 30.0,
            start_offset_secs: 0,
            decimal_places: 0,
            on_color: [255, 255, 255],
            off_color: [0, 0, 0],
            initial_rotation: 0,
            max_display_size: 900,
            min_display_size: 600,
            min_point_distance: 100.0,
            min_crop_extent: 50,
            nudge_step: 2,
            pick_radius: 20.0,
            scan_min_delay_ms: 10,
            scan_fail_delay_ms: 250,
            scan_max_delay_ms: 4000,
            notice_ms: 1500,
            output_dir: "output".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from `path`, or returns defaults if it is missing or malformed.
    pub fn load(path: &Path) -> Self {
        crate::log(&format!("Looking for config at: {}", path.display()));

        if !path.exists() {
            crate::log("config.json not found. Using default config.");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log("Config loaded from config.json");
                    config
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse config.json: {}. Using defaults.",
                        e
                    ));
                    Self::default()
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read config.json: {}. Using defaults.",
                    e
                ));
                Self::default()
            }
        }
    }

    /// Loads config.json from next to the executable, falling back to the working directory.
    pub fn load_default_location() -> Self {
        let beside_exe = crate::paths::get_exe_dir().join("config.json");
        if beside_exe.exists() {
            Self::load(&beside_exe)
        } else {
            Self::load(Path::new("config.json"))
        }
    }

    /// Resolves the output directory against the executable directory.
    pub fn output_root(&self) -> PathBuf {
        let dir = PathBuf::from(&self.output_dir);
        if dir.is_absolute() {
            dir
        } else {
            crate::paths::get_exe_dir().join(dir)
        }
    }
}
