//! Timeline scanning over a calibrated display.
//!
//! This module provides:
//! - `Scanner`, which samples one frame per second and decodes every digit
//! - `Backoff`, the delay policy between scan steps
//! - `ScanResults`, the ordered second → reading mapping

pub mod results;
pub mod state;

pub use results::{Reading, ScanResults};
pub use state::{ScanStep, Scanner};
