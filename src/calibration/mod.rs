//! Calibration of seven-segment display positions.
//!
//! The operator crops and rotates a reference frame, places one point per
//! segment, names the points digit by digit, then scans the source. Points
//! can be repositioned mid-scan in the Fixing stage.

pub mod coords;
pub mod preview;
pub mod state;
pub mod wizard;

pub use preview::render_session;
pub use wizard::{Control, InputEvent, Key, PointerButton, Session, Stage};
