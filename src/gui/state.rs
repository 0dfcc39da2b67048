//! GUI host state.
//!
//! Tracks the transient title notice and when the next scan tick is due.

use std::time::{Duration, Instant};

/// Host-side bookkeeping that the session itself does not own.
#[derive(Debug, Default)]
pub struct GuiState {
    /// Notice shown in the title until the instant passes
    notice: Option<(String, Instant)>,
    /// When the next scan tick should fire
    next_tick: Option<Instant>,
    /// Last title sent to the window, to avoid resending it every frame
    last_title: String,
}

impl GuiState {
    pub fn show_notice(&mut self, text: String, now: Instant, duration: Duration) {
        self.notice = Some((text, now + duration));
    }

    /// Active notice, dropping it once it has expired.
    pub fn notice(&mut self, now: Instant) -> Option<&str> {
        if matches!(&self.notice, Some((_, until)) if now >= *until) {
            self.notice = None;
        }
        self.notice.as_ref().map(|(text, _)| text.as_str())
    }

    /// Title to display: the notice while one is active, otherwise `base`.
    pub fn title(&mut self, base: &str, now: Instant) -> String {
        match self.notice(now) {
            Some(notice) => format!("{} | {}", notice, base),
            None => base.to_string(),
        }
    }

    /// Returns the title if it differs from the last one sent.
    pub fn title_update(&mut self, base: &str, now: Instant) -> Option<String> {
        let title = self.title(base, now);
        if title == self.last_title {
            return None;
        }
        self.last_title = title.clone();
        Some(title)
    }

    /// True when a tick should fire now. Schedules the first tick on first call.
    pub fn tick_due(&mut self, delay: Duration, now: Instant) -> bool {
        match self.next_tick {
            Some(at) if now >= at => {
                self.next_tick = None;
                true
            }
            Some(_) => false,
            None => {
                self.next_tick = Some(now + delay);
                false
            }
        }
    }

    /// Time left until the next tick, for repaint scheduling.
    pub fn until_tick(&self, now: Instant) -> Option<Duration> {
        self.next_tick.map(|at| at.saturating_duration_since(now))
    }

    /// Forgets the pending tick, e.g. while the scan is suspended.
    pub fn cancel_tick(&mut self) {
        self.next_tick = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_expires() {
        let mut state = GuiState::default();
        let now = Instant::now();
        state.show_notice("Crop too small".to_string(), now, Duration::from_millis(100));

        assert_eq!(state.title("Transforming", now), "Crop too small | Transforming");
        let later = now + Duration::from_millis(150);
        assert_eq!(state.title("Transforming", later), "Transforming");
        assert!(state.notice(later).is_none());
    }

    #[test]
    fn test_title_update_only_on_change() {
        let mut state = GuiState::default();
        let now = Instant::now();
        assert_eq!(state.title_update("Placement", now), Some("Placement".to_string()));
        assert_eq!(state.title_update("Placement", now), None);
        assert!(state.title_update("Naming", now).is_some());
    }

    #[test]
    fn test_tick_schedule() {
        let mut state = GuiState::default();
        let now = Instant::now();
        let delay = Duration::from_millis(250);

        assert!(!state.tick_due(delay, now));
        assert_eq!(state.until_tick(now), Some(delay));
        assert!(!state.tick_due(delay, now + Duration::from_millis(100)));
        assert!(state.tick_due(delay, now + delay));
        assert!(state.until_tick(now).is_none());

        state.tick_due(delay, now);
        state.cancel_tick();
        assert!(state.until_tick(now).is_none());
    }
}
