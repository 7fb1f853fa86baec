use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Response window in minutes after which a pending invitation
/// auto-declines. Bounded to keep deadlines schedulable client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclineWindow(i64);

/// One week, in minutes
const MAX_WINDOW_MINUTES: i64 = 7 * 24 * 60;

pub const DEFAULT_WINDOW_MINUTES: i64 = 30;

impl DeclineWindow {
    pub fn from_minutes(minutes: i64) -> Result<Self, String> {
        if minutes < 1 {
            return Err("Auto-decline window must be at least one minute".to_string());
        }
        if minutes > MAX_WINDOW_MINUTES {
            return Err("Auto-decline window cannot exceed one week".to_string());
        }
        Ok(Self(minutes))
    }

    pub fn minutes(&self) -> i64 {
        self.0
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.0)
    }
}

impl Default for DeclineWindow {
    fn default() -> Self {
        Self(DEFAULT_WINDOW_MINUTES)
    }
}

impl fmt::Display for DeclineWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_oversized_windows() {
        assert!(DeclineWindow::from_minutes(0).is_err());
        assert!(DeclineWindow::from_minutes(-5).is_err());
        assert!(DeclineWindow::from_minutes(MAX_WINDOW_MINUTES + 1).is_err());
        assert!(DeclineWindow::from_minutes(45).is_ok());
    }

    #[test]
    fn default_is_thirty_minutes() {
        assert_eq!(DeclineWindow::default().minutes(), 30);
    }
}
