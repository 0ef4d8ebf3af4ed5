//! Duration formatting for display.

use std::time::Duration;

/// Extension trait for displaying durations.
pub trait DurationExt {
    /// Format as a `m:ss` clock string, the way track lengths are displayed.
    fn to_clock_string(&self) -> String;
}

impl DurationExt for Duration {
    fn to_clock_string(&self) -> String {
        let total = self.as_secs();
        format!("{}:{:02}", total / 60, total % 60)
    }
}
