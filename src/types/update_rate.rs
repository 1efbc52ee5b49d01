//! Update rate control for status streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Update rate for status streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// One update per inserted packet
    Native,

    /// Throttled to maximum Hz
    /// If the requested rate reaches the frame rate, Native is used
    Max(u32),
}

impl UpdateRate {
    /// Normalize rate against the source frame rate
    pub fn normalize(self, frame_rate: f64) -> Self {
        match self {
            UpdateRate::Native => UpdateRate::Native,
            UpdateRate::Max(0) => UpdateRate::Native,
            UpdateRate::Max(hz) if hz as f64 >= frame_rate => UpdateRate::Native,
            UpdateRate::Max(hz) => UpdateRate::Max(hz),
        }
    }

    /// Get throttle interval if needed
    pub fn throttle_interval(self, frame_rate: f64) -> Option<Duration> {
        match self.normalize(frame_rate) {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / hz as f64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_at_or_above_frame_rate_are_native() {
        assert_eq!(UpdateRate::Max(60).normalize(30.0), UpdateRate::Native);
        assert_eq!(UpdateRate::Max(30).normalize(30.0), UpdateRate::Native);
        assert_eq!(UpdateRate::Max(0).normalize(30.0), UpdateRate::Native);
        assert_eq!(UpdateRate::Max(2).normalize(30.0), UpdateRate::Max(2));
    }

    #[test]
    fn throttle_interval_matches_rate() {
        assert_eq!(UpdateRate::Native.throttle_interval(30.0), None);
        assert_eq!(UpdateRate::Max(4).throttle_interval(30.0), Some(Duration::from_millis(250)));
    }
}
