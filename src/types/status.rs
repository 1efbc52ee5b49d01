//! Ring fullness reporting

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Snapshot of how much history a ring currently holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferStatus {
    /// Number of retained packets
    pub packets: usize,

    /// Payload bytes held by retained packets
    pub payload_bytes: usize,

    /// Total payload arena size
    pub data_capacity: usize,

    /// Newest minus oldest retained timestamp, in microseconds
    pub span_us: i64,

    /// Packets the recorder refused because they could never fit
    pub dropped_packets: u64,
}

impl BufferStatus {
    /// Retained history as a duration.
    pub fn span(&self) -> Duration {
        Duration::from_micros(self.span_us.max(0) as u64)
    }

    /// Fraction of the payload arena in use, in `[0.0, 1.0]`.
    pub fn fill_ratio(&self) -> f64 {
        if self.data_capacity == 0 {
            return 0.0;
        }
        self.payload_bytes as f64 / self.data_capacity as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_and_fill_ratio() {
        let status = BufferStatus {
            packets: 3,
            payload_bytes: 250,
            data_capacity: 1000,
            span_us: 66_666,
            dropped_packets: 0,
        };
        assert_eq!(status.span(), Duration::from_micros(66_666));
        assert!((status.fill_ratio() - 0.25).abs() < f64::EPSILON);
        assert_eq!(BufferStatus::default().fill_ratio(), 0.0);
    }
}
