//! Test utilities for generating synthetic encoder output
//!
//! These helpers produce deterministic packet streams with a repeating
//! key-frame structure, and are shared by unit tests and benchmarks.

#![cfg(any(test, feature = "benchmark"))]

use crate::types::{EncodedPacket, PacketFlags};

/// Install a fmt subscriber honoring `RUST_LOG`, once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Deterministic payload whose bytes depend on both `seed` and position.
///
/// Distinct seeds give distinct contents, so a misplaced or torn packet shows
/// up as a byte mismatch.
pub fn payload(seed: u32, len: usize) -> Vec<u8> {
    (0..len).map(|i| (seed.wrapping_mul(131).wrapping_add(i as u32 * 7) % 251) as u8).collect()
}

/// Shape of a synthetic encoded stream.
#[derive(Debug, Clone, Copy)]
pub struct StreamShape {
    /// Packets per group of pictures, key frame first
    pub gop: usize,
    /// Key frame payload size
    pub key_size: usize,
    /// Delta frame payload size
    pub delta_size: usize,
    /// Frames per second, used to space timestamps
    pub frame_rate: u32,
}

impl Default for StreamShape {
    fn default() -> Self {
        Self { gop: 30, key_size: 40_000, delta_size: 8_000, frame_rate: 30 }
    }
}

impl StreamShape {
    /// Timestamp of frame `n` in microseconds.
    pub fn timestamp_us(&self, n: usize) -> i64 {
        n as i64 * 1_000_000 / i64::from(self.frame_rate)
    }

    /// Build packet `n` of the stream.
    pub fn packet(&self, n: usize) -> EncodedPacket {
        let key = n % self.gop == 0;
        let (flags, size) =
            if key { (PacketFlags::KEY_FRAME, self.key_size) } else { (PacketFlags::NONE, self.delta_size) };
        EncodedPacket::new(payload(n as u32, size), flags, self.timestamp_us(n))
    }

    /// Build the first `count` packets of the stream.
    pub fn packets(&self, count: usize) -> Vec<EncodedPacket> {
        (0..count).map(|n| self.packet(n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_differ_between_seeds() {
        assert_ne!(payload(1, 64), payload(2, 64));
        assert_eq!(payload(7, 64), payload(7, 64));
        assert_eq!(payload(3, 0).len(), 0);
    }

    #[test]
    fn stream_places_key_frames_at_gop_boundaries() {
        let shape = StreamShape { gop: 4, key_size: 10, delta_size: 3, frame_rate: 25 };
        let packets = shape.packets(9);
        let keys: Vec<usize> =
            packets.iter().enumerate().filter(|(_, p)| p.is_key_frame()).map(|(i, _)| i).collect();
        assert_eq!(keys, vec![0, 4, 8]);
        assert_eq!(packets[1].len(), 3);
        assert_eq!(packets[4].timestamp_us, 160_000);
    }
}
