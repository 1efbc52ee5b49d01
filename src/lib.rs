//! Fixed-capacity ring buffer for encoded video packets.
//!
//! capture-ring keeps the last few seconds of an encoder's output in memory so
//! that "save what just happened" works at any moment: the ring evicts the
//! oldest packets as new ones arrive, and a save copies out everything from
//! the first retained key frame onward.
//!
//! # Features
//!
//! - **Flat storage**: one payload arena and one metadata table, allocated once
//! - **Wraparound-aware**: packets may straddle the arena end and are reassembled on read
//! - **Oldest-first eviction**: only as much history is dropped as a new packet needs
//! - **Recorder task**: an async owner for sharing one ring between an encoder and savers
//!
//! # Quick Start
//!
//! ```rust
//! use capture_ring::{PacketFlags, RingPacketStore};
//!
//! // 2 Mbps at 30 fps, one second of history
//! let mut ring = RingPacketStore::new(2_000_000, 30, 1)?;
//! ring.insert(&[0u8; 5000], PacketFlags::KEY_FRAME, 0)?;
//!
//! let saved: Vec<_> = ring.packets_from_key_frame().map(|p| p.to_packet()).collect();
//! assert_eq!(saved.len(), 1);
//! # Ok::<(), capture_ring::CaptureError>(())
//! ```
//!
//! ## Example (recorder)
//!
//! ```rust,no_run
//! use capture_ring::{CaptureConfig, EncodedPacket, MemorySink, PacketFlags, Recorder, packet_channel};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> capture_ring::Result<()> {
//!     let (encoder, source) = packet_channel(64);
//!     let recorder = Recorder::spawn(source, &CaptureConfig::load("capture.yaml")?)?;
//!
//!     encoder.send(EncodedPacket::new(vec![0u8; 4096], PacketFlags::KEY_FRAME, 0)).await?;
//!
//!     let mut sink = MemorySink::new();
//!     recorder.save(&mut sink).await?;
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Ring storage
pub mod store;

// Task-based capture
pub mod recorder;
pub mod sink;
pub mod source;
pub mod stream;

// Core exports
pub use config::{Capacity, CaptureConfig};
pub use error::*;
pub use types::*;

// Main API exports
pub use recorder::{Recorder, RecorderHandle, SaveSummary, Snapshot};
pub use sink::{MemorySink, PacketSink};
pub use source::{ChannelSource, PacketSender, PacketSource, packet_channel};
pub use store::{Packets, RingPacketStore};
