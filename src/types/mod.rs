//! Core types for encoded packet handling.
//!
//! ## Architecture
//!
//! - [`PacketFlags`] wraps the encoder-supplied flag word and names the bits we care about
//! - [`PacketIndex`] is an opaque handle to a metadata slot inside a ring
//! - [`PacketView`] is a borrowed extraction result, zero-copy unless the payload wraps
//! - [`EncodedPacket`] is an owned packet that can cross task boundaries
//! - [`BufferStatus`] summarizes how full a ring is
//! - [`UpdateRate`] controls how often status updates are emitted
//!
//! ## Usage Example
//!
//! ```rust
//! use capture_ring::types::{EncodedPacket, PacketFlags};
//!
//! let packet = EncodedPacket::new(vec![0u8, 0, 0, 1, 0x65], PacketFlags::KEY_FRAME, 33_333);
//! assert!(packet.is_key_frame());
//! assert_eq!(packet.len(), 5);
//! ```

mod flags;
mod packet;
mod status;
mod update_rate;

pub use flags::PacketFlags;
pub use packet::{EncodedPacket, PacketIndex, PacketView};
pub use status::BufferStatus;
pub use update_rate::UpdateRate;
