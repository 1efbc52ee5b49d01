//! Packet types shared by the ring and the recorder

use std::borrow::Cow;
use std::sync::Arc;

use super::PacketFlags;

/// Handle to a metadata slot in a [`RingPacketStore`](crate::RingPacketStore).
///
/// Indices are only handed out by the store and stay meaningful until the next
/// insertion, which may evict the slot they point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketIndex(usize);

impl PacketIndex {
    pub(crate) fn new(slot: usize) -> Self {
        Self(slot)
    }

    /// Raw slot number in `[0, meta_capacity)`.
    pub fn slot(&self) -> usize {
        self.0
    }
}

/// A packet read out of a ring.
///
/// The payload borrows the ring's arena when the packet is stored contiguously
/// and is reassembled into an owned buffer when it wraps the arena end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketView<'a> {
    /// Encoded payload bytes
    pub data: Cow<'a, [u8]>,

    /// Encoder flags
    pub flags: PacketFlags,

    /// Presentation time in microseconds
    pub timestamp_us: i64,
}

impl PacketView<'_> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True when the payload is a direct view into the ring.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.data, Cow::Borrowed(_))
    }

    /// Copy into an owned packet that outlives the ring borrow.
    pub fn to_packet(&self) -> EncodedPacket {
        EncodedPacket {
            data: Arc::from(self.data.as_ref()),
            flags: self.flags,
            timestamp_us: self.timestamp_us,
        }
    }
}

/// Owned encoded packet
///
/// This is the unit exchanged with packet sources and sinks. The payload is
/// shared via `Arc`, so cloning a packet never copies media bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPacket {
    /// Encoded payload bytes
    pub data: Arc<[u8]>,

    /// Encoder flags
    pub flags: PacketFlags,

    /// Presentation time in microseconds
    pub timestamp_us: i64,
}

impl EncodedPacket {
    /// Create a new packet
    pub fn new(data: impl Into<Arc<[u8]>>, flags: PacketFlags, timestamp_us: i64) -> Self {
        Self { data: data.into(), flags, timestamp_us }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_key_frame(&self) -> bool {
        self.flags.is_key_frame()
    }
}
