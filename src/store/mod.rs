//! Fixed-capacity ring of encoded packets.
//!
//! [`RingPacketStore`] keeps the most recent stretch of an encoded video
//! stream: a circular byte arena for payloads plus a circular table of
//! per-packet metadata. Inserting a packet evicts the oldest packets until the
//! new one fits, so the store always holds the freshest history its capacity
//! allows.
//!
//! ## Layout
//!
//! - The payload arena has `data_capacity` bytes. Packets are packed back to
//!   back; a packet that runs past the end of the arena continues at offset 0.
//! - The metadata table has `meta_capacity` slots indexed by `tail` (oldest
//!   retained) and `head` (next to write). `head == tail` means empty and one
//!   slot always stays free, so at most `meta_capacity - 1` packets are held.
//! - Evicting only advances `tail`; the evicted bytes are overwritten by
//!   later insertions.
//!
//! ## Concurrency
//!
//! The store is not synchronized. One writer calls [`insert`](RingPacketStore::insert);
//! readers must run on the same thread or after the writer is quiesced. The
//! borrow checker enforces this within a thread: every [`PacketView`] borrows
//! the store, so no insertion can happen while a view is alive. For a
//! producer and consumer on different tasks, use [`Recorder`](crate::Recorder).
//!
//! ## Usage Example
//!
//! ```rust
//! use capture_ring::{PacketFlags, RingPacketStore};
//!
//! let mut store = RingPacketStore::new(2_000_000, 30, 1)?;
//! store.insert(&[0u8; 5000], PacketFlags::KEY_FRAME, 0)?;
//! store.insert(&[1u8; 1200], PacketFlags::NONE, 33_333)?;
//!
//! let mut index = store.first_key_frame();
//! while let Some(current) = index {
//!     let packet = store.extract(current);
//!     println!("{} bytes at {}us", packet.len(), packet.timestamp_us);
//!     index = store.next_index(current);
//! }
//! # Ok::<(), capture_ring::CaptureError>(())
//! ```

mod iter;

pub use iter::Packets;

use std::borrow::Cow;
use std::fmt;
use tracing::{debug, trace, warn};

use crate::config::{CaptureConfig, Capacity};
use crate::types::{BufferStatus, PacketFlags, PacketIndex, PacketView};
use crate::{CaptureError, Result};

/// Metadata kept for every retained packet.
#[derive(Debug, Clone, Copy, Default)]
struct SlotMeta {
    flags: PacketFlags,
    timestamp_us: i64,
    offset: usize,
    len: usize,
}

/// Circular buffer of encoded packets with oldest-first eviction.
pub struct RingPacketStore {
    data: Box<[u8]>,
    meta: Box<[SlotMeta]>,
    head: usize,
    tail: usize,
    /// Payload bytes held by retained packets
    used: usize,
}

impl RingPacketStore {
    /// Create a store sized for `span_secs` of video at the given rates.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidConfig`] if any argument is zero or the
    /// derived capacity cannot hold a packet.
    pub fn new(bit_rate: u32, frame_rate: u32, span_secs: u32) -> Result<Self> {
        Self::from_config(&CaptureConfig::new(bit_rate, frame_rate, span_secs))
    }

    /// Create a store sized from a [`CaptureConfig`].
    pub fn from_config(config: &CaptureConfig) -> Result<Self> {
        Self::with_capacity(config.capacity()?)
    }

    /// Create a store with explicit arena and slot counts.
    pub fn with_capacity(capacity: Capacity) -> Result<Self> {
        capacity.validate()?;
        debug!(
            data_bytes = capacity.data_bytes,
            meta_slots = capacity.meta_slots,
            "Allocating packet ring"
        );
        Ok(Self {
            data: vec![0u8; capacity.data_bytes].into_boxed_slice(),
            meta: vec![SlotMeta::default(); capacity.meta_slots].into_boxed_slice(),
            head: 0,
            tail: 0,
            used: 0,
        })
    }

    /// Copy a packet into the ring, evicting the oldest packets until it fits.
    ///
    /// Timestamps are expected to be non-decreasing across calls.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::PacketTooLarge`] if `payload` is larger than the
    /// whole arena. The store is left untouched in that case.
    pub fn insert(&mut self, payload: &[u8], flags: PacketFlags, timestamp_us: i64) -> Result<()> {
        let size = payload.len();
        let capacity = self.data.len();
        if size > capacity {
            return Err(CaptureError::PacketTooLarge { size, capacity });
        }

        if let Some(newest) = self.newest_timestamp_us() {
            if timestamp_us < newest {
                warn!(timestamp_us, newest, "Packet timestamp went backwards");
            }
        }

        while !self.can_admit(size) {
            self.evict_oldest();
        }

        let start = self.next_start();
        self.meta[self.head] = SlotMeta { flags, timestamp_us, offset: start, len: size };

        let first = size.min(capacity - start);
        self.data[start..start + first].copy_from_slice(&payload[..first]);
        if first < size {
            self.data[..size - first].copy_from_slice(&payload[first..]);
        }

        self.used += size;
        trace!(slot = self.head, offset = start, len = size, timestamp_us, %flags, "Inserted packet");
        self.head = self.next_slot(self.head);
        Ok(())
    }

    /// Index of the oldest retained key frame.
    ///
    /// `None` means nothing is extractable yet: a muxer cannot start without
    /// a sync frame.
    pub fn first_key_frame(&self) -> Option<PacketIndex> {
        let mut slot = self.tail;
        while slot != self.head {
            if self.meta[slot].flags.is_key_frame() {
                return Some(PacketIndex::new(slot));
            }
            slot = self.next_slot(slot);
        }
        None
    }

    /// Index of the oldest retained packet, key frame or not.
    pub fn oldest(&self) -> Option<PacketIndex> {
        (!self.is_empty()).then(|| PacketIndex::new(self.tail))
    }

    /// Index following `index`, or `None` once the newest packet is reached.
    pub fn next_index(&self, index: PacketIndex) -> Option<PacketIndex> {
        let next = self.next_slot(index.slot());
        (next != self.head).then(|| PacketIndex::new(next))
    }

    /// Read the packet at `index`.
    ///
    /// The payload is borrowed from the arena unless the packet wraps the arena
    /// end, in which case both halves are copied into one buffer.
    ///
    /// `index` must come from this store and must not have been evicted.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside this store's metadata table, which happens
    /// when it was taken from a larger store. Debug builds also panic when the
    /// slot is in range but no longer retained.
    pub fn extract(&self, index: PacketIndex) -> PacketView<'_> {
        assert!(
            index.slot() < self.meta.len(),
            "packet index {} is out of range for a ring of {} slots",
            index.slot(),
            self.meta.len()
        );
        debug_assert!(self.is_retained(index), "slot {} is not retained", index.slot());

        let slot = self.meta[index.slot()];
        let capacity = self.data.len();
        let end = slot.offset + slot.len;

        let data = if end <= capacity {
            Cow::Borrowed(&self.data[slot.offset..end])
        } else {
            let first = capacity - slot.offset;
            let mut joined = Vec::with_capacity(slot.len);
            joined.extend_from_slice(&self.data[slot.offset..]);
            joined.extend_from_slice(&self.data[..slot.len - first]);
            Cow::Owned(joined)
        };

        PacketView { data, flags: slot.flags, timestamp_us: slot.timestamp_us }
    }

    /// Iterate from the first retained key frame to the newest packet.
    ///
    /// Yields nothing if no key frame is retained.
    pub fn packets_from_key_frame(&self) -> Packets<'_> {
        Packets::new(self, self.first_key_frame())
    }

    /// Iterate over every retained packet, oldest first.
    pub fn retained(&self) -> Packets<'_> {
        Packets::new(self, self.oldest())
    }

    /// Whether `index` currently points at a retained packet.
    pub fn is_retained(&self, index: PacketIndex) -> bool {
        let slot = index.slot();
        slot < self.meta.len() && self.distance(self.tail, slot) < self.len()
    }

    /// Number of retained packets.
    pub fn len(&self) -> usize {
        self.distance(self.tail, self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Payload bytes held by retained packets.
    pub fn payload_used(&self) -> usize {
        self.used
    }

    /// Payload arena size in bytes.
    pub fn data_capacity(&self) -> usize {
        self.data.len()
    }

    /// Metadata slot count, including the slot that always stays free.
    pub fn meta_capacity(&self) -> usize {
        self.meta.len()
    }

    /// Most packets the store can hold at once.
    pub fn max_packets(&self) -> usize {
        self.meta.len() - 1
    }

    /// Time covered by retained packets: newest minus oldest timestamp.
    pub fn time_span_us(&self) -> i64 {
        match self.newest_timestamp_us() {
            Some(newest) => newest.saturating_sub(self.meta[self.tail].timestamp_us),
            None => 0,
        }
    }

    /// Timestamp of the most recently inserted packet.
    pub fn newest_timestamp_us(&self) -> Option<i64> {
        (!self.is_empty()).then(|| self.meta[self.prev_slot(self.head)].timestamp_us)
    }

    /// Fullness report for status displays.
    pub fn status(&self) -> BufferStatus {
        BufferStatus {
            packets: self.len(),
            payload_bytes: self.used,
            data_capacity: self.data.len(),
            span_us: self.time_span_us(),
            dropped_packets: 0,
        }
    }

    /// Whether one more packet of `size` bytes fits without eviction.
    fn can_admit(&self, size: usize) -> bool {
        if self.is_empty() {
            return true;
        }
        if self.next_slot(self.head) == self.tail {
            return false;
        }
        self.data.len() - self.used >= size
    }

    /// Drop the oldest packet. Its bytes become free for later insertions.
    fn evict_oldest(&mut self) {
        assert!(!self.is_empty(), "evicting from an empty packet ring");

        let evicted = self.meta[self.tail];
        self.used -= evicted.len;
        trace!(
            slot = self.tail,
            len = evicted.len,
            timestamp_us = evicted.timestamp_us,
            "Evicted packet"
        );
        self.tail = self.next_slot(self.tail);
    }

    /// Arena offset where the next packet starts.
    fn next_start(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let newest = self.meta[self.prev_slot(self.head)];
        (newest.offset + newest.len) % self.data.len()
    }

    fn next_slot(&self, slot: usize) -> usize {
        (slot + 1) % self.meta.len()
    }

    fn prev_slot(&self, slot: usize) -> usize {
        (slot + self.meta.len() - 1) % self.meta.len()
    }

    /// Slots from `from` forward to `to`.
    fn distance(&self, from: usize, to: usize) -> usize {
        (to + self.meta.len() - from) % self.meta.len()
    }
}

impl fmt::Debug for RingPacketStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingPacketStore")
            .field("data_capacity", &self.data.len())
            .field("meta_capacity", &self.meta.len())
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("used", &self.used)
            .finish()
    }
}
