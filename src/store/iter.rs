//! Borrowing iteration over retained packets

use std::iter::FusedIterator;

use super::RingPacketStore;
use crate::types::{PacketIndex, PacketView};

/// Iterator over a run of retained packets, oldest first.
///
/// Created by [`RingPacketStore::packets_from_key_frame`] and
/// [`RingPacketStore::retained`]. Holds a shared borrow of the store, so the
/// run cannot change underneath it.
#[derive(Debug, Clone)]
pub struct Packets<'a> {
    store: &'a RingPacketStore,
    next: Option<PacketIndex>,
    remaining: usize,
}

impl<'a> Packets<'a> {
    pub(super) fn new(store: &'a RingPacketStore, start: Option<PacketIndex>) -> Self {
        let remaining = match start {
            Some(index) => store.distance(index.slot(), store.head),
            None => 0,
        };
        Self { store, next: start, remaining }
    }

    /// Index of the packet the next call to `next` returns.
    pub fn peek_index(&self) -> Option<PacketIndex> {
        self.next
    }
}

impl<'a> Iterator for Packets<'a> {
    type Item = PacketView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next?;
        self.next = self.store.next_index(index);
        self.remaining -= 1;
        Some(self.store.extract(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Packets<'_> {}

impl FusedIterator for Packets<'_> {}
