//! Packet source trait for encoder output

use tokio::sync::mpsc;
use tracing::trace;

use crate::types::EncodedPacket;
use crate::{CaptureError, Result};

/// Trait for encoded packet producers
///
/// A source abstracts over where encoder output comes from: a hardware
/// encoder callback, a file being replayed, or a test fixture. The
/// [`Recorder`](crate::Recorder) pulls from exactly one source.
///
/// Implementations must be cancel safe: the recorder may drop an in-flight
/// `next_packet` future to serve a snapshot request, and no packet may be lost
/// when that happens.
#[async_trait::async_trait]
pub trait PacketSource: Send + 'static {
    /// Get the next encoded packet
    ///
    /// Returns:
    /// - `Ok(Some(packet))` - Packet available, in presentation order
    /// - `Ok(None)` - Encoder finished (normal termination)
    /// - `Err(e)` - Error occurred
    async fn next_packet(&mut self) -> Result<Option<EncodedPacket>>;
}

/// Create a bounded channel for pushing packets into a recorder.
///
/// The sender side is meant for encoder callbacks; the source side is handed
/// to [`Recorder::spawn`](crate::Recorder::spawn).
pub fn packet_channel(bound: usize) -> (PacketSender, ChannelSource) {
    let (tx, rx) = mpsc::channel(bound);
    (PacketSender { tx }, ChannelSource { rx })
}

/// Producer half of [`packet_channel`].
#[derive(Debug, Clone)]
pub struct PacketSender {
    tx: mpsc::Sender<EncodedPacket>,
}

impl PacketSender {
    /// Send a packet, waiting for channel space.
    pub async fn send(&self, packet: EncodedPacket) -> Result<()> {
        self.tx.send(packet).await.map_err(|_| CaptureError::Closed)
    }

    /// Send from a non-async encoder thread.
    ///
    /// Panics if called from within an async execution context.
    pub fn blocking_send(&self, packet: EncodedPacket) -> Result<()> {
        self.tx.blocking_send(packet).map_err(|_| CaptureError::Closed)
    }

    /// Whether the receiving source has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Source reading packets pushed through a [`PacketSender`].
///
/// The stream ends once every sender is dropped.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<EncodedPacket>,
}

#[async_trait::async_trait]
impl PacketSource for ChannelSource {
    async fn next_packet(&mut self) -> Result<Option<EncodedPacket>> {
        let packet = self.rx.recv().await;
        if let Some(packet) = &packet {
            trace!(len = packet.len(), timestamp_us = packet.timestamp_us, "Received packet");
        }
        Ok(packet)
    }
}
