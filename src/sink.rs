//! Packet sink trait for muxers

use tracing::trace;

use crate::Result;
use crate::types::EncodedPacket;

/// Trait for consumers of saved history, typically a container muxer
///
/// A save calls `start` once, `write_packet` for every packet from the first
/// retained key frame onward, and `finish` once all packets are written.
#[async_trait::async_trait]
pub trait PacketSink: Send {
    /// Begin output. `codec_config` is the most recent codec configuration
    /// the encoder emitted, if any.
    async fn start(&mut self, codec_config: Option<&[u8]>) -> Result<()>;

    /// Write one packet, in presentation order.
    async fn write_packet(&mut self, packet: &EncodedPacket) -> Result<()>;

    /// Complete output.
    async fn finish(&mut self) -> Result<()>;
}

/// Sink collecting packets in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Codec configuration passed to `start`
    pub codec_config: Option<Vec<u8>>,

    /// Packets in write order
    pub packets: Vec<EncodedPacket>,

    /// Whether `finish` was called
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total payload bytes written.
    pub fn payload_bytes(&self) -> usize {
        self.packets.iter().map(EncodedPacket::len).sum()
    }
}

#[async_trait::async_trait]
impl PacketSink for MemorySink {
    async fn start(&mut self, codec_config: Option<&[u8]>) -> Result<()> {
        self.codec_config = codec_config.map(<[u8]>::to_vec);
        self.packets.clear();
        self.finished = false;
        Ok(())
    }

    async fn write_packet(&mut self, packet: &EncodedPacket) -> Result<()> {
        trace!(len = packet.len(), timestamp_us = packet.timestamp_us, "Collected packet");
        self.packets.push(packet.clone());
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
