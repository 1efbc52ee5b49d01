//! Encoder flag word attached to every packet

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bit flags supplied by the encoder with each output buffer.
///
/// Bit values follow the common hardware encoder layout, so flag words coming
/// straight from an encoder callback can be wrapped without translation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PacketFlags(pub u32);

impl PacketFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Sync frame, decodable without reference to earlier frames.
    pub const KEY_FRAME: Self = Self(0x1);
    /// Codec configuration data (SPS/PPS and friends), not media.
    pub const CODEC_CONFIG: Self = Self(0x2);
    /// Last buffer of the stream.
    pub const END_OF_STREAM: Self = Self(0x4);
    /// Buffer holds only part of a frame.
    pub const PARTIAL_FRAME: Self = Self(0x8);

    /// Create flags from a raw encoder flag word.
    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Get the raw u32 value.
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Check whether every bit of `other` is set.
    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check whether any bit of the raw mask is set.
    pub fn has_flag(&self, mask: u32) -> bool {
        (self.0 & mask) != 0
    }

    pub fn is_key_frame(&self) -> bool {
        self.has_flag(Self::KEY_FRAME.0)
    }

    pub fn is_codec_config(&self) -> bool {
        self.has_flag(Self::CODEC_CONFIG.0)
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.has_flag(Self::END_OF_STREAM.0)
    }
}

impl From<u32> for PacketFlags {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl BitOr for PacketFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PacketFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for PacketFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}
