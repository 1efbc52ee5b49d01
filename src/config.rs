//! Capture configuration and ring sizing.
//!
//! A ring is sized from three numbers: the encoder's target bit rate, its frame
//! rate, and how many seconds of history to keep. Payload space is sized for
//! the average bit rate while metadata slots are provisioned for twice the
//! frame count, so bytes rather than slots normally run out first.
//!
//! ```rust
//! use capture_ring::CaptureConfig;
//!
//! let config = CaptureConfig::from_yaml("bit_rate: 2000000\nframe_rate: 30\nspan_secs: 1\n")?;
//! let capacity = config.capacity()?;
//! assert_eq!(capacity.data_bytes, 250_000);
//! assert_eq!(capacity.meta_slots, 60);
//! # Ok::<(), capture_ring::CaptureError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::{CaptureError, Result};

/// Default encoder bit rate, 6 Mbps.
pub const DEFAULT_BIT_RATE: u32 = 6_000_000;
/// Default encoder frame rate.
pub const DEFAULT_FRAME_RATE: u32 = 30;
/// Default retention span in seconds.
pub const DEFAULT_SPAN_SECS: u32 = 7;

/// Encoder settings that determine how much history a ring retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Target encoder bit rate in bits per second
    pub bit_rate: u32,

    /// Encoder frame rate in frames per second
    pub frame_rate: u32,

    /// Seconds of history to keep
    pub span_secs: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            bit_rate: DEFAULT_BIT_RATE,
            frame_rate: DEFAULT_FRAME_RATE,
            span_secs: DEFAULT_SPAN_SECS,
        }
    }
}

/// Fixed storage sizes of a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    /// Payload arena size in bytes
    pub data_bytes: usize,

    /// Number of metadata slots; one is always kept free
    pub meta_slots: usize,
}

impl Capacity {
    /// Check that a ring of this size can hold at least one packet.
    pub fn validate(&self) -> Result<()> {
        if self.data_bytes == 0 {
            return Err(CaptureError::invalid_config("data_bytes", "payload arena is empty"));
        }
        if self.meta_slots < 2 {
            return Err(CaptureError::invalid_config(
                "meta_slots",
                format!("need at least 2 slots, got {}", self.meta_slots),
            ));
        }
        Ok(())
    }
}

impl CaptureConfig {
    pub fn new(bit_rate: u32, frame_rate: u32, span_secs: u32) -> Self {
        Self { bit_rate, frame_rate, span_secs }
    }

    /// Reject zero-valued settings.
    pub fn validate(&self) -> Result<()> {
        if self.bit_rate == 0 {
            return Err(CaptureError::invalid_config("bit_rate", "must be positive"));
        }
        if self.frame_rate == 0 {
            return Err(CaptureError::invalid_config("frame_rate", "must be positive"));
        }
        if self.span_secs == 0 {
            return Err(CaptureError::invalid_config("span_secs", "must be positive"));
        }
        Ok(())
    }

    /// Derive ring sizes: `bit_rate * span / 8` bytes and `frame_rate * span * 2` slots.
    pub fn capacity(&self) -> Result<Capacity> {
        self.validate()?;

        let span = u64::from(self.span_secs);
        let data_bytes = u64::from(self.bit_rate) * span / 8;
        let meta_slots = u64::from(self.frame_rate) * span * 2;

        let data_bytes = usize::try_from(data_bytes).map_err(|_| {
            CaptureError::invalid_config("bit_rate", format!("{data_bytes} bytes does not fit"))
        })?;
        let meta_slots = usize::try_from(meta_slots).map_err(|_| {
            CaptureError::invalid_config("frame_rate", format!("{meta_slots} slots does not fit"))
        })?;

        let capacity = Capacity { data_bytes, meta_slots };
        capacity.validate()?;

        debug!(
            bit_rate = self.bit_rate,
            frame_rate = self.frame_rate,
            span_secs = self.span_secs,
            data_bytes,
            meta_slots,
            "Derived ring capacity"
        );
        Ok(capacity)
    }

    /// Parse a YAML document.
    ///
    /// Missing keys fall back to the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| CaptureError::Parse {
            context: "CaptureConfig deserialization".to_string(),
            details: e.to_string(),
        })
    }

    /// Load and validate a YAML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| CaptureError::file_error(path.to_path_buf(), e))?;
        let config = Self::from_yaml(&yaml)?;
        config.validate()?;
        debug!(path = %path.display(), ?config, "Loaded capture config");
        Ok(config)
    }
}
