//! Error types for packet capture.
//!
//! All errors implement the `std::error::Error` trait and carry enough
//! structured context to decide what the caller should do next.
//!
//! ## Error Categories
//!
//! - **Precondition Errors**: oversized packets and unusable capacity settings.
//!   These point at a misconfigured pipeline upstream and are never retried.
//! - **Not Ready**: no key frame retained yet. Poll again later.
//! - **Configuration Errors**: config files that cannot be read or parsed
//! - **Collaborator Errors**: failures reported by a packet source or sink
//! - **Lifecycle Errors**: the recorder task has stopped
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use capture_ring::CaptureError;
//!
//! let error = CaptureError::NoKeyFrame;
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for capture operations.
pub type Result<T, E = CaptureError> = std::result::Result<T, E>;

/// Main error type for capture operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CaptureError {
    #[error("Packet of {size} bytes exceeds payload capacity of {capacity} bytes")]
    PacketTooLarge { size: usize, capacity: usize },

    #[error("Invalid capture configuration for {parameter}: {details}")]
    InvalidConfig { parameter: &'static str, details: String },

    #[error("No key frame retained yet")]
    NoKeyFrame,

    #[error("Config file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Packet source failed: {reason}")]
    Source {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Packet sink failed: {reason}")]
    Sink {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Recorder is no longer running")]
    Closed,
}

impl CaptureError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            CaptureError::NoKeyFrame => true,
            CaptureError::Source { .. } => true,
            CaptureError::Sink { .. } => true,
            CaptureError::PacketTooLarge { .. } => false,
            CaptureError::InvalidConfig { .. } => false,
            CaptureError::File { .. } => false,
            CaptureError::Parse { .. } => false,
            CaptureError::Closed => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            CaptureError::PacketTooLarge { .. } => vec![
                "Raise the configured bit rate or retention span",
                "Lower the encoder bit rate or key frame size",
                "Drop the packet and keep capturing",
            ],
            CaptureError::InvalidConfig { .. } => vec![
                "Use positive bit rate, frame rate and span values",
                "Check that derived capacities fit in memory",
            ],
            CaptureError::NoKeyFrame => vec![
                "Wait for the encoder to emit the next key frame",
                "Request a sync frame from the encoder",
                "Shorten the key frame interval",
            ],
            CaptureError::File { .. } => vec![
                "Check the config file exists and is readable",
                "Check file permissions",
            ],
            CaptureError::Parse { .. } => vec![
                "Check the config file is valid YAML",
                "Verify field names and value types",
            ],
            CaptureError::Source { .. } => vec![
                "Check the encoder is still running",
                "Restart the capture session",
            ],
            CaptureError::Sink { .. } => vec![
                "Check the output destination is writable",
                "Ensure sufficient disk space",
                "Retry the save",
            ],
            CaptureError::Closed => vec![
                "Spawn a new recorder",
                "Keep a handle alive for the lifetime of the capture session",
            ],
        }
    }

    /// Helper constructor for invalid configuration errors.
    pub fn invalid_config(parameter: &'static str, details: impl Into<String>) -> Self {
        CaptureError::InvalidConfig { parameter, details: details.into() }
    }

    /// Helper constructor for config file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        CaptureError::File { path, source }
    }

    /// Helper constructor for source failures.
    pub fn source_failed(reason: impl Into<String>) -> Self {
        CaptureError::Source { reason: reason.into(), source: None }
    }

    /// Helper constructor for sink failures.
    pub fn sink_failed(reason: impl Into<String>) -> Self {
        CaptureError::Sink { reason: reason.into(), source: None }
    }

    /// Helper constructor for sink failures with source.
    pub fn sink_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        CaptureError::Sink { reason: reason.into(), source: Some(source) }
    }
}
