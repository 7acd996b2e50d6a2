//! Error types shared across the PnPKit crates.
//!
//! Per-domain `thiserror` enums plus a unified [`Error`] used in public
//! APIs. Feeder exhaustion and missing tape mappings are deliberately NOT
//! errors: they are part-level diagnostics and the run continues.

use thiserror::Error;

/// Machine configuration problems. Always fatal, reported before any
/// machine motion is attempted.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The selected backend cannot work without a configuration.
    #[error("This machine backend needs a configuration (board origin, bed level, tapes)")]
    MissingConfig,

    /// The bed level must be at or below the board top.
    #[error("Bed level {bed_level}mm is above the board top {board_top}mm")]
    BedAboveBoard { bed_level: f32, board_top: f32 },

    /// The bed level must be at or below every tape surface.
    #[error("Bed level {bed_level}mm is above tape '{key}' at {tape_height}mm")]
    BedAboveTape {
        key: String,
        bed_level: f32,
        tape_height: f32,
    },

    /// Anything else wrong with the configuration contents.
    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },
}

/// Wire protocol failures on the machine connection. Fatal for the
/// current run: no further motion commands may be issued on an
/// out-of-sync connection.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The machine did not acknowledge a command line in time.
    #[error("No acknowledgment from the machine within {timeout_ms}ms")]
    AckTimeout { timeout_ms: u64 },

    /// The connection reached end-of-file.
    #[error("Machine connection closed")]
    ConnectionClosed,

    /// The connection could not be established.
    #[error("Failed to open machine connection '{descriptor}': {reason}")]
    FailedToOpen { descriptor: String, reason: String },

    /// Baud rate outside the supported set.
    #[error("Invalid speed '{baud}'; valid speeds are [9600, 19200, 38400, 57600, 115200, 230400, 460800]")]
    UnsupportedBaudRate { baud: String },

    /// Read/write failure on the byte stream.
    #[error("I/O error on machine connection: {0}")]
    Io(#[from] std::io::Error),
}

/// Unified error type for PnPKit public APIs.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// I/O outside the machine connection (files, terminals).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a plain message.
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check whether this is an acknowledgment timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Protocol(ProtocolError::AckTimeout { .. }))
    }
}

/// Result type using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ConfigError::BedAboveBoard {
            bed_level: 12.5,
            board_top: 12.0,
        };
        assert_eq!(
            err.to_string(),
            "Bed level 12.5mm is above the board top 12mm"
        );

        let err = ProtocolError::AckTimeout { timeout_ms: 60000 };
        assert_eq!(
            err.to_string(),
            "No acknowledgment from the machine within 60000ms"
        );
    }

    #[test]
    fn test_conversion_and_timeout_check() {
        let err: Error = ProtocolError::AckTimeout { timeout_ms: 10 }.into();
        assert!(err.is_timeout());

        let err: Error = ConfigError::MissingConfig.into();
        assert!(!err.is_timeout());
        assert!(matches!(err, Error::Config(_)));
    }
}
