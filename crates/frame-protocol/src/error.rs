//! Serial Link Error Types

use std::io;
use thiserror::Error;

/// Unrecoverable failures of the underlying serial link.
///
/// Checksum mismatches and mid-frame timeouts never show up here: they are
/// recovered inside the acquirer/decoder and only cost a frame.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Serial device could not be opened
    #[error("Failed to open serial device {device}: {reason}")]
    Open { device: String, reason: String },

    /// Serial device opened but rejected the line settings
    #[error("Failed to configure serial device: {0}")]
    Configure(String),

    /// Byte source reached end of stream
    #[error("Serial link closed")]
    Closed,

    /// Any other I/O failure on the link
    #[error("Serial I/O error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for LinkError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe => LinkError::Closed,
            _ => LinkError::Io(err),
        }
    }
}
