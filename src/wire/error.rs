//! Wire protocol error types.

use std::io;

use thiserror::Error;

/// Errors produced while encoding or decoding wire messages.
#[derive(Error, Debug)]
pub enum WireError {
    /// Failure of the underlying byte sink or source.
    ///
    /// A writer that stops accepting bytes surfaces as
    /// [`io::ErrorKind::WriteZero`], a reader that runs dry mid-field as
    /// [`io::ErrorKind::UnexpectedEof`].
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The bytes or the message violate the protocol.
    #[error("{operation}: {detail}")]
    Protocol {
        /// Operation that rejected the message, e.g. `"MsgPong.encode"`.
        operation: &'static str,
        /// Human readable reason.
        detail: String,
    },

    /// The entropy source could not provide random bytes.
    #[error("random source failed: {0}")]
    Rng(#[from] rand::Error),
}

impl WireError {
    /// Returns true for protocol violations, false for I/O and RNG failures.
    pub fn is_protocol(&self) -> bool {
        matches!(self, WireError::Protocol { .. })
    }

    /// Returns the I/O error kind when this is an I/O failure.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            WireError::Io(e) => Some(e.kind()),
            _ => None,
        }
    }
}

/// Raised by the command registry for a command string it does not know.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unhandled command [{0}]")]
pub struct UnknownCommand(pub String);

/// Builds a [`WireError::Protocol`].
pub fn message_error(operation: &'static str, detail: impl Into<String>) -> WireError {
    WireError::Protocol {
        operation,
        detail: detail.into(),
    }
}
