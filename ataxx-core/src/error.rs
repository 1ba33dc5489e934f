//! Domain-specific error types for the ataxx protocol.
//!
//! All fallible operations return `Result<T, AtaxxError>`; the board engine
//! reports rule violations separately through [`MoveError`].
//! Peer input never panics; every error is typed and recoverable.
//!
//! [`MoveError`]: crate::board::MoveError

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the ataxx protocol.
#[derive(Debug, Error)]
pub enum AtaxxError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// A message violated protocol rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// Frame size exceeded the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The registration handshake was refused.
    #[error("registration refused: {0}")]
    Registration(String),

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The peer is gone; no connection handle remains.
    #[error("connection closed")]
    ConnectionClosed,

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding or decoding of a message failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A board snapshot could not be parsed.
    #[error("invalid board: {0}")]
    InvalidBoard(String),
}

// ── Convenient From implementations ──────────────────────────────

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for AtaxxError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        AtaxxError::ChannelClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = AtaxxError::FrameTooLarge {
            size: 1000,
            max: 500,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));

        let e = AtaxxError::Registration("username exists".into());
        assert_eq!(e.to_string(), "registration refused: username exists");
    }

    #[test]
    fn timeout_names_deadline() {
        let e = AtaxxError::Timeout(Duration::from_millis(250));
        assert_eq!(e.to_string(), "timeout after 250ms");
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: AtaxxError = io_err.into();
        assert!(matches!(e, AtaxxError::Connection(_)));
    }

    #[test]
    fn from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: AtaxxError = json_err.into();
        assert!(matches!(e, AtaxxError::Encoding(_)));
    }
}
