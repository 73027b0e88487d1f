//! The `error` module defines the error type shared by every part of `msgbroker`.
//!
//! Each variant corresponds to one failure kind of the wire protocol. Socket
//! errors are classified once, in the `From<std::io::Error>` impl, so callers
//! match on what happened (peer vanished, timed out, bad frame) instead of on
//! raw `io::ErrorKind`s.

use std::io;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    /// The peer is not listening on the requested address.
    #[error("connection refused by {0}")]
    ConnectionRefused(String),

    /// The peer vanished mid-exchange (reset, abort, broken pipe or EOF).
    #[error("connection reset by peer")]
    ConnectionReset,

    /// The connection was closed from this side, e.g. by a heartbeat teardown.
    #[error("connection closed locally")]
    ConnectionClosed,

    /// An expected reply did not arrive within the bounded wait.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// A frame header did not parse as a decimal length.
    #[error("malformed frame header: {0:?}")]
    MalformedFrame(String),

    #[error("frame payload is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// A frame arrived but was not the one the protocol expects next.
    #[error("unexpected reply: {0:?}")]
    UnexpectedReply(String),

    #[error("unexpected acknowledgement byte {0:#04x}")]
    BadAcknowledgement(u8),

    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl BrokerError {
    /// True for the kinds that mean "no more messages on this connection".
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            BrokerError::ConnectionReset
                | BrokerError::ConnectionClosed
                | BrokerError::MalformedFrame(_)
        )
    }
}

impl From<io::Error> for BrokerError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => BrokerError::ConnectionReset,
            _ => BrokerError::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;
