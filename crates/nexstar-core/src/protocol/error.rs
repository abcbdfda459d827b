//! Protocol errors

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the mount
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The transport reported a write or read failure
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// The reply stopped short of its expected length
    #[error("Response timeout: expected {expected} bytes, received {received}")]
    Timeout {
        /// Bytes the command's reply should have
        expected: usize,
        /// Bytes that actually arrived
        received: usize,
    },

    /// No transport is attached
    #[error("Not connected to mount")]
    NotConnected,

    /// Opening the port or the liveness check failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A transport is already attached
    #[error("Already connected")]
    AlreadyConnected,

    /// The echo check came back with different bytes
    #[error("Echo mismatch: expected {expected:02x?}, got {actual:02x?}")]
    EchoMismatch {
        /// Reply a live mount sends
        expected: Vec<u8>,
        /// Reply that was received
        actual: Vec<u8>,
    },

    /// A reply of the right length whose contents make no sense
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// More than three payload bytes for a passthrough envelope
    #[error("Passthrough payload too long: {0} bytes (max 3)")]
    PayloadTooLong(usize),

    /// An argument outside the range the command accepts
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A goto was still slewing when the policy's limit ran out
    #[error("Slew did not finish within {0:?}")]
    SlewTimeout(Duration),

    /// A goto was stopped through its cancel token
    #[error("Slew cancelled")]
    SlewCancelled,

    /// The named serial port does not exist
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// True for failures at the channel level (write/read/timeout), as
    /// opposed to a reply that arrived but made no sense.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProtocolError::SerialError(_)
                | ProtocolError::Timeout { .. }
                | ProtocolError::NotConnected
                | ProtocolError::IoError(_)
        )
    }
}
