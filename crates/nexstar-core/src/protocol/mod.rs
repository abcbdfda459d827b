//! Serial Protocol Communication
//!
//! Implements the NexStar hand controller protocol: direct op-letter
//! commands, the passthrough envelope addressing the motor controllers, and
//! the exact-length request/response exchange that carries both.

pub mod commands;
mod connection;
mod error;
pub mod frame;
pub mod serial;
mod transport;

pub use commands::{Command, Device, Direction, PassthroughCommand, SlewRate, TrackMode};
pub use connection::{Connection, ConnectionConfig, ConnectionState, Response};
pub use error::ProtocolError;
pub use frame::{Frame, FrameBuilder};
pub use serial::{clear_buffers, configure_port, list_ports, open_port, PortInfo};
pub use transport::{ScriptedTransport, SentFrames, SerialTransport, TcpTransport, Transport};

/// Default baud rate of the hand controller's serial port
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default per-read timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Largest reply the protocol produces, in bytes
pub const MAX_RESPONSE_SIZE: usize = 20;

/// Largest payload a passthrough envelope can carry
pub const MAX_PASSTHROUGH_PAYLOAD: usize = 3;
