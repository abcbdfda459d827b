//! Command frame encoding
//!
//! Two frame shapes are used on the wire:
//!
//! - Direct: a single op-letter followed by an optional ASCII or binary
//!   payload, e.g. `r1A2B3C4D,00400000`.
//! - Passthrough: a fixed 8-byte envelope that forwards a sub-command to one
//!   of the motor controllers:
//!
//! ```text
//! [0x50, len+1, dest, cmd, p0, p1, p2, reply_len]
//! ```
//!
//!   The motor controller answers with `reply_len` bytes followed by `#`.

use super::{Command, Device, PassthroughCommand, ProtocolError, MAX_PASSTHROUGH_PAYLOAD};

/// Leading byte of every passthrough envelope
pub const PASSTHROUGH_MARKER: u8 = 0x50;

/// Size of the passthrough envelope
pub const PASSTHROUGH_LEN: usize = 8;

/// An encoded command together with the reply length it expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
    reply_len: usize,
}

impl Frame {
    /// Build a direct frame: op-letter plus payload
    pub fn direct(command: Command, payload: &[u8]) -> Self {
        FrameBuilder::new(command).bytes(payload).build()
    }

    /// Build a direct frame with a raw op-letter and explicit reply length
    pub fn raw(bytes: Vec<u8>, reply_len: usize) -> Self {
        Self { bytes, reply_len }
    }

    /// Build a passthrough envelope for a motor controller
    ///
    /// `reply_len` is the number of payload bytes the motor controller
    /// returns; the frame expects one more for the trailing `#`.
    pub fn passthrough(
        dest: Device,
        command: PassthroughCommand,
        payload: &[u8],
        reply_len: u8,
    ) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_PASSTHROUGH_PAYLOAD {
            return Err(ProtocolError::PayloadTooLong(payload.len()));
        }

        let mut bytes = [0u8; PASSTHROUGH_LEN];
        bytes[0] = PASSTHROUGH_MARKER;
        // Length covers the sub-command byte plus its payload
        bytes[1] = payload.len() as u8 + 1;
        bytes[2] = dest.to_wire();
        bytes[3] = command.to_wire();
        bytes[4..4 + payload.len()].copy_from_slice(payload);
        bytes[7] = reply_len;

        Ok(Self {
            bytes: bytes.to_vec(),
            reply_len: usize::from(reply_len) + 1,
        })
    }

    /// Encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes the device answers with, terminator included
    pub fn reply_len(&self) -> usize {
        self.reply_len
    }

    /// Total encoded size
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Builder for direct frames
pub struct FrameBuilder {
    bytes: Vec<u8>,
    reply_len: usize,
}

impl FrameBuilder {
    /// Start a frame with the command's op-letter
    pub fn new(command: Command) -> Self {
        Self {
            bytes: vec![command.opcode()],
            reply_len: command.reply_len(),
        }
    }

    /// Add a single byte
    pub fn byte(mut self, b: u8) -> Self {
        self.bytes.push(b);
        self
    }

    /// Add raw bytes
    pub fn bytes(mut self, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(data);
        self
    }

    /// Add a 32-bit value as eight upper-case hex digits
    pub fn hex_u32(mut self, value: u32) -> Self {
        self.bytes.extend_from_slice(format!("{:08X}", value).as_bytes());
        self
    }

    /// Add a pair of 32-bit values as `%08X,%08X`
    pub fn hex_pair(self, first: u32, second: u32) -> Self {
        self.hex_u32(first).byte(b',').hex_u32(second)
    }

    /// Build the frame
    pub fn build(self) -> Frame {
        Frame {
            bytes: self.bytes,
            reply_len: self.reply_len,
        }
    }
}
