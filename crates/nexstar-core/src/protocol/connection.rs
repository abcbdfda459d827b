//! Connection management
//!
//! Handles the connection lifecycle and the request/response exchange with
//! the hand controller. Every exchange follows the same steps:
//!
//! 1. drop stale input left over from an abandoned exchange
//! 2. write the whole frame
//! 3. read exactly the expected number of reply bytes
//!
//! A reply shorter than expected is a failure, never a partial result.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    serial::{clear_buffers, configure_port, list_ports, open_port, PortInfo},
    Command, Frame, ProtocolError, SerialTransport, Transport, DEFAULT_BAUD_RATE,
    DEFAULT_TIMEOUT_MS, MAX_RESPONSE_SIZE,
};

/// Byte sent by the liveness check; the mount answers `x#`
const ECHO_BYTE: u8 = b'x';

/// Attempts made by the liveness check before the link is declared down
const ECHO_ATTEMPTS: usize = 2;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Port open, liveness check in progress
    Connecting,
    /// Connected and ready
    Connected,
    /// Last connection attempt failed
    Error,
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Per-read timeout in milliseconds
    pub timeout_ms: u64,
    /// Pause between the two liveness checks in milliseconds
    pub echo_retry_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            echo_retry_delay_ms: 50,
        }
    }
}

impl ConnectionConfig {
    /// Config for a port with default settings
    pub fn for_port(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }

    /// Per-read timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// A reply of exactly the requested length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    bytes: Vec<u8>,
}

impl Response {
    /// Wrap the raw reply bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// All reply bytes, terminator included
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Reply bytes without the trailing terminator
    pub fn payload(&self) -> &[u8] {
        match self.bytes.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    /// First reply byte
    pub fn first(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    /// Byte at `index`, or a malformed-response error naming `what`
    pub fn byte(&self, index: usize, what: &str) -> Result<u8, ProtocolError> {
        self.bytes.get(index).copied().ok_or_else(|| {
            ProtocolError::MalformedResponse(format!("{} reply has no byte {}", what, index))
        })
    }

    /// ASCII view of the whole reply
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Connection to a hand controller
pub struct Connection {
    /// Byte transport (serial port, TCP bridge, simulator)
    transport: Option<Box<dyn Transport>>,
    /// Current connection state
    state: ConnectionState,
    /// Connection configuration
    config: ConnectionConfig,
    /// Metrics: cumulative bytes/frames sent & received
    tx_bytes: u64,
    rx_bytes: u64,
    tx_frames: u64,
    rx_frames: u64,
}

impl Connection {
    /// Create a new connection (not yet connected)
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            transport: None,
            state: ConnectionState::Disconnected,
            config,
            tx_bytes: 0,
            rx_bytes: 0,
            tx_frames: 0,
            rx_frames: 0,
        }
    }

    /// List available serial ports
    pub fn list_ports() -> Vec<PortInfo> {
        list_ports()
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a transport is attached and answered the echo check
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Settings this connection was created with
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Get cumulative tx/rx bytes and frame counters
    pub fn get_counters(&self) -> (u64, u64, u64, u64) {
        (self.tx_bytes, self.rx_bytes, self.tx_frames, self.rx_frames)
    }

    /// Open the configured serial port and check the mount answers
    pub fn connect(&mut self) -> Result<(), ProtocolError> {
        if self.transport.is_some() {
            return Err(ProtocolError::AlreadyConnected);
        }

        info!(
            port = %self.config.port_name,
            baud = self.config.baud_rate,
            "Connecting to mount"
        );

        let mut port = open_port(
            &self.config.port_name,
            Some(self.config.baud_rate),
            self.config.timeout(),
        )?;
        configure_port(port.as_mut())?;
        clear_buffers(port.as_mut())?;

        self.connect_with(Box::new(SerialTransport::new(port)))
    }

    /// Attach an already-open transport and check the mount answers
    pub fn connect_with(&mut self, transport: Box<dyn Transport>) -> Result<(), ProtocolError> {
        if self.transport.is_some() {
            return Err(ProtocolError::AlreadyConnected);
        }

        self.state = ConnectionState::Connecting;
        self.transport = Some(transport);

        match self.check_connection() {
            Ok(()) => {
                info!("Mount connected");
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Mount did not answer the liveness check");
                self.transport = None;
                self.state = ConnectionState::Error;
                Err(ProtocolError::ConnectionFailed(e.to_string()))
            }
        }
    }

    /// Close the transport
    pub fn disconnect(&mut self) {
        if self.transport.take().is_some() {
            info!("Mount disconnected");
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Send the echo check once and compare the literal reply
    pub fn echo(&mut self) -> Result<(), ProtocolError> {
        let frame = Frame::direct(Command::Echo, &[ECHO_BYTE]);
        let response = self.send(&frame)?;
        let expected = [ECHO_BYTE, b'#'];
        if response.as_bytes() != expected {
            return Err(ProtocolError::EchoMismatch {
                expected: expected.to_vec(),
                actual: response.as_bytes().to_vec(),
            });
        }
        Ok(())
    }

    /// Liveness check: echo, and retry once after a short pause.
    ///
    /// Hand controllers are sometimes slow to answer right after power-on.
    /// This is the only exchange that is ever retried.
    pub fn check_connection(&mut self) -> Result<(), ProtocolError> {
        let delay = Duration::from_millis(self.config.echo_retry_delay_ms);
        let mut last_err = ProtocolError::NotConnected;

        for attempt in 1..=ECHO_ATTEMPTS {
            match self.echo() {
                Ok(()) => return Ok(()),
                Err(e) => {
                    debug!(attempt, error = %e, "Echo check failed");
                    last_err = e;
                }
            }
            if attempt < ECHO_ATTEMPTS {
                std::thread::sleep(delay);
            }
        }

        Err(last_err)
    }

    /// Send a frame and read the reply length it declares, using the
    /// configured timeout
    pub fn send(&mut self, frame: &Frame) -> Result<Response, ProtocolError> {
        let timeout = self.config.timeout();
        self.execute(frame.as_bytes(), frame.reply_len(), timeout)
    }

    /// Send a frame with a caller-chosen per-read timeout
    pub fn send_with_timeout(
        &mut self,
        frame: &Frame,
        timeout: Duration,
    ) -> Result<Response, ProtocolError> {
        self.execute(frame.as_bytes(), frame.reply_len(), timeout)
    }

    /// Write `cmd` and read exactly `expected_len` reply bytes.
    ///
    /// `timeout` bounds each individual read, not the whole exchange: as long
    /// as some bytes keep arriving within each window the read continues.
    pub fn execute(
        &mut self,
        cmd: &[u8],
        expected_len: usize,
        timeout: Duration,
    ) -> Result<Response, ProtocolError> {
        if expected_len > MAX_RESPONSE_SIZE {
            return Err(ProtocolError::InvalidArgument(format!(
                "expected reply of {} bytes exceeds the {} byte limit",
                expected_len, MAX_RESPONSE_SIZE
            )));
        }

        let transport = self.transport.as_mut().ok_or(ProtocolError::NotConnected)?;

        transport
            .clear_input()
            .map_err(|e| ProtocolError::SerialError(e.to_string()))?;

        debug!("Sending {} bytes: {:02x?}", cmd.len(), cmd);
        write_all(transport.as_mut(), cmd)?;
        self.tx_bytes = self.tx_bytes.saturating_add(cmd.len() as u64);
        self.tx_frames = self.tx_frames.saturating_add(1);

        if expected_len == 0 {
            return Ok(Response::new(Vec::new()));
        }

        let mut buf = vec![0u8; expected_len];
        let mut received = 0;
        while received < expected_len {
            let n = transport
                .read(&mut buf[received..], timeout)
                .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
            if n == 0 {
                break;
            }
            received += n;
        }

        self.rx_bytes = self.rx_bytes.saturating_add(received as u64);

        if received != expected_len {
            debug!(
                "Short reply: {} of {} bytes: {:02x?}",
                received,
                expected_len,
                &buf[..received]
            );
            return Err(ProtocolError::Timeout {
                expected: expected_len,
                received,
            });
        }

        self.rx_frames = self.rx_frames.saturating_add(1);
        debug!("Received {} bytes: {:02x?}", received, buf);
        Ok(Response::new(buf))
    }
}

/// Write the whole buffer, looping on partial writes
fn write_all(transport: &mut dyn Transport, mut data: &[u8]) -> Result<(), ProtocolError> {
    while !data.is_empty() {
        match transport.write(data) {
            Ok(0) => {
                return Err(ProtocolError::SerialError(
                    "transport accepted no bytes".to_string(),
                ))
            }
            Ok(n) => data = &data[n..],
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(ProtocolError::SerialError(e.to_string())),
        }
    }
    Ok(())
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}
