//! Byte transports
//!
//! The engine only needs three things from the link to the hand controller:
//! write some bytes, read with a timeout, and drop whatever is sitting in the
//! input buffer. Serial ports and TCP bridges (WiFi adapters that expose the
//! hand controller on a socket) both provide that.

use serialport::SerialPort;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Abstraction for the link to the mount
pub trait Transport: Send {
    /// Write as many bytes as the link accepts, returning the count
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Read up to `buf.len()` bytes, waiting at most `timeout` for the first
    /// one. Returns 0 when the timeout elapses with no data.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Discard any bytes received but not yet read
    fn clear_input(&mut self) -> io::Result<()>;
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

/// Serial port wrapper implementing Transport
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Wrap an open, configured port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = self.port.write(data)?;
        self.port.flush()?;
        Ok(n)
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        self.port
            .set_timeout(timeout)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(ref e) if is_timeout(e) => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

/// TCP stream wrapper implementing Transport
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Wrap a connected stream
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    /// Connect to a WiFi bridge, e.g. `1.2.3.4:2000`
    pub fn connect(addr: &str, timeout: Duration) -> io::Result<Self> {
        let addr = addr
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }
}

impl Transport for TcpTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = self.stream.write(data)?;
        self.stream.flush()?;
        Ok(n)
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        // A zero duration is rejected by set_read_timeout
        let timeout = timeout.max(Duration::from_millis(1));
        self.stream.set_read_timeout(Some(timeout))?;
        match self.stream.read(buf) {
            Ok(n) => Ok(n),
            Err(ref e) if is_timeout(e) => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn clear_input(&mut self) -> io::Result<()> {
        // No flush syscall for sockets: drain with a non-blocking read
        self.stream.set_nonblocking(true)?;
        let mut buf = [0u8; 256];
        let result = loop {
            match self.stream.read(&mut buf) {
                Ok(0) => break Ok(()),
                Ok(_) => continue,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        self.stream.set_nonblocking(false)?;
        result
    }
}

/// Frames written to a [`ScriptedTransport`], shared with the test that
/// created it
#[derive(Debug, Clone, Default)]
pub struct SentFrames(Arc<Mutex<Vec<Vec<u8>>>>);

impl SentFrames {
    /// Snapshot of every frame written so far
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.0.lock().map(|f| f.clone()).unwrap_or_default()
    }

    fn start(&self) {
        if let Ok(mut frames) = self.0.lock() {
            frames.push(Vec::new());
        }
    }

    fn append(&self, chunk: &[u8]) {
        if let Ok(mut frames) = self.0.lock() {
            match frames.last_mut() {
                Some(last) => last.extend_from_slice(chunk),
                None => frames.push(chunk.to_vec()),
            }
        }
    }
}

/// Transport that answers each exchange with the next canned reply.
///
/// An exchange starts at `clear_input`; its reply is released on the first
/// read. Bytes of a reply that the engine does not read are left pending
/// until the next `clear_input`.
pub struct ScriptedTransport {
    replies: VecDeque<Vec<u8>>,
    pending: VecDeque<u8>,
    reply_loaded: bool,
    write_chunk: usize,
    read_chunk: usize,
    exchanges: usize,
    write_failure: Option<usize>,
    read_error: Option<(usize, io::ErrorKind)>,
    sent: SentFrames,
}

impl ScriptedTransport {
    /// One reply per exchange, in order; the echo reply comes first
    pub fn new(replies: &[&[u8]]) -> (Self, SentFrames) {
        let sent = SentFrames::default();
        let transport = Self {
            replies: replies.iter().map(|r| r.to_vec()).collect(),
            pending: VecDeque::new(),
            reply_loaded: false,
            write_chunk: usize::MAX,
            read_chunk: usize::MAX,
            exchanges: 0,
            write_failure: None,
            read_error: None,
            sent: sent.clone(),
        };
        (transport, sent)
    }

    /// Accept at most `n` bytes per write call
    pub fn with_write_chunk(mut self, n: usize) -> Self {
        self.write_chunk = n.max(1);
        self
    }

    /// Deliver at most `n` bytes per read call
    pub fn with_read_chunk(mut self, n: usize) -> Self {
        self.read_chunk = n.max(1);
        self
    }

    /// Accept no bytes during exchange `n` (0 is the connect echo)
    pub fn with_write_failure(mut self, exchange: usize) -> Self {
        self.write_failure = Some(exchange);
        self
    }

    /// Fail every read during exchange `n` with `kind`
    pub fn with_read_error(mut self, exchange: usize, kind: io::ErrorKind) -> Self {
        self.read_error = Some((exchange, kind));
        self
    }

    /// Replies not yet released
    pub fn remaining(&self) -> usize {
        self.replies.len()
    }

    /// Index of the exchange in progress
    fn current(&self) -> usize {
        self.exchanges.saturating_sub(1)
    }
}

impl Transport for ScriptedTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.write_failure == Some(self.current()) {
            return Ok(0);
        }
        let n = data.len().min(self.write_chunk);
        self.sent.append(&data[..n]);
        Ok(n)
    }

    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
        if let Some((exchange, kind)) = self.read_error {
            if exchange == self.current() {
                return Err(io::Error::new(kind, "scripted read error"));
            }
        }
        if !self.reply_loaded {
            self.reply_loaded = true;
            if let Some(reply) = self.replies.pop_front() {
                self.pending.extend(reply);
            }
        }
        let n = buf.len().min(self.pending.len()).min(self.read_chunk);
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.pending.clear();
        self.reply_loaded = false;
        self.exchanges += 1;
        self.sent.start();
        Ok(())
    }
}
