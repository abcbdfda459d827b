//! Demo Mode - Simulated hand controller for testing
//!
//! Answers the NexStar command set the way a real hand controller does, so
//! the driver can be exercised without a telescope attached. Gotos take a
//! random number of `L` polls to finish, and an abort leaves the mount
//! halfway to its target.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;
use tracing::debug;

use crate::protocol::frame::{PASSTHROUGH_LEN, PASSTHROUGH_MARKER};
use crate::protocol::{Device, PassthroughCommand, Transport};

/// Which coordinate frame a goto was issued in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axes {
    Equatorial,
    Horizontal,
}

#[derive(Debug, Clone, Copy)]
struct Slew {
    axes: Axes,
    target: (u32, u32),
    remaining_polls: u32,
}

/// Wrapping midpoint on the fixed32 circle, taking the short way round
fn halfway(from: u32, to: u32) -> u32 {
    let delta = to.wrapping_sub(from) as i32;
    from.wrapping_add((delta / 2) as u32)
}

/// Simulated NexStar hand controller
pub struct SimulatedMount {
    rng: StdRng,
    input: Vec<u8>,
    output: VecDeque<u8>,
    ra_dec: (u32, u32),
    az_alt: (u32, u32),
    slew: Option<Slew>,
    stuck: bool,
    aligned: bool,
    hibernating: bool,
    track_mode: u8,
    version: (u8, u8),
    variant: u8,
    model: u8,
    motor_firmware: (u8, u8),
    pulse_polls: [u8; 2],
    location: Option<[u8; 8]>,
    datetime: Option<[u8; 8]>,
}

impl Default for SimulatedMount {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedMount {
    /// Create a simulator with random slew durations
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Create a simulator whose slew durations repeat run to run
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            input: Vec::new(),
            output: VecDeque::new(),
            ra_dec: (0, 0),
            az_alt: (0, 0),
            slew: None,
            stuck: false,
            aligned: true,
            hibernating: false,
            // EQ North
            track_mode: 2,
            version: (5, 35),
            variant: 0x11,
            // AVX
            model: 20,
            motor_firmware: (7, 11),
            pulse_polls: [0; 2],
            location: None,
            datetime: None,
        }
    }

    /// Report this model id from `m`
    pub fn with_model(mut self, model: u8) -> Self {
        self.model = model;
        self
    }

    /// Report this controller version from `V`
    pub fn with_version(mut self, major: u8, minor: u8) -> Self {
        self.version = (major, minor);
        self
    }

    /// Report this variant byte from `v`
    pub fn with_variant(mut self, variant: u8) -> Self {
        self.variant = variant;
        self
    }

    /// Report this version from both motor controllers
    pub fn with_motor_firmware(mut self, major: u8, minor: u8) -> Self {
        self.motor_firmware = (major, minor);
        self
    }

    /// Answer `J` with this alignment state
    pub fn with_alignment(mut self, aligned: bool) -> Self {
        self.aligned = aligned;
        self
    }

    /// Slews never finish until aborted
    pub fn with_stuck_slews(mut self) -> Self {
        self.stuck = true;
        self
    }

    /// Start at this RA/DEC (raw wire values)
    pub fn with_ra_dec(mut self, ra: u32, dec: u32) -> Self {
        self.ra_dec = (ra, dec);
        self
    }

    /// Last location received, as sent on the wire
    pub fn location(&self) -> Option<[u8; 8]> {
        self.location
    }

    /// Last date/time received, as sent on the wire
    pub fn datetime(&self) -> Option<[u8; 8]> {
        self.datetime
    }

    fn reply(&mut self, bytes: &[u8]) {
        self.output.extend(bytes.iter().copied());
        self.output.push_back(b'#');
    }

    fn reply_pair(&mut self, pair: (u32, u32)) {
        let text = format!("{:08X},{:08X}", pair.0, pair.1);
        self.reply(text.as_bytes());
    }

    /// Length of the command at the head of the input, if known
    fn command_len(&self) -> Option<usize> {
        let len = match *self.input.first()? {
            b'K' | b'T' | b'x' | b'y' => 2,
            b'J' | b'e' | b'z' | b'L' | b'M' | b't' | b'V' | b'v' | b'm' => 1,
            b'r' | b'b' | b's' => 18,
            b'W' | b'H' => 9,
            PASSTHROUGH_MARKER => PASSTHROUGH_LEN,
            // Unknown byte: drop it, the real controller ignores it too
            _ => 1,
        };
        Some(len)
    }

    fn process_input(&mut self) {
        while let Some(len) = self.command_len() {
            if self.input.len() < len {
                break;
            }
            let cmd: Vec<u8> = self.input.drain(..len).collect();
            debug!("Simulator received {:02x?}", cmd);
            self.handle(&cmd);
        }
    }

    fn parse_pair(cmd: &[u8]) -> Option<(u32, u32)> {
        let text = std::str::from_utf8(cmd.get(1..)?).ok()?;
        let (a, b) = text.split_once(',')?;
        Some((
            u32::from_str_radix(a, 16).ok()?,
            u32::from_str_radix(b, 16).ok()?,
        ))
    }

    fn start_slew(&mut self, axes: Axes, target: (u32, u32)) {
        let remaining_polls = self.rng.gen_range(2..6);
        self.slew = Some(Slew {
            axes,
            target,
            remaining_polls,
        });
    }

    fn finish_slew(&mut self, slew: Slew, position: (u32, u32)) {
        match slew.axes {
            Axes::Equatorial => self.ra_dec = position,
            Axes::Horizontal => self.az_alt = position,
        }
        self.slew = None;
    }

    fn current(&self, axes: Axes) -> (u32, u32) {
        match axes {
            Axes::Equatorial => self.ra_dec,
            Axes::Horizontal => self.az_alt,
        }
    }

    fn poll_slewing(&mut self) -> bool {
        let Some(mut slew) = self.slew else {
            return false;
        };
        if self.stuck {
            return true;
        }
        if slew.remaining_polls == 0 {
            self.finish_slew(slew, slew.target);
            return false;
        }
        slew.remaining_polls -= 1;
        self.slew = Some(slew);
        true
    }

    fn abort(&mut self) {
        if let Some(slew) = self.slew {
            let from = self.current(slew.axes);
            let stop = (
                halfway(from.0, slew.target.0),
                halfway(from.1, slew.target.1),
            );
            self.finish_slew(slew, stop);
        }
    }

    fn handle(&mut self, cmd: &[u8]) {
        if self.hibernating && cmd != b"y#" {
            return;
        }

        match cmd {
            [b'K', byte] => {
                let byte = *byte;
                self.reply(&[byte]);
            }
            [b'J'] => {
                let aligned = u8::from(self.aligned);
                self.reply(&[aligned]);
            }
            [b'e'] => self.reply_pair(self.ra_dec),
            [b'z'] => self.reply_pair(self.az_alt),
            [b'r', ..] | [b'b', ..] => {
                if let Some(target) = Self::parse_pair(cmd) {
                    let axes = if cmd[0] == b'r' {
                        Axes::Equatorial
                    } else {
                        Axes::Horizontal
                    };
                    self.start_slew(axes, target);
                    self.reply(&[]);
                }
            }
            [b's', ..] => {
                if let Some(position) = Self::parse_pair(cmd) {
                    self.ra_dec = position;
                    self.reply(&[]);
                }
            }
            [b'L'] => {
                let slewing = if self.poll_slewing() { b'1' } else { b'0' };
                self.reply(&[slewing]);
            }
            [b'M'] => {
                self.abort();
                self.reply(&[]);
            }
            [b'T', mode] => {
                self.track_mode = *mode;
                self.reply(&[]);
            }
            [b't'] => {
                let mode = self.track_mode;
                self.reply(&[mode]);
            }
            [b'V'] => {
                let (major, minor) = self.version;
                self.reply(&[major, minor]);
            }
            [b'v'] => {
                let variant = self.variant;
                self.reply(&[variant]);
            }
            [b'm'] => {
                let model = self.model;
                self.reply(&[model]);
            }
            [b'W', rest @ ..] => {
                self.location = rest.try_into().ok();
                self.reply(&[]);
            }
            [b'H', rest @ ..] => {
                self.datetime = rest.try_into().ok();
                self.reply(&[]);
            }
            b"x#" => {
                self.hibernating = true;
                self.reply(&[]);
            }
            b"y#" => {
                self.hibernating = false;
                self.reply(&[]);
            }
            [PASSTHROUGH_MARKER, _len, dest, sub, p0, _p1, _p2, _reply_len] => {
                self.handle_passthrough(*dest, *sub, *p0);
            }
            _ => debug!("Simulator ignoring {:02x?}", cmd),
        }
    }

    fn handle_passthrough(&mut self, dest: u8, sub: u8, p0: u8) {
        let Some(device) = Device::from_wire(dest) else {
            return;
        };
        let index = match device {
            Device::RaMotor => 0,
            Device::DecMotor => 1,
        };
        match PassthroughCommand::from_wire(sub) {
            Some(PassthroughCommand::GetFirmware) => {
                let (major, minor) = self.motor_firmware;
                self.reply(&[major, minor]);
            }
            Some(PassthroughCommand::MovePositive) | Some(PassthroughCommand::MoveNegative) => {
                debug!(?device, rate = p0, "Simulator axis move");
                self.reply(&[]);
            }
            Some(PassthroughCommand::PulseGuide) => {
                self.pulse_polls[index] = 2;
                self.reply(&[]);
            }
            Some(PassthroughCommand::PulseStatus) => {
                let active = self.pulse_polls[index] > 0;
                self.pulse_polls[index] = self.pulse_polls[index].saturating_sub(1);
                self.reply(&[u8::from(active)]);
            }
            None => {}
        }
    }
}

impl Transport for SimulatedMount {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.input.extend_from_slice(data);
        self.process_input();
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
        let n = buf.len().min(self.output.len());
        for (slot, byte) in buf.iter_mut().zip(self.output.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.output.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(sim: &mut SimulatedMount, cmd: &[u8]) -> Vec<u8> {
        sim.clear_input().unwrap();
        sim.write(cmd).unwrap();
        let mut buf = [0u8; 32];
        let n = sim.read(&mut buf, Duration::ZERO).unwrap();
        buf[..n].to_vec()
    }

    #[test]
    fn test_echo() {
        let mut sim = SimulatedMount::with_seed(1);
        assert_eq!(exchange(&mut sim, b"Kx"), b"x#");
    }

    #[test]
    fn test_slew_finishes_at_target() {
        let mut sim = SimulatedMount::with_seed(7);
        assert_eq!(exchange(&mut sim, b"r80000000,20000000"), b"#");
        let mut polls = 0;
        while exchange(&mut sim, b"L") == b"1#" {
            polls += 1;
            assert!(polls < 10);
        }
        assert!(polls >= 2);
        assert_eq!(exchange(&mut sim, b"e"), b"80000000,20000000#");
    }

    #[test]
    fn test_abort_stops_halfway() {
        let mut sim = SimulatedMount::with_seed(7).with_stuck_slews();
        exchange(&mut sim, b"b40000000,00000000");
        assert_eq!(exchange(&mut sim, b"L"), b"1#");
        exchange(&mut sim, b"M");
        assert_eq!(exchange(&mut sim, b"L"), b"0#");
        assert_eq!(exchange(&mut sim, b"z"), b"20000000,00000000#");
    }

    #[test]
    fn test_halfway_wraps_short_way() {
        assert_eq!(halfway(0xF000_0000, 0x1000_0000), 0x0000_0000);
        assert_eq!(halfway(0x1000_0000, 0x3000_0000), 0x2000_0000);
    }

    #[test]
    fn test_chunked_write() {
        let mut sim = SimulatedMount::with_seed(1);
        sim.clear_input().unwrap();
        sim.write(&[0x50, 1, 0x11]).unwrap();
        sim.write(&[0xFE, 0, 0, 0, 2]).unwrap();
        let mut buf = [0u8; 8];
        let n = sim.read(&mut buf, Duration::ZERO).unwrap();
        assert_eq!(&buf[..n], &[7, 11, b'#']);
    }

    #[test]
    fn test_records_location_and_time() {
        let mut sim = SimulatedMount::with_seed(1);
        assert_eq!(sim.location(), None);
        assert_eq!(exchange(&mut sim, &[b'W', 37, 45, 0, 0, 122, 30, 0, 1]), b"#");
        assert_eq!(sim.location(), Some([37, 45, 0, 0, 122, 30, 0, 1]));
        assert_eq!(exchange(&mut sim, &[b'H', 12, 30, 5, 3, 15, 24, 248, 0]), b"#");
        assert_eq!(sim.datetime(), Some([12, 30, 5, 3, 15, 24, 248, 0]));
    }

    #[test]
    fn test_hibernate_ignores_commands() {
        let mut sim = SimulatedMount::with_seed(1);
        assert_eq!(exchange(&mut sim, b"x#"), b"#");
        assert!(exchange(&mut sim, b"Kx").is_empty());
        assert_eq!(exchange(&mut sim, b"y#"), b"#");
        assert_eq!(exchange(&mut sim, b"Kx"), b"x#");
    }
}
