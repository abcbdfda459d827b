//! Mount session
//!
//! High-level mount operations built on the request/response engine. Most
//! operations are a single exchange; the gotos additionally poll the mount
//! until it stops slewing and then check where it ended up.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    CancelToken, ControllerVariant, FirmwareInfo, FirmwareVersion, ModelCatalog, MountModel,
    SlewPolicy,
};
use crate::coords::{self, Equatorial, Horizontal};
use crate::protocol::{
    Command, Connection, ConnectionConfig, ConnectionState, Device, Direction, Frame,
    FrameBuilder, PassthroughCommand, ProtocolError, Response, SlewRate, TrackMode, Transport,
};

/// Guiding pulse rate limit, in percent of sidereal
pub const MAX_PULSE_RATE: i8 = 100;

/// Command bytes for hibernate and wake-up; they carry their own terminator
const HIBERNATE: &[u8] = b"x#";
const WAKEUP: &[u8] = b"y#";

fn check_finite(what: &str, value: f64) -> Result<(), ProtocolError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ProtocolError::InvalidArgument(format!(
            "{} must be finite, got {}",
            what, value
        )))
    }
}

/// A telescope mount behind a NexStar/StarSense hand controller
pub struct Mount {
    conn: Connection,
    catalog: ModelCatalog,
    slew_policy: SlewPolicy,
}

impl Mount {
    /// Create a mount using the built-in model catalog
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_catalog(config, ModelCatalog::builtin())
    }

    /// Create a mount with a caller-supplied model catalog
    pub fn with_catalog(config: ConnectionConfig, catalog: ModelCatalog) -> Self {
        Self {
            conn: Connection::new(config),
            catalog,
            slew_policy: SlewPolicy::default(),
        }
    }

    /// Replace the policy used by blocking gotos
    pub fn set_slew_policy(&mut self, policy: SlewPolicy) {
        self.slew_policy = policy;
    }

    /// Policy used by blocking gotos
    pub fn slew_policy(&self) -> &SlewPolicy {
        &self.slew_policy
    }

    /// Catalog used to name the mount
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// The underlying request/response engine
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Mutable access to the engine, for raw exchanges
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    /// Whether a transport is attached and answered the echo check
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Open the configured serial port and check the mount answers
    pub fn connect(&mut self) -> Result<(), ProtocolError> {
        self.conn.connect()
    }

    /// Use an already-open transport (TCP bridge, simulator)
    pub fn connect_with(&mut self, transport: Box<dyn Transport>) -> Result<(), ProtocolError> {
        self.conn.connect_with(transport)
    }

    /// Close the transport
    pub fn disconnect(&mut self) {
        self.conn.disconnect();
    }

    fn send(&mut self, frame: &Frame) -> Result<Response, ProtocolError> {
        if !self.conn.is_connected() {
            return Err(ProtocolError::NotConnected);
        }
        self.conn.send(frame)
    }

    fn send_command(&mut self, command: Command) -> Result<Response, ProtocolError> {
        self.send(&Frame::direct(command, &[]))
    }

    fn passthrough(
        &mut self,
        device: Device,
        command: PassthroughCommand,
        payload: &[u8],
        reply_len: u8,
    ) -> Result<Response, ProtocolError> {
        let frame = Frame::passthrough(device, command, payload, reply_len)?;
        self.send(&frame)
    }

    /// Whether the hand controller has completed its star alignment
    pub fn check_aligned(&mut self) -> Result<bool, ProtocolError> {
        let response = self.send_command(Command::GetAlignment)?;
        Ok(response.first() == Some(0x01))
    }

    /// Whether a goto is in progress
    pub fn is_slewing(&mut self) -> Result<bool, ProtocolError> {
        let response = self.send_command(Command::IsSlewing)?;
        Ok(response.first() != Some(b'0'))
    }

    /// Put the hand controller into hibernation
    pub fn hibernate(&mut self) -> Result<(), ProtocolError> {
        self.send(&Frame::raw(HIBERNATE.to_vec(), 1))?;
        Ok(())
    }

    /// Wake the hand controller from hibernation
    pub fn wakeup(&mut self) -> Result<(), ProtocolError> {
        self.send(&Frame::raw(WAKEUP.to_vec(), 1))?;
        Ok(())
    }

    /// Hand controller firmware version
    pub fn get_version(&mut self) -> Result<FirmwareVersion, ProtocolError> {
        let response = self.send_command(Command::GetVersion)?;
        let version = FirmwareVersion::new(
            response.byte(0, "version")?,
            response.byte(1, "version")?,
        );
        debug!(%version, "Controller version");
        Ok(version)
    }

    /// Hand controller family
    pub fn get_variant(&mut self) -> Result<ControllerVariant, ProtocolError> {
        let response = self.send_command(Command::GetVariant)?;
        Ok(ControllerVariant::from_wire(response.byte(0, "variant")?))
    }

    /// Mount model, resolved through the session's catalog
    pub fn get_model(&mut self) -> Result<MountModel, ProtocolError> {
        let response = self.send_command(Command::GetModel)?;
        let model = self.catalog.lookup(u32::from(response.byte(0, "model")?));
        if model.is_known() {
            debug!(model = %model.name, "Mount model");
        } else {
            warn!(id = model.id, "Unrecognized mount model");
        }
        Ok(model)
    }

    /// Firmware version of one motor controller
    pub fn get_device_firmware(&mut self, device: Device) -> Result<FirmwareVersion, ProtocolError> {
        let response = self.passthrough(device, PassthroughCommand::GetFirmware, &[], 2)?;
        Ok(FirmwareVersion::new(
            response.byte(0, "firmware")?,
            response.byte(1, "firmware")?,
        ))
    }

    /// Discover controller, model and motor firmware.
    ///
    /// The model is only queried when the controller is new enough to
    /// support it. Any failing step fails the whole sequence.
    pub fn firmware_info(&mut self) -> Result<FirmwareInfo, ProtocolError> {
        let controller = self.get_version()?;
        let variant = self.get_variant()?;

        let model = if variant.supports_model_query(controller) {
            Some(self.get_model()?)
        } else {
            debug!(%controller, "Controller too old for the model query");
            None
        };

        let ra_motor = self.get_device_firmware(Device::RaMotor)?;
        let dec_motor = self.get_device_firmware(Device::DecMotor)?;

        let info = FirmwareInfo {
            controller,
            variant,
            model,
            ra_motor,
            dec_motor,
        };
        info!("Firmware Info {}", info);
        Ok(info)
    }

    /// Set the observing site.
    ///
    /// Longitudes above 180 are taken as east-positive 0..360 and folded into
    /// -180..180.
    pub fn set_location(&mut self, longitude: f64, latitude: f64) -> Result<(), ProtocolError> {
        check_finite("longitude", longitude)?;
        check_finite("latitude", latitude)?;

        let longitude = if longitude > 180.0 {
            longitude - 360.0
        } else {
            longitude
        };
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ProtocolError::InvalidArgument(format!(
                "longitude {} out of range",
                longitude
            )));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ProtocolError::InvalidArgument(format!(
                "latitude {} out of range",
                latitude
            )));
        }

        info!("Setting location ({:.3},{:.3})", longitude, latitude);

        let lat = coords::sexagesimal(latitude);
        let lon = coords::sexagesimal(longitude);
        // Range checks above keep the degrees within a byte
        let frame = FrameBuilder::new(Command::SetLocation)
            .bytes(&[lat.degrees as u8, lat.minutes, lat.seconds, lat.sign_byte()])
            .bytes(&[lon.degrees as u8, lon.minutes, lon.seconds, lon.sign_byte()])
            .build();
        self.send(&frame)?;
        Ok(())
    }

    /// Set the hand controller clock.
    ///
    /// The controller keeps local standard time, so `utc` is shifted by
    /// `utc_offset_hours` before sending.
    pub fn set_datetime(
        &mut self,
        utc: DateTime<Utc>,
        utc_offset_hours: i8,
    ) -> Result<(), ProtocolError> {
        if !(-12..=14).contains(&utc_offset_hours) {
            return Err(ProtocolError::InvalidArgument(format!(
                "UTC offset {} out of range",
                utc_offset_hours
            )));
        }
        let offset = FixedOffset::east_opt(i32::from(utc_offset_hours) * 3600).ok_or_else(|| {
            ProtocolError::InvalidArgument(format!("bad UTC offset {}", utc_offset_hours))
        })?;
        let local = utc.with_timezone(&offset);

        let year = u8::try_from(local.year() - 2000).map_err(|_| {
            ProtocolError::InvalidArgument(format!("year {} out of range", local.year()))
        })?;

        let frame = FrameBuilder::new(Command::SetDateTime)
            .bytes(&[
                local.hour() as u8,
                local.minute() as u8,
                local.second() as u8,
                local.month() as u8,
                local.day() as u8,
                year,
                // Negative offsets travel as 256 - |offset|
                utc_offset_hours as u8,
                // Always standard time
                0,
            ])
            .build();
        self.send(&frame)?;
        Ok(())
    }

    fn read_fixed32_pair(&mut self, command: Command) -> Result<(u32, u32), ProtocolError> {
        let response = self.send_command(command)?;
        coords::parse_fixed32_pair(&response.text())
    }

    /// Current RA (hours) and DEC (degrees, ±90)
    pub fn get_ra_dec(&mut self) -> Result<Equatorial, ProtocolError> {
        let (ra, dec) = self.read_fixed32_pair(Command::GetRaDec)?;
        Ok(Equatorial::from_fixed32(ra, dec))
    }

    /// Current azimuth and altitude in degrees
    pub fn get_az_alt(&mut self) -> Result<Horizontal, ProtocolError> {
        let (az, alt) = self.read_fixed32_pair(Command::GetAzAlt)?;
        Ok(Horizontal::from_fixed32(az, alt))
    }

    fn send_pair(&mut self, command: Command, pair: (u32, u32)) -> Result<(), ProtocolError> {
        let frame = FrameBuilder::new(command).hex_pair(pair.0, pair.1).build();
        self.send(&frame)?;
        Ok(())
    }

    /// Start a slew to RA (hours) / DEC (degrees) without waiting
    pub fn slew_ra_dec(&mut self, ra_hours: f64, dec: f64) -> Result<(), ProtocolError> {
        check_finite("RA", ra_hours)?;
        check_finite("DEC", dec)?;
        self.send_pair(Command::SlewRaDec, Equatorial::new(ra_hours, dec).to_fixed32())
    }

    /// Start a slew to azimuth / altitude without waiting
    pub fn slew_az_alt(&mut self, az: f64, alt: f64) -> Result<(), ProtocolError> {
        check_finite("azimuth", az)?;
        check_finite("altitude", alt)?;
        self.send_pair(Command::SlewAzAlt, Horizontal::new(az, alt).to_fixed32())
    }

    /// Tell the mount it is pointing at RA (hours) / DEC (degrees)
    pub fn sync(&mut self, ra_hours: f64, dec: f64) -> Result<(), ProtocolError> {
        check_finite("RA", ra_hours)?;
        check_finite("DEC", dec)?;
        self.send_pair(Command::Sync, Equatorial::new(ra_hours, dec).to_fixed32())
    }

    /// Slew to RA / DEC and wait until the mount stops.
    ///
    /// Returns `Ok(true)` when the final reported position equals the
    /// commanded one on the wire, `Ok(false)` when the mount stopped
    /// elsewhere (for instance after an abort).
    pub fn goto_ra_dec(&mut self, ra_hours: f64, dec: f64) -> Result<bool, ProtocolError> {
        self.goto_ra_dec_cancellable(ra_hours, dec, &CancelToken::new())
    }

    /// [`Mount::goto_ra_dec`] that stops, and aborts the slew, once `cancel` fires
    pub fn goto_ra_dec_cancellable(
        &mut self,
        ra_hours: f64,
        dec: f64,
        cancel: &CancelToken,
    ) -> Result<bool, ProtocolError> {
        check_finite("RA", ra_hours)?;
        check_finite("DEC", dec)?;
        info!("Goto RA {:.6}h DEC {:.6}", ra_hours, dec);
        let target = Equatorial::new(ra_hours, dec).to_fixed32();
        self.goto(Command::SlewRaDec, Command::GetRaDec, target, cancel)
    }

    /// Slew to azimuth / altitude and wait until the mount stops
    pub fn goto_az_alt(&mut self, az: f64, alt: f64) -> Result<bool, ProtocolError> {
        self.goto_az_alt_cancellable(az, alt, &CancelToken::new())
    }

    /// [`Mount::goto_az_alt`] that stops, and aborts the slew, once `cancel` fires
    pub fn goto_az_alt_cancellable(
        &mut self,
        az: f64,
        alt: f64,
        cancel: &CancelToken,
    ) -> Result<bool, ProtocolError> {
        check_finite("azimuth", az)?;
        check_finite("altitude", alt)?;
        info!("Goto Az {:.6} Alt {:.6}", az, alt);
        let target = Horizontal::new(az, alt).to_fixed32();
        self.goto(Command::SlewAzAlt, Command::GetAzAlt, target, cancel)
    }

    fn goto(
        &mut self,
        slew: Command,
        read: Command,
        target: (u32, u32),
        cancel: &CancelToken,
    ) -> Result<bool, ProtocolError> {
        self.send_pair(slew, target)?;
        self.wait_for_slew(cancel)?;

        let reached = self.read_fixed32_pair(read)?;
        if reached == target {
            info!("Goto complete");
            Ok(true)
        } else {
            warn!(
                "Goto ended off target: {:08X},{:08X} vs {:08X},{:08X}",
                reached.0, reached.1, target.0, target.1
            );
            Ok(false)
        }
    }

    /// Poll `L` until the mount stops, within the session's slew policy
    fn wait_for_slew(&mut self, cancel: &CancelToken) -> Result<(), ProtocolError> {
        let interval = self.slew_policy.poll_interval();
        let max_duration = self.slew_policy.max_duration();
        let start = Instant::now();
        let mut polls: u64 = 0;

        while self.is_slewing()? {
            polls += 1;

            if cancel.is_cancelled() {
                warn!(polls, "Goto cancelled, aborting slew");
                self.abort()?;
                return Err(ProtocolError::SlewCancelled);
            }
            if let Some(limit) = max_duration {
                if start.elapsed() >= limit {
                    warn!(polls, "Goto still slewing after {:?}, aborting", limit);
                    self.abort()?;
                    return Err(ProtocolError::SlewTimeout(limit));
                }
            }

            std::thread::sleep(interval);
        }

        debug!(polls, elapsed = ?start.elapsed(), "Slew finished");
        Ok(())
    }

    /// Stop any goto in progress
    pub fn abort(&mut self) -> Result<(), ProtocolError> {
        self.send_command(Command::Abort)?;
        Ok(())
    }

    /// Start moving in `direction` at a fixed rate until stopped
    pub fn move_axis(&mut self, direction: Direction, rate: SlewRate) -> Result<(), ProtocolError> {
        debug!(?direction, ?rate, "Move");
        self.passthrough(
            direction.device(),
            direction.move_command(),
            &[rate.to_wire()],
            0,
        )?;
        Ok(())
    }

    /// Stop the motor that moves in `direction`
    pub fn stop_axis(&mut self, direction: Direction) -> Result<(), ProtocolError> {
        debug!(?direction, "Stop");
        self.passthrough(
            direction.device(),
            PassthroughCommand::MovePositive,
            &[0],
            0,
        )?;
        Ok(())
    }

    /// Current tracking mode
    pub fn get_track_mode(&mut self) -> Result<TrackMode, ProtocolError> {
        let response = self.send_command(Command::GetTrackMode)?;
        let byte = response.byte(0, "track mode")?;
        TrackMode::from_wire(byte)
            .ok_or_else(|| ProtocolError::MalformedResponse(format!("track mode {}", byte)))
    }

    /// Change the tracking mode
    pub fn set_track_mode(&mut self, mode: TrackMode) -> Result<(), ProtocolError> {
        self.send(&Frame::direct(Command::SetTrackMode, &[mode.to_wire()]))?;
        Ok(())
    }

    /// Send a guiding pulse.
    ///
    /// `rate` is the pulse velocity in percent of sidereal (-100..=100) and
    /// `duration` is rounded down to centiseconds, at most 2.55 s.
    pub fn send_pulse(
        &mut self,
        direction: Direction,
        rate: i8,
        duration: Duration,
    ) -> Result<(), ProtocolError> {
        if !(-MAX_PULSE_RATE..=MAX_PULSE_RATE).contains(&rate) {
            return Err(ProtocolError::InvalidArgument(format!(
                "pulse rate {} outside ±{}",
                rate, MAX_PULSE_RATE
            )));
        }
        let csec = u8::try_from(duration.as_millis() / 10).map_err(|_| {
            ProtocolError::InvalidArgument(format!("pulse of {:?} exceeds 2.55 s", duration))
        })?;

        let signed = if direction.is_positive() { rate } else { -rate };
        self.passthrough(
            direction.device(),
            PassthroughCommand::PulseGuide,
            &[signed as u8, csec],
            0,
        )?;
        Ok(())
    }

    /// Whether the motor for `direction` is still executing a pulse
    pub fn get_pulse_status(&mut self, direction: Direction) -> Result<bool, ProtocolError> {
        let response = self.passthrough(
            direction.device(),
            PassthroughCommand::PulseStatus,
            &[0, 0],
            1,
        )?;
        Ok(response.byte(0, "pulse status")? != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ScriptedTransport, SentFrames};
    use pretty_assertions::assert_eq;

    fn mount_with(replies: &[&[u8]]) -> (Mount, SentFrames) {
        let mut script: Vec<&[u8]> = vec![b"x#"];
        script.extend_from_slice(replies);
        let (transport, sent) = ScriptedTransport::new(&script);
        let mut mount = Mount::new(ConnectionConfig::default());
        mount.set_slew_policy(SlewPolicy {
            poll_interval_ms: 1,
            max_duration_ms: Some(5_000),
        });
        mount.connect_with(Box::new(transport)).unwrap();
        (mount, sent)
    }

    fn last_frame(sent: &SentFrames) -> Vec<u8> {
        sent.frames().last().cloned().unwrap_or_default()
    }

    #[test]
    fn test_not_connected() {
        let mut mount = Mount::new(ConnectionConfig::default());
        assert!(matches!(mount.is_slewing(), Err(ProtocolError::NotConnected)));
    }

    #[test]
    fn test_alignment() {
        let (mut mount, _) = mount_with(&[&[0x01, b'#'], &[0x00, b'#']]);
        assert!(mount.check_aligned().unwrap());
        assert!(!mount.check_aligned().unwrap());
    }

    #[test]
    fn test_slew_frame() {
        let (mut mount, sent) = mount_with(&[b"#"]);
        mount.slew_ra_dec(12.0, -90.0).unwrap();
        assert_eq!(last_frame(&sent), b"r80000000,C0000000".to_vec());
    }

    #[test]
    fn test_sync_frame() {
        let (mut mount, sent) = mount_with(&[b"#"]);
        mount.sync(6.0, 45.0).unwrap();
        assert_eq!(last_frame(&sent), b"s40000000,20000000".to_vec());
    }

    #[test]
    fn test_rejects_nan_target() {
        let (mut mount, sent) = mount_with(&[]);
        assert!(matches!(
            mount.slew_az_alt(f64::NAN, 10.0),
            Err(ProtocolError::InvalidArgument(_))
        ));
        assert_eq!(sent.frames().len(), 1);
    }

    #[test]
    fn test_get_ra_dec_trims_declination() {
        let (mut mount, _) = mount_with(&[b"80000000,E0000000#"]);
        let pos = mount.get_ra_dec().unwrap();
        assert_eq!(pos.ra_hours, 12.0);
        assert_eq!(pos.dec_degrees, -45.0);
    }

    #[test]
    fn test_goto_reaches_target() {
        let (mut mount, sent) =
            mount_with(&[b"#", b"1#", b"1#", b"0#", b"80000000,20000000#"]);
        assert!(mount.goto_ra_dec(12.0, 45.0).unwrap());
        let frames = sent.frames();
        assert_eq!(frames[1], b"r80000000,20000000".to_vec());
        assert_eq!(&frames[2..5], &[b"L".to_vec(), b"L".to_vec(), b"L".to_vec()]);
        assert_eq!(frames[5], b"e".to_vec());
    }

    #[test]
    fn test_goto_off_target() {
        let (mut mount, _) = mount_with(&[b"#", b"1#", b"1#", b"0#", b"80000000,20000001#"]);
        assert!(!mount.goto_ra_dec(12.0, 45.0).unwrap());
    }

    #[test]
    fn test_goto_az_alt() {
        let (mut mount, sent) = mount_with(&[b"#", b"0#", b"40000000,10000000#"]);
        assert!(mount.goto_az_alt(90.0, 22.5).unwrap());
        assert_eq!(sent.frames()[1], b"b40000000,10000000".to_vec());
        assert_eq!(last_frame(&sent), b"z".to_vec());
    }

    #[test]
    fn test_goto_cancelled_sends_abort() {
        let (mut mount, sent) = mount_with(&[b"#", b"1#", b"#"]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = mount.goto_az_alt_cancellable(10.0, 10.0, &cancel);
        assert!(matches!(result, Err(ProtocolError::SlewCancelled)));
        assert_eq!(last_frame(&sent), b"M".to_vec());
    }

    #[test]
    fn test_goto_times_out_and_aborts() {
        let (mut mount, sent) = mount_with(&[b"#", b"1#", b"#"]);
        mount.set_slew_policy(SlewPolicy {
            poll_interval_ms: 1,
            max_duration_ms: Some(0),
        });
        let result = mount.goto_ra_dec(1.0, 1.0);
        assert!(matches!(result, Err(ProtocolError::SlewTimeout(_))));
        assert_eq!(last_frame(&sent), b"M".to_vec());
    }

    #[test]
    fn test_set_location() {
        let (mut mount, sent) = mount_with(&[b"#"]);
        // 2.5 W given as east-positive 357.5
        mount.set_location(357.5, -33.5).unwrap();
        assert_eq!(
            last_frame(&sent),
            vec![b'W', 33, 30, 0, 1, 2, 30, 0, 1]
        );
    }

    #[test]
    fn test_set_location_rejects_bad_latitude() {
        let (mut mount, _) = mount_with(&[]);
        assert!(mount.set_location(10.0, 91.0).is_err());
    }

    #[test]
    fn test_set_datetime() {
        let (mut mount, sent) = mount_with(&[b"#"]);
        let utc = DateTime::parse_from_rfc3339("2024-03-01T02:30:15Z")
            .unwrap()
            .with_timezone(&Utc);
        mount.set_datetime(utc, -5).unwrap();
        // Local time is the previous evening
        assert_eq!(
            last_frame(&sent),
            vec![b'H', 21, 30, 15, 2, 29, 24, 251, 0]
        );
    }

    #[test]
    fn test_track_mode() {
        let (mut mount, sent) = mount_with(&[&[2, b'#'], b"#", &[9, b'#']]);
        assert_eq!(mount.get_track_mode().unwrap(), TrackMode::EquatorialNorth);
        mount.set_track_mode(TrackMode::AltAz).unwrap();
        assert_eq!(last_frame(&sent), vec![b'T', 1]);
        assert!(matches!(
            mount.get_track_mode(),
            Err(ProtocolError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_move_and_stop() {
        let (mut mount, sent) = mount_with(&[b"#", b"#"]);
        mount.move_axis(Direction::East, SlewRate::Max).unwrap();
        assert_eq!(last_frame(&sent), vec![0x50, 2, 0x10, 0x25, 9, 0, 0, 0]);
        mount.stop_axis(Direction::North).unwrap();
        assert_eq!(last_frame(&sent), vec![0x50, 2, 0x11, 0x24, 0, 0, 0, 0]);
    }

    #[test]
    fn test_pulse_guide() {
        let (mut mount, sent) = mount_with(&[b"#", &[1, b'#']]);
        mount
            .send_pulse(Direction::South, 50, Duration::from_millis(500))
            .unwrap();
        assert_eq!(
            last_frame(&sent),
            vec![0x50, 3, 0x11, 0x26, (-50i8) as u8, 50, 0, 0]
        );
        assert!(mount.get_pulse_status(Direction::South).unwrap());
        assert_eq!(last_frame(&sent), vec![0x50, 3, 0x11, 0x27, 0, 0, 0, 1]);
    }

    #[test]
    fn test_pulse_limits() {
        let (mut mount, _) = mount_with(&[]);
        assert!(mount
            .send_pulse(Direction::North, 101, Duration::from_millis(10))
            .is_err());
        assert!(mount
            .send_pulse(Direction::North, 10, Duration::from_secs(3))
            .is_err());
    }

    #[test]
    fn test_firmware_discovery() {
        let (mut mount, sent) = mount_with(&[
            &[4, 21, b'#'],
            &[0x11, b'#'],
            &[20, b'#'],
            &[7, 11, b'#'],
            &[7, 12, b'#'],
        ]);
        let info = mount.firmware_info().unwrap();
        assert_eq!(info.controller, FirmwareVersion::new(4, 21));
        assert_eq!(info.model.as_ref().map(|m| m.name.as_str()), Some("AVX"));
        assert!(info.is_gem());
        assert_eq!(info.dec_motor, FirmwareVersion::new(7, 12));
        assert_eq!(sent.frames()[4], vec![0x50, 1, 0x10, 0xFE, 0, 0, 0, 2]);
    }

    #[test]
    fn test_firmware_discovery_skips_model_on_old_controller() {
        let (mut mount, sent) = mount_with(&[
            &[1, 6, b'#'],
            &[0x11, b'#'],
            &[5, 3, b'#'],
            &[5, 3, b'#'],
        ]);
        let info = mount.firmware_info().unwrap();
        assert_eq!(info.model, None);
        assert_eq!(sent.frames()[3][3], 0xFE);
    }

    #[test]
    fn test_firmware_discovery_fails_on_any_step() {
        // DEC motor never answers
        let (mut mount, _) = mount_with(&[
            &[4, 21, b'#'],
            &[0x11, b'#'],
            &[20, b'#'],
            &[7, 11, b'#'],
        ]);
        let result = mount.firmware_info();
        assert!(matches!(result, Err(ProtocolError::Timeout { .. })));
    }

    #[test]
    fn test_hibernate_and_wakeup() {
        let (mut mount, sent) = mount_with(&[b"#", b"#"]);
        mount.hibernate().unwrap();
        mount.wakeup().unwrap();
        let frames = sent.frames();
        assert_eq!(frames[1], b"x#".to_vec());
        assert_eq!(frames[2], b"y#".to_vec());
    }
}
