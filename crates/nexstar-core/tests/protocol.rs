//! Wire-level tests through the public protocol API

use nexstar_core::coords::{self, degrees_to_fixed32, sexagesimal, Equatorial};
use nexstar_core::protocol::{
    Command, Connection, ConnectionConfig, Device, Frame, FrameBuilder, PassthroughCommand,
    ProtocolError, ScriptedTransport, MAX_PASSTHROUGH_PAYLOAD,
};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn connected(replies: &[&[u8]]) -> (Connection, nexstar_core::protocol::SentFrames) {
    let mut script: Vec<&[u8]> = vec![b"x#"];
    script.extend_from_slice(replies);
    let (transport, sent) = ScriptedTransport::new(&script);
    let mut conn = Connection::new(ConnectionConfig::default());
    conn.connect_with(Box::new(transport)).unwrap();
    (conn, sent)
}

#[test]
fn test_firmware_passthrough_envelope() {
    let frame = Frame::passthrough(Device::DecMotor, PassthroughCommand::GetFirmware, &[], 2)
        .unwrap();
    assert_eq!(
        frame.as_bytes(),
        &[0x50, 0x01, 0x11, 0xFE, 0x00, 0x00, 0x00, 0x02]
    );
    assert_eq!(frame.reply_len(), 3);
}

#[test]
fn test_passthrough_payload_limit() {
    let payload = [1u8; MAX_PASSTHROUGH_PAYLOAD + 1];
    let err = Frame::passthrough(Device::RaMotor, PassthroughCommand::PulseGuide, &payload, 0)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::PayloadTooLong(4)));
}

#[test]
fn test_goto_frame_text() {
    let (ra, dec) = Equatorial::new(12.0, 45.0).to_fixed32();
    let frame = FrameBuilder::new(Command::SlewRaDec).hex_pair(ra, dec).build();
    assert_eq!(frame.as_bytes(), b"r80000000,20000000");
    assert_eq!(frame.reply_len(), 1);
}

#[test]
fn test_execute_exact_length() {
    let (mut conn, sent) = connected(&[b"0#"]);
    let response = conn
        .execute(b"L", 2, Duration::from_millis(100))
        .unwrap();
    assert_eq!(response.as_bytes(), b"0#");
    assert_eq!(response.payload(), b"0");
    assert_eq!(sent.frames().last().unwrap(), &b"L".to_vec());
}

#[test]
fn test_execute_short_reply_times_out() {
    let (mut conn, _) = connected(&[b"12345678,"]);
    let err = conn
        .execute(b"e", 18, Duration::from_millis(10))
        .unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::Timeout {
            expected: 18,
            received: 9
        }
    ));
}

#[test]
fn test_fixed32_scenarios() {
    assert_eq!(degrees_to_fixed32(0.0), 0);
    assert_eq!(degrees_to_fixed32(90.0), 0x4000_0000);
    assert_eq!(degrees_to_fixed32(-90.0), 0xC000_0000);
    assert_eq!(degrees_to_fixed32(360.0), 0);
    assert_eq!(degrees_to_fixed32(720.0 + 180.0), 0x8000_0000);
}

#[test]
fn test_parse_position_reply() {
    let (ra, dec) = coords::parse_coord_pair("34AB0500,12CE0500#").unwrap();
    assert!((ra - 74.064).abs() < 0.001);
    assert!((dec - 26.444).abs() < 0.001);
    assert!(coords::parse_coord_pair("34AB0500").is_err());
}

#[test]
fn test_sexagesimal_location_bytes() {
    let lat = sexagesimal(37.75);
    assert_eq!((lat.degrees, lat.minutes, lat.seconds, lat.sign_byte()), (37, 45, 0, 0));
    let lon = sexagesimal(-122.5);
    assert_eq!((lon.degrees, lon.minutes, lon.seconds, lon.sign_byte()), (122, 30, 0, 1));
}
