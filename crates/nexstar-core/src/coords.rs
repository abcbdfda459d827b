//! Coordinate encoding
//!
//! The hand controller transmits angles as an unsigned 32-bit fraction of a
//! full circle ("fixed32"): `0x00000000` is 0°, `0x80000000` is 180°, and
//! `0xFFFFFFFF` is just short of 360°. Right ascension travels as degrees too,
//! so hours are scaled by 15 before encoding and after decoding.
//!
//! Location commands use sexagesimal components (degree, minute, second)
//! with a separate sign byte instead.

use serde::{Deserialize, Serialize};

use crate::protocol::ProtocolError;

/// 2^32, the number of fixed32 steps in a full circle
const FULL_CIRCLE: f64 = 4_294_967_296.0;

/// Degrees per hour of right ascension
pub const DEGREES_PER_HOUR: f64 = 15.0;

/// Smallest angle the wire format can represent
pub const FIXED32_STEP: f64 = 360.0 / FULL_CIRCLE;

/// Normalize an angle into [0, 360)
pub fn normalize_degrees(angle: f64) -> f64 {
    let mut a = angle - 360.0 * (angle / 360.0).floor();
    // floor() of a tiny negative quotient can leave -0.0 or a negative residue
    if a < 0.0 {
        a += 360.0;
    }
    if a >= 360.0 {
        a -= 360.0;
    }
    a
}

/// Convert decimal degrees to a fixed32 fraction of a circle, truncating
pub fn degrees_to_fixed32(angle: f64) -> u32 {
    let scaled = normalize_degrees(angle) * FULL_CIRCLE / 360.0;
    if scaled >= FULL_CIRCLE {
        // Values a hair below 360 can round up to a full turn
        0
    } else {
        scaled as u32
    }
}

/// Convert a fixed32 fraction of a circle back to decimal degrees
pub fn fixed32_to_degrees(value: u32) -> f64 {
    360.0 * (f64::from(value) / FULL_CIRCLE)
}

/// Parse a `XXXXXXXX,YYYYYYYY#` reply into its two raw fixed32 values
pub fn parse_fixed32_pair(text: &str) -> Result<(u32, u32), ProtocolError> {
    let body = text
        .trim_end_matches('\0')
        .strip_suffix('#')
        .ok_or_else(|| ProtocolError::MalformedResponse(format!("missing '#': {:?}", text)))?;

    let (first, second) = body
        .split_once(',')
        .ok_or_else(|| ProtocolError::MalformedResponse(format!("missing ',': {:?}", text)))?;

    let parse = |field: &str| {
        // from_str_radix alone would accept a leading '+'
        if field.len() != 8 || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ProtocolError::MalformedResponse(format!(
                "bad coordinate field {:?}",
                field
            )));
        }
        u32::from_str_radix(field, 16).map_err(|e| {
            ProtocolError::MalformedResponse(format!("bad coordinate field {:?}: {}", field, e))
        })
    };

    Ok((parse(first)?, parse(second)?))
}

/// Parse a `XXXXXXXX,YYYYYYYY#` reply into two angles in degrees
pub fn parse_coord_pair(text: &str) -> Result<(f64, f64), ProtocolError> {
    let (a, b) = parse_fixed32_pair(text)?;
    Ok((fixed32_to_degrees(a), fixed32_to_degrees(b)))
}

/// Fold a full-circle declination into the conventional ±90° range.
///
/// The mount reports declination as a position on the whole axis circle, so
/// past the pole (90°) the value keeps growing. This maps (90, 270] back down
/// through the pole as `180 - a`, and (270, 360) to the negative side as
/// `a - 360`. It is specific to the declination axis and is not a general
/// angle normalization.
pub fn trim_declination(angle: f64) -> f64 {
    let a = normalize_degrees(angle);
    if a > 90.0 && a <= 270.0 {
        180.0 - a
    } else if a > 270.0 && a <= 360.0 {
        a - 360.0
    } else {
        a
    }
}

/// Degree/minute/second split of an angle, with the sign carried separately
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sexagesimal {
    /// South or West
    pub negative: bool,
    /// Whole degrees
    pub degrees: u32,
    /// Arc minutes, 0..60
    pub minutes: u8,
    /// Arc seconds, 0..60
    pub seconds: u8,
}

impl Sexagesimal {
    /// Rebuild the decimal angle
    pub fn to_degrees(&self) -> f64 {
        let magnitude = f64::from(self.degrees)
            + f64::from(self.minutes) / 60.0
            + f64::from(self.seconds) / 3600.0;
        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Sign byte used by the location command: 0 = N/E, 1 = S/W
    pub fn sign_byte(&self) -> u8 {
        u8::from(self.negative)
    }
}

/// Split decimal degrees into whole degrees, minutes and rounded seconds.
///
/// Seconds round half-to-even. A result of 60 seconds carries into the
/// minutes, and 60 minutes carry into the degrees, so neither field ever
/// reaches 60.
pub fn sexagesimal(value: f64) -> Sexagesimal {
    let abs = value.abs();
    let mut degrees = abs.trunc() as u32;
    let minutes_f = (abs - f64::from(degrees)) * 60.0;
    let mut minutes = minutes_f.trunc() as u32;
    let mut seconds = ((minutes_f - f64::from(minutes)) * 60.0).round_ties_even() as u32;

    if seconds >= 60 {
        seconds = 0;
        minutes += 1;
    }
    if minutes >= 60 {
        minutes = 0;
        degrees += 1;
    }

    Sexagesimal {
        negative: value < 0.0,
        degrees,
        minutes: minutes as u8,
        seconds: seconds as u8,
    }
}

/// Equatorial position: right ascension in hours, declination in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Equatorial {
    /// Right ascension, hours
    pub ra_hours: f64,
    /// Declination, degrees
    pub dec_degrees: f64,
}

impl Equatorial {
    /// Position from RA in hours and DEC in degrees
    pub fn new(ra_hours: f64, dec_degrees: f64) -> Self {
        Self {
            ra_hours,
            dec_degrees,
        }
    }

    /// Wire encoding: RA scaled to degrees, both as fixed32
    pub fn to_fixed32(&self) -> (u32, u32) {
        (
            degrees_to_fixed32(self.ra_hours * DEGREES_PER_HOUR),
            degrees_to_fixed32(self.dec_degrees),
        )
    }

    /// Decode a raw `e` reply pair
    pub fn from_fixed32(ra: u32, dec: u32) -> Self {
        Self {
            ra_hours: fixed32_to_degrees(ra) / DEGREES_PER_HOUR,
            dec_degrees: trim_declination(fixed32_to_degrees(dec)),
        }
    }
}

/// Horizontal position: azimuth and altitude in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Horizontal {
    /// Azimuth, degrees
    pub azimuth: f64,
    /// Altitude, degrees
    pub altitude: f64,
}

impl Horizontal {
    /// Position from azimuth and altitude in degrees
    pub fn new(azimuth: f64, altitude: f64) -> Self {
        Self { azimuth, altitude }
    }

    /// Wire values for a slew
    pub fn to_fixed32(&self) -> (u32, u32) {
        (
            degrees_to_fixed32(self.azimuth),
            degrees_to_fixed32(self.altitude),
        )
    }

    /// Decode a `z` reply
    pub fn from_fixed32(az: u32, alt: u32) -> Self {
        Self {
            azimuth: fixed32_to_degrees(az),
            altitude: fixed32_to_degrees(alt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed32_scenarios() {
        assert_eq!(degrees_to_fixed32(0.0), 0x0000_0000);
        assert_eq!(degrees_to_fixed32(180.0), 0x8000_0000);
        assert_eq!(degrees_to_fixed32(90.0), 0x4000_0000);
        assert_eq!(degrees_to_fixed32(-90.0), degrees_to_fixed32(270.0));
        assert_eq!(degrees_to_fixed32(360.0), 0);
        assert_eq!(degrees_to_fixed32(-0.0), 0);
    }

    #[test]
    fn test_tiny_negative_wraps_to_zero() {
        // -1e-20 normalizes to exactly 360.0 in f64
        assert_eq!(degrees_to_fixed32(-1e-20), 0);
    }

    #[test]
    fn test_fixed32_roundtrip_within_one_step() {
        for &x in &[0.0, 1.5, 45.123456, 179.999, 359.9999, -12.5, 725.25, -1000.75] {
            let decoded = fixed32_to_degrees(degrees_to_fixed32(x));
            let expected = normalize_degrees(x);
            assert!(
                (decoded - expected).abs() <= FIXED32_STEP,
                "x = {}, decoded = {}, expected = {}",
                x,
                decoded,
                expected
            );
        }
    }

    #[test]
    fn test_parse_coord_pair() {
        let (a, b) = parse_coord_pair("12345678,9ABCDEF0#").unwrap();
        assert_eq!(a, fixed32_to_degrees(0x1234_5678));
        assert_eq!(b, fixed32_to_degrees(0x9ABC_DEF0));
    }

    #[test]
    fn test_parse_coord_pair_lowercase() {
        let raw = parse_fixed32_pair("80000000,c0000000#").unwrap();
        assert_eq!(raw, (0x8000_0000, 0xC000_0000));
    }

    #[test]
    fn test_parse_coord_pair_rejects_garbage() {
        assert!(parse_coord_pair("12345678,9ABCDEF0").is_err());
        assert!(parse_coord_pair("123456789ABCDEF0#").is_err());
        assert!(parse_coord_pair("1234567G,9ABCDEF0#").is_err());
        assert!(parse_coord_pair(",9ABCDEF0#").is_err());
    }

    #[test]
    fn test_parse_coord_pair_requires_eight_hex_digits() {
        assert!(parse_fixed32_pair("+1234567,9ABCDEF0#").is_err());
        assert!(parse_fixed32_pair("12345678,-ABCDEF0#").is_err());
        assert!(parse_fixed32_pair("1234567,9ABCDEF0#").is_err());
        assert!(parse_fixed32_pair("12345678, ABCDEF0#").is_err());
    }

    #[test]
    fn test_trim_declination() {
        assert_eq!(trim_declination(45.0), 45.0);
        assert_eq!(trim_declination(90.0), 90.0);
        assert_eq!(trim_declination(135.0), 45.0);
        assert_eq!(trim_declination(270.0), -90.0);
        assert_eq!(trim_declination(300.0), -60.0);
        assert_eq!(trim_declination(-30.0), -30.0);
    }

    #[test]
    fn test_trim_declination_idempotent() {
        let mut x = -720.0;
        while x <= 720.0 {
            let once = trim_declination(x);
            assert_eq!(trim_declination(once), once, "x = {}", x);
            x += 7.25;
        }
    }

    #[test]
    fn test_sexagesimal_carry() {
        // 59.9999 minutes of arc rounds the seconds up to 60
        let s = sexagesimal(10.0 + 59.0 / 60.0 + 59.9 / 3600.0);
        assert_eq!(
            s,
            Sexagesimal {
                negative: false,
                degrees: 11,
                minutes: 0,
                seconds: 0
            }
        );
    }

    #[test]
    fn test_sexagesimal_negative() {
        let s = sexagesimal(-33.5);
        assert!(s.negative);
        assert_eq!((s.degrees, s.minutes, s.seconds), (33, 30, 0));
        assert_eq!(s.sign_byte(), 1);
        assert_eq!(sexagesimal(0.0).sign_byte(), 0);
    }

    #[test]
    fn test_sexagesimal_roundtrip() {
        let mut x = -180.0;
        while x <= 180.0 {
            let s = sexagesimal(x);
            assert!(s.minutes < 60 && s.seconds < 60);
            assert!(
                (s.to_degrees() - x).abs() <= 0.5 / 3600.0 + 1e-9,
                "x = {}, got {:?}",
                x,
                s
            );
            x += 0.123457;
        }
    }

    #[test]
    fn test_equatorial_wire_scaling() {
        let target = Equatorial::new(12.0, -45.0);
        let (ra, dec) = target.to_fixed32();
        assert_eq!(ra, 0x8000_0000);
        assert_eq!(dec, degrees_to_fixed32(315.0));
        let back = Equatorial::from_fixed32(ra, dec);
        assert_eq!(back.ra_hours, 12.0);
        assert_eq!(back.dec_degrees, -45.0);
    }
}
