//! Protocol commands
//!
//! Defines the direct commands of the NexStar hand controller protocol and the
//! small enumerations that select passthrough targets and payloads.

use serde::{Deserialize, Serialize};

/// Direct (single op-letter) commands understood by the hand controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Echo a byte back ('K' command)
    Echo,

    /// Query alignment status ('J' command)
    GetAlignment,

    /// Get precise RA/DEC ('e' command)
    GetRaDec,

    /// Get precise Az/Alt ('z' command)
    GetAzAlt,

    /// Slew to precise RA/DEC ('r' command)
    SlewRaDec,

    /// Slew to precise Az/Alt ('b' command)
    SlewAzAlt,

    /// Sync on precise RA/DEC ('s' command)
    Sync,

    /// Is a goto in progress ('L' command)
    IsSlewing,

    /// Cancel goto ('M' command)
    Abort,

    /// Set tracking mode ('T' command)
    SetTrackMode,

    /// Get tracking mode ('t' command)
    GetTrackMode,

    /// Hand controller version ('V' command)
    GetVersion,

    /// Hand controller variant ('v' command)
    GetVariant,

    /// Mount model ('m' command)
    GetModel,

    /// Set observing location ('W' command)
    SetLocation,

    /// Set local date and time ('H' command)
    SetDateTime,
}

impl Command {
    /// Get the op-letter sent on the wire
    pub fn opcode(&self) -> u8 {
        match self {
            Command::Echo => b'K',
            Command::GetAlignment => b'J',
            Command::GetRaDec => b'e',
            Command::GetAzAlt => b'z',
            Command::SlewRaDec => b'r',
            Command::SlewAzAlt => b'b',
            Command::Sync => b's',
            Command::IsSlewing => b'L',
            Command::Abort => b'M',
            Command::SetTrackMode => b'T',
            Command::GetTrackMode => b't',
            Command::GetVersion => b'V',
            Command::GetVariant => b'v',
            Command::GetModel => b'm',
            Command::SetLocation => b'W',
            Command::SetDateTime => b'H',
        }
    }

    /// Number of reply bytes, including the trailing '#'
    pub fn reply_len(&self) -> usize {
        match self {
            Command::GetRaDec | Command::GetAzAlt => 18,
            Command::GetVersion => 3,
            Command::Echo
            | Command::GetAlignment
            | Command::IsSlewing
            | Command::GetTrackMode
            | Command::GetVariant
            | Command::GetModel => 2,
            Command::SlewRaDec
            | Command::SlewAzAlt
            | Command::Sync
            | Command::Abort
            | Command::SetTrackMode
            | Command::SetLocation
            | Command::SetDateTime => 1,
        }
    }
}

/// Motor controller addressed by a passthrough command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    /// Azimuth / right ascension motor
    RaMotor,
    /// Altitude / declination motor
    DecMotor,
}

impl Device {
    /// Wire byte
    pub fn to_wire(self) -> u8 {
        match self {
            Device::RaMotor => 0x10,
            Device::DecMotor => 0x11,
        }
    }

    /// `None` for an unknown byte
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0x10 => Some(Device::RaMotor),
            0x11 => Some(Device::DecMotor),
            _ => None,
        }
    }
}

/// Sub-commands carried inside a passthrough envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassthroughCommand {
    /// Variable-rate move in the positive direction (also used to stop)
    MovePositive,
    /// Variable-rate move in the negative direction
    MoveNegative,
    /// Start a guiding pulse
    PulseGuide,
    /// Query whether a guiding pulse is still running
    PulseStatus,
    /// Motor controller firmware version
    GetFirmware,
}

impl PassthroughCommand {
    /// Wire byte
    pub fn to_wire(self) -> u8 {
        match self {
            PassthroughCommand::MovePositive => 0x24,
            PassthroughCommand::MoveNegative => 0x25,
            PassthroughCommand::PulseGuide => 0x26,
            PassthroughCommand::PulseStatus => 0x27,
            PassthroughCommand::GetFirmware => 0xFE,
        }
    }

    /// `None` for an unknown byte
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0x24 => Some(PassthroughCommand::MovePositive),
            0x25 => Some(PassthroughCommand::MoveNegative),
            0x26 => Some(PassthroughCommand::PulseGuide),
            0x27 => Some(PassthroughCommand::PulseStatus),
            0xFE => Some(PassthroughCommand::GetFirmware),
            _ => None,
        }
    }
}

/// Manual motion direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Toward the north
    North,
    /// Toward the south
    South,
    /// Toward the east
    East,
    /// Toward the west
    West,
}

impl Direction {
    /// Motor that moves the mount in this direction
    pub fn device(self) -> Device {
        match self {
            Direction::North | Direction::South => Device::DecMotor,
            Direction::East | Direction::West => Device::RaMotor,
        }
    }

    /// North and West drive their motor in the positive sense
    pub fn is_positive(self) -> bool {
        matches!(self, Direction::North | Direction::West)
    }

    /// Move sub-command for this direction
    pub fn move_command(self) -> PassthroughCommand {
        if self.is_positive() {
            PassthroughCommand::MovePositive
        } else {
            PassthroughCommand::MoveNegative
        }
    }
}

/// Fixed ladder of manual slew rates (1 = slowest, 9 = fastest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SlewRate {
    /// Rate 1
    Guide,
    /// Rate 2
    Centering,
    /// Rate 3
    Find,
    /// Rate 4
    Rate4,
    /// Rate 5
    Rate5,
    /// Rate 6
    Rate6,
    /// Rate 7
    Rate7,
    /// Rate 8
    Rate8,
    /// Rate 9
    Max,
}

impl SlewRate {
    /// All rates, slowest first
    pub const ALL: [SlewRate; 9] = [
        SlewRate::Guide,
        SlewRate::Centering,
        SlewRate::Find,
        SlewRate::Rate4,
        SlewRate::Rate5,
        SlewRate::Rate6,
        SlewRate::Rate7,
        SlewRate::Rate8,
        SlewRate::Max,
    ];

    /// Rate byte sent in the move payload (1..=9; 0 means stop)
    pub fn to_wire(self) -> u8 {
        match self {
            SlewRate::Guide => 1,
            SlewRate::Centering => 2,
            SlewRate::Find => 3,
            SlewRate::Rate4 => 4,
            SlewRate::Rate5 => 5,
            SlewRate::Rate6 => 6,
            SlewRate::Rate7 => 7,
            SlewRate::Rate8 => 8,
            SlewRate::Max => 9,
        }
    }

    /// `None` for an unknown byte
    pub fn from_wire(byte: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.to_wire() == byte)
    }
}

/// Hand controller tracking modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackMode {
    /// No tracking
    Off,
    /// Alt-azimuth tracking
    AltAz,
    /// Equatorial tracking, northern hemisphere
    EquatorialNorth,
    /// Equatorial tracking, southern hemisphere
    EquatorialSouth,
}

impl TrackMode {
    /// Wire byte
    pub fn to_wire(self) -> u8 {
        match self {
            TrackMode::Off => 0,
            TrackMode::AltAz => 1,
            TrackMode::EquatorialNorth => 2,
            TrackMode::EquatorialSouth => 3,
        }
    }

    /// `None` for an unknown byte
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(TrackMode::Off),
            1 => Some(TrackMode::AltAz),
            2 => Some(TrackMode::EquatorialNorth),
            3 => Some(TrackMode::EquatorialSouth),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bytes() {
        assert_eq!(Command::Echo.opcode(), b'K');
        assert_eq!(Command::GetRaDec.opcode(), b'e');
        assert_eq!(Command::SlewAzAlt.opcode(), b'b');
        assert_eq!(Command::SetLocation.opcode(), b'W');
    }

    #[test]
    fn test_reply_lengths() {
        assert_eq!(Command::GetRaDec.reply_len(), 18);
        assert_eq!(Command::GetVersion.reply_len(), 3);
        assert_eq!(Command::IsSlewing.reply_len(), 2);
        assert_eq!(Command::Abort.reply_len(), 1);
    }

    #[test]
    fn test_direction_routing() {
        assert_eq!(Direction::North.device(), Device::DecMotor);
        assert_eq!(Direction::South.device(), Device::DecMotor);
        assert_eq!(Direction::East.device(), Device::RaMotor);
        assert_eq!(Direction::West.device(), Device::RaMotor);
        assert_eq!(Direction::West.move_command(), PassthroughCommand::MovePositive);
        assert_eq!(Direction::South.move_command(), PassthroughCommand::MoveNegative);
    }

    #[test]
    fn test_wire_mappings_are_inverse() {
        for rate in SlewRate::ALL {
            assert_eq!(SlewRate::from_wire(rate.to_wire()), Some(rate));
        }
        for mode in [
            TrackMode::Off,
            TrackMode::AltAz,
            TrackMode::EquatorialNorth,
            TrackMode::EquatorialSouth,
        ] {
            assert_eq!(TrackMode::from_wire(mode.to_wire()), Some(mode));
        }
        assert_eq!(SlewRate::from_wire(0), None);
        assert_eq!(TrackMode::from_wire(7), None);
        assert_eq!(Device::from_wire(0x12), None);
        assert_eq!(PassthroughCommand::from_wire(0xFE), Some(PassthroughCommand::GetFirmware));
    }
}
