//! Firmware identification

use serde::{Deserialize, Serialize};
use std::fmt;

use super::MountModel;

/// A `(major, minor)` firmware version, as reported by `V` or the passthrough
/// firmware query. Orders by major, then minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FirmwareVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
}

impl FirmwareVersion {
    /// Version `major.minor`
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}

/// StarSense controllers answer the model query from this version on
pub const MIN_STARSENSE_MODEL_VERSION: FirmwareVersion = FirmwareVersion::new(1, 18);

/// NexStar controllers answer the model query from this version on
pub const MIN_NEXSTAR_MODEL_VERSION: FirmwareVersion = FirmwareVersion::new(2, 20);

/// Hand controller family, from the `v` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerVariant {
    /// NexStar hand controller (0x11)
    NexStar,
    /// StarSense hand controller (0x13)
    StarSense,
    /// Any other variant byte
    Other(u8),
}

impl ControllerVariant {
    /// Byte sent or received on the wire
    pub fn to_wire(self) -> u8 {
        match self {
            ControllerVariant::NexStar => 0x11,
            ControllerVariant::StarSense => 0x13,
            ControllerVariant::Other(b) => b,
        }
    }

    /// Decode a `v` reply byte
    pub fn from_wire(byte: u8) -> Self {
        match byte {
            0x11 => ControllerVariant::NexStar,
            0x13 => ControllerVariant::StarSense,
            other => ControllerVariant::Other(other),
        }
    }

    /// Whether a controller of this family and version knows the `m` command
    pub fn supports_model_query(self, version: FirmwareVersion) -> bool {
        (self == ControllerVariant::StarSense && version >= MIN_STARSENSE_MODEL_VERSION)
            || version >= MIN_NEXSTAR_MODEL_VERSION
    }
}

impl fmt::Display for ControllerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerVariant::StarSense => f.write_str("StarSense"),
            // Anything that is not StarSense speaks the NexStar protocol
            _ => f.write_str("NexStar"),
        }
    }
}

/// Everything the discovery sequence learns about the mount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareInfo {
    /// Hand controller version
    pub controller: FirmwareVersion,
    /// Hand controller family
    pub variant: ControllerVariant,
    /// `None` when the controller is too old to report its model
    pub model: Option<MountModel>,
    /// RA / azimuth motor controller version
    pub ra_motor: FirmwareVersion,
    /// DEC / altitude motor controller version
    pub dec_motor: FirmwareVersion,
}

impl FirmwareInfo {
    /// Whether the identified mount is a German equatorial
    pub fn is_gem(&self) -> bool {
        self.model.as_ref().is_some_and(|m| m.is_gem)
    }
}

impl fmt::Display for FirmwareInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = self
            .model
            .as_ref()
            .map(|m| m.name.as_str())
            .unwrap_or(super::model::UNKNOWN_MODEL);
        write!(
            f,
            "HC Ver {} model {} {} {} mount, HW Ver {} (RA) {} (DEC)",
            self.controller,
            model,
            self.variant,
            if self.is_gem() { "GEM" } else { "Fork" },
            self.ra_motor,
            self.dec_motor
        )
    }
}
