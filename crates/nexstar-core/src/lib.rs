//! # NexStar Core Library
//!
//! Driver for Celestron NexStar and StarSense hand controllers.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Serial (and TCP bridge) communication with the hand controller
//! - The passthrough envelope for talking to the motor controllers
//! - Fixed-point and sexagesimal angle encodings
//! - Firmware and mount model discovery
//! - Blocking, cancellable gotos
//! - A simulated hand controller for running without hardware
//!
//! ## Example
//!
//! ```rust,ignore
//! use nexstar_core::prelude::*;
//!
//! let mut mount = Mount::new(ConnectionConfig::for_port("/dev/ttyUSB0"));
//! mount.connect()?;
//!
//! let info = mount.firmware_info()?;
//! println!("{}", info);
//!
//! let reached = mount.goto_ra_dec(5.5, -5.4)?;
//! println!("On target: {}", reached);
//! ```

pub mod config;
pub mod coords;
pub mod demo;
pub mod mount;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::MountConfig;
    pub use crate::coords::{Equatorial, Horizontal, Sexagesimal};
    pub use crate::demo::SimulatedMount;
    pub use crate::mount::{
        CancelToken, ControllerVariant, FirmwareInfo, FirmwareVersion, ModelCatalog, Mount,
        MountModel, SlewPolicy,
    };
    pub use crate::protocol::{
        Connection, ConnectionConfig, ConnectionState, Device, Direction, PortInfo,
        ProtocolError, SlewRate, TrackMode, Transport,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
