//! Mount session and identification
//!
//! [`Mount`] is the entry point for controlling a telescope: it owns the
//! connection, the model catalog used to name the mount, and the policy that
//! bounds blocking gotos.

mod firmware;
mod model;
mod session;
mod slew;

pub use firmware::{
    ControllerVariant, FirmwareInfo, FirmwareVersion, MIN_NEXSTAR_MODEL_VERSION,
    MIN_STARSENSE_MODEL_VERSION,
};
pub use model::{ModelCatalog, MountModel, UNKNOWN_MODEL};
pub use session::{Mount, MAX_PULSE_RATE};
pub use slew::{CancelToken, SlewPolicy};
