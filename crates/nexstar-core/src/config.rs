//! Mount configuration file
//!
//! A single JSON document holding the connection settings and the goto wait
//! policy. Missing fields fall back to their defaults, so a file containing
//! only `{"connection": {"port_name": "/dev/ttyUSB0"}}` is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

use crate::mount::{ModelCatalog, Mount, SlewPolicy};
use crate::protocol::ConnectionConfig;

/// Connection settings plus goto wait policy, as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Serial port and timing
    pub connection: ConnectionConfig,
    /// How gotos wait for the mount
    pub slew: SlewPolicy,
}

impl MountConfig {
    /// Defaults for everything but the port
    pub fn for_port(port_name: impl Into<String>) -> Self {
        Self {
            connection: ConnectionConfig::for_port(port_name),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: MountConfig = serde_json::from_str(&content)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        debug!(path = %path.display(), port = %config.connection.port_name, "Loaded mount config");
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, content)
    }

    /// Build an unconnected session from this configuration
    pub fn into_mount(self, catalog: ModelCatalog) -> Mount {
        let mut mount = Mount::with_catalog(self.connection, catalog);
        mount.set_slew_policy(self.slew);
        mount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mount.json");

        let mut config = MountConfig::for_port("/dev/ttyUSB0");
        config.connection.timeout_ms = 2000;
        config.slew = SlewPolicy::unbounded();
        config.save(&path).unwrap();

        assert_eq!(MountConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mount.json");
        fs::write(&path, r#"{"connection": {"port_name": "COM3"}}"#).unwrap();

        let config = MountConfig::load(&path).unwrap();
        assert_eq!(config.connection.port_name, "COM3");
        assert_eq!(config.connection.baud_rate, 9600);
        assert_eq!(config.slew, SlewPolicy::default());
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mount.json");
        fs::write(&path, "not json").unwrap();

        let err = MountConfig::load(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_into_mount_applies_policy() {
        let mut config = MountConfig::for_port("/dev/ttyUSB0");
        config.slew.poll_interval_ms = 10;
        let mount = config.into_mount(ModelCatalog::builtin());
        assert_eq!(mount.slew_policy().poll_interval_ms, 10);
        assert!(!mount.is_connected());
    }
}
