//! Mount model identification
//!
//! The `m` command returns a small model id. Names and the equatorial (GEM)
//! flag come from a [`ModelCatalog`] that is built once and handed to the
//! session, so callers can extend or replace it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Name reported for ids missing from the catalog
pub const UNKNOWN_MODEL: &str = "Unknown";

const BUILTIN_MODELS: &[(u32, &str)] = &[
    (1, "GPS Series"),
    (3, "i-Series"),
    (4, "i-Series SE"),
    (5, "CGE"),
    (6, "Advanced GT"),
    (7, "SLT"),
    (9, "CPC"),
    (10, "GT"),
    (11, "4/5 SE"),
    (12, "6/8 SE"),
    (13, "CGE Pro"),
    (14, "CGEM DX"),
    (15, "LCM"),
    (16, "Sky Prodigy"),
    (17, "CPC Deluxe"),
    (18, "GT 16"),
    (19, "StarSeeker"),
    (20, "AVX"),
    (21, "Cosmos"),
    (22, "Evolution"),
    (23, "CGX"),
    (24, "CGXL"),
    (25, "Astrofi"),
    (26, "SkyWatcher"),
];

/// German equatorial mounts; only these report pier side
const BUILTIN_GEM_IDS: &[u32] = &[5, 6, 13, 14, 20, 23, 24];

/// Identity of the connected mount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountModel {
    /// Id reported by `m`
    pub id: u32,
    /// Catalog name, or `Unknown`
    pub name: String,
    /// German equatorial mount
    pub is_gem: bool,
}

impl MountModel {
    /// False when the catalog had no entry for the id
    pub fn is_known(&self) -> bool {
        self.name != UNKNOWN_MODEL
    }
}

impl fmt::Display for MountModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.name,
            if self.is_gem { "GEM" } else { "Fork" }
        )
    }
}

/// Immutable id → name table plus the set of GEM ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCatalog {
    names: BTreeMap<u32, String>,
    gem_ids: BTreeSet<u32>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelCatalog {
    /// Empty catalog: every id is unknown
    pub fn empty() -> Self {
        Self {
            names: BTreeMap::new(),
            gem_ids: BTreeSet::new(),
        }
    }

    /// The Celestron models known to hand controller firmware
    pub fn builtin() -> Self {
        Self {
            names: BUILTIN_MODELS
                .iter()
                .map(|(id, name)| (*id, (*name).to_string()))
                .collect(),
            gem_ids: BUILTIN_GEM_IDS.iter().copied().collect(),
        }
    }

    /// Add or replace a model
    pub fn with_model(mut self, id: u32, name: impl Into<String>, is_gem: bool) -> Self {
        self.names.insert(id, name.into());
        if is_gem {
            self.gem_ids.insert(id);
        } else {
            self.gem_ids.remove(&id);
        }
        self
    }

    /// Number of named models
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve a model id. Unknown ids are not an error.
    pub fn lookup(&self, id: u32) -> MountModel {
        MountModel {
            id,
            name: self
                .names
                .get(&id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
            is_gem: self.gem_ids.contains(&id),
        }
    }
}
