// # Topology Store Implementations
//
// This module provides implementations of the TopologyStore trait for
// different persistence strategies, plus the declarative state model they
// share.

pub mod file;
pub mod memory;

pub use file::FileTopology;
pub use memory::MemoryTopology;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The declarative topology tree, as held by a store
///
/// Mutations are append-or-overwrite only; nothing in the provisioner
/// ever deletes an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TopologyState {
    pub cloud: CloudState,
    #[serde(default)]
    pub signers: BTreeMap<String, SignerState>,
    #[serde(default)]
    pub shapes: BTreeMap<String, ShapeState>,
    #[serde(default)]
    pub hosts: BTreeMap<String, HostState>,
}

/// Cluster-wide declarations: domains and key material
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CloudState {
    pub root_domain: Option<String>,
    pub generated_domain: Option<String>,
    pub validation_key: Option<String>,
    pub swarm_key: Option<String>,
}

/// A declared credential signer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SignerState {
    pub username: String,
    pub password: String,
}

/// A declared shape
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ShapeState {
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub ports: BTreeMap<String, u16>,
    #[serde(default)]
    pub bootstrap: Vec<String>,
}

/// A declared host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct HostState {
    #[serde(default)]
    pub addresses: Vec<String>,
    pub ssh_address: Option<String>,
    #[serde(default)]
    pub ssh_auth: Vec<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub shapes: Vec<String>,
}

impl TopologyState {
    /// The host entry, declared on first touch
    pub fn host_mut(&mut self, host: &str) -> &mut HostState {
        self.hosts.entry(host.to_string()).or_default()
    }

    /// The shape entry, declared on first touch
    pub fn shape_mut(&mut self, shape: &str) -> &mut ShapeState {
        self.shapes.entry(shape.to_string()).or_default()
    }
}

/// Fresh key material for the generate-* operations
///
/// 32 random bytes, hex-encoded. Stores hold key material opaquely; only
/// presence matters to the reconciler's generate-if-absent primitives.
pub(crate) fn generate_key_material() -> String {
    use rand::RngCore;

    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_material_is_fresh_hex() {
        let a = generate_key_material();
        let b = generate_key_material();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn host_entry_declared_on_first_touch() {
        let mut state = TopologyState::default();
        assert!(state.hosts.is_empty());
        state.host_mut("node1").addresses.push("1.2.3.4/32".to_string());
        assert_eq!(state.hosts.len(), 1);
        assert_eq!(state.hosts["node1"].addresses, vec!["1.2.3.4/32"]);
    }
}
