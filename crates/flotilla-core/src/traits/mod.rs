// # Collaborator Traits
//
// This module defines the trait seams for every external collaborator of
// the provisioner core:
//
// - **ComputeProvider**: cloud resource API (projects, resources, instances)
// - **TopologyStore**: the deployment engine's declarative configuration tree
// - **DisplacementEngine**: executes a displacement and streams progress
// - **RegistrarTransport**: the domain registrar's record API

pub mod compute_provider;
pub mod displacement_engine;
pub mod registrar;
pub mod topology_store;

pub use compute_provider::{ComputeProvider, Instance, NetworkInterface, Project, ResourceRef};
pub use displacement_engine::{DisplacementEngine, DisplacementEvent};
pub use registrar::{DnsRecord, DomainName, RegistrarTransport};
pub use topology_store::TopologyStore;
