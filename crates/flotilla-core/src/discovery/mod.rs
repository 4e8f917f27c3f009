//! Cloud resource discovery
//!
//! Resolves a named cloud project to the compute instances attached to it
//! and normalizes each into a [`HostDescriptor`]. Descriptors are
//! ephemeral: recomputed on every run, never persisted.
//!
//! Discovery is deliberately sequential, one instance-details round-trip
//! at a time, to bound concurrent load on the cloud API. Cluster sizes
//! are small, so latency is not a concern.

use crate::error::{Error, Result};
use crate::traits::{ComputeProvider, Instance, Project, ResourceRef};
use tracing::{debug, warn};

/// Normalized description of one live compute instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDescriptor {
    /// Instance name; used as the fleet hostname
    pub hostname: String,
    /// First v4 address flagged public, if the instance has one
    ///
    /// `None` is a data-quality issue on the vendor side, not an error;
    /// callers decide whether such a host is usable.
    pub public_ip: Option<std::net::Ipv4Addr>,
    /// Vendor tags on the instance
    pub tags: Vec<String>,
}

impl HostDescriptor {
    /// Derive a descriptor from full instance details
    pub fn from_instance(instance: Instance) -> Self {
        let public_ip = instance
            .networks
            .iter()
            .find(|net| net.kind == "public")
            .map(|net| net.ip_address);

        Self {
            hostname: instance.name,
            public_ip,
            tags: instance.tags,
        }
    }
}

/// Discovers the compute resources making up the fleet
pub struct ResourceDiscovery<'a, C: ComputeProvider + ?Sized> {
    provider: &'a C,
}

impl<'a, C: ComputeProvider + ?Sized> ResourceDiscovery<'a, C> {
    /// Create a discovery over the given provider
    pub fn new(provider: &'a C) -> Self {
        Self { provider }
    }

    /// Look up a project by exact name
    ///
    /// The match is case-sensitive and never partial.
    ///
    /// # Returns
    ///
    /// - `Ok(Project)`: the project with exactly this name
    /// - `Err(Error::ProjectNotFound)`: no project matches
    pub async fn find_project(&self, name: &str) -> Result<Project> {
        let projects = self.provider.list_projects().await?;
        projects
            .into_iter()
            .find(|project| project.name == name)
            .ok_or_else(|| Error::project_not_found(name))
    }

    /// List a project's resources, keeping only compute instances
    ///
    /// Resources of every other kind are filtered out without error.
    pub async fn list_compute_resources(&self, project_id: &str) -> Result<Vec<ResourceRef>> {
        let resources = self.provider.list_project_resources(project_id).await?;
        let total = resources.len();

        let droplets: Vec<ResourceRef> = resources
            .into_iter()
            .filter(ResourceRef::is_compute_instance)
            .collect();

        debug!(
            "project {} holds {} resource(s), {} compute instance(s)",
            project_id,
            total,
            droplets.len()
        );
        Ok(droplets)
    }

    /// Resolve one compute resource into a host descriptor
    ///
    /// # Returns
    ///
    /// - `Err(Error::InvalidIdentifier)`: URN's trailing segment is not a
    ///   well-formed instance id
    pub async fn resolve_host(&self, resource: &ResourceRef) -> Result<HostDescriptor> {
        let instance_id = resource.instance_id()?;
        let instance = self.provider.get_instance(instance_id).await?;
        let descriptor = HostDescriptor::from_instance(instance);

        if descriptor.public_ip.is_none() {
            warn!(
                "instance {} ({}) reports no public v4 address",
                descriptor.hostname, resource.urn
            );
        }

        Ok(descriptor)
    }

    /// Resolve the named project to the descriptors of its instances
    ///
    /// Instances are resolved one at a time, sequentially, awaiting each
    /// network round-trip before starting the next.
    pub async fn discover(&self, project_name: &str) -> Result<Vec<HostDescriptor>> {
        let project = self.find_project(project_name).await?;
        let resources = self.list_compute_resources(&project.id).await?;

        let mut descriptors = Vec::with_capacity(resources.len());
        for resource in &resources {
            descriptors.push(self.resolve_host(resource).await?);
        }

        debug!(
            "discovered {} host(s) in project {:?}",
            descriptors.len(),
            project_name
        );
        Ok(descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::NetworkInterface;

    fn instance(name: &str, networks: Vec<NetworkInterface>) -> Instance {
        Instance {
            name: name.to_string(),
            networks,
            tags: vec!["fleet".to_string()],
        }
    }

    fn net(kind: &str, ip: [u8; 4]) -> NetworkInterface {
        NetworkInterface {
            kind: kind.to_string(),
            ip_address: ip.into(),
        }
    }

    #[test]
    fn descriptor_takes_first_public_address() {
        let descriptor = HostDescriptor::from_instance(instance(
            "node1",
            vec![
                net("private", [10, 0, 0, 5]),
                net("public", [203, 0, 113, 7]),
                net("public", [203, 0, 113, 8]),
            ],
        ));

        assert_eq!(descriptor.hostname, "node1");
        assert_eq!(descriptor.public_ip, Some([203, 0, 113, 7].into()));
    }

    #[test]
    fn descriptor_without_public_address_is_not_an_error() {
        let descriptor =
            HostDescriptor::from_instance(instance("node2", vec![net("private", [10, 0, 0, 6])]));
        assert_eq!(descriptor.public_ip, None);
    }
}
