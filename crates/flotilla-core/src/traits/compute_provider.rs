// # Compute Provider Trait
//
// Defines the interface to the cloud vendor's resource API.
//
// ## Implementations
//
// - DigitalOcean: `flotilla-cloud-digitalocean` crate
// - Future: Hetzner, Vultr, etc.
//
// ## Responsibility boundaries
//
// Providers are transport adapters only. They perform API calls against
// their endpoints, parse vendor payloads into the types below, and return
// errors for the discovery layer to classify. They must not filter
// resource kinds, parse resource identifiers, or decide which hosts end
// up in the topology; that logic is owned by `discovery`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A project visible to the API credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Opaque project id
    pub id: String,
    /// Human-chosen project name
    pub name: String,
}

/// Reference to a resource attached to a project
///
/// The identifier is an opaque URN of the form `vendor:kind:id`,
/// e.g. `do:droplet:12345678`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Uniform resource name identifying kind and instance
    pub urn: String,
}

impl ResourceRef {
    /// Create a resource reference from a URN string
    pub fn new(urn: impl Into<String>) -> Self {
        Self { urn: urn.into() }
    }

    /// Whether the URN's kind segment marks a compute instance
    ///
    /// Non-compute kinds (volumes, floating IPs, spaces, ...) are
    /// filtered out of discovery without error.
    pub fn is_compute_instance(&self) -> bool {
        self.urn.split(':').nth(1) == Some("droplet")
    }

    /// Extract the numeric instance id from the URN's trailing segment
    ///
    /// # Returns
    ///
    /// - `Ok(u64)`: well-formed positive integer id
    /// - `Err(Error::InvalidIdentifier)`: trailing segment missing or malformed
    pub fn instance_id(&self) -> Result<u64, crate::Error> {
        let tail = self.urn.rsplit(':').next().unwrap_or_default();
        tail.parse::<u64>().map_err(|_| {
            crate::Error::invalid_identifier(format!(
                "URN {:?} does not end in a numeric instance id",
                self.urn
            ))
        })
    }
}

/// One v4 network attachment of an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    /// Address scope as reported by the vendor: `public` or `private`
    #[serde(rename = "type")]
    pub kind: String,
    /// Address assigned on this network
    pub ip_address: std::net::Ipv4Addr,
}

/// Full details of a compute instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Instance name; becomes the fleet hostname
    pub name: String,
    /// v4 network attachments, in vendor order
    pub networks: Vec<NetworkInterface>,
    /// Vendor tags on the instance
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Trait for cloud resource API implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// List every project visible to the API credential
    async fn list_projects(&self) -> Result<Vec<Project>, crate::Error>;

    /// List all resources attached to a project, regardless of kind
    ///
    /// # Parameters
    ///
    /// - `project_id`: the opaque project id from [`Project::id`]
    async fn list_project_resources(
        &self,
        project_id: &str,
    ) -> Result<Vec<ResourceRef>, crate::Error>;

    /// Fetch full details of one compute instance
    ///
    /// # Parameters
    ///
    /// - `instance_id`: numeric id from [`ResourceRef::instance_id`]
    async fn get_instance(&self, instance_id: u64) -> Result<Instance, crate::Error>;
}
