// # Topology Store Trait
//
// Defines the interface to the deployment engine's declarative
// configuration tree: the persisted description of hosts, shapes, key
// material, and signers that a displacement run executes against.
//
// ## Implementations
//
// - In-memory: [`crate::topology::MemoryTopology`] (tests, dry runs)
// - File-backed: [`crate::topology::FileTopology`] (JSON snapshot)
//
// ## Read/append discipline
//
// The provisioner core only reads and appends; it never deletes a host,
// a shape membership, or key material. Setters create their parent entry
// when it does not exist yet (adding an address to an undeclared host
// declares the host).
//
// ## Typed absence
//
// Reads of create-once values (`domain_validation_key`, `swarm_key`)
// return `Ok(None)` when the value has never been generated. A transport
// or storage failure is an `Err`, never `None`. Conflating the two would
// make the generate-if-absent primitives destructive.
//
// ## Commit
//
// Mutations accumulate in the store and become durable as one unit on
// `commit()`. What "durable" means is implementation-defined (a file
// snapshot, an engine RPC); the reconciler only relies on commit being
// all-or-nothing.

use async_trait::async_trait;

/// Trait for declarative topology store implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait TopologyStore: Send + Sync {
    // --- cluster domain ---

    /// Set the cluster's root domain (always rewritten)
    async fn set_root_domain(&self, domain: &str) -> Result<(), crate::Error>;

    /// Set the generated-services domain (always rewritten)
    async fn set_generated_domain(&self, domain: &str) -> Result<(), crate::Error>;

    /// Read the domain-validation private key, if ever generated
    async fn domain_validation_key(&self) -> Result<Option<String>, crate::Error>;

    /// Generate the domain-validation key pair
    async fn generate_domain_validation(&self) -> Result<(), crate::Error>;

    /// Read the peer-swarm key, if ever generated
    async fn swarm_key(&self) -> Result<Option<String>, crate::Error>;

    /// Generate the peer-swarm key
    async fn generate_swarm_key(&self) -> Result<(), crate::Error>;

    // --- auth ---

    /// Declare a credential signer (always rewritten)
    async fn set_signer(
        &self,
        name: &str,
        username: &str,
        password: &str,
    ) -> Result<(), crate::Error>;

    // --- shapes ---

    /// Declare a shape's service list (always rewritten)
    async fn set_shape_services(
        &self,
        shape: &str,
        services: &[String],
    ) -> Result<(), crate::Error>;

    /// Declare one named port of a shape (always rewritten)
    async fn set_shape_port(&self, shape: &str, port: &str, value: u16)
    -> Result<(), crate::Error>;

    /// Append bootstrap nodes to a shape's peer-to-peer swarm
    async fn add_bootstrap_nodes(
        &self,
        shape: &str,
        nodes: &[String],
    ) -> Result<(), crate::Error>;

    // --- hosts ---

    /// List every declared hostname
    async fn list_hosts(&self) -> Result<Vec<String>, crate::Error>;

    /// Append an address (CIDR notation) to a host, declaring it if new
    async fn add_host_address(&self, host: &str, cidr: &str) -> Result<(), crate::Error>;

    /// List a host's declared addresses (CIDR notation)
    async fn host_addresses(&self, host: &str) -> Result<Vec<String>, crate::Error>;

    /// Set a host's SSH endpoint (`ip:port`)
    async fn set_ssh_address(&self, host: &str, address: &str) -> Result<(), crate::Error>;

    /// Append signer references to a host's SSH auth list
    async fn add_ssh_auth(&self, host: &str, signers: &[String]) -> Result<(), crate::Error>;

    /// Set a host's location string
    async fn set_location(&self, host: &str, location: &str) -> Result<(), crate::Error>;

    /// List the shapes a host is a member of
    async fn host_shapes(&self, host: &str) -> Result<Vec<String>, crate::Error>;

    /// Generate a host's membership instance in a shape
    async fn generate_shape_instance(&self, host: &str, shape: &str)
    -> Result<(), crate::Error>;

    // --- persistence ---

    /// Make all accumulated mutations durable as one unit
    async fn commit(&self) -> Result<(), crate::Error>;
}
