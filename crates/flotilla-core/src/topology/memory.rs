// # Memory Topology Store
//
// In-memory implementation of TopologyStore.
//
// ## Purpose
//
// Holds the declared topology in a RwLock'd state tree with no
// persistence. Useful for tests, dry runs, and embedding scenarios where
// the caller snapshots the topology by other means.
//
// ## Commit
//
// `commit()` is a logged no-op: the in-memory tree is always "durable"
// for the lifetime of the store.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{TopologyState, generate_key_material};
use crate::Error;
use crate::traits::TopologyStore;

/// In-memory topology store implementation
#[derive(Debug, Clone, Default)]
pub struct MemoryTopology {
    inner: Arc<RwLock<TopologyState>>,
}

impl MemoryTopology {
    /// Create an empty topology
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TopologyStore for MemoryTopology {
    async fn set_root_domain(&self, domain: &str) -> Result<(), Error> {
        self.inner.write().await.cloud.root_domain = Some(domain.to_string());
        Ok(())
    }

    async fn set_generated_domain(&self, domain: &str) -> Result<(), Error> {
        self.inner.write().await.cloud.generated_domain = Some(domain.to_string());
        Ok(())
    }

    async fn domain_validation_key(&self) -> Result<Option<String>, Error> {
        Ok(self.inner.read().await.cloud.validation_key.clone())
    }

    async fn generate_domain_validation(&self) -> Result<(), Error> {
        self.inner.write().await.cloud.validation_key = Some(generate_key_material());
        Ok(())
    }

    async fn swarm_key(&self) -> Result<Option<String>, Error> {
        Ok(self.inner.read().await.cloud.swarm_key.clone())
    }

    async fn generate_swarm_key(&self) -> Result<(), Error> {
        self.inner.write().await.cloud.swarm_key = Some(generate_key_material());
        Ok(())
    }

    async fn set_signer(&self, name: &str, username: &str, password: &str) -> Result<(), Error> {
        let mut state = self.inner.write().await;
        let signer = state.signers.entry(name.to_string()).or_default();
        signer.username = username.to_string();
        signer.password = password.to_string();
        Ok(())
    }

    async fn set_shape_services(&self, shape: &str, services: &[String]) -> Result<(), Error> {
        self.inner.write().await.shape_mut(shape).services = services.to_vec();
        Ok(())
    }

    async fn set_shape_port(&self, shape: &str, port: &str, value: u16) -> Result<(), Error> {
        self.inner
            .write()
            .await
            .shape_mut(shape)
            .ports
            .insert(port.to_string(), value);
        Ok(())
    }

    async fn add_bootstrap_nodes(&self, shape: &str, nodes: &[String]) -> Result<(), Error> {
        self.inner
            .write()
            .await
            .shape_mut(shape)
            .bootstrap
            .extend_from_slice(nodes);
        Ok(())
    }

    async fn list_hosts(&self) -> Result<Vec<String>, Error> {
        Ok(self.inner.read().await.hosts.keys().cloned().collect())
    }

    async fn add_host_address(&self, host: &str, cidr: &str) -> Result<(), Error> {
        self.inner
            .write()
            .await
            .host_mut(host)
            .addresses
            .push(cidr.to_string());
        Ok(())
    }

    async fn host_addresses(&self, host: &str) -> Result<Vec<String>, Error> {
        Ok(self
            .inner
            .read()
            .await
            .hosts
            .get(host)
            .map(|h| h.addresses.clone())
            .unwrap_or_default())
    }

    async fn set_ssh_address(&self, host: &str, address: &str) -> Result<(), Error> {
        self.inner.write().await.host_mut(host).ssh_address = Some(address.to_string());
        Ok(())
    }

    async fn add_ssh_auth(&self, host: &str, signers: &[String]) -> Result<(), Error> {
        self.inner
            .write()
            .await
            .host_mut(host)
            .ssh_auth
            .extend_from_slice(signers);
        Ok(())
    }

    async fn set_location(&self, host: &str, location: &str) -> Result<(), Error> {
        self.inner.write().await.host_mut(host).location = Some(location.to_string());
        Ok(())
    }

    async fn host_shapes(&self, host: &str) -> Result<Vec<String>, Error> {
        Ok(self
            .inner
            .read()
            .await
            .hosts
            .get(host)
            .map(|h| h.shapes.clone())
            .unwrap_or_default())
    }

    async fn generate_shape_instance(&self, host: &str, shape: &str) -> Result<(), Error> {
        let mut state = self.inner.write().await;
        let shapes = &mut state.host_mut(host).shapes;
        if !shapes.contains(&shape.to_string()) {
            shapes.push(shape.to_string());
        }
        Ok(())
    }

    async fn commit(&self) -> Result<(), Error> {
        tracing::debug!("memory topology commit (no-op)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_address_declares_the_host() {
        let store = MemoryTopology::new();
        assert!(store.list_hosts().await.unwrap().is_empty());

        store.add_host_address("node1", "203.0.113.7/32").await.unwrap();
        assert_eq!(store.list_hosts().await.unwrap(), vec!["node1"]);
        assert_eq!(
            store.host_addresses("node1").await.unwrap(),
            vec!["203.0.113.7/32"]
        );
    }

    #[tokio::test]
    async fn generated_keys_become_readable() {
        let store = MemoryTopology::new();
        assert!(store.domain_validation_key().await.unwrap().is_none());
        assert!(store.swarm_key().await.unwrap().is_none());

        store.generate_domain_validation().await.unwrap();
        store.generate_swarm_key().await.unwrap();

        assert!(store.domain_validation_key().await.unwrap().is_some());
        assert!(store.swarm_key().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn undeclared_host_reads_are_empty() {
        let store = MemoryTopology::new();
        assert!(store.host_addresses("ghost").await.unwrap().is_empty());
        assert!(store.host_shapes("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn shape_instance_generation_is_idempotent() {
        let store = MemoryTopology::new();
        store.generate_shape_instance("node1", "all").await.unwrap();
        store.generate_shape_instance("node1", "all").await.unwrap();
        assert_eq!(store.host_shapes("node1").await.unwrap(), vec!["all"]);
    }
}
