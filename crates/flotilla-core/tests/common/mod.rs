//! Test doubles and common utilities for the contract tests
//!
//! The doubles here implement the collaborator traits with scripted data
//! and call counters, so tests can assert how often the core touched each
//! seam, not just the end state.

#![allow(dead_code)]

use async_trait::async_trait;
use flotilla_core::config::FleetConfig;
use flotilla_core::error::Result;
use flotilla_core::topology::MemoryTopology;
use flotilla_core::traits::{
    ComputeProvider, DisplacementEngine, DisplacementEvent, DnsRecord, DomainName, Instance,
    NetworkInterface, Project, RegistrarTransport, ResourceRef, TopologyStore,
};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio_stream::Stream;

/// A compute provider backed by scripted projects and instances
pub struct ScriptedCompute {
    projects: Vec<Project>,
    resources: HashMap<String, Vec<ResourceRef>>,
    instances: HashMap<u64, Instance>,
    get_instance_calls: Arc<AtomicUsize>,
}

impl ScriptedCompute {
    pub fn new() -> Self {
        Self {
            projects: Vec::new(),
            resources: HashMap::new(),
            instances: HashMap::new(),
            get_instance_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add a project with the given resources
    pub fn with_project(mut self, id: &str, name: &str, urns: &[&str]) -> Self {
        self.projects.push(Project {
            id: id.to_string(),
            name: name.to_string(),
        });
        self.resources.insert(
            id.to_string(),
            urns.iter().map(|u| ResourceRef::new(*u)).collect(),
        );
        self
    }

    /// Add a droplet instance with one public address
    pub fn with_droplet(mut self, id: u64, name: &str, public_ip: [u8; 4]) -> Self {
        self.instances.insert(
            id,
            Instance {
                name: name.to_string(),
                networks: vec![NetworkInterface {
                    kind: "public".to_string(),
                    ip_address: public_ip.into(),
                }],
                tags: Vec::new(),
            },
        );
        self
    }

    /// Add a droplet instance with no public address
    pub fn with_private_droplet(mut self, id: u64, name: &str) -> Self {
        self.instances.insert(
            id,
            Instance {
                name: name.to_string(),
                networks: vec![NetworkInterface {
                    kind: "private".to_string(),
                    ip_address: [10, 0, 0, 9].into(),
                }],
                tags: Vec::new(),
            },
        );
        self
    }

    pub fn get_instance_calls(&self) -> usize {
        self.get_instance_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ComputeProvider for ScriptedCompute {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.projects.clone())
    }

    async fn list_project_resources(&self, project_id: &str) -> Result<Vec<ResourceRef>> {
        Ok(self.resources.get(project_id).cloned().unwrap_or_default())
    }

    async fn get_instance(&self, instance_id: u64) -> Result<Instance> {
        self.get_instance_calls.fetch_add(1, Ordering::SeqCst);
        self.instances
            .get(&instance_id)
            .cloned()
            .ok_or_else(|| flotilla_core::Error::cloud(format!("no instance {instance_id}")))
    }
}

/// A topology store that counts generate and bootstrap calls
///
/// Delegates all behavior to a [`MemoryTopology`]; the counters are what
/// the idempotency contracts assert on.
pub struct CountingTopology {
    inner: MemoryTopology,
    pub validation_generates: Arc<AtomicUsize>,
    pub swarm_generates: Arc<AtomicUsize>,
    pub instance_generates: Arc<AtomicUsize>,
    pub commits: Arc<AtomicUsize>,
    /// Every `add_bootstrap_nodes` argument list, in call order
    pub bootstrap_calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl CountingTopology {
    pub fn new() -> Self {
        Self {
            inner: MemoryTopology::new(),
            validation_generates: Arc::new(AtomicUsize::new(0)),
            swarm_generates: Arc::new(AtomicUsize::new(0)),
            instance_generates: Arc::new(AtomicUsize::new(0)),
            commits: Arc::new(AtomicUsize::new(0)),
            bootstrap_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn bootstrap_calls(&self) -> Vec<Vec<String>> {
        self.bootstrap_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TopologyStore for CountingTopology {
    async fn set_root_domain(&self, domain: &str) -> Result<()> {
        self.inner.set_root_domain(domain).await
    }

    async fn set_generated_domain(&self, domain: &str) -> Result<()> {
        self.inner.set_generated_domain(domain).await
    }

    async fn domain_validation_key(&self) -> Result<Option<String>> {
        self.inner.domain_validation_key().await
    }

    async fn generate_domain_validation(&self) -> Result<()> {
        self.validation_generates.fetch_add(1, Ordering::SeqCst);
        self.inner.generate_domain_validation().await
    }

    async fn swarm_key(&self) -> Result<Option<String>> {
        self.inner.swarm_key().await
    }

    async fn generate_swarm_key(&self) -> Result<()> {
        self.swarm_generates.fetch_add(1, Ordering::SeqCst);
        self.inner.generate_swarm_key().await
    }

    async fn set_signer(&self, name: &str, username: &str, password: &str) -> Result<()> {
        self.inner.set_signer(name, username, password).await
    }

    async fn set_shape_services(&self, shape: &str, services: &[String]) -> Result<()> {
        self.inner.set_shape_services(shape, services).await
    }

    async fn set_shape_port(&self, shape: &str, port: &str, value: u16) -> Result<()> {
        self.inner.set_shape_port(shape, port, value).await
    }

    async fn add_bootstrap_nodes(&self, shape: &str, nodes: &[String]) -> Result<()> {
        self.bootstrap_calls.lock().unwrap().push(nodes.to_vec());
        self.inner.add_bootstrap_nodes(shape, nodes).await
    }

    async fn list_hosts(&self) -> Result<Vec<String>> {
        self.inner.list_hosts().await
    }

    async fn add_host_address(&self, host: &str, cidr: &str) -> Result<()> {
        self.inner.add_host_address(host, cidr).await
    }

    async fn host_addresses(&self, host: &str) -> Result<Vec<String>> {
        self.inner.host_addresses(host).await
    }

    async fn set_ssh_address(&self, host: &str, address: &str) -> Result<()> {
        self.inner.set_ssh_address(host, address).await
    }

    async fn add_ssh_auth(&self, host: &str, signers: &[String]) -> Result<()> {
        self.inner.add_ssh_auth(host, signers).await
    }

    async fn set_location(&self, host: &str, location: &str) -> Result<()> {
        self.inner.set_location(host, location).await
    }

    async fn host_shapes(&self, host: &str) -> Result<Vec<String>> {
        self.inner.host_shapes(host).await
    }

    async fn generate_shape_instance(&self, host: &str, shape: &str) -> Result<()> {
        self.instance_generates.fetch_add(1, Ordering::SeqCst);
        self.inner.generate_shape_instance(host, shape).await
    }

    async fn commit(&self) -> Result<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.commit().await
    }
}

/// A registrar transport over a scripted remote record set
pub struct ScriptedRegistrar {
    remote: Mutex<Vec<DnsRecord>>,
    reject_commits: AtomicBool,
    pub fetch_calls: Arc<AtomicUsize>,
    pub replace_calls: Arc<AtomicUsize>,
}

impl ScriptedRegistrar {
    pub fn new(remote: Vec<DnsRecord>) -> Self {
        Self {
            remote: Mutex::new(remote),
            reject_commits: AtomicBool::new(false),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
            replace_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make subsequent commits fail with CommitRejected
    pub fn reject_commits(&self, reject: bool) {
        self.reject_commits.store(reject, Ordering::SeqCst);
    }

    /// The record set the registrar currently holds
    pub fn remote_records(&self) -> Vec<DnsRecord> {
        self.remote.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistrarTransport for ScriptedRegistrar {
    async fn fetch_records(&self, _domain: &DomainName) -> Result<Vec<DnsRecord>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.remote.lock().unwrap().clone())
    }

    async fn replace_records(&self, _domain: &DomainName, records: &[DnsRecord]) -> Result<()> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_commits.load(Ordering::SeqCst) {
            return Err(flotilla_core::Error::commit_rejected(
                "scripted rejection",
            ));
        }
        *self.remote.lock().unwrap() = records.to_vec();
        Ok(())
    }
}

/// An engine that replays a scripted event sequence
pub struct ScriptedEngine {
    events: Vec<DisplacementEvent>,
}

impl ScriptedEngine {
    pub fn new(events: Vec<DisplacementEvent>) -> Self {
        Self { events }
    }
}

impl DisplacementEngine for ScriptedEngine {
    fn displace(
        &self,
        _shapes: &[String],
    ) -> Pin<Box<dyn Stream<Item = DisplacementEvent> + Send + 'static>> {
        Box::pin(tokio_stream::iter(self.events.clone()))
    }
}

/// Helper to create a minimal FleetConfig for testing
pub fn test_config() -> FleetConfig {
    FleetConfig::new("test-password")
}
