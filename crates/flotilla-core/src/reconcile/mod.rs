//! Topology reconciliation
//!
//! Diffs discovered cloud hosts against the declared topology and applies
//! only the missing additions. Every step is idempotent per host:
//! already-declared hosts are never re-touched, so repeated runs converge
//! without duplicating or mutating existing entries. That bounds the
//! blast radius of re-running against a partially-provisioned cluster.
//!
//! Create-once values (key material) use a generate-if-absent primitive:
//! read the value; `None` means it was never generated, so generate it;
//! `Some` means leave it untouched. Reads signal absence with a typed
//! `Option`, never with an error; a transport failure aborts the run
//! instead of triggering a spurious regeneration.

use crate::config::FleetConfig;
use crate::discovery::HostDescriptor;
use crate::error::Result;
use crate::traits::TopologyStore;
use tracing::{debug, info, warn};

/// What a converge pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvergeOutcome {
    /// Hostnames declared for the first time by this pass
    ///
    /// Exactly this list, never previously-declared hosts, is announced
    /// as bootstrap nodes for the shape's swarm. Hosts declared by an
    /// earlier run are assumed to have been announced by that run.
    pub added_hosts: Vec<String>,

    /// Discovered hosts skipped because they report no public address
    pub skipped_hosts: Vec<String>,
}

/// Reconciles discovered hosts into the declared topology
pub struct TopologyReconciler<'a, T: TopologyStore + ?Sized> {
    store: &'a T,
    config: &'a FleetConfig,
}

impl<'a, T: TopologyStore + ?Sized> TopologyReconciler<'a, T> {
    /// Create a reconciler over the given store
    pub fn new(store: &'a T, config: &'a FleetConfig) -> Self {
        Self { store, config }
    }

    /// Run one reconciliation pass and commit it as a unit
    ///
    /// # Parameters
    ///
    /// - `discovered`: host descriptors from the current discovery pass
    ///
    /// # Returns
    ///
    /// The hosts this pass added (the bootstrap list) and the hosts it
    /// skipped for lack of a public address.
    pub async fn converge(&self, discovered: &[HostDescriptor]) -> Result<ConvergeOutcome> {
        self.ensure_base_declarations().await?;

        let declared = self.store.list_hosts().await?;
        let mut outcome = ConvergeOutcome::default();

        for descriptor in discovered {
            if declared.contains(&descriptor.hostname) {
                debug!("host {} already declared; leaving untouched", descriptor.hostname);
                continue;
            }

            let Some(ip) = descriptor.public_ip else {
                warn!(
                    "host {} has no public address; cannot declare it",
                    descriptor.hostname
                );
                outcome.skipped_hosts.push(descriptor.hostname.clone());
                continue;
            };

            self.declare_host(&descriptor.hostname, ip).await?;
            outcome.added_hosts.push(descriptor.hostname.clone());
        }

        // Only the hosts added by this pass are announced to the swarm.
        self.store
            .add_bootstrap_nodes(&self.config.shape.name, &outcome.added_hosts)
            .await?;

        self.store.commit().await?;

        info!(
            "topology converged: {} added, {} skipped, {} previously declared",
            outcome.added_hosts.len(),
            outcome.skipped_hosts.len(),
            declared.len()
        );
        Ok(outcome)
    }

    /// Declarations that precede any host work
    ///
    /// Domains, the shape's service list, and its port table are fixed
    /// configuration-supplied values and always rewritten. Key material
    /// is create-once and only generated when absent.
    async fn ensure_base_declarations(&self) -> Result<()> {
        let cfg = self.config;

        self.store.set_root_domain(&cfg.root_domain).await?;
        self.store
            .set_generated_domain(&cfg.generated_domain())
            .await?;

        if self.store.domain_validation_key().await?.is_none() {
            debug!("domain validation keys absent; generating");
            self.store.generate_domain_validation().await?;
        }

        if self.store.swarm_key().await?.is_none() {
            debug!("swarm key absent; generating");
            self.store.generate_swarm_key().await?;
        }

        self.store
            .set_signer(&cfg.signer.name, &cfg.signer.username, &cfg.signer.password)
            .await?;

        let shape = &cfg.shape;
        self.store
            .set_shape_services(&shape.name, &shape.services)
            .await?;
        self.store
            .set_shape_port(&shape.name, "main", shape.main_port)
            .await?;
        self.store
            .set_shape_port(&shape.name, "lite", shape.lite_port)
            .await?;

        Ok(())
    }

    /// Declare one newly discovered host
    async fn declare_host(&self, hostname: &str, ip: std::net::Ipv4Addr) -> Result<()> {
        debug!("declaring host {} at {}", hostname, ip);

        self.store
            .add_host_address(hostname, &format!("{ip}/32"))
            .await?;
        self.store
            .set_ssh_address(hostname, &format!("{ip}:22"))
            .await?;
        self.store
            .add_ssh_auth(hostname, std::slice::from_ref(&self.config.signer.name))
            .await?;
        self.store
            .set_location(hostname, &self.config.location)
            .await?;

        let shape = &self.config.shape.name;
        if !self.store.host_shapes(hostname).await?.contains(shape) {
            self.store.generate_shape_instance(hostname, shape).await?;
        }

        Ok(())
    }
}
