//! DNS record-set reconciliation
//!
//! The registrar API has no incremental-update primitive: it only ever
//! returns or accepts a domain's complete host-record list. Reconciliation
//! therefore works on a local mirror: fetch everything, edit groups of
//! records in memory, and commit the entire mirror back in one request.
//! Losing even one untouched record from the mirror before commit would
//! silently delete it at the registrar, so the mirror is only ever edited
//! through the group operations below.
//!
//! The mirror is mutated only by the single reconciliation call path;
//! nothing else references it between load and commit.

use crate::config::FleetConfig;
use crate::error::Result;
use crate::traits::{DnsRecord, DomainName, RegistrarTransport, TopologyStore};
use tracing::{debug, info, warn};

/// Local mirror of a domain's record set, editable by (name, type) group
pub struct DnsReconciler<'a, R: RegistrarTransport + ?Sized> {
    transport: &'a R,
    domain: DomainName,
    records: Vec<DnsRecord>,
}

impl<'a, R: RegistrarTransport + ?Sized> DnsReconciler<'a, R> {
    /// Create a reconciler with an empty mirror
    ///
    /// Call [`load_all`](Self::load_all) before editing; committing an
    /// unloaded mirror would erase every record the registrar holds.
    pub fn new(transport: &'a R, domain: DomainName) -> Self {
        Self {
            transport,
            domain,
            records: Vec::new(),
        }
    }

    /// Fetch the registrar's full current record list into the mirror
    pub async fn load_all(&mut self) -> Result<()> {
        self.records = self.transport.fetch_records(&self.domain).await?;
        debug!(
            "loaded {} record(s) for {}",
            self.records.len(),
            self.domain
        );
        Ok(())
    }

    /// The current mirror contents
    pub fn records(&self) -> &[DnsRecord] {
        &self.records
    }

    /// Records of one (name, type) group
    pub fn get_all(&self, name: &str, record_type: &str) -> Vec<&DnsRecord> {
        self.records
            .iter()
            .filter(|record| record.in_group(name, record_type))
            .collect()
    }

    /// Append one record to the mirror
    pub fn add(&mut self, record: DnsRecord) {
        self.records.push(record);
    }

    /// Remove every record of one (name, type) group
    pub fn delete_all(&mut self, name: &str, record_type: &str) {
        self.records
            .retain(|record| !record.in_group(name, record_type));
    }

    /// Replace one (name, type) group with the given addresses
    ///
    /// Every matching record is removed, then one record per address is
    /// appended with no explicit TTL (the transport defaults it at
    /// commit). An empty address list deletes the group. Records of
    /// other groups are untouched.
    pub fn set_all(&mut self, name: &str, record_type: &str, addresses: &[String]) {
        self.delete_all(name, record_type);
        for address in addresses {
            self.records
                .push(DnsRecord::new(name, record_type, address));
        }
    }

    /// Commit the entire mirror to the registrar in one request
    ///
    /// Full-snapshot semantics: every record is sent, not just changed
    /// ones. A rejected commit leaves the mirror unchanged, so the caller
    /// may retry with the same state.
    pub async fn commit(&self) -> Result<()> {
        self.transport
            .replace_records(&self.domain, &self.records)
            .await
    }
}

/// Strip the prefix-length suffix from a CIDR address string
fn extract_ip(cidr: &str) -> &str {
    cidr.split('/').next().unwrap_or(cidr)
}

/// Collect the addresses of every host in the given shape
///
/// Addresses are declared as /32 CIDR strings; the suffix is stripped
/// for use as DNS record data.
pub async fn shape_member_addresses<T: TopologyStore + ?Sized>(
    topology: &T,
    shape: &str,
) -> Result<Vec<String>> {
    let mut addresses = Vec::new();
    for host in topology.list_hosts().await? {
        if topology.host_shapes(&host).await?.iter().any(|s| s == shape) {
            for cidr in topology.host_addresses(&host).await? {
                addresses.push(extract_ip(&cidr).to_string());
            }
        }
    }
    Ok(addresses)
}

/// Reconcile the cluster's public DNS records with the topology
///
/// The plan, derived from the root domain and shape membership:
/// - `seer` A records point at every address of every host in the shape
/// - `tau` is NS-delegated to `seer.{root}.`
/// - the generated-services wildcard CNAMEs to `substrate.tau.{root}.`
pub async fn reconcile_cluster_dns<T, R>(
    topology: &T,
    transport: &R,
    config: &FleetConfig,
) -> Result<()>
where
    T: TopologyStore + ?Sized,
    R: RegistrarTransport + ?Sized,
{
    let root = &config.root_domain;
    let domain = DomainName::parse(root)?;
    let addresses = shape_member_addresses(topology, &config.shape.name).await?;

    let mut reconciler = DnsReconciler::new(transport, domain);
    reconciler.load_all().await?;

    reconciler.set_all("seer", "A", &addresses);
    reconciler.set_all("tau", "NS", &[format!("seer.{root}.")]);

    let generated = config.generated_domain();
    match generated.strip_suffix(&format!(".{root}")) {
        Some(prefix) => {
            reconciler.set_all(
                &format!("*.{prefix}"),
                "CNAME",
                &[format!("substrate.tau.{root}.")],
            );
        }
        None => warn!(
            "generated domain {} is not under {}; leaving wildcard records alone",
            generated, root
        ),
    }

    reconciler.commit().await?;
    info!(
        "committed {} record(s) for {} ({} shape address(es))",
        reconciler.records().len(),
        root,
        addresses.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_ip_strips_prefix_length() {
        assert_eq!(extract_ip("203.0.113.7/32"), "203.0.113.7");
        assert_eq!(extract_ip("203.0.113.7"), "203.0.113.7");
    }
}
