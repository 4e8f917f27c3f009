// # Registrar Transport Trait
//
// Defines the interface to the domain registrar's host-record API.
//
// ## Implementations
//
// - Namecheap: `flotilla-dns-namecheap` crate
//
// ## Full-snapshot contract
//
// The registrar API has no incremental-update primitive: reads return the
// domain's complete record list, and writes replace it wholesale. The
// transport therefore exposes exactly two operations (fetch everything,
// replace everything) and all record-set editing happens against the
// local mirror owned by [`crate::dns::DnsReconciler`].
//
// Transports are untrusted adapters: they perform API calls against their
// endpoints, parse responses, and report success or failure. They must not
// edit record sets, retry, or cache anything between requests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One DNS host record as held by the registrar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Host name relative to the domain (e.g. `seer`, `*.g`, `@`)
    pub name: String,
    /// Record type (`A`, `NS`, `CNAME`, ...)
    pub record_type: String,
    /// Record data: an address, a target host name, etc.
    pub address: String,
    /// Time-to-live; records without one get the registrar default at commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
}

impl DnsRecord {
    /// Create a record with no explicit TTL
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            address: address.into(),
            ttl: None,
        }
    }

    /// Whether this record belongs to the given (name, type) group
    pub fn in_group(&self, name: &str, record_type: &str) -> bool {
        self.name == name && self.record_type == record_type
    }
}

/// A registrable domain split into second-level and top-level parts
///
/// The registrar API addresses domains as an (SLD, TLD) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainName {
    /// Second-level part (`pom` in `pom.ac`)
    pub sld: String,
    /// Top-level part, possibly multi-label (`ac`, or `co.uk`)
    pub tld: String,
}

impl DomainName {
    /// Parse a dotted domain name into its registrar addressing parts
    pub fn parse(domain: &str) -> Result<Self, crate::Error> {
        match domain.split_once('.') {
            Some((sld, tld)) if !sld.is_empty() && !tld.is_empty() => Ok(Self {
                sld: sld.to_string(),
                tld: tld.to_string(),
            }),
            _ => Err(crate::Error::config(format!(
                "domain {:?} is not a registrable name",
                domain
            ))),
        }
    }
}

impl std::fmt::Display for DomainName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.sld, self.tld)
    }
}

/// Trait for registrar transport implementations
#[async_trait]
pub trait RegistrarTransport: Send + Sync {
    /// Fetch the domain's complete current host-record list
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<DnsRecord>)`: every record the registrar holds
    /// - `Err(Error::RemoteParse)`: response lacked the expected structure
    async fn fetch_records(&self, domain: &DomainName) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Replace the domain's record set with the given records, atomically
    ///
    /// The slice is the entire desired state; any record the registrar
    /// holds that is not in it will cease to exist.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: registrar acknowledged the new record set
    /// - `Err(Error::CommitRejected)`: registrar response status was not
    ///   the success marker
    async fn replace_records(
        &self,
        domain: &DomainName,
        records: &[DnsRecord],
    ) -> Result<(), crate::Error>;
}
