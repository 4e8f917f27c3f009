// # Namecheap Registrar Transport
//
// This crate provides a Namecheap implementation of the RegistrarTransport
// trait for the flotilla provisioner.
//
// ## API shape
//
// Namecheap's API is XML-over-HTTP GET: every call is the same endpoint
// with a `Command` query parameter, authentication repeated in the query
// string, and a structured XML document in response. The two commands
// used here:
//
// - `namecheap.domains.dns.getHosts`: the domain's full host-record list
// - `namecheap.domains.dns.setHosts`: replace the full list; records are
//   numbered positionally (`HostName1`, `RecordType1`, `Address1`,
//   `TTL1`, `HostName2`, ...)
//
// There is no partial-update command; the core's record mirror exists
// because of exactly this shape.
//
// ## Scope
//
// - One HTTP request per trait call, no caching, no retries
// - Request building and response parsing are pure functions, unit-tested
//   on fixture XML
// - A response without `Status="OK"` on commit is `Error::CommitRejected`;
//   a response missing the expected result structure is
//   `Error::RemoteParse`
//
// ## Security Requirements
//
// - API key NEVER appears in logs or Debug output

use async_trait::async_trait;
use flotilla_core::config::RegistrarConfig;
use flotilla_core::traits::{DnsRecord, DomainName, RegistrarTransport};
use flotilla_core::{Error, Result};
use std::time::Duration;

/// Production API endpoint
const PRODUCTION_API_BASE: &str = "https://api.namecheap.com/xml.response";

/// Sandbox API endpoint
const SANDBOX_API_BASE: &str = "https://api.sandbox.namecheap.com/xml.response";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// TTL applied at commit to records without an explicit one
const DEFAULT_TTL: &str = "1800";

/// Namecheap registrar transport
pub struct NamecheapTransport {
    api_user: String,
    /// ⚠️ NEVER log this value
    api_key: String,
    client_ip: String,
    base_url: &'static str,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for NamecheapTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamecheapTransport")
            .field("api_user", &self.api_user)
            .field("api_key", &"<REDACTED>")
            .field("client_ip", &self.client_ip)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl NamecheapTransport {
    /// Create a transport from gated registrar credentials
    pub fn new(config: &RegistrarConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            api_user: config.api_user.clone(),
            api_key: config.api_key.clone(),
            client_ip: config.client_ip.clone(),
            base_url: if config.sandbox {
                SANDBOX_API_BASE
            } else {
                PRODUCTION_API_BASE
            },
            client,
        }
    }

    /// Authentication parameters repeated on every request
    ///
    /// `UserName` duplicates `ApiUser`; the API authenticates the key
    /// against one and acts on behalf of the other.
    fn auth_params(&self) -> Vec<(String, String)> {
        vec![
            ("ApiUser".to_string(), self.api_user.clone()),
            ("ApiKey".to_string(), self.api_key.clone()),
            ("UserName".to_string(), self.api_user.clone()),
            ("ClientIp".to_string(), self.client_ip.clone()),
        ]
    }

    /// Perform one API call and return the response body
    async fn request(&self, params: Vec<(String, String)>) -> Result<String> {
        let mut query = self.auth_params();
        query.extend(params);

        let response = self
            .client
            .get(self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::http(format!("registrar request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::http(format!(
                "registrar returned HTTP {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::http(format!("failed to read registrar response: {e}")))
    }
}

/// Query parameters for the getHosts command
fn get_hosts_params(domain: &DomainName) -> Vec<(String, String)> {
    vec![
        (
            "Command".to_string(),
            "namecheap.domains.dns.getHosts".to_string(),
        ),
        ("SLD".to_string(), domain.sld.clone()),
        ("TLD".to_string(), domain.tld.clone()),
    ]
}

/// Query parameters for the setHosts command
///
/// Every record is serialized (full-snapshot semantics) with fields
/// numbered positionally from 1. Records without an explicit TTL get
/// [`DEFAULT_TTL`].
fn set_hosts_params(domain: &DomainName, records: &[DnsRecord]) -> Vec<(String, String)> {
    let mut params = vec![
        (
            "Command".to_string(),
            "namecheap.domains.dns.setHosts".to_string(),
        ),
        ("SLD".to_string(), domain.sld.clone()),
        ("TLD".to_string(), domain.tld.clone()),
    ];

    for (index, record) in records.iter().enumerate() {
        let n = index + 1;
        params.push((format!("HostName{n}"), record.name.clone()));
        params.push((format!("RecordType{n}"), record.record_type.clone()));
        params.push((format!("Address{n}"), record.address.clone()));
        params.push((
            format!("TTL{n}"),
            record.ttl.clone().unwrap_or_else(|| DEFAULT_TTL.to_string()),
        ));
    }

    params
}

/// Parse a getHosts response into records
///
/// The expected structure is
/// `ApiResponse > CommandResponse > DomainDNSGetHostsResult > host*`;
/// its absence is a [`Error::RemoteParse`].
fn parse_get_hosts(xml: &str) -> Result<Vec<DnsRecord>> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| Error::remote_parse(format!("invalid XML: {e}")))?;

    let result = doc
        .descendants()
        .find(|node| node.has_tag_name("DomainDNSGetHostsResult"))
        .ok_or_else(|| Error::remote_parse("response carries no DomainDNSGetHostsResult"))?;

    let mut records = Vec::new();
    for host in result.children().filter(|node| node.has_tag_name("host")) {
        let attr = |name: &str| -> Result<String> {
            host.attribute(name)
                .map(str::to_string)
                .ok_or_else(|| Error::remote_parse(format!("host record missing {name} attribute")))
        };

        records.push(DnsRecord {
            name: attr("Name")?,
            record_type: attr("Type")?,
            address: attr("Address")?,
            ttl: host.attribute("TTL").map(str::to_string),
        });
    }

    Ok(records)
}

/// Check a setHosts response for the success status marker
///
/// Anything other than `Status="OK"` on the response root is a rejected
/// commit; the registrar's error text is carried in the message.
fn ensure_committed(xml: &str) -> Result<()> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| Error::remote_parse(format!("invalid XML: {e}")))?;

    let root = doc.root_element();
    let status = root
        .attribute("Status")
        .ok_or_else(|| Error::remote_parse("response carries no Status attribute"))?;

    if status == "OK" {
        return Ok(());
    }

    let errors: Vec<&str> = doc
        .descendants()
        .filter(|node| node.has_tag_name("Error"))
        .filter_map(|node| node.text())
        .collect();

    Err(Error::commit_rejected(if errors.is_empty() {
        format!("status {status}")
    } else {
        format!("status {status}: {}", errors.join("; "))
    }))
}

#[async_trait]
impl RegistrarTransport for NamecheapTransport {
    async fn fetch_records(&self, domain: &DomainName) -> Result<Vec<DnsRecord>> {
        tracing::debug!("fetching host records for {}", domain);
        let xml = self.request(get_hosts_params(domain)).await?;
        let records = parse_get_hosts(&xml)?;
        tracing::debug!("registrar holds {} record(s) for {}", records.len(), domain);
        Ok(records)
    }

    async fn replace_records(&self, domain: &DomainName, records: &[DnsRecord]) -> Result<()> {
        tracing::debug!(
            "replacing {} with {} record(s)",
            domain,
            records.len()
        );
        let xml = self.request(set_hosts_params(domain, records)).await?;
        ensure_committed(&xml)
    }
}
