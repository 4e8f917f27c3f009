// # DigitalOcean Compute Provider
//
// This crate provides a DigitalOcean implementation of the ComputeProvider
// trait for the flotilla provisioner.
//
// ## Scope
//
// - One HTTP request per trait call, no caching, no retries (a failed
//   discovery is terminal for the run; there is no retry loop anywhere
//   in the core)
// - HTTP timeout configured (30 seconds)
// - Specific error handling for HTTP status codes (401/403, 404, 429, 5xx)
// - Vendor payloads are parsed into the core's typed records; kind
//   filtering and URN parsing stay in the core's discovery layer
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - API token MUST be provided via environment variables only
//
// ## API Reference
//
// - DigitalOcean API v2: https://docs.digitalocean.com/reference/api/
// - List Projects: GET `/v2/projects`
// - List Project Resources: GET `/v2/projects/:id/resources`
// - Get Droplet: GET `/v2/droplets/:id`

use async_trait::async_trait;
use flotilla_core::traits::{ComputeProvider, Instance, NetworkInterface, Project, ResourceRef};
use flotilla_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// DigitalOcean API base URL
const DIGITALOCEAN_API_BASE: &str = "https://api.digitalocean.com/v2";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for list requests; fleets are far smaller than one page
const LIST_PAGE_SIZE: u32 = 200;

/// DigitalOcean compute provider
pub struct DigitalOceanProvider {
    /// DigitalOcean API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for DigitalOceanProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigitalOceanProvider")
            .field("api_token", &"<REDACTED>")
            .finish()
    }
}

impl DigitalOceanProvider {
    /// Create a new DigitalOcean provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: DigitalOcean personal access token with read scope
    ///
    /// # Panics
    ///
    /// Panics if the token is empty; callers validate configuration
    /// before constructing the provider.
    pub fn new(api_token: impl Into<String>) -> Self {
        let api_token = api_token.into();
        if api_token.is_empty() {
            panic!("DigitalOcean API token cannot be empty");
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self { api_token, client }
    }

    /// Perform one GET request and parse the JSON response
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        context: &str,
    ) -> Result<T> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::cloud(format!("{context}: HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(match status.as_u16() {
                401 | 403 => Error::cloud(format!(
                    "{context}: authentication failed; invalid API token or insufficient \
                     permissions (status {status})"
                )),
                404 => Error::cloud(format!("{context}: not found (status {status})")),
                429 => Error::cloud(format!(
                    "{context}: rate limit exceeded, retry later (status {status})"
                )),
                500..=599 => Error::cloud(format!(
                    "{context}: DigitalOcean server error (transient): {status} - {error_text}"
                )),
                _ => Error::cloud(format!("{context}: {status} - {error_text}")),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::cloud(format!("{context}: failed to parse response: {e}")))
    }
}

/// Response envelope for `GET /v2/projects`
#[derive(Debug, Deserialize)]
struct ProjectsResponse {
    projects: Vec<Project>,
}

/// Response envelope for `GET /v2/projects/:id/resources`
#[derive(Debug, Deserialize)]
struct ResourcesResponse {
    resources: Vec<ResourceRef>,
}

/// Response envelope for `GET /v2/droplets/:id`
#[derive(Debug, Deserialize)]
struct DropletResponse {
    droplet: DropletPayload,
}

/// Droplet fields consumed from the vendor payload
#[derive(Debug, Deserialize)]
struct DropletPayload {
    name: String,
    networks: NetworksPayload,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NetworksPayload {
    #[serde(default)]
    v4: Vec<NetworkInterface>,
}

impl From<DropletPayload> for Instance {
    fn from(droplet: DropletPayload) -> Self {
        Instance {
            name: droplet.name,
            networks: droplet.networks.v4,
            tags: droplet.tags,
        }
    }
}

#[async_trait]
impl ComputeProvider for DigitalOceanProvider {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let url = format!("{DIGITALOCEAN_API_BASE}/projects?per_page={LIST_PAGE_SIZE}");
        let response: ProjectsResponse = self.get_json(&url, "list projects").await?;
        Ok(response.projects)
    }

    async fn list_project_resources(&self, project_id: &str) -> Result<Vec<ResourceRef>> {
        let url = format!(
            "{DIGITALOCEAN_API_BASE}/projects/{project_id}/resources?per_page={LIST_PAGE_SIZE}"
        );
        let response: ResourcesResponse =
            self.get_json(&url, "list project resources").await?;
        Ok(response.resources)
    }

    async fn get_instance(&self, instance_id: u64) -> Result<Instance> {
        let url = format!("{DIGITALOCEAN_API_BASE}/droplets/{instance_id}");
        let response: DropletResponse = self.get_json(&url, "get droplet").await?;
        Ok(response.droplet.into())
    }
}
