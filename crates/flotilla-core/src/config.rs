//! Configuration types for the flotilla provisioner
//!
//! This module defines all configuration structures used throughout the
//! crate. Values are typically sourced from environment variables by the
//! `flotillad` binary; the types and their validation live here so the
//! same rules apply to embedded use.

use serde::{Deserialize, Serialize};

/// Main provisioner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Cloud project whose compute resources make up the fleet
    #[serde(default = "default_project_name")]
    pub project_name: String,

    /// Root domain of the cluster
    #[serde(default = "default_root_domain")]
    pub root_domain: String,

    /// Generated-services domain (defaults to `g.{root_domain}`)
    #[serde(default)]
    pub generated_domain: Option<String>,

    /// Credential signer declared for every provisioned host
    pub signer: SignerConfig,

    /// The uniform shape every discovered host joins
    #[serde(default)]
    pub shape: ShapeConfig,

    /// Location string recorded for every provisioned host
    #[serde(default = "default_location")]
    pub location: String,
}

impl FleetConfig {
    /// Create a configuration with defaults around the given signer password
    pub fn new(signer_password: impl Into<String>) -> Self {
        Self {
            project_name: default_project_name(),
            root_domain: default_root_domain(),
            generated_domain: None,
            signer: SignerConfig::new(signer_password),
            shape: ShapeConfig::default(),
            location: default_location(),
        }
    }

    /// The generated-services domain, derived from the root domain when unset
    pub fn generated_domain(&self) -> String {
        self.generated_domain
            .clone()
            .unwrap_or_else(|| format!("g.{}", self.root_domain))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.project_name.is_empty() {
            return Err(crate::Error::config("project name cannot be empty"));
        }
        if self.root_domain.is_empty() || !self.root_domain.contains('.') {
            return Err(crate::Error::config(format!(
                "root domain {:?} is not a valid domain name",
                self.root_domain
            )));
        }
        self.signer.validate()?;
        self.shape.validate()?;
        Ok(())
    }
}

fn default_project_name() -> String {
    "flotilla test".to_string()
}

fn default_root_domain() -> String {
    "pom.ac".to_string()
}

fn default_location() -> String {
    // New York City; every droplet in the fleet is recorded there
    "40.730610, -73.935242".to_string()
}

/// Credential signer declaration
///
/// The signer is ensured once per run with a fixed username and a
/// password sourced from the environment.
#[derive(Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    /// Signer name referenced from each host's SSH auth list
    #[serde(default = "default_signer_name")]
    pub name: String,

    /// Username the signer authenticates as
    #[serde(default = "default_signer_username")]
    pub username: String,

    /// Password for the signer
    ///
    /// Never logged; the Debug output of this struct redacts it.
    pub password: String,
}

// The password never appears in Debug output
impl std::fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerConfig")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

impl SignerConfig {
    /// Create a signer declaration with the default name and username
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            name: default_signer_name(),
            username: default_signer_username(),
            password: password.into(),
        }
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.name.is_empty() {
            return Err(crate::Error::config("signer name cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(crate::Error::config(
                "signer password cannot be empty; set DROPLET_ROOT_PASSWORD",
            ));
        }
        Ok(())
    }
}

fn default_signer_name() -> String {
    "main".to_string()
}

fn default_signer_username() -> String {
    "root".to_string()
}

/// Declaration of the uniform shape all hosts join
///
/// A shape's service list and port table, once set, describe the whole
/// shape uniformly; membership is additive only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeConfig {
    /// Shape name
    #[serde(default = "default_shape_name")]
    pub name: String,

    /// Services declared for every host in the shape
    #[serde(default = "default_services")]
    pub services: Vec<String>,

    /// Main protocol port
    #[serde(default = "default_main_port")]
    pub main_port: u16,

    /// Lite protocol port
    #[serde(default = "default_lite_port")]
    pub lite_port: u16,
}

impl ShapeConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.name.is_empty() {
            return Err(crate::Error::config("shape name cannot be empty"));
        }
        if self.services.is_empty() {
            return Err(crate::Error::config("shape service list cannot be empty"));
        }
        Ok(())
    }
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            name: default_shape_name(),
            services: default_services(),
            main_port: default_main_port(),
            lite_port: default_lite_port(),
        }
    }
}

fn default_shape_name() -> String {
    "all".to_string()
}

fn default_services() -> Vec<String> {
    ["auth", "tns", "hoarder", "seer", "substrate", "patrick", "monkey"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_main_port() -> u16 {
    4242
}

fn default_lite_port() -> u16 {
    4262
}

/// Registrar API credentials
///
/// The three values are all-or-nothing: all absent means DNS
/// reconciliation is skipped, all present means it runs, any other
/// combination is a fatal configuration error.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegistrarConfig {
    /// Registrar API user (doubles as the account username)
    pub api_user: String,
    /// Registrar API key
    pub api_key: String,
    /// Whitelisted caller IP the requests originate from
    pub client_ip: String,
    /// Use the registrar's sandbox endpoint
    #[serde(default)]
    pub sandbox: bool,
}

// The API key never appears in Debug output
impl std::fmt::Debug for RegistrarConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrarConfig")
            .field("api_user", &self.api_user)
            .field("api_key", &"<REDACTED>")
            .field("client_ip", &self.client_ip)
            .field("sandbox", &self.sandbox)
            .finish()
    }
}

impl RegistrarConfig {
    /// Build the gated registrar configuration from optional parts
    ///
    /// # Returns
    ///
    /// - `Ok(None)`: all three values absent; reconciliation is skipped
    /// - `Ok(Some(config))`: all three present
    /// - `Err(Error::Config)`: partial subset present
    pub fn from_parts(
        api_user: Option<String>,
        api_key: Option<String>,
        client_ip: Option<String>,
    ) -> Result<Option<Self>, crate::Error> {
        match (api_user, api_key, client_ip) {
            (None, None, None) => Ok(None),
            (Some(api_user), Some(api_key), Some(client_ip)) => Ok(Some(Self {
                api_user,
                api_key,
                client_ip,
                sandbox: false,
            })),
            _ => Err(crate::Error::config(
                "NAMECHEAP_USERNAME, NAMECHEAP_API_KEY, and NAMECHEAP_IP must \
                 all be set (or all be unset to skip DNS reconciliation)",
            )),
        }
    }

    /// Switch to the registrar's sandbox endpoint
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn registrar_all_absent_is_skip() {
        let cfg = RegistrarConfig::from_parts(None, None, None).unwrap();
        assert!(cfg.is_none());
    }

    #[test]
    fn registrar_all_present_proceeds() {
        let cfg = RegistrarConfig::from_parts(some("user"), some("key"), some("1.2.3.4"))
            .unwrap()
            .unwrap();
        assert_eq!(cfg.api_user, "user");
        assert_eq!(cfg.client_ip, "1.2.3.4");
        assert!(!cfg.sandbox);
    }

    #[test]
    fn registrar_partial_subset_is_config_error() {
        for parts in [
            (some("user"), None, None),
            (None, some("key"), None),
            (None, None, some("1.2.3.4")),
            (some("user"), some("key"), None),
            (some("user"), None, some("1.2.3.4")),
            (None, some("key"), some("1.2.3.4")),
        ] {
            let err = RegistrarConfig::from_parts(parts.0, parts.1, parts.2).unwrap_err();
            assert!(matches!(err, crate::Error::Config(_)));
        }
    }

    #[test]
    fn registrar_debug_redacts_key() {
        let cfg = RegistrarConfig::from_parts(some("user"), some("secret-key-123"), some("1.2.3.4"))
            .unwrap()
            .unwrap();
        let debug = format!("{:?}", cfg);
        assert!(!debug.contains("secret-key-123"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn signer_debug_redacts_password() {
        let cfg = SignerConfig::new("hunter2");
        let debug = format!("{:?}", cfg);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn generated_domain_derived_from_root() {
        let cfg = FleetConfig::new("hunter2");
        assert_eq!(cfg.generated_domain(), "g.pom.ac");

        let mut cfg = cfg;
        cfg.generated_domain = Some("gen.example.org".to_string());
        assert_eq!(cfg.generated_domain(), "gen.example.org");
    }

    #[test]
    fn validate_rejects_empty_password() {
        let cfg = FleetConfig::new("");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn default_shape_declaration() {
        let shape = ShapeConfig::default();
        assert_eq!(shape.name, "all");
        assert_eq!(shape.main_port, 4242);
        assert_eq!(shape.lite_port, 4262);
        assert_eq!(shape.services.len(), 7);
    }
}
