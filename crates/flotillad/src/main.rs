// # flotillad - Fleet Provisioning Daemon
//
// Thin integration layer over flotilla-core. The daemon is responsible
// for:
// 1. Reading configuration from environment variables
// 2. Initializing the runtime and tracing
// 3. Constructing the collaborators (cloud provider, topology store,
//    engine, registrar transport)
// 4. Running the pipeline and mapping the outcome to an exit code
//
// No reconciliation, aggregation, or DNS logic lives here; all of it is
// in flotilla-core behind injected trait seams.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Cloud provider
// - `DIGITALOCEAN_API_TOKEN`: API token (required)
// - `DIGITALOCEAN_PROJECT_NAME`: project holding the fleet
//   (default: "flotilla test")
//
// ### Cluster
// - `FLEET_ROOT_DOMAIN`: root domain (default: pom.ac)
// - `FLEET_GENERATED_DOMAIN`: generated-services domain
//   (default: g.{root})
// - `DROPLET_ROOT_PASSWORD`: password for the provisioned host signer
//   (required)
// - `FLEET_TOPOLOGY_PATH`: topology snapshot file; in-memory when unset
//
// ### Registrar (all-or-nothing; all unset skips DNS reconciliation)
// - `NAMECHEAP_USERNAME`: API user
// - `NAMECHEAP_API_KEY`: API key
// - `NAMECHEAP_IP`: whitelisted caller IP
// - `NAMECHEAP_SANDBOX`: use the sandbox endpoint when set to "1"/"true"
//
// ### Logging
// - `FLEET_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Exit codes
//
// - 0: provisioning, displacement, and DNS completed (DNS may report
//   itself skipped)
// - 1: provisioning or displacement stage failed
// - 2: DNS reconciliation stage failed

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use flotilla_cloud_digitalocean::DigitalOceanProvider;
use flotilla_core::config::{FleetConfig, RegistrarConfig};
use flotilla_core::engine::DryRunEngine;
use flotilla_core::runner::{self, Stage};
use flotilla_core::topology::{FileTopology, MemoryTopology};
use flotilla_core::traits::TopologyStore;
use flotilla_dns_namecheap::NamecheapTransport;

/// Exit codes for the run's distinct outcomes
#[derive(Debug, Clone, Copy)]
enum FleetExitCode {
    /// Every stage completed
    Success = 0,
    /// Provisioning or displacement failed
    DeploymentFailed = 1,
    /// DNS reconciliation failed
    DnsFailed = 2,
}

impl From<FleetExitCode> for ExitCode {
    fn from(code: FleetExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration, straight from the environment
struct Config {
    api_token: String,
    project_name: String,
    root_domain: String,
    generated_domain: Option<String>,
    signer_password: String,
    topology_path: Option<String>,
    registrar_user: Option<String>,
    registrar_key: Option<String>,
    registrar_ip: Option<String>,
    registrar_sandbox: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            api_token: env::var("DIGITALOCEAN_API_TOKEN").map_err(|_| {
                anyhow::anyhow!(
                    "DIGITALOCEAN_API_TOKEN is required. \
                     Set it via: export DIGITALOCEAN_API_TOKEN=your_token"
                )
            })?,
            project_name: env::var("DIGITALOCEAN_PROJECT_NAME")
                .unwrap_or_else(|_| "flotilla test".to_string()),
            root_domain: env::var("FLEET_ROOT_DOMAIN").unwrap_or_else(|_| "pom.ac".to_string()),
            generated_domain: env::var("FLEET_GENERATED_DOMAIN").ok(),
            signer_password: env::var("DROPLET_ROOT_PASSWORD").map_err(|_| {
                anyhow::anyhow!(
                    "DROPLET_ROOT_PASSWORD is required. \
                     Set it via: export DROPLET_ROOT_PASSWORD=your_password"
                )
            })?,
            topology_path: env::var("FLEET_TOPOLOGY_PATH").ok(),
            registrar_user: env::var("NAMECHEAP_USERNAME").ok(),
            registrar_key: env::var("NAMECHEAP_API_KEY").ok(),
            registrar_ip: env::var("NAMECHEAP_IP").ok(),
            registrar_sandbox: matches!(
                env::var("NAMECHEAP_SANDBOX").unwrap_or_default().as_str(),
                "1" | "true"
            ),
            log_level: env::var("FLEET_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// The registrar credential gate is deliberately not validated here:
    /// it belongs to the DNS stage and resolves after displacement.
    fn validate(&self) -> anyhow::Result<()> {
        if self.api_token.is_empty() {
            anyhow::bail!("DIGITALOCEAN_API_TOKEN cannot be empty");
        }

        let token_lower = self.api_token.to_lowercase();
        if token_lower.contains("your_token") || token_lower.contains("replace_me") {
            anyhow::bail!(
                "DIGITALOCEAN_API_TOKEN appears to be a placeholder. \
                 Use an actual API token."
            );
        }

        if self.signer_password.is_empty() {
            anyhow::bail!("DROPLET_ROOT_PASSWORD cannot be empty");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "FLEET_LOG_LEVEL '{}' is not valid. \
                 Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// The core configuration this environment describes
    fn fleet_config(&self) -> FleetConfig {
        let mut config = FleetConfig::new(self.signer_password.clone());
        config.project_name = self.project_name.clone();
        config.root_domain = self.root_domain.clone();
        config.generated_domain = self.generated_domain.clone();
        config
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return FleetExitCode::DeploymentFailed.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return FleetExitCode::DeploymentFailed.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FleetExitCode::DeploymentFailed.into();
    }

    info!("Starting flotillad");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FleetExitCode::DeploymentFailed.into();
        }
    };

    rt.block_on(run_daemon(config)).into()
}

/// Construct the collaborators and run the pipeline once
async fn run_daemon(config: Config) -> FleetExitCode {
    let fleet_config = config.fleet_config();
    let cloud = DigitalOceanProvider::new(&config.api_token);

    let topology: Arc<dyn TopologyStore> = match &config.topology_path {
        Some(path) => {
            info!("Using topology snapshot at {}", path);
            match FileTopology::new(path).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    error!("Failed to open topology snapshot: {}", e);
                    return FleetExitCode::DeploymentFailed;
                }
            }
        }
        None => {
            info!("No FLEET_TOPOLOGY_PATH set; declared topology is in-memory only");
            Arc::new(MemoryTopology::new())
        }
    };

    // A real deployment engine plugs in through the DisplacementEngine
    // trait; the shipped engine reports shape members without touching
    // any host.
    let engine = DryRunEngine::new(Arc::clone(&topology));

    // Resolved here, surfaced in the DNS stage.
    let registrar = RegistrarConfig::from_parts(
        config.registrar_user.clone(),
        config.registrar_key.clone(),
        config.registrar_ip.clone(),
    )
    .map(|gate| {
        gate.map(|credentials| {
            NamecheapTransport::new(&credentials.with_sandbox(config.registrar_sandbox))
        })
    });

    let gate = registrar
        .as_ref()
        .map(|transport| transport.as_ref())
        .map_err(|e| flotilla_core::Error::config(e.to_string()));

    match runner::run(&cloud, &*topology, &engine, gate, &fleet_config).await {
        Ok(summary) => {
            info!(
                "Run complete: {} host(s) added, {} host(s) displaced, DNS {:?}",
                summary.converge.added_hosts.len(),
                summary.report.hosts.len(),
                summary.dns
            );
            FleetExitCode::Success
        }
        Err(e) => {
            error!("{}", e);
            match e.stage {
                Stage::Provision | Stage::Displacement => FleetExitCode::DeploymentFailed,
                Stage::Dns => FleetExitCode::DnsFailed,
            }
        }
    }
}
