//! Run pipeline
//!
//! The explicit entry point tying the stages together: provision
//! (discover + reconcile), displace + aggregate progress, reconcile DNS.
//! Collaborators are injected so the whole pipeline runs against fakes in
//! tests and against real adapters in `flotillad`.
//!
//! Failure of any stage is terminal for the run; there is no retry loop.
//! Errors carry the stage they arose in so the binary can exit with a
//! stage-specific code.

use crate::config::FleetConfig;
use crate::discovery::ResourceDiscovery;
use crate::dns;
use crate::error::Error;
use crate::progress::{HostOutcome, ProgressAggregator, RunReport};
use crate::reconcile::{ConvergeOutcome, TopologyReconciler};
use crate::traits::{ComputeProvider, DisplacementEngine, RegistrarTransport, TopologyStore};
use tracing::{error, info};

/// Top-level pipeline stages, for error attribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Discovery plus topology reconciliation
    Provision,
    /// Displacement execution and progress aggregation
    Displacement,
    /// DNS record-set reconciliation
    Dns,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Provision => write!(f, "provisioning"),
            Stage::Displacement => write!(f, "displacement"),
            Stage::Dns => write!(f, "DNS reconciliation"),
        }
    }
}

/// A stage failure, terminal for the run
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    /// The stage that failed
    pub stage: Stage,
    /// The underlying error
    #[source]
    pub source: Error,
}

impl StageError {
    fn new(stage: Stage, source: Error) -> Self {
        Self { stage, source }
    }
}

/// How the DNS stage concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsOutcome {
    /// Record set reconciled and committed
    Applied,
    /// No registrar credentials configured; nothing attempted
    Skipped,
}

/// What a completed run did
#[derive(Debug)]
pub struct RunSummary {
    /// Hosts added and skipped by the converge pass
    pub converge: ConvergeOutcome,
    /// Per-host displacement verdicts
    pub report: RunReport,
    /// Whether DNS was reconciled or skipped
    pub dns: DnsOutcome,
}

/// Execute one full provisioning run
///
/// # Parameters
///
/// - `registrar`: the resolved environment gate. `Ok(None)` skips DNS
///   reconciliation; `Err` (a partial credential set) is a DNS-stage
///   failure, surfaced only after displacement completes; gate
///   resolution belongs to the DNS stage, not to startup.
///
/// # Returns
///
/// - `Ok(RunSummary)`: every stage completed (DNS possibly skipped)
/// - `Err(StageError)`: the first stage that failed, with its cause
pub async fn run<C, T, E, R>(
    cloud: &C,
    topology: &T,
    engine: &E,
    registrar: Result<Option<&R>, Error>,
    config: &FleetConfig,
) -> Result<RunSummary, StageError>
where
    C: ComputeProvider + ?Sized,
    T: TopologyStore + ?Sized,
    E: DisplacementEngine + ?Sized,
    R: RegistrarTransport + ?Sized,
{
    // --- provision ---
    info!("Provisioning from project {:?}...", config.project_name);

    config
        .validate()
        .map_err(|e| StageError::new(Stage::Provision, e))?;

    let discovered = ResourceDiscovery::new(cloud)
        .discover(&config.project_name)
        .await
        .map_err(|e| StageError::new(Stage::Provision, e))?;

    let converge = TopologyReconciler::new(topology, config)
        .converge(&discovered)
        .await
        .map_err(|e| StageError::new(Stage::Provision, e))?;

    info!("[Done] Provisioning");

    // --- displace ---
    info!("Displacement...");

    let stream = engine.displace(std::slice::from_ref(&config.shape.name));
    let report = ProgressAggregator::drain(stream).await;

    for (host, verdict) in &report.hosts {
        match verdict.outcome {
            HostOutcome::Succeeded => info!("{}: successful ({})", host, verdict.last_task),
            HostOutcome::Failed => error!("{}: failed ({})", host, verdict.last_task),
        }
    }

    let report = report.into_result().map_err(|e| {
        if let Some(failures) = e.host_failures() {
            for failure in failures {
                error!("{}", failure);
            }
        }
        StageError::new(Stage::Displacement, e)
    })?;

    info!("[Done] Displacement");

    // --- DNS ---
    info!("Update DNS Records...");

    let dns = match registrar {
        Ok(Some(transport)) => {
            dns::reconcile_cluster_dns(topology, transport, config)
                .await
                .map_err(|e| StageError::new(Stage::Dns, e))?;
            info!("[Done] DNS Records");
            DnsOutcome::Applied
        }
        Ok(None) => {
            info!("[Skip] DNS Records");
            DnsOutcome::Skipped
        }
        Err(e) => return Err(StageError::new(Stage::Dns, e)),
    };

    Ok(RunSummary {
        converge,
        report,
        dns,
    })
}
