// # Engine Implementations
//
// Implementations of the DisplacementEngine trait that ship with the
// core. A real deployment engine is an external system reached through
// the trait; what lives here is the dry-run stand-in.

use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::traits::{DisplacementEngine, DisplacementEvent, TopologyStore};

/// Dry-run engine: reports every shape member as displaced
///
/// Emits one synthetic 100%-progress event per host that is a member of
/// any of the displaced shapes, then ends the stream. No host is
/// touched. Lets the full pipeline (provisioning, progress aggregation,
/// DNS reconciliation) be exercised end-to-end without a real engine;
/// a real engine implementation plugs in through the same trait.
///
/// Membership is read when `displace` runs, so hosts declared by the
/// provisioning pass that precedes displacement are included.
pub struct DryRunEngine {
    topology: Arc<dyn TopologyStore>,
}

impl DryRunEngine {
    /// Create a dry-run engine over the given topology
    pub fn new(topology: Arc<dyn TopologyStore>) -> Self {
        Self { topology }
    }
}

impl DisplacementEngine for DryRunEngine {
    fn displace(
        &self,
        shapes: &[String],
    ) -> Pin<Box<dyn Stream<Item = DisplacementEvent> + Send + 'static>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let topology = Arc::clone(&self.topology);
        let shapes = shapes.to_vec();

        // Producer task; closing the channel on return signals stream end.
        tokio::spawn(async move {
            let hosts = match topology.list_hosts().await {
                Ok(hosts) => hosts,
                Err(e) => {
                    let _ = tx.send(DisplacementEvent::error("/dry-run", 0, e.to_string()));
                    return;
                }
            };

            for host in hosts {
                let member = match topology.host_shapes(&host).await {
                    Ok(memberships) => memberships.iter().any(|s| shapes.contains(s)),
                    Err(e) => {
                        let _ = tx.send(DisplacementEvent::error(
                            format!("/{host}:0/dry-run"),
                            0,
                            e.to_string(),
                        ));
                        continue;
                    }
                };

                if member {
                    let event = DisplacementEvent::progress(format!("/{host}:0/dry-run"), 100);
                    if tx.send(event).is_err() {
                        return;
                    }
                }
            }
        });

        Box::pin(UnboundedReceiverStream::new(rx))
    }
}
