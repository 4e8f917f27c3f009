// # Displacement Engine Trait
//
// Defines the interface to the deployment engine that executes a declared
// change across the fleet ("displacement") and reports progress.
//
// ## Event stream contract
//
// `displace()` returns a stream of [`DisplacementEvent`] values. The
// engine is the single producer; the progress aggregator is the single
// consumer. The stream ends (yields `None`) exactly when the run is
// complete; there is no separate completion signal, and no event is
// emitted after the stream ends.
//
// How the engine computes or executes the displacement is out of scope
// here; this crate only consumes the progress surface.

use tokio_stream::Stream;
use std::pin::Pin;

/// Progress event emitted by the engine during a displacement run
///
/// `path` is a hierarchical slash-separated locator of the form
/// `.../{host}:{port}/.../{task}`; the aggregator derives the host and
/// task labels from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplacementEvent {
    /// Hierarchical locator of the reporting step
    pub path: String,
    /// Progress of that step, 0-100
    pub progress: u8,
    /// Error reported by the step, if any
    pub error: Option<String>,
}

impl DisplacementEvent {
    /// Create a progress event without an error
    pub fn progress(path: impl Into<String>, progress: u8) -> Self {
        Self {
            path: path.into(),
            progress,
            error: None,
        }
    }

    /// Create a progress event carrying an error
    pub fn error(path: impl Into<String>, progress: u8, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            progress,
            error: Some(error.into()),
        }
    }
}

/// Trait for deployment engine implementations
///
/// Implementations must be thread-safe and usable across async tasks.
pub trait DisplacementEngine: Send + Sync {
    /// Execute a displacement across the given shapes
    ///
    /// Returns the run's progress event stream. Events arrive in emission
    /// order, interleaved across hosts; the stream ends when the run
    /// completes.
    fn displace(
        &self,
        shapes: &[String],
    ) -> Pin<Box<dyn Stream<Item = DisplacementEvent> + Send + 'static>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_constructors() {
        let ok = DisplacementEvent::progress("/node1:4242/apply", 50);
        assert_eq!(ok.error, None);

        let failed = DisplacementEvent::error("/node1:4242/apply", 50, "boom");
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }
}
