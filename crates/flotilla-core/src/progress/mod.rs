//! Displacement progress aggregation
//!
//! Consumes the deployment engine's progress event stream and turns it
//! into a per-host success/failure verdict.
//!
//! ## Stream discipline
//!
//! Events are processed strictly in emission order, one at a time: later
//! events for a host must overwrite earlier progress values, so no
//! reordering or buffering is permitted. Errors are collected, never
//! fail-fast: the stream is always drained to completion before verdicts
//! are finalized, because one host failing does not stop the engine from
//! progressing the others.
//!
//! ## Host state machine
//!
//! `unseen -> active -> {succeeded, failed}`. A host becomes `active` on
//! its first event and terminal only when the stream ends: `failed` if
//! any collected error tuple names it, `succeeded` otherwise.

use crate::error::{Error, HostFailure, Result};
use crate::traits::DisplacementEvent;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

/// Host label used when a path carries no `name:port` segment
pub const UNKNOWN_HOST: &str = "unknown-host";

/// Task label used when a path's final segment is empty
pub const UNKNOWN_TASK: &str = "unknown-task";

/// Derive the host label from an event path
///
/// The label is the name part of the first `name:port` path segment
/// (first segment after a `/` containing a `:` directly followed by a
/// digit). Paths without one yield [`UNKNOWN_HOST`].
pub fn host_label(path: &str) -> String {
    path.split('/')
        .skip(1)
        .find_map(match_host)
        .unwrap_or(UNKNOWN_HOST)
        .to_string()
}

/// The longest non-empty prefix of `segment` ending right before a
/// `:` + digit, if any
fn match_host(segment: &str) -> Option<&str> {
    let bytes = segment.as_bytes();
    for idx in (1..bytes.len()).rev() {
        if bytes[idx] == b':' && bytes.get(idx + 1).is_some_and(u8::is_ascii_digit) {
            return Some(&segment[..idx]);
        }
    }
    None
}

/// Derive the task label from an event path
///
/// The label is the path's final segment; an empty final segment yields
/// [`UNKNOWN_TASK`].
pub fn task_label(path: &str) -> String {
    match path.rsplit('/').next() {
        Some(task) if !task.is_empty() => task.to_string(),
        _ => UNKNOWN_TASK.to_string(),
    }
}

/// Progress tracker for one host during a run
///
/// In-memory only; created on the host's first event, finalized into a
/// [`HostVerdict`] when the stream ends, and discarded with the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRunState {
    /// Last progress value the host reported
    pub last_progress: u8,
    /// Last task label the host reported
    pub last_task: String,
}

/// Terminal state of one host after the stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOutcome {
    /// No error tuple named the host
    Succeeded,
    /// At least one error tuple named the host
    Failed,
}

/// Final per-host verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostVerdict {
    /// Display progress; clamped to 100 regardless of the last report
    pub progress: u8,
    /// Last task the host was seen working on
    pub last_task: String,
    /// Whether the host succeeded or failed
    pub outcome: HostOutcome,
}

/// Aggregate result of one displacement run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Verdict per host, keyed by host label
    pub hosts: BTreeMap<String, HostVerdict>,
    /// Every `(host, task, error)` tuple collected during the run
    pub failures: Vec<HostFailure>,
    /// When consumption of the stream began
    pub started_at: DateTime<Utc>,
    /// When the stream ended
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Whether every host succeeded
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Convert the report into the run's overall result
    ///
    /// A non-empty failure list becomes a single aggregate
    /// [`Error::Displacement`] carrying every collected tuple.
    pub fn into_result(self) -> Result<RunReport> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(Error::Displacement(self.failures))
        }
    }
}

/// Aggregates a displacement event stream into a [`RunReport`]
pub struct ProgressAggregator {
    hosts: BTreeMap<String, HostRunState>,
    failures: Vec<HostFailure>,
    started_at: DateTime<Utc>,
}

impl ProgressAggregator {
    /// Create an aggregator with no hosts seen yet
    pub fn new() -> Self {
        Self {
            hosts: BTreeMap::new(),
            failures: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Fold one event into the per-host state
    ///
    /// First event for a host transitions it `unseen -> active`. Progress
    /// and task labels are updated unconditionally on every event. An
    /// event error is recorded without changing the host's state; the
    /// verdict waits for the stream to end.
    pub fn observe(&mut self, event: &DisplacementEvent) {
        let host = host_label(&event.path);
        let task = task_label(&event.path);

        debug!(
            "displacement progress: host={} task={} progress={}",
            host, task, event.progress
        );

        let state = self.hosts.entry(host.clone()).or_insert_with(|| HostRunState {
            last_progress: 0,
            last_task: String::new(),
        });
        state.last_progress = event.progress;
        state.last_task = task.clone();

        if let Some(error) = &event.error {
            warn!("displacement error: host={} task={}: {}", host, task, error);
            self.failures.push(HostFailure {
                host,
                task,
                error: error.clone(),
            });
        }
    }

    /// Finalize every host after the stream has ended
    pub fn finish(self) -> RunReport {
        let failures = self.failures;
        let hosts = self
            .hosts
            .into_iter()
            .map(|(host, state)| {
                let outcome = if failures.iter().any(|f| f.host == host) {
                    HostOutcome::Failed
                } else {
                    HostOutcome::Succeeded
                };
                let verdict = HostVerdict {
                    progress: 100,
                    last_task: state.last_task,
                    outcome,
                };
                (host, verdict)
            })
            .collect();

        RunReport {
            hosts,
            failures,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }

    /// Drain a displacement event stream to completion
    ///
    /// Consumes events strictly in emission order, suspending between
    /// events; the producer closing the stream signals the end of the
    /// run.
    pub async fn drain<S>(stream: S) -> RunReport
    where
        S: Stream<Item = DisplacementEvent>,
    {
        let mut aggregator = Self::new();
        tokio::pin!(stream);
        while let Some(event) = stream.next().await {
            aggregator.observe(&event);
        }
        aggregator.finish()
    }
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_label_takes_name_of_first_port_segment() {
        assert_eq!(host_label("/node1:4242/apply/auth"), "node1");
        assert_eq!(host_label("/fleet/node2:4262/install"), "node2");
    }

    #[test]
    fn host_label_defaults_without_port_segment() {
        assert_eq!(host_label("/apply/auth"), UNKNOWN_HOST);
        assert_eq!(host_label(""), UNKNOWN_HOST);
        assert_eq!(host_label("node1:4242"), UNKNOWN_HOST); // no leading slash
        assert_eq!(host_label("/node1:x/auth"), UNKNOWN_HOST); // port not numeric
    }

    #[test]
    fn host_label_name_may_contain_colons() {
        assert_eq!(host_label("/[::1]:4242/apply"), "[::1]");
    }

    #[test]
    fn task_label_is_final_segment() {
        assert_eq!(task_label("/node1:4242/apply/auth"), "auth");
        assert_eq!(task_label("/node1:4242/apply/"), UNKNOWN_TASK);
        assert_eq!(task_label(""), UNKNOWN_TASK);
    }

    #[test]
    fn progress_overwrites_in_event_order() {
        let mut aggregator = ProgressAggregator::new();
        aggregator.observe(&DisplacementEvent::progress("/node1:4242/a", 50));
        aggregator.observe(&DisplacementEvent::progress("/node1:4242/b", 20));

        let state = &aggregator.hosts["node1"];
        assert_eq!(state.last_progress, 20);
        assert_eq!(state.last_task, "b");
    }

    #[test]
    fn verdict_progress_is_clamped_to_100() {
        let mut aggregator = ProgressAggregator::new();
        aggregator.observe(&DisplacementEvent::progress("/node1:4242/a", 35));
        let report = aggregator.finish();
        assert_eq!(report.hosts["node1"].progress, 100);
    }
}
