//! Prometheus metrics for the governance node.
//!
//! [`GovernanceMetrics`] owns a dedicated [`Registry`] whose contents can be
//! rendered in the Prometheus text exposition format with
//! [`GovernanceMetrics::encode`]. With an export path set, [`export`] writes
//! that text to a file a textfile collector (or `agora-daemon node metrics`)
//! can read.
//!
//! [`export`]: GovernanceMetrics::export

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use agora_governance::{GovernanceStats, TickReport};

use crate::NodeError;

/// Central collection of governance Prometheus metrics.
pub struct GovernanceMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Scheduler ticks completed.
    pub ticks: IntCounter,
    /// Ticks stopped early by shutdown.
    pub ticks_interrupted: IntCounter,
    /// Per-proposal failures reported by ticks.
    pub tick_failures: IntCounter,
    /// State transitions applied by ticks, labelled by the state entered.
    pub transitions: IntCounterVec,
    /// Proposals executed by ticks.
    pub executions: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub proposals_total: IntGauge,
    pub proposals_active: IntGauge,
    pub proposals_queued: IntGauge,
    pub votes_total: IntGauge,
    pub unique_voters: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Wall time of one tick, in milliseconds.
    pub tick_duration_ms: Histogram,

    export_path: Option<PathBuf>,
}

impl GovernanceMetrics {
    /// Create a fresh set of metrics, all registered under a new [`Registry`].
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let ticks = register_int_counter_with_registry!(
            Opts::new("agora_ticks_total", "Governance ticks completed"),
            registry
        )?;
        let ticks_interrupted = register_int_counter_with_registry!(
            Opts::new(
                "agora_ticks_interrupted_total",
                "Governance ticks stopped early by shutdown"
            ),
            registry
        )?;
        let tick_failures = register_int_counter_with_registry!(
            Opts::new(
                "agora_tick_failures_total",
                "Proposals that failed to advance during a tick"
            ),
            registry
        )?;
        let transitions = register_int_counter_vec_with_registry!(
            Opts::new(
                "agora_transitions_total",
                "Proposal state transitions applied by ticks"
            ),
            &["state"],
            registry
        )?;
        let executions = register_int_counter_with_registry!(
            Opts::new("agora_executions_total", "Proposals executed"),
            registry
        )?;

        let proposals_total = register_int_gauge_with_registry!(
            Opts::new("agora_proposals", "Proposals ever created"),
            registry
        )?;
        let proposals_active = register_int_gauge_with_registry!(
            Opts::new("agora_proposals_active", "Proposals currently open for voting"),
            registry
        )?;
        let proposals_queued = register_int_gauge_with_registry!(
            Opts::new("agora_proposals_queued", "Proposals waiting out their timelock"),
            registry
        )?;
        let votes_total = register_int_gauge_with_registry!(
            Opts::new("agora_votes", "Votes recorded across all proposals"),
            registry
        )?;
        let unique_voters = register_int_gauge_with_registry!(
            Opts::new("agora_unique_voters", "Distinct addresses that have voted"),
            registry
        )?;

        let tick_duration_ms = register_histogram_with_registry!(
            HistogramOpts::new("agora_tick_duration_ms", "Wall time of one governance tick")
                .buckets(vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1_000.0, 5_000.0]),
            registry
        )?;

        Ok(Self {
            registry,
            ticks,
            ticks_interrupted,
            tick_failures,
            transitions,
            executions,
            proposals_total,
            proposals_active,
            proposals_queued,
            votes_total,
            unique_voters,
            tick_duration_ms,
            export_path: None,
        })
    }

    /// Write the encoded registry to `path` on every [`export`](Self::export).
    pub fn with_export_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.export_path = Some(path.into());
        self
    }

    pub fn export_path(&self) -> Option<&Path> {
        self.export_path.as_deref()
    }

    pub fn observe_tick(&self, report: &TickReport, elapsed: Duration) {
        self.ticks.inc();
        if report.interrupted {
            self.ticks_interrupted.inc();
        }
        self.tick_failures.inc_by(report.failures.len() as u64);
        for (_, state) in &report.transitions {
            self.transitions.with_label_values(&[state.as_str()]).inc();
        }
        self.executions.inc_by(report.executed().count() as u64);
        self.tick_duration_ms
            .observe(elapsed.as_secs_f64() * 1_000.0);
    }

    pub fn observe_stats(&self, stats: &GovernanceStats) {
        self.proposals_total.set(clamp(stats.total_proposals));
        self.proposals_active.set(clamp(stats.active_proposals));
        self.proposals_queued.set(clamp(stats.queued_proposals));
        self.votes_total.set(clamp(stats.total_votes));
        self.unique_voters.set(clamp(stats.unique_voters));
    }

    /// Render every metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| NodeError::Metrics(prometheus::Error::Msg(e.to_string())))
    }

    /// Replace the export file with the current metrics. A no-op without an
    /// export path.
    ///
    /// Written to a sibling temp file, then renamed into place.
    pub fn export(&self) -> Result<(), NodeError> {
        let Some(ref path) = self.export_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("prom.tmp");
        fs::write(&tmp, self.encode()?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn clamp(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_governance::ProposalState;
    use agora_types::{ProposalId, Timestamp};

    #[test]
    fn tick_report_is_counted() {
        let metrics = GovernanceMetrics::new().unwrap();
        let mut report = TickReport::new(Timestamp::new(1_000));
        report.transitions = vec![
            (ProposalId::new(1), ProposalState::Active),
            (ProposalId::new(2), ProposalState::Executed),
        ];
        metrics.observe_tick(&report, Duration::from_millis(3));

        assert_eq!(metrics.ticks.get(), 1);
        assert_eq!(metrics.executions.get(), 1);
        assert_eq!(metrics.transitions.with_label_values(&["active"]).get(), 1);

        let text = metrics.encode().unwrap();
        assert!(text.contains("agora_ticks_total 1"));
        assert!(text.contains("agora_tick_duration_ms"));
    }

    #[test]
    fn export_writes_textfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("metrics.prom");
        let metrics = GovernanceMetrics::new().unwrap().with_export_path(&path);
        metrics.ticks.inc_by(3);
        metrics.export().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("agora_ticks_total 3"));
        assert!(!path.with_extension("prom.tmp").exists());
    }

    #[test]
    fn export_without_path_is_noop() {
        let metrics = GovernanceMetrics::new().unwrap();
        assert!(metrics.export_path().is_none());
        metrics.export().unwrap();
    }

    #[test]
    fn stats_set_gauges() {
        let metrics = GovernanceMetrics::new().unwrap();
        metrics.observe_stats(&GovernanceStats {
            total_proposals: 4,
            active_proposals: 2,
            ..Default::default()
        });
        assert_eq!(metrics.proposals_total.get(), 4);
        assert_eq!(metrics.proposals_active.get(), 2);
    }
}
