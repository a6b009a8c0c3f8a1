//! The Agora node: wires storage, balances and the governance engine together.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use agora_governance::{BalanceProvider, DeadlineBalanceProvider, GovernanceEngine};
use agora_nullables::NullGovernanceStore;
use agora_store::GovernanceStore;
use agora_store_lmdb::{check_data_dir, check_integrity, LmdbEnvironment, Migrator};
use agora_types::{Clock, SystemClock};
use agora_utils::format_duration;

use crate::config::{NodeConfig, StorageBackend};
use crate::error::NodeError;
use crate::metrics::GovernanceMetrics;
use crate::provider::StaticBalanceProvider;
use crate::scheduler::Scheduler;
use crate::shutdown::{ShutdownController, ShutdownReason};
use crate::tracing_spans;

/// Timeout for waiting on background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A running governance node.
pub struct AgoraNode {
    config: NodeConfig,
    engine: Arc<GovernanceEngine>,
    /// Present when `storage = "lmdb"`; flushed on stop.
    lmdb: Option<LmdbEnvironment>,
    shutdown: Arc<ShutdownController>,
    metrics: Option<Arc<GovernanceMetrics>>,
    task_handles: Vec<JoinHandle<()>>,
}

impl AgoraNode {
    /// Open storage and build the engine from `config`.
    ///
    /// Durable storage is migrated and checked, and the treasury reconciled,
    /// before the node is returned. Any inconsistency aborts startup.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let _span = tracing_spans::startup_span(match config.storage {
            StorageBackend::Memory => "memory",
            StorageBackend::Lmdb => "lmdb",
        })
        .entered();

        let (store, lmdb): (Arc<dyn GovernanceStore>, Option<LmdbEnvironment>) =
            match config.storage {
                StorageBackend::Memory => {
                    tracing::warn!("using in-memory storage; governance state is lost on exit");
                    (Arc::new(NullGovernanceStore::new()), None)
                }
                StorageBackend::Lmdb => {
                    let env = Self::open_lmdb(&config)?;
                    (Arc::new(env.governance_store()), Some(env))
                }
            };

        let provider: Arc<dyn BalanceProvider> = Arc::new(StaticBalanceProvider::from_config(
            &config.holders,
            config.total_supply,
        )?);

        let mut node = Self::with_components(config, store, provider, Arc::new(SystemClock))?;
        node.lmdb = lmdb;
        Ok(node)
    }

    /// Build a node over caller-supplied storage, balances and clock.
    ///
    /// The provider is wrapped with the configured query deadline.
    pub fn with_components(
        config: NodeConfig,
        store: Arc<dyn GovernanceStore>,
        provider: Arc<dyn BalanceProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        let params = config.params.resolve()?;
        tracing::info!(
            voting_delay = %format_duration(params.voting_delay_secs),
            voting_period = %format_duration(params.voting_period_secs),
            timelock = %format_duration(params.timelock_secs),
            quorum_pct = params.quorum_pct,
            threshold_pct = params.threshold_pct,
            "governance parameters"
        );

        let provider = Arc::new(DeadlineBalanceProvider::new(provider, config.provider_timeout()));
        let engine = Arc::new(GovernanceEngine::new(params, store, provider, clock)?);

        let report = engine.reconcile_treasury()?;
        if !report.is_consistent() {
            return Err(NodeError::Integrity(format!(
                "treasury balances disagree with history for {} token(s)",
                report.mismatches.len()
            )));
        }
        tracing::info!(entries = report.entries_checked, "treasury reconciled");

        let metrics = if config.enable_metrics {
            let metrics = GovernanceMetrics::new()?.with_export_path(config.metrics_path());
            tracing::info!(path = %config.metrics_path().display(), "exporting metrics");
            Some(Arc::new(metrics))
        } else {
            None
        };

        Ok(Self {
            config,
            engine,
            lmdb: None,
            shutdown: Arc::new(ShutdownController::new()),
            metrics,
            task_handles: Vec::new(),
        })
    }

    fn open_lmdb(config: &NodeConfig) -> Result<LmdbEnvironment, NodeError> {
        check_data_dir(&config.data_dir).map_err(NodeError::Integrity)?;
        let env = LmdbEnvironment::open_default(&config.data_dir)?;
        let store = env.governance_store();
        let schema = Migrator::run(&store)?;

        let report = check_integrity(&env)?;
        if !report.is_healthy() {
            return Err(NodeError::Integrity(report.errors.join("; ")));
        }
        tracing::info!(
            path = %config.data_dir.display(),
            schema = ?schema,
            databases = report.databases_checked,
            entries = report.total_entries,
            "LMDB storage ready"
        );
        Ok(env)
    }

    /// Spawn background tasks. Returns immediately.
    pub fn start(&mut self) {
        let scheduler = Scheduler::new(
            Arc::clone(&self.engine),
            self.config.tick_interval(),
            self.metrics.clone(),
        );
        self.task_handles
            .push(scheduler.spawn(self.shutdown.subscribe()));
        tracing::info!(
            tick_interval = %format_duration(self.config.tick_interval_secs),
            metrics = self.config.enable_metrics,
            "Agora node started"
        );
    }

    /// Start, then block until SIGINT/SIGTERM or a programmatic shutdown.
    pub async fn run(&mut self) -> ShutdownReason {
        self.start();
        self.shutdown.wait_for_signal().await
    }

    /// Signal every task, wait for them, then flush storage.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!(reason = ?self.shutdown.reason(), "Agora node stopping");
        self.shutdown.shutdown();

        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        let timed_out = tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all)
            .await
            .is_err();
        if timed_out {
            tracing::warn!(
                "shutdown timeout ({:?}), some tasks may still be running",
                SHUTDOWN_TIMEOUT
            );
        }

        if let Some(ref env) = self.lmdb {
            match env.sync() {
                Ok(()) => tracing::info!("LMDB flushed to disk"),
                Err(e) => tracing::warn!("LMDB sync failed: {e}"),
            }
        }

        if let Some(ref metrics) = self.metrics {
            if let Ok(stats) = self.engine.get_stats() {
                metrics.observe_stats(&stats);
            }
            if let Err(e) = metrics.export() {
                tracing::warn!("final metrics export failed: {e}");
            }
        }

        if timed_out {
            return Err(NodeError::ShutdownTimeout);
        }
        tracing::info!("Agora node stopped");
        Ok(())
    }

    pub fn engine(&self) -> &Arc<GovernanceEngine> {
        &self.engine
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn shutdown_handle(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    pub fn metrics(&self) -> Option<&Arc<GovernanceMetrics>> {
        self.metrics.as_ref()
    }

    /// Current governance statistics as pretty-printed JSON.
    pub fn stats_json(&self) -> Result<String, NodeError> {
        let stats = self.engine.get_stats()?;
        serde_json::to_string_pretty(&stats).map_err(|e| NodeError::Config(e.to_string()))
    }
}
