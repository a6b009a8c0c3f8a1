//! Background task that ticks the governance engine on a fixed interval.
//!
//! Ticks run on the blocking pool because the engine and its stores are
//! synchronous. A shutdown that arrives mid-tick raises a stop flag the
//! engine checks between proposals, so the tick ends after the proposal it
//! is working on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;

use agora_governance::{GovernanceEngine, GovernanceStats, TickReport};

use crate::metrics::GovernanceMetrics;
use crate::tracing_spans;

pub struct Scheduler {
    engine: Arc<GovernanceEngine>,
    interval: Duration,
    metrics: Option<Arc<GovernanceMetrics>>,
}

impl Scheduler {
    pub fn new(
        engine: Arc<GovernanceEngine>,
        interval: Duration,
        metrics: Option<Arc<GovernanceMetrics>>,
    ) -> Self {
        Self {
            engine,
            interval,
            metrics,
        }
    }

    /// Spawn the tick loop. It exits once `shutdown` fires.
    pub fn spawn(self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let stop = Arc::new(AtomicBool::new(false));
            let mut sequence = 0u64;

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => {
                        tracing::info!("governance tick task shutting down");
                        break;
                    }
                    _ = interval.tick() => {}
                }

                sequence += 1;
                let started = Instant::now();
                let (result, stopping) = self.run_tick(sequence, &stop, &mut shutdown).await;
                match result {
                    Ok((report, stats)) => self.record(&report, stats, started.elapsed()),
                    Err(e) => {
                        tracing::error!(error = %e, tick = sequence, "governance tick task failed")
                    }
                }
                if stopping {
                    tracing::info!("governance tick task shutting down after interrupted tick");
                    break;
                }
            }
        })
    }

    async fn run_tick(
        &self,
        sequence: u64,
        stop: &Arc<AtomicBool>,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> (Result<(TickReport, Option<GovernanceStats>), JoinError>, bool) {
        let engine = Arc::clone(&self.engine);
        let flag = Arc::clone(stop);
        let want_stats = self.metrics.is_some();

        let mut task = tokio::task::spawn_blocking(move || {
            let _span = tracing_spans::tick_span(sequence).entered();
            let report = engine.tick_until(|| flag.load(Ordering::SeqCst));
            let stats = if want_stats {
                match engine.get_stats() {
                    Ok(stats) => Some(stats),
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to collect governance stats");
                        None
                    }
                }
            } else {
                None
            };
            (report, stats)
        });

        tokio::select! {
            result = &mut task => return (result, false),
            _ = shutdown.recv() => {}
        }
        stop.store(true, Ordering::SeqCst);
        tracing::info!(tick = sequence, "shutdown requested mid-tick, finishing current proposal");
        (task.await, true)
    }

    fn record(&self, report: &TickReport, stats: Option<GovernanceStats>, elapsed: Duration) {
        if !report.transitions.is_empty() || !report.failures.is_empty() {
            tracing::info!(
                examined = report.examined,
                transitions = report.transitions.len(),
                failures = report.failures.len(),
                interrupted = report.interrupted,
                elapsed_ms = elapsed.as_millis() as u64,
                "governance tick"
            );
        } else {
            tracing::debug!(examined = report.examined, "governance tick, nothing due");
        }
        if let Some(ref metrics) = self.metrics {
            metrics.observe_tick(report, elapsed);
            if let Some(ref stats) = stats {
                metrics.observe_stats(stats);
            }
            if let Err(e) = metrics.export() {
                tracing::warn!(error = %e, "metrics export failed");
            }
        }
    }
}
