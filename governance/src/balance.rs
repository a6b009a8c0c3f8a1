//! Governance-token balance source.
//!
//! The engine never embeds balances itself: every balance comes from an
//! injected [`BalanceProvider`]. Snapshots query the provider once per
//! proposal; stake checks and statistics query it for "now".

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use agora_types::{Address, Timestamp, TokenAmount};
use parking_lot::Mutex;
use thiserror::Error;

use crate::GovernanceError;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("balance source unavailable: {0}")]
    Unavailable(String),

    #[error("balance query timed out after {0:?}")]
    Timeout(Duration),
}

impl From<ProviderError> for GovernanceError {
    fn from(e: ProviderError) -> Self {
        GovernanceError::BalanceProviderUnavailable(e.to_string())
    }
}

/// Governance-token balances, optionally as of a past point in time.
///
/// `as_of = None` means "now". Implementations that cannot answer historical
/// queries may answer with current balances; the engine freezes whatever it
/// receives into a snapshot, so later changes never affect a proposal.
pub trait BalanceProvider: Send + Sync {
    fn balance(&self, address: &Address, as_of: Option<Timestamp>)
        -> Result<TokenAmount, ProviderError>;

    fn total_supply(&self, as_of: Option<Timestamp>) -> Result<TokenAmount, ProviderError>;

    /// Every address with a non-zero balance.
    fn holders(&self, as_of: Option<Timestamp>)
        -> Result<Vec<(Address, TokenAmount)>, ProviderError>;
}

/// Number of query workers [`DeadlineBalanceProvider::new`] starts.
pub const DEFAULT_QUERY_WORKERS: usize = 2;

type Job = Box<dyn FnOnce(&dyn BalanceProvider) + Send>;

const PENDING: u8 = 0;
const DONE: u8 = 1;
const ABANDONED: u8 = 2;

/// Bounds every call to an inner provider by a deadline.
///
/// Queries run on a fixed set of long-lived worker threads fed by a channel.
/// A query that misses the deadline keeps its worker until the inner provider
/// returns; while every worker is held by such a query, new calls fail at once
/// with [`ProviderError::Unavailable`] instead of queueing behind it.
pub struct DeadlineBalanceProvider {
    jobs: Mutex<mpsc::Sender<Job>>,
    workers: usize,
    /// Timed-out queries still occupying a worker.
    stalled: Arc<AtomicUsize>,
    timeout: Duration,
}

impl DeadlineBalanceProvider {
    pub fn new(inner: Arc<dyn BalanceProvider>, timeout: Duration) -> Self {
        Self::with_workers(inner, timeout, DEFAULT_QUERY_WORKERS)
    }

    pub fn with_workers(inner: Arc<dyn BalanceProvider>, timeout: Duration, workers: usize) -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));

        let mut started = 0;
        for n in 0..workers.max(1) {
            let inner = Arc::clone(&inner);
            let rx = Arc::clone(&rx);
            let spawned = thread::Builder::new()
                .name(format!("balance-query-{n}"))
                .spawn(move || loop {
                    // The guard is released before the job runs.
                    let job = rx.lock().recv();
                    match job {
                        Ok(job) => job(inner.as_ref()),
                        Err(_) => break,
                    }
                });
            match spawned {
                Ok(_) => started += 1,
                Err(e) => tracing::warn!(error = %e, "cannot spawn balance query worker"),
            }
        }

        Self {
            jobs: Mutex::new(tx),
            workers: started,
            stalled: Arc::new(AtomicUsize::new(0)),
            timeout,
        }
    }

    fn call<T, F>(&self, query: F) -> Result<T, ProviderError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn BalanceProvider) -> Result<T, ProviderError> + Send + 'static,
    {
        let stalled = self.stalled.load(Ordering::SeqCst);
        if stalled >= self.workers {
            return Err(ProviderError::Unavailable(format!(
                "{stalled} earlier balance queries have not returned"
            )));
        }

        let state = Arc::new(AtomicU8::new(PENDING));
        let (tx, rx) = mpsc::sync_channel(1);
        let job: Job = {
            let state = Arc::clone(&state);
            let stalled = Arc::clone(&self.stalled);
            Box::new(move |provider: &dyn BalanceProvider| {
                let _ = tx.send(query(provider));
                if state
                    .compare_exchange(PENDING, DONE, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    stalled.fetch_sub(1, Ordering::SeqCst);
                }
            })
        };
        self.jobs
            .lock()
            .send(job)
            .map_err(|_| ProviderError::Unavailable("balance query workers stopped".to_string()))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // Count first so the worker's decrement can never run ahead.
                self.stalled.fetch_add(1, Ordering::SeqCst);
                if state
                    .compare_exchange(PENDING, ABANDONED, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    // Finished right at the deadline.
                    self.stalled.fetch_sub(1, Ordering::SeqCst);
                    if let Ok(result) = rx.try_recv() {
                        return result;
                    }
                }
                tracing::warn!(timeout = ?self.timeout, "balance provider query timed out");
                Err(ProviderError::Timeout(self.timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ProviderError::Unavailable(
                "balance query worker terminated".to_string(),
            )),
        }
    }
}

impl BalanceProvider for DeadlineBalanceProvider {
    fn balance(
        &self,
        address: &Address,
        as_of: Option<Timestamp>,
    ) -> Result<TokenAmount, ProviderError> {
        let address = address.clone();
        self.call(move |p| p.balance(&address, as_of))
    }

    fn total_supply(&self, as_of: Option<Timestamp>) -> Result<TokenAmount, ProviderError> {
        self.call(move |p| p.total_supply(as_of))
    }

    fn holders(
        &self,
        as_of: Option<Timestamp>,
    ) -> Result<Vec<(Address, TokenAmount)>, ProviderError> {
        self.call(move |p| p.holders(as_of))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;

    use super::*;

    struct Slow(Duration);

    impl BalanceProvider for Slow {
        fn balance(&self, _: &Address, _: Option<Timestamp>) -> Result<TokenAmount, ProviderError> {
            thread::sleep(self.0);
            Ok(TokenAmount::new(7))
        }

        fn total_supply(&self, _: Option<Timestamp>) -> Result<TokenAmount, ProviderError> {
            Ok(TokenAmount::new(100))
        }

        fn holders(
            &self,
            _: Option<Timestamp>,
        ) -> Result<Vec<(Address, TokenAmount)>, ProviderError> {
            Err(ProviderError::Unavailable("offline".to_string()))
        }
    }

    #[test]
    fn fast_answers_pass_through() {
        let provider =
            DeadlineBalanceProvider::new(Arc::new(Slow(Duration::ZERO)), Duration::from_secs(5));
        assert_eq!(
            provider.balance(&Address::new("0xa"), None).unwrap(),
            TokenAmount::new(7)
        );
        assert_eq!(provider.total_supply(None).unwrap(), TokenAmount::new(100));
    }

    #[test]
    fn slow_answers_time_out() {
        let provider = DeadlineBalanceProvider::new(
            Arc::new(Slow(Duration::from_millis(500))),
            Duration::from_millis(20),
        );
        let err = provider.balance(&Address::new("0xa"), None).unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }

    /// Counts calls; `balance` sleeps for whatever delay is set when called.
    #[derive(Default)]
    struct Stuck {
        delay_ms: AtomicU64,
        calls: AtomicUsize,
    }

    impl BalanceProvider for Stuck {
        fn balance(&self, _: &Address, _: Option<Timestamp>) -> Result<TokenAmount, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(self.delay_ms.load(Ordering::SeqCst)));
            Ok(TokenAmount::new(1))
        }

        fn total_supply(&self, _: Option<Timestamp>) -> Result<TokenAmount, ProviderError> {
            Ok(TokenAmount::new(1))
        }

        fn holders(
            &self,
            _: Option<Timestamp>,
        ) -> Result<Vec<(Address, TokenAmount)>, ProviderError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn hung_provider_does_not_pile_up_queries() {
        let inner = Arc::new(Stuck::default());
        inner.delay_ms.store(400, Ordering::SeqCst);
        let provider = DeadlineBalanceProvider::with_workers(
            inner.clone(),
            Duration::from_millis(20),
            1,
        );
        let who = Address::new("0xa");

        assert!(matches!(
            provider.balance(&who, None),
            Err(ProviderError::Timeout(_))
        ));
        for _ in 0..5 {
            assert!(matches!(
                provider.balance(&who, None),
                Err(ProviderError::Unavailable(_))
            ));
        }
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        // The worker is handed back once the stuck query returns.
        inner.delay_ms.store(0, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(600));
        assert_eq!(provider.balance(&who, None).unwrap(), TokenAmount::new(1));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn queries_reuse_the_same_workers() {
        let provider = DeadlineBalanceProvider::with_workers(
            Arc::new(Slow(Duration::ZERO)),
            Duration::from_secs(5),
            2,
        );
        for _ in 0..50 {
            assert_eq!(provider.total_supply(None).unwrap(), TokenAmount::new(100));
        }
        assert_eq!(provider.workers, 2);
        assert_eq!(provider.stalled.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn inner_errors_are_preserved() {
        let provider =
            DeadlineBalanceProvider::new(Arc::new(Slow(Duration::ZERO)), Duration::from_secs(5));
        assert!(matches!(
            provider.holders(None),
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[test]
    fn provider_errors_map_to_retryable_governance_error() {
        let err: GovernanceError = ProviderError::Timeout(Duration::from_secs(1)).into();
        assert!(matches!(err, GovernanceError::BalanceProviderUnavailable(_)));
        assert!(err.is_retryable());
    }
}
