//! Nullable balance provider: programmable token balances with history.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use agora_governance::{BalanceProvider, ProviderError};
use agora_types::{Address, Timestamp, TokenAmount};
use parking_lot::Mutex;

/// A balance source for tests.
///
/// Each address holds a history of balance changes keyed by the time they
/// take effect, so as-of queries see the balance that was in force then.
/// Latest-balance queries (`as_of == None`) see the newest value.
pub struct NullBalanceProvider {
    history: Mutex<HashMap<Address, BTreeMap<Timestamp, TokenAmount>>>,
    supply_override: Mutex<Option<TokenAmount>>,
    available: AtomicBool,
    latency: Mutex<Duration>,
    queries: AtomicU64,
}

impl NullBalanceProvider {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(HashMap::new()),
            supply_override: Mutex::new(None),
            available: AtomicBool::new(true),
            latency: Mutex::new(Duration::ZERO),
            queries: AtomicU64::new(0),
        }
    }

    /// Seed with `(address, balance)` pairs, all effective since the epoch.
    pub fn with_balances<'a>(balances: impl IntoIterator<Item = (&'a str, u128)>) -> Self {
        let provider = Self::new();
        for (address, amount) in balances {
            provider.set_balance(&Address::new(address), TokenAmount::new(amount));
        }
        provider
    }

    /// Replace the whole history of `address` with a single balance.
    pub fn set_balance(&self, address: &Address, amount: TokenAmount) {
        let mut history = self.history.lock();
        let entries = history.entry(address.clone()).or_default();
        entries.clear();
        entries.insert(Timestamp::EPOCH, amount);
    }

    /// Record a balance change that takes effect at `at`.
    pub fn set_balance_at(&self, address: &Address, at: Timestamp, amount: TokenAmount) {
        self.history
            .lock()
            .entry(address.clone())
            .or_default()
            .insert(at, amount);
    }

    /// Report `supply` instead of the sum of holder balances.
    pub fn set_total_supply(&self, supply: TokenAmount) {
        *self.supply_override.lock() = Some(supply);
    }

    /// Make every query fail with [`ProviderError::Unavailable`] while false.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delay every query by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Number of queries answered or refused so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    fn begin_query(&self) -> Result<(), ProviderError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ProviderError::Unavailable("null provider switched off".into()))
        }
    }

    fn balance_at(
        entries: &BTreeMap<Timestamp, TokenAmount>,
        as_of: Option<Timestamp>,
    ) -> TokenAmount {
        let found = match as_of {
            Some(at) => entries.range(..=at).next_back(),
            None => entries.iter().next_back(),
        };
        found.map(|(_, amount)| *amount).unwrap_or(TokenAmount::ZERO)
    }

    fn snapshot(&self, as_of: Option<Timestamp>) -> Vec<(Address, TokenAmount)> {
        let history = self.history.lock();
        let mut holders: Vec<(Address, TokenAmount)> = history
            .iter()
            .map(|(address, entries)| (address.clone(), Self::balance_at(entries, as_of)))
            .filter(|(_, amount)| !amount.is_zero())
            .collect();
        holders.sort_by(|a, b| a.0.cmp(&b.0));
        holders
    }
}

impl Default for NullBalanceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceProvider for NullBalanceProvider {
    fn balance(
        &self,
        address: &Address,
        as_of: Option<Timestamp>,
    ) -> Result<TokenAmount, ProviderError> {
        self.begin_query()?;
        Ok(self
            .history
            .lock()
            .get(address)
            .map(|entries| Self::balance_at(entries, as_of))
            .unwrap_or(TokenAmount::ZERO))
    }

    fn total_supply(&self, as_of: Option<Timestamp>) -> Result<TokenAmount, ProviderError> {
        self.begin_query()?;
        if let Some(supply) = *self.supply_override.lock() {
            return Ok(supply);
        }
        Ok(self.snapshot(as_of).into_iter().map(|(_, amount)| amount).sum())
    }

    fn holders(
        &self,
        as_of: Option<Timestamp>,
    ) -> Result<Vec<(Address, TokenAmount)>, ProviderError> {
        self.begin_query()?;
        Ok(self.snapshot(as_of))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_of_queries_see_historical_balance() {
        let provider = NullBalanceProvider::new();
        let alice = Address::new("0xalice");
        provider.set_balance_at(&alice, Timestamp::new(10), TokenAmount::new(100));
        provider.set_balance_at(&alice, Timestamp::new(20), TokenAmount::new(500));

        let at = |t| provider.balance(&alice, Some(Timestamp::new(t))).unwrap();
        assert_eq!(at(5), TokenAmount::ZERO);
        assert_eq!(at(10), TokenAmount::new(100));
        assert_eq!(at(19), TokenAmount::new(100));
        assert_eq!(at(25), TokenAmount::new(500));
        assert_eq!(provider.balance(&alice, None).unwrap(), TokenAmount::new(500));
    }

    #[test]
    fn supply_defaults_to_sum_of_holders() {
        let provider = NullBalanceProvider::with_balances([("0xa", 30), ("0xb", 70)]);
        assert_eq!(provider.total_supply(None).unwrap(), TokenAmount::new(100));
        provider.set_total_supply(TokenAmount::new(1_000));
        assert_eq!(provider.total_supply(None).unwrap(), TokenAmount::new(1_000));
    }

    #[test]
    fn switched_off_provider_fails_and_counts() {
        let provider = NullBalanceProvider::with_balances([("0xa", 1)]);
        provider.set_available(false);
        assert!(provider.holders(None).is_err());
        provider.set_available(true);
        assert_eq!(provider.holders(None).unwrap().len(), 1);
        assert_eq!(provider.query_count(), 2);
    }
}
