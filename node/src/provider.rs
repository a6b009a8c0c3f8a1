//! Built-in balance provider seeded from the node configuration.

use std::collections::BTreeMap;

use agora_governance::{BalanceProvider, ProviderError};
use agora_types::{Address, Timestamp, TokenAmount};

use crate::config::HolderConfig;
use crate::NodeError;

/// Fixed governance-token balances.
///
/// Balances do not change over time, so as-of queries return the same
/// values as latest queries.
pub struct StaticBalanceProvider {
    balances: BTreeMap<Address, TokenAmount>,
    total_supply: TokenAmount,
}

impl StaticBalanceProvider {
    /// Build from `[[holders]]`. Duplicate addresses are summed.
    ///
    /// `total_supply` defaults to the sum of balances and may not be smaller.
    pub fn from_config(
        holders: &[HolderConfig],
        total_supply: Option<u64>,
    ) -> Result<Self, NodeError> {
        let mut balances: BTreeMap<Address, TokenAmount> = BTreeMap::new();
        for holder in holders {
            let address =
                Address::parse(&holder.address).map_err(|e| NodeError::Config(e.to_string()))?;
            let entry = balances.entry(address).or_default();
            *entry = entry.saturating_add(TokenAmount::new(holder.balance.into()));
        }
        let held: TokenAmount = balances.values().copied().sum();
        let total_supply = match total_supply {
            Some(supply) if TokenAmount::new(supply.into()) < held => {
                return Err(NodeError::Config(format!(
                    "total_supply {supply} is less than the {held} held by configured holders"
                )))
            }
            Some(supply) => TokenAmount::new(supply.into()),
            None => held,
        };
        Ok(Self {
            balances,
            total_supply,
        })
    }

    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }
}

impl BalanceProvider for StaticBalanceProvider {
    fn balance(
        &self,
        address: &Address,
        _as_of: Option<Timestamp>,
    ) -> Result<TokenAmount, ProviderError> {
        Ok(self
            .balances
            .get(address)
            .copied()
            .unwrap_or(TokenAmount::ZERO))
    }

    fn total_supply(&self, _as_of: Option<Timestamp>) -> Result<TokenAmount, ProviderError> {
        Ok(self.total_supply)
    }

    fn holders(
        &self,
        _as_of: Option<Timestamp>,
    ) -> Result<Vec<(Address, TokenAmount)>, ProviderError> {
        Ok(self
            .balances
            .iter()
            .filter(|(_, b)| !b.is_zero())
            .map(|(a, b)| (a.clone(), *b))
            .collect())
    }
}
