use std::collections::BTreeMap;
use std::sync::RwLock;

use comgov_core::Weight;
use comgov_core::account::AccountId;

/// Bonded stake as maintained by the host
///
/// Weighted tallies query it at resolution time. Implementations must be
/// cheap and must not block.
pub trait StakeProvider {
    fn bonded_stake_of(&self, account: &AccountId) -> Weight;

    fn total_bonded_stake(&self) -> u128;
}

pub type DynStakeProvider = std::sync::Arc<dyn StakeProvider + Send + Sync>;

/// In-memory stake table, with the total kept up to date
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StakeTable {
    stakes: BTreeMap<AccountId, Weight>,
    total: u128,
}

impl StakeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bonded stake of `account`; zero removes the entry
    pub fn set(&mut self, account: AccountId, stake: Weight) {
        let prev = if stake == 0 {
            self.stakes.remove(&account)
        } else {
            self.stakes.insert(account, stake)
        };
        self.total = self.total - u128::from(prev.unwrap_or_default()) + u128::from(stake);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &Weight)> {
        self.stakes.iter()
    }
}

impl FromIterator<(AccountId, Weight)> for StakeTable {
    fn from_iter<T: IntoIterator<Item = (AccountId, Weight)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (account, stake) in iter {
            table.set(account, stake);
        }
        table
    }
}

impl StakeProvider for StakeTable {
    fn bonded_stake_of(&self, account: &AccountId) -> Weight {
        self.stakes.get(account).copied().unwrap_or_default()
    }

    fn total_bonded_stake(&self) -> u128 {
        self.total
    }
}

impl<T> StakeProvider for RwLock<T>
where
    T: StakeProvider,
{
    fn bonded_stake_of(&self, account: &AccountId) -> Weight {
        self.read().expect("Locking failed").bonded_stake_of(account)
    }

    fn total_bonded_stake(&self) -> u128 {
        self.read().expect("Locking failed").total_bonded_stake()
    }
}
