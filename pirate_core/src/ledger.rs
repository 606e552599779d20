use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

pub type AccountId = String;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The change would drive the balance negative; nothing was applied.
    #[error("balance change rejected")]
    Rejected,
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Owner of account balances.
///
/// Mutations check and apply in one atomic step per account, so two
/// concurrent spins cannot both pass against a stale balance.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current balance; unknown accounts are opened on first access.
    async fn balance(&self, account: &str) -> Result<u64, LedgerError>;

    /// Debits `wager` and credits `total_win` as one write. `Rejected` if the
    /// balance at the time of the write is below `wager`, whatever the win.
    async fn settle_spin(
        &self,
        account: &str,
        wager: u64,
        total_win: u64,
    ) -> Result<u64, LedgerError>;

    /// Adds `delta` and returns the new balance, or `Rejected` if the result
    /// would be negative.
    async fn apply_net_change(&self, account: &str, delta: i64) -> Result<u64, LedgerError>;
}

/// Process-local ledger guarded by a single mutex.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    starting_balance: u64,
    balances: Mutex<HashMap<AccountId, u64>>,
}

impl InMemoryLedger {
    pub fn new(starting_balance: u64) -> Self {
        Self {
            starting_balance,
            balances: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_balance(self, account: &str, balance: u64) -> Self {
        if let Ok(mut balances) = self.balances.lock() {
            balances.insert(account.to_string(), balance);
        }
        self
    }
}

fn poisoned<T>(_: T) -> LedgerError {
    LedgerError::Unavailable("ledger lock poisoned".to_string())
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn balance(&self, account: &str) -> Result<u64, LedgerError> {
        let mut balances = self.balances.lock().map_err(poisoned)?;
        Ok(*balances
            .entry(account.to_string())
            .or_insert(self.starting_balance))
    }

    async fn settle_spin(
        &self,
        account: &str,
        wager: u64,
        total_win: u64,
    ) -> Result<u64, LedgerError> {
        let mut balances = self.balances.lock().map_err(poisoned)?;
        let balance = balances
            .entry(account.to_string())
            .or_insert(self.starting_balance);
        if *balance < wager {
            return Err(LedgerError::Rejected);
        }
        let next = (*balance - wager)
            .checked_add(total_win)
            .ok_or_else(|| LedgerError::Unavailable("balance overflow".to_string()))?;
        *balance = next;
        Ok(next)
    }

    async fn apply_net_change(&self, account: &str, delta: i64) -> Result<u64, LedgerError> {
        let mut balances = self.balances.lock().map_err(poisoned)?;
        let balance = balances
            .entry(account.to_string())
            .or_insert(self.starting_balance);
        let next = if delta >= 0 {
            balance.checked_add(delta as u64)
        } else {
            balance.checked_sub(delta.unsigned_abs())
        }
        .ok_or(LedgerError::Rejected)?;
        *balance = next;
        Ok(next)
    }
}
