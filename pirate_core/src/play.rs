use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    engine::{Grid, SpinEngine},
    error::SpinError,
    ledger::{Ledger, LedgerError},
    rng::RandomSource,
};

/// A validated, strictly positive wager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Wager(u64);

impl Wager {
    pub fn new(amount: u64) -> Result<Self, SpinError> {
        if amount == 0 {
            return Err(SpinError::InvalidWager);
        }
        Ok(Self(amount))
    }

    pub fn amount(self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for Wager {
    type Error = SpinError;

    fn try_from(amount: i64) -> Result<Self, Self::Error> {
        u64::try_from(amount)
            .map_err(|_| SpinError::InvalidWager)
            .and_then(Wager::new)
    }
}

/// Accepts JSON integers only; strings, floats and non-positive numbers are
/// rejected.
impl TryFrom<&Value> for Wager {
    type Error = SpinError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value.as_u64() {
            Some(amount) => Wager::new(amount),
            None => Err(SpinError::InvalidWager),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinResult {
    pub grid: Grid,
    pub base_win: u64,
    pub multipliers: Vec<u32>,
    pub scatter_count: u32,
    pub total_win: u64,
    pub balance_after: u64,
}

/// Runs one spin against the ledger: balance precondition, scoring, then one
/// settlement that debits the wager and credits the win together.
///
/// The ledger re-checks the wager against the balance inside that write. A
/// `Rejected` settlement means the balance moved under us after the read; it
/// is reported as insufficient funds and nothing is credited, win or not.
pub async fn play_spin<L, R>(
    engine: &SpinEngine,
    ledger: &L,
    account: &str,
    wager: Wager,
    rng: &mut R,
) -> Result<SpinResult, SpinError>
where
    L: Ledger + ?Sized,
    R: RandomSource + Send + ?Sized,
{
    let balance = ledger
        .balance(account)
        .await
        .map_err(SpinError::LedgerUnavailable)?;
    let outcome = engine.spin(wager.amount(), balance, rng)?;

    let balance_after = match ledger
        .settle_spin(account, wager.amount(), outcome.total_win)
        .await
    {
        Ok(balance_after) => balance_after,
        Err(LedgerError::Rejected) => {
            warn!(account, wager = wager.amount(), "spin settlement lost a balance race");
            return Err(SpinError::InsufficientFunds {
                balance,
                wager: wager.amount(),
            });
        }
        Err(err) => return Err(SpinError::SettlementFailed(err)),
    };
    debug!(
        account,
        wager = wager.amount(),
        win = outcome.total_win,
        balance_after,
        "spin settled"
    );

    Ok(SpinResult {
        grid: outcome.grid,
        base_win: outcome.base_win,
        multipliers: outcome.multipliers,
        scatter_count: outcome.scatter_count,
        total_win: outcome.total_win,
        balance_after,
    })
}
