use crate::ledger::LedgerError;

/// Reasons a single spin request ends without a settled result.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SpinError {
    #[error("wager must be a positive integer")]
    InvalidWager,
    #[error("insufficient funds: balance {balance} is below wager {wager}")]
    InsufficientFunds { balance: u64, wager: u64 },
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(LedgerError),
    #[error("settlement failed: {0}")]
    SettlementFailed(LedgerError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("grid must have at least one row and one column (got {rows}x{cols})")]
    EmptyGrid { rows: usize, cols: usize },
    #[error("symbol set needs at least one regular symbol")]
    NoRegularSymbols,
    #[error("too many regular symbols: {0} (max 255)")]
    TooManySymbols(usize),
    #[error("expected {expected} symbol weights (regular + scatter), got {actual}")]
    WeightCount { expected: usize, actual: usize },
    #[error("symbol weights must sum to a positive value")]
    ZeroWeights,
    #[error("paytable step minimum must be positive")]
    ZeroPaytableMinimum,
    #[error("paytable has duplicate minimum count {0}")]
    DuplicatePaytableMinimum(u32),
    #[error("{field} must be within [0, 1], got {value}")]
    Probability { field: &'static str, value: f64 },
    #[error("multiplier chip set is empty but the roll probability is {0}")]
    NoChips(f64),
    #[error("invalid engine config json: {0}")]
    Json(String),
}
