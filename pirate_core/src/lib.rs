pub mod engine;
pub mod error;
pub mod ledger;
pub mod paytable;
pub mod play;
pub mod rewards;
pub mod rng;
pub mod symbols;

pub use crate::engine::{
    apply_multipliers, verify_grid, EngineConfig, Grid, MultiplierConfig, ScatterConfig,
    SpinEngine, SpinOutcome, Tally,
};
pub use crate::error::{ConfigError, SpinError};
pub use crate::ledger::{AccountId, InMemoryLedger, Ledger, LedgerError};
pub use crate::paytable::{Paytable, PaytableStep};
pub use crate::play::{play_spin, SpinResult, Wager};
pub use crate::rewards::{AdRewardPolicy, DailyPolicy};
pub use crate::rng::{
    derive_hash_hex, generate_server_seed, CountingRandom, EntropyRandom, ProvablyFairRng, RandomSource, ScriptedRandom,
};
pub use crate::symbols::{Symbol, SymbolSet};
