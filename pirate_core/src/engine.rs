use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, SpinError},
    paytable::Paytable,
    rng::{ProvablyFairRng, RandomSource},
    symbols::{Symbol, SymbolSet},
};

/// Rows x cols symbols, row-major.
pub type Grid = Vec<Vec<Symbol>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScatterConfig {
    pub threshold: u32,
    pub bonus_multiplier: u64,
}

/// Random percentage chips added on top of the base win.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultiplierConfig {
    /// Percent values, drawn with replacement.
    pub chips: Vec<u32>,
    pub first_probability: f64,
    /// Only rolled when the first chip fired.
    pub second_probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    pub rows: usize,
    pub cols: usize,
    pub symbols: SymbolSet,
    pub paytable: Paytable,
    pub scatter: ScatterConfig,
    pub multipliers: MultiplierConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rows: 5,
            cols: 6,
            symbols: SymbolSet::pirate_default(),
            paytable: Paytable::pirate_default(),
            scatter: ScatterConfig {
                threshold: 4,
                bonus_multiplier: 5,
            },
            multipliers: MultiplierConfig {
                chips: vec![5, 10, 15, 20, 25, 50],
                first_probability: 0.30,
                second_probability: 0.20,
            },
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ConfigError::EmptyGrid {
                rows: self.rows,
                cols: self.cols,
            });
        }
        self.symbols.validate()?;
        self.paytable.validate()?;
        let m = &self.multipliers;
        for (field, value) in [
            ("first_probability", m.first_probability),
            ("second_probability", m.second_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { field, value });
            }
        }
        if m.chips.is_empty() && m.first_probability > 0.0 {
            return Err(ConfigError::NoChips(m.first_probability));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn cells(&self) -> usize {
        self.rows * self.cols
    }
}

/// Per-symbol counts for one grid; position independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    pub regular: Vec<u32>,
    pub scatter: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinOutcome {
    pub grid: Grid,
    pub base_win: u64,
    pub multipliers: Vec<u32>,
    pub scatter_count: u32,
    pub total_win: u64,
}

/// Stateless scorer built from a validated config.
#[derive(Debug, Clone)]
pub struct SpinEngine {
    config: EngineConfig,
}

impl SpinEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Scores one spin. Rejects before touching `rng` when the balance cannot
    /// cover the wager; otherwise takes `rows * cols` draws for the grid and
    /// 0 to 2 for the multiplier chips.
    pub fn spin<R: RandomSource + ?Sized>(
        &self,
        wager: u64,
        available_balance: u64,
        rng: &mut R,
    ) -> Result<SpinOutcome, SpinError> {
        if wager == 0 {
            return Err(SpinError::InvalidWager);
        }
        if available_balance < wager {
            return Err(SpinError::InsufficientFunds {
                balance: available_balance,
                wager,
            });
        }
        let grid = self.generate_grid(rng);
        let tally = self.tally(&grid);
        let base_win = self.base_win(&tally, wager);
        let multipliers = self.roll_multipliers(rng);
        let mut total_win = apply_multipliers(base_win, &multipliers);
        if tally.scatter >= self.config.scatter.threshold {
            total_win = total_win.saturating_add(
                self.config.scatter.bonus_multiplier.saturating_mul(wager),
            );
        }
        Ok(SpinOutcome {
            grid,
            base_win,
            multipliers,
            scatter_count: tally.scatter,
            total_win,
        })
    }

    pub fn generate_grid<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Grid {
        let cols = self.config.cols;
        (0..self.config.rows)
            .map(|_| (0..cols).map(|_| self.config.symbols.draw(rng)).collect())
            .collect()
    }

    pub fn tally(&self, grid: &Grid) -> Tally {
        let mut tally = Tally {
            regular: vec![0; self.config.symbols.regular.len()],
            scatter: 0,
        };
        for symbol in grid.iter().flatten() {
            match *symbol {
                Symbol::Scatter => tally.scatter += 1,
                Symbol::Regular(i) => {
                    if let Some(count) = tally.regular.get_mut(i as usize) {
                        *count += 1;
                    }
                }
            }
        }
        tally
    }

    pub fn base_win(&self, tally: &Tally, wager: u64) -> u64 {
        tally
            .regular
            .iter()
            .map(|count| self.config.paytable.payout(*count, wager))
            .fold(0u64, u64::saturating_add)
    }

    /// Each roll is a single draw `u`: it fires when `u < p` and the chip is
    /// picked from the same draw rescaled to `[0, 1)`.
    pub fn roll_multipliers<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Vec<u32> {
        let m = &self.config.multipliers;
        let mut chips = Vec::with_capacity(2);
        if m.first_probability <= 0.0 || m.chips.is_empty() {
            return chips;
        }
        let Some(first) = roll_chip(rng, m.first_probability, &m.chips) else {
            return chips;
        };
        chips.push(first);
        if m.second_probability > 0.0 {
            if let Some(second) = roll_chip(rng, m.second_probability, &m.chips) {
                chips.push(second);
            }
        }
        chips
    }
}

fn roll_chip<R: RandomSource + ?Sized>(rng: &mut R, p: f64, chips: &[u32]) -> Option<u32> {
    let u = rng.next_unit();
    if u >= p {
        return None;
    }
    let idx = ((u / p) * chips.len() as f64) as usize;
    chips.get(idx.min(chips.len() - 1)).copied()
}

/// `floor(base * (100 + sum(chips)) / 100)`; no chips leaves `base` unchanged.
pub fn apply_multipliers(base_win: u64, chips: &[u32]) -> u64 {
    if chips.is_empty() {
        return base_win;
    }
    let percent: u128 = 100 + chips.iter().map(|c| *c as u128).sum::<u128>();
    let scaled = base_win as u128 * percent / 100;
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Regenerates the grid for revealed seeds and compares it to the one that
/// was shown.
pub fn verify_grid(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    config: &EngineConfig,
    expected: &Grid,
) -> bool {
    let Ok(engine) = SpinEngine::new(config.clone()) else {
        return false;
    };
    let mut rng = ProvablyFairRng::new(server_seed, client_seed, nonce);
    engine.generate_grid(&mut rng) == *expected
}
