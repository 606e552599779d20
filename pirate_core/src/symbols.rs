use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, rng::RandomSource};

/// A grid cell: one of the regular symbols (by index into the alphabet) or the
/// scatter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Symbol {
    Regular(u8),
    Scatter,
}

impl Symbol {
    /// Maps a draw outcome in `0..=regular_count` to a symbol; the last
    /// outcome is the scatter.
    pub fn from_index(i: u8, regular_count: u8) -> Self {
        if i >= regular_count {
            Symbol::Scatter
        } else {
            Symbol::Regular(i)
        }
    }

    pub fn to_index(self, regular_count: u8) -> u8 {
        match self {
            Symbol::Regular(i) => i,
            Symbol::Scatter => regular_count,
        }
    }

    pub fn is_scatter(self) -> bool {
        matches!(self, Symbol::Scatter)
    }
}

/// The alphabet used for one spin, with an optional draw weighting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolSet {
    pub regular: Vec<String>,
    pub scatter: String,
    /// One weight per regular symbol followed by the scatter weight. `None`
    /// draws uniformly over `regular.len() + 1` outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<u32>>,
}

impl SymbolSet {
    pub fn pirate_default() -> Self {
        Self {
            regular: ["🍒", "🍋", "💎", "⭐", "7️⃣", "⚓"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            scatter: "🏴‍☠️".to_string(),
            weights: None,
        }
    }

    pub fn regular_count(&self) -> u8 {
        self.regular.len() as u8
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.regular.is_empty() {
            return Err(ConfigError::NoRegularSymbols);
        }
        if self.regular.len() >= u8::MAX as usize {
            return Err(ConfigError::TooManySymbols(self.regular.len()));
        }
        if let Some(weights) = &self.weights {
            let expected = self.regular.len() + 1;
            if weights.len() != expected {
                return Err(ConfigError::WeightCount {
                    expected,
                    actual: weights.len(),
                });
            }
            if weights.iter().map(|w| *w as u64).sum::<u64>() == 0 {
                return Err(ConfigError::ZeroWeights);
            }
        }
        Ok(())
    }

    /// One cell draw. Always consumes exactly one value from `rng`.
    pub fn draw<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Symbol {
        let n = self.regular_count();
        match &self.weights {
            None => Symbol::from_index(rng.next_below(n as u32 + 1) as u8, n),
            Some(weights) => {
                let total: u64 = weights.iter().map(|w| *w as u64).sum();
                let mut pick = (rng.next_unit() * total as f64) as u64;
                for (i, w) in weights.iter().enumerate() {
                    let w = *w as u64;
                    if pick < w {
                        return Symbol::from_index(i as u8, n);
                    }
                    pick -= w;
                }
                // float rounding at the top edge lands on the last non-zero bucket
                let last = weights.iter().rposition(|w| *w > 0).unwrap_or(0);
                Symbol::from_index(last as u8, n)
            }
        }
    }

    pub fn glyph(&self, symbol: Symbol) -> &str {
        match symbol {
            Symbol::Regular(i) => self
                .regular
                .get(i as usize)
                .map(String::as_str)
                .unwrap_or("?"),
            Symbol::Scatter => &self.scatter,
        }
    }
}
