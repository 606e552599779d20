use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaytableStep {
    pub min_count: u32,
    pub multiplier: u64,
}

/// Pay-anywhere tiers shared by every regular symbol.
///
/// Steps are kept sorted by descending `min_count` so lookup returns the
/// highest tier a count reaches. Tiers never stack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "Vec<PaytableStep>", into = "Vec<PaytableStep>")]
pub struct Paytable(Vec<PaytableStep>);

impl Paytable {
    pub fn new(mut steps: Vec<PaytableStep>) -> Self {
        steps.sort_by(|a, b| b.min_count.cmp(&a.min_count));
        Self(steps)
    }

    pub fn pirate_default() -> Self {
        Self::new(vec![
            PaytableStep {
                min_count: 8,
                multiplier: 1,
            },
            PaytableStep {
                min_count: 10,
                multiplier: 2,
            },
            PaytableStep {
                min_count: 12,
                multiplier: 5,
            },
        ])
    }

    pub fn steps(&self) -> &[PaytableStep] {
        &self.0
    }

    /// Highest step whose minimum the count reaches (inclusive).
    pub fn tier_for(&self, count: u32) -> Option<&PaytableStep> {
        self.0.iter().find(|step| count >= step.min_count)
    }

    /// Payout for one symbol's count at the given wager.
    pub fn payout(&self, count: u32, wager: u64) -> u64 {
        self.tier_for(count)
            .map(|step| step.multiplier.saturating_mul(wager))
            .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for pair in self.0.windows(2) {
            if pair[0].min_count == pair[1].min_count {
                return Err(ConfigError::DuplicatePaytableMinimum(pair[0].min_count));
            }
        }
        if self.0.iter().any(|s| s.min_count == 0) {
            return Err(ConfigError::ZeroPaytableMinimum);
        }
        Ok(())
    }
}

impl From<Vec<PaytableStep>> for Paytable {
    fn from(steps: Vec<PaytableStep>) -> Self {
        Self::new(steps)
    }
}

impl From<Paytable> for Vec<PaytableStep> {
    fn from(table: Paytable) -> Self {
        table.0
    }
}
