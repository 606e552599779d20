use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Once-per-cooldown points grant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyPolicy {
    pub amount: u64,
    pub cooldown_secs: i64,
}

impl Default for DailyPolicy {
    fn default() -> Self {
        Self {
            amount: 50,
            cooldown_secs: 24 * 60 * 60,
        }
    }
}

impl DailyPolicy {
    pub fn cooldown(&self) -> Duration {
        Duration::seconds(self.cooldown_secs)
    }

    /// Earliest time the next claim is allowed; `None` if never claimed.
    pub fn next_claim_at(&self, last_claim: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        last_claim.map(|last| last + self.cooldown())
    }

    pub fn can_claim(&self, last_claim: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match self.next_claim_at(last_claim) {
            Some(next) => now >= next,
            None => true,
        }
    }

    /// Latest `last_claim` that still allows a claim at `now`.
    pub fn claim_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.cooldown()
    }
}

/// Flat grant for a client-reported ad view. The client never chooses the
/// amount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdRewardPolicy {
    pub amount: u64,
}

impl Default for AdRewardPolicy {
    fn default() -> Self {
        Self { amount: 5 }
    }
}
