use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use pirate_core::{DailyPolicy, Ledger, LedgerError};
use sqlx::SqlitePool;

/// `users` table as the account ledger. Every mutation is one conditional
/// UPDATE, so SQLite's write lock serializes check-and-apply.
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    db: SqlitePool,
    starting_balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DailyClaim {
    Granted { amount: u64, balance: u64 },
    NotReady { next_claim_at: DateTime<Utc> },
}

fn unavailable(err: sqlx::Error) -> LedgerError {
    LedgerError::Unavailable(err.to_string())
}

fn to_points(amount: u64) -> Result<i64, LedgerError> {
    i64::try_from(amount)
        .map_err(|_| LedgerError::Unavailable(format!("amount {amount} exceeds ledger range")))
}

fn to_balance(points: i64) -> Result<u64, LedgerError> {
    u64::try_from(points)
        .map_err(|_| LedgerError::Unavailable(format!("negative balance {points} on record")))
}

impl SqliteLedger {
    pub fn new(db: SqlitePool, starting_balance: u64) -> Self {
        Self {
            db,
            starting_balance: i64::try_from(starting_balance).unwrap_or(i64::MAX),
        }
    }

    async fn ensure_account(&self, account: &str) -> Result<(), LedgerError> {
        sqlx::query("INSERT OR IGNORE INTO users (user_id, points) VALUES (?, ?)")
            .bind(account)
            .bind(self.starting_balance)
            .execute(&self.db)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    /// Grants the daily amount if the cooldown since the last claim has
    /// elapsed. The eligibility check and the grant are a single statement.
    pub async fn claim_daily(
        &self,
        account: &str,
        policy: &DailyPolicy,
        now: DateTime<Utc>,
    ) -> Result<DailyClaim, LedgerError> {
        self.ensure_account(account).await?;
        let amount = to_points(policy.amount)?;
        let granted = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET points = points + ?, last_daily = ? \
             WHERE user_id = ? AND (last_daily IS NULL OR last_daily <= ?) \
             RETURNING points",
        )
        .bind(amount)
        .bind(now.timestamp())
        .bind(account)
        .bind(policy.claim_cutoff(now).timestamp())
        .fetch_optional(&self.db)
        .await
        .map_err(unavailable)?;

        if let Some(points) = granted {
            return Ok(DailyClaim::Granted {
                amount: policy.amount,
                balance: to_balance(points)?,
            });
        }

        let last: Option<i64> = sqlx::query_scalar("SELECT last_daily FROM users WHERE user_id = ?")
            .bind(account)
            .fetch_one(&self.db)
            .await
            .map_err(unavailable)?;
        let last = last.and_then(|ts| Utc.timestamp_opt(ts, 0).single());
        let next_claim_at = policy.next_claim_at(last).unwrap_or(now);
        Ok(DailyClaim::NotReady { next_claim_at })
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn balance(&self, account: &str) -> Result<u64, LedgerError> {
        self.ensure_account(account).await?;
        let points: i64 = sqlx::query_scalar("SELECT points FROM users WHERE user_id = ?")
            .bind(account)
            .fetch_one(&self.db)
            .await
            .map_err(unavailable)?;
        to_balance(points)
    }

    async fn settle_spin(
        &self,
        account: &str,
        wager: u64,
        total_win: u64,
    ) -> Result<u64, LedgerError> {
        self.ensure_account(account).await?;
        let wager = to_points(wager)?;
        let points = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET points = points - ? + ? WHERE user_id = ? AND points >= ? \
             RETURNING points",
        )
        .bind(wager)
        .bind(to_points(total_win)?)
        .bind(account)
        .bind(wager)
        .fetch_optional(&self.db)
        .await
        .map_err(unavailable)?;
        match points {
            Some(points) => to_balance(points),
            None => Err(LedgerError::Rejected),
        }
    }

    async fn apply_net_change(&self, account: &str, delta: i64) -> Result<u64, LedgerError> {
        self.ensure_account(account).await?;
        let points = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET points = points + ? WHERE user_id = ? AND points + ? >= 0 \
             RETURNING points",
        )
        .bind(delta)
        .bind(account)
        .bind(delta)
        .fetch_optional(&self.db)
        .await
        .map_err(unavailable)?;
        match points {
            Some(points) => to_balance(points),
            None => Err(LedgerError::Rejected),
        }
    }
}
