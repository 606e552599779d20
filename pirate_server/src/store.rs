use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, Utc};
use pirate_core::{derive_hash_hex, ConfigError, EngineConfig};
use pirate_shared::{LeaderboardEntry, SpinLogEntry};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::info;

pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid database url {url}"))?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredParams {
    pub server_seed: String,
    pub server_seed_hash: String,
    pub nonce: i64,
    pub engine_json: Option<String>,
}

impl StoredParams {
    /// Active engine config; an unset column means the built-in defaults.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        match &self.engine_json {
            Some(json) => EngineConfig::from_json(json),
            None => Ok(EngineConfig::default()),
        }
    }
}

pub async fn get_params(pool: &SqlitePool) -> anyhow::Result<StoredParams> {
    let row = sqlx::query_as::<_, StoredParams>(
        "SELECT server_seed, server_seed_hash, nonce, engine_json FROM params WHERE id = 1",
    )
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Claims the next nonce; concurrent callers never see the same value.
pub async fn advance_nonce(pool: &SqlitePool) -> anyhow::Result<StoredParams> {
    let row = sqlx::query_as::<_, StoredParams>(
        "UPDATE params SET nonce = nonce + 1 WHERE id = 1 \
         RETURNING server_seed, server_seed_hash, nonce, engine_json",
    )
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn set_engine_config(pool: &SqlitePool, config: &EngineConfig) -> anyhow::Result<()> {
    let json = serde_json::to_string(config)?;
    sqlx::query("UPDATE params SET engine_json = ? WHERE id = 1")
        .bind(json)
        .execute(pool)
        .await?;
    Ok(())
}

/// Replaces the server seed and resets the nonce. Returns the retired seed so
/// players can verify past spins, and the new commitment hash.
pub async fn rotate_seed(pool: &SqlitePool, new_seed: &str) -> anyhow::Result<(String, String)> {
    let old = get_params(pool).await?;
    let hash = swap_seed(pool, &old.server_seed, new_seed).await?;
    Ok((old.server_seed, hash))
}

/// Swaps the seed only if `expected` is still the active one, so the seed a
/// caller reveals is the seed that was actually replaced.
async fn swap_seed(pool: &SqlitePool, expected: &str, new_seed: &str) -> anyhow::Result<String> {
    let hash = derive_hash_hex(new_seed.as_bytes());
    let swapped = sqlx::query(
        "UPDATE params SET server_seed = ?, server_seed_hash = ?, nonce = 0 \
         WHERE id = 1 AND server_seed = ?",
    )
    .bind(new_seed)
    .bind(&hash)
    .bind(expected)
    .execute(pool)
    .await?
    .rows_affected();
    if swapped == 0 {
        anyhow::bail!("server seed was rotated concurrently; retry");
    }
    Ok(hash)
}

pub async fn init_db(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(db).await?;
    // ensure server_seed_hash matches server_seed
    let p = get_params(db).await?;
    let hash = derive_hash_hex(p.server_seed.as_bytes());
    if p.server_seed_hash != hash {
        sqlx::query("UPDATE params SET server_seed_hash = ? WHERE id = 1")
            .bind(&hash)
            .execute(db)
            .await?;
        info!(server_seed_hash = %hash, "server seed commitment refreshed");
    }
    Ok(())
}

pub struct NewSpin<'a> {
    pub account_id: &'a str,
    pub client_seed: &'a str,
    pub nonce: i64,
    pub server_seed_hash: &'a str,
    pub wager: u64,
    pub grid: &'a [Vec<String>],
    pub total_win: u64,
    pub balance_after: u64,
}

pub async fn record_spin(pool: &SqlitePool, spin: &NewSpin<'_>) -> anyhow::Result<i64> {
    let grid_json = serde_json::to_string(spin.grid)?;
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO spins (ts, account_id, client_seed, nonce, server_seed_hash, wager, grid_json, total_win, balance_after) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(Utc::now())
    .bind(spin.account_id)
    .bind(spin.client_seed)
    .bind(spin.nonce)
    .bind(spin.server_seed_hash)
    .bind(to_db(spin.wager)?)
    .bind(grid_json)
    .bind(to_db(spin.total_win)?)
    .bind(to_db(spin.balance_after)?)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

#[derive(sqlx::FromRow)]
struct SpinRow {
    id: i64,
    ts: DateTime<Utc>,
    account_id: String,
    client_seed: String,
    nonce: i64,
    server_seed_hash: String,
    wager: i64,
    grid_json: String,
    total_win: i64,
    balance_after: i64,
}

impl TryFrom<SpinRow> for SpinLogEntry {
    type Error = anyhow::Error;

    fn try_from(r: SpinRow) -> Result<Self, Self::Error> {
        let grid = serde_json::from_str(&r.grid_json)
            .with_context(|| format!("spin {} has a malformed grid", r.id))?;
        Ok(SpinLogEntry {
            id: r.id,
            ts: r.ts,
            account_id: r.account_id,
            client_seed: r.client_seed,
            nonce: r.nonce,
            server_seed_hash: r.server_seed_hash,
            wager: r.wager,
            grid,
            total_win: r.total_win,
            balance_after: r.balance_after,
        })
    }
}

const SPIN_COLUMNS: &str = "id, ts, account_id, client_seed, nonce, server_seed_hash, wager, grid_json, total_win, balance_after";

/// Newest first.
pub async fn recent_spins(pool: &SqlitePool, n: i64) -> anyhow::Result<Vec<SpinLogEntry>> {
    let rows = sqlx::query_as::<_, SpinRow>(&format!(
        "SELECT {SPIN_COLUMNS} FROM spins ORDER BY id DESC LIMIT ?"
    ))
    .bind(n)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(SpinLogEntry::try_from).collect()
}

/// Oldest first.
pub async fn all_spins(pool: &SqlitePool) -> anyhow::Result<Vec<SpinLogEntry>> {
    let rows = sqlx::query_as::<_, SpinRow>(&format!(
        "SELECT {SPIN_COLUMNS} FROM spins ORDER BY id ASC"
    ))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(SpinLogEntry::try_from).collect()
}

pub async fn leaderboard(pool: &SqlitePool, limit: u32) -> anyhow::Result<Vec<LeaderboardEntry>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT user_id, points FROM users ORDER BY points DESC, user_id ASC LIMIT ?",
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(i, (account_id, points))| LeaderboardEntry {
            rank: i as u32 + 1,
            account_id,
            points: points.max(0) as u64,
        })
        .collect())
}

fn to_db(v: u64) -> anyhow::Result<i64> {
    i64::try_from(v).context("value exceeds sqlite integer range")
}
