use chrono::{DateTime, Utc};
use pirate_core::EngineConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SpinRequest {
    pub account_id: String,
    /// Kept raw so that strings and floats map to `invalid_wager` instead of a
    /// body rejection.
    #[serde(default)]
    pub wager: serde_json::Value,
    #[serde(default)]
    pub client_seed: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpinResponse {
    pub ok: bool,
    pub grid: Vec<Vec<String>>,
    pub win: u64,
    pub base_win: u64,
    pub balance: u64,
    pub multipliers: Vec<u32>,
    pub scatter_count: u32,
    pub nonce: u64,
    pub server_seed_hash: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InsufficientFunds,
    InvalidRequest,
    InvalidWager,
    InvalidAccount,
    InvalidParams,
    Unauthorized,
    DailyNotReady,
    InternalError,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_claim_at: Option<DateTime<Utc>>,
}

impl ErrorResponse {
    pub fn new(error: ErrorCode) -> Self {
        Self {
            ok: false,
            error,
            next_claim_at: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub ok: bool,
    pub account_id: String,
    pub balance: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub account_id: String,
    pub points: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub ok: bool,
    pub entries: Vec<LeaderboardEntry>,
}

/// Ad-view notification from the mini app. Any amount the client might send
/// is ignored; the server grants its configured reward.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RewardRequest {
    pub account_id: String,
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DailyRequest {
    pub account_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrantResponse {
    pub ok: bool,
    pub granted: u64,
    pub balance: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_claim_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub server_seed_hash: String,
    pub nonce: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminSetParamsRequest {
    pub engine: EngineConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdminGrantRequest {
    pub account_id: String,
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpinLogEntry {
    pub id: i64,
    pub ts: DateTime<Utc>,
    pub account_id: String,
    pub client_seed: String,
    pub nonce: i64,
    pub server_seed_hash: String,
    pub wager: i64,
    pub grid: Vec<Vec<String>>,
    pub total_win: i64,
    pub balance_after: i64,
}
