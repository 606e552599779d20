use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::Utc;
use pirate_core::{play_spin, Ledger, ProvablyFairRng, SpinEngine, Wager};
use pirate_shared::{
    AdminGrantRequest, AdminSetParamsRequest, BalanceResponse, DailyRequest, GrantResponse,
    LeaderboardResponse, RewardRequest, SpinRequest, SpinResponse, VerifyResponse,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::ApiFailure,
    ledger::DailyClaim,
    store::{self, NewSpin},
    AppState,
};

const DEFAULT_CLIENT_SEED: &str = "mini-app";
const MAX_ACCOUNT_LEN: usize = 64;
const DEFAULT_TOP: u32 = 10;
const MAX_TOP: u32 = 100;

type BearerHeader = TypedHeader<Authorization<Bearer>>;

fn account_id(raw: &str) -> Result<&str, ApiFailure> {
    let id = raw.trim();
    if id.is_empty() || id.len() > MAX_ACCOUNT_LEN || id.chars().any(char::is_control) {
        return Err(ApiFailure::InvalidAccount);
    }
    Ok(id)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiFailure> {
    payload
        .map(|Json(v)| v)
        .map_err(|rejection| ApiFailure::InvalidRequest(rejection.body_text()))
}

fn authorize(state: &AppState, header: Option<BearerHeader>) -> Result<(), ApiFailure> {
    match header {
        Some(TypedHeader(Authorization(bearer))) if bearer.token() == state.api_key => Ok(()),
        _ => Err(ApiFailure::Unauthorized),
    }
}

pub async fn route_spin(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SpinRequest>, JsonRejection>,
) -> Result<Json<SpinResponse>, ApiFailure> {
    let req = body(payload)?;
    let account = account_id(&req.account_id)?;
    let wager = Wager::try_from(&req.wager)?;

    let params = store::advance_nonce(&state.db).await?;
    let config = params
        .engine_config()
        .context("stored engine config is invalid")?;
    let engine = SpinEngine::new(config).context("stored engine config is invalid")?;
    let client_seed = req
        .client_seed
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_CLIENT_SEED.to_string());
    let nonce = u64::try_from(params.nonce).context("nonce out of range")?;
    let mut rng = ProvablyFairRng::new(&params.server_seed, &client_seed, nonce);

    let result = play_spin(&engine, &state.ledger, account, wager, &mut rng).await?;

    let symbols = &engine.config().symbols;
    let grid: Vec<Vec<String>> = result
        .grid
        .iter()
        .map(|row| row.iter().map(|s| symbols.glyph(*s).to_string()).collect())
        .collect();

    // settlement is committed; a missing audit row must not turn into an error
    if let Err(err) = store::record_spin(
        &state.db,
        &NewSpin {
            account_id: account,
            client_seed: &client_seed,
            nonce: params.nonce,
            server_seed_hash: &params.server_seed_hash,
            wager: wager.amount(),
            grid: &grid,
            total_win: result.total_win,
            balance_after: result.balance_after,
        },
    )
    .await
    {
        warn!(error = ?err, account, nonce, "failed to record spin");
    }
    info!(
        account,
        nonce,
        wager = wager.amount(),
        win = result.total_win,
        balance = result.balance_after,
        "spin"
    );

    Ok(Json(SpinResponse {
        ok: true,
        grid,
        win: result.total_win,
        base_win: result.base_win,
        balance: result.balance_after,
        multipliers: result.multipliers,
        scatter_count: result.scatter_count,
        nonce,
        server_seed_hash: params.server_seed_hash,
    }))
}

pub async fn route_balance(
    State(state): State<Arc<AppState>>,
    Path(account): Path<String>,
) -> Result<Json<BalanceResponse>, ApiFailure> {
    let account = account_id(&account)?;
    let balance = state.ledger.balance(account).await?;
    Ok(Json(BalanceResponse {
        ok: true,
        account_id: account.to_string(),
        balance,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    limit: Option<u32>,
}

pub async fn route_top(
    State(state): State<Arc<AppState>>,
    Query(q): Query<TopQuery>,
) -> Result<Json<LeaderboardResponse>, ApiFailure> {
    let limit = q.limit.unwrap_or(DEFAULT_TOP).clamp(1, MAX_TOP);
    let entries = store::leaderboard(&state.db, limit).await?;
    Ok(Json(LeaderboardResponse { ok: true, entries }))
}

pub async fn route_reward(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RewardRequest>, JsonRejection>,
) -> Result<Json<GrantResponse>, ApiFailure> {
    let req = body(payload)?;
    let account = account_id(&req.account_id)?;
    let amount = state.ad_reward.amount;
    let delta = i64::try_from(amount).context("ad reward out of range")?;
    let balance = state.ledger.apply_net_change(account, delta).await?;
    info!(account, kind = req.kind.as_deref().unwrap_or("ad"), amount, "ad reward granted");
    Ok(Json(GrantResponse {
        ok: true,
        granted: amount,
        balance,
        next_claim_at: None,
    }))
}

pub async fn route_daily(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DailyRequest>, JsonRejection>,
) -> Result<Json<GrantResponse>, ApiFailure> {
    let req = body(payload)?;
    let account = account_id(&req.account_id)?;
    let now = Utc::now();
    match state.ledger.claim_daily(account, &state.daily, now).await? {
        DailyClaim::Granted { amount, balance } => {
            info!(account, amount, "daily reward granted");
            Ok(Json(GrantResponse {
                ok: true,
                granted: amount,
                balance,
                next_claim_at: state.daily.next_claim_at(Some(now)),
            }))
        }
        DailyClaim::NotReady { next_claim_at } => Err(ApiFailure::DailyNotReady(next_claim_at)),
    }
}

pub async fn route_verify(
    State(state): State<Arc<AppState>>,
) -> Result<Json<VerifyResponse>, ApiFailure> {
    let p = store::get_params(&state.db).await?;
    Ok(Json(VerifyResponse {
        server_seed_hash: p.server_seed_hash,
        nonce: u64::try_from(p.nonce).context("nonce out of range")?,
    }))
}

pub async fn route_admin_set_params(
    State(state): State<Arc<AppState>>,
    auth: Option<BearerHeader>,
    payload: Result<Json<AdminSetParamsRequest>, JsonRejection>,
) -> Result<StatusCode, ApiFailure> {
    authorize(&state, auth)?;
    let req = body(payload)?;
    req.engine.validate()?;
    store::set_engine_config(&state.db, &req.engine).await?;
    info!(
        rows = req.engine.rows,
        cols = req.engine.cols,
        "engine params updated"
    );
    Ok(StatusCode::NO_CONTENT)
}

pub async fn route_admin_grant(
    State(state): State<Arc<AppState>>,
    auth: Option<BearerHeader>,
    payload: Result<Json<AdminGrantRequest>, JsonRejection>,
) -> Result<Json<GrantResponse>, ApiFailure> {
    authorize(&state, auth)?;
    let req = body(payload)?;
    let account = account_id(&req.account_id)?;
    let balance = state.ledger.apply_net_change(account, req.amount).await?;
    info!(account, amount = req.amount, balance, "admin grant");
    Ok(Json(GrantResponse {
        ok: true,
        granted: req.amount.max(0) as u64,
        balance,
        next_claim_at: None,
    }))
}
