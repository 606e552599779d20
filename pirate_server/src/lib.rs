use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use pirate_core::{AdRewardPolicy, DailyPolicy};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};

pub mod config;
pub mod error;
pub mod ledger;
pub mod routes;
pub mod store;

pub use crate::config::ServerConfig;
pub use crate::error::ApiFailure;
pub use crate::ledger::{DailyClaim, SqliteLedger};

pub struct AppState {
    pub db: SqlitePool,
    pub ledger: SqliteLedger,
    pub api_key: String,
    pub daily: DailyPolicy,
    pub ad_reward: AdRewardPolicy,
}

impl AppState {
    pub fn new(db: SqlitePool, config: &ServerConfig) -> Self {
        Self {
            ledger: SqliteLedger::new(db.clone(), config.starting_balance),
            db,
            api_key: config.api_key.clone(),
            daily: config.daily_policy(),
            ad_reward: config.ad_policy(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/spin", post(routes::route_spin))
        .route("/balance/:account", get(routes::route_balance))
        .route("/top", get(routes::route_top))
        .route("/reward", post(routes::route_reward))
        .route("/daily", post(routes::route_daily))
        .route("/verify", get(routes::route_verify))
        .route("/admin/set-params", post(routes::route_admin_set_params))
        .route("/admin/grant", post(routes::route_admin_grant))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
