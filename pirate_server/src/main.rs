use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pirate_server::{router, store, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_filter)?)
        .init();

    let db = store::connect(&config.database_url, 5).await?;
    store::init_db(&db).await?;
    if let Some(engine) = config.load_engine_config()? {
        store::set_engine_config(&db, &engine).await?;
        info!(
            rows = engine.rows,
            cols = engine.cols,
            symbols = engine.symbols.regular.len(),
            "engine config loaded"
        );
    }

    let state = Arc::new(AppState::new(db, &config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!("listening on {}", config.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
