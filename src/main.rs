//! query-bridge - dynamic query execution over REST and GraphQL back-ends

use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use query_bridge::config::Config;
use query_bridge::db::Database;
use query_bridge::routes;
use query_bridge::state::AppState;
use query_bridge::tasks::{cache_sweep, log_flush, retention};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "query_bridge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Connect to database
    let db = match Database::new(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        }
    };

    let state = AppState::new(db, &config)?;

    // Spawn background tasks
    // 1. Log flush - drains the execution log buffer into Postgres every 2s
    let flush_logger = Arc::clone(&state.logger);
    let flush_store = Arc::clone(&state.db);
    tokio::spawn(async move {
        log_flush::log_flush_task(flush_logger, flush_store).await;
    });

    // 2. Retention - prunes old execution logs every 6h
    let ret_db = Arc::clone(&state.db);
    let retention_days = config.log_retention_days;
    tokio::spawn(async move {
        retention::retention_task(ret_db, retention_days).await;
    });

    // 3. Cache sweep - drops expired result cache entries
    let sweep_cache = Arc::clone(&state.cache);
    let sweep_every = config.cache_sweep_interval;
    tokio::spawn(async move {
        cache_sweep::cache_sweep_task(sweep_cache, sweep_every).await;
    });

    // Outermost first
    // (applied innermost-first: each Router::layer call wraps the previous)
    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    info!("query-bridge v{} starting on {}", env!("CARGO_PKG_VERSION"), config.listen_addr);
    info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));
    info!("Default query timeout: {:?}", config.default_timeout);
    info!("Log buffer capacity: {}", config.log_buffer_capacity);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
