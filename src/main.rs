use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use funnel_dashboard_api::{
    app, cache::QueryCache, config, cors_layer, is_production, refresh, services::ScopedQueryService,
    state::AppState, warehouse::PostgresWarehouse,
};

const REFRESH_BUFFER: usize = 64;
const INDEX_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting Funnel Dashboard API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        if is_production!() {
            bail!("JWT_SECRET must be set in production");
        }
        tracing::warn!("JWT_SECRET is empty; every session token will be rejected");
    }

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let warehouse = PostgresWarehouse::connect_lazy(&database_url, &config.warehouse)
        .context("invalid warehouse connection settings")?;

    let cache = QueryCache::from_config(&config.cache);
    let (notifier, events) = refresh::channel(REFRESH_BUFFER);
    refresh::spawn_refresh_listener(cache.clone(), events);
    refresh::spawn_index_pruner(cache.clone(), INDEX_PRUNE_INTERVAL);

    let state = AppState {
        service: ScopedQueryService::new(cache, Arc::new(warehouse), config.cache.clone()),
        refresh: notifier,
        jwt_secret: Arc::from(config.security.jwt_secret.as_str()),
    };

    let mut router = app(state);
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security));
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Funnel Dashboard API listening on http://{}", bind_addr);

    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
