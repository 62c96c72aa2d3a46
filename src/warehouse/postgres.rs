use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tracing::{info, warn};

use super::sql::{self, SqlParam};
use super::{QueryResult, WarehouseError, WarehouseExecutor};
use crate::config::WarehouseConfig;
use crate::filters::EffectiveFilter;
use crate::queries::QueryDefinition;

/// Warehouse executor backed by a Postgres-compatible reporting database
pub struct PostgresWarehouse {
    pool: PgPool,
    query_timeout: Duration,
    slow_query_threshold: Option<Duration>,
}

impl PostgresWarehouse {
    /// Lazily connecting pool; the first query opens the connection
    pub fn connect_lazy(database_url: &str, config: &WarehouseConfig) -> Result<Self, WarehouseError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy(database_url)?;

        info!("Created warehouse pool (max {} connections)", config.max_connections);
        Ok(Self::with_pool(pool, config))
    }

    pub fn with_pool(pool: PgPool, config: &WarehouseConfig) -> Self {
        Self {
            pool,
            query_timeout: Duration::from_secs(config.query_timeout_secs),
            slow_query_threshold: config
                .enable_slow_query_warning
                .then(|| Duration::from_millis(config.slow_query_threshold_ms)),
        }
    }

    async fn fetch(&self, query: &QueryDefinition, filter: &EffectiveFilter) -> Result<Value, WarehouseError> {
        let compiled = sql::compile(query, filter);

        let mut statement = sqlx::query(&compiled.query);
        for param in compiled.params {
            statement = match param {
                SqlParam::Text(v) => statement.bind(v),
                SqlParam::TextList(vs) => statement.bind(vs),
                SqlParam::Date(d) => statement.bind(d),
            };
        }

        let row = statement.fetch_one(&self.pool).await?;
        Ok(row.try_get::<Value, _>("rows")?)
    }
}

#[async_trait]
impl WarehouseExecutor for PostgresWarehouse {
    async fn run(&self, query: &QueryDefinition, filter: &EffectiveFilter) -> Result<QueryResult, WarehouseError> {
        let started = Instant::now();

        let rows = tokio::time::timeout(self.query_timeout, self.fetch(query, filter))
            .await
            .map_err(|_| WarehouseError::Timeout(self.query_timeout.as_secs()))??;

        let elapsed = started.elapsed();
        if let Some(threshold) = self.slow_query_threshold {
            if elapsed > threshold {
                warn!("Slow warehouse query '{}': {}ms", query.name, elapsed.as_millis());
            }
        }

        Ok(QueryResult::new(rows))
    }

    async fn ping(&self) -> Result<(), WarehouseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
