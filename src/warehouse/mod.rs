pub mod postgres;
pub mod sql;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::filters::EffectiveFilter;
use crate::queries::QueryDefinition;

pub use postgres::PostgresWarehouse;

/// Result of an analytical query, opaque to the cache
///
/// Cloning shares the underlying rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueryResult(Arc<Value>);

impl QueryResult {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for QueryResult {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Warehouse failures. Cloneable so every waiter on a shared computation
/// receives the same error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WarehouseError {
    #[error("Warehouse query timed out after {0}s")]
    Timeout(u64),

    #[error("Warehouse query failed: {0}")]
    Query(String),

    #[error("Warehouse quota exceeded: {0}")]
    Quota(String),

    #[error("Warehouse connection error: {0}")]
    Connection(String),

    #[error("Warehouse computation aborted: {0}")]
    Aborted(String),
}

impl WarehouseError {
    /// Whether retrying the outer request could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WarehouseError::Timeout(_) | WarehouseError::Connection(_) | WarehouseError::Aborted(_)
        )
    }
}

impl From<sqlx::Error> for WarehouseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                WarehouseError::Connection(err.to_string())
            }
            // 53xxx: insufficient resources, 54xxx: program limit exceeded
            sqlx::Error::Database(ref db)
                if db.code().map_or(false, |code| code.starts_with("53") || code.starts_with("54")) =>
            {
                WarehouseError::Quota(db.message().to_string())
            }
            other => WarehouseError::Query(other.to_string()),
        }
    }
}

/// Runs a named analytical query against the warehouse
#[async_trait]
pub trait WarehouseExecutor: Send + Sync {
    async fn run(&self, query: &QueryDefinition, filter: &EffectiveFilter) -> Result<QueryResult, WarehouseError>;

    /// Connectivity probe for health checks
    async fn ping(&self) -> Result<(), WarehouseError> {
        Ok(())
    }
}

