use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::SessionClaims;
use crate::cache::{CachePolicy, CacheStats, CacheTag, QueryCache};
use crate::config::CacheConfig;
use crate::filters::{self, DashboardFilters, FilterError};
use crate::permissions::{self, Permissions, ScopeError};
use crate::queries::{self, QueryDefinition, TtlClass};
use crate::warehouse::{QueryResult, WarehouseError, WarehouseExecutor};

#[derive(Debug, Error)]
pub enum ScopedQueryError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unknown query: {0}")]
    UnknownQuery(String),

    #[error(transparent)]
    InvalidFilter(#[from] FilterError),

    #[error(transparent)]
    Upstream(#[from] WarehouseError),
}

impl From<ScopeError> for ScopedQueryError {
    fn from(err: ScopeError) -> Self {
        ScopedQueryError::Unauthorized(err.to_string())
    }
}

/// Composes permission resolution, filter merging and the query cache
///
/// The single entry point the API layer uses to run a dashboard query on
/// behalf of a session.
#[derive(Clone)]
pub struct ScopedQueryService {
    cache: QueryCache,
    executor: Arc<dyn WarehouseExecutor>,
    ttls: CacheConfig,
}

impl ScopedQueryService {
    pub fn new(cache: QueryCache, executor: Arc<dyn WarehouseExecutor>, ttls: CacheConfig) -> Self {
        Self { cache, executor, ttls }
    }

    pub fn executor(&self) -> &Arc<dyn WarehouseExecutor> {
        &self.executor
    }

    /// Resolve a session, failing when there is none
    pub fn authorize(&self, session: Option<&SessionClaims>) -> Result<Permissions, ScopedQueryError> {
        let claims = session.ok_or_else(|| ScopedQueryError::Unauthorized("no session".to_string()))?;
        Ok(permissions::resolve(claims)?)
    }

    pub async fn get_scoped_result(
        &self,
        session: Option<&SessionClaims>,
        query_name: &str,
        dashboard_filters: &DashboardFilters,
    ) -> Result<QueryResult, ScopedQueryError> {
        let permissions = self.authorize(session)?;
        self.run_for(&permissions, query_name, dashboard_filters).await
    }

    /// Run a query for already-resolved permissions
    pub async fn run_for(
        &self,
        permissions: &Permissions,
        query_name: &str,
        dashboard_filters: &DashboardFilters,
    ) -> Result<QueryResult, ScopedQueryError> {
        let query = queries::find(query_name)
            .ok_or_else(|| ScopedQueryError::UnknownQuery(query_name.to_string()))?;

        if !permissions::has_page(permissions, query.page) {
            warn!(
                "Role '{}' ({}) denied query '{}' on page {}",
                permissions.role(),
                permissions.email(),
                query.name,
                query.page
            );
            return Err(ScopedQueryError::Forbidden(format!(
                "role '{}' may not run '{}'",
                permissions.role(),
                query.name
            )));
        }

        dashboard_filters.validate()?;
        let effective = filters::merge(dashboard_filters, permissions);
        debug!("Running '{}' for {} with {:?}", query.name, permissions.email(), effective);

        let policy = CachePolicy::new(query.tags, self.ttl_for(query.ttl_class));
        let executor = Arc::clone(&self.executor);
        let result = self
            .cache
            .get(query.name, &effective, &policy, move |filter| run_query(executor, query, filter))
            .await?;

        Ok(result)
    }

    pub fn force_invalidate(&self, tag: CacheTag) -> usize {
        self.cache.invalidate(tag)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn ttl_for(&self, class: TtlClass) -> Duration {
        self.ttls.ttl_for(class)
    }
}

async fn run_query(
    executor: Arc<dyn WarehouseExecutor>,
    query: &'static QueryDefinition,
    filter: filters::EffectiveFilter,
) -> Result<QueryResult, WarehouseError> {
    executor.run(query, &filter).await
}
