#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use funnel_dashboard_api::{
    app,
    auth::{generate_jwt, SessionClaims},
    cache::QueryCache,
    config::AppConfig,
    filters::{EffectiveFilter, FilterInput},
    queries::QueryDefinition,
    refresh,
    services::ScopedQueryService,
    state::AppState,
    warehouse::{QueryResult, WarehouseError, WarehouseExecutor},
};

pub const SECRET: &str = "integration-test-secret";

/// Warehouse stand-in that echoes the filter it was asked to run
#[derive(Default)]
pub struct FakeWarehouse {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl FakeWarehouse {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl WarehouseExecutor for FakeWarehouse {
    async fn run(&self, query: &QueryDefinition, filter: &EffectiveFilter) -> Result<QueryResult, WarehouseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(WarehouseError::Query("relation does not exist".to_string()));
        }
        let filter = serde_json::to_value(filter).map_err(|e| WarehouseError::Query(e.to_string()))?;
        Ok(QueryResult::new(json!({ "query": query.name, "filter": filter })))
    }

    async fn ping(&self) -> Result<(), WarehouseError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(WarehouseError::Connection(
                "error connecting to server at \"10.20.0.5\", port 5432".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub warehouse: Arc<FakeWarehouse>,
    pub cache: QueryCache,
}

impl TestApp {
    pub fn new() -> Self {
        let config = AppConfig::development();
        let warehouse = Arc::new(FakeWarehouse::default());
        let cache = QueryCache::from_config(&config.cache);

        let (notifier, events) = refresh::channel(8);
        refresh::spawn_refresh_listener(cache.clone(), events);

        let state = AppState {
            service: ScopedQueryService::new(cache.clone(), warehouse.clone(), config.cache),
            refresh: notifier,
            jwt_secret: Arc::from(SECRET),
        };

        Self {
            router: app(state),
            warehouse,
            cache,
        }
    }

    pub async fn send(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }

    pub async fn query(&self, name: &str, token: &str, filters: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, &format!("/api/dashboard/{}", name), Some(token), Some(filters))
            .await
    }

    /// Wait for the refresh listener to record `n` invalidations
    pub async fn wait_for_invalidations(&self, n: u64) -> Result<()> {
        for _ in 0..100 {
            if self.cache.stats().invalidations >= n {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        anyhow::bail!("refresh listener did not invalidate {} tags in time", n)
    }
}

pub fn token(email: &str, role: &str) -> String {
    mint(SessionClaims::new(email, role))
}

pub fn scoped_token(email: &str, role: &str, sga: Option<&str>, sgm: Option<&str>) -> String {
    let claims = SessionClaims::new(email, role)
        .with_sga_filter(sga.map(|s| FilterInput::One(s.to_string())))
        .with_sgm_filter(sgm.map(|s| FilterInput::One(s.to_string())));
    mint(claims)
}

fn mint(claims: SessionClaims) -> String {
    generate_jwt(&claims, SECRET).expect("token should sign")
}
