use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::queries::TtlClass;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub cache: CacheConfig,
    pub warehouse: WarehouseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_capacity: u64,
    pub realtime_ttl_secs: u64,
    pub standard_ttl_secs: u64,
    pub reference_ttl_secs: u64,
}

impl CacheConfig {
    /// TTL applied to entries of the given query class
    pub fn ttl_for(&self, class: TtlClass) -> Duration {
        let secs = match class {
            TtlClass::Realtime => self.realtime_ttl_secs,
            TtlClass::Standard => self.standard_ttl_secs,
            TtlClass::Reference => self.reference_ttl_secs,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    pub max_connections: u32,
    pub query_timeout_secs: u64,
    pub enable_slow_query_warning: bool,
    pub slow_query_threshold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Cache overrides
        if let Ok(v) = env::var("CACHE_ENABLED") {
            self.cache.enabled = v.parse().unwrap_or(self.cache.enabled);
        }
        if let Ok(v) = env::var("CACHE_MAX_CAPACITY") {
            self.cache.max_capacity = v.parse().unwrap_or(self.cache.max_capacity);
        }
        if let Ok(v) = env::var("CACHE_REALTIME_TTL_SECS") {
            self.cache.realtime_ttl_secs = v.parse().unwrap_or(self.cache.realtime_ttl_secs);
        }
        if let Ok(v) = env::var("CACHE_STANDARD_TTL_SECS") {
            self.cache.standard_ttl_secs = v.parse().unwrap_or(self.cache.standard_ttl_secs);
        }
        if let Ok(v) = env::var("CACHE_REFERENCE_TTL_SECS") {
            self.cache.reference_ttl_secs = v.parse().unwrap_or(self.cache.reference_ttl_secs);
        }

        // Warehouse overrides
        if let Ok(v) = env::var("WAREHOUSE_MAX_CONNECTIONS") {
            self.warehouse.max_connections = v.parse().unwrap_or(self.warehouse.max_connections);
        }
        if let Ok(v) = env::var("WAREHOUSE_QUERY_TIMEOUT_SECS") {
            self.warehouse.query_timeout_secs = v.parse().unwrap_or(self.warehouse.query_timeout_secs);
        }
        if let Ok(v) = env::var("WAREHOUSE_ENABLE_SLOW_QUERY_WARNING") {
            self.warehouse.enable_slow_query_warning =
                v.parse().unwrap_or(self.warehouse.enable_slow_query_warning);
        }
        if let Ok(v) = env::var("WAREHOUSE_SLOW_QUERY_THRESHOLD_MS") {
            self.warehouse.slow_query_threshold_ms =
                v.parse().unwrap_or(self.warehouse.slow_query_threshold_ms);
        }

        // API overrides
        if let Ok(v) = env::var("DASHBOARD_API_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            cache: CacheConfig {
                enabled: true,
                max_capacity: 1_000,
                realtime_ttl_secs: 60,
                standard_ttl_secs: 5 * 60,
                reference_ttl_secs: 60 * 60,
            },
            warehouse: WarehouseConfig {
                max_connections: 5,
                query_timeout_secs: 60,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 500,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: "development-only-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            cache: CacheConfig {
                enabled: true,
                max_capacity: 5_000,
                realtime_ttl_secs: 5 * 60,
                standard_ttl_secs: 60 * 60,
                reference_ttl_secs: 12 * 60 * 60,
            },
            warehouse: WarehouseConfig {
                max_connections: 10,
                query_timeout_secs: 30,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 2_000,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            cache: CacheConfig {
                enabled: true,
                max_capacity: 20_000,
                realtime_ttl_secs: 5 * 60,
                standard_ttl_secs: 4 * 60 * 60,
                reference_ttl_secs: 24 * 60 * 60,
            },
            warehouse: WarehouseConfig {
                max_connections: 20,
                query_timeout_secs: 30,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 5_000,
            },
            api: ApiConfig {
                port: 8080,
                enable_request_logging: false,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 12,
                enable_cors: true,
                cors_origins: vec!["https://dashboard.example.com".to_string()],
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.cache.enabled);
        assert!(!config.security.jwt_secret.is_empty());
        assert_eq!(config.cache.ttl_for(TtlClass::Standard), Duration::from_secs(300));
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        // Production must be given a secret through the environment
        assert!(config.security.jwt_secret.is_empty());
        assert!(config.cache.ttl_for(TtlClass::Reference) > config.cache.ttl_for(TtlClass::Standard));
        assert!(config.cache.ttl_for(TtlClass::Standard) > config.cache.ttl_for(TtlClass::Realtime));
    }
}
