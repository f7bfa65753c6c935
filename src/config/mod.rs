use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub filter: FilterConfig,
    pub listing: ListingConfig,
    pub promo: PromoConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Unset means the server falls back to the in-memory store.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub max_limit: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
    /// Hard cap on rows fetched for application-side post-filtering.
    pub superset_cap: usize,
    /// Locales a recipe title must be translated into to count as complete.
    pub required_locales: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoConfig {
    pub code_length: usize,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
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

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
        .with_consistent_limits()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        if let Ok(v) = env::var("FILTER_MAX_LIMIT") {
            self.filter.max_limit = v.parse().ok();
        }

        if let Ok(v) = env::var("LISTING_DEFAULT_PAGE_SIZE") {
            self.listing.default_page_size = v.parse().unwrap_or(self.listing.default_page_size);
        }
        if let Ok(v) = env::var("LISTING_MAX_PAGE_SIZE") {
            self.listing.max_page_size = v.parse().unwrap_or(self.listing.max_page_size);
        }
        if let Ok(v) = env::var("LISTING_SUPERSET_CAP") {
            self.listing.superset_cap = v.parse().unwrap_or(self.listing.superset_cap);
        }
        if let Ok(v) = env::var("LISTING_REQUIRED_LOCALES") {
            self.listing.required_locales = split_list(&v);
        }

        if let Ok(v) = env::var("PROMO_CODE_LENGTH") {
            self.promo.code_length = v.parse().unwrap_or(self.promo.code_length);
        }
        if let Ok(v) = env::var("PROMO_MAX_ATTEMPTS") {
            self.promo.max_attempts = v.parse().unwrap_or(self.promo.max_attempts);
        }

        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }

        self
    }

    /// The post-filter superset is fetched through the filter DSL, which caps
    /// every limit at `filter.max_limit`. Keep the listing cap within it so a
    /// cut superset is always reported as truncated.
    fn with_consistent_limits(mut self) -> Self {
        if let Some(max_limit) = self.filter.max_limit {
            let max_limit = usize::try_from(max_limit).unwrap_or(0).max(1);
            if self.listing.superset_cap > max_limit {
                tracing::warn!(
                    superset_cap = self.listing.superset_cap,
                    max_limit,
                    "listing superset cap exceeds filter max limit; lowering it"
                );
                self.listing.superset_cap = max_limit;
            }
        }
        self.listing.superset_cap = self.listing.superset_cap.max(1);
        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
                run_migrations: true,
            },
            filter: FilterConfig { max_limit: Some(1000) },
            listing: ListingConfig {
                default_page_size: 20,
                max_page_size: 100,
                superset_cap: 1000,
                required_locales: vec!["en".to_string(), "fr".to_string()],
            },
            promo: PromoConfig { code_length: 8, max_attempts: 10 },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
                run_migrations: true,
            },
            filter: FilterConfig { max_limit: Some(500) },
            listing: ListingConfig {
                default_page_size: 20,
                max_page_size: 100,
                superset_cap: 500,
                required_locales: vec!["en".to_string(), "fr".to_string()],
            },
            promo: PromoConfig { code_length: 8, max_attempts: 10 },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 1024 * 1024, // 1MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://admin.staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
                run_migrations: false,
            },
            filter: FilterConfig { max_limit: Some(500) },
            listing: ListingConfig {
                default_page_size: 20,
                max_page_size: 50,
                superset_cap: 500,
                required_locales: vec!["en".to_string(), "fr".to_string()],
            },
            promo: PromoConfig { code_length: 8, max_attempts: 5 },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 1024 * 1024, // 1MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://admin.example.com".to_string()],
            },
        }
    }
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

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
    fn development_defaults() {
        let config = AppConfig::development();
        assert_eq!(config.filter.max_limit, Some(1000));
        assert_eq!(config.listing.superset_cap, 1000);
        assert!(config.database.run_migrations);
        assert!(config.database.url.is_none());
    }

    #[test]
    fn production_is_tighter() {
        let config = AppConfig::production();
        assert!(config.listing.superset_cap < AppConfig::development().listing.superset_cap);
        assert!(!config.database.run_migrations);
        assert!(config.promo.max_attempts > 0);
    }

    #[test]
    fn superset_cap_never_exceeds_filter_limit() {
        let mut config = AppConfig::development();
        config.filter.max_limit = Some(50);
        config.listing.superset_cap = 1000;
        assert_eq!(config.with_consistent_limits().listing.superset_cap, 50);

        let mut config = AppConfig::development();
        config.filter.max_limit = None;
        config.listing.superset_cap = 1000;
        assert_eq!(config.with_consistent_limits().listing.superset_cap, 1000);

        let mut config = AppConfig::production();
        config.listing.superset_cap = 0;
        assert_eq!(config.with_consistent_limits().listing.superset_cap, 1);

        for preset in [AppConfig::development(), AppConfig::staging(), AppConfig::production()] {
            let cap = preset.listing.superset_cap;
            assert_eq!(preset.with_consistent_limits().listing.superset_cap, cap);
        }
    }

    #[test]
    fn splits_comma_lists() {
        assert_eq!(split_list(" en, fr ,,de"), vec!["en", "fr", "de"]);
    }
}
