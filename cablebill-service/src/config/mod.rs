use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub mongodb: MongoConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    /// Run the customer cascade delete inside a multi-document transaction.
    /// Requires a replica set or sharded cluster.
    pub use_transactions: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
    Disabled,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub redis_url: String,
    pub dashboard_ttl_seconds: u64,
    pub list_ttl_seconds: u64,
    pub payment_requests_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    pub session_ttl_hours: i64,
    pub reset_ttl_minutes: i64,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    /// Exposes `POST /setup/create-admin`. Turn off once the first admin exists.
    pub setup_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
    pub forgot_password_attempts: u32,
    pub forgot_password_window_seconds: u64,
    pub submit_attempts: u32,
    pub submit_window_seconds: u64,
}

impl BillingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let store_backend: StoreBackend = get_env("STORE_BACKEND", Some("mongo"), false)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let needs_mongo = is_prod && store_backend == StoreBackend::Mongo;

        let cache_backend: CacheBackend = get_env("CACHE_BACKEND", Some("memory"), false)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let config = BillingConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("cablebill-service"), false)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            store: StoreConfig {
                backend: store_backend,
                mongodb: MongoConfig {
                    uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), needs_mongo)?,
                    database: get_env("MONGODB_DATABASE", Some("cablebill"), needs_mongo)?,
                    use_transactions: get_parsed("MONGODB_USE_TRANSACTIONS", "false")?,
                },
            },
            cache: CacheConfig {
                backend: cache_backend,
                redis_url: get_env(
                    "REDIS_URL",
                    Some("redis://localhost:6379"),
                    is_prod && cache_backend == CacheBackend::Redis,
                )?,
                dashboard_ttl_seconds: get_parsed("CACHE_DASHBOARD_TTL_SECONDS", "30")?,
                list_ttl_seconds: get_parsed("CACHE_LIST_TTL_SECONDS", "10")?,
                payment_requests_ttl_seconds: get_parsed("CACHE_PAYMENT_REQUESTS_TTL_SECONDS", "5")?,
            },
            jwt: JwtConfig {
                secret: Secret::new(get_env(
                    "JWT_SECRET",
                    Some("dev-only-secret-change-me-before-deploying"),
                    is_prod,
                )?),
                session_ttl_hours: get_parsed("JWT_SESSION_TTL_HOURS", "12")?,
                reset_ttl_minutes: get_parsed("JWT_RESET_TTL_MINUTES", "60")?,
            },
            password: PasswordConfig {
                memory_kib: get_parsed("ARGON2_MEMORY_KIB", "19456")?,
                iterations: get_parsed("ARGON2_ITERATIONS", "2")?,
                parallelism: get_parsed("ARGON2_PARALLELISM", "1")?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                setup_enabled: get_parsed("SETUP_ENABLED", if is_prod { "false" } else { "true" })?,
            },
            rate_limit: RateLimitConfig {
                login_attempts: get_parsed("RATE_LIMIT_LOGIN_ATTEMPTS", "10")?,
                login_window_seconds: get_parsed("RATE_LIMIT_LOGIN_WINDOW_SECONDS", "900")?,
                forgot_password_attempts: get_parsed("RATE_LIMIT_FORGOT_PASSWORD_ATTEMPTS", "3")?,
                forgot_password_window_seconds: get_parsed(
                    "RATE_LIMIT_FORGOT_PASSWORD_WINDOW_SECONDS",
                    "3600",
                )?,
                submit_attempts: get_parsed("RATE_LIMIT_SUBMIT_ATTEMPTS", "10")?,
                submit_window_seconds: get_parsed("RATE_LIMIT_SUBMIT_WINDOW_SECONDS", "3600")?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.jwt.session_ttl_hours <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_SESSION_TTL_HOURS must be positive"
            )));
        }

        if self.jwt.reset_ttl_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_RESET_TTL_MINUTES must be positive"
            )));
        }

        if self.password.memory_kib == 0
            || self.password.iterations == 0
            || self.password.parallelism == 0
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Argon2 cost parameters must be positive"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.jwt.secret.expose_secret().len() < 32 {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "JWT_SECRET must be at least 32 bytes in production"
                )));
            }

            if self.store.backend == StoreBackend::Memory {
                tracing::warn!("In-memory store in production: all data is lost on restart");
            }

            if self.security.setup_enabled {
                tracing::warn!("SETUP_ENABLED is on in production - disable it once the admin exists");
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, required: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if required {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn get_parsed<T>(key: &str, default: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), false)?
        .trim()
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("Invalid {}: {}", key, e)))
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

impl std::str::FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "redis" => Ok(CacheBackend::Redis),
            "disabled" | "off" | "none" => Ok(CacheBackend::Disabled),
            _ => Err(format!("Invalid cache backend: {}", s)),
        }
    }
}
