//! Configuration management
//!
//! One `Config` value is built at process start and passed by reference to
//! everything that needs it. Nothing below the binaries reads the environment.
//!
//! # Environment Variables
//!
//! - `API_HOST` / `API_PORT`: bind address (default: 0.0.0.0:8080)
//! - `CORS_ORIGINS`: comma-separated allowed origins (default: `*`)
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DATABASE_MAX_CONNECTIONS` / `DATABASE_MIN_CONNECTIONS`: pool bounds
//! - `REDIS_URL`: Redis connection string (required)
//! - `REDIS_COMMAND_TIMEOUT_SECS`: per-command timeout (default: 5)
//! - `JWT_SECRET`: HS256 signing secret, at least 32 characters (required)
//! - `OPERATION_TIMEOUT_MS`: bound on every store operation (default: 5000)
//! - `PROJECT_CACHE_TTL_SECS`: single project cache TTL (default: 600)
//! - `TASK_LIST_CACHE_TTL_SECS`: per-project task list TTL (default: 300)
//! - `SWEEP_INTERVAL_SECS`: overdue sweep period (default: 600)
//! - `RATE_LIMIT_PER_MINUTE`: requests per client IP per minute (default: 100)
//! - `SEED_DEMO_USERS`: create demo accounts at startup (default: false)
//! - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
//!
//! # Example
//!
//! ```no_run
//! use taskboard_shared::config::Config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! println!("Server will listen on {}", config.bind_address());
//! # Ok(())
//! # }
//! ```

use crate::cache::redis::RedisConfig;
use crate::db::pool::DatabaseConfig;
use crate::telemetry::LogFormat;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Minimum accepted length of the JWT signing secret
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },

    /// JWT secret is too short to be safe for HS256
    #[error("JWT_SECRET must be at least 32 characters long")]
    WeakJwtSecret,
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server configuration
    pub api: ApiConfig,

    /// PostgreSQL pool configuration
    pub database: DatabaseConfig,

    /// Redis configuration
    pub redis: RedisConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Cache TTLs
    pub cache: CacheConfig,

    /// Overdue sweep scheduling
    pub sweep: SweepConfig,

    /// Per-IP request limit
    pub rate_limit: RateLimitConfig,

    /// Upper bound on any single store operation
    pub operation_timeout: Duration,

    /// Create demo admin/manager/member accounts on startup
    pub seed_demo_users: bool,

    /// Log output format
    pub log_format: LogFormat,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` means permissive
    pub cors_origins: Vec<String>,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Cache TTL configuration
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// TTL for `project:<id>` entries
    pub project_ttl: Duration,

    /// TTL for `tasks:project:<id>` entries
    pub task_list_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            project_ttl: Duration::from_secs(600),
            task_list_ttl: Duration::from_secs(300),
        }
    }
}

/// Overdue sweep configuration
#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    /// Time between sweeps
    pub interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(600),
        }
    }
}

/// Rate limit configuration
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Requests allowed per client per window
    pub requests_per_window: u32,

    /// Window length
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 100,
            window: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// Reads a `.env` file first when one is present.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a value does not
    /// parse, or the JWT secret is shorter than 32 characters.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable source
    ///
    /// `from_env` is this function over `std::env`; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakJwtSecret);
        }

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let database = DatabaseConfig {
            url: required("DATABASE_URL")?,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            min_connections: parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", 2)?,
            ..DatabaseConfig::default()
        };

        let redis = RedisConfig {
            url: required("REDIS_URL")?,
            command_timeout_secs: parse_or(&lookup, "REDIS_COMMAND_TIMEOUT_SECS", 5)?,
        };

        let rate_limit = RateLimitConfig {
            requests_per_window: parse_or(&lookup, "RATE_LIMIT_PER_MINUTE", 100)?,
            ..RateLimitConfig::default()
        };

        Ok(Self {
            api: ApiConfig {
                host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "API_PORT", 8080)?,
                cors_origins,
            },
            database,
            redis,
            jwt: JwtConfig { secret: jwt_secret },
            cache: CacheConfig {
                project_ttl: Duration::from_secs(parse_or(&lookup, "PROJECT_CACHE_TTL_SECS", 600)?),
                task_list_ttl: Duration::from_secs(parse_or(
                    &lookup,
                    "TASK_LIST_CACHE_TTL_SECS",
                    300,
                )?),
            },
            sweep: SweepConfig {
                interval: Duration::from_secs(parse_or(&lookup, "SWEEP_INTERVAL_SECS", 600)?),
            },
            rate_limit,
            operation_timeout: Duration::from_millis(parse_or(
                &lookup,
                "OPERATION_TIMEOUT_MS",
                5000,
            )?),
            seed_demo_users: parse_or(&lookup, "SEED_DEMO_USERS", false)?,
            log_format: parse_or(&lookup, "LOG_FORMAT", LogFormat::Pretty)?,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
