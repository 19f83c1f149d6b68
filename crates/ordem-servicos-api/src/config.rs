//! Process configuration loaded from environment variables.
//!
//! Every setting is optional. Missing or empty variables take their default
//! and so do numeric variables that fail to parse.

use std::env;
use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::error::AppError;

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// PostgreSQL connection settings.
    pub database: DatabaseConfig,
    /// Redis connection settings.
    pub redis: RedisConfig,
    /// RabbitMQ connection settings.
    pub rabbitmq: RabbitMqConfig,
    /// Token signing settings.
    pub jwt: JwtConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind (`HOST`).
    pub host: String,
    /// Port to bind (`PORT`).
    pub port: u16,
    /// Run mode (`GIN_MODE`): `release` switches logs to JSON.
    pub mode: String,
}

impl ServerConfig {
    /// Whether the server runs in release mode.
    #[must_use]
    pub fn is_release(&self) -> bool {
        self.mode == "release"
    }
}

/// PostgreSQL configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    /// libpq-style SSL mode (`disable`, `prefer`, `require`, ...).
    pub ssl_mode: String,
    /// Upper bound of the connection pool.
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Builds connection options for the pool.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `ssl_mode` is not a recognised mode.
    pub fn connect_options(&self) -> Result<PgConnectOptions, AppError> {
        let ssl_mode = PgSslMode::from_str(&self.ssl_mode)
            .map_err(|e| AppError::Config(format!("DB_SSLMODE: {e}")))?;

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name)
            .ssl_mode(ssl_mode))
    }
}

/// Redis configuration. Read for completeness, no component connects yet.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub db: u32,
}

/// RabbitMQ configuration. Read for completeness, no component connects yet.
#[derive(Debug, Clone)]
pub struct RabbitMqConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

/// JWT configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Token lifetime in hours.
    pub expiration_hours: u32,
}

impl Config {
    /// Loads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, which returns the value of a
    /// variable or `None` when it is unset.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_owned())
        };
        let number = |key: &str, default| parse_or(lookup(key), default);

        Self {
            server: ServerConfig {
                host: text("HOST", "0.0.0.0"),
                port: number("PORT", 8080),
                mode: text("GIN_MODE", "debug"),
            },
            database: DatabaseConfig {
                host: text("DB_HOST", "localhost"),
                port: number("DB_PORT", 5432),
                user: text("DB_USER", "postgres"),
                password: text("DB_PASSWORD", ""),
                name: text("DB_NAME", "ordem_servicos"),
                ssl_mode: text("DB_SSLMODE", "disable"),
                max_connections: parse_or(lookup("DB_MAX_CONNECTIONS"), 10),
            },
            redis: RedisConfig {
                host: text("REDIS_HOST", "localhost"),
                port: number("REDIS_PORT", 6379),
                password: text("REDIS_PASSWORD", ""),
                db: parse_or(lookup("REDIS_DB"), 0),
            },
            rabbitmq: RabbitMqConfig {
                host: text("RABBITMQ_HOST", "localhost"),
                port: number("RABBITMQ_PORT", 5672),
                user: text("RABBITMQ_USER", "guest"),
                password: text("RABBITMQ_PASSWORD", "guest"),
            },
            jwt: JwtConfig {
                secret: text("JWT_SECRET", "your-secret-key"),
                expiration_hours: parse_or(lookup("JWT_EXPIRATION"), 24),
            },
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
