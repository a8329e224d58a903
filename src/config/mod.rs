use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::env;

use crate::auth::MIN_BCRYPT_COST;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// `memory://` selects the in-process store, `postgres://...` a PostgreSQL database.
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiry_hours: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_any_origin: bool,
    pub max_age: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Self::defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        // E.g., `APP_SERVER__PORT=5001` would set `Settings.server.port`
        Self::finish(builder, Self::environment())
    }

    /// Settings for tests: in-memory store, a fixed secret and the cheapest
    /// bcrypt cost. Never reads the process environment or config files.
    pub fn new_for_test() -> Result<Self, ConfigError> {
        let builder = Self::defaults(Config::builder())?
            .set_override("environment", "test")?
            .set_override("server.workers", 1)?
            .set_override("database.max_connections", 2)?
            .set_override("auth.jwt_secret", "test_secret")?
            .set_override("auth.bcrypt_cost", MIN_BCRYPT_COST as i64)?;

        Self::validate(builder.build()?.try_deserialize()?)
    }

    fn defaults(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        builder
            .set_default("environment", "development")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("database.url", "memory://")?
            .set_default("database.max_connections", 5)?
            .set_default("auth.jwt_secret", "development_secret")?
            .set_default("auth.token_expiry_hours", 1)?
            .set_default("auth.bcrypt_cost", 10)?
            .set_default("cors.enabled", false)?
            .set_default("cors.allow_any_origin", false)?
            .set_default("cors.max_age", 3600)
    }

    fn environment() -> Environment {
        Environment::with_prefix("app")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn finish(
        builder: ConfigBuilder<DefaultState>,
        environment: Environment,
    ) -> Result<Self, ConfigError> {
        let settings: Settings = builder.add_source(environment).build()?.try_deserialize()?;
        Self::validate(settings)
    }

    fn validate(settings: Settings) -> Result<Self, ConfigError> {
        if settings.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message("auth.jwt_secret must not be empty".into()));
        }
        if settings.auth.token_expiry_hours <= 0 {
            return Err(ConfigError::Message(
                "auth.token_expiry_hours must be positive".into(),
            ));
        }
        Ok(settings)
    }
}
