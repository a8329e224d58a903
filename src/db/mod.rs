//! Credential and role persistence.
//!
//! `CredentialStore` is the seam between the auth service and the backing
//! database. Two backends implement it: PostgreSQL through sqlx, and an
//! in-process store used for development and tests. `connect` picks one from
//! the scheme of the configured database URL.

pub mod memory;
pub mod models;
pub mod postgres;

use std::sync::Arc;
use async_trait::async_trait;
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::{AppError, DatabaseError};

pub use memory::MemoryStore;
pub use models::{NewUser, PasswordHash, Role, User, ADMIN_ROLE};
pub use postgres::PgStore;

/// Roles every fresh store starts with.
pub const SEED_ROLES: [&str; 2] = [ADMIN_ROLE, "User"];

pub type SharedStore = Arc<dyn CredentialStore + Send + Sync>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore {
    /// Persists a new user. Fails with `DatabaseError::Duplicate` when the
    /// username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    /// Returns the roles whose names appear in `names`, ordered by name.
    /// Names with no matching role are skipped without error.
    async fn find_roles_by_names(&self, names: &[String]) -> Result<Vec<Role>, DatabaseError>;

    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: PasswordHash,
    ) -> Result<(), DatabaseError>;
}

pub async fn connect(config: &DatabaseConfig) -> Result<SharedStore, AppError> {
    let url = Url::parse(&config.url)
        .map_err(|e| AppError::ConfigError(format!("Invalid database url: {}", e)))?;

    match url.scheme() {
        "memory" => {
            info!("Using in-memory credential store");
            Ok(Arc::new(MemoryStore::seeded()))
        }
        "postgres" | "postgresql" => {
            info!("Connecting to PostgreSQL at {}", url.host_str().unwrap_or("localhost"));
            let store = PgStore::connect(&config.url, config.max_connections).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        other => Err(AppError::ConfigError(format!(
            "Unsupported database scheme: {}",
            other
        ))),
    }
}
