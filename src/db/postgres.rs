use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::models::{NewUser, PasswordHash, Role, User};
use super::CredentialStore;
use crate::error::DatabaseError;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Creates the tables and seeds the default roles.
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        Ok(())
    }

    async fn roles_for(&self, user_id: Uuid) -> Result<Vec<Role>, DatabaseError> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.id, r.name
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(roles)
    }

    async fn expand(&self, row: Option<UserRow>) -> Result<Option<User>, DatabaseError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let roles = self.roles_for(row.id).await?;

        Ok(Some(User {
            id: row.id,
            username: row.username,
            password_hash: PasswordHash::from_digest(row.password_hash),
            roles,
            created_at: row.created_at,
        }))
    }

    async fn insert_user(
        user: &NewUser,
        transaction: &mut Transaction<'_, Postgres>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(user.password_hash.as_str())
        .bind(user.created_at)
        .execute(&mut **transaction)
        .await?;

        for role_id in &user.role_ids {
            sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(user.id)
                .bind(role_id)
                .execute(&mut **transaction)
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut transaction = self.pool.begin().await?;

        match Self::insert_user(&user, &mut transaction).await {
            Ok(()) => transaction.commit().await?,
            Err(e) => {
                transaction.rollback().await?;
                return Err(e);
            }
        }
        debug!("Inserted user {} with {} role(s)", user.id, user.role_ids.len());

        self.find_user_by_id(user.id)
            .await?
            .ok_or(DatabaseError::NotFound)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool.as_ref())
        .await?;

        self.expand(row).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        self.expand(row).await
    }

    async fn find_roles_by_names(&self, names: &[String]) -> Result<Vec<Role>, DatabaseError> {
        let roles = sqlx::query_as::<_, Role>(
            "SELECT id, name FROM roles WHERE name = ANY($1) ORDER BY name",
        )
        .bind(names)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(roles)
    }

    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: PasswordHash,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash.as_str())
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }
}
