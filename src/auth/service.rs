use chrono::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::password::PasswordHasher;
use crate::auth::token::TokenIssuer;
use crate::config::AuthConfig;
use crate::db::{NewUser, SharedStore, User};
use crate::error::{AppError, AuthError};

pub struct AuthService {
    store: SharedStore,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(store: SharedStore, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    pub fn from_config(store: SharedStore, config: &AuthConfig) -> Self {
        Self::new(
            store,
            PasswordHasher::new(config.bcrypt_cost),
            TokenIssuer::new(&config.jwt_secret, Duration::hours(config.token_expiry_hours)),
        )
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Creates a user. Role names that do not match a stored role are ignored.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        roles: Option<&[String]>,
    ) -> Result<User, AppError> {
        require_field("username", username)?;
        require_field("password", password)?;

        let password_hash = self.hasher.hash(password).await?;

        let role_ids = match roles {
            Some(names) if !names.is_empty() => {
                let found = self.store.find_roles_by_names(names).await?;
                if found.len() < names.len() {
                    debug!(
                        "Registration for {} requested {} role(s), {} matched",
                        username,
                        names.len(),
                        found.len()
                    );
                }
                found.into_iter().map(|role| role.id).collect()
            }
            _ => Vec::new(),
        };

        let user = self
            .store
            .create_user(NewUser::new(username.to_string(), password_hash, role_ids))
            .await?;

        info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Checks credentials and returns a signed token. An unknown username and
    /// a wrong password both come back as `InvalidCredentials`.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.verify(password, &user.password_hash).await {
            return Err(AuthError::InvalidCredentials.into());
        }

        self.tokens.issue(user.id)
    }

    /// Resolves a bearer token to the user it was issued for, roles expanded.
    pub async fn authenticate(&self, token: &str) -> Result<User, AppError> {
        let user_id = self.tokens.verify(token)?;

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(user)
    }

    /// Rehashes and stores a new password for an existing user.
    pub async fn change_password(&self, user_id: Uuid, password: &str) -> Result<(), AppError> {
        require_field("password", password)?;

        let password_hash = self.hasher.hash(password).await?;
        self.store.update_password_hash(user_id, password_hash).await?;

        info!("Password changed for user {}", user_id);
        Ok(())
    }
}

fn require_field(name: &str, value: &str) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::ValidationError(format!("{} is required", name)));
    }
    Ok(())
}
