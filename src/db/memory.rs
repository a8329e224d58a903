use std::collections::HashMap;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::models::{NewUser, PasswordHash, Role, User};
use super::{CredentialStore, SEED_ROLES};
use crate::error::DatabaseError;

/// Document-shaped user record: roles are kept as a list of ids, expanded on read.
#[derive(Debug, Clone)]
struct UserDocument {
    id: Uuid,
    username: String,
    password_hash: PasswordHash,
    role_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<NewUser> for UserDocument {
    fn from(user: NewUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            password_hash: user.password_hash,
            role_ids: user.role_ids,
            created_at: user.created_at,
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, UserDocument>>,
    roles: RwLock<Vec<Role>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded() -> Self {
        Self::with_roles(SEED_ROLES.iter().map(|name| Role::new(*name)).collect())
    }

    pub fn with_roles(roles: Vec<Role>) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            roles: RwLock::new(roles),
        }
    }

    /// Removes a role without touching the users that reference it.
    pub async fn remove_role(&self, name: &str) {
        self.roles.write().await.retain(|role| role.name != name);
    }

    async fn expand(&self, doc: &UserDocument) -> User {
        let roles = self.roles.read().await;
        NewUser {
            id: doc.id,
            username: doc.username.clone(),
            password_hash: doc.password_hash.clone(),
            role_ids: doc.role_ids.clone(),
            created_at: doc.created_at,
        }
        .into_user(&roles)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let doc = UserDocument::from(user);
        {
            let mut users = self.users.write().await;
            if users.values().any(|existing| existing.username == doc.username) {
                return Err(DatabaseError::Duplicate(format!(
                    "username '{}' already exists",
                    doc.username
                )));
            }
            users.insert(doc.id, doc.clone());
        }

        Ok(self.expand(&doc).await)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let doc = self
            .users
            .read()
            .await
            .values()
            .find(|doc| doc.username == username)
            .cloned();

        match doc {
            Some(doc) => Ok(Some(self.expand(&doc).await)),
            None => Ok(None),
        }
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let doc = self.users.read().await.get(&id).cloned();

        match doc {
            Some(doc) => Ok(Some(self.expand(&doc).await)),
            None => Ok(None),
        }
    }

    async fn find_roles_by_names(&self, names: &[String]) -> Result<Vec<Role>, DatabaseError> {
        let mut found: Vec<Role> = self
            .roles
            .read()
            .await
            .iter()
            .filter(|role| names.contains(&role.name))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: PasswordHash,
    ) -> Result<(), DatabaseError> {
        let mut users = self.users.write().await;
        let doc = users.get_mut(&id).ok_or(DatabaseError::NotFound)?;
        doc.password_hash = password_hash;
        Ok(())
    }
}
