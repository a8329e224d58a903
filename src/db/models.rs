use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Name of the role that unlocks admin-only routes. Matched exactly.
pub const ADMIN_ROLE: &str = "Admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// A bcrypt digest. Only the password hasher and the stores construct one,
/// so a plaintext password cannot end up in a user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub(crate) fn from_digest(digest: String) -> Self {
        Self(digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A user with its role references expanded into full role records.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(rename = "password")]
    pub password_hash: PasswordHash,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|role| role.name == name)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

/// Everything a store needs to persist a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: PasswordHash,
    pub role_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    pub fn new(username: String, password_hash: PasswordHash, role_ids: Vec<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            role_ids,
            created_at: Utc::now(),
        }
    }

    /// Builds the stored view once the referenced roles are known. Ids
    /// without a matching role are dropped.
    pub fn into_user(self, known_roles: &[Role]) -> User {
        let roles = known_roles
            .iter()
            .filter(|role| self.role_ids.contains(&role.id))
            .cloned()
            .collect();

        User {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            roles,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_roles(names: &[&str]) -> User {
        let roles: Vec<Role> = names.iter().map(|n| Role::new(*n)).collect();
        NewUser::new(
            "alice".into(),
            PasswordHash::from_digest("$2b$04$digest".into()),
            roles.iter().map(|r| r.id).collect(),
        )
        .into_user(&roles)
    }

    #[test]
    fn test_admin_check_is_exact() {
        assert!(user_with_roles(&["User", "Admin"]).is_admin());
        assert!(!user_with_roles(&["admin"]).is_admin());
        assert!(!user_with_roles(&["ADMIN", "User"]).is_admin());
        assert!(!user_with_roles(&[]).is_admin());
    }

    #[test]
    fn test_dangling_role_ids_are_dropped() {
        let admin = Role::new("Admin");
        let new_user = NewUser::new(
            "bob".into(),
            PasswordHash::from_digest("$2b$04$digest".into()),
            vec![admin.id, Uuid::new_v4()],
        );

        let user = new_user.into_user(&[admin.clone()]);
        assert_eq!(user.roles, vec![admin]);
    }

    #[test]
    fn test_user_serializes_hash_as_password() {
        let user = user_with_roles(&["User"]);
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["password"], "$2b$04$digest");
        assert_eq!(json["roles"][0]["name"], "User");

        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["created_at", "id", "password", "roles", "username"]);
    }
}
