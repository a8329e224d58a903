//! Authentication module
//!
//! Password hashing, token issuance and verification, the bearer-token
//! middleware, and the register/login handlers.

pub mod handlers;
pub mod middleware;
mod password;
mod service;
mod token;

pub use middleware::{require_auth, AuthenticatedUser};
pub use password::{PasswordHasher, MIN_BCRYPT_COST};
pub use service::AuthService;
pub use token::{Claims, TokenIssuer};
