//! Routes for the authenticated user: profile, admin-only area and password change.

pub mod handlers;

pub use handlers::{admin_only, change_password, profile};
