use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AuthError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub password: String,
}

pub async fn profile(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(user.into_inner())
}

pub async fn admin_only(user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    if !user.is_admin() {
        warn!("Admin access denied for username: {}", user.username);
        return Err(AuthError::Forbidden.into());
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Welcome Admin" })))
}

pub async fn change_password(
    user: AuthenticatedUser,
    req: web::Json<ChangePasswordRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state
        .auth_service
        .change_password(user.id, &req.password)
        .await?;

    info!("Password updated for username: {}", user.username);
    Ok(HttpResponse::Ok().json(json!({ "message": "Password updated" })))
}
