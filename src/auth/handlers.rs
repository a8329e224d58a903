use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use crate::AppState;
use crate::error::AppError;
use tracing::{info, error, warn};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received registration request for username: {}", req.username);

    match state
        .auth_service
        .register(&req.username, &req.password, req.roles.as_deref())
        .await
    {
        Ok(user) => {
            info!("Registration successful for username: {}", req.username);
            Ok(HttpResponse::Created().json(user))
        }
        Err(e) => {
            error!("Registration failed for username: {}: {}", req.username, e);
            Err(e)
        }
    }
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request for username: {}", req.username);

    match state.auth_service.login(&req.username, &req.password).await {
        Ok(token) => {
            info!("Login successful for username: {}", req.username);
            Ok(HttpResponse::Ok().json(AuthResponse { token }))
        }
        Err(e) => {
            warn!("Login failed for username: {}: {}", req.username, e);
            Err(e)
        }
    }
}
