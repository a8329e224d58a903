//! Bearer-token gate for protected routes.
//!
//! `require_auth` runs before the handler: it verifies the token, loads the
//! user with roles expanded and stores it in the request extensions. Handlers
//! pick it up through the `AuthenticatedUser` extractor. Any failure answers
//! with a JSON error and the handler never runs.

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::http::header;
use actix_web::middleware::Next;
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, Ready};
use std::ops::Deref;
use tracing::{debug, warn};

use crate::db::User;
use crate::error::{AppError, AuthError};
use crate::AppState;

/// The user a request was authenticated as.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    pub fn into_inner(self) -> User {
        self.0
    }
}

impl Deref for AuthenticatedUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedUser>()
                .cloned()
                .ok_or(AppError::AuthError(AuthError::MissingToken)),
        )
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(req: &ServiceRequest) -> Result<String, AuthError> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .ok_or(AuthError::MissingToken)
}

async fn resolve_user(req: &ServiceRequest) -> Result<User, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| AppError::InternalError("Application state not configured".into()))?;

    let token = bearer_token(req)?;
    state.auth_service.authenticate(&token).await
}

pub async fn require_auth<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let resolved = resolve_user(&req).await;
    match resolved {
        Ok(user) => {
            debug!("Authenticated {} for {}", user.username, req.path());
            req.extensions_mut().insert(AuthenticatedUser(user));
            next.call(req).await.map(ServiceResponse::map_into_left_body)
        }
        Err(e) => {
            warn!("Rejected request to {}: {}", req.path(), e);
            Ok(req.error_response(e).map_into_right_body())
        }
    }
}
