use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::AppState;

/// Bearer-token authentication middleware.
///
/// If `API_TOKEN` is set, every request must carry
/// `Authorization: Bearer <token>` matching that value.
/// If `API_TOKEN` is empty / unset, authentication is disabled (dev mode).
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    check_bearer(state.config.api_token.as_deref(), req, next).await
}

/// Admin routes accept only `ADMIN_API_TOKEN`, or `API_TOKEN` when no
/// separate admin token is configured.
pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let expected = state
        .config
        .admin_api_token
        .as_deref()
        .or(state.config.api_token.as_deref());
    check_bearer(expected, req, next).await
}

async fn check_bearer(expected: Option<&str>, req: Request, next: Next) -> Response {
    let Some(expected) = expected else {
        return next.run(req).await;
    };

    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok());

    match auth_header.and_then(|v| v.strip_prefix("Bearer ")) {
        Some(token) if token == expected => next.run(req).await,
        _ => AppError::Unauthorized.into_response(),
    }
}

/// Account on whose behalf the request acts, from the `X-Account-Id` header.
///
/// Identity is established upstream; this service only trusts the header.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("x-account-id")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        raw.trim()
            .parse::<Uuid>()
            .map(Caller)
            .map_err(|_| AppError::Validation("X-Account-Id must be a UUID".into()))
    }
}
