use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::api::auth::Caller;
use crate::errors::AppError;
use crate::models::{Subscription, SubscriptionPatch};
use crate::services::subscriptions::SubscribeRequest;
use crate::AppState;

use super::{ApiJson, ApiResponse};

pub async fn subscribe(
    State(state): State<AppState>,
    Caller(follower_id): Caller,
    ApiJson(req): ApiJson<SubscribeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Subscription>>), AppError> {
    let sub = state.subscriptions.subscribe(follower_id, req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(sub)))
}

pub async fn list(
    State(state): State<AppState>,
    Caller(follower_id): Caller,
) -> Result<Json<ApiResponse<Vec<Subscription>>>, AppError> {
    let subs = state.subscriptions.list(follower_id).await?;
    Ok(ApiResponse::ok(subs))
}

pub async fn update(
    State(state): State<AppState>,
    Caller(follower_id): Caller,
    Path(id): Path<Uuid>,
    ApiJson(patch): ApiJson<SubscriptionPatch>,
) -> Result<Json<ApiResponse<Subscription>>, AppError> {
    let sub = state.subscriptions.update(follower_id, id, patch).await?;
    Ok(ApiResponse::ok(sub))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    Caller(follower_id): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Subscription>>, AppError> {
    let sub = state.subscriptions.unsubscribe(follower_id, id).await?;
    Ok(ApiResponse::ok(sub))
}
