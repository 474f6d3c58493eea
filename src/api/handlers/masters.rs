use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::auth::Caller;
use crate::errors::AppError;
use crate::models::{MasterApplication, MasterTrader};
use crate::services::masters::{MasterDetail, MasterPage};
use crate::AppState;

use super::{ApiJson, ApiResponse};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiResponse<MasterPage>>, AppError> {
    let page = state.masters.list(q.page, q.limit).await?;
    Ok(ApiResponse::ok(page))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MasterDetail>>, AppError> {
    let detail = state.masters.detail(id).await?;
    Ok(ApiResponse::ok(detail))
}

pub async fn apply(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    ApiJson(application): ApiJson<MasterApplication>,
) -> Result<(StatusCode, Json<ApiResponse<MasterTrader>>), AppError> {
    let master = state.masters.apply(user_id, application).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(master)))
}
