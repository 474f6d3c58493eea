use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::MasterTrader;
use crate::AppState;

use super::{ApiJson, ApiResponse};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApproveRequest {
    pub base_allocation: Option<Decimal>,
}

pub async fn approve_master(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<ApiJson<ApproveRequest>>,
) -> Result<Json<ApiResponse<MasterTrader>>, AppError> {
    let req = body.map(|ApiJson(r)| r).unwrap_or_default();
    let master = state.masters.approve(id, req.base_allocation).await?;
    Ok(ApiResponse::ok(master))
}

pub async fn deactivate_master(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MasterTrader>>, AppError> {
    let master = state.masters.deactivate(id).await?;
    Ok(ApiResponse::ok(master))
}
