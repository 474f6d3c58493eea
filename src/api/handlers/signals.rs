use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::auth::Caller;
use crate::errors::AppError;
use crate::models::Signal;
use crate::services::signals::PublishSignalRequest;
use crate::AppState;

use super::{ApiJson, ApiResponse};

/// POST /api/v1/copy-trading/signals: record a master trade for propagation.
pub async fn publish(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    ApiJson(req): ApiJson<PublishSignalRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Signal>>), AppError> {
    let signal = state.signals.publish(user_id, req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(signal)))
}
