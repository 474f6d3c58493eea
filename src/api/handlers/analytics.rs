use axum::extract::State;
use axum::Json;

use crate::api::auth::Caller;
use crate::errors::AppError;
use crate::services::analytics::{self, CopyAnalytics};
use crate::AppState;

use super::ApiResponse;

/// GET /api/v1/copy-trading/analytics: P&L over the caller's active subscriptions.
pub async fn copy_trading(
    State(state): State<AppState>,
    Caller(follower_id): Caller,
) -> Result<Json<ApiResponse<CopyAnalytics>>, AppError> {
    let analytics = analytics::follower_analytics(state.store.as_ref(), follower_id).await?;
    Ok(ApiResponse::ok(analytics))
}
