use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::{require_admin, require_auth};
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Public routes
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Bearer token required when API_TOKEN is set
    let protected = Router::new()
        // Masters
        .route("/api/v1/copy-trading/masters", get(handlers::masters::list))
        .route("/api/v1/copy-trading/masters/:id", get(handlers::masters::detail))
        .route("/api/v1/copy-trading/apply-master", post(handlers::masters::apply))
        // Subscriptions
        .route("/api/v1/copy-trading/subscribe", post(handlers::subscriptions::subscribe))
        .route("/api/v1/copy-trading/subscriptions", get(handlers::subscriptions::list))
        .route(
            "/api/v1/copy-trading/subscriptions/:id",
            put(handlers::subscriptions::update).delete(handlers::subscriptions::unsubscribe),
        )
        // Analytics
        .route("/api/v1/copy-trading/analytics", get(handlers::analytics::copy_trading))
        // Signals
        .route("/api/v1/copy-trading/signals", post(handlers::signals::publish))
        // Control
        .route("/api/control/stop", post(handlers::control::stop))
        .route("/api/control/resume", post(handlers::control::resume))
        .route("/api/control/status", get(handlers::control::status))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // ADMIN_API_TOKEN when set, otherwise the shared token
    let admin = Router::new()
        .route("/api/v1/admin/masters/:id/approve", post(handlers::admin::approve_master))
        .route("/api/v1/admin/masters/:id/deactivate", post(handlers::admin::deactivate_master))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .merge(admin)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
