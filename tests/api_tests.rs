mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use copytrade::api::router::create_router;
use copytrade::config::AppConfig;

use common::TestEnv;

fn build_test_app(env: &TestEnv) -> Router {
    create_router(env.state(AppConfig::for_memory()))
}

async fn body_json(resp: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post_json(uri: &str, account: Uuid, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-account-id", account.to_string())
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_as(uri: &str, account: Uuid) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-account-id", account.to_string())
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let env = TestEnv::new();
    let app = build_test_app(&env);

    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let env = TestEnv::new();
    let app = build_test_app(&env);

    let resp = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_missing_account_header_is_unauthorized() {
    let env = TestEnv::new();
    let app = build_test_app(&env);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/copy-trading/subscriptions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_malformed_account_header_is_bad_request() {
    let env = TestEnv::new();
    let app = build_test_app(&env);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/copy-trading/subscriptions")
                .header("x-account-id", "not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bearer_token_enforced_when_configured() {
    let env = TestEnv::new();
    let mut config = AppConfig::for_memory();
    config.api_token = Some("s3cret".into());
    let app = create_router(env.state(config));
    let caller = Uuid::new_v4();

    let resp = app
        .clone()
        .oneshot(get_as("/api/v1/copy-trading/subscriptions", caller))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/copy-trading/subscriptions")
                .header("x-account-id", caller.to_string())
                .header("authorization", "Bearer s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Health stays public
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_subscribe_and_list_flow() {
    let env = TestEnv::new();
    let master = env.master(dec!(10000)).await;
    let follower = env.follower(dec!(5000)).await;
    let app = build_test_app(&env);

    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/v1/copy-trading/subscribe",
            follower,
            json!({ "master_trader_id": master.id, "allocated_amount": "1500" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "active");
    assert_eq!(json["data"]["copy_percentage"], "100");
    assert_eq!(env.locked(follower).await, dec!(1500));

    let resp = app
        .clone()
        .oneshot(get_as("/api/v1/copy-trading/subscriptions", follower))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    let subs = json["data"].as_array().unwrap();
    assert_eq!(subs.len(), 1);
    let sub_id = subs[0]["id"].as_str().unwrap().to_string();

    // Second subscribe to the same master conflicts
    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/v1/copy-trading/subscribe",
            follower,
            json!({ "master_trader_id": master.id, "allocated_amount": "100" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/copy-trading/subscriptions/{sub_id}"))
                .header("x-account-id", follower.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["status"], "stopped");
    assert_eq!(env.locked(follower).await, dec!(0));
}

#[tokio::test]
async fn test_subscribe_error_statuses() {
    let env = TestEnv::new();
    let master = env.master(dec!(10000)).await;
    let follower = env.follower(dec!(100)).await;
    let app = build_test_app(&env);

    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/v1/copy-trading/subscribe",
            follower,
            json!({ "master_trader_id": master.id, "allocated_amount": "500" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].is_string());

    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/v1/copy-trading/subscribe",
            follower,
            json!({ "master_trader_id": master.id, "allocated_amount": "50", "leverage": 3 }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(post_json(
            "/api/v1/copy-trading/subscribe",
            follower,
            json!({ "master_trader_id": Uuid::new_v4(), "allocated_amount": "50" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_master_lifecycle_endpoints() {
    let env = TestEnv::new();
    let app = build_test_app(&env);
    let applicant = Uuid::new_v4();

    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/v1/copy-trading/apply-master",
            applicant,
            json!({ "strategy_name": "grid", "risk_level": "conservative" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["approval_status"], "pending");
    let master_id = json["data"]["id"].as_str().unwrap().to_string();

    // Pending masters are not listed
    let resp = app
        .clone()
        .oneshot(get_as("/api/v1/copy-trading/masters", applicant))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["data"]["total"], 0);

    let resp = app
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/admin/masters/{master_id}/approve"),
            applicant,
            json!({ "base_allocation": "2500" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["approval_status"], "approved");
    assert_eq!(json["data"]["base_allocation"], "2500");

    let resp = app
        .clone()
        .oneshot(get_as("/api/v1/copy-trading/masters?page=1&limit=5", applicant))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["data"]["total"], 1);
    assert_eq!(json["data"]["limit"], 5);

    let resp = app
        .oneshot(get_as(&format!("/api/v1/copy-trading/masters/{master_id}"), applicant))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert!(json["data"]["recent_signals"].is_array());
    assert!(json["data"]["performance_history"].is_array());
}

#[tokio::test]
async fn test_out_of_range_page_is_bad_request() {
    let env = TestEnv::new();
    let app = build_test_app(&env);

    let resp = app
        .oneshot(get_as(
            "/api/v1/copy-trading/masters?page=9223372036854775807",
            Uuid::new_v4(),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_oversized_signal_is_rejected() {
    let env = TestEnv::new();
    let master = env.master(dec!(10000)).await;
    let app = build_test_app(&env);

    let resp = app
        .oneshot(post_json(
            "/api/v1/copy-trading/signals",
            master.user_id,
            json!({
                "trading_pair": "BTC/USDT",
                "side": "buy",
                "quantity": "1000000000000000",
                "price": "1000000000000000",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signal_publish_requires_active_master() {
    let env = TestEnv::new();
    let master = env.master(dec!(10000)).await;
    let app = build_test_app(&env);
    let body = json!({
        "trading_pair": "eth/usdt",
        "side": "buy",
        "quantity": "2",
        "price": "3000",
    });

    let resp = app
        .clone()
        .oneshot(post_json("/api/v1/copy-trading/signals", master.user_id, body.clone()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["trading_pair"], "ETH/USDT");
    assert_eq!(json["data"]["status"], "pending");

    let resp = app
        .oneshot(post_json("/api/v1/copy-trading/signals", Uuid::new_v4(), body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_analytics_envelope() {
    let env = TestEnv::new();
    let app = build_test_app(&env);

    let resp = app
        .oneshot(get_as("/api/v1/copy-trading/analytics", Uuid::new_v4()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["summary"]["active_subscriptions"], 0);
    assert!(json["data"]["recent_trades"].is_array());
}

#[tokio::test]
async fn test_control_stop_resume() {
    let env = TestEnv::new();
    let state = env.state(AppConfig::for_memory());
    let pause_flag = state.pause_flag.clone();
    let app = create_router(state);
    let caller = Uuid::new_v4();

    let resp = app
        .clone()
        .oneshot(post_json("/api/control/stop", caller, json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(pause_flag.load(std::sync::atomic::Ordering::Relaxed));

    let resp = app
        .clone()
        .oneshot(get_as("/api/control/status", caller))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["paused"], true);
    assert_eq!(json["mode"], "dry_run");
    assert_eq!(json["store"], "memory");

    let resp = app
        .oneshot(post_json("/api/control/resume", caller, json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!pause_flag.load(std::sync::atomic::Ordering::Relaxed));
}

#[tokio::test]
async fn test_admin_routes_require_admin_token() {
    let env = TestEnv::new();
    let master = env.master(dec!(10000)).await;
    let mut config = AppConfig::for_memory();
    config.api_token = Some("shared".into());
    config.admin_api_token = Some("admin".into());
    let app = create_router(env.state(config));
    let uri = format!("/api/v1/admin/masters/{}/deactivate", master.id);

    let as_bearer = |token: &str| {
        Request::builder()
            .method("POST")
            .uri(&uri)
            .header("x-account-id", Uuid::new_v4().to_string())
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    };

    // The shared token is not enough for admin actions
    let resp = app.clone().oneshot(as_bearer("shared")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app.clone().oneshot(as_bearer("admin")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["is_active"], false);

    // ...and the admin token does not open the follower routes
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/copy-trading/subscriptions")
                .header("x-account-id", Uuid::new_v4().to_string())
                .header("authorization", "Bearer admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
