// Admin API routing and validation tests
//
// These run without infrastructure: the pool is lazy (never connected) and
// every asserted path either validates input before touching a store or
// reports the degraded dependency.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tower::util::ServiceExt;

use common::config::GatewayConfig;
use common::db::DbPool;
use common::gateway::{MembershipGateway, RestGateway};
use common::registry::GuildJobRegistry;
use common::rotation::RotationExecutor;
use common::scheduler::RotationScheduler;
use common::stores::{GuildConfigStore, LeaderboardStore, PgGuildConfigStore, PgLeaderboardStore};
use rotator::routes::create_router;
use rotator::state::AppState;

fn test_router() -> axum::Router {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgresql://localhost:1/laurel_unreachable")
        .expect("lazy pool");
    let db_pool = DbPool::from_pool(pool);

    let gateway = Arc::new(
        RestGateway::new(&GatewayConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            bot_token: "test".to_string(),
            request_timeout_seconds: 1,
        })
        .expect("gateway"),
    );
    let config_store = Arc::new(PgGuildConfigStore::new(db_pool.clone()));
    let leaderboard = Arc::new(PgLeaderboardStore::new(db_pool.clone()));
    let executor = Arc::new(RotationExecutor::new(
        Arc::clone(&config_store) as Arc<dyn GuildConfigStore>,
        Arc::clone(&leaderboard) as Arc<dyn LeaderboardStore>,
        Arc::clone(&gateway) as Arc<dyn MembershipGateway>,
    ));
    let scheduler = Arc::new(RotationScheduler::new(
        Arc::clone(&config_store) as Arc<dyn GuildConfigStore>,
        Arc::clone(&gateway) as Arc<dyn MembershipGateway>,
        Arc::new(GuildJobRegistry::new()),
        executor,
        chrono_tz::UTC,
    ));

    let state = AppState {
        db_pool,
        scheduler,
        config_store,
        leaderboard,
    };
    create_router(state)
}

#[tokio::test]
async fn test_health_reports_degraded_without_database() {
    let router = test_router();
    let response = router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_update_rejects_invalid_cron_expression() {
    let router = test_router();
    let body = serde_json::json!({
        "enabled": true,
        "title_role_id": 1,
        "schedule_expression": "definitely not cron",
    });
    let response = router
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/guilds/1/rotation")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_rejects_enabling_without_role() {
    let router = test_router();
    let body = serde_json::json!({
        "enabled": true,
        "schedule_expression": "0 0 12 * * MON",
    });
    let response = router
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/guilds/1/rotation")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_rejects_unknown_timezone() {
    let router = test_router();
    let body = serde_json::json!({
        "enabled": false,
        "timezone": "Mars/Olympus_Mons",
    });
    let response = router
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/guilds/1/rotation")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_rotation_surfaces_store_failure() {
    let router = test_router();
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/guilds/1/rotation")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
