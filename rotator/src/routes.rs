use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the admin API router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/guilds/:guild_id/rotation",
            get(handlers::rotation::get_rotation).put(handlers::rotation::update_rotation),
        )
        .route(
            "/api/guilds/:guild_id/rotation/run",
            post(handlers::rotation::run_rotation),
        )
        .route(
            "/api/guilds/:guild_id/leaderboard",
            get(handlers::leaderboard::get_leaderboard),
        )
        .route(
            "/api/guilds/:guild_id/leaderboard/:user_id",
            post(handlers::leaderboard::adjust_points),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
