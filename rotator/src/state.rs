use std::sync::Arc;

use common::db::DbPool;
use common::scheduler::RotationScheduler;
use common::stores::{PgGuildConfigStore, PgLeaderboardStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub scheduler: Arc<RotationScheduler>,
    pub config_store: Arc<PgGuildConfigStore>,
    pub leaderboard: Arc<PgLeaderboardStore>,
}
