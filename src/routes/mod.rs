use axum::Router;
use sqlx::MySqlPool;

use crate::Config;

mod dashboard;
mod devices;
mod health;

// ---

pub fn router(pool: MySqlPool, config: Config) -> Router {
    // ---
    Router::new()
        .merge(dashboard::router())
        .merge(devices::router())
        .merge(health::router())
        .with_state((pool, config))
}
