pub mod auth;
pub mod dashboard;
pub mod faculty;
pub mod oversight;
pub mod review;
pub mod session;

use crate::state::SharedState;
use axum::{routing::get, Router};

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes(state))
}

fn api_routes(state: SharedState) -> Router {
    Router::new()
        .route("/config", get(auth::config))
        .with_state(state.clone())
        .nest("/auth", auth::router(state.clone()))
        .nest("/dashboard", dashboard::router(state.clone()))
        .nest("/faculty", faculty::router(state.clone()))
        .nest("/review", review::router(state.clone()))
        .nest("/oversight", oversight::router(state))
}
