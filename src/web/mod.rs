pub mod admin;
pub mod auth;
pub mod board;
pub mod profile;
pub mod projects;
pub mod reports;
pub mod session;
pub mod survey;
pub mod teams;

use crate::state::SharedState;
use axum::{routing::get, Router};

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router(state.clone()))
        .nest("/profile", profile::router(state.clone()))
        .nest("/projects", projects::router(state.clone()))
        .nest("/teams", teams::router(state.clone()))
        .nest("/survey", survey::router(state.clone()))
        .nest("/reports", reports::router(state.clone()))
        .nest("/admin", admin::router(state.clone()))
        .merge(board::router(state))
}
