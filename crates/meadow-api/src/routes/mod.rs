//! API route handlers

pub mod amm;
pub mod farm;
pub mod health;
pub mod ledger;

use axum::{routing::get, Router};

use crate::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/ledger", ledger::router())
        .nest("/amm", amm::router())
        .nest("/farm", farm::router())
        .with_state(state)
}
