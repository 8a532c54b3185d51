//! Health check endpoint

use axum::{extract::State, Json};

use crate::dto::{reject, ApiResult, HealthResponse};
use crate::AppState;

/// GET /health - Liveness plus registry sizes
pub async fn health_check(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    let exchange = state.read().await;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pairs: exchange.router.pair_count().map_err(reject)?,
        farm_pools: exchange.farm.pool_count().map_err(reject)?,
    }))
}
