//! AMM Protocol Routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use amm::{
    AddLiquidity, LiquidityAdded, LiquidityRemoved, Pair, RemoveLiquidity, Route, SwapOutcome,
};
use meadow_core::{TokenId, TxContext};

use crate::dto::{
    reject, ApiError, ApiResult, CreatePairRequest, PairsResponse, QuoteRequest, QuoteResponse,
    RouteRequest, SwapRequest,
};
use crate::state::now;
use crate::{AppState, Principal};

/// Create AMM routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pairs", get(get_pairs).post(create_pair))
        .route("/pairs/:token_a/:token_b", get(get_pair))
        .route("/quote", post(get_quote))
        .route("/route", post(find_route))
        .route("/liquidity/add", post(add_liquidity))
        .route("/liquidity/remove", post(remove_liquidity))
        .route("/swap", post(swap))
}

/// GET /amm/pairs - All pairs in creation order
async fn get_pairs(State(state): State<AppState>) -> ApiResult<PairsResponse> {
    let pairs = state.read().await.router.all_pairs().map_err(reject)?;
    let count = pairs.len();
    Ok(Json(PairsResponse { pairs, count }))
}

/// POST /amm/pairs - Create an empty pair
async fn create_pair(
    State(state): State<AppState>,
    Principal(sender): Principal,
    Json(request): Json<CreatePairRequest>,
) -> Result<(StatusCode, Json<Pair>), (StatusCode, Json<ApiError>)> {
    let ctx = TxContext::new(sender, now());
    let pair = state
        .write()
        .await
        .router
        .create_pair(&ctx, &request.token_a, &request.token_b)
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(pair)))
}

/// GET /amm/pairs/:token_a/:token_b - Pair record with reserves
async fn get_pair(
    State(state): State<AppState>,
    Path((token_a, token_b)): Path<(TokenId, TokenId)>,
) -> ApiResult<Pair> {
    let pair = state
        .read()
        .await
        .router
        .pair_info(&token_a, &token_b)
        .map_err(reject)?;
    Ok(Json(pair))
}

/// POST /amm/quote - Chained exact-input quote along a path
async fn get_quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> ApiResult<QuoteResponse> {
    let amounts = state
        .read()
        .await
        .router
        .get_amounts_out(request.amount_in, &request.path)
        .map_err(reject)?;
    let amount_out = amounts.last().copied().unwrap_or_default();
    Ok(Json(QuoteResponse {
        amounts,
        amount_out,
    }))
}

/// POST /amm/route - Best path between two tokens
async fn find_route(
    State(state): State<AppState>,
    Json(request): Json<RouteRequest>,
) -> ApiResult<Route> {
    let route = state
        .read()
        .await
        .router
        .find_best_path(
            &request.token_in,
            &request.token_out,
            request.amount_in,
            request.max_hops,
        )
        .map_err(reject)?;

    route.map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(format!(
                "No route from {} to {}",
                request.token_in, request.token_out
            ))),
        )
    })
}

/// POST /amm/liquidity/add
async fn add_liquidity(
    State(state): State<AppState>,
    Principal(sender): Principal,
    Json(params): Json<AddLiquidity>,
) -> ApiResult<LiquidityAdded> {
    let ctx = TxContext::new(sender, now());
    let added = state
        .write()
        .await
        .router
        .add_liquidity(&ctx, &params)
        .map_err(reject)?;
    Ok(Json(added))
}

/// POST /amm/liquidity/remove
async fn remove_liquidity(
    State(state): State<AppState>,
    Principal(sender): Principal,
    Json(params): Json<RemoveLiquidity>,
) -> ApiResult<LiquidityRemoved> {
    let ctx = TxContext::new(sender, now());
    let removed = state
        .write()
        .await
        .router
        .remove_liquidity(&ctx, &params)
        .map_err(reject)?;
    Ok(Json(removed))
}

/// POST /amm/swap - Exact-input swap
async fn swap(
    State(state): State<AppState>,
    Principal(sender): Principal,
    Json(request): Json<SwapRequest>,
) -> ApiResult<SwapOutcome> {
    let to = request.to.unwrap_or_else(|| sender.clone());
    let ctx = TxContext::new(sender, now());
    let outcome = state
        .write()
        .await
        .router
        .swap_exact_tokens_for_tokens(
            &ctx,
            request.amount_in,
            request.amount_out_min,
            &request.path,
            &to,
        )
        .map_err(reject)?;

    tracing::info!(
        sender = %ctx.sender,
        amount_in = outcome.amount_in(),
        amount_out = outcome.amount_out(),
        hops = outcome.hops.len(),
        "Swap executed"
    );
    Ok(Json(outcome))
}
