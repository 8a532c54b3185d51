//! Token Ledger Routes

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use meadow_core::{Address, TokenId};
use token_ledger::TokenLedger;

use crate::dto::{reject, AllowanceResponse, ApiResult, ApproveRequest, BalanceResponse};
use crate::{AppState, Principal};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:token/balances/:owner", get(get_balance))
        .route("/approve", post(approve))
}

/// GET /ledger/:token/balances/:owner
async fn get_balance(
    State(state): State<AppState>,
    Path((token, owner)): Path<(TokenId, Address)>,
) -> ApiResult<BalanceResponse> {
    let exchange = state.read().await;
    let balance = exchange.ledger.balance_of(&token, &owner);
    Ok(Json(BalanceResponse {
        token,
        owner,
        balance,
    }))
}

/// POST /ledger/approve
async fn approve(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Json(request): Json<ApproveRequest>,
) -> ApiResult<AllowanceResponse> {
    let exchange = state.write().await;
    exchange
        .ledger
        .approve(&request.token, &owner, &request.spender, request.amount)
        .map_err(|e| reject(e.into()))?;

    tracing::debug!(
        token = %request.token,
        owner = %owner,
        spender = %request.spender,
        amount = request.amount,
        "Allowance set"
    );
    Ok(Json(AllowanceResponse {
        allowance: exchange
            .ledger
            .allowance(&request.token, &owner, &request.spender),
        token: request.token,
        owner,
        spender: request.spender,
    }))
}
