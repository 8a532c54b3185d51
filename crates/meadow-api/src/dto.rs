//! Data Transfer Objects for API requests and responses

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use amm::Pair;
use farm::{FarmPool, ZapRequest};
use meadow_core::{Address, Amount, PoolId, TokenId};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub pairs: usize,
    pub farm_pools: usize,
}

/// Generic API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }
}

/// Handler rejection: status plus JSON error body
pub type Rejection = (StatusCode, Json<ApiError>);

pub type ApiResult<T> = Result<Json<T>, Rejection>;

/// Map a component error onto its HTTP status and error code
pub fn reject(err: meadow_core::Error) -> Rejection {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::debug!(code = err.error_code(), "Request rejected: {}", err);
    }
    (status, Json(ApiError::new(err.error_code(), err.to_string())))
}

// =============================================================================
// Ledger
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub token: TokenId,
    pub owner: Address,
    pub balance: Amount,
}

/// The caller grants `spender` an allowance of `amount`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub token: TokenId,
    pub spender: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowanceResponse {
    pub token: TokenId,
    pub owner: Address,
    pub spender: Address,
    pub allowance: Amount,
}

// =============================================================================
// AMM
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairsResponse {
    pub pairs: Vec<Pair>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePairRequest {
    pub token_a: TokenId,
    pub token_b: TokenId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub amount_in: Amount,
    pub path: Vec<TokenId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub amounts: Vec<Amount>,
    pub amount_out: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub token_in: TokenId,
    pub token_out: TokenId,
    pub amount_in: Amount,
    #[serde(default)]
    pub max_hops: Option<usize>,
}

/// Exact-input swap along `path`. Output goes to `to`, or back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    pub amount_in: Amount,
    #[serde(default)]
    pub amount_out_min: Amount,
    pub path: Vec<TokenId>,
    #[serde(default)]
    pub to: Option<Address>,
}

// =============================================================================
// Farm
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmPoolDto {
    pub pid: PoolId,
    #[serde(flatten)]
    pub pool: FarmPool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmPoolsResponse {
    pub pools: Vec<FarmPoolDto>,
    pub count: usize,
    pub total_weight: u64,
    pub emission_rate: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPoolRequest {
    pub lp_token: TokenId,
    pub weight: u64,
    #[serde(default)]
    pub settle_all: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPoolResponse {
    pub pid: PoolId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfoResponse {
    pub pid: PoolId,
    pub user: Address,
    pub amount: Amount,
    pub pending_reward: Amount,
}

/// Deposit or withdraw. A zero withdrawal only harvests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeRequest {
    pub pid: PoolId,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolRequest {
    pub pid: PoolId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardResponse {
    pub reward_paid: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyWithdrawResponse {
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZapApiRequest {
    pub pid: PoolId,
    #[serde(flatten)]
    pub request: ZapRequest,
}
