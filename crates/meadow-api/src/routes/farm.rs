//! Yield Farm Routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use farm::ZapOutcome;
use meadow_core::{Address, PoolId, TxContext};

use crate::dto::{
    reject, AddPoolRequest, AddPoolResponse, ApiError, ApiResult, EmergencyWithdrawResponse,
    FarmPoolDto, FarmPoolsResponse, PoolRequest, RewardResponse, StakeRequest, UserInfoResponse,
    ZapApiRequest,
};
use crate::state::now;
use crate::{AppState, Principal};

/// Create farm routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pools", get(get_pools).post(add_pool))
        .route("/pools/:pid/users/:user", get(get_user_info))
        .route("/deposit", post(deposit))
        .route("/withdraw", post(withdraw))
        .route("/harvest", post(harvest))
        .route("/emergency-withdraw", post(emergency_withdraw))
        .route("/zap", post(zap_and_stake))
}

/// GET /farm/pools
async fn get_pools(State(state): State<AppState>) -> ApiResult<FarmPoolsResponse> {
    let exchange = state.read().await;
    let farm = &exchange.farm;
    let pools: Vec<FarmPoolDto> = farm
        .pools()
        .map_err(reject)?
        .into_iter()
        .enumerate()
        .map(|(pid, pool)| FarmPoolDto { pid, pool })
        .collect();

    Ok(Json(FarmPoolsResponse {
        count: pools.len(),
        pools,
        total_weight: farm.total_weight().map_err(reject)?,
        emission_rate: farm.emission_rate().map_err(reject)?,
    }))
}

/// POST /farm/pools - Admin only
async fn add_pool(
    State(state): State<AppState>,
    Principal(sender): Principal,
    Json(request): Json<AddPoolRequest>,
) -> Result<(StatusCode, Json<AddPoolResponse>), (StatusCode, Json<ApiError>)> {
    let ctx = TxContext::new(sender, now());
    let pid = state
        .write()
        .await
        .farm
        .add_pool(&ctx, request.lp_token, request.weight, request.settle_all)
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(AddPoolResponse { pid })))
}

/// GET /farm/pools/:pid/users/:user - Stake and reward claimable now
async fn get_user_info(
    State(state): State<AppState>,
    Path((pid, user)): Path<(PoolId, Address)>,
) -> ApiResult<UserInfoResponse> {
    let exchange = state.read().await;
    let stake = exchange.farm.user_info(pid, &user).map_err(reject)?;
    let pending_reward = exchange
        .farm
        .pending_reward(pid, &user, now())
        .map_err(reject)?;
    Ok(Json(UserInfoResponse {
        pid,
        user,
        amount: stake.amount,
        pending_reward,
    }))
}

/// POST /farm/deposit
async fn deposit(
    State(state): State<AppState>,
    Principal(sender): Principal,
    Json(request): Json<StakeRequest>,
) -> ApiResult<RewardResponse> {
    let ctx = TxContext::new(sender, now());
    let reward_paid = state
        .write()
        .await
        .farm
        .deposit(&ctx, request.pid, request.amount)
        .map_err(reject)?;
    Ok(Json(RewardResponse { reward_paid }))
}

/// POST /farm/withdraw
async fn withdraw(
    State(state): State<AppState>,
    Principal(sender): Principal,
    Json(request): Json<StakeRequest>,
) -> ApiResult<RewardResponse> {
    let ctx = TxContext::new(sender, now());
    let reward_paid = state
        .write()
        .await
        .farm
        .withdraw(&ctx, request.pid, request.amount)
        .map_err(reject)?;
    Ok(Json(RewardResponse { reward_paid }))
}

/// POST /farm/harvest
async fn harvest(
    State(state): State<AppState>,
    Principal(sender): Principal,
    Json(request): Json<PoolRequest>,
) -> ApiResult<RewardResponse> {
    let ctx = TxContext::new(sender, now());
    let reward_paid = state
        .write()
        .await
        .farm
        .harvest(&ctx, request.pid)
        .map_err(reject)?;
    Ok(Json(RewardResponse { reward_paid }))
}

/// POST /farm/emergency-withdraw - Forfeits pending reward
async fn emergency_withdraw(
    State(state): State<AppState>,
    Principal(sender): Principal,
    Json(request): Json<PoolRequest>,
) -> ApiResult<EmergencyWithdrawResponse> {
    let ctx = TxContext::new(sender, now());
    let amount = state
        .write()
        .await
        .farm
        .emergency_withdraw(&ctx, request.pid)
        .map_err(reject)?;
    Ok(Json(EmergencyWithdrawResponse { amount }))
}

/// POST /farm/zap - Add liquidity through the router and stake the shares
async fn zap_and_stake(
    State(state): State<AppState>,
    Principal(sender): Principal,
    Json(request): Json<ZapApiRequest>,
) -> ApiResult<ZapOutcome> {
    let ctx = TxContext::new(sender, now());
    let outcome = state
        .write()
        .await
        .farm
        .zap_and_stake(&ctx, request.pid, &request.request)
        .map_err(reject)?;
    Ok(Json(outcome))
}
