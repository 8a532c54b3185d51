//! Farm State Types

use serde::{Deserialize, Serialize};

use meadow_core::{Amount, Timestamp, TokenId};

/// One staking pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmPool {
    /// LP share token staked here. Fixed at creation.
    pub lp_token: TokenId,
    /// Allocation weight; zero leaves the pool dormant but withdrawable
    pub weight: u64,
    pub last_settle: Timestamp,
    /// Reward per staked share, scaled by `ACC_SCALE`. Never decreases.
    pub acc_reward_per_share: u128,
    pub total_staked: Amount,
}

impl FarmPool {
    pub fn is_active(&self) -> bool {
        self.weight > 0
    }
}

/// A user's position in one pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStake {
    pub amount: Amount,
    /// `amount * acc / ACC_SCALE` at the last settlement
    pub reward_debt: u128,
}

/// Liquidity supplied through the router and staked in one call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZapRequest {
    pub token_a: TokenId,
    pub token_b: TokenId,
    pub amount_a_desired: Amount,
    pub amount_b_desired: Amount,
    #[serde(default)]
    pub amount_a_min: Amount,
    #[serde(default)]
    pub amount_b_min: Amount,
}

/// Result of a zap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZapOutcome {
    pub amount_a: Amount,
    pub amount_b: Amount,
    /// LP shares minted and staked
    pub liquidity: Amount,
    /// Reward paid out before the stake grew
    pub reward_paid: Amount,
}
