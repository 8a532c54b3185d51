//! AMM State Types
//!
//! Fee settings, liquidity requests, and swap results.

use serde::{Deserialize, Serialize};

use meadow_core::{Address, AmmConfig, Amount, TokenId};

/// Swap fee settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Fee charged on input, in basis points
    pub swap_fee_bps: u64,
    /// Share of the swap fee paid to the collector, in basis points of the fee
    pub protocol_fee_bps: u64,
    /// `None` leaves the whole fee in the pool
    pub fee_collector: Option<Address>,
}

impl From<&AmmConfig> for FeeConfig {
    fn from(config: &AmmConfig) -> Self {
        Self {
            swap_fee_bps: config.swap_fee_bps,
            protocol_fee_bps: config.protocol_fee_bps,
            fee_collector: config.fee_collector.clone(),
        }
    }
}

/// Add liquidity request, in caller token order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddLiquidity {
    pub token_a: TokenId,
    pub token_b: TokenId,
    pub amount_a_desired: Amount,
    pub amount_b_desired: Amount,
    #[serde(default)]
    pub amount_a_min: Amount,
    #[serde(default)]
    pub amount_b_min: Amount,
    /// Receiver of the LP shares
    pub to: Address,
}

/// Remove liquidity request, in caller token order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveLiquidity {
    pub token_a: TokenId,
    pub token_b: TokenId,
    pub liquidity: Amount,
    #[serde(default)]
    pub amount_a_min: Amount,
    #[serde(default)]
    pub amount_b_min: Amount,
    /// Receiver of the withdrawn tokens
    pub to: Address,
}

/// Result of a deposit, in caller token order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityAdded {
    pub amount_a: Amount,
    pub amount_b: Amount,
    pub liquidity: Amount,
}

/// Result of a withdrawal, in caller token order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityRemoved {
    pub amount_a: Amount,
    pub amount_b: Amount,
}

/// One executed swap hop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopOutcome {
    pub pair: Address,
    pub token_in: TokenId,
    pub token_out: TokenId,
    pub amount_in: Amount,
    pub amount_out: Amount,
    /// Portion of `amount_in` paid to the fee collector
    pub protocol_fee: Amount,
}

/// Result of a multi-hop swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOutcome {
    /// `amounts[0]` is the input, `amounts[n]` the output of hop n
    pub amounts: Vec<Amount>,
    pub hops: Vec<HopOutcome>,
}

impl SwapOutcome {
    pub fn amount_in(&self) -> Amount {
        self.amounts.first().copied().unwrap_or(0)
    }

    pub fn amount_out(&self) -> Amount {
        self.amounts.last().copied().unwrap_or(0)
    }
}
