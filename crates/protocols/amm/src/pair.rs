//! Liquidity Pool
//!
//! Per-pair reserves and LP share accounting. A `Pair` only does bookkeeping;
//! the router moves the matching tokens through the ledger.

use std::fmt;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use meadow_core::{
    Address, Amount, ArithmeticError, Result, Timestamp, TokenId, ValidationError,
};

use crate::calculator;
use crate::constants::fees::FEE_DENOM;
use crate::state::{FeeConfig, HopOutcome};

/// Trading pair state
///
/// `token0 < token1` always holds. `total_supply` includes the locked minimum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    /// Custody account holding the reserves
    pub address: Address,
    pub token0: TokenId,
    pub token1: TokenId,
    /// LP share token id
    pub lp_token: TokenId,
    pub reserve0: Amount,
    pub reserve1: Amount,
    /// Circulating LP supply
    pub total_supply: Amount,
    pub created_at: Timestamp,
    pub last_updated: Timestamp,
}

/// LP shares minted by a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Minted {
    /// Shares owed to the depositor
    pub liquidity: Amount,
    /// Shares credited to the dead address (first deposit only)
    pub locked: Amount,
}

impl Pair {
    pub fn new(
        address: Address,
        token0: TokenId,
        token1: TokenId,
        lp_token: TokenId,
        now: Timestamp,
    ) -> Self {
        Self {
            address,
            token0,
            token1,
            lp_token,
            reserve0: 0,
            reserve1: 0,
            total_supply: 0,
            created_at: now,
            last_updated: now,
        }
    }

    pub fn contains(&self, token: &TokenId) -> bool {
        &self.token0 == token || &self.token1 == token
    }

    /// The other side of the pair
    pub fn other(&self, token: &TokenId) -> Option<&TokenId> {
        if token == &self.token0 {
            Some(&self.token1)
        } else if token == &self.token1 {
            Some(&self.token0)
        } else {
            None
        }
    }

    /// (reserve_in, reserve_out) when selling `token_in`
    pub fn reserves_for(&self, token_in: &TokenId) -> Option<(Amount, Amount)> {
        if token_in == &self.token0 {
            Some((self.reserve0, self.reserve1))
        } else if token_in == &self.token1 {
            Some((self.reserve1, self.reserve0))
        } else {
            None
        }
    }

    /// Constant product
    pub fn k(&self) -> u128 {
        self.reserve0 as u128 * self.reserve1 as u128
    }

    pub fn is_empty(&self) -> bool {
        self.total_supply == 0
    }

    /// Account a deposit of (amount0, amount1) and return the shares it earns.
    ///
    /// The first deposit burns `locked_minimum` shares; later deposits ignore it.
    pub fn mint(
        &mut self,
        amount0: Amount,
        amount1: Amount,
        locked_minimum: Amount,
        now: Timestamp,
    ) -> Result<Minted> {
        if amount0 == 0 || amount1 == 0 {
            return Err(ValidationError::ZeroAmount { field: "deposit" }.into());
        }

        let minted = if self.is_empty() {
            let root = calculator::initial_liquidity(amount0, amount1);
            if root <= locked_minimum {
                return Err(ValidationError::InsufficientInitialLiquidity {
                    minted: root,
                    minimum: locked_minimum,
                }
                .into());
            }
            Minted {
                liquidity: root - locked_minimum,
                locked: locked_minimum,
            }
        } else {
            let liquidity = calculator::liquidity_for_deposit(
                amount0,
                amount1,
                self.reserve0,
                self.reserve1,
                self.total_supply,
            )?;
            if liquidity == 0 {
                return Err(ValidationError::InsufficientLiquidityMinted.into());
            }
            Minted {
                liquidity,
                locked: 0,
            }
        };

        let reserve0 = checked_add(self.reserve0, amount0, "reserve0")?;
        let reserve1 = checked_add(self.reserve1, amount1, "reserve1")?;
        let supply = checked_add(
            self.total_supply,
            minted.liquidity + minted.locked,
            "LP supply",
        )?;

        self.reserve0 = reserve0;
        self.reserve1 = reserve1;
        self.total_supply = supply;
        self.last_updated = now;
        Ok(minted)
    }

    /// Account the burn of `liquidity` shares and return (amount0, amount1) owed.
    pub fn burn(&mut self, liquidity: Amount, now: Timestamp) -> Result<(Amount, Amount)> {
        if liquidity == 0 {
            return Err(ValidationError::ZeroAmount { field: "liquidity" }.into());
        }
        if liquidity > self.total_supply {
            return Err(ArithmeticError::InsufficientReserves.into());
        }

        let (amount0, amount1) = calculator::redeem_amounts(
            liquidity,
            self.reserve0,
            self.reserve1,
            self.total_supply,
        )?;
        if amount0 == 0 || amount1 == 0 {
            return Err(ValidationError::InsufficientLiquidityBurned.into());
        }

        self.reserve0 -= amount0;
        self.reserve1 -= amount1;
        self.total_supply -= liquidity;
        self.last_updated = now;
        Ok((amount0, amount1))
    }

    /// Account one swap hop selling `amount_in` of `token_in` for `amount_out`.
    ///
    /// The protocol cut leaves the pool when a collector is configured. The
    /// trade must satisfy the fee-adjusted curve and must not lower `k`.
    pub fn swap(
        &mut self,
        token_in: &TokenId,
        amount_in: Amount,
        amount_out: Amount,
        fees: &FeeConfig,
        now: Timestamp,
    ) -> Result<HopOutcome> {
        let token_out = self
            .other(token_in)
            .cloned()
            .ok_or_else(|| ValidationError::IdenticalTokens {
                token: token_in.clone(),
            })?;
        let (reserve_in, reserve_out) = self
            .reserves_for(token_in)
            .ok_or(ArithmeticError::InsufficientReserves)?;

        if amount_in == 0 {
            return Err(ValidationError::ZeroAmount { field: "amount_in" }.into());
        }
        if amount_out == 0 {
            return Err(ValidationError::ZeroAmount {
                field: "amount_out",
            }
            .into());
        }
        if reserve_in == 0 || reserve_out == 0 {
            return Err(ArithmeticError::DivisionByZero {
                context: "empty reserves",
            }
            .into());
        }
        if amount_out >= reserve_out {
            return Err(ArithmeticError::InsufficientReserves.into());
        }

        let protocol_fee = if fees.fee_collector.is_some() {
            calculator::protocol_fee(amount_in, fees.swap_fee_bps, fees.protocol_fee_bps)?
        } else {
            0
        };

        let new_in = checked_add(reserve_in, amount_in - protocol_fee, "reserve in")?;
        let new_out = reserve_out - amount_out;

        // Input net of the whole swap fee must still sit on the curve
        let adjusted_in = BigInt::from(reserve_in) * BigInt::from(FEE_DENOM)
            + BigInt::from(amount_in) * BigInt::from(FEE_DENOM - fees.swap_fee_bps);
        let k_before = reserve_in as u128 * reserve_out as u128;
        let k_after = new_in as u128 * new_out as u128;
        if adjusted_in * BigInt::from(new_out)
            < BigInt::from(k_before) * BigInt::from(FEE_DENOM)
            || k_after < k_before
        {
            return Err(ArithmeticError::KInvariant {
                before: k_before,
                after: k_after,
            }
            .into());
        }

        if token_in == &self.token0 {
            self.reserve0 = new_in;
            self.reserve1 = new_out;
        } else {
            self.reserve1 = new_in;
            self.reserve0 = new_out;
        }
        self.last_updated = now;

        Ok(HopOutcome {
            pair: self.address.clone(),
            token_in: token_in.clone(),
            token_out,
            amount_in,
            amount_out,
            protocol_fee,
        })
    }
}

fn checked_add(a: Amount, b: Amount, context: &'static str) -> Result<Amount> {
    a.checked_add(b)
        .ok_or_else(|| ArithmeticError::Overflow { context }.into())
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pair {} | {}: {} | {}: {} | LP: {}",
            self.address, self.token0, self.reserve0, self.token1, self.reserve1, self.total_supply
        )
    }
}
