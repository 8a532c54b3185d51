//! Farm Calculator
//!
//! Pure reward math. No ledger, no locks.
//!
//! A pool's accumulator is the reward earned by one staked share since the
//! pool was created, scaled by `ACC_SCALE`:
//!   acc += elapsed * rate * weight / total_weight * ACC_SCALE / total_staked
//! A stake's pending reward is its share of the accumulator minus its debt:
//!   pending = amount * acc / ACC_SCALE - reward_debt

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use meadow_core::{Amount, ArithmeticError, Result, Timestamp};

use crate::constants::ACC_SCALE;
use crate::state::{FarmPool, UserStake};

/// Reward emitted to one pool over `elapsed` seconds
pub fn pool_reward(elapsed: u64, rate: Amount, weight: u64, total_weight: u64) -> Result<u128> {
    if total_weight == 0 {
        return Ok(0);
    }
    let reward = BigInt::from(elapsed) * BigInt::from(rate) * BigInt::from(weight)
        / BigInt::from(total_weight);
    reward.to_u128().ok_or_else(|| {
        ArithmeticError::Overflow {
            context: "pool reward",
        }
        .into()
    })
}

/// Accumulator growth for `reward` spread over `total_staked` shares
pub fn accumulator_increment(reward: u128, total_staked: Amount) -> Result<u128> {
    if total_staked == 0 {
        return Err(ArithmeticError::DivisionByZero {
            context: "accumulator",
        }
        .into());
    }
    let increment = BigInt::from(reward) * BigInt::from(ACC_SCALE) / BigInt::from(total_staked);
    increment.to_u128().ok_or_else(|| {
        ArithmeticError::Overflow {
            context: "accumulator",
        }
        .into()
    })
}

/// Reward `amount` shares have earned at accumulator `acc`
pub fn accrued(amount: Amount, acc: u128) -> Result<u128> {
    let value = BigInt::from(amount) * BigInt::from(acc) / BigInt::from(ACC_SCALE);
    value.to_u128().ok_or_else(|| {
        ArithmeticError::Overflow {
            context: "accrued reward",
        }
        .into()
    })
}

/// Unpaid reward of a stake at accumulator `acc`
pub fn pending(stake: &UserStake, acc: u128) -> Result<Amount> {
    let owed = accrued(stake.amount, acc)?.saturating_sub(stake.reward_debt);
    u64::try_from(owed).map_err(|_| {
        ArithmeticError::Overflow {
            context: "pending reward",
        }
        .into()
    })
}

/// Accumulator of `pool` brought forward to `now`, without mutating it.
///
/// Nothing accrues while the pool has no stake or the farm has no weight.
pub fn projected_accumulator(
    pool: &FarmPool,
    now: Timestamp,
    rate: Amount,
    total_weight: u64,
) -> Result<u128> {
    if now <= pool.last_settle || pool.total_staked == 0 || total_weight == 0 {
        return Ok(pool.acc_reward_per_share);
    }
    let reward = pool_reward(now - pool.last_settle, rate, pool.weight, total_weight)?;
    let increment = accumulator_increment(reward, pool.total_staked)?;
    pool.acc_reward_per_share
        .checked_add(increment)
        .ok_or_else(|| {
            ArithmeticError::Overflow {
                context: "accumulator",
            }
            .into()
        })
}
