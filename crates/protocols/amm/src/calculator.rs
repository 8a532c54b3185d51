//! AMM Calculator
//!
//! Swap math using constant product formula (x * y = k).
//! Products are taken in arbitrary precision and narrowed back to `u64`.

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use meadow_core::{Amount, ArithmeticError, Result, SlippageError, TokenId, ValidationError};

use crate::constants::fees::FEE_DENOM;

fn narrow(value: BigInt, context: &'static str) -> Result<Amount> {
    value
        .to_u64()
        .ok_or_else(|| ArithmeticError::Overflow { context }.into())
}

/// Calculate swap output using constant product formula
///
/// Formula: out = (in * (D - fee) * reserve_out) / (reserve_in * D + in * (D - fee))
/// Rounds down, so the pool never pays out more than the curve allows.
pub fn get_amount_out(
    amount_in: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
    fee_bps: u64,
) -> Result<Amount> {
    if amount_in == 0 {
        return Err(ValidationError::ZeroAmount { field: "amount_in" }.into());
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(ArithmeticError::DivisionByZero {
            context: "empty reserves",
        }
        .into());
    }

    let in_with_fee = BigInt::from(amount_in) * BigInt::from(FEE_DENOM.saturating_sub(fee_bps));
    let numerator = &in_with_fee * BigInt::from(reserve_out);
    let denominator = BigInt::from(reserve_in) * BigInt::from(FEE_DENOM) + in_with_fee;

    if denominator.is_zero() {
        return Err(ArithmeticError::DivisionByZero {
            context: "amount out",
        }
        .into());
    }

    narrow(numerator / denominator, "amount out")
}

/// Calculate required input for desired output (reverse calculation)
///
/// Formula: in = (reserve_in * out * D) / ((reserve_out - out) * (D - fee)) + 1
pub fn get_amount_in(
    amount_out: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
    fee_bps: u64,
) -> Result<Amount> {
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
        return Err(ArithmeticError::InsufficientReserves.into()); // Can't take more than reserves
    }

    let numerator =
        BigInt::from(reserve_in) * BigInt::from(amount_out) * BigInt::from(FEE_DENOM);
    let denominator = BigInt::from(reserve_out - amount_out)
        * BigInt::from(FEE_DENOM.saturating_sub(fee_bps));

    if denominator.is_zero() {
        return Err(ArithmeticError::DivisionByZero {
            context: "amount in",
        }
        .into());
    }

    narrow(numerator / denominator + 1, "amount in") // Round up
}

/// Amount of B worth `amount_a` of A at the current reserve ratio
///
/// quote = amount_a * reserve_b / reserve_a
pub fn quote(amount_a: Amount, reserve_a: Amount, reserve_b: Amount) -> Result<Amount> {
    if amount_a == 0 {
        return Err(ValidationError::ZeroAmount { field: "amount" }.into());
    }
    if reserve_a == 0 || reserve_b == 0 {
        return Err(ArithmeticError::DivisionByZero {
            context: "empty reserves",
        }
        .into());
    }
    let result = BigInt::from(amount_a) * BigInt::from(reserve_b) / BigInt::from(reserve_a);
    narrow(result, "quote")
}

/// Protocol share of the swap fee, paid in the input token
///
/// cut = amount_in * fee * protocol_cut / D^2
pub fn protocol_fee(amount_in: Amount, fee_bps: u64, protocol_fee_bps: u64) -> Result<Amount> {
    let result = BigInt::from(amount_in) * BigInt::from(fee_bps) * BigInt::from(protocol_fee_bps)
        / (BigInt::from(FEE_DENOM) * BigInt::from(FEE_DENOM));
    narrow(result, "protocol fee")
}

/// Calculate initial LP share for pool creation using geometric mean.
///
/// Formula: floor(sqrt(x_amount * y_amount))
/// Uses BigInt to prevent overflow since x_amount * y_amount can exceed u64::MAX.
pub fn initial_liquidity(x_amount: Amount, y_amount: Amount) -> Amount {
    if x_amount == 0 || y_amount == 0 {
        return 0;
    }
    let product = BigInt::from(x_amount) * BigInt::from(y_amount);
    // sqrt of a u128 product always fits in u64
    product.sqrt().to_u64().unwrap_or(Amount::MAX)
}

/// Calculate LP shares for a deposit into a funded pair.
///
/// shares = min(amount0 * supply / reserve0, amount1 * supply / reserve1)
pub fn liquidity_for_deposit(
    amount0: Amount,
    amount1: Amount,
    reserve0: Amount,
    reserve1: Amount,
    supply: Amount,
) -> Result<Amount> {
    if reserve0 == 0 || reserve1 == 0 {
        return Err(ArithmeticError::DivisionByZero {
            context: "empty reserves",
        }
        .into());
    }
    let share0 = BigInt::from(amount0) * BigInt::from(supply) / BigInt::from(reserve0);
    let share1 = BigInt::from(amount1) * BigInt::from(supply) / BigInt::from(reserve1);
    narrow(share0.min(share1), "liquidity")
}

/// Token amounts owed for burning `liquidity` shares.
///
/// Returns (amount0, amount1) = liquidity * reserve / supply, rounded down.
pub fn redeem_amounts(
    liquidity: Amount,
    reserve0: Amount,
    reserve1: Amount,
    supply: Amount,
) -> Result<(Amount, Amount)> {
    if supply == 0 {
        return Err(ArithmeticError::DivisionByZero {
            context: "empty LP supply",
        }
        .into());
    }
    let amount0 = BigInt::from(liquidity) * BigInt::from(reserve0) / BigInt::from(supply);
    let amount1 = BigInt::from(liquidity) * BigInt::from(reserve1) / BigInt::from(supply);
    Ok((narrow(amount0, "redeem")?, narrow(amount1, "redeem")?))
}

/// Pick deposit amounts that keep the reserve ratio without exceeding either
/// desired amount, then enforce the caller's minimums.
///
/// Arguments and result are in caller (A, B) order.
#[allow(clippy::too_many_arguments)]
pub fn optimal_deposit(
    token_a: &TokenId,
    token_b: &TokenId,
    desired_a: Amount,
    desired_b: Amount,
    min_a: Amount,
    min_b: Amount,
    reserve_a: Amount,
    reserve_b: Amount,
) -> Result<(Amount, Amount)> {
    if reserve_a == 0 && reserve_b == 0 {
        return Ok((desired_a, desired_b));
    }

    let optimal_b = quote(desired_a, reserve_a, reserve_b)?;
    if optimal_b <= desired_b {
        if optimal_b < min_b {
            return Err(SlippageError::InsufficientAmount {
                token: token_b.clone(),
                got: optimal_b,
                min: min_b,
            }
            .into());
        }
        return Ok((desired_a, optimal_b));
    }

    let optimal_a = quote(desired_b, reserve_b, reserve_a)?;
    // optimal_b > desired_b implies optimal_a <= desired_a
    if optimal_a < min_a {
        return Err(SlippageError::InsufficientAmount {
            token: token_a.clone(),
            got: optimal_a,
            min: min_a,
        }
        .into());
    }
    Ok((optimal_a, desired_b))
}

/// Calculate spot price (reserve_out / reserve_in)
pub fn calculate_spot_price(reserve_in: Amount, reserve_out: Amount) -> f64 {
    if reserve_in == 0 {
        return 0.0;
    }
    reserve_out as f64 / reserve_in as f64
}

/// Calculate price impact as percentage
pub fn calculate_price_impact(
    reserve_in: Amount,
    reserve_out: Amount,
    input_amount: Amount,
    output_amount: Amount,
) -> f64 {
    if input_amount == 0 || output_amount == 0 {
        return 0.0;
    }

    let spot_price = calculate_spot_price(reserve_in, reserve_out);
    let execution_price = output_amount as f64 / input_amount as f64;

    if spot_price == 0.0 {
        return 0.0;
    }

    ((spot_price - execution_price) / spot_price).abs() * 100.0
}
