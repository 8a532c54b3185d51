//! Error types for Meadow

use thiserror::Error;

use crate::{Address, Amount, PoolId, TokenId};

/// Core errors that can occur in Meadow
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    #[error("Slippage error: {0}")]
    Slippage(#[from] SlippageError),

    #[error("{principal} is not authorized to {action}")]
    Unauthorized {
        principal: Address,
        action: &'static str,
    },

    #[error("Re-entrant call rejected: {component} is already executing")]
    Reentrancy { component: &'static str },

    #[error("Arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal state of {component} is poisoned")]
    Poisoned { component: &'static str },
}

/// Caller input rejected before any state is touched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Identical tokens: {token}")]
    IdenticalTokens { token: TokenId },

    #[error("Amount must be non-zero: {field}")]
    ZeroAmount { field: &'static str },

    #[error("Swap path needs at least 2 tokens, got {len}")]
    PathTooShort { len: usize },

    #[error("Pair already exists: {token0}/{token1}")]
    PairExists { token0: TokenId, token1: TokenId },

    #[error("Farm pool already exists for LP token {lp_token}")]
    PoolExists { lp_token: TokenId },

    #[error("Initial liquidity too small: sqrt(x*y) = {minted}, must exceed {minimum}")]
    InsufficientInitialLiquidity { minted: Amount, minimum: Amount },

    #[error("Deposit too small: zero liquidity would be minted")]
    InsufficientLiquidityMinted,

    #[error("Withdrawal too small: zero tokens would be returned")]
    InsufficientLiquidityBurned,

    #[error("Pool stakes {expected}, but the pair mints {got}")]
    LpTokenMismatch { expected: TokenId, got: TokenId },

    #[error("Withdraw {requested} exceeds staked {staked}")]
    InsufficientStake { requested: Amount, staked: Amount },

    #[error("{field} {value} exceeds maximum {max}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },
}

/// Missing pair, pool, or link
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    #[error("Pair {token_a}/{token_b} does not exist")]
    Pair { token_a: TokenId, token_b: TokenId },

    #[error("Farm pool {pid} does not exist")]
    Pool { pid: PoolId },

    #[error("Farm is not linked to a router")]
    RouterLink,
}

/// Caller-supplied price bounds violated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlippageError {
    #[error("Output below minimum: got {got}, need {min}")]
    OutputBelowMinimum { got: Amount, min: Amount },

    #[error("Input above maximum: need {required}, max {max}")]
    InputAboveMaximum { required: Amount, max: Amount },

    #[error("Insufficient {token} amount: got {got}, need {min}")]
    InsufficientAmount {
        token: TokenId,
        got: Amount,
        min: Amount,
    },
}

/// Numeric failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("Division by zero in {context}")]
    DivisionByZero { context: &'static str },

    #[error("Overflow in {context}")]
    Overflow { context: &'static str },

    #[error("Insufficient reserves for requested output")]
    InsufficientReserves,

    #[error("Constant product decreased: {before} -> {after}")]
    KInvariant { before: u128, after: u128 },
}

/// Failures reported by the token ledger collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Unknown token: {token}")]
    UnknownToken { token: TokenId },

    #[error("Token already registered: {token}")]
    TokenExists { token: TokenId },

    #[error("Insufficient {token} balance: need {required}, have {available}")]
    InsufficientBalance {
        token: TokenId,
        required: Amount,
        available: Amount,
    },

    #[error("Insufficient {token} allowance: need {required}, have {available}")]
    InsufficientAllowance {
        token: TokenId,
        required: Amount,
        available: Amount,
    },

    #[error("{caller} is not the minter of {token}")]
    UnauthorizedMinter { token: TokenId, caller: Address },

    #[error("Balance overflow for {token}")]
    Overflow { token: TokenId },
}

/// Result type alias for Meadow operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Get an HTTP-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Slippage(_) => "slippage_exceeded",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Reentrancy { .. } => "reentrancy",
            Self::Arithmetic(_) => "arithmetic_error",
            Self::Ledger(_) => "ledger_error",
            Self::Config(_) => "config_error",
            Self::Poisoned { .. } => "internal_error",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Unauthorized { .. } => 403,
            Self::Reentrancy { .. } => 409,
            Self::Slippage(_) | Self::Arithmetic(_) | Self::Ledger(_) => 422,
            Self::Config(_) | Self::Poisoned { .. } => 500,
        }
    }

    pub fn unauthorized(principal: &Address, action: &'static str) -> Self {
        Self::Unauthorized {
            principal: principal.clone(),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err: Error = ValidationError::ZeroAmount { field: "amount" }.into();
        assert_eq!(err.error_code(), "validation_error");
        assert_eq!(err.status_code(), 400);

        let err: Error = SlippageError::OutputBelowMinimum { got: 90, min: 91 }.into();
        assert_eq!(err.error_code(), "slippage_exceeded");
        assert_eq!(err.status_code(), 422);

        let err = Error::Reentrancy { component: "router" };
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn test_unauthorized_message() {
        let err = Error::unauthorized(&Address::new("mallory"), "set swap fee");
        assert_eq!(err.to_string(), "mallory is not authorized to set swap fee");
    }
}
