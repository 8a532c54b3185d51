//! Meadow Yield Farm
//!
//! LP share staking with a continuously emitted reward split across pools
//! by weight and across stakers by share of the pool.

pub mod calculator;
pub mod constants;
pub mod farm;
pub mod state;

// Re-exports
pub use constants::ACC_SCALE;
pub use farm::YieldFarm;
pub use state::{FarmPool, UserStake, ZapOutcome, ZapRequest};
