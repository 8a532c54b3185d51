//! Meadow AMM
//!
//! Constant product pairs, the pair registry, and the swap router that
//! moves tokens through the ledger on their behalf.

pub mod calculator;
pub mod constants;
pub mod pair;
pub mod registry;
pub mod router;
pub mod routing;
pub mod state;

// Re-exports
pub use calculator::{get_amount_in, get_amount_out, quote};
pub use constants::{addressing, fees, lp};
pub use pair::{Minted, Pair};
pub use registry::{lp_token_for, pair_address, sort_tokens, PairRegistry};
pub use router::SwapRouter;
pub use routing::Route;
pub use state::{
    AddLiquidity, FeeConfig, HopOutcome, LiquidityAdded, LiquidityRemoved, RemoveLiquidity,
    SwapOutcome,
};
