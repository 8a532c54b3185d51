//! AMM Constants
//!
//! Fee bounds, LP share parameters, and pair addressing prefixes.

/// Fee constants
pub mod fees {
    /// Fee denominator (basis points)
    pub const FEE_DENOM: u64 = meadow_core::constants::BPS_DENOM;

    /// Default swap fee (0.3% = 30 bps)
    pub const DEFAULT_SWAP_FEE_BPS: u64 = 30;

    /// Highest swap fee the admin may configure (10%)
    pub const MAX_SWAP_FEE_BPS: u64 = 1_000;

    /// Protocol cut is a share of the swap fee; it can take all of it
    pub const MAX_PROTOCOL_FEE_BPS: u64 = FEE_DENOM;
}

/// LP share constants
pub mod lp {
    /// Default number of shares withheld on a pair's first deposit and
    /// credited to the dead address. `AmmConfig::locked_minimum` overrides it.
    pub const LOCKED_MINIMUM: u64 = 1_000;

    /// Decimals of every LP share token
    pub const DECIMALS: u8 = 6;

    /// Symbol of every LP share token
    pub const SYMBOL: &str = "MLP";
}

/// Pair addressing
pub mod addressing {
    /// Prefix of every pair custody address
    pub const PAIR_ADDRESS_PREFIX: &str = "meadow1pair";

    /// Hex characters of the pair hash kept in the address
    pub const PAIR_HASH_LEN: usize = 32;

    /// Prefix of every LP share token id
    pub const LP_TOKEN_PREFIX: &str = "lp:";
}

/// Routing limits
pub mod routing {
    /// Hops explored by best-path search
    pub const DEFAULT_MAX_HOPS: usize = 3;
}
