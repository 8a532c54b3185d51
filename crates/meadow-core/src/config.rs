//! Configuration types for Meadow

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, Error, Result, Timestamp, TokenId};

/// AMM (router) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmmConfig {
    /// Principal the router acts as when pulling tokens (the approved spender)
    #[serde(default = "default_router_address")]
    pub router_address: Address,

    /// Swap fee charged on input, in basis points (30 = 0.3%)
    #[serde(default = "default_swap_fee_bps")]
    pub swap_fee_bps: u64,

    /// Share of the swap fee routed to the fee collector, in basis points of the fee
    #[serde(default = "default_protocol_fee_bps")]
    pub protocol_fee_bps: u64,

    /// Receiver of the protocol cut. `None` leaves the whole fee in the pool.
    #[serde(default)]
    pub fee_collector: Option<Address>,

    /// LP units burned to the dead address when a pair is first seeded
    #[serde(default = "default_locked_minimum")]
    pub locked_minimum: Amount,
}

fn default_router_address() -> Address {
    Address::new("meadow1router")
}

fn default_swap_fee_bps() -> u64 {
    30
}

fn default_protocol_fee_bps() -> u64 {
    1_667
}

fn default_locked_minimum() -> Amount {
    1_000
}

impl Default for AmmConfig {
    fn default() -> Self {
        Self {
            router_address: default_router_address(),
            swap_fee_bps: default_swap_fee_bps(),
            protocol_fee_bps: default_protocol_fee_bps(),
            fee_collector: None,
            locked_minimum: default_locked_minimum(),
        }
    }
}

/// Yield farm configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmConfig {
    /// Principal of the farm; it is the sole minter of the reward token
    #[serde(default = "default_farm_address")]
    pub farm_address: Address,

    /// Token paid out to stakers
    #[serde(default = "default_reward_token")]
    pub reward_token: TokenId,

    /// Reward units emitted per second across all pools
    #[serde(default = "default_emission_rate")]
    pub emission_rate: Amount,

    /// No reward accrues before this time
    #[serde(default)]
    pub start_time: Timestamp,
}

fn default_farm_address() -> Address {
    Address::new("meadow1farm")
}

fn default_reward_token() -> TokenId {
    TokenId::new("MDW")
}

fn default_emission_rate() -> Amount {
    1_000_000
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            farm_address: default_farm_address(),
            reward_token: default_reward_token(),
            emission_rate: default_emission_rate(),
            start_time: 0,
        }
    }
}

/// Token created in the ledger at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisToken {
    pub token: TokenId,
    pub name: String,
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    /// Initial balances
    #[serde(default)]
    pub balances: Vec<(Address, Amount)>,
}

fn default_decimals() -> u8 {
    6
}

/// Bearer token accepted by the API, bound to the principal it acts as
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub token: String,
    pub address: Address,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Admin principal for the router and the farm
    #[serde(default = "default_admin")]
    pub admin: Address,

    #[serde(default)]
    pub amm: AmmConfig,

    #[serde(default)]
    pub farm: FarmConfig,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Tokens seeded into the in-memory ledger
    #[serde(default)]
    pub genesis: Vec<GenesisToken>,

    /// Credentials for mutating API calls
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

fn default_admin() -> Address {
    Address::new("meadow1admin")
}

fn default_api_port() -> u16 {
    19080
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            admin: default_admin(),
            amm: AmmConfig::default(),
            farm: FarmConfig::default(),
            api_port: default_api_port(),
            genesis: Vec::new(),
            api_keys: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.amm.swap_fee_bps, 30);
        assert_eq!(config.amm.fee_collector, None);
        assert_eq!(config.farm.reward_token, TokenId::new("MDW"));
        assert_eq!(config.api_port, 19080);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.admin, config.admin);
        assert_eq!(parsed.farm.emission_rate, config.farm.emission_rate);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"amm": {"swap_fee_bps": 25}, "api_port": 8080}"#).unwrap();
        assert_eq!(parsed.amm.swap_fee_bps, 25);
        assert_eq!(parsed.amm.protocol_fee_bps, 1_667);
        assert_eq!(parsed.amm.locked_minimum, 1_000);
        assert!(parsed.api_keys.is_empty());
        assert_eq!(parsed.api_port, 8080);
        assert_eq!(parsed.farm.farm_address, Address::new("meadow1farm"));
    }

    #[test]
    fn test_locked_minimum_and_keys_from_json() {
        let parsed: AppConfig = serde_json::from_str(
            r#"{"amm": {"locked_minimum": 10},
                "api_keys": [{"token": "k-alice", "address": "meadow1alice"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.amm.locked_minimum, 10);
        assert_eq!(parsed.api_keys.len(), 1);
        assert_eq!(parsed.api_keys[0].address, Address::new("meadow1alice"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load("/nonexistent/meadow.json").unwrap_err();
        assert_eq!(err.error_code(), "config_error");
    }
}
