//! Application state shared across API handlers

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use amm::SwapRouter;
use farm::YieldFarm;
use meadow_core::{AppConfig, Timestamp, TokenMetadata, TxContext};
use thiserror::Error;
use token_ledger::{MemoryLedger, TokenLedger};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::auth::KeyStore;

/// Errors raised while wiring the exchange together
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Genesis must not pre-issue the reward token {0}")]
    RewardInGenesis(String),

    #[error(transparent)]
    Core(#[from] meadow_core::Error),

    #[error(transparent)]
    Ledger(#[from] meadow_core::LedgerError),
}

/// The ledger plus the two components operating on it
pub struct Exchange {
    pub ledger: Arc<MemoryLedger>,
    pub router: Arc<SwapRouter>,
    pub farm: YieldFarm,
}

impl Exchange {
    /// Build a ledger from the genesis balances, register the reward token
    /// with the farm as minter, and link router and farm both ways.
    pub fn from_config(config: &AppConfig) -> Result<Self, SetupError> {
        let reward = &config.farm.reward_token;
        if config.genesis.iter().any(|g| &g.token == reward) {
            return Err(SetupError::RewardInGenesis(reward.to_string()));
        }

        let ledger = Arc::new(MemoryLedger::from_genesis(&config.genesis)?);
        ledger.register_token(
            reward,
            TokenMetadata::new("Meadow Reward", reward.as_str(), 6),
            Some(config.farm.farm_address.clone()),
        )?;

        let router = Arc::new(SwapRouter::new(
            &config.amm,
            config.admin.clone(),
            ledger.clone(),
        )?);
        router.set_farm(
            &TxContext::new(config.admin.clone(), now()),
            Some(config.farm.farm_address.clone()),
        )?;

        let farm = YieldFarm::new(&config.farm, config.admin.clone(), ledger.clone())
            .with_router(router.clone());

        tracing::info!(
            tokens = config.genesis.len(),
            router = %router.address(),
            farm = %farm.address(),
            "Exchange ready"
        );
        Ok(Self {
            ledger,
            router,
            farm,
        })
    }
}

/// Shared application state
///
/// Components reject overlapping calls instead of queueing them, so requests
/// are serialized here: reads share the lock, mutations take it exclusively.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    keys: KeyStore,
    exchange: RwLock<Exchange>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, SetupError> {
        let exchange = Exchange::from_config(&config)?;
        let keys = KeyStore::from_config(&config.api_keys);
        if keys.is_empty() {
            tracing::warn!("No API keys configured; mutating endpoints will reject every call");
        }
        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                keys,
                exchange: RwLock::new(exchange),
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn keys(&self) -> &KeyStore {
        &self.inner.keys
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Exchange> {
        self.inner.exchange.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, Exchange> {
        self.inner.exchange.write().await
    }
}

/// Wall clock in seconds
pub fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
