//! Core type definitions for Meadow

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account or principal identifier (users, pairs, router, farm)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Fungible token identifier
///
/// The derived `Ord` is the total order used to canonicalize pairs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TokenId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Seconds since the Unix epoch (or any monotonic block clock)
pub type Timestamp = u64;

/// Token quantity in base units
pub type Amount = u64;

/// Index of a pool in the farm's pool list
pub type PoolId = usize;

/// Who is calling and when.
///
/// Every mutating operation receives the authenticated principal and the
/// current time explicitly instead of reading globals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    pub sender: Address,
    pub timestamp: Timestamp,
}

impl TxContext {
    pub fn new(sender: impl Into<Address>, timestamp: Timestamp) -> Self {
        Self {
            sender: sender.into(),
            timestamp,
        }
    }
}

/// Token metadata as reported by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenMetadata {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
        }
    }
}

/// Constants
pub mod constants {
    /// Basis points in one whole (100%)
    pub const BPS_DENOM: u64 = 10_000;

    /// Account that receives permanently locked LP shares. Nothing can sign for it.
    pub const DEAD_ADDRESS: &str = "meadow1dead000000000000000000000000000000";
}
