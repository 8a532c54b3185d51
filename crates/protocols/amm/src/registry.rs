//! Pair Registry
//!
//! Explicit store of pairs keyed by canonical (token0, token1). Also owns
//! deterministic pair addressing and LP token naming.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use meadow_core::{Address, NotFoundError, Result, Timestamp, TokenId, ValidationError};

use crate::constants::addressing::{LP_TOKEN_PREFIX, PAIR_ADDRESS_PREFIX, PAIR_HASH_LEN};
use crate::pair::Pair;

type PairKey = (TokenId, TokenId);

/// Order two tokens canonically. Identical tokens are rejected.
pub fn sort_tokens(a: &TokenId, b: &TokenId) -> Result<(TokenId, TokenId)> {
    if a == b {
        return Err(ValidationError::IdenticalTokens { token: a.clone() }.into());
    }
    if a < b {
        Ok((a.clone(), b.clone()))
    } else {
        Ok((b.clone(), a.clone()))
    }
}

/// Deterministic custody address for a canonical pair
pub fn pair_address(token0: &TokenId, token1: &TokenId) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(token0.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(token1.as_str().as_bytes());
    let digest = hex::encode(hasher.finalize());
    Address::new(format!(
        "{}{}",
        PAIR_ADDRESS_PREFIX,
        &digest[..PAIR_HASH_LEN]
    ))
}

/// LP share token id of the pair at `address`
pub fn lp_token_for(address: &Address) -> TokenId {
    TokenId::new(format!("{}{}", LP_TOKEN_PREFIX, address))
}

#[derive(Debug, Clone, Default)]
pub struct PairRegistry {
    pairs: HashMap<PairKey, Pair>,
    /// Creation order
    order: Vec<PairKey>,
}

impl PairRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an empty pair for (a, b)
    pub fn create_pair(&mut self, a: &TokenId, b: &TokenId, now: Timestamp) -> Result<&Pair> {
        let key = sort_tokens(a, b)?;
        if self.pairs.contains_key(&key) {
            return Err(ValidationError::PairExists {
                token0: key.0,
                token1: key.1,
            }
            .into());
        }

        let address = pair_address(&key.0, &key.1);
        let lp_token = lp_token_for(&address);
        let pair = Pair::new(address, key.0.clone(), key.1.clone(), lp_token, now);
        tracing::info!(
            token0 = %pair.token0,
            token1 = %pair.token1,
            address = %pair.address,
            "Created pair"
        );

        self.order.push(key.clone());
        Ok(&*self.pairs.entry(key).or_insert(pair))
    }

    pub fn get(&self, a: &TokenId, b: &TokenId) -> Option<&Pair> {
        let key = sort_tokens(a, b).ok()?;
        self.pairs.get(&key)
    }

    /// Like `get`, failing with `NotFound` for a missing pair
    pub fn require(&self, a: &TokenId, b: &TokenId) -> Result<&Pair> {
        let key = sort_tokens(a, b)?;
        self.pairs.get(&key).ok_or_else(|| {
            NotFoundError::Pair {
                token_a: a.clone(),
                token_b: b.clone(),
            }
            .into()
        })
    }

    /// Overwrite an existing pair record (restoring a snapshot or applying
    /// a working copy). Unknown pairs are ignored.
    pub fn replace(&mut self, pair: Pair) {
        let key = (pair.token0.clone(), pair.token1.clone());
        if let Some(slot) = self.pairs.get_mut(&key) {
            *slot = pair;
        }
    }

    /// Drop a pair, used to undo a creation whose funding failed
    pub fn remove(&mut self, a: &TokenId, b: &TokenId) -> Option<Pair> {
        let key = sort_tokens(a, b).ok()?;
        self.order.retain(|k| k != &key);
        self.pairs.remove(&key)
    }

    /// Pairs in creation order
    pub fn all(&self) -> impl Iterator<Item = &Pair> {
        self.order.iter().filter_map(|key| self.pairs.get(key))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
