//! Bearer-token authentication
//!
//! Mutating endpoints act as the principal bound to the caller's API key
//! (`Authorization: Bearer <key>`). Keys are configured in `AppConfig::api_keys`
//! and held only as SHA-256 digests.

use std::collections::HashMap;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    Json,
};
use sha2::{Digest, Sha256};

use meadow_core::{Address, ApiKey};

use crate::dto::{ApiError, Rejection};
use crate::AppState;

/// Digest of an API key
pub type KeyDigest = [u8; 32];

pub fn digest(key: &str) -> KeyDigest {
    Sha256::digest(key.as_bytes()).into()
}

/// Map of key digests to the principals they act as
#[derive(Debug, Default)]
pub struct KeyStore {
    keys: HashMap<KeyDigest, Address>,
}

impl KeyStore {
    pub fn from_config(keys: &[ApiKey]) -> Self {
        let mut store = Self::default();
        for key in keys {
            if key.token.is_empty() {
                tracing::warn!(address = %key.address, "Ignoring empty API key");
                continue;
            }
            if let Some(previous) = store.keys.insert(digest(&key.token), key.address.clone()) {
                tracing::warn!(
                    previous = %previous,
                    address = %key.address,
                    "Duplicate API key, last entry wins"
                );
            }
        }
        tracing::info!(keys = store.keys.len(), "API keys loaded");
        store
    }

    pub fn principal(&self, key: &str) -> Option<&Address> {
        self.keys.get(&digest(key))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Authenticated caller of a mutating endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub Address);

fn unauthenticated(message: &str) -> Rejection {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiError::new("unauthenticated", message)),
    )
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = Rejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| unauthenticated("Missing or invalid Authorization header"))?;

        match state.keys().principal(key) {
            Some(address) => Ok(Principal(address.clone())),
            None => {
                tracing::debug!(path = %parts.uri.path(), "Rejected unknown API key");
                Err(unauthenticated("Unknown API key"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> KeyStore {
        KeyStore::from_config(&[
            ApiKey {
                token: "k-alice".into(),
                address: Address::new("meadow1alice"),
            },
            ApiKey {
                token: String::new(),
                address: Address::new("meadow1nobody"),
            },
        ])
    }

    #[test]
    fn test_lookup_by_key() {
        let store = store();
        assert_eq!(store.len(), 1);
        assert_eq!(store.principal("k-alice"), Some(&Address::new("meadow1alice")));
        assert_eq!(store.principal("k-bob"), None);
        assert_eq!(store.principal(""), None);
    }

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(digest("k-alice"), digest("k-alice"));
        assert_ne!(digest("k-alice"), digest("k-alicf"));
    }
}
