//! In-memory token ledger
//!
//! Reference implementation of [`TokenLedger`] used by the binary and by
//! tests. An allowance of `Amount::MAX` is treated as unlimited.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use meadow_core::{Address, Amount, GenesisToken, LedgerError, TokenId, TokenMetadata};

use crate::{Result, TokenLedger};

#[derive(Debug)]
struct TokenState {
    metadata: TokenMetadata,
    minter: Option<Address>,
    total_supply: Amount,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
}

impl TokenState {
    fn spendable(&self, token: &TokenId, owner: &Address, amount: Amount) -> Result<Amount> {
        let available = self.balances.get(owner).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                token: token.clone(),
                required: amount,
                available,
            });
        }
        Ok(available)
    }

    fn debit(&mut self, token: &TokenId, owner: &Address, amount: Amount) -> Result<()> {
        let available = self.spendable(token, owner, amount)?;
        self.balances.insert(owner.clone(), available - amount);
        Ok(())
    }

    fn credit(&mut self, token: &TokenId, owner: &Address, amount: Amount) -> Result<()> {
        let balance = self.balances.entry(owner.clone()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow {
                token: token.clone(),
            })?;
        Ok(())
    }

    /// Both sides are checked before either balance changes
    fn move_balance(
        &mut self,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        let available = self.spendable(token, from, amount)?;
        if from == to {
            return Ok(());
        }
        let received = self
            .balances
            .get(to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow {
                token: token.clone(),
            })?;
        self.balances.insert(from.clone(), available - amount);
        self.balances.insert(to.clone(), received);
        Ok(())
    }

    fn check_minter(&self, token: &TokenId, caller: &Address) -> Result<()> {
        match &self.minter {
            Some(minter) if minter == caller => Ok(()),
            _ => Err(LedgerError::UnauthorizedMinter {
                token: token.clone(),
                caller: caller.clone(),
            }),
        }
    }
}

/// Thread-safe in-memory ledger
#[derive(Debug, Default)]
pub struct MemoryLedger {
    tokens: RwLock<HashMap<TokenId, TokenState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger pre-populated with genesis tokens and balances.
    ///
    /// Genesis tokens have no minter; their supply is fixed.
    pub fn from_genesis(genesis: &[GenesisToken]) -> Result<Self> {
        let ledger = Self::new();
        for entry in genesis {
            ledger.register_token(
                &entry.token,
                TokenMetadata::new(&entry.name, &entry.symbol, entry.decimals),
                None,
            )?;
            for (owner, amount) in &entry.balances {
                ledger.credit_genesis(&entry.token, owner, *amount)?;
            }
            tracing::info!(
                token = %entry.token,
                holders = entry.balances.len(),
                "Seeded genesis token"
            );
        }
        Ok(ledger)
    }

    /// Credit an initial balance outside of any minter check
    pub fn credit_genesis(&self, token: &TokenId, owner: &Address, amount: Amount) -> Result<()> {
        self.with_token(token, |state| {
            let supply =
                state
                    .total_supply
                    .checked_add(amount)
                    .ok_or_else(|| LedgerError::Overflow {
                        token: token.clone(),
                    })?;
            state.credit(token, owner, amount)?;
            state.total_supply = supply;
            Ok(())
        })
    }

    fn with_token<T>(
        &self,
        token: &TokenId,
        f: impl FnOnce(&mut TokenState) -> Result<T>,
    ) -> Result<T> {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        let state = tokens
            .get_mut(token)
            .ok_or_else(|| LedgerError::UnknownToken {
                token: token.clone(),
            })?;
        f(state)
    }
}

impl TokenLedger for MemoryLedger {
    fn register_token(
        &self,
        token: &TokenId,
        metadata: TokenMetadata,
        minter: Option<Address>,
    ) -> Result<()> {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        if tokens.contains_key(token) {
            return Err(LedgerError::TokenExists {
                token: token.clone(),
            });
        }
        tracing::debug!(token = %token, symbol = %metadata.symbol, "Registered token");
        tokens.insert(
            token.clone(),
            TokenState {
                metadata,
                minter,
                total_supply: 0,
                balances: HashMap::new(),
                allowances: HashMap::new(),
            },
        );
        Ok(())
    }

    fn metadata(&self, token: &TokenId) -> Result<TokenMetadata> {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens
            .get(token)
            .map(|state| state.metadata.clone())
            .ok_or_else(|| LedgerError::UnknownToken {
                token: token.clone(),
            })
    }

    fn total_supply(&self, token: &TokenId) -> Result<Amount> {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens
            .get(token)
            .map(|state| state.total_supply)
            .ok_or_else(|| LedgerError::UnknownToken {
                token: token.clone(),
            })
    }

    fn balance_of(&self, token: &TokenId, owner: &Address) -> Amount {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens
            .get(token)
            .and_then(|state| state.balances.get(owner).copied())
            .unwrap_or(0)
    }

    fn transfer(
        &self,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        self.with_token(token, |state| state.move_balance(token, from, to, amount))
    }

    fn transfer_from(
        &self,
        token: &TokenId,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        self.with_token(token, |state| {
            let key = (from.clone(), spender.clone());
            let allowed = state.allowances.get(&key).copied().unwrap_or(0);
            if allowed < amount {
                return Err(LedgerError::InsufficientAllowance {
                    token: token.clone(),
                    required: amount,
                    available: allowed,
                });
            }
            state.move_balance(token, from, to, amount)?;
            if allowed != Amount::MAX {
                state.allowances.insert(key, allowed - amount);
            }
            Ok(())
        })
    }

    fn approve(
        &self,
        token: &TokenId,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<()> {
        self.with_token(token, |state| {
            state
                .allowances
                .insert((owner.clone(), spender.clone()), amount);
            Ok(())
        })
    }

    fn allowance(&self, token: &TokenId, owner: &Address, spender: &Address) -> Amount {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens
            .get(token)
            .and_then(|state| {
                state
                    .allowances
                    .get(&(owner.clone(), spender.clone()))
                    .copied()
            })
            .unwrap_or(0)
    }

    fn restore_allowance(
        &self,
        token: &TokenId,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<()> {
        self.with_token(token, |state| {
            let allowed = state
                .allowances
                .entry((owner.clone(), spender.clone()))
                .or_insert(0);
            if *allowed != Amount::MAX {
                *allowed = allowed.saturating_add(amount);
            }
            Ok(())
        })
    }

    fn mint(&self, token: &TokenId, minter: &Address, to: &Address, amount: Amount) -> Result<()> {
        self.with_token(token, |state| {
            state.check_minter(token, minter)?;
            let supply =
                state
                    .total_supply
                    .checked_add(amount)
                    .ok_or_else(|| LedgerError::Overflow {
                        token: token.clone(),
                    })?;
            state.credit(token, to, amount)?;
            state.total_supply = supply;
            Ok(())
        })
    }

    fn burn(
        &self,
        token: &TokenId,
        minter: &Address,
        from: &Address,
        amount: Amount,
    ) -> Result<()> {
        self.with_token(token, |state| {
            state.check_minter(token, minter)?;
            state.debit(token, from, amount)?;
            state.total_supply -= amount;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    fn ledger_with_usd() -> (MemoryLedger, TokenId) {
        let token = TokenId::new("USD");
        let ledger = MemoryLedger::from_genesis(&[GenesisToken {
            token: token.clone(),
            name: "Dollar".into(),
            symbol: "USD".into(),
            decimals: 6,
            balances: vec![(addr("alice"), 1_000)],
        }])
        .unwrap();
        (ledger, token)
    }

    #[test]
    fn test_genesis_balances() {
        let (ledger, usd) = ledger_with_usd();
        assert_eq!(ledger.balance_of(&usd, &addr("alice")), 1_000);
        assert_eq!(ledger.total_supply(&usd).unwrap(), 1_000);
        assert_eq!(ledger.metadata(&usd).unwrap().symbol, "USD");
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let (ledger, usd) = ledger_with_usd();
        let err = ledger
            .transfer(&usd, &addr("alice"), &addr("bob"), 1_001)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { available: 1_000, .. }));
        assert_eq!(ledger.balance_of(&usd, &addr("bob")), 0);
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let (ledger, usd) = ledger_with_usd();
        ledger.approve(&usd, &addr("alice"), &addr("router"), 300).unwrap();

        ledger
            .transfer_from(&usd, &addr("router"), &addr("alice"), &addr("pool"), 200)
            .unwrap();
        assert_eq!(ledger.allowance(&usd, &addr("alice"), &addr("router")), 100);
        assert_eq!(ledger.balance_of(&usd, &addr("pool")), 200);

        let err = ledger
            .transfer_from(&usd, &addr("router"), &addr("alice"), &addr("pool"), 101)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientAllowance { .. }));
    }

    #[test]
    fn test_unlimited_allowance_is_not_decremented() {
        let (ledger, usd) = ledger_with_usd();
        ledger
            .approve(&usd, &addr("alice"), &addr("router"), Amount::MAX)
            .unwrap();
        ledger
            .transfer_from(&usd, &addr("router"), &addr("alice"), &addr("bob"), 500)
            .unwrap();
        assert_eq!(
            ledger.allowance(&usd, &addr("alice"), &addr("router")),
            Amount::MAX
        );
    }

    #[test]
    fn test_overflowing_credit_keeps_sender_balance() {
        let (ledger, usd) = ledger_with_usd();
        ledger
            .with_token(&usd, |state| {
                state.balances.insert(addr("bob"), Amount::MAX - 10);
                Ok(())
            })
            .unwrap();

        let err = ledger
            .transfer(&usd, &addr("alice"), &addr("bob"), 11)
            .unwrap_err();
        assert_eq!(err, LedgerError::Overflow { token: usd.clone() });
        assert_eq!(ledger.balance_of(&usd, &addr("alice")), 1_000);

        ledger.approve(&usd, &addr("alice"), &addr("router"), 500).unwrap();
        let err = ledger
            .transfer_from(&usd, &addr("router"), &addr("alice"), &addr("bob"), 11)
            .unwrap_err();
        assert_eq!(err, LedgerError::Overflow { token: usd.clone() });
        assert_eq!(ledger.balance_of(&usd, &addr("alice")), 1_000);
        assert_eq!(ledger.allowance(&usd, &addr("alice"), &addr("router")), 500);
        assert_eq!(ledger.balance_of(&usd, &addr("bob")), Amount::MAX - 10);
    }

    #[test]
    fn test_self_transfer_is_a_no_op() {
        let (ledger, usd) = ledger_with_usd();
        ledger
            .transfer(&usd, &addr("alice"), &addr("alice"), 1_000)
            .unwrap();
        assert_eq!(ledger.balance_of(&usd, &addr("alice")), 1_000);
    }

    #[test]
    fn test_restore_allowance() {
        let (ledger, usd) = ledger_with_usd();
        ledger.approve(&usd, &addr("alice"), &addr("router"), 100).unwrap();
        ledger
            .restore_allowance(&usd, &addr("alice"), &addr("router"), 50)
            .unwrap();
        assert_eq!(ledger.allowance(&usd, &addr("alice"), &addr("router")), 150);

        ledger
            .approve(&usd, &addr("alice"), &addr("router"), Amount::MAX)
            .unwrap();
        ledger
            .restore_allowance(&usd, &addr("alice"), &addr("router"), 50)
            .unwrap();
        assert_eq!(
            ledger.allowance(&usd, &addr("alice"), &addr("router")),
            Amount::MAX
        );
    }

    #[test]
    fn test_mint_restricted_to_minter() {
        let ledger = MemoryLedger::new();
        let reward = TokenId::new("MDW");
        ledger
            .register_token(&reward, TokenMetadata::new("Meadow", "MDW", 18), Some(addr("farm")))
            .unwrap();

        ledger.mint(&reward, &addr("farm"), &addr("alice"), 50).unwrap();
        assert_eq!(ledger.balance_of(&reward, &addr("alice")), 50);

        let err = ledger
            .mint(&reward, &addr("alice"), &addr("alice"), 50)
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnauthorizedMinter { .. }));
        assert_eq!(ledger.total_supply(&reward).unwrap(), 50);
    }

    #[test]
    fn test_burn_reduces_supply() {
        let ledger = MemoryLedger::new();
        let lp = TokenId::new("LP");
        ledger
            .register_token(&lp, TokenMetadata::new("LP", "LP", 18), Some(addr("router")))
            .unwrap();
        ledger.mint(&lp, &addr("router"), &addr("alice"), 100).unwrap();
        ledger.burn(&lp, &addr("router"), &addr("alice"), 40).unwrap();
        assert_eq!(ledger.total_supply(&lp).unwrap(), 60);
        assert_eq!(ledger.balance_of(&lp, &addr("alice")), 60);
    }

    #[test]
    fn test_duplicate_registration() {
        let (ledger, usd) = ledger_with_usd();
        let err = ledger
            .register_token(&usd, TokenMetadata::new("x", "x", 0), None)
            .unwrap_err();
        assert_eq!(err, LedgerError::TokenExists { token: usd });
    }
}
