//! token-ledger: Fungible token balances, transfers, and approvals
//!
//! The AMM and the farm never own balances themselves; they move tokens
//! through this interface. Mint and burn are restricted to the minter named
//! when a token is registered (the router for LP shares, the farm for the
//! reward token).

pub mod batch;
pub mod memory;

use meadow_core::{Address, Amount, LedgerError, TokenId, TokenMetadata};

pub use batch::LedgerBatch;
pub use memory::MemoryLedger;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Token ledger collaborator
pub trait TokenLedger: Send + Sync {
    /// Create a token. `minter` is the only principal allowed to mint or burn it.
    fn register_token(
        &self,
        token: &TokenId,
        metadata: TokenMetadata,
        minter: Option<Address>,
    ) -> Result<()>;

    fn metadata(&self, token: &TokenId) -> Result<TokenMetadata>;

    fn total_supply(&self, token: &TokenId) -> Result<Amount>;

    /// Unknown tokens and unknown owners report zero
    fn balance_of(&self, token: &TokenId, owner: &Address) -> Amount;

    /// Move `amount` from `from` (the caller) to `to`
    fn transfer(&self, token: &TokenId, from: &Address, to: &Address, amount: Amount)
        -> Result<()>;

    /// Move `amount` from `from` to `to` using `spender`'s allowance
    fn transfer_from(
        &self,
        token: &TokenId,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()>;

    fn approve(
        &self,
        token: &TokenId,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<()>;

    fn allowance(&self, token: &TokenId, owner: &Address, spender: &Address) -> Amount;

    /// Give back allowance consumed by a `transfer_from` that is being undone.
    /// An unlimited allowance stays unlimited.
    fn restore_allowance(
        &self,
        token: &TokenId,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<()> {
        let current = self.allowance(token, owner, spender);
        if current == Amount::MAX {
            return Ok(());
        }
        self.approve(token, owner, spender, current.saturating_add(amount))
    }

    fn mint(&self, token: &TokenId, minter: &Address, to: &Address, amount: Amount)
        -> Result<()>;

    fn burn(&self, token: &TokenId, minter: &Address, from: &Address, amount: Amount)
        -> Result<()>;
}
