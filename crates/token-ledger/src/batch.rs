//! Compensating ledger batch
//!
//! Components finish their own bookkeeping first and then move tokens through
//! a `LedgerBatch`. Every applied movement is recorded; if a later movement
//! fails, `rollback` replays the inverse of each recorded step in reverse
//! order so the ledger ends where it started.

use meadow_core::{Address, Amount, TokenId};

use crate::{Result, TokenLedger};

#[derive(Debug, Clone)]
enum Step {
    /// `transfer_from`; undoing it also gives the spender its allowance back
    Pull {
        token: TokenId,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    },
    Transfer {
        token: TokenId,
        from: Address,
        to: Address,
        amount: Amount,
    },
    Mint {
        token: TokenId,
        minter: Address,
        to: Address,
        amount: Amount,
    },
    Burn {
        token: TokenId,
        minter: Address,
        from: Address,
        amount: Amount,
    },
}

pub struct LedgerBatch<'a> {
    ledger: &'a dyn TokenLedger,
    applied: Vec<Step>,
}

impl<'a> LedgerBatch<'a> {
    pub fn new(ledger: &'a dyn TokenLedger) -> Self {
        Self {
            ledger,
            applied: Vec::new(),
        }
    }

    /// Pull `amount` from `from` into `to` on `spender`'s allowance
    pub fn pull(
        &mut self,
        token: &TokenId,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.ledger.transfer_from(token, spender, from, to, amount)?;
        self.applied.push(Step::Pull {
            token: token.clone(),
            spender: spender.clone(),
            from: from.clone(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    /// Push `amount` out of an account the component controls
    pub fn push(
        &mut self,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.ledger.transfer(token, from, to, amount)?;
        self.applied.push(Step::Transfer {
            token: token.clone(),
            from: from.clone(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    pub fn mint(
        &mut self,
        token: &TokenId,
        minter: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.ledger.mint(token, minter, to, amount)?;
        self.applied.push(Step::Mint {
            token: token.clone(),
            minter: minter.clone(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    pub fn burn(
        &mut self,
        token: &TokenId,
        minter: &Address,
        from: &Address,
        amount: Amount,
    ) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.ledger.burn(token, minter, from, amount)?;
        self.applied.push(Step::Burn {
            token: token.clone(),
            minter: minter.clone(),
            from: from.clone(),
            amount,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    /// Keep every applied step
    pub fn commit(self) {
        tracing::trace!(steps = self.applied.len(), "Ledger batch committed");
    }

    /// Undo every applied step, newest first
    pub fn rollback(self) {
        let ledger = self.ledger;
        for step in self.applied.into_iter().rev() {
            let undone = match &step {
                Step::Pull {
                    token,
                    spender,
                    from,
                    to,
                    amount,
                } => ledger
                    .transfer(token, to, from, *amount)
                    .and_then(|()| ledger.restore_allowance(token, from, spender, *amount)),
                Step::Transfer {
                    token,
                    from,
                    to,
                    amount,
                } => ledger.transfer(token, to, from, *amount),
                Step::Mint {
                    token,
                    minter,
                    to,
                    amount,
                } => ledger.burn(token, minter, to, *amount),
                Step::Burn {
                    token,
                    minter,
                    from,
                    amount,
                } => ledger.mint(token, minter, from, *amount),
            };
            if let Err(e) = undone {
                tracing::error!(?step, "Failed to undo ledger step: {}", e);
            }
        }
    }
}
