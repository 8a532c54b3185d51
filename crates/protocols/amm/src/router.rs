//! Swap Router
//!
//! Public entry point of the AMM. Composes the pair registry with the token
//! ledger: every mutating call finishes its bookkeeping under the state lock,
//! releases the lock, and only then moves tokens. A failed ledger call rolls
//! back the applied movements and restores the touched pairs.

use std::sync::{Arc, Mutex, MutexGuard};

use meadow_core::constants::DEAD_ADDRESS;
use meadow_core::{
    Address, AmmConfig, Amount, Error, LedgerError, NotFoundError, ReentrancyGuard, Result,
    SlippageError, Timestamp, TokenId, TokenMetadata, TxContext, ValidationError,
};
use token_ledger::{LedgerBatch, TokenLedger};

use crate::calculator;
use crate::constants::fees::{MAX_PROTOCOL_FEE_BPS, MAX_SWAP_FEE_BPS};
use crate::constants::{lp, routing::DEFAULT_MAX_HOPS};
use crate::pair::Pair;
use crate::registry::{sort_tokens, PairRegistry};
use crate::routing::{build_pair_graph, find_best_route, Route};
use crate::state::{
    AddLiquidity, FeeConfig, LiquidityAdded, LiquidityRemoved, RemoveLiquidity, SwapOutcome,
};

const COMPONENT: &str = "router";

#[derive(Debug)]
struct RouterState {
    admin: Address,
    /// Principal allowed to call `add_liquidity_for`
    farm: Option<Address>,
    fees: FeeConfig,
    /// Shares burned on a pair's first deposit
    locked_minimum: Amount,
    registry: PairRegistry,
}

impl RouterState {
    fn only_admin(&self, ctx: &TxContext, action: &'static str) -> Result<()> {
        if ctx.sender != self.admin {
            return Err(Error::unauthorized(&ctx.sender, action));
        }
        Ok(())
    }

    fn amounts_out(&self, amount_in: Amount, path: &[TokenId]) -> Result<Vec<Amount>> {
        validate_path(path)?;
        let mut amounts = Vec::with_capacity(path.len());
        amounts.push(amount_in);
        for hop in path.windows(2) {
            let pair = self.registry.require(&hop[0], &hop[1])?;
            let (reserve_in, reserve_out) = pair.reserves_for(&hop[0]).unwrap_or_default();
            let last = amounts.last().copied().unwrap_or(0);
            amounts.push(calculator::get_amount_out(
                last,
                reserve_in,
                reserve_out,
                self.fees.swap_fee_bps,
            )?);
        }
        Ok(amounts)
    }

    fn amounts_in(&self, amount_out: Amount, path: &[TokenId]) -> Result<Vec<Amount>> {
        validate_path(path)?;
        let mut amounts = vec![0; path.len()];
        amounts[path.len() - 1] = amount_out;
        for i in (1..path.len()).rev() {
            let pair = self.registry.require(&path[i - 1], &path[i])?;
            let (reserve_in, reserve_out) = pair.reserves_for(&path[i - 1]).unwrap_or_default();
            amounts[i - 1] = calculator::get_amount_in(
                amounts[i],
                reserve_in,
                reserve_out,
                self.fees.swap_fee_bps,
            )?;
        }
        Ok(amounts)
    }

    /// Apply every hop to working copies of the pairs it touches.
    ///
    /// With `quoted` the hop amounts are fixed and each pair's invariant
    /// check decides; without it each hop is priced on the live working state.
    fn plan_swap(
        &self,
        path: &[TokenId],
        amount_in: Amount,
        quoted: Option<&[Amount]>,
        now: Timestamp,
    ) -> Result<SwapPlan> {
        let mut working: Vec<Pair> = Vec::new();
        for hop in path.windows(2) {
            let pair = self.registry.require(&hop[0], &hop[1])?;
            if !working.iter().any(|p| p.address == pair.address) {
                working.push(pair.clone());
            }
        }
        let snapshots = working.clone();

        let mut amounts = vec![amount_in];
        let mut hops = Vec::with_capacity(path.len() - 1);
        for (i, hop) in path.windows(2).enumerate() {
            let pair = working
                .iter_mut()
                .find(|p| p.contains(&hop[0]) && p.contains(&hop[1]))
                .ok_or_else(|| NotFoundError::Pair {
                    token_a: hop[0].clone(),
                    token_b: hop[1].clone(),
                })?;
            let hop_in = amounts[i];
            let hop_out = match quoted {
                Some(quoted) => quoted[i + 1],
                None => {
                    let (reserve_in, reserve_out) =
                        pair.reserves_for(&hop[0]).unwrap_or_default();
                    calculator::get_amount_out(
                        hop_in,
                        reserve_in,
                        reserve_out,
                        self.fees.swap_fee_bps,
                    )?
                }
            };
            hops.push(pair.swap(&hop[0], hop_in, hop_out, &self.fees, now)?);
            amounts.push(hop_out);
        }

        Ok(SwapPlan {
            outcome: SwapOutcome { amounts, hops },
            updated: working,
            snapshots,
        })
    }
}

struct SwapPlan {
    outcome: SwapOutcome,
    updated: Vec<Pair>,
    snapshots: Vec<Pair>,
}

/// Reject paths shorter than two tokens or with a repeated adjacent token
fn validate_path(path: &[TokenId]) -> Result<()> {
    if path.len() < 2 {
        return Err(ValidationError::PathTooShort { len: path.len() }.into());
    }
    if let Some(hop) = path.windows(2).find(|hop| hop[0] == hop[1]) {
        return Err(ValidationError::IdenticalTokens {
            token: hop[0].clone(),
        }
        .into());
    }
    Ok(())
}

pub struct SwapRouter {
    /// Principal the router acts as: approved spender and LP token minter
    address: Address,
    ledger: Arc<dyn TokenLedger>,
    guard: ReentrancyGuard,
    state: Mutex<RouterState>,
}

impl SwapRouter {
    pub fn new(config: &AmmConfig, admin: Address, ledger: Arc<dyn TokenLedger>) -> Result<Self> {
        check_range("swap_fee_bps", config.swap_fee_bps, MAX_SWAP_FEE_BPS)?;
        check_range(
            "protocol_fee_bps",
            config.protocol_fee_bps,
            MAX_PROTOCOL_FEE_BPS,
        )?;

        tracing::info!(
            address = %config.router_address,
            swap_fee_bps = config.swap_fee_bps,
            protocol_fee_bps = config.protocol_fee_bps,
            locked_minimum = config.locked_minimum,
            "Swap router initialized"
        );

        Ok(Self {
            address: config.router_address.clone(),
            ledger,
            guard: ReentrancyGuard::new(COMPONENT),
            state: Mutex::new(RouterState {
                admin,
                farm: None,
                fees: FeeConfig::from(config),
                locked_minimum: config.locked_minimum,
                registry: PairRegistry::new(),
            }),
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn ledger(&self) -> &Arc<dyn TokenLedger> {
        &self.ledger
    }

    fn state(&self) -> Result<MutexGuard<'_, RouterState>> {
        self.state
            .lock()
            .map_err(|_| Error::Poisoned {
                component: COMPONENT,
            })
    }

    /// Run ledger interactions as one unit; on failure undo them and let
    /// `undo` restore component state.
    fn interact<T>(
        &self,
        apply: impl FnOnce(&mut LedgerBatch<'_>) -> Result<T>,
        undo: impl FnOnce(&mut RouterState),
    ) -> Result<T> {
        let mut batch = LedgerBatch::new(self.ledger.as_ref());
        match apply(&mut batch) {
            Ok(value) => {
                batch.commit();
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(steps = batch.len(), "Rolling back router call: {}", e);
                batch.rollback();
                undo(&mut *self.state()?);
                Err(e)
            }
        }
    }

    fn register_lp_token(&self, pair: &Pair) -> Result<()> {
        let metadata = TokenMetadata::new(
            format!("Meadow LP {}-{}", pair.token0, pair.token1),
            lp::SYMBOL,
            lp::DECIMALS,
        );
        match self
            .ledger
            .register_token(&pair.lp_token, metadata, Some(self.address.clone()))
        {
            Ok(()) => Ok(()),
            Err(LedgerError::TokenExists { token }) => {
                tracing::debug!(token = %token, "LP token already registered");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    // ---------------------------------------------------------------------
    // Pair registry facade
    // ---------------------------------------------------------------------

    /// Create an empty pair and its LP share token
    pub fn create_pair(&self, ctx: &TxContext, token_a: &TokenId, token_b: &TokenId) -> Result<Pair> {
        let _scope = self.guard.enter()?;
        let pair = self
            .state()?
            .registry
            .create_pair(token_a, token_b, ctx.timestamp)?
            .clone();

        if let Err(e) = self.register_lp_token(&pair) {
            self.state()?.registry.remove(token_a, token_b);
            return Err(e);
        }
        Ok(pair)
    }

    /// Custody address of the pair, if it exists
    pub fn get_pair(&self, token_a: &TokenId, token_b: &TokenId) -> Result<Option<Address>> {
        Ok(self
            .state()?
            .registry
            .get(token_a, token_b)
            .map(|pair| pair.address.clone()))
    }

    pub fn get_lp_token(&self, token_a: &TokenId, token_b: &TokenId) -> Result<TokenId> {
        Ok(self.state()?.registry.require(token_a, token_b)?.lp_token.clone())
    }

    /// Reserves in caller token order
    pub fn get_reserves(&self, token_a: &TokenId, token_b: &TokenId) -> Result<(Amount, Amount)> {
        let state = self.state()?;
        let pair = state.registry.require(token_a, token_b)?;
        Ok(pair.reserves_for(token_a).unwrap_or_default())
    }

    pub fn pair_info(&self, token_a: &TokenId, token_b: &TokenId) -> Result<Pair> {
        Ok(self.state()?.registry.require(token_a, token_b)?.clone())
    }

    pub fn all_pairs(&self) -> Result<Vec<Pair>> {
        Ok(self.state()?.registry.all().cloned().collect())
    }

    pub fn pair_count(&self) -> Result<usize> {
        Ok(self.state()?.registry.len())
    }

    // ---------------------------------------------------------------------
    // Liquidity
    // ---------------------------------------------------------------------

    /// Deposit from the caller. Creates the pair when it does not exist yet.
    pub fn add_liquidity(&self, ctx: &TxContext, params: &AddLiquidity) -> Result<LiquidityAdded> {
        let _scope = self.guard.enter()?;
        self.deposit(&ctx.sender, params, ctx.timestamp)
    }

    /// Deposit on behalf of `owner`, who must have approved the router.
    /// Only the linked farm or the admin may call this.
    pub fn add_liquidity_for(
        &self,
        ctx: &TxContext,
        owner: &Address,
        params: &AddLiquidity,
    ) -> Result<LiquidityAdded> {
        let _scope = self.guard.enter()?;
        {
            let state = self.state()?;
            if state.farm.as_ref() != Some(&ctx.sender) && ctx.sender != state.admin {
                return Err(Error::unauthorized(&ctx.sender, "add liquidity for another account"));
            }
        }
        self.deposit(owner, params, ctx.timestamp)
    }

    fn deposit(
        &self,
        owner: &Address,
        params: &AddLiquidity,
        now: Timestamp,
    ) -> Result<LiquidityAdded> {
        if params.amount_a_desired == 0 || params.amount_b_desired == 0 {
            return Err(ValidationError::ZeroAmount {
                field: "amount_desired",
            }
            .into());
        }
        let (token_a, token_b) = (&params.token_a, &params.token_b);
        sort_tokens(token_a, token_b)?;

        let (snapshot, pair, created, added, locked) = {
            let mut state = self.state()?;
            let created = state.registry.get(token_a, token_b).is_none();
            if created {
                state.registry.create_pair(token_a, token_b, now)?;
            }
            match plan_deposit(&state.registry, params, state.locked_minimum, now) {
                Ok((snapshot, pair, added, locked)) => {
                    state.registry.replace(pair.clone());
                    (snapshot, pair, created, added, locked)
                }
                Err(e) => {
                    if created {
                        state.registry.remove(token_a, token_b);
                    }
                    return Err(e);
                }
            }
        };

        let dead = Address::new(DEAD_ADDRESS);
        self.interact(
            |batch| {
                if created {
                    self.register_lp_token(&pair)?;
                }
                batch.pull(token_a, &self.address, owner, &pair.address, added.amount_a)?;
                batch.pull(token_b, &self.address, owner, &pair.address, added.amount_b)?;
                batch.mint(&pair.lp_token, &self.address, &dead, locked)?;
                batch.mint(&pair.lp_token, &self.address, &params.to, added.liquidity)?;
                Ok(())
            },
            |state| {
                if created {
                    state.registry.remove(token_a, token_b);
                } else {
                    state.registry.replace(snapshot);
                }
            },
        )?;

        tracing::debug!(
            pair = %pair.address,
            owner = %owner,
            amount_a = added.amount_a,
            amount_b = added.amount_b,
            liquidity = added.liquidity,
            "Liquidity added"
        );
        Ok(added)
    }

    /// Burn the caller's LP shares and pay out both sides
    pub fn remove_liquidity(
        &self,
        ctx: &TxContext,
        params: &RemoveLiquidity,
    ) -> Result<LiquidityRemoved> {
        let _scope = self.guard.enter()?;
        if params.liquidity == 0 {
            return Err(ValidationError::ZeroAmount { field: "liquidity" }.into());
        }

        let (snapshot, pair, amount0, amount1, removed) = {
            let mut state = self.state()?;
            let snapshot = state
                .registry
                .require(&params.token_a, &params.token_b)?
                .clone();
            let mut pair = snapshot.clone();
            let (amount0, amount1) = pair.burn(params.liquidity, ctx.timestamp)?;
            let (amount_a, amount_b) = if params.token_a == pair.token0 {
                (amount0, amount1)
            } else {
                (amount1, amount0)
            };
            check_minimum(&params.token_a, amount_a, params.amount_a_min)?;
            check_minimum(&params.token_b, amount_b, params.amount_b_min)?;

            state.registry.replace(pair.clone());
            (snapshot, pair, amount0, amount1, LiquidityRemoved { amount_a, amount_b })
        };

        self.interact(
            |batch| {
                batch.burn(&pair.lp_token, &self.address, &ctx.sender, params.liquidity)?;
                batch.push(&pair.token0, &pair.address, &params.to, amount0)?;
                batch.push(&pair.token1, &pair.address, &params.to, amount1)?;
                Ok(())
            },
            |state| state.registry.replace(snapshot),
        )?;

        tracing::debug!(
            pair = %pair.address,
            owner = %ctx.sender,
            liquidity = params.liquidity,
            amount_a = removed.amount_a,
            amount_b = removed.amount_b,
            "Liquidity removed"
        );
        Ok(removed)
    }

    // ---------------------------------------------------------------------
    // Swaps
    // ---------------------------------------------------------------------

    /// Sell exactly `amount_in` of `path[0]`, delivering the last token to `to`
    pub fn swap_exact_tokens_for_tokens(
        &self,
        ctx: &TxContext,
        amount_in: Amount,
        amount_out_min: Amount,
        path: &[TokenId],
        to: &Address,
    ) -> Result<SwapOutcome> {
        let _scope = self.guard.enter()?;
        validate_path(path)?;
        if amount_in == 0 {
            return Err(ValidationError::ZeroAmount { field: "amount_in" }.into());
        }

        let (plan, collector) = {
            let mut state = self.state()?;
            let plan = state.plan_swap(path, amount_in, None, ctx.timestamp)?;
            let amount_out = plan.outcome.amount_out();
            if amount_out < amount_out_min {
                return Err(SlippageError::OutputBelowMinimum {
                    got: amount_out,
                    min: amount_out_min,
                }
                .into());
            }
            for pair in &plan.updated {
                state.registry.replace(pair.clone());
            }
            (plan, state.fees.fee_collector.clone())
        };

        self.settle_swap(&ctx.sender, plan, collector.as_ref(), to)
    }

    /// Buy exactly `amount_out` of the last token, spending at most `amount_in_max`
    pub fn swap_tokens_for_exact_tokens(
        &self,
        ctx: &TxContext,
        amount_out: Amount,
        amount_in_max: Amount,
        path: &[TokenId],
        to: &Address,
    ) -> Result<SwapOutcome> {
        let _scope = self.guard.enter()?;
        validate_path(path)?;
        if amount_out == 0 {
            return Err(ValidationError::ZeroAmount {
                field: "amount_out",
            }
            .into());
        }

        let (plan, collector) = {
            let mut state = self.state()?;
            let amounts = state.amounts_in(amount_out, path)?;
            let required = amounts[0];
            if required > amount_in_max {
                return Err(SlippageError::InputAboveMaximum {
                    required,
                    max: amount_in_max,
                }
                .into());
            }
            let plan = state.plan_swap(path, required, Some(&amounts), ctx.timestamp)?;
            for pair in &plan.updated {
                state.registry.replace(pair.clone());
            }
            (plan, state.fees.fee_collector.clone())
        };

        self.settle_swap(&ctx.sender, plan, collector.as_ref(), to)
    }

    fn settle_swap(
        &self,
        sender: &Address,
        plan: SwapPlan,
        collector: Option<&Address>,
        to: &Address,
    ) -> Result<SwapOutcome> {
        let SwapPlan {
            outcome, snapshots, ..
        } = plan;

        self.interact(
            |batch| {
                if let Some(first) = outcome.hops.first() {
                    batch.pull(
                        &first.token_in,
                        &self.address,
                        sender,
                        &first.pair,
                        first.amount_in,
                    )?;
                }
                for (i, hop) in outcome.hops.iter().enumerate() {
                    if let Some(collector) = collector {
                        batch.push(&hop.token_in, &hop.pair, collector, hop.protocol_fee)?;
                    }
                    let recipient = outcome.hops.get(i + 1).map_or(to, |next| &next.pair);
                    batch.push(&hop.token_out, &hop.pair, recipient, hop.amount_out)?;
                }
                Ok(())
            },
            |state| {
                for pair in snapshots {
                    state.registry.replace(pair);
                }
            },
        )?;

        tracing::debug!(
            sender = %sender,
            to = %to,
            hops = outcome.hops.len(),
            amount_in = outcome.amount_in(),
            amount_out = outcome.amount_out(),
            "Swap executed"
        );
        Ok(outcome)
    }

    // ---------------------------------------------------------------------
    // Quotes
    // ---------------------------------------------------------------------

    pub fn get_amounts_out(&self, amount_in: Amount, path: &[TokenId]) -> Result<Vec<Amount>> {
        self.state()?.amounts_out(amount_in, path)
    }

    pub fn get_amounts_in(&self, amount_out: Amount, path: &[TokenId]) -> Result<Vec<Amount>> {
        self.state()?.amounts_in(amount_out, path)
    }

    /// Single hop output at the current swap fee
    pub fn get_amount_out(
        &self,
        amount_in: Amount,
        reserve_in: Amount,
        reserve_out: Amount,
    ) -> Result<Amount> {
        let fee = self.state()?.fees.swap_fee_bps;
        calculator::get_amount_out(amount_in, reserve_in, reserve_out, fee)
    }

    /// Single hop input at the current swap fee
    pub fn get_amount_in(
        &self,
        amount_out: Amount,
        reserve_in: Amount,
        reserve_out: Amount,
    ) -> Result<Amount> {
        let fee = self.state()?.fees.swap_fee_bps;
        calculator::get_amount_in(amount_out, reserve_in, reserve_out, fee)
    }

    /// Price a deposit into an existing pair without moving tokens
    pub fn preview_add_liquidity(
        &self,
        params: &AddLiquidity,
        now: Timestamp,
    ) -> Result<LiquidityAdded> {
        let state = self.state()?;
        let (_, _, added, _) = plan_deposit(&state.registry, params, state.locked_minimum, now)?;
        Ok(added)
    }

    pub fn quote(&self, amount_a: Amount, reserve_a: Amount, reserve_b: Amount) -> Result<Amount> {
        calculator::quote(amount_a, reserve_a, reserve_b)
    }

    /// Highest-output path from `token_in` to `token_out`, if any
    pub fn find_best_path(
        &self,
        token_in: &TokenId,
        token_out: &TokenId,
        amount_in: Amount,
        max_hops: Option<usize>,
    ) -> Result<Option<Route>> {
        if amount_in == 0 {
            return Err(ValidationError::ZeroAmount { field: "amount_in" }.into());
        }
        let state = self.state()?;
        let graph = build_pair_graph(state.registry.all());
        Ok(find_best_route(
            &graph,
            token_in,
            token_out,
            amount_in,
            state.fees.swap_fee_bps,
            max_hops.unwrap_or(DEFAULT_MAX_HOPS),
        ))
    }

    // ---------------------------------------------------------------------
    // Administration
    // ---------------------------------------------------------------------

    pub fn admin(&self) -> Result<Address> {
        Ok(self.state()?.admin.clone())
    }

    pub fn farm(&self) -> Result<Option<Address>> {
        Ok(self.state()?.farm.clone())
    }

    pub fn fee_config(&self) -> Result<FeeConfig> {
        Ok(self.state()?.fees.clone())
    }

    pub fn locked_minimum(&self) -> Result<Amount> {
        Ok(self.state()?.locked_minimum)
    }

    pub fn set_fee_collector(&self, ctx: &TxContext, collector: Option<Address>) -> Result<()> {
        let _scope = self.guard.enter()?;
        let mut state = self.state()?;
        state.only_admin(ctx, "set fee collector")?;
        tracing::info!(collector = ?collector, "Fee collector updated");
        state.fees.fee_collector = collector;
        Ok(())
    }

    pub fn set_swap_fee(&self, ctx: &TxContext, swap_fee_bps: u64) -> Result<()> {
        let _scope = self.guard.enter()?;
        let mut state = self.state()?;
        state.only_admin(ctx, "set swap fee")?;
        check_range("swap_fee_bps", swap_fee_bps, MAX_SWAP_FEE_BPS)?;
        tracing::info!(swap_fee_bps, "Swap fee updated");
        state.fees.swap_fee_bps = swap_fee_bps;
        Ok(())
    }

    pub fn set_protocol_fee_cut(&self, ctx: &TxContext, protocol_fee_bps: u64) -> Result<()> {
        let _scope = self.guard.enter()?;
        let mut state = self.state()?;
        state.only_admin(ctx, "set protocol fee")?;
        check_range("protocol_fee_bps", protocol_fee_bps, MAX_PROTOCOL_FEE_BPS)?;
        tracing::info!(protocol_fee_bps, "Protocol fee cut updated");
        state.fees.protocol_fee_bps = protocol_fee_bps;
        Ok(())
    }

    /// Authorize the farm principal for `add_liquidity_for`
    pub fn set_farm(&self, ctx: &TxContext, farm: Option<Address>) -> Result<()> {
        let _scope = self.guard.enter()?;
        let mut state = self.state()?;
        state.only_admin(ctx, "set farm")?;
        tracing::info!(farm = ?farm, "Farm link updated");
        state.farm = farm;
        Ok(())
    }

    pub fn transfer_admin(&self, ctx: &TxContext, new_admin: Address) -> Result<()> {
        let _scope = self.guard.enter()?;
        let mut state = self.state()?;
        state.only_admin(ctx, "transfer router admin")?;
        tracing::info!(from = %state.admin, to = %new_admin, "Router admin transferred");
        state.admin = new_admin;
        Ok(())
    }
}

/// Price a deposit against the pair's current reserves and account it on a copy.
/// Returns the pair before and after, the amounts in caller order, and the
/// locked shares.
fn plan_deposit(
    registry: &PairRegistry,
    params: &AddLiquidity,
    locked_minimum: Amount,
    now: Timestamp,
) -> Result<(Pair, Pair, LiquidityAdded, Amount)> {
    let snapshot = registry.require(&params.token_a, &params.token_b)?.clone();
    let mut pair = snapshot.clone();
    let (reserve_a, reserve_b) = pair.reserves_for(&params.token_a).unwrap_or_default();
    let (amount_a, amount_b) = calculator::optimal_deposit(
        &params.token_a,
        &params.token_b,
        params.amount_a_desired,
        params.amount_b_desired,
        params.amount_a_min,
        params.amount_b_min,
        reserve_a,
        reserve_b,
    )?;
    let (amount0, amount1) = if params.token_a == pair.token0 {
        (amount_a, amount_b)
    } else {
        (amount_b, amount_a)
    };
    let minted = pair.mint(amount0, amount1, locked_minimum, now)?;
    Ok((
        snapshot,
        pair,
        LiquidityAdded {
            amount_a,
            amount_b,
            liquidity: minted.liquidity,
        },
        minted.locked,
    ))
}

fn check_minimum(token: &TokenId, got: Amount, min: Amount) -> Result<()> {
    if got < min {
        return Err(SlippageError::InsufficientAmount {
            token: token.clone(),
            got,
            min,
        }
        .into());
    }
    Ok(())
}

fn check_range(field: &'static str, value: u64, max: u64) -> Result<()> {
    if value > max {
        return Err(ValidationError::OutOfRange { field, value, max }.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meadow_core::GenesisToken;
    use std::sync::{OnceLock, Weak};
    use token_ledger::MemoryLedger;

    const SUPPLY: Amount = 1_000_000_000_000;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    fn t(s: &str) -> TokenId {
        TokenId::new(s)
    }

    fn ctx(sender: &str) -> TxContext {
        TxContext::new(sender, 1_000)
    }

    fn genesis() -> Vec<GenesisToken> {
        ["AAA", "BBB", "CCC"]
            .iter()
            .map(|symbol| GenesisToken {
                token: t(symbol),
                name: format!("Token {symbol}"),
                symbol: symbol.to_string(),
                decimals: 6,
                balances: vec![(addr("alice"), SUPPLY), (addr("bob"), SUPPLY)],
            })
            .collect()
    }

    fn approve_all(ledger: &dyn TokenLedger, owner: &str) {
        for token in ["AAA", "BBB", "CCC"] {
            ledger
                .approve(&t(token), &addr(owner), &addr("meadow1router"), Amount::MAX)
                .unwrap();
        }
    }

    fn setup() -> (Arc<MemoryLedger>, SwapRouter) {
        let ledger = Arc::new(MemoryLedger::from_genesis(&genesis()).unwrap());
        approve_all(ledger.as_ref(), "alice");
        approve_all(ledger.as_ref(), "bob");
        let router =
            SwapRouter::new(&AmmConfig::default(), addr("admin"), ledger.clone()).unwrap();
        (ledger, router)
    }

    fn add(token_a: &str, token_b: &str, amount_a: Amount, amount_b: Amount) -> AddLiquidity {
        AddLiquidity {
            token_a: t(token_a),
            token_b: t(token_b),
            amount_a_desired: amount_a,
            amount_b_desired: amount_b,
            amount_a_min: 0,
            amount_b_min: 0,
            to: addr("alice"),
        }
    }

    fn seed(router: &SwapRouter, token_a: &str, token_b: &str, amount_a: Amount, amount_b: Amount) {
        router
            .add_liquidity(&ctx("alice"), &add(token_a, token_b, amount_a, amount_b))
            .unwrap();
    }

    #[test]
    fn test_first_deposit_creates_pair_and_locks_minimum() {
        let (ledger, router) = setup();
        let added = router
            .add_liquidity(&ctx("alice"), &add("BBB", "AAA", 4_000_000, 1_000_000))
            .unwrap();
        assert_eq!(added.amount_a, 4_000_000);
        assert_eq!(added.amount_b, 1_000_000);
        assert_eq!(added.liquidity, 2_000_000 - lp::LOCKED_MINIMUM);

        let pair = router.pair_info(&t("AAA"), &t("BBB")).unwrap();
        assert_eq!(pair.token0, t("AAA"));
        assert_eq!((pair.reserve0, pair.reserve1), (1_000_000, 4_000_000));
        assert_eq!(
            router.get_reserves(&t("BBB"), &t("AAA")).unwrap(),
            (4_000_000, 1_000_000)
        );
        assert_eq!(ledger.balance_of(&t("AAA"), &pair.address), 1_000_000);
        assert_eq!(ledger.balance_of(&pair.lp_token, &addr("alice")), added.liquidity);
        assert_eq!(
            ledger.balance_of(&pair.lp_token, &Address::new(DEAD_ADDRESS)),
            lp::LOCKED_MINIMUM
        );
        assert_eq!(ledger.total_supply(&pair.lp_token).unwrap(), pair.total_supply);
        assert_eq!(router.get_lp_token(&t("AAA"), &t("BBB")).unwrap(), pair.lp_token);
    }

    #[test]
    fn test_seed_at_locked_minimum_is_rejected() {
        let (ledger, router) = setup();
        let err = router
            .add_liquidity(&ctx("alice"), &add("AAA", "BBB", 1_000, 1_000))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InsufficientInitialLiquidity { minted: 1_000, .. })
        ));
        assert_eq!(router.pair_count().unwrap(), 0);
        assert_eq!(ledger.balance_of(&t("AAA"), &addr("alice")), SUPPLY);
    }

    #[test]
    fn test_configured_lock_admits_smaller_seed() {
        let ledger = Arc::new(MemoryLedger::from_genesis(&genesis()).unwrap());
        approve_all(ledger.as_ref(), "alice");
        let config = AmmConfig {
            locked_minimum: 100,
            ..AmmConfig::default()
        };
        let router = SwapRouter::new(&config, addr("admin"), ledger.clone()).unwrap();
        assert_eq!(router.locked_minimum().unwrap(), 100);

        let added = router
            .add_liquidity(&ctx("alice"), &add("AAA", "BBB", 1_000, 1_000))
            .unwrap();
        assert_eq!(added.liquidity, 1_000 - 100);
        let pair = router.pair_info(&t("AAA"), &t("BBB")).unwrap();
        assert_eq!(
            ledger.balance_of(&pair.lp_token, &Address::new(DEAD_ADDRESS)),
            100
        );
        assert_eq!(pair.total_supply, 1_000);
    }

    #[test]
    fn test_failed_deposit_restores_limited_allowance() {
        let (ledger, router) = setup();
        let carol = addr("carol");
        ledger.transfer(&t("AAA"), &addr("alice"), &carol, 10_000).unwrap();
        ledger.transfer(&t("BBB"), &addr("alice"), &carol, 10).unwrap();
        for token in ["AAA", "BBB"] {
            ledger
                .approve(&t(token), &carol, &addr("meadow1router"), 5_000)
                .unwrap();
        }

        let err = router
            .add_liquidity(&ctx("carol"), &add("AAA", "BBB", 5_000, 5_000))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Ledger(LedgerError::InsufficientBalance { available: 10, .. })
        ));

        assert_eq!(ledger.balance_of(&t("AAA"), &carol), 10_000);
        assert_eq!(ledger.balance_of(&t("BBB"), &carol), 10);
        assert_eq!(
            ledger.allowance(&t("AAA"), &carol, &addr("meadow1router")),
            5_000
        );
        assert_eq!(
            ledger.allowance(&t("BBB"), &carol, &addr("meadow1router")),
            5_000
        );
        assert_eq!(router.pair_count().unwrap(), 0);

        // the restored approval is usable once carol is funded
        ledger.transfer(&t("BBB"), &addr("alice"), &carol, 4_990).unwrap();
        router
            .add_liquidity(&ctx("carol"), &add("AAA", "BBB", 5_000, 5_000))
            .unwrap();
        assert_eq!(ledger.balance_of(&t("AAA"), &carol), 5_000);
    }

    #[test]
    fn test_later_deposit_keeps_ratio() {
        let (_, router) = setup();
        seed(&router, "AAA", "BBB", 1_000_000, 4_000_000);
        let added = router
            .add_liquidity(&ctx("bob"), &add("AAA", "BBB", 100_000, 1_000_000))
            .unwrap();
        assert_eq!((added.amount_a, added.amount_b), (100_000, 400_000));
        assert_eq!(added.liquidity, 200_000);
    }

    #[test]
    fn test_preview_matches_deposit() {
        let (ledger, router) = setup();
        seed(&router, "AAA", "BBB", 1_000_000, 4_000_000);
        let params = add("AAA", "BBB", 100_000, 1_000_000);
        let before = router.pair_info(&t("AAA"), &t("BBB")).unwrap();

        let preview = router.preview_add_liquidity(&params, 1_000).unwrap();
        assert_eq!(router.pair_info(&t("AAA"), &t("BBB")).unwrap(), before);
        assert_eq!(ledger.balance_of(&t("AAA"), &addr("bob")), SUPPLY);

        let added = router.add_liquidity(&ctx("bob"), &params).unwrap();
        assert_eq!(preview, added);

        let err = router
            .preview_add_liquidity(&add("AAA", "CCC", 1_000, 1_000), 1_000)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(NotFoundError::Pair { .. })));
    }

    #[test]
    fn test_deposit_minimum_enforced() {
        let (ledger, router) = setup();
        seed(&router, "AAA", "BBB", 1_000_000, 4_000_000);
        let mut params = add("AAA", "BBB", 100_000, 100_000);
        params.amount_a_min = 30_000;
        let err = router.add_liquidity(&ctx("bob"), &params).unwrap_err();
        assert!(matches!(
            err,
            Error::Slippage(SlippageError::InsufficientAmount { got: 25_000, .. })
        ));
        assert_eq!(ledger.balance_of(&t("AAA"), &addr("bob")), SUPPLY);
    }

    #[test]
    fn test_create_pair_twice_fails() {
        let (_, router) = setup();
        let pair = router.create_pair(&ctx("alice"), &t("AAA"), &t("BBB")).unwrap();
        assert_eq!(router.get_pair(&t("BBB"), &t("AAA")).unwrap(), Some(pair.address));
        let err = router
            .create_pair(&ctx("bob"), &t("BBB"), &t("AAA"))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::PairExists { .. })));
        assert_eq!(router.all_pairs().unwrap().len(), 1);

        let err = router
            .create_pair(&ctx("bob"), &t("AAA"), &t("AAA"))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::IdenticalTokens { .. })));
    }

    #[test]
    fn test_swap_exact_input() {
        let (ledger, router) = setup();
        seed(&router, "AAA", "BBB", 1_000_000, 1_000_000);

        let path = [t("AAA"), t("BBB")];
        let outcome = router
            .swap_exact_tokens_for_tokens(&ctx("bob"), 100_000, 90_000, &path, &addr("carol"))
            .unwrap();
        assert_eq!(outcome.amounts, vec![100_000, 90_661]);
        assert_eq!(ledger.balance_of(&t("BBB"), &addr("carol")), 90_661);
        assert_eq!(ledger.balance_of(&t("AAA"), &addr("bob")), SUPPLY - 100_000);

        // No collector: the whole input stays in the pool
        let pair = router.pair_info(&t("AAA"), &t("BBB")).unwrap();
        assert_eq!((pair.reserve0, pair.reserve1), (1_100_000, 909_339));
        assert_eq!(ledger.balance_of(&t("AAA"), &pair.address), pair.reserve0);
        assert_eq!(ledger.balance_of(&t("BBB"), &pair.address), pair.reserve1);
    }

    #[test]
    fn test_swap_below_minimum_changes_nothing() {
        let (ledger, router) = setup();
        seed(&router, "AAA", "BBB", 1_000_000, 1_000_000);
        let before = router.pair_info(&t("AAA"), &t("BBB")).unwrap();

        let err = router
            .swap_exact_tokens_for_tokens(
                &ctx("bob"),
                100_000,
                90_662,
                &[t("AAA"), t("BBB")],
                &addr("bob"),
            )
            .unwrap_err();
        assert_eq!(
            err,
            Error::Slippage(SlippageError::OutputBelowMinimum {
                got: 90_661,
                min: 90_662,
            })
        );
        assert_eq!(router.pair_info(&t("AAA"), &t("BBB")).unwrap(), before);
        assert_eq!(ledger.balance_of(&t("AAA"), &addr("bob")), SUPPLY);
    }

    #[test]
    fn test_protocol_fee_paid_to_collector() {
        let (ledger, router) = setup();
        seed(&router, "AAA", "BBB", 10_000_000, 10_000_000);
        router
            .set_fee_collector(&ctx("admin"), Some(addr("treasury")))
            .unwrap();

        let outcome = router
            .swap_exact_tokens_for_tokens(
                &ctx("bob"),
                1_000_000,
                0,
                &[t("BBB"), t("AAA")],
                &addr("bob"),
            )
            .unwrap();
        assert_eq!(outcome.hops[0].protocol_fee, 500);
        assert_eq!(ledger.balance_of(&t("BBB"), &addr("treasury")), 500);

        let pair = router.pair_info(&t("AAA"), &t("BBB")).unwrap();
        assert_eq!(pair.reserve1, 10_000_000 + 1_000_000 - 500);
        assert_eq!(ledger.balance_of(&t("BBB"), &pair.address), pair.reserve1);
    }

    #[test]
    fn test_multi_hop_swap() {
        let (ledger, router) = setup();
        seed(&router, "AAA", "BBB", 5_000_000, 5_000_000);
        seed(&router, "BBB", "CCC", 5_000_000, 10_000_000);

        let path = [t("AAA"), t("BBB"), t("CCC")];
        let quoted = router.get_amounts_out(50_000, &path).unwrap();
        let outcome = router
            .swap_exact_tokens_for_tokens(&ctx("bob"), 50_000, 0, &path, &addr("dave"))
            .unwrap();
        assert_eq!(outcome.amounts, quoted);
        assert_eq!(outcome.hops.len(), 2);
        assert_eq!(ledger.balance_of(&t("CCC"), &addr("dave")), quoted[2]);
        // Intermediate tokens pass straight from pair to pair
        assert_eq!(ledger.balance_of(&t("BBB"), &addr("dave")), 0);

        let ab = router.pair_info(&t("AAA"), &t("BBB")).unwrap();
        let bc = router.pair_info(&t("BBB"), &t("CCC")).unwrap();
        assert_eq!(ledger.balance_of(&t("BBB"), &ab.address), ab.reserve1);
        assert_eq!(ledger.balance_of(&t("BBB"), &bc.address), bc.reserve0);
    }

    #[test]
    fn test_swap_exact_output() {
        let (ledger, router) = setup();
        seed(&router, "AAA", "BBB", 1_000_000, 1_000_000);
        let path = [t("AAA"), t("BBB")];

        let required = router.get_amounts_in(90_661, &path).unwrap()[0];
        assert!(required <= 100_000);

        let err = router
            .swap_tokens_for_exact_tokens(&ctx("bob"), 90_661, required - 1, &path, &addr("bob"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Slippage(SlippageError::InputAboveMaximum { .. })
        ));

        let outcome = router
            .swap_tokens_for_exact_tokens(&ctx("bob"), 90_661, required, &path, &addr("erin"))
            .unwrap();
        assert_eq!(outcome.amount_in(), required);
        assert_eq!(ledger.balance_of(&t("BBB"), &addr("erin")), 90_661);
    }

    #[test]
    fn test_path_validation() {
        let (_, router) = setup();
        seed(&router, "AAA", "BBB", 1_000_000, 1_000_000);

        let err = router
            .swap_exact_tokens_for_tokens(&ctx("bob"), 10, 0, &[t("AAA")], &addr("bob"))
            .unwrap_err();
        assert_eq!(err, Error::Validation(ValidationError::PathTooShort { len: 1 }));

        let err = router
            .swap_exact_tokens_for_tokens(&ctx("bob"), 10, 0, &[t("AAA"), t("CCC")], &addr("bob"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(NotFoundError::Pair { .. })));

        // Second hop is missing: nothing moves
        let err = router
            .swap_exact_tokens_for_tokens(
                &ctx("bob"),
                10_000,
                0,
                &[t("AAA"), t("BBB"), t("CCC")],
                &addr("bob"),
            )
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        let pair = router.pair_info(&t("AAA"), &t("BBB")).unwrap();
        assert_eq!((pair.reserve0, pair.reserve1), (1_000_000, 1_000_000));

        let err = router
            .swap_exact_tokens_for_tokens(&ctx("bob"), 10, 0, &[t("AAA"), t("AAA")], &addr("bob"))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::IdenticalTokens { .. })));
    }

    #[test]
    fn test_failed_pull_leaves_state_untouched() {
        let (ledger, router) = setup();
        seed(&router, "AAA", "BBB", 1_000_000, 1_000_000);
        let before = router.pair_info(&t("AAA"), &t("BBB")).unwrap();

        // carol holds AAA but never approved the router
        ledger.transfer(&t("AAA"), &addr("alice"), &addr("carol"), 5_000).unwrap();
        let err = router
            .swap_exact_tokens_for_tokens(
                &ctx("carol"),
                5_000,
                0,
                &[t("AAA"), t("BBB")],
                &addr("carol"),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Ledger(LedgerError::InsufficientAllowance { .. })
        ));
        assert_eq!(router.pair_info(&t("AAA"), &t("BBB")).unwrap(), before);
        assert_eq!(ledger.balance_of(&t("AAA"), &addr("carol")), 5_000);
    }

    #[test]
    fn test_failed_second_pull_refunds_first() {
        let (ledger, router) = setup();
        seed(&router, "AAA", "BBB", 1_000_000, 1_000_000);
        let before = router.pair_info(&t("AAA"), &t("BBB")).unwrap();

        ledger.transfer(&t("AAA"), &addr("alice"), &addr("carol"), 50_000).unwrap();
        ledger
            .approve(&t("AAA"), &addr("carol"), &addr("meadow1router"), Amount::MAX)
            .unwrap();
        let err = router
            .add_liquidity(&ctx("carol"), &add("AAA", "BBB", 50_000, 50_000))
            .unwrap_err();
        assert!(matches!(err, Error::Ledger(_)));
        assert_eq!(ledger.balance_of(&t("AAA"), &addr("carol")), 50_000);
        assert_eq!(router.pair_info(&t("AAA"), &t("BBB")).unwrap(), before);
        assert_eq!(ledger.balance_of(&t("AAA"), &before.address), before.reserve0);
    }

    #[test]
    fn test_failed_first_deposit_removes_pair() {
        let (_, router) = setup();
        let err = router
            .add_liquidity(&ctx("carol"), &add("AAA", "CCC", 50_000, 50_000))
            .unwrap_err();
        assert!(matches!(err, Error::Ledger(_)));
        assert_eq!(router.get_pair(&t("AAA"), &t("CCC")).unwrap(), None);

        // The same pair can still be created afterwards
        seed(&router, "AAA", "CCC", 50_000, 50_000);
        assert_eq!(router.pair_count().unwrap(), 1);
    }

    #[test]
    fn test_round_trip_never_profits() {
        let (ledger, router) = setup();
        seed(&router, "AAA", "BBB", 3_000_000, 7_000_000);
        let added = router
            .add_liquidity(&ctx("bob"), &add("AAA", "BBB", 300_000, 700_000))
            .unwrap();

        let mut params = RemoveLiquidity {
            token_a: t("AAA"),
            token_b: t("BBB"),
            liquidity: added.liquidity,
            amount_a_min: 0,
            amount_b_min: 0,
            to: addr("bob"),
        };
        let removed = router.remove_liquidity(&ctx("bob"), &params).unwrap();
        assert!(removed.amount_a <= added.amount_a);
        assert!(removed.amount_b <= added.amount_b);
        assert!(ledger.balance_of(&t("AAA"), &addr("bob")) <= SUPPLY);

        let lp = router.get_lp_token(&t("AAA"), &t("BBB")).unwrap();
        assert_eq!(ledger.balance_of(&lp, &addr("bob")), 0);

        // Nothing left to burn
        params.liquidity = 100_000;
        let err = router.remove_liquidity(&ctx("bob"), &params).unwrap_err();
        assert!(matches!(err, Error::Ledger(LedgerError::InsufficientBalance { .. })));
    }

    #[test]
    fn test_remove_liquidity_minimum_enforced() {
        let (ledger, router) = setup();
        seed(&router, "AAA", "BBB", 1_000_000, 1_000_000);
        let lp = router.get_lp_token(&t("AAA"), &t("BBB")).unwrap();
        let before = router.pair_info(&t("AAA"), &t("BBB")).unwrap();

        let params = RemoveLiquidity {
            token_a: t("AAA"),
            token_b: t("BBB"),
            liquidity: 10_000,
            amount_a_min: 10_001,
            amount_b_min: 0,
            to: addr("alice"),
        };
        let err = router.remove_liquidity(&ctx("alice"), &params).unwrap_err();
        assert!(matches!(
            err,
            Error::Slippage(SlippageError::InsufficientAmount { got: 10_000, min: 10_001, .. })
        ));
        assert_eq!(router.pair_info(&t("AAA"), &t("BBB")).unwrap(), before);
        assert_eq!(ledger.balance_of(&lp, &addr("alice")), 999_000);
    }

    #[test]
    fn test_admin_controls() {
        let (_, router) = setup();
        let err = router.set_swap_fee(&ctx("mallory"), 10).unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));

        let err = router.set_swap_fee(&ctx("admin"), 1_001).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::OutOfRange { value: 1_001, .. })
        ));
        router.set_swap_fee(&ctx("admin"), 1_000).unwrap();
        assert_eq!(router.fee_config().unwrap().swap_fee_bps, 1_000);

        assert!(router.set_protocol_fee_cut(&ctx("admin"), 10_001).is_err());
        router.set_protocol_fee_cut(&ctx("admin"), 10_000).unwrap();

        router.transfer_admin(&ctx("admin"), addr("ops")).unwrap();
        assert_eq!(router.admin().unwrap(), addr("ops"));
        assert!(matches!(
            router.set_farm(&ctx("admin"), Some(addr("farm"))).unwrap_err(),
            Error::Unauthorized { .. }
        ));
        router.set_farm(&ctx("ops"), Some(addr("farm"))).unwrap();
        assert_eq!(router.farm().unwrap(), Some(addr("farm")));
    }

    #[test]
    fn test_add_liquidity_for_requires_farm() {
        let (ledger, router) = setup();
        let mut params = add("AAA", "BBB", 2_000_000, 2_000_000);
        params.to = addr("farm");

        let err = router
            .add_liquidity_for(&ctx("bob"), &addr("alice"), &params)
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));

        router.set_farm(&ctx("admin"), Some(addr("farm"))).unwrap();
        let added = router
            .add_liquidity_for(&ctx("farm"), &addr("alice"), &params)
            .unwrap();
        let lp = router.get_lp_token(&t("AAA"), &t("BBB")).unwrap();
        assert_eq!(ledger.balance_of(&lp, &addr("farm")), added.liquidity);
        assert_eq!(ledger.balance_of(&t("AAA"), &addr("alice")), SUPPLY - 2_000_000);
    }

    #[test]
    fn test_quotes_and_best_path() {
        let (_, router) = setup();
        assert_eq!(router.get_amount_out(100, 1_000, 1_000).unwrap(), 90);
        assert_eq!(router.quote(10, 100, 300).unwrap(), 30);
        assert!(router.get_amount_in(1_000, 1_000, 1_000).is_err());

        seed(&router, "AAA", "BBB", 50_000_000, 50_000_000);
        seed(&router, "BBB", "CCC", 50_000_000, 50_000_000);
        seed(&router, "AAA", "CCC", 2_000, 2_000);

        let route = router
            .find_best_path(&t("AAA"), &t("CCC"), 100_000, None)
            .unwrap()
            .unwrap();
        assert_eq!(route.path, vec![t("AAA"), t("BBB"), t("CCC")]);
        assert_eq!(route.amounts, router.get_amounts_out(100_000, &route.path).unwrap());
        assert!(router
            .find_best_path(&t("AAA"), &t("CCC"), 100_000, Some(1))
            .unwrap()
            .is_some_and(|r| r.path.len() == 2));
    }

    /// Ledger that calls back into the router while a pull is in flight
    struct HookLedger {
        inner: MemoryLedger,
        router: OnceLock<Weak<SwapRouter>>,
        observed: Mutex<Vec<Error>>,
    }

    impl TokenLedger for HookLedger {
        fn register_token(
            &self,
            token: &TokenId,
            metadata: TokenMetadata,
            minter: Option<Address>,
        ) -> token_ledger::Result<()> {
            self.inner.register_token(token, metadata, minter)
        }

        fn metadata(&self, token: &TokenId) -> token_ledger::Result<TokenMetadata> {
            self.inner.metadata(token)
        }

        fn total_supply(&self, token: &TokenId) -> token_ledger::Result<Amount> {
            self.inner.total_supply(token)
        }

        fn balance_of(&self, token: &TokenId, owner: &Address) -> Amount {
            self.inner.balance_of(token, owner)
        }

        fn transfer(
            &self,
            token: &TokenId,
            from: &Address,
            to: &Address,
            amount: Amount,
        ) -> token_ledger::Result<()> {
            self.inner.transfer(token, from, to, amount)
        }

        fn transfer_from(
            &self,
            token: &TokenId,
            spender: &Address,
            from: &Address,
            to: &Address,
            amount: Amount,
        ) -> token_ledger::Result<()> {
            if let Some(router) = self.router.get().and_then(Weak::upgrade) {
                let nested = router.swap_exact_tokens_for_tokens(
                    &ctx("mallory"),
                    1_000,
                    0,
                    &[t("AAA"), t("BBB")],
                    &addr("mallory"),
                );
                if let Err(e) = nested {
                    self.observed.lock().unwrap().push(e);
                }
            }
            self.inner.transfer_from(token, spender, from, to, amount)
        }

        fn approve(
            &self,
            token: &TokenId,
            owner: &Address,
            spender: &Address,
            amount: Amount,
        ) -> token_ledger::Result<()> {
            self.inner.approve(token, owner, spender, amount)
        }

        fn allowance(&self, token: &TokenId, owner: &Address, spender: &Address) -> Amount {
            self.inner.allowance(token, owner, spender)
        }

        fn mint(
            &self,
            token: &TokenId,
            minter: &Address,
            to: &Address,
            amount: Amount,
        ) -> token_ledger::Result<()> {
            self.inner.mint(token, minter, to, amount)
        }

        fn burn(
            &self,
            token: &TokenId,
            minter: &Address,
            from: &Address,
            amount: Amount,
        ) -> token_ledger::Result<()> {
            self.inner.burn(token, minter, from, amount)
        }
    }

    #[test]
    fn test_reentrant_ledger_callback_is_rejected() {
        let hook = Arc::new(HookLedger {
            inner: MemoryLedger::from_genesis(&genesis()).unwrap(),
            router: OnceLock::new(),
            observed: Mutex::new(Vec::new()),
        });
        approve_all(hook.as_ref(), "alice");
        approve_all(hook.as_ref(), "mallory");
        let router = Arc::new(
            SwapRouter::new(&AmmConfig::default(), addr("admin"), hook.clone()).unwrap(),
        );
        hook.router.set(Arc::downgrade(&router)).unwrap();

        router
            .add_liquidity(&ctx("alice"), &add("AAA", "BBB", 1_000_000, 1_000_000))
            .unwrap();

        let observed = hook.observed.lock().unwrap();
        assert_eq!(observed.len(), 2);
        assert!(observed
            .iter()
            .all(|e| *e == Error::Reentrancy { component: "router" }));
        drop(observed);

        // Once the outer call has returned the router is usable again
        assert!(!router.guard.is_entered());
        let pair = router.pair_info(&t("AAA"), &t("BBB")).unwrap();
        assert_eq!((pair.reserve0, pair.reserve1), (1_000_000, 1_000_000));
    }
}
