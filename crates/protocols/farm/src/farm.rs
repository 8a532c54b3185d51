//! Yield Farm
//!
//! Staking ledger of LP share pools sharing one reward stream. Every mutating
//! call settles the pool's accumulator first, pays out the caller's pending
//! reward by minting it, and only then moves LP shares.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use amm::{AddLiquidity, SwapRouter};
use meadow_core::{
    Address, Amount, ArithmeticError, Error, FarmConfig, NotFoundError, PoolId, ReentrancyGuard,
    Result, Timestamp, TokenId, TxContext, ValidationError,
};
use token_ledger::{LedgerBatch, TokenLedger};

use crate::calculator;
use crate::constants::COMPONENT;
use crate::state::{FarmPool, UserStake, ZapOutcome, ZapRequest};

#[derive(Debug)]
struct FarmState {
    admin: Address,
    /// Reward units per second across all pools
    emission_rate: Amount,
    start_time: Timestamp,
    /// Sum of all pool weights
    total_weight: u64,
    pools: Vec<FarmPool>,
    stakes: HashMap<(PoolId, Address), UserStake>,
}

impl FarmState {
    fn only_admin(&self, ctx: &TxContext, action: &'static str) -> Result<()> {
        if ctx.sender != self.admin {
            return Err(Error::unauthorized(&ctx.sender, action));
        }
        Ok(())
    }

    fn pool(&self, pid: PoolId) -> Result<&FarmPool> {
        self.pools
            .get(pid)
            .ok_or_else(|| NotFoundError::Pool { pid }.into())
    }

    fn stake(&self, pid: PoolId, user: &Address) -> UserStake {
        self.stakes
            .get(&(pid, user.clone()))
            .copied()
            .unwrap_or_default()
    }

    /// Bring one pool's accumulator forward to `now`
    fn settle(&mut self, pid: PoolId, now: Timestamp) -> Result<()> {
        let (rate, total_weight) = (self.emission_rate, self.total_weight);
        let pool = self
            .pools
            .get_mut(pid)
            .ok_or(NotFoundError::Pool { pid })?;
        if now <= pool.last_settle {
            return Ok(());
        }
        pool.acc_reward_per_share =
            calculator::projected_accumulator(pool, now, rate, total_weight)?;
        pool.last_settle = now;
        Ok(())
    }

    fn settle_all(&mut self, now: Timestamp) -> Result<()> {
        for pid in 0..self.pools.len() {
            self.settle(pid, now)?;
        }
        Ok(())
    }

    /// Settle `pid`, then move `user`'s stake by `delta` and reset its debt.
    ///
    /// Returns the reward owed before the move and the state to restore if
    /// the matching ledger movements fail. On error nothing is changed.
    fn rebalance(
        &mut self,
        pid: PoolId,
        user: &Address,
        delta: StakeDelta,
        now: Timestamp,
    ) -> Result<(Amount, Snapshot)> {
        let snapshot = Snapshot {
            pid,
            user: user.clone(),
            pool: self.pool(pid)?.clone(),
            stake: self.stakes.get(&(pid, user.clone())).copied(),
        };
        if let StakeDelta::Remove(amount) = delta {
            let staked = self.stake(pid, user).amount;
            if amount > staked {
                return Err(ValidationError::InsufficientStake {
                    requested: amount,
                    staked,
                }
                .into());
            }
        }

        match self.apply_delta(pid, user, delta, now) {
            Ok(reward) => Ok((reward, snapshot)),
            Err(e) => {
                self.restore(snapshot);
                Err(e)
            }
        }
    }

    fn apply_delta(
        &mut self,
        pid: PoolId,
        user: &Address,
        delta: StakeDelta,
        now: Timestamp,
    ) -> Result<Amount> {
        self.settle(pid, now)?;
        let mut stake = self.stake(pid, user);
        let mut pool = self.pool(pid)?.clone();
        let reward = calculator::pending(&stake, pool.acc_reward_per_share)?;

        let (stake, pool) = match delta {
            StakeDelta::Add(amount) => grow(stake, pool, amount)?,
            StakeDelta::Remove(amount) => {
                stake.amount -= amount;
                pool.total_staked -= amount;
                stake.reward_debt = calculator::accrued(stake.amount, pool.acc_reward_per_share)?;
                (stake, pool)
            }
        };

        self.pools[pid] = pool;
        self.stakes.insert((pid, user.clone()), stake);
        Ok(reward)
    }

    /// Fails if `user` could not stake `amount` more at the pool's current
    /// accumulator
    fn check_room(&self, pid: PoolId, user: &Address, amount: Amount) -> Result<()> {
        grow(self.stake(pid, user), self.pool(pid)?.clone(), amount).map(|_| ())
    }

    fn restore(&mut self, snapshot: Snapshot) {
        let Snapshot {
            pid,
            user,
            pool,
            stake,
        } = snapshot;
        if let Some(slot) = self.pools.get_mut(pid) {
            *slot = pool;
        }
        match stake {
            Some(stake) => {
                self.stakes.insert((pid, user), stake);
            }
            None => {
                self.stakes.remove(&(pid, user));
            }
        }
    }
}

/// Stake and pool after staking `amount` more, with the debt reset
fn grow(
    mut stake: UserStake,
    mut pool: FarmPool,
    amount: Amount,
) -> Result<(UserStake, FarmPool)> {
    stake.amount = stake
        .amount
        .checked_add(amount)
        .ok_or(ArithmeticError::Overflow { context: "stake" })?;
    pool.total_staked = pool
        .total_staked
        .checked_add(amount)
        .ok_or(ArithmeticError::Overflow {
            context: "total staked",
        })?;
    stake.reward_debt = calculator::accrued(stake.amount, pool.acc_reward_per_share)?;
    Ok((stake, pool))
}

#[derive(Debug, Clone, Copy)]
enum StakeDelta {
    Add(Amount),
    Remove(Amount),
}

#[derive(Debug, Clone)]
struct Snapshot {
    pid: PoolId,
    user: Address,
    pool: FarmPool,
    stake: Option<UserStake>,
}

pub struct YieldFarm {
    /// Principal of the farm: LP custody account, approved spender, reward minter
    address: Address,
    reward_token: TokenId,
    ledger: Arc<dyn TokenLedger>,
    /// Router used by `zap_and_stake`
    router: Option<Arc<SwapRouter>>,
    guard: ReentrancyGuard,
    state: Mutex<FarmState>,
}

impl YieldFarm {
    pub fn new(config: &FarmConfig, admin: Address, ledger: Arc<dyn TokenLedger>) -> Self {
        tracing::info!(
            address = %config.farm_address,
            reward_token = %config.reward_token,
            emission_rate = config.emission_rate,
            start_time = config.start_time,
            "Yield farm initialized"
        );
        Self {
            address: config.farm_address.clone(),
            reward_token: config.reward_token.clone(),
            ledger,
            router: None,
            guard: ReentrancyGuard::new(COMPONENT),
            state: Mutex::new(FarmState {
                admin,
                emission_rate: config.emission_rate,
                start_time: config.start_time,
                total_weight: 0,
                pools: Vec::new(),
                stakes: HashMap::new(),
            }),
        }
    }

    /// Link the router used for zap-and-stake. The router must name this
    /// farm's address as its authorized farm.
    pub fn with_router(mut self, router: Arc<SwapRouter>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn reward_token(&self) -> &TokenId {
        &self.reward_token
    }

    fn state(&self) -> Result<MutexGuard<'_, FarmState>> {
        self.state.lock().map_err(|_| Error::Poisoned {
            component: COMPONENT,
        })
    }

    /// Run ledger interactions as one unit; on failure undo them and restore
    /// the snapshot.
    fn interact<T>(
        &self,
        snapshot: Snapshot,
        apply: impl FnOnce(&mut LedgerBatch<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut batch = LedgerBatch::new(self.ledger.as_ref());
        match apply(&mut batch) {
            Ok(value) => {
                batch.commit();
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(
                    pid = snapshot.pid,
                    user = %snapshot.user,
                    steps = batch.len(),
                    "Rolling back farm call: {}",
                    e
                );
                batch.rollback();
                self.state()?.restore(snapshot);
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Pool administration
    // ---------------------------------------------------------------------

    pub fn add_pool(
        &self,
        ctx: &TxContext,
        lp_token: TokenId,
        weight: u64,
        settle_all_first: bool,
    ) -> Result<PoolId> {
        let _scope = self.guard.enter()?;
        let mut state = self.state()?;
        state.only_admin(ctx, "add farm pool")?;
        if state.pools.iter().any(|pool| pool.lp_token == lp_token) {
            return Err(ValidationError::PoolExists { lp_token }.into());
        }
        let total_weight = state
            .total_weight
            .checked_add(weight)
            .ok_or(ArithmeticError::Overflow {
                context: "total weight",
            })?;
        if settle_all_first {
            state.settle_all(ctx.timestamp)?;
        }

        let pid = state.pools.len();
        let last_settle = ctx.timestamp.max(state.start_time);
        tracing::info!(pid, lp_token = %lp_token, weight, "Added farm pool");
        state.pools.push(FarmPool {
            lp_token,
            weight,
            last_settle,
            acc_reward_per_share: 0,
            total_staked: 0,
        });
        state.total_weight = total_weight;
        Ok(pid)
    }

    pub fn set_pool_weight(
        &self,
        ctx: &TxContext,
        pid: PoolId,
        weight: u64,
        settle_all_first: bool,
    ) -> Result<()> {
        let _scope = self.guard.enter()?;
        let mut state = self.state()?;
        state.only_admin(ctx, "set farm pool weight")?;
        let previous = state.pool(pid)?.weight;
        let total_weight = (state.total_weight - previous)
            .checked_add(weight)
            .ok_or(ArithmeticError::Overflow {
                context: "total weight",
            })?;
        if settle_all_first {
            state.settle_all(ctx.timestamp)?;
        }

        tracing::info!(pid, previous, weight, "Farm pool weight updated");
        state.pools[pid].weight = weight;
        state.total_weight = total_weight;
        Ok(())
    }

    /// Settle every pool, then switch the emission rate
    pub fn set_emission_rate(&self, ctx: &TxContext, rate: Amount) -> Result<()> {
        let _scope = self.guard.enter()?;
        let mut state = self.state()?;
        state.only_admin(ctx, "set emission rate")?;
        state.settle_all(ctx.timestamp)?;
        tracing::info!(previous = state.emission_rate, rate, "Emission rate updated");
        state.emission_rate = rate;
        Ok(())
    }

    pub fn transfer_admin(&self, ctx: &TxContext, new_admin: Address) -> Result<()> {
        let _scope = self.guard.enter()?;
        let mut state = self.state()?;
        state.only_admin(ctx, "transfer farm admin")?;
        tracing::info!(from = %state.admin, to = %new_admin, "Farm admin transferred");
        state.admin = new_admin;
        Ok(())
    }

    /// Bring one pool's accumulator up to date. Anyone may call this.
    pub fn settle_pool(&self, ctx: &TxContext, pid: PoolId) -> Result<()> {
        let _scope = self.guard.enter()?;
        self.state()?.settle(pid, ctx.timestamp)
    }

    pub fn settle_all(&self, ctx: &TxContext) -> Result<()> {
        let _scope = self.guard.enter()?;
        self.state()?.settle_all(ctx.timestamp)
    }

    // ---------------------------------------------------------------------
    // Staking
    // ---------------------------------------------------------------------

    /// Stake `amount` LP shares. Pays out any reward already owed.
    /// Returns the reward paid.
    pub fn deposit(&self, ctx: &TxContext, pid: PoolId, amount: Amount) -> Result<Amount> {
        let _scope = self.guard.enter()?;
        if amount == 0 {
            return Err(ValidationError::ZeroAmount { field: "amount" }.into());
        }

        let (reward, snapshot, lp_token) = {
            let mut state = self.state()?;
            let (reward, snapshot) =
                state.rebalance(pid, &ctx.sender, StakeDelta::Add(amount), ctx.timestamp)?;
            (reward, snapshot, state.pools[pid].lp_token.clone())
        };

        self.interact(snapshot, |batch| {
            batch.mint(&self.reward_token, &self.address, &ctx.sender, reward)?;
            batch.pull(&lp_token, &self.address, &ctx.sender, &self.address, amount)?;
            Ok(())
        })?;

        tracing::debug!(pid, user = %ctx.sender, amount, reward, "Deposited");
        Ok(reward)
    }

    /// Unstake `amount` LP shares and pay out the reward owed.
    /// `amount == 0` only harvests. Returns the reward paid.
    pub fn withdraw(&self, ctx: &TxContext, pid: PoolId, amount: Amount) -> Result<Amount> {
        let _scope = self.guard.enter()?;
        let reward = self.exit(ctx, pid, amount)?;
        tracing::debug!(pid, user = %ctx.sender, amount, reward, "Withdrew");
        Ok(reward)
    }

    /// Pay out the reward owed without touching the stake
    pub fn harvest(&self, ctx: &TxContext, pid: PoolId) -> Result<Amount> {
        let _scope = self.guard.enter()?;
        let reward = self.exit(ctx, pid, 0)?;
        tracing::debug!(pid, user = %ctx.sender, reward, "Harvested");
        Ok(reward)
    }

    fn exit(&self, ctx: &TxContext, pid: PoolId, amount: Amount) -> Result<Amount> {
        let (reward, snapshot, lp_token) = {
            let mut state = self.state()?;
            let (reward, snapshot) =
                state.rebalance(pid, &ctx.sender, StakeDelta::Remove(amount), ctx.timestamp)?;
            (reward, snapshot, state.pools[pid].lp_token.clone())
        };

        self.interact(snapshot, |batch| {
            batch.mint(&self.reward_token, &self.address, &ctx.sender, reward)?;
            batch.push(&lp_token, &self.address, &ctx.sender, amount)?;
            Ok(())
        })?;
        Ok(reward)
    }

    /// Return the whole stake without settling or paying reward.
    /// Pending reward is forfeited. Returns the LP amount returned.
    pub fn emergency_withdraw(&self, ctx: &TxContext, pid: PoolId) -> Result<Amount> {
        let _scope = self.guard.enter()?;

        let (amount, snapshot, lp_token) = {
            let mut state = self.state()?;
            let pool = state.pool(pid)?.clone();
            let key = (pid, ctx.sender.clone());
            let snapshot = Snapshot {
                pid,
                user: ctx.sender.clone(),
                pool: pool.clone(),
                stake: state.stakes.get(&key).copied(),
            };
            let amount = state.stake(pid, &ctx.sender).amount;
            if let Some(stake) = state.stakes.get_mut(&key) {
                *stake = UserStake::default();
            }
            state.pools[pid].total_staked = pool.total_staked.saturating_sub(amount);
            (amount, snapshot, pool.lp_token)
        };

        self.interact(snapshot, |batch| {
            batch.push(&lp_token, &self.address, &ctx.sender, amount)?;
            Ok(())
        })?;

        tracing::warn!(pid, user = %ctx.sender, amount, "Emergency withdrawal");
        Ok(amount)
    }

    /// Supply liquidity through the linked router and stake the minted
    /// shares for the caller. The caller must have approved the router for
    /// both tokens.
    pub fn zap_and_stake(
        &self,
        ctx: &TxContext,
        pid: PoolId,
        request: &ZapRequest,
    ) -> Result<ZapOutcome> {
        let _scope = self.guard.enter()?;
        let router = self.router.as_ref().ok_or(NotFoundError::RouterLink)?;

        let lp_token = self.state()?.pool(pid)?.lp_token.clone();
        let pair_lp = router.get_lp_token(&request.token_a, &request.token_b)?;
        if pair_lp != lp_token {
            return Err(ValidationError::LpTokenMismatch {
                expected: lp_token,
                got: pair_lp,
            }
            .into());
        }

        let params = AddLiquidity {
            token_a: request.token_a.clone(),
            token_b: request.token_b.clone(),
            amount_a_desired: request.amount_a_desired,
            amount_b_desired: request.amount_b_desired,
            amount_a_min: request.amount_a_min,
            amount_b_min: request.amount_b_min,
            to: self.address.clone(),
        };
        let preview = router.preview_add_liquidity(&params, ctx.timestamp)?;

        // Harvest first so the stake grows against a settled accumulator, and
        // refuse before any token moves if the new shares could not be staked
        let (reward, snapshot) = {
            let mut state = self.state()?;
            let (reward, snapshot) =
                state.rebalance(pid, &ctx.sender, StakeDelta::Add(0), ctx.timestamp)?;
            if let Err(e) = state.check_room(pid, &ctx.sender, preview.liquidity) {
                state.restore(snapshot);
                return Err(e);
            }
            (reward, snapshot)
        };

        let router_ctx = TxContext::new(self.address.clone(), ctx.timestamp);
        let added = self.interact(snapshot, |batch| {
            batch.mint(&self.reward_token, &self.address, &ctx.sender, reward)?;
            router.add_liquidity_for(&router_ctx, &ctx.sender, &params)
        })?;

        // Same timestamp and the guard is held: the accumulator has not moved
        let staked = self.state()?.rebalance(
            pid,
            &ctx.sender,
            StakeDelta::Add(added.liquidity),
            ctx.timestamp,
        );
        if let Err(e) = staked {
            tracing::error!(
                pid,
                user = %ctx.sender,
                liquidity = added.liquidity,
                "Zap minted shares that could not be staked, returning them: {}",
                e
            );
            self.ledger
                .transfer(&lp_token, &self.address, &ctx.sender, added.liquidity)?;
            return Err(e);
        }

        tracing::debug!(
            pid,
            user = %ctx.sender,
            liquidity = added.liquidity,
            reward,
            "Zapped and staked"
        );
        Ok(ZapOutcome {
            amount_a: added.amount_a,
            amount_b: added.amount_b,
            liquidity: added.liquidity,
            reward_paid: reward,
        })
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    /// Reward `user` could harvest at `now`. Pure projection.
    pub fn pending_reward(&self, pid: PoolId, user: &Address, now: Timestamp) -> Result<Amount> {
        let state = self.state()?;
        let pool = state.pool(pid)?;
        let acc = calculator::projected_accumulator(
            pool,
            now,
            state.emission_rate,
            state.total_weight,
        )?;
        calculator::pending(&state.stake(pid, user), acc)
    }

    pub fn pool_count(&self) -> Result<usize> {
        Ok(self.state()?.pools.len())
    }

    pub fn pool_info(&self, pid: PoolId) -> Result<FarmPool> {
        Ok(self.state()?.pool(pid)?.clone())
    }

    pub fn pools(&self) -> Result<Vec<FarmPool>> {
        Ok(self.state()?.pools.clone())
    }

    /// Zeroed stake for users who never deposited
    pub fn user_info(&self, pid: PoolId, user: &Address) -> Result<UserStake> {
        let state = self.state()?;
        state.pool(pid)?;
        Ok(state.stake(pid, user))
    }

    pub fn admin(&self) -> Result<Address> {
        Ok(self.state()?.admin.clone())
    }

    pub fn emission_rate(&self) -> Result<Amount> {
        Ok(self.state()?.emission_rate)
    }

    pub fn total_weight(&self) -> Result<u64> {
        Ok(self.state()?.total_weight)
    }

    pub fn start_time(&self) -> Result<Timestamp> {
        Ok(self.state()?.start_time)
    }
}
