//! The LP staking mock

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolInterface, SolValue};

use crate::{
    constants::{ONE_DAY_SECS, ONE_MONTH_SECS},
    sim::world::{
        done, mapping_slot, named_slot, offset_slot, require, ret, CallContext, Revert,
        SimContract,
    },
    solidity::{
        IERC20Mock::{mintToCall, transferCall, transferFromCall},
        ILPStaking::ILPStakingCalls,
    },
};

use super::{registry_aware, resolve};

/// Lock periods selectable by `durationIndex`
const LOCK_DURATIONS: [u64; 3] = [0, ONE_MONTH_SECS, 3 * ONE_MONTH_SECS];

/// Daily reward rate in basis points of the staked amount
const DAILY_REWARD_BPS: u64 = 10;

/// Basis points in a whole
const BPS: u64 = 10_000;

// Fields of a staker's position, as offsets from its base slot

/// The staked amount
const AMOUNT: u64 = 0;
/// The time before which the stake cannot be withdrawn
const LOCK_END: u64 = 1;
/// Rewards accrued up to the last update
const REWARDS: u64 = 2;
/// The time rewards were last accrued
const LAST_UPDATE: u64 = 3;

/// Staking of the payment token with optional lock periods and linearly accruing
/// rewards, minted from the payment token on claim
pub struct LpStaking;

/// The base slot of `stakers[account]`
fn position_slot(account: Address) -> B256 {
    mapping_slot(named_slot("LPStaking.stakers"), account.into_word().as_slice())
}

/// The slot of `registered[account]`
fn registered_slot(account: Address) -> B256 {
    mapping_slot(named_slot("LPStaking.registered"), account.into_word().as_slice())
}

/// A field of `account`'s position
fn field(ctx: &CallContext<'_>, account: Address, offset: u64) -> U256 {
    ctx.load_u256(offset_slot(position_slot(account), offset))
}

/// Overwrite a field of `account`'s position
fn set_field(ctx: &mut CallContext<'_>, account: Address, offset: u64, value: U256) {
    ctx.store_u256(offset_slot(position_slot(account), offset), value);
}

impl LpStaking {
    /// Rewards owed to `account`, including those accrued since its last update
    fn pending(ctx: &CallContext<'_>, account: Address) -> U256 {
        let amount = field(ctx, account, AMOUNT);
        let last_update = field(ctx, account, LAST_UPDATE);
        let elapsed = U256::from(ctx.timestamp()).saturating_sub(last_update);

        let accrued = amount * U256::from(DAILY_REWARD_BPS) * elapsed
            / U256::from(BPS * ONE_DAY_SECS);
        field(ctx, account, REWARDS) + accrued
    }

    /// Fold accrued rewards into the stored position
    fn accrue(ctx: &mut CallContext<'_>, account: Address) {
        let pending = Self::pending(ctx, account);
        set_field(ctx, account, REWARDS, pending);
        let now = U256::from(ctx.timestamp());
        set_field(ctx, account, LAST_UPDATE, now);
    }

    /// Zero the stored rewards of `account` and return them
    fn take_rewards(ctx: &mut CallContext<'_>, account: Address) -> Result<U256, Revert> {
        Self::accrue(ctx, account);
        let rewards = field(ctx, account, REWARDS);
        require(!rewards.is_zero(), "no rewards")?;

        set_field(ctx, account, REWARDS, U256::ZERO);
        Ok(rewards)
    }

    /// Grow or shrink the total staked amount
    fn add_to_total(ctx: &mut CallContext<'_>, amount: U256, add: bool) {
        let slot = named_slot("LPStaking.totalStakingAmount");
        let total = ctx.load_u256(slot);
        let total = if add {
            total + amount
        } else {
            total.saturating_sub(amount)
        };
        ctx.store_u256(slot, total);
    }
}

impl SimContract for LpStaking {
    fn execute(&self, ctx: &mut CallContext<'_>, calldata: &[u8]) -> Result<Bytes, Revert> {
        let Ok(call) = ILPStakingCalls::abi_decode(calldata) else {
            return registry_aware(ctx, calldata);
        };

        let sender = ctx.sender();
        match call {
            ILPStakingCalls::stake(call) => {
                require(!call.amount.is_zero(), "amount is zero")?;
                let duration = u64::try_from(call.durationIndex)
                    .ok()
                    .and_then(|i| LOCK_DURATIONS.get(i as usize).copied())
                    .ok_or_else(|| Revert::new("invalid lock duration"))?;

                let token = resolve(ctx, "payment")?;
                let this = ctx.this();
                ctx.call_sol(
                    token,
                    transferFromCall {
                        from: sender,
                        to: this,
                        amount: call.amount,
                    },
                )?;

                Self::accrue(ctx, sender);
                let amount = field(ctx, sender, AMOUNT) + call.amount;
                set_field(ctx, sender, AMOUNT, amount);

                let lock_end = U256::from(ctx.timestamp() + duration);
                if lock_end > field(ctx, sender, LOCK_END) {
                    set_field(ctx, sender, LOCK_END, lock_end);
                }
                Self::add_to_total(ctx, call.amount, true);
                done()
            }
            ILPStakingCalls::unstake(_) => {
                let amount = field(ctx, sender, AMOUNT);
                require(!amount.is_zero(), "nothing staked")?;
                require(
                    U256::from(ctx.timestamp()) >= field(ctx, sender, LOCK_END),
                    "Tokens are locked",
                )?;

                let token = resolve(ctx, "payment")?;
                Self::accrue(ctx, sender);
                let rewards = field(ctx, sender, REWARDS);
                if !rewards.is_zero() {
                    ctx.call_sol(
                        token,
                        mintToCall {
                            account: sender,
                            amount: rewards,
                        },
                    )?;
                }
                ctx.call_sol(token, transferCall { to: sender, amount })?;

                for offset in [AMOUNT, LOCK_END, REWARDS] {
                    set_field(ctx, sender, offset, U256::ZERO);
                }
                Self::add_to_total(ctx, amount, false);
                done()
            }
            ILPStakingCalls::claimRewards(_) => {
                let rewards = Self::take_rewards(ctx, sender)?;
                let token = resolve(ctx, "payment")?;
                ctx.call_sol(
                    token,
                    mintToCall {
                        account: sender,
                        amount: rewards,
                    },
                )?;
                done()
            }
            ILPStakingCalls::compound(_) => {
                let rewards = Self::take_rewards(ctx, sender)?;
                let token = resolve(ctx, "payment")?;
                let this = ctx.this();
                ctx.call_sol(
                    token,
                    mintToCall {
                        account: this,
                        amount: rewards,
                    },
                )?;

                let amount = field(ctx, sender, AMOUNT) + rewards;
                set_field(ctx, sender, AMOUNT, amount);
                Self::add_to_total(ctx, rewards, true);
                done()
            }
            ILPStakingCalls::registerAddress(_) => {
                ctx.store_u256(registered_slot(sender), U256::from(1));
                done()
            }
            ILPStakingCalls::registered(call) => {
                ret(!ctx.load_u256(registered_slot(call.account)).is_zero())
            }
            ILPStakingCalls::pendingReward(call) => ret(Self::pending(ctx, call.account)),
            ILPStakingCalls::totalStakingAmount(_) => {
                ret(ctx.load_u256(named_slot("LPStaking.totalStakingAmount")))
            }
            ILPStakingCalls::stakers(call) => {
                let position = (
                    field(ctx, call.account, AMOUNT),
                    field(ctx, call.account, LOCK_END),
                    field(ctx, call.account, REWARDS),
                );
                Ok(position.abi_encode_params().into())
            }
        }
    }
}
