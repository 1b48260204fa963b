//! Token mocks: the upgradeable protocol token and the mintable ERC20s

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolInterface;

use crate::{
    sim::world::{done, mapping_slot, named_slot, require, ret, CallContext, Revert, SimContract},
    solidity::{IERC20Mock::IERC20MockCalls, IVersioned::IVersionedCalls},
};

use super::{initialize_owner, registry_aware};

/// The protocol token, an ERC20 whose logic versions each report a different
/// `version()`
pub struct VersionedToken {
    /// The value returned by `version()`
    version: u64,
}

impl VersionedToken {
    /// A token logic contract reporting `version`
    pub fn new(version: u64) -> Self {
        Self { version }
    }
}

impl SimContract for VersionedToken {
    fn execute(&self, ctx: &mut CallContext<'_>, calldata: &[u8]) -> Result<Bytes, Revert> {
        match IVersionedCalls::abi_decode(calldata) {
            Ok(IVersionedCalls::version(_)) => ret(U256::from(self.version)),
            Err(_) => Erc20Mock.execute(ctx, calldata),
        }
    }
}

/// A freely mintable ERC20
pub struct Erc20Mock;

/// The slot of `balances[account]`
fn balance_slot(account: Address) -> B256 {
    mapping_slot(named_slot("ERC20.balances"), account.into_word().as_slice())
}

/// The slot of `allowances[owner][spender]`
fn allowance_slot(owner: Address, spender: Address) -> B256 {
    let inner = mapping_slot(named_slot("ERC20.allowances"), owner.into_word().as_slice());
    mapping_slot(inner, spender.into_word().as_slice())
}

impl Erc20Mock {
    /// Credit `amount` to `account`, growing the supply
    fn mint(ctx: &mut CallContext<'_>, account: Address, amount: U256) {
        let balance = ctx.load_u256(balance_slot(account));
        ctx.store_u256(balance_slot(account), balance + amount);

        let supply_slot = named_slot("ERC20.totalSupply");
        let supply = ctx.load_u256(supply_slot);
        ctx.store_u256(supply_slot, supply + amount);
    }

    /// Move `amount` from `from` to `to`
    fn transfer(
        ctx: &mut CallContext<'_>,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), Revert> {
        require(!to.is_zero(), "ERC20: transfer to the zero address")?;
        let from_balance = ctx.load_u256(balance_slot(from));
        require(from_balance >= amount, "ERC20: transfer amount exceeds balance")?;

        ctx.store_u256(balance_slot(from), from_balance - amount);
        let to_balance = ctx.load_u256(balance_slot(to));
        ctx.store_u256(balance_slot(to), to_balance + amount);
        Ok(())
    }
}

impl SimContract for Erc20Mock {
    fn execute(&self, ctx: &mut CallContext<'_>, calldata: &[u8]) -> Result<Bytes, Revert> {
        let Ok(call) = IERC20MockCalls::abi_decode(calldata) else {
            return registry_aware(ctx, calldata);
        };

        match call {
            IERC20MockCalls::initialize(call) => {
                initialize_owner(ctx)?;
                ctx.store_short_string(named_slot("ERC20.name"), &call.name_)?;
                ctx.store_short_string(named_slot("ERC20.symbol"), &call.symbol_)?;
                done()
            }
            IERC20MockCalls::mint(call) => {
                let sender = ctx.sender();
                Self::mint(ctx, sender, call.amount);
                done()
            }
            IERC20MockCalls::mintTo(call) => {
                Self::mint(ctx, call.account, call.amount);
                done()
            }
            IERC20MockCalls::totalSupply(_) => ret(ctx.load_u256(named_slot("ERC20.totalSupply"))),
            IERC20MockCalls::balanceOf(call) => ret(ctx.load_u256(balance_slot(call.account))),
            IERC20MockCalls::transfer(call) => {
                let sender = ctx.sender();
                Self::transfer(ctx, sender, call.to, call.amount)?;
                ret(true)
            }
            IERC20MockCalls::allowance(call) => {
                ret(ctx.load_u256(allowance_slot(call.owner, call.spender)))
            }
            IERC20MockCalls::approve(call) => {
                let sender = ctx.sender();
                ctx.store_u256(allowance_slot(sender, call.spender), call.amount);
                ret(true)
            }
            IERC20MockCalls::transferFrom(call) => {
                let spender = ctx.sender();
                let slot = allowance_slot(call.from, spender);
                let allowance = ctx.load_u256(slot);
                require(allowance >= call.amount, "ERC20: insufficient allowance")?;

                ctx.store_u256(slot, allowance - call.amount);
                Self::transfer(ctx, call.from, call.to, call.amount)?;
                ret(true)
            }
            IERC20MockCalls::name(_) => ret(ctx.load_short_string(named_slot("ERC20.name"))),
            IERC20MockCalls::symbol(_) => ret(ctx.load_short_string(named_slot("ERC20.symbol"))),
            IERC20MockCalls::decimals(_) => ret(U256::from(18u8)),
        }
    }
}
