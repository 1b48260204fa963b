//! Mocks of the protocol components wired by the deployment tooling

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolInterface;

use crate::sim::world::{
    done, mapping_slot, named_slot, offset_slot, require, ret, CallContext, Revert, SimContract,
};
use crate::solidity::{
    IERC20Mock::{balanceOfCall, mintToCall, transferCall, transferFromCall},
    ILPSwap::ILPSwapCalls,
    IPool::IPoolCalls,
    IPresale::IPresaleCalls,
    ISetup::ISetupCalls,
    ISwap::ISwapCalls,
    IVerifier::IVerifierCalls,
};

use super::{address_book, initialize_owner, only_owner, owner, registry_aware, resolve};

/// A component with no behavior beyond ownership and its registry pointer,
/// optionally exposing a one-time `setup()` that needs the registry linked
#[derive(Default)]
pub struct RegistryAwareComponent {
    /// Whether the component implements `setup()`
    setup: bool,
}

impl RegistryAwareComponent {
    /// A component implementing `setup()`
    pub fn with_setup() -> Self {
        Self { setup: true }
    }
}

impl SimContract for RegistryAwareComponent {
    fn execute(&self, ctx: &mut CallContext<'_>, calldata: &[u8]) -> Result<Bytes, Revert> {
        let call = match ISetupCalls::abi_decode(calldata) {
            Ok(call) if self.setup => call,
            _ => return registry_aware(ctx, calldata),
        };

        let slot = named_slot("Setup.done");
        match call {
            ISetupCalls::setup(_) => {
                only_owner(ctx)?;
                require(!address_book(ctx).is_zero(), "address book not set")?;
                require(ctx.load_u256(slot).is_zero(), "already set up")?;
                ctx.store_u256(slot, U256::from(1));
                done()
            }
            ISetupCalls::isSetup(_) => ret(!ctx.load_u256(slot).is_zero()),
        }
    }
}

/// The liquidity pool, which records its payment-token balance as liquidity
/// once the owner creates it
pub struct Pool;

impl SimContract for Pool {
    fn execute(&self, ctx: &mut CallContext<'_>, calldata: &[u8]) -> Result<Bytes, Revert> {
        let Ok(call) = IPoolCalls::abi_decode(calldata) else {
            return registry_aware(ctx, calldata);
        };

        let slot = named_slot("Pool.liquidity");
        match call {
            IPoolCalls::createLiquidity(_) => {
                only_owner(ctx)?;
                require(ctx.load_u256(slot).is_zero(), "liquidity already created")?;
                let payment = resolve(ctx, "payment")?;
                resolve(ctx, "router")?;
                resolve(ctx, "factory")?;

                let this = ctx.this();
                let balance = ctx.call_sol(payment, balanceOfCall { account: this })?;
                require(!balance.is_zero(), "no payment tokens")?;
                ctx.store_u256(slot, balance);
                done()
            }
            IPoolCalls::liquidity(_) => ret(ctx.load_u256(slot)),
        }
    }
}

/// Swaps the protocol token one for one against the payment token
pub struct Swap;

impl SimContract for Swap {
    fn execute(&self, ctx: &mut CallContext<'_>, calldata: &[u8]) -> Result<Bytes, Revert> {
        let Ok(call) = ISwapCalls::abi_decode(calldata) else {
            return registry_aware(ctx, calldata);
        };

        let (sender, this) = (ctx.sender(), ctx.this());
        let payment = resolve(ctx, "payment")?;
        let token = resolve(ctx, "token")?;
        match call {
            ISwapCalls::buy(call) => {
                require(call.payment == payment, "unsupported payment token")?;
                require(!call.amount.is_zero(), "amount is zero")?;
                ctx.call_sol(
                    payment,
                    transferFromCall {
                        from: sender,
                        to: this,
                        amount: call.amount,
                    },
                )?;
                ctx.call_sol(
                    token,
                    mintToCall {
                        account: sender,
                        amount: call.amount,
                    },
                )?;
            }
            ISwapCalls::sell(call) => {
                require(!call.amount.is_zero(), "amount is zero")?;
                ctx.call_sol(
                    token,
                    transferFromCall {
                        from: sender,
                        to: this,
                        amount: call.amount,
                    },
                )?;
                ctx.call_sol(
                    payment,
                    transferCall {
                        to: sender,
                        amount: call.amount,
                    },
                )?;
            }
        }
        done()
    }
}

/// Registry of the swap paths used to convert collected tokens to the payment token
pub struct LpSwap;

/// The slot holding the length of the path stored for `token`
fn path_slot(token: Address) -> B256 {
    mapping_slot(named_slot("LPSwap.swapPaths"), token.into_word().as_slice())
}

impl SimContract for LpSwap {
    fn execute(&self, ctx: &mut CallContext<'_>, calldata: &[u8]) -> Result<Bytes, Revert> {
        let Ok(call) = ILPSwapCalls::abi_decode(calldata) else {
            return registry_aware(ctx, calldata);
        };

        match call {
            ILPSwapCalls::setSwapPathFromTokenToUSDC(call) => {
                only_owner(ctx)?;
                require(
                    call.path.len() >= 2 && call.path.first() == Some(&call.token),
                    "invalid swap path",
                )?;

                let len_slot = path_slot(call.token);
                ctx.store_u256(len_slot, U256::from(call.path.len()));
                let elements = keccak256(len_slot);
                for (i, hop) in call.path.iter().enumerate() {
                    ctx.store_address(offset_slot(elements, i as u64), *hop);
                }
                done()
            }
            ILPSwapCalls::getSwapPathFromTokenToUSDC(call) => {
                let len_slot = path_slot(call.token);
                let len = u64::try_from(ctx.load_u256(len_slot)).unwrap_or_default();
                let elements = keccak256(len_slot);
                let path = (0..len)
                    .map(|i| ctx.load_address(offset_slot(elements, i)))
                    .collect::<Vec<_>>();
                ret(path)
            }
        }
    }
}

/// Holder of the signer whose signatures the presale accepts
pub struct Verifier;

impl SimContract for Verifier {
    fn execute(&self, ctx: &mut CallContext<'_>, calldata: &[u8]) -> Result<Bytes, Revert> {
        let slot = named_slot("Verifier.signer");
        match IVerifierCalls::abi_decode(calldata) {
            Ok(IVerifierCalls::updateSigner(call)) => {
                only_owner(ctx)?;
                require(!call.signer_.is_zero(), "signer is the zero address")?;
                ctx.store_address(slot, call.signer_);
                done()
            }
            Ok(IVerifierCalls::signer(_)) => ret(ctx.load_address(slot)),
            Err(_) => registry_aware(ctx, calldata),
        }
    }
}

/// The presale, deployed directly and configured through owner-only setters
pub struct Presale;

impl SimContract for Presale {
    fn construct(&self, ctx: &mut CallContext<'_>, _args: &[u8]) -> Result<(), Revert> {
        initialize_owner(ctx)
    }

    fn execute(&self, ctx: &mut CallContext<'_>, calldata: &[u8]) -> Result<Bytes, Revert> {
        let call = IPresaleCalls::abi_decode(calldata).map_err(|_| Revert::unknown_selector())?;

        let (treasury, payment_token, verifier) = (
            named_slot("Presale.treasury"),
            named_slot("Presale.paymentToken"),
            named_slot("Presale.verifier"),
        );
        let (slot, value) = match call {
            IPresaleCalls::setTreasury(call) => (treasury, call.treasury_),
            IPresaleCalls::setPaymentToken(call) => (payment_token, call.paymentToken_),
            IPresaleCalls::setVerifier(call) => (verifier, call.verifier_),
            IPresaleCalls::treasury(_) => return ret(ctx.load_address(treasury)),
            IPresaleCalls::paymentToken(_) => return ret(ctx.load_address(payment_token)),
            IPresaleCalls::verifier(_) => return ret(ctx.load_address(verifier)),
            IPresaleCalls::owner(_) => return ret(owner(ctx)),
        };

        only_owner(ctx)?;
        require(!value.is_zero(), "zero address")?;
        ctx.store_address(slot, value);
        done()
    }
}
