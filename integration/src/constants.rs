//! Constants used by the scenarios

use alloy_primitives::{address, Address, U256};

/// The default private key for the scenarios, the first default account in an Anvil node
pub(crate) const DEFAULT_PKEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// The private key of the non-owner account, the second default account in an Anvil node
pub(crate) const DEFAULT_USER_PKEY: &str =
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

/// The treasury multisig written under `safe`, the third default account in an Anvil node
pub(crate) const SAFE_ADDRESS: Address = address!("3c44cdddb6a900fa2b585dd299e03d12fa4293bc");

/// The DEX router written under `router`
pub(crate) const ROUTER_ADDRESS: Address = address!("10ed43c718714eb63d5aa57b78b54704e256024e");

/// The DEX factory written under `factory`
pub(crate) const FACTORY_ADDRESS: Address = address!("ca143ce32fe78f1f7019d7d551a6402fc5350c73");

/// The amount of the payment token staked in the staking scenarios, one whole token
pub(crate) const STAKE_AMOUNT: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Index of the one-month lock period of the staking contract
pub(crate) const ONE_MONTH_LOCK: u64 = 1;
