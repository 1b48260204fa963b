//! The transparent proxy and its admin contract

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{SolCall, SolInterface, SolValue};

use crate::{
    constants::{
        PROXY_ADMIN_CONTRACT_NAME, PROXY_ADMIN_STORAGE_SLOT, PROXY_IMPLEMENTATION_STORAGE_SLOT,
    },
    sim::world::{done, named_slot, require, ret, CallContext, Revert, SimContract},
    solidity::{
        IProxyAdmin::IProxyAdminCalls,
        ITransparentUpgradeableProxy::upgradeToAndCallCall,
    },
};

use super::{only_owner, owner, OWNER_SLOT};

/// EIP-1967 transparent proxy: the admin may only upgrade, everyone else is
/// forwarded to the implementation
pub struct TransparentUpgradeableProxy;

impl TransparentUpgradeableProxy {
    /// Point the proxy at `implementation` and run `data` against it
    fn upgrade_to_and_call(
        ctx: &mut CallContext<'_>,
        implementation: Address,
        data: &[u8],
    ) -> Result<(), Revert> {
        require(
            ctx.has_code(implementation),
            "ERC1967: new implementation is not a contract",
        )?;
        ctx.store_address(PROXY_IMPLEMENTATION_STORAGE_SLOT, implementation);

        if !data.is_empty() {
            ctx.delegate(implementation, data)?;
        }
        Ok(())
    }
}

impl SimContract for TransparentUpgradeableProxy {
    fn construct(&self, ctx: &mut CallContext<'_>, args: &[u8]) -> Result<(), Revert> {
        let (logic, initial_owner, data) = <(Address, Address, Bytes)>::abi_decode_params(args)
            .map_err(|e| Revert::new(format!("bad constructor arguments: {}", e)))?;

        let admin = ctx.create(PROXY_ADMIN_CONTRACT_NAME, &initial_owner.abi_encode())?;
        ctx.store_address(PROXY_ADMIN_STORAGE_SLOT, admin);
        Self::upgrade_to_and_call(ctx, logic, &data)
    }

    fn execute(&self, ctx: &mut CallContext<'_>, calldata: &[u8]) -> Result<Bytes, Revert> {
        let admin = ctx.load_address(PROXY_ADMIN_STORAGE_SLOT);
        if ctx.sender() == admin {
            let call = upgradeToAndCallCall::abi_decode(calldata).map_err(|_| {
                Revert::new("TransparentUpgradeableProxy: admin cannot fallback to proxy target")
            })?;
            Self::upgrade_to_and_call(ctx, call.newImplementation, &call.data)?;
            return done();
        }

        let implementation = ctx.load_address(PROXY_IMPLEMENTATION_STORAGE_SLOT);
        ctx.delegate(implementation, calldata)
    }
}

/// The owner-controlled admin of a transparent proxy
pub struct ProxyAdmin;

impl SimContract for ProxyAdmin {
    fn construct(&self, ctx: &mut CallContext<'_>, args: &[u8]) -> Result<(), Revert> {
        let initial_owner = Address::abi_decode(args)
            .map_err(|e| Revert::new(format!("bad constructor arguments: {}", e)))?;
        ctx.store_address(named_slot(OWNER_SLOT), initial_owner);
        Ok(())
    }

    fn execute(&self, ctx: &mut CallContext<'_>, calldata: &[u8]) -> Result<Bytes, Revert> {
        let call = IProxyAdminCalls::abi_decode(calldata).map_err(|_| Revert::unknown_selector())?;

        match call {
            IProxyAdminCalls::upgradeAndCall(call) => {
                only_owner(ctx)?;
                let upgrade = upgradeToAndCallCall {
                    newImplementation: call.implementation,
                    data: call.data,
                };
                ctx.call(call.proxy, &upgrade.abi_encode())?;
                done()
            }
            IProxyAdminCalls::owner(_) => ret(owner(ctx)),
        }
    }
}
