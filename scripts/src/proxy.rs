//! Deployment and upgrade of transparent upgradeable proxies.
//!
//! Concretely, this is a [`TransparentUpgradeableProxy`](https://docs.openzeppelin.com/contracts/5.x/api/proxy#transparent_proxy),
//! which itself deploys a `ProxyAdmin` contract owned by the deployer.
//!
//! Calls made directly to the `TransparentUpgradeableProxy` contract will be forwarded to the implementation contract.
//! Upgrade calls can only be made to the `TransparentUpgradeableProxy` through the `ProxyAdmin`.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolValue;
use tracing::info;

use crate::{
    chain::ChainClient,
    constants::{
        NUM_BYTES_ADDRESS, NUM_BYTES_STORAGE_SLOT, PROXY_ADMIN_STORAGE_SLOT,
        PROXY_CONTRACT_NAME, PROXY_IMPLEMENTATION_STORAGE_SLOT,
    },
    errors::ScriptError,
    handle::ContractHandle,
    solidity::IProxyAdmin::upgradeAndCallCall,
};

/// The addresses making up a proxied deployment
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProxyDeployment {
    /// The stable address users interact with
    pub proxy: Address,
    /// The logic contract currently behind the proxy
    pub implementation: Address,
    /// The admin contract allowed to upgrade the proxy
    pub admin: Address,
}

/// Deploys and upgrades proxies on behalf of the sending account
#[derive(Clone)]
pub struct ProxyDeployer {
    /// The client used to send the deployment transactions
    chain: Arc<dyn ChainClient>,
}

impl ProxyDeployer {
    /// Create a deployer sending through the given client
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }

    /// Deploy `contract` as the logic of a new proxy, running `init_calldata`
    /// against it in the proxy's context
    pub async fn deploy_proxy(
        &self,
        contract: &str,
        init_calldata: Bytes,
    ) -> Result<ProxyDeployment, ScriptError> {
        let implementation = self.chain.deploy_contract(contract, Bytes::new()).await?;
        info!("{} implementation deployed at {:#x}", contract, implementation);

        let owner = self.chain.sender();
        let constructor_args = (implementation, owner, init_calldata).abi_encode_params();
        let proxy = self
            .chain
            .deploy_contract(PROXY_CONTRACT_NAME, constructor_args.into())
            .await?;
        let admin = self.admin_of(proxy).await?;
        info!("{} proxy deployed at {:#x} (admin {:#x})", contract, proxy, admin);

        Ok(ProxyDeployment {
            proxy,
            implementation,
            admin,
        })
    }

    /// Deploy `contract` and point the existing proxy at it.
    ///
    /// The proxy address is unchanged; the implementation slot is read back
    /// to confirm the upgrade took effect.
    pub async fn upgrade_proxy(
        &self,
        proxy: Address,
        contract: &str,
    ) -> Result<ProxyDeployment, ScriptError> {
        let admin = self.admin_of(proxy).await?;
        if admin.is_zero() {
            return Err(ScriptError::ContractInteraction(format!(
                "{:#x} is not a transparent proxy (empty admin slot)",
                proxy
            )));
        }
        let previous = self.implementation_of(proxy).await?;

        let implementation = self.chain.deploy_contract(contract, Bytes::new()).await?;
        info!("{} implementation deployed at {:#x}", contract, implementation);

        let proxy_admin = ContractHandle::attach("ProxyAdmin", admin, self.chain.clone());
        proxy_admin
            .send(upgradeAndCallCall {
                proxy,
                implementation,
                data: Bytes::new(),
            })
            .await?;

        let current = self.implementation_of(proxy).await?;
        if current != implementation || current == previous {
            return Err(ScriptError::UpgradeNotApplied(proxy));
        }
        info!(
            "upgraded proxy {:#x} from {:#x} to {:#x}",
            proxy, previous, implementation
        );

        Ok(ProxyDeployment {
            proxy,
            implementation,
            admin,
        })
    }

    /// Read the proxy admin address from the EIP-1967 admin slot
    pub async fn admin_of(&self, proxy: Address) -> Result<Address, ScriptError> {
        self.read_address_slot(proxy, PROXY_ADMIN_STORAGE_SLOT).await
    }

    /// Read the implementation address from the EIP-1967 implementation slot
    pub async fn implementation_of(&self, proxy: Address) -> Result<Address, ScriptError> {
        self.read_address_slot(proxy, PROXY_IMPLEMENTATION_STORAGE_SLOT)
            .await
    }

    /// Read a storage slot holding a right-aligned address
    async fn read_address_slot(&self, proxy: Address, slot: B256) -> Result<Address, ScriptError> {
        let word = self.chain.storage_at(proxy, slot).await?;
        Ok(Address::from_slice(
            &word[NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS..NUM_BYTES_STORAGE_SLOT],
        ))
    }
}
