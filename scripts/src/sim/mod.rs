//! An in-process chain executing mock contracts, used to exercise deployments
//! and scenarios without a node.
//!
//! Every state-changing call runs as its own transaction in its own block and
//! is rolled back if it reverts. Clones and [`SimulatedChain::connect`] views
//! share the same state; all access is serialized behind one mutex.

use std::{
    fmt::{self, Debug},
    sync::{Arc, Mutex, MutexGuard},
};

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;

use crate::{
    chain::{ChainClient, ChainControl, TxReceipt},
    errors::ScriptError,
};

pub mod contracts;
pub mod world;

pub use world::{CallContext, Revert, SimContract, World};

/// The address of the `index`-th development account
pub fn dev_account(index: u8) -> Address {
    Address::repeat_byte(0xa0_u8.wrapping_add(index))
}

/// A handle on the simulated chain, sending as one account
#[derive(Clone)]
pub struct SimulatedChain {
    /// The shared chain state
    world: Arc<Mutex<World>>,
    /// The account this handle sends from
    sender: Address,
}

impl Debug for SimulatedChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedChain")
            .field("sender", &self.sender)
            .finish()
    }
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedChain {
    /// A chain with every mock contract deployable, sending from the first dev account
    pub fn new() -> Self {
        let chain = Self::empty();
        for (name, code) in contracts::default_contracts() {
            chain.register_contract(name, code);
        }

        chain
    }

    /// A chain with no deployable contracts
    pub fn empty() -> Self {
        Self {
            world: Arc::new(Mutex::new(World::default())),
            sender: dev_account(0),
        }
    }

    /// Make `code` deployable under the artifact name `name`
    pub fn register_contract(&self, name: &str, code: Arc<dyn SimContract>) {
        if let Ok(mut world) = self.world.lock() {
            world.register_artifact(name, code);
        }
    }

    /// A view of the same chain sending from `sender`
    pub fn connect(&self, sender: Address) -> Self {
        Self {
            world: self.world.clone(),
            sender,
        }
    }

    /// The number of the latest block
    pub fn block_number(&self) -> u64 {
        self.world
            .lock()
            .map(|world| world.block_number())
            .unwrap_or_default()
    }

    /// Lock the chain state
    fn world(&self) -> Result<MutexGuard<'_, World>, ScriptError> {
        self.world
            .lock()
            .map_err(|_| ScriptError::ContractInteraction("simulated chain lock poisoned".into()))
    }
}

#[async_trait]
impl ChainClient for SimulatedChain {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn deploy(
        &self,
        contract: &str,
        constructor_args: Bytes,
    ) -> Result<TxReceipt, ScriptError> {
        let sender = self.sender;
        let mut world = self.world()?;
        let address = world
            .transact(|world| world.create(sender, contract, &constructor_args))
            .map_err(|revert| {
                ScriptError::ContractDeployment(format!("{}: {}", contract, revert))
            })?;

        Ok(world.receipt(sender, Some(address)))
    }

    async fn send(&self, to: Address, calldata: Bytes) -> Result<TxReceipt, ScriptError> {
        let sender = self.sender;
        let mut world = self.world()?;
        world
            .transact(|world| world.call(to, sender, &calldata))
            .map_err(|revert| ScriptError::TransactionReverted(revert.to_string()))?;

        Ok(world.receipt(sender, None))
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ScriptError> {
        self.world()?
            .static_call(to, self.sender, &calldata)
            .map_err(|revert| ScriptError::ContractInteraction(format!("call reverted: {}", revert)))
    }

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ScriptError> {
        Ok(self.world()?.storage_at(address, slot))
    }

    async fn has_code(&self, address: Address) -> Result<bool, ScriptError> {
        Ok(self.world()?.has_code(address))
    }
}

#[async_trait]
impl ChainControl for SimulatedChain {
    async fn increase_time(&self, seconds: u64) -> Result<(), ScriptError> {
        self.world()?.increase_time(seconds);
        Ok(())
    }

    async fn mine_block(&self) -> Result<(), ScriptError> {
        self.world()?.mine_block();
        Ok(())
    }

    async fn block_timestamp(&self) -> Result<u64, ScriptError> {
        Ok(self.world()?.timestamp())
    }

    async fn block_number(&self) -> Result<u64, ScriptError> {
        Ok(self.world()?.block_number())
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;
    use alloy_sol_types::SolCall;

    use crate::{
        constants::ONE_DAY_SECS,
        handle::ContractHandle,
        proxy::ProxyDeployer,
        solidity::{
            IAddressBookAware, IERC20Mock,
            IVersioned::versionCall,
        },
    };

    use super::*;

    #[tokio::test]
    async fn test_revert_rolls_back_state() {
        let chain = Arc::new(SimulatedChain::new());
        let token_address = chain.deploy_contract("FakeToken", Bytes::new()).await.unwrap();
        let token = ContractHandle::attach("FakeToken", token_address, chain.clone());

        token
            .send(IERC20Mock::mintCall {
                amount: U256::from(100),
            })
            .await
            .unwrap();
        let res = token
            .send(IERC20Mock::transferCall {
                to: dev_account(1),
                amount: U256::from(101),
            })
            .await;

        assert!(matches!(res, Err(ScriptError::TransactionReverted(_))));
        let balance = token
            .call(IERC20Mock::balanceOfCall {
                account: chain.sender(),
            })
            .await
            .unwrap();
        assert_eq!(balance, U256::from(100));
    }

    #[tokio::test]
    async fn test_proxy_forwards_and_upgrades() {
        let chain = Arc::new(SimulatedChain::new());
        let proxies = ProxyDeployer::new(chain.clone());
        let init = IAddressBookAware::initializeCall {}.abi_encode().into();

        let deployment = proxies.deploy_proxy("TokenV1", init).await.unwrap();
        assert_eq!(
            proxies.implementation_of(deployment.proxy).await.unwrap(),
            deployment.implementation
        );
        assert!(chain.has_code(deployment.admin).await.unwrap());

        let token = ContractHandle::attach("Token", deployment.proxy, chain.clone());
        assert_eq!(token.call(versionCall {}).await.unwrap(), U256::from(1));
        assert_eq!(
            token.call(IAddressBookAware::ownerCall {}).await.unwrap(),
            chain.sender()
        );

        let upgraded = proxies
            .upgrade_proxy(deployment.proxy, "TokenV2")
            .await
            .unwrap();
        assert_eq!(upgraded.proxy, deployment.proxy);
        assert_ne!(upgraded.implementation, deployment.implementation);
        assert_eq!(token.call(versionCall {}).await.unwrap(), U256::from(2));
    }

    #[tokio::test]
    async fn test_initializer_runs_once() {
        let chain = Arc::new(SimulatedChain::new());
        let init: Bytes = IAddressBookAware::initializeCall {}.abi_encode().into();
        let deployment = ProxyDeployer::new(chain.clone())
            .deploy_proxy("Vault", init.clone())
            .await
            .unwrap();

        let res = chain.send(deployment.proxy, init).await;
        assert!(matches!(res, Err(ScriptError::TransactionReverted(_))));
    }

    #[tokio::test]
    async fn test_time_control() {
        let chain = SimulatedChain::new();
        let start = chain.block_timestamp().await.unwrap();

        chain.increase_time(ONE_DAY_SECS).await.unwrap();
        assert_eq!(chain.block_timestamp().await.unwrap(), start);

        chain.mine_block().await.unwrap();
        assert_eq!(chain.block_timestamp().await.unwrap(), start + ONE_DAY_SECS);
    }

    #[tokio::test]
    async fn test_unknown_artifact() {
        let chain = SimulatedChain::new();
        let res = chain.deploy("NotAContract", Bytes::new()).await;
        assert!(matches!(res, Err(ScriptError::ContractDeployment(_))));
    }
}
