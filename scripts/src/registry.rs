//! Client for the on-chain `AddressBook` registry.
//!
//! The zero address is the registry's "unset" sentinel: [`Registry::get`]
//! returns it as-is, while [`Registry::lookup`] and
//! [`Registry::get_required`] turn it into `None` and an error respectively.

use std::{collections::HashMap, sync::Arc};

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolCall;
use tracing::{debug, info};

use crate::{
    chain::{ChainClient, TxReceipt},
    constants::ADDRESS_BOOK_CONTRACT_NAME,
    errors::ScriptError,
    handle::ContractHandle,
    proxy::ProxyDeployer,
    solidity::IAddressBook::{getCall, initializeCall, ownerCall, setCall},
    types::{PollConfig, RegistryKey},
    utils::poll_until,
};

/// A handle on a deployed `AddressBook`
#[derive(Debug, Clone)]
pub struct Registry {
    /// The registry contract
    handle: ContractHandle,
}

impl Registry {
    /// Use the registry already deployed at `address`
    pub fn attach(chain: Arc<dyn ChainClient>, address: Address) -> Self {
        Self {
            handle: ContractHandle::attach(ADDRESS_BOOK_CONTRACT_NAME, address, chain),
        }
    }

    /// Deploy and initialize a new registry owned by the sending account
    pub async fn deploy(chain: Arc<dyn ChainClient>, proxied: bool) -> Result<Self, ScriptError> {
        let init_calldata: Bytes = initializeCall {}.abi_encode().into();

        let address = if proxied {
            ProxyDeployer::new(chain.clone())
                .deploy_proxy(ADDRESS_BOOK_CONTRACT_NAME, init_calldata)
                .await?
                .proxy
        } else {
            let address = chain
                .deploy_contract(ADDRESS_BOOK_CONTRACT_NAME, Bytes::new())
                .await?;
            chain.send(address, init_calldata).await?;
            address
        };
        info!("AddressBook deployed at {:#x}", address);

        Ok(Self::attach(chain, address))
    }

    /// The registry's address
    pub fn address(&self) -> Address {
        self.handle.address()
    }

    /// The registry reached through another signer
    pub fn connect(&self, chain: Arc<dyn ChainClient>) -> Self {
        Self {
            handle: self.handle.connect(chain),
        }
    }

    /// The account allowed to write the registry
    pub async fn owner(&self) -> Result<Address, ScriptError> {
        self.handle.call(ownerCall {}).await
    }

    /// Store `value` under `key`, overwriting any previous value
    pub async fn set(&self, key: RegistryKey, value: Address) -> Result<TxReceipt, ScriptError> {
        debug!("setting registry key {} to {:#x}", key, value);
        self.handle
            .send(setCall {
                key: key.as_str().to_string(),
                value,
            })
            .await
    }

    /// The value stored under `key`, or the zero address if it was never set
    pub async fn get(&self, key: RegistryKey) -> Result<Address, ScriptError> {
        self.handle
            .call(getCall {
                key: key.as_str().to_string(),
            })
            .await
    }

    /// The value stored under `key`, if it is set
    pub async fn lookup(&self, key: RegistryKey) -> Result<Option<Address>, ScriptError> {
        let value = self.get(key).await?;
        Ok((!value.is_zero()).then_some(value))
    }

    /// The value stored under `key`, failing if it is unset
    pub async fn get_required(&self, key: RegistryKey) -> Result<Address, ScriptError> {
        self.lookup(key)
            .await?
            .ok_or(ScriptError::UnsetRegistryKey(key))
    }

    /// Write `value` under `key` unless it is already stored there.
    ///
    /// Returns whether a transaction was sent.
    pub async fn set_if_changed(
        &self,
        key: RegistryKey,
        value: Address,
    ) -> Result<bool, ScriptError> {
        if self.get(key).await? == value {
            debug!("registry key {} already points at {:#x}", key, value);
            return Ok(false);
        }

        self.set(key, value).await?;
        Ok(true)
    }

    /// Poll until `get(key)` reports `expected`
    pub async fn await_value(
        &self,
        key: RegistryKey,
        expected: Address,
        poll: &PollConfig,
    ) -> Result<(), ScriptError> {
        let what = format!("registry key {} = {:#x}", key, expected);
        poll_until(&what, poll, || async move {
            Ok::<_, ScriptError>(self.get(key).await? == expected)
        })
        .await
    }

    /// Write `value` under `key` if needed, then wait until reads observe it
    pub async fn register(
        &self,
        key: RegistryKey,
        value: Address,
        poll: &PollConfig,
    ) -> Result<(), ScriptError> {
        self.set_if_changed(key, value).await?;
        self.await_value(key, value, poll).await
    }

    /// The set values of the given keys
    pub async fn snapshot(
        &self,
        keys: impl IntoIterator<Item = RegistryKey>,
    ) -> Result<HashMap<RegistryKey, Address>, ScriptError> {
        let mut values = HashMap::new();
        for key in keys {
            if let Some(value) = self.lookup(key).await? {
                values.insert(key, value);
            }
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::sim::{dev_account, SimulatedChain};

    use super::*;

    async fn setup() -> (SimulatedChain, Registry) {
        let chain = SimulatedChain::new();
        let registry = Registry::deploy(Arc::new(chain.clone()), true).await.unwrap();
        (chain, registry)
    }

    #[tokio::test]
    async fn test_round_trip_and_sentinel() {
        let (_, registry) = setup().await;
        let safe = dev_account(5);

        assert_eq!(registry.get(RegistryKey::Safe).await.unwrap(), Address::ZERO);
        assert_eq!(registry.lookup(RegistryKey::Safe).await.unwrap(), None);
        assert_eq!(
            registry.get_required(RegistryKey::Safe).await,
            Err(ScriptError::UnsetRegistryKey(RegistryKey::Safe))
        );

        registry.set(RegistryKey::Safe, safe).await.unwrap();
        assert_eq!(registry.get(RegistryKey::Safe).await.unwrap(), safe);
        assert_eq!(registry.get_required(RegistryKey::Safe).await.unwrap(), safe);
    }

    #[tokio::test]
    async fn test_set_if_changed_skips_identical_write() {
        let (chain, registry) = setup().await;
        let value = dev_account(6);

        assert!(registry.set_if_changed(RegistryKey::Router, value).await.unwrap());
        let block = chain.block_number();
        assert!(!registry.set_if_changed(RegistryKey::Router, value).await.unwrap());
        assert_eq!(chain.block_number(), block);
    }

    #[tokio::test]
    async fn test_only_owner_writes() {
        let (chain, registry) = setup().await;
        let stranger = registry.connect(Arc::new(chain.connect(dev_account(3))));

        let res = stranger.set(RegistryKey::Safe, dev_account(3)).await;
        assert!(matches!(res, Err(ScriptError::TransactionReverted(_))));
        assert_eq!(registry.owner().await.unwrap(), chain.sender());
    }

    #[tokio::test]
    async fn test_await_value_times_out() {
        let (_, registry) = setup().await;
        let poll = PollConfig {
            interval: Duration::from_millis(1),
            timeout: Duration::from_millis(20),
        };

        let res = registry
            .await_value(RegistryKey::Factory, dev_account(7), &poll)
            .await;
        assert!(matches!(res, Err(ScriptError::PropagationTimeout(_))));
    }
}
