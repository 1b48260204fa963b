//! Handles on deployed contracts

use std::{
    fmt::{self, Debug},
    sync::Arc,
};

use alloy_primitives::Address;
use alloy_sol_types::SolCall;

use crate::{
    chain::{ChainClient, TxReceipt},
    errors::ScriptError,
};

/// A deployed contract, reachable through a chain client
#[derive(Clone)]
pub struct ContractHandle {
    /// The artifact name the contract was deployed from
    name: String,
    /// The contract's address
    address: Address,
    /// The client used to reach it
    chain: Arc<dyn ChainClient>,
}

impl Debug for ContractHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractHandle")
            .field("name", &self.name)
            .field("address", &self.address)
            .finish()
    }
}

impl ContractHandle {
    /// Wrap a contract that is already deployed at `address`
    pub fn attach(name: impl Into<String>, address: Address, chain: Arc<dyn ChainClient>) -> Self {
        Self {
            name: name.into(),
            address,
            chain,
        }
    }

    /// The artifact name of the contract
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The contract's address
    pub fn address(&self) -> Address {
        self.address
    }

    /// The client the handle sends through
    pub fn chain(&self) -> &Arc<dyn ChainClient> {
        &self.chain
    }

    /// The same contract reached through another signer
    pub fn connect(&self, chain: Arc<dyn ChainClient>) -> Self {
        Self {
            name: self.name.clone(),
            address: self.address,
            chain,
        }
    }

    /// Send a state-changing call and wait for its confirmation
    pub async fn send<C: SolCall>(&self, call: C) -> Result<TxReceipt, ScriptError> {
        self.chain
            .send(self.address, call.abi_encode().into())
            .await
            .map_err(|e| match e {
                ScriptError::TransactionReverted(s) => ScriptError::TransactionReverted(format!(
                    "{}.{} at {:#x}: {}",
                    self.name,
                    C::SIGNATURE,
                    self.address,
                    s
                )),
                e => e,
            })
    }

    /// Execute a read-only call and decode its return value
    pub async fn call<C: SolCall>(&self, call: C) -> Result<C::Return, ScriptError> {
        let data = self.chain.call(self.address, call.abi_encode().into()).await?;
        C::abi_decode_returns(&data).map_err(|e| {
            ScriptError::ContractInteraction(format!("decoding {} return: {}", C::SIGNATURE, e))
        })
    }
}
