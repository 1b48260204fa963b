//! The seam between the deployment logic and the chain it runs against.
//!
//! Two backends implement it: [`rpc::RpcChainClient`] talks to a live node
//! through an alloy provider, and the simulated chain (behind the
//! `test-helpers` feature) executes mock contracts in process.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;

use crate::errors::ScriptError;

pub mod rpc;

/// The parts of a transaction receipt the scripts care about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// The hash of the confirmed transaction
    pub tx_hash: B256,
    /// The block the transaction was included in
    pub block_number: u64,
    /// The address of the contract created by the transaction, if any
    pub contract_address: Option<Address>,
}

/// A signing connection to a chain.
///
/// Every state-changing method resolves only once the transaction is
/// confirmed, and fails with [`ScriptError::TransactionReverted`] if it
/// reverted.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// The account transactions are sent from
    fn sender(&self) -> Address;

    /// Deploy the named contract artifact with the given ABI-encoded constructor arguments
    async fn deploy(&self, contract: &str, constructor_args: Bytes)
        -> Result<TxReceipt, ScriptError>;

    /// Send a transaction calling `to` with the given calldata
    async fn send(&self, to: Address, calldata: Bytes) -> Result<TxReceipt, ScriptError>;

    /// Execute a read-only call against the latest block
    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ScriptError>;

    /// Read a raw storage slot
    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ScriptError>;

    /// Whether the address holds contract code
    async fn has_code(&self, address: Address) -> Result<bool, ScriptError>;

    /// Deploy the named contract and return its address
    async fn deploy_contract(
        &self,
        contract: &str,
        constructor_args: Bytes,
    ) -> Result<Address, ScriptError> {
        let receipt = self.deploy(contract, constructor_args).await?;
        receipt.contract_address.ok_or_else(|| {
            ScriptError::ContractDeployment(format!("no contract address in receipt for {}", contract))
        })
    }
}

/// Control over the clock and block production of a development chain
#[async_trait]
pub trait ChainControl: Send + Sync {
    /// Move the clock forward; takes effect with the next block
    async fn increase_time(&self, seconds: u64) -> Result<(), ScriptError>;

    /// Produce a new block
    async fn mine_block(&self) -> Result<(), ScriptError>;

    /// The timestamp of the latest block
    async fn block_timestamp(&self) -> Result<u64, ScriptError>;

    /// The number of the latest block
    async fn block_number(&self) -> Result<u64, ScriptError>;

    /// Move the clock forward and mine a block so reads observe the new time
    async fn advance(&self, seconds: u64) -> Result<(), ScriptError> {
        self.increase_time(seconds).await?;
        self.mine_block().await
    }
}
