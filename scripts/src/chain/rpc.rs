//! A [`ChainClient`] backed by an alloy provider talking to a live node

use std::{str::FromStr, time::Duration};

use alloy::{
    network::{Ethereum, ReceiptResponse, TransactionBuilder},
    primitives::{Address, Bytes, TxKind, B256, U256},
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    rpc::types::{TransactionInput, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::{http::reqwest::Url, RpcError, TransportError},
};
use async_trait::async_trait;
use serde_json::Value;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::{artifacts::ArtifactStore, errors::ScriptError};

use super::{ChainClient, ChainControl, TxReceipt};

/// The delay between two receipt lookups
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A signing RPC connection
#[derive(Clone)]
pub struct RpcChainClient {
    /// The provider, with the signer attached as its wallet
    provider: DynProvider<Ethereum>,
    /// The RPC url, kept so that further signers can connect to the same node
    url: Url,
    /// The address of the signer
    sender: Address,
    /// Where contract bytecode is loaded from
    artifacts: ArtifactStore,
    /// How long to wait for a transaction receipt
    confirmation_timeout: Duration,
}

impl RpcChainClient {
    /// Connect to the node at `rpc_url`, signing with the given hex private key
    pub async fn connect(
        rpc_url: &str,
        priv_key: &str,
        artifacts: ArtifactStore,
        confirmation_timeout: Duration,
    ) -> Result<Self, ScriptError> {
        let url =
            Url::parse(rpc_url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
        let client = Self::with_url(url, priv_key, artifacts, confirmation_timeout)?;

        let chain_id = client
            .provider
            .get_chain_id()
            .await
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
        info!("connected to chain {} as {:#x}", chain_id, client.sender);

        Ok(client)
    }

    /// A client for another signer on the same node
    pub fn with_signer(&self, priv_key: &str) -> Result<Self, ScriptError> {
        Self::with_url(
            self.url.clone(),
            priv_key,
            self.artifacts.clone(),
            self.confirmation_timeout,
        )
    }

    /// Build the provider without touching the network
    fn with_url(
        url: Url,
        priv_key: &str,
        artifacts: ArtifactStore,
        confirmation_timeout: Duration,
    ) -> Result<Self, ScriptError> {
        let signer = PrivateKeySigner::from_str(priv_key)
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
        let sender = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(signer)
            .connect_http(url.clone());

        Ok(Self {
            provider: DynProvider::new(provider),
            url,
            sender,
            artifacts,
            confirmation_timeout,
        })
    }

    /// Submit a transaction and wait for its receipt
    async fn submit(&self, tx: TransactionRequest) -> Result<TxReceipt, ScriptError> {
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(describe_rejection)?;
        self.confirm(pending).await
    }

    /// Wait for a pending transaction to be included, bounded by the confirmation timeout
    async fn confirm(
        &self,
        pending: PendingTransactionBuilder<Ethereum>,
    ) -> Result<TxReceipt, ScriptError> {
        let tx_hash = *pending.tx_hash();
        debug!("waiting for {:#x}", tx_hash);

        // Look the receipt up directly rather than watching the pending transaction,
        // which stalls on some dev nodes
        let deadline = Instant::now() + self.confirmation_timeout;
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

            if let Some(receipt) = receipt {
                if !receipt.status() {
                    return Err(ScriptError::TransactionReverted(format!(
                        "transaction {:#x} reverted",
                        tx_hash
                    )));
                }

                return Ok(TxReceipt {
                    tx_hash,
                    block_number: receipt.block_number.unwrap_or_default(),
                    contract_address: receipt.contract_address,
                });
            }

            if Instant::now() >= deadline {
                return Err(ScriptError::ConfirmationTimeout(format!("{:#x}", tx_hash)));
            }
            sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

/// Map a rejected submission to a revert error, keeping the node's message
fn describe_rejection(err: TransportError) -> ScriptError {
    match err {
        RpcError::ErrorResp(payload) => {
            let data = payload.data.map(|d| d.get().to_string()).unwrap_or_default();
            ScriptError::TransactionReverted(format!("{} (data = {})", payload.message, data))
        }
        err => ScriptError::ContractInteraction(err.to_string()),
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn deploy(
        &self,
        contract: &str,
        constructor_args: Bytes,
    ) -> Result<TxReceipt, ScriptError> {
        let mut deploy_data = self.artifacts.bytecode(contract)?.to_vec();
        deploy_data.extend_from_slice(&constructor_args);

        let mut tx = TransactionRequest::default()
            .input(TransactionInput::both(Bytes::from(deploy_data)));
        tx.to = Some(TxKind::Create);

        let receipt = self.submit(tx).await.map_err(|e| match e {
            ScriptError::TransactionReverted(s) => {
                ScriptError::ContractDeployment(format!("{}: {}", contract, s))
            }
            e => e,
        })?;
        if receipt.contract_address.is_none() {
            return Err(ScriptError::ContractDeployment(format!(
                "no contract address in receipt for {}",
                contract
            )));
        }

        Ok(receipt)
    }

    async fn send(&self, to: Address, calldata: Bytes) -> Result<TxReceipt, ScriptError> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(calldata);
        self.submit(tx).await
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ScriptError> {
        let tx = TransactionRequest::default()
            .with_from(self.sender)
            .with_to(to)
            .with_input(calldata);
        self.provider
            .call(tx)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ScriptError> {
        let value = self
            .provider
            .get_storage_at(address, U256::from_be_bytes(slot.0))
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
        Ok(B256::from(value))
    }

    async fn has_code(&self, address: Address) -> Result<bool, ScriptError> {
        let code = self
            .provider
            .get_code_at(address)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
        Ok(!code.is_empty())
    }
}

#[async_trait]
impl ChainControl for RpcChainClient {
    async fn increase_time(&self, seconds: u64) -> Result<(), ScriptError> {
        self.provider
            .raw_request::<_, Value>("evm_increaseTime".into(), (seconds,))
            .await
            .map_err(|e| ScriptError::ChainControl(e.to_string()))?;
        Ok(())
    }

    async fn mine_block(&self) -> Result<(), ScriptError> {
        self.provider
            .raw_request::<_, Value>("evm_mine".into(), ())
            .await
            .map_err(|e| ScriptError::ChainControl(e.to_string()))?;
        Ok(())
    }

    async fn block_timestamp(&self) -> Result<u64, ScriptError> {
        let block: Value = self
            .provider
            .raw_request("eth_getBlockByNumber".into(), ("latest", false))
            .await
            .map_err(|e| ScriptError::ChainControl(e.to_string()))?;

        let timestamp = block["timestamp"]
            .as_str()
            .ok_or_else(|| ScriptError::ChainControl("latest block has no timestamp".into()))?;
        u64::from_str_radix(timestamp.trim_start_matches("0x"), 16)
            .map_err(|e| ScriptError::ChainControl(e.to_string()))
    }

    async fn block_number(&self) -> Result<u64, ScriptError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ScriptError::ChainControl(e.to_string()))
    }
}
