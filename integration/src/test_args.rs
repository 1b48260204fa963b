//! Defines arguments passed to each scenario

use std::{path::Path, sync::Arc, time::Duration};

use alloy_primitives::Address;
use eyre::Result;
use furio_scripts::{
    artifacts::ArtifactStore,
    chain::{rpc::RpcChainClient, ChainClient, ChainControl},
    constants::DEFAULT_CONFIRMATION_TIMEOUT_SECS,
    handle::ContractHandle,
    plan::DeploymentPlan,
    sequencer::{Sequencer, SequencerConfig},
    sim::{dev_account, SimulatedChain},
    types::{Component, DeploymentRecord, PollConfig, RegistryKey},
};

use crate::constants::{FACTORY_ADDRESS, ROUTER_ADDRESS, SAFE_ADDRESS};

/// The arguments passed to each scenario
#[derive(Clone)]
pub(crate) struct TestArgs {
    /// The deployer, owning everything the scenarios deploy
    pub owner: Arc<dyn ChainClient>,
    /// An account that owns nothing
    pub user: Arc<dyn ChainClient>,
    /// Control over the chain's clock
    pub control: Arc<dyn ChainControl>,
    /// The address written under `safe`
    pub safe: Address,
    /// How long to wait for writes to become observable
    pub poll: PollConfig,
}

impl TestArgs {
    /// Arguments for a fresh simulated chain
    pub fn simulated() -> Self {
        let chain = SimulatedChain::new();
        Self {
            owner: Arc::new(chain.clone()),
            user: Arc::new(chain.connect(dev_account(1))),
            control: Arc::new(chain),
            safe: SAFE_ADDRESS,
            poll: PollConfig {
                interval: Duration::from_millis(1),
                timeout: Duration::from_secs(1),
            },
        }
    }

    /// Arguments for a development node at `rpc_url`
    pub async fn rpc(
        rpc_url: &str,
        owner_pkey: &str,
        user_pkey: &str,
        artifacts: &Path,
    ) -> Result<Self> {
        let owner = RpcChainClient::connect(
            rpc_url,
            owner_pkey,
            ArtifactStore::new(artifacts),
            Duration::from_secs(DEFAULT_CONFIRMATION_TIMEOUT_SECS),
        )
        .await?;
        let user = owner.with_signer(user_pkey)?;
        let owner = Arc::new(owner);

        Ok(Self {
            owner: owner.clone(),
            user: Arc::new(user),
            control: owner,
            safe: SAFE_ADDRESS,
            poll: PollConfig::default(),
        })
    }

    /// The sequencer configuration for the scenarios, which keep no deployments file
    pub fn config(&self) -> SequencerConfig {
        SequencerConfig {
            poll: self.poll,
            deployments_path: None,
        }
    }

    /// The addresses of contracts the suite does not deploy
    pub fn externals(&self) -> [(RegistryKey, Address); 3] {
        [
            (RegistryKey::Safe, self.safe),
            (RegistryKey::Router, ROUTER_ADDRESS),
            (RegistryKey::Factory, FACTORY_ADDRESS),
        ]
    }

    /// Deploy a fresh registry holding the external addresses
    pub async fn bootstrap(&self) -> Result<Sequencer> {
        self.bootstrap_with(self.config()).await
    }

    /// Deploy a fresh registry holding the external addresses, sequencing
    /// with the given configuration
    pub async fn bootstrap_with(&self, config: SequencerConfig) -> Result<Sequencer> {
        let sequencer =
            Sequencer::bootstrap_registry(self.owner.clone(), true, &self.externals(), config)
                .await?;

        Ok(sequencer)
    }

    /// Bootstrap a registry and deploy the components into it, in order
    pub async fn deploy(
        &self,
        components: &[Component],
    ) -> Result<(Sequencer, Vec<DeploymentRecord>)> {
        let sequencer = self.bootstrap().await?;
        let records = sequencer.run(&DeploymentPlan::fresh(components)).await?;
        Ok((sequencer, records))
    }

    /// A contract reached as the owner
    pub fn as_owner(&self, name: &str, address: Address) -> ContractHandle {
        ContractHandle::attach(name, address, self.owner.clone())
    }

    /// A contract reached as the user
    pub fn as_user(&self, name: &str, address: Address) -> ContractHandle {
        ContractHandle::attach(name, address, self.user.clone())
    }
}
