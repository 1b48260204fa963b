//! The deployment sequencer: runs a validated plan one step at a time.
//!
//! Each step is strictly sequential:
//! 1. check that every key the component depends on is registered
//! 2. instantiate the component (fresh proxy or direct deployment, attach, or upgrade)
//! 3. link the registry into the component and wait until it reports it
//! 4. register the component's address and wait until the registry reports it
//! 5. run the component's post-deploy configuration
//!
//! Any failure aborts the remaining steps. Completed steps are recorded in the
//! deployments file so that a re-run attaches to them instead of redeploying.
//! Every write is skipped when the chain already holds its effect, so
//! re-running a completed plan sends no transactions.

use std::{collections::HashSet, fmt, path::PathBuf, sync::Arc};

use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt},
    json_abi::Function,
};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use tracing::{debug, info, warn};

use crate::{
    chain::ChainClient,
    components::{ComponentSpec, Deployment, InitArg, Initializer, PostDeployAction},
    constants::{ADDRESS_BOOK_DEPLOYMENT_KEY, POOL_PAYMENT_LIQUIDITY},
    errors::ScriptError,
    handle::ContractHandle,
    plan::DeploymentPlan,
    proxy::ProxyDeployer,
    registry::Registry,
    solidity::{
        IAddressBookAware::{addressBookCall, setAddressBookCall},
        IERC20Mock::{balanceOfCall, mintToCall},
        ILPSwap::{getSwapPathFromTokenToUSDCCall, setSwapPathFromTokenToUSDCCall},
        IPool::{createLiquidityCall, liquidityCall},
        IPresale::{
            paymentTokenCall, setPaymentTokenCall, setTreasuryCall, setVerifierCall,
            treasuryCall, verifierCall,
        },
        ISetup::{isSetupCall, setupCall},
        IVerifier::{signerCall, updateSignerCall},
    },
    types::{Component, DeploymentRecord, DeploymentStep, Instantiation, PollConfig, RegistryKey},
    utils::{poll_until, read_deployments, write_deployed_address},
};

/// Tunables of a sequencer run
#[derive(Debug, Clone, Default)]
pub struct SequencerConfig {
    /// Bounds on waiting for writes to become observable
    pub poll: PollConfig,
    /// Where completed steps are recorded, if anywhere
    pub deployments_path: Option<PathBuf>,
}

/// Deploys and wires components against one registry
#[derive(Clone)]
pub struct Sequencer {
    /// The client every transaction is sent through
    chain: Arc<dyn ChainClient>,
    /// The registry components are linked to and registered in
    registry: Registry,
    /// Tunables
    config: SequencerConfig,
}

impl fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequencer")
            .field("sender", &self.chain.sender())
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

impl Sequencer {
    /// A sequencer wiring components into `registry`
    pub fn new(chain: Arc<dyn ChainClient>, registry: Registry, config: SequencerConfig) -> Self {
        Self {
            chain,
            registry,
            config,
        }
    }

    /// Deploy a registry, record it, and write the operator-supplied external keys
    pub async fn bootstrap_registry(
        chain: Arc<dyn ChainClient>,
        proxied: bool,
        externals: &[(RegistryKey, Address)],
        config: SequencerConfig,
    ) -> Result<Self, ScriptError> {
        let registry = Registry::deploy(chain.clone(), proxied).await?;
        println!("AddressBook deployed at {:#x}", registry.address());
        if let Some(path) = &config.deployments_path {
            write_deployed_address(path, ADDRESS_BOOK_DEPLOYMENT_KEY, registry.address())?;
        }

        for (key, address) in externals {
            registry.register(*key, *address, &config.poll).await?;
            println!("{} set to {:#x}", key, address);
        }

        Ok(Self::new(chain, registry, config))
    }

    /// The registry components are wired into
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The keys among those the plan reads that are already set in the registry
    pub async fn available_keys(
        &self,
        plan: &DeploymentPlan,
    ) -> Result<HashSet<RegistryKey>, ScriptError> {
        let snapshot = self.registry.snapshot(plan.required_keys()).await?;
        Ok(snapshot.into_keys().collect())
    }

    /// A plan for the components that attaches to those the deployments file
    /// records at an address holding code, and deploys the rest fresh
    pub async fn resume_plan(
        &self,
        components: &[Component],
    ) -> Result<DeploymentPlan, ScriptError> {
        let Some(path) = &self.config.deployments_path else {
            return Ok(DeploymentPlan::fresh(components));
        };
        let recorded = read_deployments(path)?;

        let mut steps = Vec::with_capacity(components.len());
        for component in components {
            let step = match recorded.get(component.key().as_str()) {
                Some(address) if self.chain.has_code(*address).await? => {
                    info!("resuming: {} already at {:#x}", component, address);
                    DeploymentStep::attach(*component, *address)
                }
                Some(address) => {
                    warn!(
                        "{} recorded at {:#x} has no code, redeploying",
                        component, address
                    );
                    DeploymentStep::fresh(*component)
                }
                None => DeploymentStep::fresh(*component),
            };
            steps.push(step);
        }

        Ok(DeploymentPlan::new(steps))
    }

    /// Validate the plan against the registry, then execute it step by step
    pub async fn run(&self, plan: &DeploymentPlan) -> Result<Vec<DeploymentRecord>, ScriptError> {
        let available = self.available_keys(plan).await?;
        plan.validate(&available)?;

        let total = plan.steps().len();
        let mut records = Vec::with_capacity(total);
        for (i, step) in plan.steps().iter().enumerate() {
            info!(
                "step {}/{}: {} ({})",
                i + 1,
                total,
                step.component,
                step.instantiation
            );

            let record = self.execute(step).await?;
            println!(
                "{} registered as `{}` at {:#x}",
                record.component, record.key, record.address
            );
            if let Some(path) = &self.config.deployments_path {
                write_deployed_address(path, record.key.as_str(), record.address)?;
            }
            records.push(record);
        }

        Ok(records)
    }

    /// Execute a single step
    pub async fn execute(&self, step: &DeploymentStep) -> Result<DeploymentRecord, ScriptError> {
        let spec = step.component.spec();
        let contract = step.contract_name();

        if let Instantiation::Upgrade(proxy) = step.instantiation {
            let upgrade = ProxyDeployer::new(self.chain.clone())
                .upgrade_proxy(proxy, &contract)
                .await?;
            self.registry.register(spec.key, proxy, &self.config.poll).await?;

            return Ok(DeploymentRecord {
                component: step.component,
                key: spec.key,
                address: proxy,
                implementation: Some(upgrade.implementation),
                instantiation: step.instantiation,
            });
        }

        self.check_dependencies(&spec).await?;

        let (address, implementation) = match step.instantiation {
            Instantiation::Attach(address) => {
                if !self.chain.has_code(address).await? {
                    return Err(ScriptError::NoCode(address));
                }
                info!("attaching {} at {:#x}", step.component, address);
                (address, None)
            }
            _ => self.instantiate(&spec, &contract).await?,
        };

        let handle = ContractHandle::attach(contract, address, self.chain.clone());
        if spec.links_registry {
            self.link_registry(&handle).await?;
        }
        self.registry.register(spec.key, address, &self.config.poll).await?;

        for action in &spec.post_deploy {
            self.post_deploy(&handle, *action).await?;
        }

        Ok(DeploymentRecord {
            component: step.component,
            key: spec.key,
            address,
            implementation,
            instantiation: step.instantiation,
        })
    }

    /// Fail before any transaction if a key the component needs is unset
    async fn check_dependencies(&self, spec: &ComponentSpec) -> Result<(), ScriptError> {
        for key in spec.requires() {
            if self.registry.lookup(key).await?.is_none() {
                return Err(ScriptError::MissingDependency {
                    component: spec.component,
                    key,
                });
            }
        }

        Ok(())
    }

    /// Deploy a new instance of the component, returning its address and logic contract
    async fn instantiate(
        &self,
        spec: &ComponentSpec,
        contract: &str,
    ) -> Result<(Address, Option<Address>), ScriptError> {
        let args = match &spec.initializer {
            Some(init) => self.resolve_args(init).await?,
            None => Vec::new(),
        };

        match spec.deployment {
            Deployment::Proxied => {
                let init_calldata = match &spec.initializer {
                    Some(init) => encode_initializer(init, &args)?,
                    None => Bytes::new(),
                };
                let deployment = ProxyDeployer::new(self.chain.clone())
                    .deploy_proxy(contract, init_calldata)
                    .await?;
                Ok((deployment.proxy, Some(deployment.implementation)))
            }
            Deployment::Direct => {
                let constructor_args = DynSolValue::Tuple(args).abi_encode_params();
                let address = self
                    .chain
                    .deploy_contract(contract, constructor_args.into())
                    .await?;
                info!("{} deployed at {:#x}", contract, address);
                Ok((address, None))
            }
        }
    }

    /// Resolve registry-sourced and deployer arguments to concrete values
    async fn resolve_args(&self, init: &Initializer) -> Result<Vec<DynSolValue>, ScriptError> {
        let mut values = Vec::with_capacity(init.args.len());
        for arg in &init.args {
            let value = match arg {
                InitArg::Literal(value) => value.clone(),
                InitArg::Registry(key) => {
                    DynSolValue::Address(self.registry.get_required(*key).await?)
                }
                InitArg::Deployer => DynSolValue::Address(self.chain.sender()),
            };
            values.push(value);
        }

        Ok(values)
    }

    /// Point the component at the registry, skipping the write if it already is
    async fn link_registry(&self, handle: &ContractHandle) -> Result<(), ScriptError> {
        let registry = self.registry.address();
        if handle.call(addressBookCall {}).await.ok() == Some(registry) {
            debug!("{} already linked to the registry", handle.name());
            return Ok(());
        }

        handle
            .send(setAddressBookCall {
                addressBook_: registry,
            })
            .await?;

        let what = format!("{}.addressBook() = {:#x}", handle.name(), registry);
        poll_until(&what, &self.config.poll, || async move {
            Ok::<_, ScriptError>(handle.call(addressBookCall {}).await? == registry)
        })
        .await
    }

    /// Run one post-deploy action against the component, unless the chain
    /// already reflects it
    async fn post_deploy(
        &self,
        handle: &ContractHandle,
        action: PostDeployAction,
    ) -> Result<(), ScriptError> {
        if self.is_applied(handle, action).await? {
            debug!("{}: {:?} already applied", handle.name(), action);
            return Ok(());
        }

        debug!("{}: {:?}", handle.name(), action);
        let deployer = self.chain.sender();

        match action {
            PostDeployAction::Alias(key) => {
                self.registry
                    .register(key, handle.address(), &self.config.poll)
                    .await
            }
            PostDeployAction::CopyKey { from, to } => {
                let value = self.registry.get_required(from).await?;
                self.registry.register(to, value, &self.config.poll).await
            }
            PostDeployAction::SetSwapPath { token, quote } => {
                let token = self.registry.get_required(token).await?;
                let quote = self.registry.get_required(quote).await?;
                self.send(
                    handle,
                    setSwapPathFromTokenToUSDCCall {
                        token,
                        path: vec![token, quote],
                    },
                )
                .await
            }
            PostDeployAction::UpdateSigner => {
                self.send(handle, updateSignerCall { signer_: deployer }).await
            }
            PostDeployAction::SetTreasury => {
                self.send(handle, setTreasuryCall { treasury_: deployer }).await
            }
            PostDeployAction::SetPaymentToken => {
                let payment = self.registry.get_required(RegistryKey::Payment).await?;
                self.send(
                    handle,
                    setPaymentTokenCall {
                        paymentToken_: payment,
                    },
                )
                .await
            }
            PostDeployAction::SetVerifier => {
                let verifier = self.registry.get_required(RegistryKey::Verifier).await?;
                self.send(
                    handle,
                    setVerifierCall {
                        verifier_: verifier,
                    },
                )
                .await
            }
            PostDeployAction::Setup => self.send(handle, setupCall {}).await,
            PostDeployAction::FundPayment => {
                let payment = self.payment_token().await?;
                self.send(
                    &payment,
                    mintToCall {
                        account: handle.address(),
                        amount: U256::from(POOL_PAYMENT_LIQUIDITY),
                    },
                )
                .await
            }
            PostDeployAction::CreateLiquidity => self.send(handle, createLiquidityCall {}).await,
        }
    }

    /// Whether the component already reports the effect of the action.
    ///
    /// A getter the component does not implement counts as not applied.
    async fn is_applied(
        &self,
        handle: &ContractHandle,
        action: PostDeployAction,
    ) -> Result<bool, ScriptError> {
        let deployer = self.chain.sender();

        let applied = match action {
            // `register` already skips unchanged keys
            PostDeployAction::Alias(_) | PostDeployAction::CopyKey { .. } => false,
            PostDeployAction::SetSwapPath { token, quote } => {
                let token = self.registry.get_required(token).await?;
                let quote = self.registry.get_required(quote).await?;
                let path = handle.call(getSwapPathFromTokenToUSDCCall { token }).await;
                path.ok() == Some(vec![token, quote])
            }
            PostDeployAction::UpdateSigner => handle.call(signerCall {}).await.ok() == Some(deployer),
            PostDeployAction::SetTreasury => {
                handle.call(treasuryCall {}).await.ok() == Some(deployer)
            }
            PostDeployAction::SetPaymentToken => {
                let payment = self.registry.get_required(RegistryKey::Payment).await?;
                handle.call(paymentTokenCall {}).await.ok() == Some(payment)
            }
            PostDeployAction::SetVerifier => {
                let verifier = self.registry.get_required(RegistryKey::Verifier).await?;
                handle.call(verifierCall {}).await.ok() == Some(verifier)
            }
            PostDeployAction::Setup => handle.call(isSetupCall {}).await.unwrap_or(false),
            PostDeployAction::FundPayment => {
                if has_liquidity(handle).await {
                    true
                } else {
                    let payment = self.payment_token().await?;
                    let balance = payment
                        .call(balanceOfCall {
                            account: handle.address(),
                        })
                        .await?;
                    balance >= U256::from(POOL_PAYMENT_LIQUIDITY)
                }
            }
            PostDeployAction::CreateLiquidity => has_liquidity(handle).await,
        };

        Ok(applied)
    }

    /// The registered payment token
    async fn payment_token(&self) -> Result<ContractHandle, ScriptError> {
        let payment = self.registry.get_required(RegistryKey::Payment).await?;
        Ok(ContractHandle::attach(
            Component::Payment.spec().contract,
            payment,
            self.chain.clone(),
        ))
    }

    /// Send a configuration call and wait for its confirmation
    async fn send<C: SolCall>(&self, handle: &ContractHandle, call: C) -> Result<(), ScriptError> {
        let receipt = handle.send(call).await?;
        debug!(
            "{} confirmed in block {}",
            C::SIGNATURE,
            receipt.block_number
        );
        Ok(())
    }
}

/// Whether the pool reports created liquidity
async fn has_liquidity(handle: &ContractHandle) -> bool {
    handle
        .call(liquidityCall {})
        .await
        .is_ok_and(|liquidity| !liquidity.is_zero())
}

/// ABI-encode a call to the initializer with the resolved arguments
fn encode_initializer(init: &Initializer, args: &[DynSolValue]) -> Result<Bytes, ScriptError> {
    let function = Function::parse(init.signature)
        .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
    let calldata = function
        .abi_encode_input(args)
        .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;

    Ok(calldata.into())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy_sol_types::SolCall;

    use crate::{
        sim::{dev_account, SimulatedChain},
        solidity::IERC20Mock::{nameCall, symbolCall},
    };

    use super::*;

    fn config() -> SequencerConfig {
        SequencerConfig {
            poll: PollConfig {
                interval: Duration::from_millis(1),
                timeout: Duration::from_secs(1),
            },
            deployments_path: None,
        }
    }

    async fn bootstrap(chain: &SimulatedChain) -> Sequencer {
        let externals = [(RegistryKey::Safe, dev_account(9))];
        Sequencer::bootstrap_registry(Arc::new(chain.clone()), true, &externals, config())
            .await
            .unwrap()
    }

    #[test]
    fn test_encode_initializer() {
        let init = Component::Payment.spec().initializer.unwrap();
        let args = vec![
            DynSolValue::String("USD Coin".into()),
            DynSolValue::String("USDC".into()),
        ];
        let calldata = encode_initializer(&init, &args).unwrap();

        let expected = crate::solidity::IERC20Mock::initializeCall {
            name_: "USD Coin".into(),
            symbol_: "USDC".into(),
        }
        .abi_encode();
        assert_eq!(calldata.to_vec(), expected);
    }

    #[tokio::test]
    async fn test_payment_initializer_literals() {
        let chain = SimulatedChain::new();
        let sequencer = bootstrap(&chain).await;

        let record = sequencer
            .execute(&DeploymentStep::fresh(Component::Payment))
            .await
            .unwrap();
        let token = ContractHandle::attach("FakeToken", record.address, Arc::new(chain));
        assert_eq!(token.call(nameCall {}).await.unwrap(), "USD Coin");
        assert_eq!(token.call(symbolCall {}).await.unwrap(), "USDC");
        assert_eq!(
            sequencer.registry().get(RegistryKey::Payment).await.unwrap(),
            record.address
        );
    }

    #[tokio::test]
    async fn test_missing_dependency_sends_nothing() {
        let chain = SimulatedChain::new();
        let sequencer = bootstrap(&chain).await;
        let block = chain.block_number();

        let res = sequencer
            .execute(&DeploymentStep::fresh(Component::LpStaking))
            .await;
        assert_eq!(
            res,
            Err(ScriptError::MissingDependency {
                component: Component::LpStaking,
                key: RegistryKey::Payment,
            })
        );
        assert_eq!(chain.block_number(), block);
    }

    #[tokio::test]
    async fn test_attach_requires_code() {
        let chain = SimulatedChain::new();
        let sequencer = bootstrap(&chain).await;

        let res = sequencer
            .execute(&DeploymentStep::attach(Component::Vault, dev_account(4)))
            .await;
        assert_eq!(res, Err(ScriptError::NoCode(dev_account(4))));
    }

    #[tokio::test]
    async fn test_run_records_deployments() {
        let chain = SimulatedChain::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployments.json");

        let mut sequencer = bootstrap(&chain).await;
        sequencer.config.deployments_path = Some(path.clone());

        let plan = DeploymentPlan::fresh(&[Component::Payment, Component::LpStaking]);
        let records = sequencer.run(&plan).await.unwrap();

        let recorded = crate::utils::read_deployments(&path).unwrap();
        assert_eq!(recorded["payment"], records[0].address);
        assert_eq!(recorded["lpStaking"], records[1].address);
        assert_eq!(
            sequencer.registry().get(RegistryKey::LpLockReceiver).await.unwrap(),
            dev_account(9)
        );
    }

    #[tokio::test]
    async fn test_pool_liquidity_is_created() {
        let chain = SimulatedChain::new();
        let sequencer = bootstrap(&chain).await;
        let externals = [
            (RegistryKey::Router, dev_account(7)),
            (RegistryKey::Factory, dev_account(8)),
        ];
        for (key, value) in externals {
            sequencer
                .registry()
                .register(key, value, &sequencer.config.poll)
                .await
                .unwrap();
        }

        let plan = DeploymentPlan::fresh(&[Component::Payment, Component::Pool]);
        let records = sequencer.run(&plan).await.unwrap();

        let pool = ContractHandle::attach("Pool", records[1].address, Arc::new(chain.clone()));
        let payment = ContractHandle::attach("FakeToken", records[0].address, Arc::new(chain));
        let expected = U256::from(POOL_PAYMENT_LIQUIDITY);
        assert_eq!(pool.call(liquidityCall {}).await.unwrap(), expected);
        assert_eq!(
            payment
                .call(balanceOfCall {
                    account: records[1].address
                })
                .await
                .unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn test_attached_component_is_not_set_up_twice() {
        let chain = SimulatedChain::new();
        let sequencer = bootstrap(&chain).await;

        let record = sequencer
            .execute(&DeploymentStep::fresh(Component::FurBot))
            .await
            .unwrap();
        let furbot = ContractHandle::attach("FurBot", record.address, Arc::new(chain.clone()));
        assert!(furbot.call(isSetupCall {}).await.unwrap());

        let block = chain.block_number();
        let plan = DeploymentPlan::new(vec![DeploymentStep::attach(
            Component::FurBot,
            record.address,
        )]);
        let records = sequencer.run(&plan).await.unwrap();

        assert_eq!(records[0].address, record.address);
        assert_eq!(chain.block_number(), block);
    }

    #[tokio::test]
    async fn test_interrupted_configuration_is_completed_on_attach() {
        let chain = SimulatedChain::new();
        let sequencer = bootstrap(&chain).await;
        sequencer
            .run(&DeploymentPlan::fresh(&[
                Component::Payment,
                Component::Verifier,
            ]))
            .await
            .unwrap();

        // A presale deployed by a run that stopped before configuring it
        let presale = chain
            .deploy_contract("Presale", Bytes::new())
            .await
            .unwrap();
        let handle = ContractHandle::attach("Presale", presale, Arc::new(chain.clone()));
        handle
            .send(setTreasuryCall {
                treasury_: chain.sender(),
            })
            .await
            .unwrap();

        let block = chain.block_number();
        sequencer
            .execute(&DeploymentStep::attach(Component::Presale, presale))
            .await
            .unwrap();

        // registry write, payment token and verifier; the treasury was already set
        assert_eq!(chain.block_number(), block + 3);
        let verifier = sequencer
            .registry()
            .get(RegistryKey::Verifier)
            .await
            .unwrap();
        assert_eq!(handle.call(verifierCall {}).await.unwrap(), verifier);
    }

    #[tokio::test]
    async fn test_resume_attaches_recorded_components() {
        let chain = SimulatedChain::new();
        let vault = chain.deploy_contract("Vault", Bytes::new()).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployments.json");
        write_deployed_address(&path, "vault", vault).unwrap();
        write_deployed_address(&path, "claim", Address::with_last_byte(7)).unwrap();

        let mut sequencer = bootstrap(&chain).await;
        sequencer.config.deployments_path = Some(path);
        let plan = sequencer
            .resume_plan(&[Component::Vault, Component::Claim, Component::Swap])
            .await
            .unwrap();

        let steps = plan.steps();
        assert_eq!(steps[0].instantiation, Instantiation::Attach(vault));
        assert_eq!(steps[1].instantiation, Instantiation::Fresh);
        assert_eq!(steps[2].instantiation, Instantiation::Fresh);
    }
}
