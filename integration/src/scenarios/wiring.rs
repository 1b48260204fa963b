//! Scenarios for deploying components and wiring them into the registry

use alloy_primitives::Address;
use eyre::Result;
use furio_scripts::{
    errors::ScriptError,
    plan::DeploymentPlan,
    sequencer::SequencerConfig,
    solidity::{
        IAddressBookAware::addressBookCall,
        IERC20Mock::balanceOfCall,
        ILPSwap::getSwapPathFromTokenToUSDCCall,
        IPool::liquidityCall,
        IPresale::{paymentTokenCall, treasuryCall, verifierCall},
        ISetup::isSetupCall,
        IVerifier::signerCall,
    },
    types::{Component, DeploymentStep, Instantiation, RegistryKey},
};
use itertools::Itertools;

use crate::{assert_eq_result, assert_true_result, integration_test, test_args::TestArgs};

/// Deploying the staking component before the payment token fails without
/// sending anything
async fn test_missing_dependency(args: TestArgs) -> Result<()> {
    let sequencer = args.bootstrap().await?;
    let expected = ScriptError::MissingDependency {
        component: Component::LpStaking,
        key: RegistryKey::Payment,
    };

    let res = sequencer.run(&DeploymentPlan::fresh(&[Component::LpStaking])).await;
    assert_eq_result!(res, Err(expected.clone()))?;

    // The sequencer checks again when a single step is executed
    let res = sequencer
        .execute(&DeploymentStep::fresh(Component::LpStaking))
        .await;
    assert_eq_result!(res, Err(expected))?;

    let registry = sequencer.registry();
    assert_eq_result!(registry.lookup(RegistryKey::LpStaking).await?, None)
}
integration_test!(test_missing_dependency);

/// Registry, treasury, payment token and staking end up linked and registered
async fn test_end_to_end_wiring(args: TestArgs) -> Result<()> {
    let (sequencer, records) = args
        .deploy(&[Component::Payment, Component::LpStaking])
        .await?;
    let registry = sequencer.registry();
    let (payment, staking) = (records[0].address, records[1].address);

    assert_eq_result!(registry.get(RegistryKey::Payment).await?, payment)?;
    assert_eq_result!(registry.get(RegistryKey::LpStaking).await?, staking)?;
    assert_eq_result!(registry.get(RegistryKey::LpRewardPool).await?, staking)?;
    assert_eq_result!(registry.get(RegistryKey::LpLockReceiver).await?, args.safe)?;

    let linked = args
        .as_owner("LPStaking", staking)
        .call(addressBookCall {})
        .await?;
    assert_eq_result!(linked, registry.address())
}
integration_test!(test_end_to_end_wiring);

/// Every component deploys in a dependency-respecting order, even when
/// requested in reverse
async fn test_full_deployment(args: TestArgs) -> Result<()> {
    let sequencer = args.bootstrap().await?;
    let requested = Component::MOCK_TOKENS
        .iter()
        .chain(Component::ALL)
        .rev()
        .copied()
        .collect_vec();

    let plan = DeploymentPlan::fresh(&requested);
    let available = sequencer.available_keys(&plan).await?;
    assert_true_result!(
        plan.validate(&available).is_err(),
        "reversed plan should not validate"
    )?;

    let records = sequencer.run(&plan.ordered(&available)?).await?;
    assert_eq_result!(records.len(), requested.len())?;

    let registry = sequencer.registry();
    for record in &records {
        assert_eq_result!(registry.get(record.key).await?, record.address)?;
    }

    let deployer = args.owner.sender();
    let address_of = |component: Component| {
        records
            .iter()
            .find(|record| record.component == component)
            .map(|record| record.address)
            .unwrap_or_default()
    };
    let (payment, usdt, wbnb) = (
        address_of(Component::Payment),
        address_of(Component::Usdt),
        address_of(Component::Wbnb),
    );

    let verifier = args.as_owner("Verifier", address_of(Component::Verifier));
    assert_eq_result!(verifier.call(signerCall {}).await?, deployer)?;

    let presale = args.as_owner("Presale", address_of(Component::Presale));
    assert_eq_result!(presale.call(treasuryCall {}).await?, deployer)?;
    assert_eq_result!(presale.call(paymentTokenCall {}).await?, payment)?;
    assert_eq_result!(presale.call(verifierCall {}).await?, verifier.address())?;

    let swap = args.as_owner("LPSwap", address_of(Component::LpSwap));
    for token in [usdt, wbnb] {
        let path = swap
            .call(getSwapPathFromTokenToUSDCCall { token })
            .await?;
        assert_eq_result!(path, vec![token, payment])?;
    }

    let furbot = args.as_owner("FurBot", address_of(Component::FurBot));
    assert_true_result!(furbot.call(isSetupCall {}).await?, "furbot was not set up")?;

    let pool = address_of(Component::Pool);
    let funded = args
        .as_owner("FakeToken", payment)
        .call(balanceOfCall { account: pool })
        .await?;
    let liquidity = args.as_owner("Pool", pool).call(liquidityCall {}).await?;
    assert_true_result!(!funded.is_zero(), "pool holds no payment tokens")?;
    assert_eq_result!(liquidity, funded)
}
integration_test!(test_full_deployment);

/// Re-running a step against an existing deployment attaches to it
async fn test_resume_attaches(args: TestArgs) -> Result<()> {
    let (sequencer, records) = args.deploy(&[Component::Vault]).await?;
    let vault = records[0].address;

    let step = DeploymentStep::attach(Component::Vault, vault);
    let record = sequencer.execute(&step).await?;
    assert_eq_result!(record.address, vault)?;
    assert_eq_result!(record.instantiation, Instantiation::Attach(vault))?;
    assert_eq_result!(sequencer.registry().get(RegistryKey::Vault).await?, vault)?;

    let empty = Address::repeat_byte(0x77);
    let res = sequencer
        .execute(&DeploymentStep::attach(Component::Claim, empty))
        .await;
    assert_eq_result!(res, Err(ScriptError::NoCode(empty)))
}
integration_test!(test_resume_attaches);

/// Deploying again from the deployments file of a completed run attaches to
/// every component and sends no transaction
async fn test_resume_completed_deployment(args: TestArgs) -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = SequencerConfig {
        deployments_path: Some(dir.path().join("deployments.json")),
        ..args.config()
    };
    let sequencer = args.bootstrap_with(config).await?;
    let components = [
        Component::Payment,
        Component::Usdt,
        Component::Wbnb,
        Component::Pool,
        Component::Verifier,
        Component::Presale,
        Component::LpSwap,
        Component::FurBot,
    ];

    let plan = sequencer.resume_plan(&components).await?;
    assert_true_result!(
        plan.steps()
            .iter()
            .all(|step| step.instantiation == Instantiation::Fresh),
        "nothing is recorded yet"
    )?;
    let deployed = sequencer.run(&plan).await?;

    let block = args.control.block_number().await?;
    let plan = sequencer.resume_plan(&components).await?;
    let resumed = sequencer.run(&plan).await?;

    for (first, second) in deployed.iter().zip_eq(&resumed) {
        assert_eq_result!(second.address, first.address)?;
        assert_eq_result!(second.instantiation, Instantiation::Attach(first.address))?;
    }
    assert_eq_result!(args.control.block_number().await?, block)
}
integration_test!(test_resume_completed_deployment);
