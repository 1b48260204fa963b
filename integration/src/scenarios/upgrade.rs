//! Scenarios for upgrading proxied components

use alloy_primitives::U256;
use eyre::Result;
use furio_scripts::{
    proxy::ProxyDeployer,
    solidity::{IAddressBookAware::addressBookCall, IVersioned::versionCall},
    types::{Component, DeploymentStep, RegistryKey},
};

use crate::{assert_eq_result, assert_true_result, integration_test, test_args::TestArgs};

/// Upgrading the token keeps its address and state while its behavior changes
async fn test_token_upgrade(args: TestArgs) -> Result<()> {
    let (sequencer, records) = args.deploy(&[Component::Token]).await?;
    let deployed = &records[0];
    let token = args.as_owner("Token", deployed.address);
    assert_eq_result!(token.call(versionCall {}).await?, U256::from(1))?;

    let step = DeploymentStep::upgrade(Component::Token, deployed.address).with_contract("TokenV2");
    let upgraded = sequencer.execute(&step).await?;

    assert_eq_result!(upgraded.address, deployed.address)?;
    assert_true_result!(
        upgraded.implementation != deployed.implementation,
        "implementation did not change"
    )?;
    assert_eq_result!(token.call(versionCall {}).await?, U256::from(2))?;

    let proxies = ProxyDeployer::new(args.owner.clone());
    assert_eq_result!(
        Some(proxies.implementation_of(deployed.address).await?),
        upgraded.implementation
    )?;

    let registry = sequencer.registry();
    assert_eq_result!(registry.get(RegistryKey::Token).await?, deployed.address)?;
    assert_eq_result!(token.call(addressBookCall {}).await?, registry.address())
}
integration_test!(test_token_upgrade);

/// Only the owner of the proxy admin can upgrade
async fn test_upgrade_requires_admin_owner(args: TestArgs) -> Result<()> {
    let (_, records) = args.deploy(&[Component::Token]).await?;
    let proxy = records[0].address;

    let res = ProxyDeployer::new(args.user.clone())
        .upgrade_proxy(proxy, "TokenV2")
        .await;
    assert_true_result!(res.is_err(), "non-owner upgraded the token")?;

    let token = args.as_user("Token", proxy);
    assert_eq_result!(token.call(versionCall {}).await?, U256::from(1))
}
integration_test!(test_upgrade_requires_admin_owner);
