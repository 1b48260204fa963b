//! Scenarios for the `AddressBook` registry

use alloy_primitives::Address;
use eyre::Result;
use furio_scripts::{errors::ScriptError, registry::Registry, types::RegistryKey};

use crate::{
    assert_eq_result, assert_true_result, integration_test, test_args::TestArgs,
    util::expect_revert,
};

/// A value written under a key is read back unchanged, with and without a proxy
async fn test_registry_round_trip(args: TestArgs) -> Result<()> {
    for proxied in [true, false] {
        let registry = Registry::deploy(args.owner.clone(), proxied).await?;
        assert_eq_result!(registry.owner().await?, args.owner.sender())?;

        registry
            .register(RegistryKey::Safe, args.safe, &args.poll)
            .await?;
        assert_eq_result!(registry.get(RegistryKey::Safe).await?, args.safe)?;
    }

    Ok(())
}
integration_test!(test_registry_round_trip);

/// The last write to a key wins
async fn test_registry_last_write_wins(args: TestArgs) -> Result<()> {
    let registry = Registry::deploy(args.owner.clone(), true).await?;
    let (first, second) = (Address::repeat_byte(0x11), Address::repeat_byte(0x22));

    registry.register(RegistryKey::Payment, first, &args.poll).await?;
    registry.register(RegistryKey::Payment, second, &args.poll).await?;
    assert_eq_result!(registry.get(RegistryKey::Payment).await?, second)?;

    // Rewriting the current value is skipped
    let sent = registry.set_if_changed(RegistryKey::Payment, second).await?;
    assert_true_result!(!sent, "unchanged value was rewritten")
}
integration_test!(test_registry_last_write_wins);

/// A key that was never written reads as the zero address
async fn test_registry_unset_key(args: TestArgs) -> Result<()> {
    let registry = Registry::deploy(args.owner.clone(), true).await?;

    assert_eq_result!(registry.get(RegistryKey::Lms).await?, Address::ZERO)?;
    assert_eq_result!(registry.lookup(RegistryKey::Lms).await?, None)?;
    assert_eq_result!(
        registry.get_required(RegistryKey::Lms).await,
        Err(ScriptError::UnsetRegistryKey(RegistryKey::Lms))
    )
}
integration_test!(test_registry_unset_key);

/// Only the owner writes the registry
async fn test_registry_owner_only(args: TestArgs) -> Result<()> {
    let registry = Registry::deploy(args.owner.clone(), true).await?;
    registry.register(RegistryKey::Safe, args.safe, &args.poll).await?;

    let res = registry
        .connect(args.user.clone())
        .set(RegistryKey::Safe, args.user.sender())
        .await;
    expect_revert(res, "caller is not the owner")?;

    assert_eq_result!(registry.get(RegistryKey::Safe).await?, args.safe)
}
integration_test!(test_registry_owner_only);
