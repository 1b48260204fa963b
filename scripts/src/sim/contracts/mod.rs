//! Mock contracts executed by the simulated chain.
//!
//! The mocks implement the interfaces the deployment tooling touches, plus
//! enough behavior (ownership, balances, staking locks) for scenarios to
//! observe the wiring. Storage layout follows solidity conventions loosely:
//! state variables live at `keccak(name)` slots, mappings hash the key with
//! the base slot.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolInterface;

use crate::solidity::{IAddressBook, IAddressBookAware::IAddressBookAwareCalls};

use super::world::{done, named_slot, require, ret, CallContext, Revert, SimContract};

mod address_book;
mod components;
mod proxy;
mod staking;
mod token;

pub use address_book::AddressBook;
pub use components::{LpSwap, Pool, Presale, RegistryAwareComponent, Swap, Verifier};
pub use proxy::{ProxyAdmin, TransparentUpgradeableProxy};
pub use staking::LpStaking;
pub use token::{Erc20Mock, VersionedToken};

/// Slot of the `Ownable` owner
const OWNER_SLOT: &str = "Ownable.owner";
/// Slot of the `Initializable` flag
const INITIALIZED_SLOT: &str = "Initializable.initialized";
/// Slot of the registry pointer of registry-aware components
const ADDRESS_BOOK_SLOT: &str = "AddressBookAware.addressBook";

/// Every mock contract, under the artifact names the component catalog uses
pub fn default_contracts() -> Vec<(&'static str, Arc<dyn SimContract>)> {
    let plain = Arc::new(RegistryAwareComponent::default());
    let erc20 = Arc::new(Erc20Mock);

    let mut contracts: Vec<(&'static str, Arc<dyn SimContract>)> = vec![
        ("AddressBook", Arc::new(AddressBook)),
        ("TransparentUpgradeableProxy", Arc::new(TransparentUpgradeableProxy)),
        ("ProxyAdmin", Arc::new(ProxyAdmin)),
        ("Token", Arc::new(VersionedToken::new(0))),
        ("TokenV1", Arc::new(VersionedToken::new(1))),
        ("TokenV2", Arc::new(VersionedToken::new(2))),
        ("FakeToken", erc20.clone()),
        ("USDT", erc20.clone()),
        ("WBNB", erc20),
        ("LPStaking", Arc::new(LpStaking)),
        ("LPSwap", Arc::new(LpSwap)),
        ("Verifier", Arc::new(Verifier)),
        ("Presale", Arc::new(Presale)),
        ("FurBot", Arc::new(RegistryAwareComponent::with_setup())),
        ("Pool", Arc::new(Pool)),
        ("Swap", Arc::new(Swap)),
        ("SwapV2", Arc::new(Swap)),
    ];

    for name in [
        "Vault",
        "Downline",
        "Claim",
        "AddLiquidity",
        "AutoCompoundV2",
        "FurBetToken",
        "FurBetPresale",
        "FurBetStake",
        "LMD",
        "TaxHandler",
    ] {
        contracts.push((name, plain.clone()));
    }

    contracts
}

// -------------
// | Ownership |
// -------------

/// The account allowed to configure the contract
pub(crate) fn owner(ctx: &CallContext<'_>) -> Address {
    ctx.load_address(named_slot(OWNER_SLOT))
}

/// Set the caller as owner, at most once per account
pub(crate) fn initialize_owner(ctx: &mut CallContext<'_>) -> Result<(), Revert> {
    let initialized = named_slot(INITIALIZED_SLOT);
    require(
        ctx.load_u256(initialized).is_zero(),
        "Initializable: contract is already initialized",
    )?;

    ctx.store_u256(initialized, U256::from(1));
    let sender = ctx.sender();
    ctx.store_address(named_slot(OWNER_SLOT), sender);
    Ok(())
}

/// Revert unless the caller is the owner
pub(crate) fn only_owner(ctx: &CallContext<'_>) -> Result<(), Revert> {
    require(
        ctx.sender() == owner(ctx),
        "Ownable: caller is not the owner",
    )
}

// ---------------------
// | Registry pointers |
// ---------------------

/// The registry the contract resolves its dependencies through
pub(crate) fn address_book(ctx: &CallContext<'_>) -> Address {
    ctx.load_address(named_slot(ADDRESS_BOOK_SLOT))
}

/// Resolve a dependency through the linked registry, reverting if it is unset
pub(crate) fn resolve(ctx: &mut CallContext<'_>, key: &str) -> Result<Address, Revert> {
    let registry = address_book(ctx);
    require(!registry.is_zero(), "address book not set")?;

    let value = ctx.call_sol(
        registry,
        IAddressBook::getCall {
            key: key.to_string(),
        },
    )?;
    require(!value.is_zero(), &format!("{} not set in address book", key))?;
    Ok(value)
}

/// Handle the calls shared by every registry-aware component
pub(crate) fn registry_aware(ctx: &mut CallContext<'_>, calldata: &[u8]) -> Result<Bytes, Revert> {
    let call = IAddressBookAwareCalls::abi_decode(calldata).map_err(|_| Revert::unknown_selector())?;

    match call {
        IAddressBookAwareCalls::initialize(_) => {
            initialize_owner(ctx)?;
            done()
        }
        IAddressBookAwareCalls::setAddressBook(call) => {
            only_owner(ctx)?;
            require(!call.addressBook_.is_zero(), "address book is the zero address")?;
            ctx.store_address(named_slot(ADDRESS_BOOK_SLOT), call.addressBook_);
            done()
        }
        IAddressBookAwareCalls::addressBook(_) => ret(address_book(ctx)),
        IAddressBookAwareCalls::owner(_) => ret(owner(ctx)),
    }
}
