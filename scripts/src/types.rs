//! Types shared across the deployment scripts

use std::{
    fmt::{self, Display},
    str::FromStr,
    time::Duration,
};

use alloy_primitives::Address;
use clap::ValueEnum;

use crate::{
    constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_PROPAGATION_TIMEOUT_SECS},
    errors::ScriptError,
};

/// Declares the closed set of registry keys along with their on-chain string form
macro_rules! registry_keys {
    ($($(#[$doc:meta])* $variant:ident => $name:literal,)*) => {
        /// A well-known key in the `AddressBook`
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum RegistryKey {
            $($(#[$doc])* $variant,)*
        }

        impl RegistryKey {
            /// Every key known to the deployment tooling
            pub const ALL: &'static [RegistryKey] = &[$(RegistryKey::$variant,)*];

            /// The string under which the key is stored on-chain
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(RegistryKey::$variant => $name,)*
                }
            }
        }

        impl FromStr for RegistryKey {
            type Err = ScriptError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(RegistryKey::$variant),)*
                    _ => Err(ScriptError::Config(format!("unknown registry key `{}`", s))),
                }
            }
        }
    };
}

registry_keys! {
    /// Multisig receiving protocol funds
    Safe => "safe",
    /// DEX factory
    Factory => "factory",
    /// DEX router
    Router => "router",
    /// Protocol token
    Token => "token",
    /// Stablecoin used for payments and rewards
    Payment => "payment",
    /// Payment-token liquidity pool
    Pool => "pool",
    /// Token swap
    Swap => "swap",
    /// Staking vault
    Vault => "vault",
    /// Referral downline NFT
    Downline => "downline",
    /// Presale claim contract
    Claim => "claim",
    /// Signature verifier used by the presale
    Verifier => "verifier",
    /// Presale
    Presale => "presale",
    /// Liquidity helper
    AddLiquidity => "addLiquidity",
    /// LP staking
    LpStaking => "lpStaking",
    /// Alias of the staking contract read by reward distributors
    LpRewardPool => "lpRewardPool",
    /// Receiver of locked LP positions
    LpLockReceiver => "lpLockReceiver",
    /// Swap paths used when buying and selling LP
    LpSwap => "lpSwap",
    /// Vault auto-compounder
    AutoCompound => "autocompound",
    /// FurBet token
    FurBetToken => "furbettoken",
    /// FurBet presale
    FurBetPresale => "furbetpresale",
    /// FurBet staking
    FurBetStake => "furbetstake",
    /// FurBot
    FurBot => "furbot",
    /// USDT token
    Usdt => "usdt",
    /// Wrapped BNB
    Wbnb => "wbnb",
    /// Receiver of transfer taxes
    TaxHandler => "taxHandler",
    /// Liquidity mining
    Lms => "lms",
}

impl Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A contract of the suite that the sequencer knows how to deploy
#[derive(ValueEnum, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    /// The protocol token, `TokenV1`
    Token,
    /// The mock payment token
    Payment,
    /// The mock USDT token
    Usdt,
    /// The mock wrapped BNB token
    Wbnb,
    /// The liquidity pool, funded and seeded after deployment
    Pool,
    /// `Swap`
    Swap,
    /// `Vault`
    Vault,
    /// `Downline`
    Downline,
    /// `Claim`
    Claim,
    /// The presale signature verifier
    Verifier,
    /// The presale, deployed without a proxy
    Presale,
    /// `AddLiquidity`
    AddLiquidity,
    /// LP staking, also registered as the LP reward pool
    LpStaking,
    /// `LPSwap`
    LpSwap,
    /// `AutoCompoundV2`
    #[value(name = "autocompound")]
    AutoCompound,
    /// `FurBetToken`
    #[value(name = "furbet-token")]
    FurBetToken,
    /// `FurBetPresale`
    #[value(name = "furbet-presale")]
    FurBetPresale,
    /// `FurBetStake`
    #[value(name = "furbet-stake")]
    FurBetStake,
    /// FurBot, set up once after registration
    #[value(name = "furbot")]
    FurBot,
    /// Liquidity mining, which does not resolve through the registry
    Lms,
    /// `TaxHandler`
    TaxHandler,
}

impl Component {
    /// The components deployed by `deploy --all`, in deployment order.
    ///
    /// The mock tokens are excluded, on live networks their keys point at
    /// existing token contracts.
    pub const ALL: &'static [Component] = &[
        Component::Token,
        Component::Claim,
        Component::Downline,
        Component::Pool,
        Component::Swap,
        Component::Vault,
        Component::Verifier,
        Component::Presale,
        Component::AddLiquidity,
        Component::LpStaking,
        Component::LpSwap,
        Component::AutoCompound,
        Component::FurBetToken,
        Component::FurBetPresale,
        Component::FurBetStake,
        Component::FurBot,
        Component::Lms,
        Component::TaxHandler,
    ];

    /// The mintable token mocks used on development chains
    pub const MOCK_TOKENS: &'static [Component] =
        &[Component::Payment, Component::Usdt, Component::Wbnb];
}

impl Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => write!(f, "{}", value.get_name()),
            None => write!(f, "{:?}", self),
        }
    }
}

/// How a deployment step obtains its contract
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Instantiation {
    /// Deploy a new contract
    Fresh,
    /// Reuse the contract already deployed at the given address
    Attach(Address),
    /// Swap the implementation behind the proxy at the given address
    Upgrade(Address),
}

impl Display for Instantiation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instantiation::Fresh => write!(f, "fresh"),
            Instantiation::Attach(address) => write!(f, "attach {:#x}", address),
            Instantiation::Upgrade(address) => write!(f, "upgrade {:#x}", address),
        }
    }
}

/// A single unit of work for the sequencer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentStep {
    /// The component to deploy
    pub component: Component,
    /// How the component's contract is obtained
    pub instantiation: Instantiation,
    /// Overrides the artifact name of the component, e.g. `TokenV2` for an upgrade
    pub contract: Option<String>,
}

impl DeploymentStep {
    /// A step deploying a new instance of the component
    pub fn fresh(component: Component) -> Self {
        Self {
            component,
            instantiation: Instantiation::Fresh,
            contract: None,
        }
    }

    /// A step adopting an already deployed instance of the component
    pub fn attach(component: Component, address: Address) -> Self {
        Self {
            component,
            instantiation: Instantiation::Attach(address),
            contract: None,
        }
    }

    /// A step upgrading the proxy of the component
    pub fn upgrade(component: Component, proxy: Address) -> Self {
        Self {
            component,
            instantiation: Instantiation::Upgrade(proxy),
            contract: None,
        }
    }

    /// Deploy the given artifact instead of the component's default one
    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = Some(contract.into());
        self
    }

    /// The artifact name the step deploys
    pub fn contract_name(&self) -> String {
        self.contract
            .clone()
            .unwrap_or_else(|| self.component.spec().contract.to_string())
    }
}

/// The outcome of a completed deployment step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRecord {
    /// The deployed component
    pub component: Component,
    /// The registry key the component is registered under
    pub key: RegistryKey,
    /// The component's address (the proxy address for proxied components)
    pub address: Address,
    /// The logic contract behind the proxy, if one was deployed by the step
    pub implementation: Option<Address>,
    /// How the component was obtained
    pub instantiation: Instantiation,
}

/// Bounds on polling for a write to become observable
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// The delay between two reads
    pub interval: Duration,
    /// The total time after which polling gives up
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: Duration::from_secs(DEFAULT_PROPAGATION_TIMEOUT_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_key_strings_round_trip() {
        for key in RegistryKey::ALL {
            assert_eq!(RegistryKey::from_str(key.as_str()), Ok(*key));
        }
    }

    #[test]
    fn test_unknown_registry_key_rejected() {
        assert!(matches!(
            RegistryKey::from_str("lpstaking"),
            Err(ScriptError::Config(_))
        ));
    }

    #[test]
    fn test_component_names() {
        assert_eq!(Component::LpStaking.to_string(), "lp-staking");
        assert_eq!(Component::FurBetStake.to_string(), "furbet-stake");
        assert_eq!(
            Component::from_str("add-liquidity", false),
            Ok(Component::AddLiquidity)
        );
    }

    #[test]
    fn test_contract_override() {
        let step = DeploymentStep::upgrade(Component::Token, Address::repeat_byte(1));
        assert_eq!(step.contract_name(), "TokenV1");
        assert_eq!(step.with_contract("TokenV2").contract_name(), "TokenV2");
    }
}
