//! The catalog of deployable components and how each one is wired

use alloy::dyn_abi::DynSolValue;
use itertools::Itertools;

use crate::{
    constants::{PAYMENT_TOKEN_NAME, PAYMENT_TOKEN_SYMBOL},
    types::{Component, RegistryKey},
};

/// How a component's contract is instantiated
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Deployment {
    /// Logic contract behind a transparent proxy, configured through an initializer
    Proxied,
    /// Plain contract, configured through its constructor
    Direct,
}

/// An argument to an initializer or constructor
#[derive(Debug, Clone, PartialEq)]
pub enum InitArg {
    /// A fixed value
    Literal(DynSolValue),
    /// The address registered under the key, which must be set
    Registry(RegistryKey),
    /// The deploying account
    Deployer,
}

/// The function run against a fresh proxy, or the constructor of a direct deployment
#[derive(Debug, Clone, PartialEq)]
pub struct Initializer {
    /// The initializer's signature, e.g. `initialize(string,string)`;
    /// only the argument types matter for constructors
    pub signature: &'static str,
    /// The arguments, in order
    pub args: Vec<InitArg>,
}

impl Initializer {
    /// The argument-less `initialize()`
    pub fn empty() -> Self {
        Self {
            signature: "initialize()",
            args: Vec::new(),
        }
    }
}

/// Configuration run after a component is registered
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PostDeployAction {
    /// Register the component under an additional key
    Alias(RegistryKey),
    /// Copy the value of one registry key to another
    CopyKey {
        /// The key read
        from: RegistryKey,
        /// The key written
        to: RegistryKey,
    },
    /// `setSwapPathFromTokenToUSDC(token, [token, quote])`
    SetSwapPath {
        /// The token swapped from
        token: RegistryKey,
        /// The stablecoin swapped to
        quote: RegistryKey,
    },
    /// `updateSigner(deployer)`
    UpdateSigner,
    /// `setTreasury(deployer)`
    SetTreasury,
    /// `setPaymentToken(payment)`
    SetPaymentToken,
    /// `setVerifier(verifier)`
    SetVerifier,
    /// `setup()`
    Setup,
    /// Mint the pool's starting payment-token balance to the component
    FundPayment,
    /// `createLiquidity()`
    CreateLiquidity,
}

impl PostDeployAction {
    /// The registry keys the action reads
    pub fn reads(&self) -> Vec<RegistryKey> {
        match self {
            PostDeployAction::CopyKey { from, .. } => vec![*from],
            PostDeployAction::SetSwapPath { token, quote } => vec![*token, *quote],
            PostDeployAction::SetPaymentToken | PostDeployAction::FundPayment => {
                vec![RegistryKey::Payment]
            }
            PostDeployAction::SetVerifier => vec![RegistryKey::Verifier],
            _ => Vec::new(),
        }
    }

    /// The registry key the action writes, if any
    pub fn writes(&self) -> Option<RegistryKey> {
        match self {
            PostDeployAction::Alias(key) => Some(*key),
            PostDeployAction::CopyKey { to, .. } => Some(*to),
            _ => None,
        }
    }
}

/// Everything the sequencer needs to know to deploy and wire a component
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSpec {
    /// The component described
    pub component: Component,
    /// The default artifact name
    pub contract: &'static str,
    /// The key the component is registered under
    pub key: RegistryKey,
    /// Proxied or direct
    pub deployment: Deployment,
    /// The initializer (proxied) or constructor arguments (direct)
    pub initializer: Option<Initializer>,
    /// Whether `setAddressBook(registry)` is called on the component
    pub links_registry: bool,
    /// Keys the component resolves from the registry at runtime
    pub dependencies: Vec<RegistryKey>,
    /// Configuration run after registration, in order
    pub post_deploy: Vec<PostDeployAction>,
}

impl ComponentSpec {
    /// A proxied, registry-linked component with an empty initializer
    fn proxied(component: Component, contract: &'static str, key: RegistryKey) -> Self {
        Self {
            component,
            contract,
            key,
            deployment: Deployment::Proxied,
            initializer: Some(Initializer::empty()),
            links_registry: true,
            dependencies: Vec::new(),
            post_deploy: Vec::new(),
        }
    }

    /// Declare keys the component resolves at runtime
    fn depends_on(mut self, keys: &[RegistryKey]) -> Self {
        self.dependencies.extend_from_slice(keys);
        self
    }

    /// Append a post-deploy action
    fn then(mut self, action: PostDeployAction) -> Self {
        self.post_deploy.push(action);
        self
    }

    /// Every key that must be set before the component is deployed: declared
    /// dependencies, registry-sourced init args and keys read by post-deploy actions
    pub fn requires(&self) -> Vec<RegistryKey> {
        let init_keys = self
            .initializer
            .iter()
            .flat_map(|init| init.args.iter())
            .filter_map(|arg| match arg {
                InitArg::Registry(key) => Some(*key),
                _ => None,
            });
        let action_keys = self.post_deploy.iter().flat_map(|action| action.reads());

        self.dependencies
            .iter()
            .copied()
            .chain(init_keys)
            .chain(action_keys)
            .filter(|key| !self.provides().contains(key))
            .unique()
            .collect()
    }

    /// Every key the component writes into the registry
    pub fn provides(&self) -> Vec<RegistryKey> {
        std::iter::once(self.key)
            .chain(self.post_deploy.iter().filter_map(|action| action.writes()))
            .collect()
    }
}

impl Component {
    /// The key the component is registered under
    pub fn key(&self) -> RegistryKey {
        self.spec().key
    }

    /// How the component is deployed and wired
    pub fn spec(&self) -> ComponentSpec {
        use PostDeployAction::*;
        use RegistryKey as K;

        match self {
            Component::Token => ComponentSpec::proxied(*self, "TokenV1", K::Token),
            Component::Payment => ComponentSpec {
                initializer: Some(Initializer {
                    signature: "initialize(string,string)",
                    args: vec![
                        InitArg::Literal(DynSolValue::String(PAYMENT_TOKEN_NAME.to_string())),
                        InitArg::Literal(DynSolValue::String(PAYMENT_TOKEN_SYMBOL.to_string())),
                    ],
                }),
                ..ComponentSpec::proxied(*self, "FakeToken", K::Payment)
            },
            Component::Usdt => ComponentSpec::proxied(*self, "USDT", K::Usdt),
            Component::Wbnb => ComponentSpec::proxied(*self, "WBNB", K::Wbnb),
            Component::Pool => ComponentSpec::proxied(*self, "Pool", K::Pool)
                .depends_on(&[K::Payment, K::Router, K::Factory])
                .then(FundPayment)
                .then(CreateLiquidity),
            Component::Swap => ComponentSpec::proxied(*self, "Swap", K::Swap),
            Component::Vault => ComponentSpec::proxied(*self, "Vault", K::Vault),
            Component::Downline => ComponentSpec::proxied(*self, "Downline", K::Downline),
            Component::Claim => ComponentSpec::proxied(*self, "Claim", K::Claim),
            Component::Verifier => {
                ComponentSpec::proxied(*self, "Verifier", K::Verifier).then(UpdateSigner)
            }
            Component::Presale => ComponentSpec {
                deployment: Deployment::Direct,
                initializer: None,
                links_registry: false,
                ..ComponentSpec::proxied(*self, "Presale", K::Presale)
            }
            .then(SetTreasury)
            .then(SetPaymentToken)
            .then(SetVerifier),
            Component::AddLiquidity => {
                ComponentSpec::proxied(*self, "AddLiquidity", K::AddLiquidity)
            }
            Component::LpStaking => ComponentSpec::proxied(*self, "LPStaking", K::LpStaking)
                .depends_on(&[K::Safe, K::Payment])
                .then(Alias(K::LpRewardPool))
                .then(CopyKey {
                    from: K::Safe,
                    to: K::LpLockReceiver,
                }),
            Component::LpSwap => ComponentSpec::proxied(*self, "LPSwap", K::LpSwap)
                .then(SetSwapPath {
                    token: K::Wbnb,
                    quote: K::Payment,
                })
                .then(SetSwapPath {
                    token: K::Usdt,
                    quote: K::Payment,
                }),
            Component::AutoCompound => {
                ComponentSpec::proxied(*self, "AutoCompoundV2", K::AutoCompound)
            }
            Component::FurBetToken => ComponentSpec::proxied(*self, "FurBetToken", K::FurBetToken),
            Component::FurBetPresale => {
                ComponentSpec::proxied(*self, "FurBetPresale", K::FurBetPresale)
            }
            Component::FurBetStake => ComponentSpec::proxied(*self, "FurBetStake", K::FurBetStake),
            Component::FurBot => ComponentSpec::proxied(*self, "FurBot", K::FurBot).then(Setup),
            Component::Lms => ComponentSpec {
                links_registry: false,
                ..ComponentSpec::proxied(*self, "LMD", K::Lms)
            },
            Component::TaxHandler => ComponentSpec::proxied(*self, "TaxHandler", K::TaxHandler),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PostDeployAction::*, *};

    #[test]
    fn test_staking_wiring() {
        let spec = Component::LpStaking.spec();
        assert_eq!(spec.requires(), vec![RegistryKey::Safe, RegistryKey::Payment]);
        assert_eq!(
            spec.provides(),
            vec![
                RegistryKey::LpStaking,
                RegistryKey::LpRewardPool,
                RegistryKey::LpLockReceiver
            ]
        );
    }

    #[test]
    fn test_presale_requires_keys_read_by_actions() {
        let spec = Component::Presale.spec();
        assert_eq!(spec.deployment, Deployment::Direct);
        assert!(!spec.links_registry);
        assert_eq!(
            spec.requires(),
            vec![RegistryKey::Payment, RegistryKey::Verifier]
        );
    }

    #[test]
    fn test_pool_is_funded_before_liquidity() {
        let spec = Component::Pool.spec();
        assert_eq!(spec.post_deploy, vec![FundPayment, CreateLiquidity]);
        assert_eq!(
            spec.requires(),
            vec![RegistryKey::Payment, RegistryKey::Router, RegistryKey::Factory]
        );
    }

    #[test]
    fn test_swap_paths_require_tokens() {
        assert_eq!(
            Component::LpSwap.spec().requires(),
            vec![RegistryKey::Wbnb, RegistryKey::Payment, RegistryKey::Usdt]
        );
    }

    #[test]
    fn test_every_component_has_a_distinct_key() {
        let all = Component::ALL
            .iter()
            .chain(Component::MOCK_TOKENS)
            .map(|c| c.key())
            .collect::<Vec<_>>();
        assert_eq!(all.iter().unique().count(), all.len());
    }
}
