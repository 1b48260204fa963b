//! Definitions of errors that can occur during the execution of the deployment scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use alloy_primitives::Address;
use itertools::Itertools;

use crate::types::{Component, RegistryKey};

/// Errors that can occur during the execution of the deployment scripts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// Error reading the `deployments.json` file
    ReadDeployments(String),
    /// Error writing the `deployments.json` file
    WriteDeployments(String),
    /// Error locating or parsing a compilation artifact
    ArtifactParsing(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Invalid or missing configuration value
    Config(String),
    /// Error constructing calldata for a contract method
    CalldataConstruction(String),
    /// Error deploying a contract
    ContractDeployment(String),
    /// Error calling a contract method
    ContractInteraction(String),
    /// A transaction was mined but reverted, or was rejected outright
    TransactionReverted(String),
    /// A transaction was not confirmed within the configured window
    ConfirmationTimeout(String),
    /// A registry key was read while it still held the unset sentinel
    UnsetRegistryKey(RegistryKey),
    /// A component was about to be deployed while one of its dependencies
    /// is neither registered nor produced by an earlier step
    MissingDependency {
        /// The component being deployed
        component: Component,
        /// The registry key it depends on
        key: RegistryKey,
    },
    /// A dependency is only produced by a later step of the plan
    OutOfOrder {
        /// The component that needs the key
        component: Component,
        /// The registry key it depends on
        key: RegistryKey,
        /// The later component that produces the key
        provider: Component,
    },
    /// The deployment plan contains a dependency cycle
    DependencyCycle(Vec<Component>),
    /// An address expected to hold a contract has no code
    NoCode(Address),
    /// A written value was not observed within the propagation window
    PropagationTimeout(String),
    /// An upgrade transaction succeeded but the implementation did not change
    UpgradeNotApplied(Address),
    /// Error manipulating the chain's clock or block production
    ChainControl(String),
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::ReadDeployments(s) => write!(f, "error reading deployments: {}", s),
            ScriptError::WriteDeployments(s) => write!(f, "error writing deployments: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::Config(s) => write!(f, "invalid configuration: {}", s),
            ScriptError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::TransactionReverted(s) => write!(f, "transaction reverted: {}", s),
            ScriptError::ConfirmationTimeout(s) => {
                write!(f, "timed out waiting for confirmation of {}", s)
            }
            ScriptError::UnsetRegistryKey(key) => write!(f, "registry key `{}` is unset", key),
            ScriptError::MissingDependency { component, key } => write!(
                f,
                "cannot deploy {}: dependency `{}` is not registered",
                component, key
            ),
            ScriptError::OutOfOrder {
                component,
                key,
                provider,
            } => write!(
                f,
                "cannot deploy {}: dependency `{}` is only produced later by {}",
                component, key, provider
            ),
            ScriptError::DependencyCycle(components) => write!(
                f,
                "dependency cycle between {}",
                components.iter().join(", ")
            ),
            ScriptError::NoCode(address) => write!(f, "no contract code at {:#x}", address),
            ScriptError::PropagationTimeout(s) => {
                write!(f, "timed out waiting for {} to propagate", s)
            }
            ScriptError::UpgradeNotApplied(proxy) => {
                write!(f, "implementation of proxy {:#x} did not change", proxy)
            }
            ScriptError::ChainControl(s) => write!(f, "error controlling chain: {}", s),
        }
    }
}

impl Error for ScriptError {}
