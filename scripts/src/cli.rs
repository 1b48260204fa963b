//! Definitions of CLI arguments and commands for deploy scripts

use std::{path::PathBuf, sync::Arc, time::Duration};

use alloy_primitives::Address;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::Level;

use crate::{
    chain::rpc::RpcChainClient,
    commands::{deploy, deploy_registry, plan, registry_get, registry_set, upgrade},
    constants::{
        DEFAULT_ARTIFACTS_DIR, DEFAULT_CONFIRMATION_TIMEOUT_SECS, DEFAULT_DEPLOYMENTS_PATH,
        DEFAULT_LOCAL_RPC_URL, DEFAULT_POLL_INTERVAL_MS, DEFAULT_PROPAGATION_TIMEOUT_SECS,
        MAINNET_RPC_URL_ENV_VAR, TESTNET_RPC_URL_ENV_VAR,
    },
    errors::ScriptError,
    types::{Component, PollConfig, RegistryKey},
    utils::parse_address,
};

/// The command line of the deployment scripts
#[derive(Parser)]
#[command(about = "Deploy and wire the Furio contracts")]
pub struct Cli {
    /// Private key of the deployer
    #[arg(short, long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub priv_key: String,

    /// Network RPC URL, overriding the network's default
    #[arg(short, long, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// The network to deploy to when no RPC URL is given
    #[arg(short, long, value_enum, default_value_t = Network::Local)]
    pub network: Network,

    /// Directory holding the compiled contract artifacts
    #[arg(long, env = "ARTIFACTS_DIR", default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,

    /// Path to a `deployments.json` file recording deployed addresses
    #[arg(short, long, default_value = DEFAULT_DEPLOYMENTS_PATH)]
    pub deployments_path: PathBuf,

    /// Seconds to wait for a transaction to be mined
    #[arg(long, default_value_t = DEFAULT_CONFIRMATION_TIMEOUT_SECS)]
    pub confirmation_timeout_secs: u64,

    /// Milliseconds between polls for a write to become observable
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Seconds to wait for a write to become observable
    #[arg(long, default_value_t = DEFAULT_PROPAGATION_TIMEOUT_SECS)]
    pub propagation_timeout_secs: u64,

    /// Increase log verbosity (`-v` for debug, `-vv` for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// The operation to perform
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// The RPC URL to connect to
    pub fn rpc_url(&self) -> Result<String, ScriptError> {
        if let Some(url) = &self.rpc_url {
            return Ok(url.clone());
        }

        self.network.rpc_url()
    }

    /// How long to wait for writes to become observable
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_secs(self.propagation_timeout_secs),
        }
    }

    /// The maximum log level selected by `-v`
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

/// The networks the scripts know how to reach
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Network {
    /// The BSC testnet, at `TESTNET_RPC_URL`
    Testnet,
    /// BSC mainnet, at `MAINNET_RPC_URL`
    Mainnet,
    /// A local development node
    Local,
}

impl Network {
    /// The default RPC URL of the network
    pub fn rpc_url(&self) -> Result<String, ScriptError> {
        let var = match self {
            Network::Testnet => TESTNET_RPC_URL_ENV_VAR,
            Network::Mainnet => MAINNET_RPC_URL_ENV_VAR,
            Network::Local => return Ok(DEFAULT_LOCAL_RPC_URL.to_string()),
        };

        std::env::var(var).map_err(|_| {
            ScriptError::Config(format!("no --rpc-url given and {} is not set", var))
        })
    }
}

/// The operations the scripts perform
#[derive(Subcommand)]
pub enum Command {
    /// Deploy a new registry and write the external addresses into it
    DeployRegistry(DeployRegistryArgs),
    /// Deploy and wire components into the registry
    Deploy(DeployArgs),
    /// Upgrade the logic contract behind a component's proxy
    Upgrade(UpgradeArgs),
    /// Read or write registry keys
    #[command(subcommand)]
    Registry(RegistryCommand),
    /// Print the order in which components would be deployed
    Plan(PlanArgs),
}

impl Command {
    /// Run the command against the chain reached through `client`
    pub async fn run(
        self,
        client: Arc<RpcChainClient>,
        deployments_path: PathBuf,
        poll: PollConfig,
    ) -> Result<(), ScriptError> {
        match self {
            Command::DeployRegistry(args) => {
                deploy_registry(args, client, deployments_path, poll).await
            }
            Command::Deploy(args) => deploy(args, client, deployments_path, poll).await,
            Command::Upgrade(args) => upgrade(args, client, &deployments_path, poll).await,
            Command::Registry(RegistryCommand::Get(args)) => {
                registry_get(args, client, &deployments_path).await
            }
            Command::Registry(RegistryCommand::Set(args)) => {
                registry_set(args, client, &deployments_path, poll).await
            }
            Command::Plan(args) => plan(args, client, &deployments_path).await,
        }
    }
}

/// Addresses of contracts the scripts do not deploy, written into a new registry.
///
/// Empty values are treated as absent; malformed or zero addresses are rejected.
#[derive(Args, Clone, Default)]
pub struct ExternalAddresses {
    /// The treasury multisig
    #[arg(long, env = "SAFE")]
    pub safe: Option<String>,

    /// The DEX router
    #[arg(long, env = "ROUTER")]
    pub router: Option<String>,

    /// The DEX factory
    #[arg(long, env = "FACTORY")]
    pub factory: Option<String>,

    /// An existing payment token, instead of deploying the mock
    #[arg(long, env = "PAYMENT")]
    pub payment: Option<String>,

    /// An existing USDT, instead of deploying the mock
    #[arg(long, env = "USDT")]
    pub usdt: Option<String>,

    /// An existing WBNB, instead of deploying the mock
    #[arg(long, env = "WBNB")]
    pub wbnb: Option<String>,
}

impl ExternalAddresses {
    /// The supplied addresses, keyed by the registry key they are written under
    pub fn parse(&self) -> Result<Vec<(RegistryKey, Address)>, ScriptError> {
        let supplied = [
            (RegistryKey::Safe, &self.safe),
            (RegistryKey::Router, &self.router),
            (RegistryKey::Factory, &self.factory),
            (RegistryKey::Payment, &self.payment),
            (RegistryKey::Usdt, &self.usdt),
            (RegistryKey::Wbnb, &self.wbnb),
        ];

        supplied
            .into_iter()
            .filter_map(|(key, value)| {
                let value = value.as_deref().filter(|v| !v.trim().is_empty())?;
                Some(parse_address(key.as_str(), value).map(|address| (key, address)))
            })
            .collect()
    }
}

/// Deploy the `AddressBook` registry and write the external addresses into it.
///
/// The registry sits behind a [`TransparentUpgradeableProxy`](https://docs.openzeppelin.com/contracts/5.x/api/proxy#transparent_proxy)
/// unless `--direct` is given.
#[derive(Args)]
pub struct DeployRegistryArgs {
    /// Deploy the registry without a proxy
    #[arg(long)]
    pub direct: bool,

    /// The addresses of contracts the suite does not deploy
    #[command(flatten)]
    pub externals: ExternalAddresses,
}

/// Deploy components and wire them into the registry.
///
/// Components already recorded in the deployments file are attached to
/// rather than redeployed, unless `--fresh` is given.
#[derive(Args)]
pub struct DeployArgs {
    /// The components to deploy, in order
    #[arg(value_enum)]
    pub components: Vec<Component>,

    /// Deploy every component
    #[arg(long, conflicts_with = "components")]
    pub all: bool,

    /// Also deploy the mock payment, USDT and WBNB tokens
    #[arg(long)]
    pub mocks: bool,

    /// Reorder the components to satisfy their dependencies
    #[arg(long)]
    pub reorder: bool,

    /// Ignore addresses recorded in the deployments file
    #[arg(long)]
    pub fresh: bool,

    /// Address of the registry, instead of the one in the deployments file
    #[arg(long, env = "ADDRESS_BOOK")]
    pub address_book: Option<String>,
}

/// Upgrade the logic contract behind a component's proxy
#[derive(Args)]
pub struct UpgradeArgs {
    /// The component to upgrade
    #[arg(value_enum)]
    pub component: Component,

    /// Address of the proxy, instead of the one in the registry
    #[arg(long)]
    pub proxy: Option<String>,

    /// The artifact to deploy as the new logic contract
    #[arg(short, long)]
    pub contract: Option<String>,

    /// Address of the registry, instead of the one in the deployments file
    #[arg(long, env = "ADDRESS_BOOK")]
    pub address_book: Option<String>,
}

/// Read or write registry entries
#[derive(Subcommand)]
pub enum RegistryCommand {
    /// Print the address stored under a key
    Get(RegistryGetArgs),
    /// Store an address under a key
    Set(RegistrySetArgs),
}

/// Arguments of `registry get`
#[derive(Args)]
pub struct RegistryGetArgs {
    /// The registry key
    pub key: RegistryKey,

    /// Address of the registry, instead of the one in the deployments file
    #[arg(long, env = "ADDRESS_BOOK")]
    pub address_book: Option<String>,
}

/// Arguments of `registry set`
#[derive(Args)]
pub struct RegistrySetArgs {
    /// The registry key
    pub key: RegistryKey,

    /// The address to store
    pub value: String,

    /// Address of the registry, instead of the one in the deployments file
    #[arg(long, env = "ADDRESS_BOOK")]
    pub address_book: Option<String>,
}

/// Print the order in which components would be deployed, without sending anything
#[derive(Args)]
pub struct PlanArgs {
    /// The components to plan
    #[arg(value_enum)]
    pub components: Vec<Component>,

    /// Plan every component
    #[arg(long, conflicts_with = "components")]
    pub all: bool,

    /// Also plan the mock payment, USDT and WBNB tokens
    #[arg(long)]
    pub mocks: bool,

    /// Address of the registry, instead of the one in the deployments file
    #[arg(long, env = "ADDRESS_BOOK")]
    pub address_book: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["furio-scripts", "--priv-key", "0x01"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_local_network_default() {
        let cli = parse(&["plan", "--all"]);
        assert_eq!(cli.network, Network::Local);
        assert_eq!(cli.rpc_url().unwrap(), DEFAULT_LOCAL_RPC_URL);
        assert_eq!(cli.log_level(), Level::INFO);
    }

    #[test]
    fn test_explicit_rpc_url_wins() {
        let cli = parse(&["--rpc-url", "http://node:8545", "-n", "mainnet", "plan", "--all"]);
        assert_eq!(cli.rpc_url().unwrap(), "http://node:8545");
    }

    #[test]
    fn test_component_names() {
        let cli = parse(&["-vv", "deploy", "lp-staking", "furbot", "--reorder"]);
        assert_eq!(cli.log_level(), Level::TRACE);
        match cli.command {
            Command::Deploy(args) => {
                assert_eq!(args.components, vec![Component::LpStaking, Component::FurBot]);
                assert!(args.reorder);
                assert!(!args.all);
            }
            _ => panic!("expected deploy"),
        }
    }

    #[test]
    fn test_registry_key_argument() {
        let cli = parse(&["registry", "get", "lpStaking"]);
        match cli.command {
            Command::Registry(RegistryCommand::Get(args)) => {
                assert_eq!(args.key, RegistryKey::LpStaking)
            }
            _ => panic!("expected registry get"),
        }

        let argv = ["furio-scripts", "--priv-key", "0x01", "registry", "get", "nope"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_external_addresses() {
        let externals = ExternalAddresses {
            safe: Some("0x00000000000000000000000000000000000000aa".to_string()),
            router: Some("  ".to_string()),
            ..Default::default()
        };
        let parsed = externals.parse().unwrap();
        assert_eq!(
            parsed,
            vec![(RegistryKey::Safe, Address::with_last_byte(0xaa))]
        );

        let zero = ExternalAddresses {
            factory: Some(Address::ZERO.to_string()),
            ..Default::default()
        };
        assert!(matches!(zero.parse(), Err(ScriptError::Config(_))));
    }
}
