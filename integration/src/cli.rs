//! Definition of the CLI arguments for the scenario runner

use std::path::PathBuf;

use clap::Parser;
use furio_scripts::constants::DEFAULT_ARTIFACTS_DIR;
use tracing::Level;

use crate::constants::{DEFAULT_PKEY, DEFAULT_USER_PKEY};

/// Run the deployment scenarios.
///
/// Scenarios run on a fresh simulated chain each, unless an RPC URL is given,
/// in which case they run against that development node.
#[derive(Parser)]
pub(crate) struct Cli {
    /// Only run scenarios whose name contains this string
    #[arg(short, long)]
    pub(crate) test: Option<String>,

    /// Development node RPC URL; scenarios run on the simulated chain if unset
    #[arg(short, long, env = "RPC_URL")]
    pub(crate) rpc_url: Option<String>,

    /// Private key of the deploying account, defaults to the first Anvil account
    #[arg(short, long, default_value = DEFAULT_PKEY)]
    pub(crate) priv_key: String,

    /// Private key of the non-owner account, defaults to the second Anvil account
    #[arg(long, default_value = DEFAULT_USER_PKEY)]
    pub(crate) user_priv_key: String,

    /// Directory holding the compiled contract artifacts
    #[arg(long, env = "ARTIFACTS_DIR", default_value = DEFAULT_ARTIFACTS_DIR)]
    pub(crate) artifacts: PathBuf,

    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub(crate) verbose: u8,
}

impl Cli {
    /// The maximum log level selected by `-v`, quiet by default
    pub(crate) fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}
