//! Constants used in the deployment scripts

use alloy_primitives::{b256, B256};

/// The storage slot containing the proxy admin contract address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#admin-address
pub const PROXY_ADMIN_STORAGE_SLOT: B256 =
    b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

/// The storage slot containing the implementation address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#logic-contract-address
pub const PROXY_IMPLEMENTATION_STORAGE_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// The number of bytes stored in a single storage slot
pub const NUM_BYTES_STORAGE_SLOT: usize = 32;

/// The number of bytes in an Ethereum address
pub const NUM_BYTES_ADDRESS: usize = 20;

/// The artifact name of the OpenZeppelin v5 transparent proxy
pub const PROXY_CONTRACT_NAME: &str = "TransparentUpgradeableProxy";

/// The artifact name of the admin contract deployed by the transparent proxy
pub const PROXY_ADMIN_CONTRACT_NAME: &str = "ProxyAdmin";

/// The artifact name of the address registry
pub const ADDRESS_BOOK_CONTRACT_NAME: &str = "AddressBook";

/// The deployments key in the `deployments.json` file
pub const DEPLOYMENTS_KEY: &str = "deployments";

/// The address book key in the `deployments.json` file
pub const ADDRESS_BOOK_DEPLOYMENT_KEY: &str = "addressBook";

/// The default path of the deployments file
pub const DEFAULT_DEPLOYMENTS_PATH: &str = "deployments.json";

/// The default directory searched for compilation artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// The file extension of a compilation artifact
pub const ARTIFACT_EXTENSION: &str = "json";

/// The suffix of hardhat debug artifacts, which carry no bytecode
pub const DEBUG_ARTIFACT_SUFFIX: &str = ".dbg.json";

/// The default interval between propagation polls, in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// The default bound on waiting for a write to become observable, in seconds
pub const DEFAULT_PROPAGATION_TIMEOUT_SECS: u64 = 60;

/// The default bound on waiting for a transaction receipt, in seconds
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;

/// The RPC url used for the `local` network
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";

/// The environment variable holding the testnet RPC url
pub const TESTNET_RPC_URL_ENV_VAR: &str = "TESTNET_RPC_URL";

/// The environment variable holding the mainnet RPC url
pub const MAINNET_RPC_URL_ENV_VAR: &str = "MAINNET_RPC_URL";

/// The name given to the mock payment token
pub const PAYMENT_TOKEN_NAME: &str = "USD Coin";

/// The symbol given to the mock payment token
pub const PAYMENT_TOKEN_SYMBOL: &str = "USDC";

/// The amount of payment token minted to the pool before its liquidity is created
pub const POOL_PAYMENT_LIQUIDITY: u64 = 1_000_000;

/// Seconds in a day
pub const ONE_DAY_SECS: u64 = 86_400;

/// Seconds in the one month staking lock
pub const ONE_MONTH_SECS: u64 = 30 * ONE_DAY_SECS;
