//! Definitions of Solidity functions called during deployment and in scenarios

use alloy_sol_types::sol;

sol! {
    /// The on-chain `string -> address` registry
    interface IAddressBook {
        function initialize() external;
        function set(string memory key, address value) external;
        function get(string memory key) external view returns (address);
        function owner() external view returns (address);
    }

    /// Implemented by every component that resolves its dependencies through the registry
    interface IAddressBookAware {
        function initialize() external;
        function setAddressBook(address addressBook_) external;
        function addressBook() external view returns (address);
        function owner() external view returns (address);
    }

    /// Entry points of the EIP-1967 transparent proxy reserved to its admin
    interface ITransparentUpgradeableProxy {
        function upgradeToAndCall(address newImplementation, bytes memory data) external payable;
    }

    /// The admin contract owning a transparent proxy
    interface IProxyAdmin {
        function upgradeAndCall(address proxy, address implementation, bytes memory data) external payable;
        function owner() external view returns (address);
    }

    /// Exposed by the protocol token so that upgrades can be observed
    interface IVersioned {
        function version() external view returns (uint256);
    }

    /// Mintable ERC20 used as the payment, USDT and WBNB tokens on development chains
    interface IERC20Mock {
        function initialize(string memory name_, string memory symbol_) external;
        function mint(uint256 amount) external;
        function mintTo(address account, uint256 amount) external;
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);
        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function decimals() external view returns (uint8);
    }

    /// LP staking with lock periods and compounding rewards
    interface ILPStaking {
        function stake(uint256 amount, uint256 durationIndex) external;
        function unstake() external;
        function claimRewards() external;
        function compound() external;
        function registerAddress() external;
        function registered(address account) external view returns (bool);
        function pendingReward(address account) external view returns (uint256);
        function totalStakingAmount() external view returns (uint256);
        function stakers(address account) external view returns (uint256 stakingAmount, uint256 lockEnd, uint256 rewards);
    }

    /// The payment-token liquidity pool seeded during deployment
    interface IPool {
        function createLiquidity() external;
        function liquidity() external view returns (uint256);
    }

    /// Buys and sells the protocol token against the payment token
    interface ISwap {
        function buy(address payment, uint256 amount) external;
        function sell(uint256 amount) external;
    }

    /// Swap paths from collected tokens to the payment token
    interface ILPSwap {
        function setSwapPathFromTokenToUSDC(address token, address[] memory path) external;
        function getSwapPathFromTokenToUSDC(address token) external view returns (address[] memory);
    }

    /// Holder of the signer accepted by the presale
    interface IVerifier {
        function updateSigner(address signer_) external;
        function signer() external view returns (address);
    }

    /// Owner-configured presale
    interface IPresale {
        function setTreasury(address treasury_) external;
        function setPaymentToken(address paymentToken_) external;
        function setVerifier(address verifier_) external;
        function treasury() external view returns (address);
        function paymentToken() external view returns (address);
        function verifier() external view returns (address);
        function owner() external view returns (address);
    }

    /// One-time configuration hook run after registration
    interface ISetup {
        function setup() external;
        function isSetup() external view returns (bool);
    }
}
