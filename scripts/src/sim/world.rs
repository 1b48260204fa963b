//! Execution state of the simulated chain

use std::{
    collections::HashMap,
    fmt::{self, Display},
    sync::Arc,
};

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};

use crate::chain::TxReceipt;

/// The timestamp of the simulated genesis block
const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Nested calls deeper than this revert
const MAX_CALL_DEPTH: usize = 64;

/// The reason a simulated call reverted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revert(pub String);

impl Revert {
    /// A revert with the given reason string
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    /// The revert of a call whose selector the contract does not implement
    pub fn unknown_selector() -> Self {
        Self::new("function selector was not recognized and there's no fallback function")
    }
}

impl Display for Revert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Revert with `reason` unless `condition` holds
pub fn require(condition: bool, reason: &str) -> Result<(), Revert> {
    if condition {
        Ok(())
    } else {
        Err(Revert::new(reason))
    }
}

/// ABI-encode a single return value
pub fn ret<T: SolValue>(value: T) -> Result<Bytes, Revert> {
    Ok(value.abi_encode().into())
}

/// The empty return of a function without outputs
pub fn done() -> Result<Bytes, Revert> {
    Ok(Bytes::new())
}

/// The code of a simulated contract.
///
/// Implementations are stateless; all state lives in the storage of the
/// account the code runs for, reached through the [`CallContext`].
pub trait SimContract: Send + Sync {
    /// Run once at creation with the ABI-encoded constructor arguments
    fn construct(&self, _ctx: &mut CallContext<'_>, _args: &[u8]) -> Result<(), Revert> {
        Ok(())
    }

    /// Handle a message call
    fn execute(&self, ctx: &mut CallContext<'_>, calldata: &[u8]) -> Result<Bytes, Revert>;
}

// -----------
// | Storage |
// -----------

/// The slot of a named state variable
pub fn named_slot(name: &str) -> B256 {
    keccak256(name.as_bytes())
}

/// The slot of `mapping[key]` for the mapping rooted at `base`
pub fn mapping_slot(base: B256, key: &[u8]) -> B256 {
    keccak256([key, base.as_slice()].concat())
}

/// The slot `offset` words after `base`, used for struct fields and array elements
pub fn offset_slot(base: B256, offset: u64) -> B256 {
    B256::from(U256::from_be_bytes(base.0).wrapping_add(U256::from(offset)))
}

/// Everything rolled back when a transaction reverts
#[derive(Clone)]
struct Snapshot {
    /// Code by account
    code: HashMap<Address, Arc<dyn SimContract>>,
    /// Storage by account
    storage: HashMap<Address, HashMap<B256, B256>>,
}

/// The state of the simulated chain
pub struct World {
    /// Contract code by artifact name, used for deployments
    artifacts: HashMap<String, Arc<dyn SimContract>>,
    /// Code by account
    code: HashMap<Address, Arc<dyn SimContract>>,
    /// Storage by account
    storage: HashMap<Address, HashMap<B256, B256>>,
    /// Creation nonces by account
    nonces: HashMap<Address, u64>,
    /// The number of the latest block
    block_number: u64,
    /// The timestamp of the latest block
    timestamp: u64,
    /// The earliest timestamp of the next block
    clock: u64,
    /// Transactions executed so far
    tx_count: u64,
    /// The depth of the current call stack
    depth: usize,
}

impl Default for World {
    fn default() -> Self {
        Self {
            artifacts: HashMap::new(),
            code: HashMap::new(),
            storage: HashMap::new(),
            nonces: HashMap::new(),
            block_number: 0,
            timestamp: GENESIS_TIMESTAMP,
            clock: GENESIS_TIMESTAMP,
            tx_count: 0,
            depth: 0,
        }
    }
}

impl World {
    /// Make `code` deployable under the artifact name `name`
    pub fn register_artifact(&mut self, name: &str, code: Arc<dyn SimContract>) {
        self.artifacts.insert(name.to_string(), code);
    }

    /// The number of the latest block
    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// The timestamp of the latest block
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Move the clock forward, taking effect with the next block
    pub fn increase_time(&mut self, seconds: u64) {
        self.clock = self.clock.max(self.timestamp) + seconds;
    }

    /// Produce a new block, at least one second after the previous one
    pub fn mine_block(&mut self) {
        self.block_number += 1;
        self.timestamp = self.clock.max(self.timestamp + 1);
        self.clock = self.timestamp;
    }

    /// Whether the account holds code
    pub fn has_code(&self, address: Address) -> bool {
        self.code.contains_key(&address)
    }

    /// Read a storage slot of an account
    pub fn storage_at(&self, address: Address, slot: B256) -> B256 {
        self.storage
            .get(&address)
            .and_then(|slots| slots.get(&slot))
            .copied()
            .unwrap_or_default()
    }

    /// Run `f` as a transaction in a new block, rolling state back if it reverts
    pub fn transact<T>(
        &mut self,
        f: impl FnOnce(&mut World) -> Result<T, Revert>,
    ) -> Result<T, Revert> {
        let snapshot = self.snapshot();
        self.mine_block();
        self.depth = 0;

        let res = f(self);
        if res.is_err() {
            self.restore(snapshot);
        }
        res
    }

    /// Run a read-only call, discarding any state it writes
    pub fn static_call(
        &mut self,
        to: Address,
        sender: Address,
        calldata: &[u8],
    ) -> Result<Bytes, Revert> {
        let snapshot = self.snapshot();
        self.depth = 0;
        let res = self.call(to, sender, calldata);
        self.restore(snapshot);
        res
    }

    /// A receipt for the transaction just executed by `sender`
    pub fn receipt(&mut self, sender: Address, contract_address: Option<Address>) -> TxReceipt {
        self.tx_count += 1;
        let preimage = (U256::from(self.tx_count), sender, U256::from(self.block_number));
        TxReceipt {
            tx_hash: keccak256(preimage.abi_encode_params()),
            block_number: self.block_number,
            contract_address,
        }
    }

    /// Deploy the named artifact from `deployer`, running its constructor
    pub fn create(
        &mut self,
        deployer: Address,
        contract: &str,
        args: &[u8],
    ) -> Result<Address, Revert> {
        let code = self
            .artifacts
            .get(contract)
            .cloned()
            .ok_or_else(|| Revert::new(format!("no artifact named {}", contract)))?;

        let nonce = self.nonces.entry(deployer).or_default();
        let address = deployer.create(*nonce);
        *nonce += 1;

        self.code.insert(address, code.clone());
        self.enter(address, deployer, |ctx| code.construct(ctx, args))?;
        Ok(address)
    }

    /// A message call from `sender` to `to`
    pub fn call(&mut self, to: Address, sender: Address, calldata: &[u8]) -> Result<Bytes, Revert> {
        self.delegate(to, to, sender, calldata)
    }

    /// Run the code of `code_address` against the storage of `this`
    pub fn delegate(
        &mut self,
        code_address: Address,
        this: Address,
        sender: Address,
        calldata: &[u8],
    ) -> Result<Bytes, Revert> {
        let code = self
            .code
            .get(&code_address)
            .cloned()
            .ok_or_else(|| Revert::new(format!("call to {:#x}, which has no code", code_address)))?;
        self.enter(this, sender, |ctx| code.execute(ctx, calldata))
    }

    /// Push a call frame for `this`, bounded by the maximum call depth
    fn enter<T>(
        &mut self,
        this: Address,
        sender: Address,
        f: impl FnOnce(&mut CallContext<'_>) -> Result<T, Revert>,
    ) -> Result<T, Revert> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(Revert::new("max call depth exceeded"));
        }

        self.depth += 1;
        let res = f(&mut CallContext {
            world: self,
            this,
            sender,
        });
        self.depth -= 1;
        res
    }

    /// Capture the state a reverting transaction rolls back to
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            code: self.code.clone(),
            storage: self.storage.clone(),
        }
    }

    /// Roll back to a captured state
    fn restore(&mut self, snapshot: Snapshot) {
        self.code = snapshot.code;
        self.storage = snapshot.storage;
    }
}

/// The environment of a single call frame
pub struct CallContext<'a> {
    /// The chain state
    world: &'a mut World,
    /// The account whose storage the code runs against
    this: Address,
    /// The immediate caller
    sender: Address,
}

impl CallContext<'_> {
    /// The account the code runs for
    pub fn this(&self) -> Address {
        self.this
    }

    /// The immediate caller
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// The timestamp of the current block
    pub fn timestamp(&self) -> u64 {
        self.world.timestamp
    }

    /// Whether the account holds code
    pub fn has_code(&self, address: Address) -> bool {
        self.world.has_code(address)
    }

    /// Read a slot of the executing contract
    pub fn sload(&self, slot: B256) -> B256 {
        self.world.storage_at(self.this, slot)
    }

    /// Write a slot of the executing contract
    pub fn sstore(&mut self, slot: B256, value: B256) {
        self.world
            .storage
            .entry(self.this)
            .or_default()
            .insert(slot, value);
    }

    /// Read an address from a slot
    pub fn load_address(&self, slot: B256) -> Address {
        Address::from_word(self.sload(slot))
    }

    /// Write an address to a slot
    pub fn store_address(&mut self, slot: B256, value: Address) {
        self.sstore(slot, value.into_word());
    }

    /// Read a word from a slot as an integer
    pub fn load_u256(&self, slot: B256) -> U256 {
        U256::from_be_bytes(self.sload(slot).0)
    }

    /// Write an integer to a slot
    pub fn store_u256(&mut self, slot: B256, value: U256) {
        self.sstore(slot, B256::from(value));
    }

    /// Read a string of at most 31 bytes stored inline, as solidity does for short strings
    pub fn load_short_string(&self, slot: B256) -> String {
        let word = self.sload(slot);
        let len = usize::from(word[31] / 2).min(31);
        String::from_utf8_lossy(&word[..len]).into_owned()
    }

    /// Store a string of at most 31 bytes inline
    pub fn store_short_string(&mut self, slot: B256, value: &str) -> Result<(), Revert> {
        let bytes = value.as_bytes();
        require(bytes.len() <= 31, "string too long")?;

        let mut word = B256::ZERO;
        word[..bytes.len()].copy_from_slice(bytes);
        word[31] = (bytes.len() * 2) as u8;
        self.sstore(slot, word);
        Ok(())
    }

    /// Call another contract, with this account as the sender
    pub fn call(&mut self, to: Address, calldata: &[u8]) -> Result<Bytes, Revert> {
        let this = self.this;
        self.world.call(to, this, calldata)
    }

    /// Call another contract through its ABI and decode the return value
    pub fn call_sol<C: SolCall>(&mut self, to: Address, call: C) -> Result<C::Return, Revert> {
        let data = self.call(to, &call.abi_encode())?;
        C::abi_decode_returns(&data)
            .map_err(|e| Revert::new(format!("bad return data from {:#x}: {}", to, e)))
    }

    /// Run the code at `code_address` against this account's storage, keeping the sender
    pub fn delegate(&mut self, code_address: Address, calldata: &[u8]) -> Result<Bytes, Revert> {
        let (this, sender) = (self.this, self.sender);
        self.world.delegate(code_address, this, sender, calldata)
    }

    /// Deploy the named artifact with this account as the deployer
    pub fn create(&mut self, contract: &str, args: &[u8]) -> Result<Address, Revert> {
        let this = self.this;
        self.world.create(this, contract, args)
    }
}
