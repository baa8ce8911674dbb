//! # Core Domain Entities
//!
//! Accounts, transactions, execution results and engine configuration.

use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue, U256};
use crate::errors::VmError;
use serde::{Deserialize, Serialize};

// =============================================================================
// ACCOUNT
// =============================================================================

/// Account record as seen by the engine (storage lives beside it).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountInfo {
    /// Account balance (wei).
    pub balance: U256,
    /// Account nonce.
    pub nonce: u64,
    /// Runtime bytecode (empty for an EOA).
    pub code: Bytes,
}

impl AccountInfo {
    /// Empty code hash (keccak256 of empty bytes).
    pub const EMPTY_CODE_HASH: Hash = Hash([
        0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c,
        0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
        0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b,
        0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
    ]);

    /// Creates an account with a balance and nothing else.
    #[must_use]
    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    /// Keccak-256 of the runtime code.
    #[must_use]
    pub fn code_hash(&self) -> Hash {
        if self.code.is_empty() {
            Self::EMPTY_CODE_HASH
        } else {
            keccak256(self.code.as_slice())
        }
    }

    /// Returns true if this account is empty per EIP-161.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce == 0 && self.code.is_empty()
    }
}

// =============================================================================
// BLOCK CONTEXT
// =============================================================================

/// Block-level environment visible to executing code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockContext {
    /// Block number.
    pub number: u64,
    /// Block timestamp (unix seconds).
    pub timestamp: u64,
    /// Coinbase address (receives priority fees).
    pub coinbase: Address,
    /// PREVRANDAO value (DIFFICULTY before the merge).
    pub prevrandao: U256,
    /// Block gas limit.
    pub gas_limit: u64,
    /// Base fee (EIP-1559).
    pub base_fee: U256,
    /// Chain ID (EIP-155).
    pub chain_id: u64,
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            number: 0,
            timestamp: 0,
            coinbase: Address::ZERO,
            prevrandao: U256::zero(),
            gas_limit: EngineConfig::BLOCK_GAS_LIMIT,
            base_fee: U256::zero(),
            chain_id: 1,
        }
    }
}

// =============================================================================
// TRANSACTION
// =============================================================================

/// Destination of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxKind {
    /// Message call to an existing address.
    Call(Address),
    /// Contract creation; the data is init code.
    Create,
}

impl TxKind {
    /// Returns true for contract creation.
    #[must_use]
    pub const fn is_create(&self) -> bool {
        matches!(self, Self::Create)
    }
}

/// A transaction as submitted to the engine. No signature: the caller is
/// trusted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Sender.
    pub caller: Address,
    /// Call target or creation.
    pub kind: TxKind,
    /// Value transferred (wei).
    pub value: U256,
    /// Calldata or init code.
    pub data: Bytes,
    /// Gas limit.
    pub gas_limit: u64,
    /// Gas price; `None` uses the engine default.
    pub gas_price: Option<U256>,
    /// Sender nonce the transaction claims.
    pub nonce: u64,
}

impl Transaction {
    /// Plain value transfer.
    #[must_use]
    pub fn transfer(caller: Address, to: Address, value: U256, gas_limit: u64, nonce: u64) -> Self {
        Self {
            caller,
            kind: TxKind::Call(to),
            value,
            data: Bytes::new(),
            gas_limit,
            gas_price: None,
            nonce,
        }
    }

    /// Contract creation with zero value.
    #[must_use]
    pub fn create(caller: Address, init_code: Bytes, gas_limit: u64, nonce: u64) -> Self {
        Self {
            caller,
            kind: TxKind::Create,
            value: U256::zero(),
            data: init_code,
            gas_limit,
            gas_price: None,
            nonce,
        }
    }
}

// =============================================================================
// EXECUTION CONTEXT
// =============================================================================

/// Execution context for the single frame of a transaction.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    /// Transaction sender.
    pub origin: Address,
    /// Immediate caller (equal to origin for a top-level frame).
    pub caller: Address,
    /// Account whose code runs and whose storage is addressed.
    pub address: Address,
    /// Value transferred (wei).
    pub value: U256,
    /// Calldata (empty for creation frames).
    pub data: Bytes,
    /// Gas available to the frame.
    pub gas_limit: u64,
    /// Effective gas price.
    pub gas_price: U256,
    /// Block context.
    pub block: BlockContext,
}

impl ExecutionContext {
    /// Creates a new execution context for a top-level transaction.
    #[must_use]
    pub fn new_transaction(
        origin: Address,
        to: Address,
        value: U256,
        data: Bytes,
        gas_limit: u64,
        gas_price: U256,
        block: BlockContext,
    ) -> Self {
        Self {
            origin,
            caller: origin,
            address: to,
            value,
            data,
            gas_limit,
            gas_price,
            block,
        }
    }
}

// =============================================================================
// LOG (EVENT)
// =============================================================================

/// Emitted log (event) from contract execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Contract address that emitted the log.
    pub address: Address,
    /// Indexed topics (up to 4).
    pub topics: Vec<Hash>,
    /// Non-indexed data.
    pub data: Bytes,
}

impl Log {
    /// Creates a new log.
    #[must_use]
    pub fn new(address: Address, topics: Vec<Hash>, data: Bytes) -> Self {
        Self {
            address,
            topics,
            data,
        }
    }
}

// =============================================================================
// STATE CHANGE
// =============================================================================

/// A single post-state mutation reported by the engine.
///
/// Applying every change of a result, in order, to the pre-state the
/// transaction ran against yields the post-state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChange {
    /// New balance and nonce of an account (creates it if missing).
    AccountUpdate {
        /// Account.
        address: Address,
        /// Balance after the transaction.
        balance: U256,
        /// Nonce after the transaction.
        nonce: u64,
    },
    /// Runtime code installed at an address.
    CodeDeploy {
        /// Contract address.
        address: Address,
        /// Runtime bytecode.
        code: Bytes,
    },
    /// Write to contract storage (zero clears the slot).
    StorageWrite {
        /// Contract address.
        address: Address,
        /// Slot.
        key: StorageKey,
        /// New value.
        value: StorageValue,
    },
}

// =============================================================================
// EXECUTION RESULT
// =============================================================================

/// How a transaction that ran ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// STOP/RETURN (or a plain transfer).
    Success {
        /// Return data; for a creation, the deployed runtime code.
        output: Bytes,
        /// Logs in emission order.
        logs: Vec<Log>,
        /// Address of the new contract for a creation.
        created_address: Option<Address>,
    },
    /// REVERT: effects rolled back, unused gas returned.
    Revert {
        /// Revert data.
        output: Bytes,
    },
    /// Exceptional halt: effects rolled back, all gas consumed.
    Halt {
        /// Why the frame halted.
        reason: VmError,
    },
}

impl ExecutionOutcome {
    /// Returns true for `Success`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Revert { .. } => "revert",
            Self::Halt { .. } => "halt",
        }
    }
}

/// Result of a transaction the engine accepted and ran.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionResult {
    /// Outcome of the frame.
    pub outcome: ExecutionOutcome,
    /// Gas charged to the sender (after refund).
    pub gas_used: u64,
    /// Gas refunded from storage clears (already subtracted from `gas_used`).
    pub gas_refunded: u64,
    /// Post-state mutations, sorted by address then slot.
    pub changes: Vec<StateChange>,
}

// =============================================================================
// ENGINE CONFIGURATION
// =============================================================================

/// EVM hard fork version.
///
/// Discriminants follow the conventional spec-id numbering used by EVM hosts.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum EvmVersion {
    /// Berlin hard fork (EIP-2929 access lists).
    Berlin = 11,
    /// London hard fork (EIP-1559 base fee, EIP-3529 refunds).
    London = 12,
    /// Paris hard fork (The Merge).
    Paris = 15,
    /// Shanghai hard fork (PUSH0, EIP-3860 init code metering).
    Shanghai = 16,
    /// Cancun hard fork (transient storage, MCOPY).
    #[default]
    Cancun = 17,
}

impl EvmVersion {
    /// Numeric spec id.
    #[must_use]
    pub const fn spec_id(self) -> u8 {
        self as u8
    }

    /// Looks up a version by spec id.
    #[must_use]
    pub const fn from_spec_id(id: u8) -> Option<Self> {
        match id {
            11 => Some(Self::Berlin),
            12 => Some(Self::London),
            15 => Some(Self::Paris),
            16 => Some(Self::Shanghai),
            17 => Some(Self::Cancun),
            _ => None,
        }
    }

    /// Returns true if this version includes `fork`.
    #[must_use]
    pub fn is_enabled(self, fork: Self) -> bool {
        self >= fork
    }
}

/// Engine configuration: fork rules, block environment, limits and
/// validation switches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// EVM version/fork.
    pub evm_version: EvmVersion,
    /// Block environment every transaction runs in.
    pub block: BlockContext,
    /// Maximum deployed code size in bytes (EIP-170: 24KB).
    pub max_code_size: usize,
    /// Maximum init code size in bytes (EIP-3860: 48KB).
    pub max_init_code_size: usize,
    /// Gas price used when a transaction does not carry one.
    pub default_gas_price: U256,
    /// Skip the sender nonce equality check.
    pub disable_nonce_check: bool,
    /// Top up the sender instead of rejecting for insufficient funds.
    pub disable_balance_check: bool,
    /// Skip the block gas limit check.
    pub disable_block_gas_limit: bool,
    /// Skip the base fee check and pay no base fee.
    pub disable_base_fee: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            evm_version: EvmVersion::default(),
            block: BlockContext::default(),
            max_code_size: 24_576,      // 24 KB (EIP-170)
            max_init_code_size: 49_152, // 48 KB (EIP-3860)
            default_gas_price: U256::zero(),
            disable_nonce_check: false,
            disable_balance_check: false,
            disable_block_gas_limit: false,
            disable_base_fee: false,
        }
    }
}

impl EngineConfig {
    /// Default block gas limit.
    pub const BLOCK_GAS_LIMIT: u64 = 30_000_000;

    /// Chain id the engine reports through CHAINID.
    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.block.chain_id
    }
}

// =============================================================================
// TESTS
// =============================================================================
