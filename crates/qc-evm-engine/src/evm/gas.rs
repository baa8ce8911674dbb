//! # EVM Gas Metering
//!
//! Gas costs for EVM opcodes per Berlin through Cancun.
//! Implements EIP-2929 (access lists), EIP-2200/EIP-3529 (SSTORE metering
//! and refund cap) and EIP-3860 (init code words).

use crate::domain::entities::EvmVersion;
use crate::domain::services::words;
use crate::domain::value_objects::{StorageValue, U256};

// =============================================================================
// BASE GAS COSTS
// =============================================================================

/// Gas costs for common operations.
pub mod costs {
    /// Base cost (e.g., for `ADDRESS`).
    pub const BASE: u64 = 2;
    /// Very low cost (e.g., for `ADD`).
    pub const VERY_LOW: u64 = 3;
    /// Low cost (e.g., for `MUL`).
    pub const LOW: u64 = 5;
    /// Mid cost.
    pub const MID: u64 = 8;
    /// High cost.
    pub const HIGH: u64 = 10;
    /// Jump destination cost.
    pub const JUMPDEST: u64 = 1;

    // Transaction costs
    /// Base transaction gas.
    pub const TX_BASE: u64 = 21_000;
    /// Gas per non-zero byte of calldata.
    pub const TX_DATA_NON_ZERO: u64 = 16;
    /// Gas per zero byte of calldata.
    pub const TX_DATA_ZERO: u64 = 4;
    /// Contract creation surcharge.
    pub const CREATE: u64 = 32_000;
    /// Gas per word of init code (EIP-3860).
    pub const INITCODE_WORD: u64 = 2;
    /// Gas per byte of deployed code.
    pub const CODE_DEPOSIT_BYTE: u64 = 200;

    // Memory costs
    /// Gas per word for memory copy.
    pub const COPY: u64 = 3;
    /// Linear coefficient of memory expansion.
    pub const MEMORY: u64 = 3;

    // Storage costs (EIP-2929)
    /// Cold storage read (first access).
    pub const COLD_SLOAD: u64 = 2100;
    /// Warm storage read (subsequent access).
    pub const WARM_SLOAD: u64 = 100;
    /// Cold account access.
    pub const COLD_ACCOUNT_ACCESS: u64 = 2600;
    /// Warm account access.
    pub const WARM_ACCOUNT_ACCESS: u64 = 100;

    // SSTORE costs (EIP-2200, EIP-3529)
    /// SSTORE changing a non-zero slot (5000 minus the cold read).
    pub const SSTORE_RESET: u64 = 2900;
    /// SSTORE setting a zero slot to non-zero.
    pub const SSTORE_SET: u64 = 20_000;
    /// Minimum gas left for SSTORE to run (EIP-2200).
    pub const SSTORE_SENTRY: u64 = 2300;
    /// SSTORE refund for clearing storage (London+).
    pub const SSTORE_CLEAR_REFUND: u64 = 4800;
    /// SSTORE refund for clearing storage (before London).
    pub const SSTORE_CLEAR_REFUND_BERLIN: u64 = 15_000;

    // Log costs
    /// LOG base cost.
    pub const LOG: u64 = 375;
    /// LOG cost per topic.
    pub const LOG_TOPIC: u64 = 375;
    /// LOG cost per byte of data.
    pub const LOG_DATA: u64 = 8;

    // Other
    /// KECCAK256 base cost.
    pub const KECCAK256: u64 = 30;
    /// KECCAK256 cost per word.
    pub const KECCAK256_WORD: u64 = 6;
    /// EXP base cost.
    pub const EXP: u64 = 10;
    /// EXP cost per byte of exponent.
    pub const EXP_BYTE: u64 = 50;
    /// BLOCKHASH cost.
    pub const BLOCKHASH: u64 = 20;
}

// =============================================================================
// DYNAMIC COSTS
// =============================================================================

/// Dynamic part of EXP (per exponent byte).
#[must_use]
pub fn exp_gas_cost(exponent: U256) -> u64 {
    let byte_size = u64::try_from(exponent.bits().div_ceil(8)).unwrap_or(32);
    costs::EXP_BYTE * byte_size
}

/// Dynamic part of KECCAK256 (per hashed word).
#[must_use]
pub fn keccak256_gas_cost(data_size: usize) -> u64 {
    costs::KECCAK256_WORD * words(data_size)
}

/// Dynamic part of LOGn (topics and data bytes).
#[must_use]
pub fn log_gas_cost(data_size: usize, topic_count: usize) -> u64 {
    costs::LOG_TOPIC * topic_count as u64 + costs::LOG_DATA * data_size as u64
}

/// Gas cost for copy operations (CALLDATACOPY, CODECOPY, etc.).
#[must_use]
pub fn copy_gas_cost(size: usize) -> u64 {
    costs::COPY * words(size)
}

/// Total cost of a memory of `word_size` words.
///
/// Cost = (`word_size^2` / 512) + (3 * `word_size`)
#[must_use]
pub fn memory_gas_cost(word_size: usize) -> u64 {
    let word_size = word_size as u64;
    (word_size * word_size / 512) + (costs::MEMORY * word_size)
}

/// Cost of an account touch under EIP-2929.
#[must_use]
pub const fn account_access_cost(is_cold: bool) -> u64 {
    if is_cold {
        costs::COLD_ACCOUNT_ACCESS
    } else {
        costs::WARM_ACCOUNT_ACCESS
    }
}

// =============================================================================
// SSTORE
// =============================================================================

/// Gas charged and refund delta for one SSTORE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SstoreCost {
    /// Gas to charge now.
    pub gas: u64,
    /// Change to the refund counter (may be negative).
    pub refund: i64,
}

/// SSTORE metering per EIP-2200 with EIP-2929 cold surcharge and the
/// EIP-3529 clear refund.
///
/// `original` is the slot value at the start of the transaction, `current`
/// the value before this write, `new` the value being written.
#[must_use]
pub fn sstore_cost(
    original: StorageValue,
    current: StorageValue,
    new: StorageValue,
    is_cold: bool,
    version: EvmVersion,
) -> SstoreCost {
    let clear_refund = to_refund(if version.is_enabled(EvmVersion::London) {
        costs::SSTORE_CLEAR_REFUND
    } else {
        costs::SSTORE_CLEAR_REFUND_BERLIN
    });
    let cold = if is_cold { costs::COLD_SLOAD } else { 0 };

    // No-op write
    if new == current {
        return SstoreCost {
            gas: cold + costs::WARM_SLOAD,
            refund: 0,
        };
    }

    // Clean slot: first write in this transaction
    if current == original {
        if original.is_zero() {
            return SstoreCost {
                gas: cold + costs::SSTORE_SET,
                refund: 0,
            };
        }
        return SstoreCost {
            gas: cold + costs::SSTORE_RESET,
            refund: if new.is_zero() { clear_refund } else { 0 },
        };
    }

    // Dirty slot
    let mut refund = 0i64;
    if !original.is_zero() {
        if current.is_zero() {
            refund -= clear_refund;
        } else if new.is_zero() {
            refund += clear_refund;
        }
    }
    if new == original {
        refund += if original.is_zero() {
            to_refund(costs::SSTORE_SET - costs::WARM_SLOAD)
        } else {
            to_refund(costs::SSTORE_RESET - costs::WARM_SLOAD)
        };
    }

    SstoreCost {
        gas: cold + costs::WARM_SLOAD,
        refund,
    }
}

fn to_refund(gas: u64) -> i64 {
    i64::try_from(gas).unwrap_or(i64::MAX)
}

// =============================================================================
// GAS REFUND
// =============================================================================

/// Refund actually granted: the counter capped at gas spent / 5 from London
/// (EIP-3529), gas spent / 2 before.
#[must_use]
pub fn capped_refund(gas_spent: u64, refund: i64, version: EvmVersion) -> u64 {
    let quotient = if version.is_enabled(EvmVersion::London) {
        5
    } else {
        2
    };
    let refund = u64::try_from(refund).unwrap_or(0);
    refund.min(gas_spent / quotient)
}

// =============================================================================
// STATIC OPCODE COSTS
// =============================================================================

/// Opcodes grouped by their static charge. Account and storage access,
/// memory growth and copy sizes are charged on top by the interpreter.
const STATIC_GROUPS: &[(u64, &[u8])] = {
    use crate::evm::opcodes::*;
    &[
        (costs::BASE, &[
            ADDRESS, ORIGIN, CALLER, CALLVALUE, CALLDATASIZE, CODESIZE, GASPRICE,
            RETURNDATASIZE, COINBASE, TIMESTAMP, NUMBER, PREVRANDAO, GASLIMIT, CHAINID,
            BASEFEE, POP, PC, MSIZE, GAS, PUSH0,
        ]),
        (costs::VERY_LOW, &[
            ADD, SUB, LT, GT, SLT, SGT, EQ, ISZERO, AND, OR, XOR, NOT, BYTE, SHL, SHR, SAR,
            CALLDATALOAD, CALLDATACOPY, CODECOPY, RETURNDATACOPY, MLOAD, MSTORE, MSTORE8,
            MCOPY,
        ]),
        (costs::LOW, &[MUL, DIV, SDIV, MOD, SMOD, SIGNEXTEND, SELFBALANCE]),
        (costs::MID, &[ADDMOD, MULMOD, JUMP]),
        (costs::HIGH, &[JUMPI]),
        (costs::EXP, &[EXP]),
        (costs::KECCAK256, &[KECCAK256]),
        (costs::BLOCKHASH, &[BLOCKHASH]),
        (costs::JUMPDEST, &[JUMPDEST]),
        (costs::WARM_SLOAD, &[TLOAD, TSTORE]),
    ]
};

/// Static gas charged before each opcode runs, indexed by opcode byte.
pub const OPCODE_GAS: [u64; 256] = {
    use crate::evm::opcodes::{LOG0, LOG4, PUSH1, SWAP16};

    let mut table = [0u64; 256];
    let mut group = 0;
    while group < STATIC_GROUPS.len() {
        let (cost, ops) = STATIC_GROUPS[group];
        let mut i = 0;
        while i < ops.len() {
            table[ops[i] as usize] = cost;
            i += 1;
        }
        group += 1;
    }

    // PUSHn, DUPn and SWAPn are contiguous.
    let mut op = PUSH1 as usize;
    while op <= SWAP16 as usize {
        table[op] = costs::VERY_LOW;
        op += 1;
    }

    op = LOG0 as usize;
    while op <= LOG4 as usize {
        table[op] = costs::LOG;
        op += 1;
    }

    table
};

// =============================================================================
// TESTS
// =============================================================================
