//! # QC EVM Engine - Single-Frame Execution Engine
//!
//! Ethereum-compatible transaction execution over an in-memory world state.
//! Hosts keep a [`WorldState`](adapters::WorldState), run transactions
//! through an [`ExecutionEngine`](ports::ExecutionEngine) and decide whether
//! to apply the reported changes.
//!
//! ## Execution Model
//!
//! - A transaction runs exactly one frame: the target's code for a call, the
//!   init code for a creation.
//! - The engine never writes to the host's state. Effects accumulate in a
//!   journaled `PendingState` and come back as ordered `StateChange`s.
//! - Reverts and halts are results. Only invalid transactions are errors.
//!
//! ## Bounds
//!
//! | Bound | Default | Where |
//! |-------|---------|-------|
//! | Deployed code | 24 576 bytes | `EngineConfig::max_code_size` |
//! | Init code | 49 152 bytes (Shanghai+) | `EngineConfig::max_init_code_size` |
//! | Stack depth | 1024 words | `evm::stack::MAX_STACK_SIZE` |
//! | Frame memory | 16 MiB | `evm::memory::MAX_MEMORY_SIZE` |
//! | Transaction gas | block gas limit, 30M | `BlockContext::gas_limit` |
//!
//! ## Layout
//!
//! - `processor.rs`: admission checks, fee debit and reimbursement, code
//!   deposit.
//! - `evm/`: the interpreter with its stack, memory, gas schedule, opcode
//!   table and transient storage.
//! - `adapters/`: world state, the journaled pending overlay, warm/cold
//!   access tracking.
//! - `domain/`: value objects, entities and pure helpers (contract
//!   addresses, intrinsic gas).
//!
//! ## Usage Example
//!
//! ```
//! use qc_evm_engine::prelude::*;
//!
//! let mut state = WorldState::new();
//! let alice = Address::new([0xaa; 20]);
//! let bob = Address::new([0xbb; 20]);
//! state.set_balance(alice, U256::from(100));
//!
//! let evm = Evm::default();
//! let tx = Transaction::transfer(alice, bob, U256::one(), 21_000, 0);
//! let result = evm.apply_transaction(&state, &tx).unwrap();
//!
//! assert!(result.outcome.is_success());
//! state.apply(&result.changes);
//! assert_eq!(state.balance(&bob), U256::one());
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod evm;
pub mod ports;
pub mod processor;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        AccountInfo, BlockContext, EngineConfig, EvmVersion, ExecutionContext, ExecutionOutcome,
        Log, StateChange, Transaction, TransactionResult, TxKind,
    };

    // Value objects
    pub use crate::domain::value_objects::{
        Address, Bytes, Hash, StorageKey, StorageValue, U256,
    };

    // Domain services
    pub use crate::domain::services::{compute_contract_address, intrinsic_gas, keccak256};

    // Ports
    pub use crate::ports::inbound::ExecutionEngine;
    pub use crate::ports::outbound::{AccessList, AccessStatus, StateView};

    // Errors
    pub use crate::errors::{EngineError, VmError};

    // Adapters
    pub use crate::adapters::{InMemoryAccessList, PendingState, WorldState};

    // Engine
    pub use crate::processor::Evm;
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================
