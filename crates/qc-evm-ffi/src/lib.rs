//! # QC EVM FFI - C Boundary
//!
//! C-callable bindings over [`qc_evm_engine`]. A host creates an opaque
//! instance, configures a transaction, runs it as a dry run or with commit,
//! deploys code, and reads/writes state using only pointers, integers,
//! NUL-terminated strings and byte buffers. The declarations live in
//! `include/qc_evm_ffi.h`.
//!
//! ## Call Flow
//!
//! ```text
//! qc_evm_new ─► qc_evm_set_tx ─► qc_evm_execute[_commit] ─► read result
//!                                                           │
//!             qc_evm_free ◄── qc_evm_free_execution_result ◄┘
//! ```
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Hex codec | `codec.rs` | Address/value/bytes parsing and canonical output |
//! | Error channel | `errors.rs` | `FfiError`, stable codes, per-instance slot |
//! | Instance | `instance.rs` | Engine + world state + pending tx + slot |
//! | Configurator | `transaction.rs` | `qc_evm_set_tx` validation |
//! | Driver | `driver.rs` | Dry run / commit / call / transfer / deploy |
//! | Materializer | `results.rs` | `#[repr(C)]` results and their release |
//! | Configuration | `config.rs` | C struct, presets, JSON |
//! | Logging | `logging.rs` | Opt-in `tracing` subscriber |
//! | C surface | `api.rs` | `extern "C"` entry points |
//!
//! ## Error Codes
//!
//! | Code | Class |
//! |------|-------|
//! | 0 | none |
//! | 1 | `NullArgument` |
//! | 2 | `InvalidAddress` |
//! | 3 | `InvalidHex` |
//! | 4 | `MissingTransactionConfig` |
//! | 5 | `AllocationFailure` |
//! | 6 | `EngineInternalError` |
//!
//! ## Usage Example
//!
//! ```
//! use qc_evm_ffi::*;
//! use std::ffi::{CStr, CString};
//!
//! let a = CString::new("0x000000000000000000000000000000000000000a").unwrap();
//! let b = CString::new("0x000000000000000000000000000000000000000b").unwrap();
//! let hundred = CString::new("0x64").unwrap();
//! let one = CString::new("0x1").unwrap();
//!
//! unsafe {
//!     let evm = qc_evm_new();
//!     assert_eq!(qc_evm_set_balance(evm, a.as_ptr(), hundred.as_ptr()), 0);
//!
//!     let result = qc_evm_transfer(evm, a.as_ptr(), b.as_ptr(), one.as_ptr(), 21_000);
//!     assert_eq!((*result).status, 1);
//!     qc_evm_free_execution_result(result);
//!
//!     let balance = qc_evm_get_balance(evm, b.as_ptr());
//!     assert_eq!(CStr::from_ptr(balance).to_str().unwrap(), "0x1");
//!     qc_evm_free_string(balance);
//!     qc_evm_free(evm);
//! }
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

pub mod api;
pub mod codec;
pub mod config;
pub mod driver;
pub mod errors;
pub mod instance;
pub mod logging;
pub mod results;
pub mod transaction;

pub use api::*;
pub use config::{QcEvmConfig, QcEvmPreset};
pub use errors::{ErrorCode, FfiError};
pub use instance::QcEvmInstance;
pub use results::{QcEvmDeploymentResult, QcEvmExecutionResult, QcEvmLog};

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for Rust callers.
pub mod prelude {
    pub use crate::config::{ConfigError, JsonConfig, QcEvmConfig, QcEvmPreset};
    pub use crate::driver::Mode;
    pub use crate::errors::{ErrorCode, ErrorSlot, FfiError};
    pub use crate::instance::QcEvmInstance;
    pub use crate::logging::{LoggingConfig, LoggingError};
    pub use crate::results::{
        QcEvmDeploymentResult, QcEvmExecutionResult, QcEvmLog, STATUS_HALT, STATUS_REVERT,
        STATUS_SUCCESS,
    };
    pub use crate::transaction::TxArgs;
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================
