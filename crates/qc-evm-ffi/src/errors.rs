//! # Boundary Errors
//!
//! Everything that can go wrong between a C caller and the engine, plus the
//! per-instance slot the last failure is parked in.
//!
//! Reverts and halts never show up here: they are results.

use qc_evm_engine::errors::EngineError;
use std::ffi::{c_char, CString};
use std::ptr;
use thiserror::Error;

// =============================================================================
// ERROR CODES
// =============================================================================

/// Stable integer classes reported by `qc_evm_get_last_error_code`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// No error pending.
    #[default]
    None = 0,
    /// A required pointer argument was null.
    NullArgument = 1,
    /// Malformed address string.
    InvalidAddress = 2,
    /// Malformed numeric/slot string.
    InvalidHex = 3,
    /// Execution requested before a transaction was configured.
    MissingTransactionConfig = 4,
    /// A result buffer could not be allocated.
    AllocationFailure = 5,
    /// The engine rejected the transaction or panicked.
    EngineInternalError = 6,
}

impl ErrorCode {
    /// Integer value handed to C.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self as i32
    }
}

// =============================================================================
// FFI ERROR
// =============================================================================

/// Failure of a boundary call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FfiError {
    /// Required pointer was null.
    #[error("null argument: {0}")]
    NullArgument(&'static str),

    /// Address string did not parse.
    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress {
        /// Offending input, lossily decoded.
        input: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// Hex value string did not parse.
    #[error("invalid hex {input:?}: {reason}")]
    InvalidHex {
        /// Offending input, lossily decoded.
        input: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// `qc_evm_execute*` before `qc_evm_set_tx`.
    #[error("no transaction configured: call qc_evm_set_tx first")]
    MissingTransactionConfig,

    /// Result buffer allocation failed.
    #[error("allocation failure: {0}")]
    AllocationFailure(&'static str),

    /// Engine rejection (message verbatim) or a caught panic.
    #[error("{0}")]
    EngineInternalError(String),
}

impl FfiError {
    /// Stable class of this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NullArgument(_) => ErrorCode::NullArgument,
            Self::InvalidAddress { .. } => ErrorCode::InvalidAddress,
            Self::InvalidHex { .. } => ErrorCode::InvalidHex,
            Self::MissingTransactionConfig => ErrorCode::MissingTransactionConfig,
            Self::AllocationFailure(_) => ErrorCode::AllocationFailure,
            Self::EngineInternalError(_) => ErrorCode::EngineInternalError,
        }
    }

    pub(crate) fn invalid_address(input: &str, reason: &'static str) -> Self {
        Self::InvalidAddress {
            input: input.to_owned(),
            reason,
        }
    }

    pub(crate) fn invalid_hex(input: &str, reason: &'static str) -> Self {
        Self::InvalidHex {
            input: input.to_owned(),
            reason,
        }
    }
}

impl From<EngineError> for FfiError {
    fn from(err: EngineError) -> Self {
        Self::EngineInternalError(err.to_string())
    }
}

// =============================================================================
// ERROR SLOT
// =============================================================================

/// Last-error slot of one instance.
///
/// The message is stored NUL-terminated so `qc_evm_get_last_error` can hand
/// out a borrowed pointer without allocating.
#[derive(Debug, Default)]
pub struct ErrorSlot {
    message: Option<CString>,
    code: ErrorCode,
}

impl ErrorSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the slot with `error`.
    pub fn set(&mut self, error: &FfiError) {
        let text = error.to_string().replace('\0', "\\0");
        self.message = CString::new(text).ok();
        self.code = error.code();
    }

    /// Empties the slot.
    pub fn clear(&mut self) {
        self.message = None;
        self.code = ErrorCode::None;
    }

    /// Class of the pending error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Pending message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().and_then(|m| m.to_str().ok())
    }

    /// Borrowed pointer to the message, null when empty. Valid until the
    /// slot is next modified.
    #[must_use]
    pub fn as_ptr(&self) -> *const c_char {
        self.message.as_deref().map_or(ptr::null(), |m| m.as_ptr())
    }
}

// =============================================================================
// TESTS
// =============================================================================
