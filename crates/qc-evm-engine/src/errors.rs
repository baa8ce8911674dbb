//! # Error Types
//!
//! Errors raised by the engine. `VmError` describes why a frame halted
//! exceptionally; `EngineError` describes why a transaction was rejected
//! before any state was touched.

use crate::domain::value_objects::{Address, U256};
use thiserror::Error;

// =============================================================================
// VM ERRORS
// =============================================================================

/// Exceptional halt reasons during EVM execution.
///
/// A halt consumes all gas forwarded to the frame and rolls back every
/// effect of the frame except the up-front fee and the sender nonce bump.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    /// Execution ran out of gas.
    #[error("out of gas")]
    OutOfGas,

    /// Stack overflow (>1024 items).
    #[error("stack overflow")]
    StackOverflow,

    /// Stack underflow (pop from empty stack).
    #[error("stack underflow")]
    StackUnderflow,

    /// Invalid or not-yet-activated opcode encountered.
    #[error("invalid opcode: 0x{0:02X}")]
    InvalidOpcode(u8),

    /// Opcode that needs a nested frame (calls, creates, self-destruct).
    #[error("unsupported opcode: 0x{0:02X} (nested frames are not available)")]
    UnsupportedOpcode(u8),

    /// Invalid jump destination.
    #[error("invalid jump destination: {0}")]
    InvalidJump(usize),

    /// Memory expansion would exceed limit.
    #[error("memory limit exceeded: {requested} > {max} bytes")]
    MemoryLimitExceeded {
        /// Bytes requested.
        requested: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Return data out of bounds (RETURNDATACOPY).
    #[error("return data out of bounds: offset {offset}, size {size}, available {available}")]
    ReturnDataOutOfBounds {
        /// Read offset.
        offset: usize,
        /// Read size.
        size: usize,
        /// Bytes of return data available.
        available: usize,
    },

    /// Deployed code size exceeded limit (EIP-170).
    #[error("code size exceeded: {size} > {max} bytes")]
    CodeSizeExceeded {
        /// Size of the returned runtime code.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Deployed code starts with 0xEF (EIP-3541).
    #[error("code starts with 0xEF byte (reserved for EOF)")]
    InvalidCodePrefix,

    /// An account with code or a nonce already lives at the CREATE address.
    #[error("contract already exists at address: {0:?}")]
    CreateCollision(Address),
}

// =============================================================================
// ENGINE ERRORS
// =============================================================================

/// Reasons a transaction is rejected before execution.
///
/// A rejected transaction has no effect on state: no fee is charged and the
/// sender nonce is not bumped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Transaction nonce does not match the sender's account nonce.
    #[error("nonce mismatch for {address:?}: account nonce {expected}, transaction nonce {actual}")]
    NonceMismatch {
        /// Sender.
        address: Address,
        /// Nonce stored on the account.
        expected: u64,
        /// Nonce carried by the transaction.
        actual: u64,
    },

    /// Sender nonce cannot be incremented any further.
    #[error("nonce overflow for {0:?}")]
    NonceOverflow(Address),

    /// Sender cannot cover `value + gas_limit * gas_price`.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Maximum up-front cost.
        required: U256,
        /// Sender balance.
        available: U256,
    },

    /// `gas_limit * gas_price + value` does not fit in 256 bits.
    #[error("transaction cost overflows 256 bits")]
    CostOverflow,

    /// Gas limit does not cover the intrinsic cost.
    #[error("intrinsic gas too low: need {intrinsic}, limit {limit}")]
    IntrinsicGasTooLow {
        /// Intrinsic gas of the transaction.
        intrinsic: u64,
        /// Gas limit carried by the transaction.
        limit: u64,
    },

    /// Gas limit is above the block gas limit.
    #[error("gas limit {limit} exceeds block gas limit {block_limit}")]
    GasLimitExceedsBlock {
        /// Gas limit carried by the transaction.
        limit: u64,
        /// Gas limit of the block.
        block_limit: u64,
    },

    /// Gas price is below the block base fee (EIP-1559).
    #[error("gas price {gas_price} below base fee {base_fee}")]
    GasPriceBelowBaseFee {
        /// Gas price of the transaction.
        gas_price: U256,
        /// Base fee of the block.
        base_fee: U256,
    },

    /// Init code size exceeded limit (EIP-3860).
    #[error("init code size exceeded: {size} > {max} bytes")]
    InitCodeSizeExceeded {
        /// Size of the init code.
        size: usize,
        /// Configured maximum.
        max: usize,
    },
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_error_display() {
        assert_eq!(VmError::OutOfGas.to_string(), "out of gas");
        assert_eq!(
            VmError::InvalidOpcode(0xFE).to_string(),
            "invalid opcode: 0xFE"
        );
        assert!(VmError::UnsupportedOpcode(0xF1)
            .to_string()
            .contains("0xF1"));
    }

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::IntrinsicGasTooLow {
            intrinsic: 21_000,
            limit: 20_000,
        };
        assert_eq!(err.to_string(), "intrinsic gas too low: need 21000, limit 20000");

        let err = EngineError::InsufficientFunds {
            required: U256::from(100),
            available: U256::from(1),
        };
        assert!(err.to_string().contains("insufficient funds"));
    }
}
