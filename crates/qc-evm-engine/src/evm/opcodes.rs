//! # EVM Opcodes
//!
//! Opcode byte values and fork activation rules.

#![allow(missing_docs)]

use crate::domain::entities::EvmVersion;

// 0x00 - Stop and Arithmetic
pub const STOP: u8 = 0x00;
pub const ADD: u8 = 0x01;
pub const MUL: u8 = 0x02;
pub const SUB: u8 = 0x03;
pub const DIV: u8 = 0x04;
pub const SDIV: u8 = 0x05;
pub const MOD: u8 = 0x06;
pub const SMOD: u8 = 0x07;
pub const ADDMOD: u8 = 0x08;
pub const MULMOD: u8 = 0x09;
pub const EXP: u8 = 0x0A;
pub const SIGNEXTEND: u8 = 0x0B;

// 0x10 - Comparison & Bitwise
pub const LT: u8 = 0x10;
pub const GT: u8 = 0x11;
pub const SLT: u8 = 0x12;
pub const SGT: u8 = 0x13;
pub const EQ: u8 = 0x14;
pub const ISZERO: u8 = 0x15;
pub const AND: u8 = 0x16;
pub const OR: u8 = 0x17;
pub const XOR: u8 = 0x18;
pub const NOT: u8 = 0x19;
pub const BYTE: u8 = 0x1A;
pub const SHL: u8 = 0x1B;
pub const SHR: u8 = 0x1C;
pub const SAR: u8 = 0x1D;

// 0x20 - Keccak256
pub const KECCAK256: u8 = 0x20;

// 0x30 - Environmental Information
pub const ADDRESS: u8 = 0x30;
pub const BALANCE: u8 = 0x31;
pub const ORIGIN: u8 = 0x32;
pub const CALLER: u8 = 0x33;
pub const CALLVALUE: u8 = 0x34;
pub const CALLDATALOAD: u8 = 0x35;
pub const CALLDATASIZE: u8 = 0x36;
pub const CALLDATACOPY: u8 = 0x37;
pub const CODESIZE: u8 = 0x38;
pub const CODECOPY: u8 = 0x39;
pub const GASPRICE: u8 = 0x3A;
pub const EXTCODESIZE: u8 = 0x3B;
pub const EXTCODECOPY: u8 = 0x3C;
pub const RETURNDATASIZE: u8 = 0x3D;
pub const RETURNDATACOPY: u8 = 0x3E;
pub const EXTCODEHASH: u8 = 0x3F;

// 0x40 - Block Information
pub const BLOCKHASH: u8 = 0x40;
pub const COINBASE: u8 = 0x41;
pub const TIMESTAMP: u8 = 0x42;
pub const NUMBER: u8 = 0x43;
pub const PREVRANDAO: u8 = 0x44;
pub const GASLIMIT: u8 = 0x45;
pub const CHAINID: u8 = 0x46;
pub const SELFBALANCE: u8 = 0x47;
pub const BASEFEE: u8 = 0x48;

// 0x50 - Stack, Memory, Storage, Flow
pub const POP: u8 = 0x50;
pub const MLOAD: u8 = 0x51;
pub const MSTORE: u8 = 0x52;
pub const MSTORE8: u8 = 0x53;
pub const SLOAD: u8 = 0x54;
pub const SSTORE: u8 = 0x55;
pub const JUMP: u8 = 0x56;
pub const JUMPI: u8 = 0x57;
pub const PC: u8 = 0x58;
pub const MSIZE: u8 = 0x59;
pub const GAS: u8 = 0x5A;
pub const JUMPDEST: u8 = 0x5B;
pub const TLOAD: u8 = 0x5C;
pub const TSTORE: u8 = 0x5D;
pub const MCOPY: u8 = 0x5E;
pub const PUSH0: u8 = 0x5F;

// 0x60-0x9F - Push, Dup, Swap
pub const PUSH1: u8 = 0x60;
pub const PUSH32: u8 = 0x7F;
pub const DUP1: u8 = 0x80;
pub const DUP16: u8 = 0x8F;
pub const SWAP1: u8 = 0x90;
pub const SWAP16: u8 = 0x9F;

// 0xA0 - Log
pub const LOG0: u8 = 0xA0;
pub const LOG4: u8 = 0xA4;

// 0xF0 - System
pub const CREATE: u8 = 0xF0;
pub const CALL: u8 = 0xF1;
pub const CALLCODE: u8 = 0xF2;
pub const RETURN: u8 = 0xF3;
pub const DELEGATECALL: u8 = 0xF4;
pub const CREATE2: u8 = 0xF5;
pub const STATICCALL: u8 = 0xFA;
pub const REVERT: u8 = 0xFD;
pub const INVALID: u8 = 0xFE;
pub const SELFDESTRUCT: u8 = 0xFF;

/// Returns true if `op` is defined under `version`.
///
/// `INVALID` (0xFE) is never "enabled": executing it halts like any other
/// undefined byte.
#[must_use]
pub fn is_enabled(op: u8, version: EvmVersion) -> bool {
    match op {
        BASEFEE => version.is_enabled(EvmVersion::London),
        PUSH0 => version.is_enabled(EvmVersion::Shanghai),
        TLOAD | TSTORE | MCOPY => version.is_enabled(EvmVersion::Cancun),
        STOP..=SIGNEXTEND
        | LT..=SAR
        | KECCAK256
        | ADDRESS..=SELFBALANCE
        | POP..=JUMPDEST
        | PUSH1..=LOG4
        | CREATE..=CREATE2
        | STATICCALL
        | REVERT
        | SELFDESTRUCT => true,
        _ => false,
    }
}

/// Opcodes that would open a nested frame or destroy the account.
#[must_use]
pub const fn needs_nested_frame(op: u8) -> bool {
    matches!(
        op,
        CREATE | CALL | CALLCODE | DELEGATECALL | CREATE2 | STATICCALL | SELFDESTRUCT
    )
}

/// Number of immediate bytes that follow a PUSH opcode.
#[must_use]
pub const fn push_size(op: u8) -> usize {
    if op >= PUSH1 && op <= PUSH32 {
        (op - PUSH1 + 1) as usize
    } else {
        0
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fork_activation() {
        assert!(!is_enabled(PUSH0, EvmVersion::Paris));
        assert!(is_enabled(PUSH0, EvmVersion::Shanghai));
        assert!(!is_enabled(TSTORE, EvmVersion::Shanghai));
        assert!(is_enabled(MCOPY, EvmVersion::Cancun));
        assert!(!is_enabled(BASEFEE, EvmVersion::Berlin));
        assert!(is_enabled(BASEFEE, EvmVersion::London));
    }

    #[test]
    fn test_undefined_bytes() {
        for op in [0x0C, 0x21, 0x49, 0xA5, 0xF6, INVALID] {
            assert!(!is_enabled(op, EvmVersion::Cancun), "0x{op:02x}");
        }
        assert!(is_enabled(SELFDESTRUCT, EvmVersion::Cancun));
    }

    #[test]
    fn test_push_size() {
        assert_eq!(push_size(PUSH0), 0);
        assert_eq!(push_size(PUSH1), 1);
        assert_eq!(push_size(PUSH32), 32);
        assert_eq!(push_size(ADD), 0);
    }

    #[test]
    fn test_nested_frame_opcodes() {
        assert!(needs_nested_frame(CALL));
        assert!(needs_nested_frame(CREATE2));
        assert!(!needs_nested_frame(RETURN));
    }
}
