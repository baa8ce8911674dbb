//! # Domain Services
//!
//! Pure functions used by the transaction processor and the interpreter.
//! Deterministic, no I/O, no state.

use crate::domain::entities::EvmVersion;
use crate::domain::value_objects::{Address, Hash};
use crate::evm::gas::costs;
use sha3::{Digest, Keccak256};

// =============================================================================
// CONTRACT ADDRESS COMPUTATION
// =============================================================================

/// Computes the contract address for a creation transaction.
///
/// Address = keccak256(rlp(\[sender, nonce\]))\[12:\]
#[must_use]
pub fn compute_contract_address(sender: Address, nonce: u64) -> Address {
    // RLP payload: 0x94 ++ sender ++ rlp(nonce)
    let mut content = Vec::with_capacity(30);
    content.push(0x80 + 20);
    content.extend_from_slice(sender.as_bytes());

    if nonce == 0 {
        content.push(0x80);
    } else if nonce < 0x80 {
        content.extend_from_slice(&nonce.to_be_bytes()[7..]);
    } else {
        let nonce_be = nonce.to_be_bytes();
        let nonce_bytes = trim_leading_zeros(&nonce_be);
        content.push(0x80 + short_len(nonce_bytes.len()));
        content.extend_from_slice(nonce_bytes);
    }

    // The payload never exceeds 30 bytes, so a short list header suffices
    let mut rlp_data = Vec::with_capacity(content.len() + 1);
    rlp_data.push(0xc0 + short_len(content.len()));
    rlp_data.extend_from_slice(&content);

    let hash = Keccak256::digest(&rlp_data);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..32]);
    Address::new(addr)
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn short_len(len: usize) -> u8 {
    u8::try_from(len).unwrap_or(u8::MAX)
}

// =============================================================================
// INTRINSIC GAS
// =============================================================================

/// Gas charged before the first opcode runs.
///
/// 21000 base, +32000 for creation, 16/4 gas per non-zero/zero data byte,
/// and from Shanghai 2 gas per 32-byte word of init code (EIP-3860).
#[must_use]
pub fn intrinsic_gas(data: &[u8], is_create: bool, version: EvmVersion) -> u64 {
    let mut gas = costs::TX_BASE;

    if is_create {
        gas += costs::CREATE;
        if version.is_enabled(EvmVersion::Shanghai) {
            gas += costs::INITCODE_WORD * words(data.len());
        }
    }

    let data_gas: u64 = data
        .iter()
        .map(|&byte| {
            if byte == 0 {
                costs::TX_DATA_ZERO
            } else {
                costs::TX_DATA_NON_ZERO
            }
        })
        .sum();

    gas + data_gas
}

/// Number of 32-byte words covering `len` bytes.
#[must_use]
pub fn words(len: usize) -> u64 {
    len.div_ceil(32) as u64
}

// =============================================================================
// KECCAK256 UTILITY
// =============================================================================

/// Computes keccak256 hash of data.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let hash = Keccak256::digest(data);
    Hash::new(hash.into())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn address(hex_str: &str) -> Address {
        Address::from_slice(&hex::decode(hex_str).unwrap()).unwrap()
    }

    #[test]
    fn test_compute_contract_address_known_vectors() {
        let sender = address("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0");

        assert_eq!(
            compute_contract_address(sender, 0),
            address("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d")
        );
        assert_eq!(
            compute_contract_address(sender, 1),
            address("343c43a37d37dff08ae8c4a11544c718abb4fcf8")
        );
        assert_eq!(
            compute_contract_address(sender, 2),
            address("f778b86fa74e846c4f0a1fbd1335fe81c00a0c91")
        );
    }

    #[test]
    fn test_compute_contract_address_long_nonce_encoding() {
        let sender = address("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0");

        // 0x80 needs a length prefix: 0x81 0x80
        assert_eq!(
            compute_contract_address(sender, 0x80),
            address("08e190dcb7b73f5fcdabb43e102215c83659a76d")
        );
        // Leading zero bytes are dropped: 0x84 0x01 0x00 0x00 0x00
        assert_eq!(
            compute_contract_address(sender, 0x0100_0000),
            address("2f7e0b32826965de88a6febf0f35f55fdc22b262")
        );
    }

    #[test]
    fn test_intrinsic_gas_call() {
        assert_eq!(intrinsic_gas(&[], false, EvmVersion::Cancun), 21_000);

        // 10 non-zero bytes = 160, 5 zero bytes = 20
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 0, 0, 0, 0, 0];
        assert_eq!(intrinsic_gas(&data, false, EvmVersion::Cancun), 21_180);
    }

    #[test]
    fn test_intrinsic_gas_create() {
        assert_eq!(intrinsic_gas(&[], true, EvmVersion::London), 53_000);

        // 33 bytes of init code = 2 words
        let code = vec![1u8; 33];
        assert_eq!(
            intrinsic_gas(&code, true, EvmVersion::London),
            53_000 + 33 * 16
        );
        assert_eq!(
            intrinsic_gas(&code, true, EvmVersion::Shanghai),
            53_000 + 33 * 16 + 4
        );
    }

    #[test]
    fn test_keccak256() {
        let hash = keccak256(&[]);
        assert_eq!(hash.as_bytes()[0..4], [0xc5, 0xd2, 0x46, 0x01]);
    }
}
