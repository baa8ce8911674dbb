//! # Hex Codec
//!
//! Conversions between the boundary's string/buffer arguments and the
//! engine's value types.
//!
//! ## Input
//!
//! - `0x`/`0X` prefix is mandatory, digits are case-insensitive.
//! - Addresses: exactly 40 digits.
//! - 256-bit values: 1..=64 significant digits, leading zeros allowed.
//!
//! ## Output
//!
//! - Values: lowercase, minimal digits, `0x0` for zero.
//! - Addresses and topics: full width, lowercase.
//! - Byte buffers (code): `0x` followed by two digits per byte, `0x` if empty.

use crate::errors::FfiError;
use primitive_types::U256;
use qc_evm_engine::domain::value_objects::{Address, Hash};
use std::borrow::Cow;
use std::ffi::{c_char, CStr};

/// Hex digits in a full-width address.
pub const ADDRESS_HEX_LEN: usize = 40;

/// Maximum significant hex digits of a 256-bit value.
pub const U256_HEX_LEN: usize = 64;

// =============================================================================
// PARSING
// =============================================================================

fn strip_prefix(input: &str) -> Option<&str> {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
}

/// Parses a `0x`-prefixed, 40-digit address.
///
/// # Errors
///
/// Returns `InvalidAddress` for a missing prefix, wrong length or non-hex
/// digits.
pub fn parse_address(input: &str) -> Result<Address, FfiError> {
    let digits =
        strip_prefix(input).ok_or_else(|| FfiError::invalid_address(input, "missing 0x prefix"))?;
    if digits.len() != ADDRESS_HEX_LEN {
        return Err(FfiError::invalid_address(input, "expected 40 hex digits"));
    }
    let mut bytes = [0u8; 20];
    hex::decode_to_slice(digits, &mut bytes)
        .map_err(|_| FfiError::invalid_address(input, "non-hex digit"))?;
    Ok(Address::new(bytes))
}

/// Parses a `0x`-prefixed 256-bit value.
///
/// # Errors
///
/// Returns `InvalidHex` for a missing prefix, no digits, non-hex digits or
/// more than 64 significant digits.
pub fn parse_u256(input: &str) -> Result<U256, FfiError> {
    let digits =
        strip_prefix(input).ok_or_else(|| FfiError::invalid_hex(input, "missing 0x prefix"))?;
    if digits.is_empty() {
        return Err(FfiError::invalid_hex(input, "no digits"));
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(FfiError::invalid_hex(input, "non-hex digit"));
    }

    let significant = digits.trim_start_matches('0');
    if significant.len() > U256_HEX_LEN {
        return Err(FfiError::invalid_hex(input, "wider than 256 bits"));
    }
    if significant.is_empty() {
        return Ok(U256::zero());
    }

    let padded: Cow<'_, str> = if significant.len() % 2 == 1 {
        Cow::Owned(format!("0{significant}"))
    } else {
        Cow::Borrowed(significant)
    };
    let bytes =
        hex::decode(padded.as_ref()).map_err(|_| FfiError::invalid_hex(input, "non-hex digit"))?;
    Ok(U256::from_big_endian(&bytes))
}

// =============================================================================
// FORMATTING
// =============================================================================

/// Canonical value encoding: lowercase, minimal digits, `0x0` for zero.
#[must_use]
pub fn format_u256(value: U256) -> String {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    let encoded = hex::encode(bytes);
    let trimmed = encoded.trim_start_matches('0');
    if trimmed.is_empty() {
        "0x0".to_owned()
    } else {
        format!("0x{trimmed}")
    }
}

/// Full-width lowercase address.
#[must_use]
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

/// Full-width lowercase 32-byte word (log topics).
#[must_use]
pub fn format_hash(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash.as_bytes()))
}

/// `0x` followed by every byte, `0x` for an empty buffer.
#[must_use]
pub fn format_bytes(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

// =============================================================================
// C ARGUMENTS
// =============================================================================

/// Reads an optional NUL-terminated string. Invalid UTF-8 is replaced so
/// that it fails hex validation with the right class.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for `'a`.
#[must_use]
pub unsafe fn optional_str<'a>(ptr: *const c_char) -> Option<Cow<'a, str>> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy())
    }
}

/// Reads a required NUL-terminated string.
///
/// # Errors
///
/// Returns `NullArgument(name)` if `ptr` is null.
///
/// # Safety
///
/// Same as [`optional_str`].
pub unsafe fn required_str<'a>(
    ptr: *const c_char,
    name: &'static str,
) -> Result<Cow<'a, str>, FfiError> {
    optional_str(ptr).ok_or(FfiError::NullArgument(name))
}

/// Reads a required address argument.
///
/// # Errors
///
/// Returns `NullArgument` or `InvalidAddress`.
///
/// # Safety
///
/// Same as [`optional_str`].
pub unsafe fn address_arg(ptr: *const c_char, name: &'static str) -> Result<Address, FfiError> {
    parse_address(&required_str(ptr, name)?)
}

/// Reads a required 256-bit value argument.
///
/// # Errors
///
/// Returns `NullArgument` or `InvalidHex`.
///
/// # Safety
///
/// Same as [`optional_str`].
pub unsafe fn u256_arg(ptr: *const c_char, name: &'static str) -> Result<U256, FfiError> {
    parse_u256(&required_str(ptr, name)?)
}

/// Borrows a `(ptr, len)` byte buffer. Null with zero length is the empty
/// buffer.
///
/// # Errors
///
/// Returns `NullArgument(name)` for a null pointer with non-zero length.
///
/// # Safety
///
/// When non-null, `ptr` must be valid for reads of `len` bytes for `'a`.
pub unsafe fn byte_slice<'a>(
    ptr: *const u8,
    len: usize,
    name: &'static str,
) -> Result<&'a [u8], FfiError> {
    if ptr.is_null() {
        if len == 0 {
            Ok(&[])
        } else {
            Err(FfiError::NullArgument(name))
        }
    } else {
        Ok(std::slice::from_raw_parts(ptr, len))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use std::ffi::CString;

    const ALICE: &str = "0x1111111111111111111111111111111111111111";

    #[test]
    fn test_parse_address() {
        let addr = parse_address(ALICE).unwrap();
        assert_eq!(addr, Address::new([0x11; 20]));

        let upper = parse_address("0XABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD").unwrap();
        assert_eq!(upper.as_bytes()[0], 0xab);
    }

    #[test]
    fn test_parse_address_rejects() {
        for bad in [
            "1111111111111111111111111111111111111111",
            "0x111111111111111111111111111111111111111",
            "0x11111111111111111111111111111111111111111",
            "0x111111111111111111111111111111111111111g",
            "",
            "0x",
        ] {
            let err = parse_address(bad).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidAddress, "{bad}");
        }
    }

    #[test]
    fn test_parse_u256() {
        assert_eq!(parse_u256("0x0").unwrap(), U256::zero());
        assert_eq!(parse_u256("0x64").unwrap(), U256::from(100));
        assert_eq!(parse_u256("0XfF").unwrap(), U256::from(255));
        assert_eq!(parse_u256("0x00000001").unwrap(), U256::one());
        assert_eq!(parse_u256("0xabc").unwrap(), U256::from(0xabc));

        let max = format!("0x{}", "f".repeat(64));
        assert_eq!(parse_u256(&max).unwrap(), U256::MAX);

        // Leading zeros do not count against the width.
        let padded = format!("0x{}1", "0".repeat(70));
        assert_eq!(parse_u256(&padded).unwrap(), U256::one());
    }

    #[test]
    fn test_parse_u256_rejects() {
        let too_wide = format!("0x1{}", "0".repeat(64));
        for bad in ["64", "0x", "0xg1", "0x 1", "-0x1", too_wide.as_str()] {
            let err = parse_u256(bad).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidHex, "{bad}");
        }
    }

    #[test]
    fn test_format_u256() {
        assert_eq!(format_u256(U256::zero()), "0x0");
        assert_eq!(format_u256(U256::from(0x63)), "0x63");
        assert_eq!(format_u256(U256::from(0xABC)), "0xabc");
        assert_eq!(format_u256(U256::MAX), format!("0x{}", "f".repeat(64)));
    }

    #[test]
    fn test_format_full_width() {
        let mut bytes = [0u8; 20];
        bytes[19] = 0xAB;
        assert_eq!(
            format_address(&Address::new(bytes)),
            "0x00000000000000000000000000000000000000ab"
        );
        assert_eq!(format_hash(&Hash::new([0; 32])).len(), 66);
        assert_eq!(format_bytes(&[]), "0x");
        assert_eq!(format_bytes(&[0x60, 0x0A]), "0x600a");
    }

    #[test]
    fn test_c_string_args() {
        let addr = CString::new(ALICE).unwrap();
        let parsed = unsafe { address_arg(addr.as_ptr(), "address") }.unwrap();
        assert_eq!(parsed, Address::new([0x11; 20]));

        let err = unsafe { address_arg(std::ptr::null(), "address") }.unwrap_err();
        assert_eq!(err, FfiError::NullArgument("address"));

        assert!(unsafe { optional_str(std::ptr::null()) }.is_none());
    }

    #[test]
    fn test_invalid_utf8_is_invalid_hex() {
        let raw = CString::new(vec![b'0', b'x', 0xFF]).unwrap();
        let err = unsafe { u256_arg(raw.as_ptr(), "value") }.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidHex);
    }

    #[test]
    fn test_byte_slice() {
        let empty = unsafe { byte_slice(std::ptr::null(), 0, "data") }.unwrap();
        assert!(empty.is_empty());

        let err = unsafe { byte_slice(std::ptr::null(), 3, "data") }.unwrap_err();
        assert_eq!(err, FfiError::NullArgument("data"));

        let data = [1u8, 2, 3];
        let slice = unsafe { byte_slice(data.as_ptr(), 2, "data") }.unwrap();
        assert_eq!(slice, &[1, 2]);
    }
}
