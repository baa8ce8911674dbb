//! # Value Objects
//!
//! Fixed-width primitives shared by the state, the interpreter and the
//! transaction processor. All of them are plain data and compare by value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 256-bit machine word.
pub use primitive_types::U256;

/// Writes `bytes` as a lowercase `0x`-prefixed hex string.
fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    write!(f, "0x")?;
    for byte in bytes {
        write!(f, "{byte:02x}")?;
    }
    Ok(())
}

// =============================================================================
// ADDRESS (20 bytes)
// =============================================================================

/// A 20-byte Ethereum-style account address.
///
/// Ordered so that state diffs can be reported deterministically.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address (0x0000...0000).
    pub const ZERO: Self = Self([0u8; 20]);

    /// Creates an address from a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an address from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 20]>::try_from(slice).ok().map(Self)
    }

    /// Takes the low 20 bytes of a stack word.
    #[must_use]
    pub fn from_word(word: U256) -> Self {
        let mut bytes = [0u8; 32];
        word.to_big_endian(&mut bytes);
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&bytes[12..]);
        Self(addr)
    }

    /// Left-pads the address into a stack word.
    #[must_use]
    pub fn to_word(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns true if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// 32-BYTE WORDS
// =============================================================================

/// Big-endian 32-byte newtypes that convert losslessly to and from `U256`.
macro_rules! word_type {
    ($(#[$meta:meta])* $name:ident $(, $extra:ident)*) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize $(, $extra)*)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// All zero bytes.
            pub const ZERO: Self = Self([0u8; 32]);

            /// Wraps raw big-endian bytes.
            #[must_use]
            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Big-endian encoding of `word`.
            #[must_use]
            pub fn from_u256(word: U256) -> Self {
                let mut bytes = [0u8; 32];
                word.to_big_endian(&mut bytes);
                Self(bytes)
            }

            /// Big-endian decoding back into a word.
            #[must_use]
            pub fn to_u256(&self) -> U256 {
                U256::from_big_endian(&self.0)
            }

            /// Raw bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// True when every byte is zero.
            #[must_use]
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(", stringify!($name))?;
                write_hex(f, &self.0)?;
                write!(f, ")")
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl From<U256> for $name {
            fn from(word: U256) -> Self {
                Self::from_u256(word)
            }
        }
    };
}

word_type!(
    /// Keccak digest or log topic.
    Hash
);

word_type!(
    /// Storage slot index. Ordered so diffs list slots deterministically.
    StorageKey, PartialOrd, Ord
);

word_type!(
    /// Storage slot contents; zero means the slot is absent.
    StorageValue
);

// =============================================================================
// BYTES
// =============================================================================

/// Owned byte string: calldata, return data, code.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    /// No bytes.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Copies `slice`.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }

    /// Unwraps into the vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Borrowed view.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get(..4) {
            Some(head) if self.0.len() > 8 => {
                write_hex(f, head)?;
                write!(f, "..({} bytes)", self.0.len())
            }
            _ => write_hex(f, &self.0),
        }
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Bytes {
    fn from(bytes: &[u8]) -> Self {
        Self::from_slice(bytes)
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_zero() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::new([1u8; 20]).is_zero());
    }

    #[test]
    fn test_address_word_conversion() {
        let word = U256::from(0x1234u64) | (U256::one() << 200);
        let addr = Address::from_word(word);
        assert_eq!(addr.as_bytes()[19], 0x34);
        assert_eq!(addr.as_bytes()[18], 0x12);
        // High bits above 160 are dropped
        assert_eq!(addr.to_word(), U256::from(0x1234u64));
    }

    #[test]
    fn test_address_display_is_full_width() {
        let addr = Address::new([0xab; 20]);
        assert_eq!(addr.to_string(), format!("0x{}", "ab".repeat(20)));
    }

    #[test]
    fn test_address_ordering() {
        let low = Address::new([0u8; 20]);
        let mut high = [0u8; 20];
        high[0] = 1;
        assert!(low < Address::new(high));
    }

    #[test]
    fn test_word_types_are_big_endian() {
        let slot = StorageKey::from(U256::from(0x0102u64));
        assert_eq!(&slot.as_bytes()[30..], &[0x01, 0x02]);
        assert_eq!(slot.to_u256(), U256::from(0x0102u64));

        assert!(StorageValue::ZERO.is_zero());
        assert!(!StorageValue::from_u256(U256::one()).is_zero());
        assert!(StorageKey::from_u256(U256::one()) < StorageKey::from_u256(U256::from(2)));
    }

    #[test]
    fn test_word_debug_names_the_type() {
        let topic = format!("{:?}", Hash::new([0x11; 32]));
        assert!(topic.starts_with("Hash(0x1111"));
        assert!(topic.ends_with("11)"));
    }

    #[test]
    fn test_bytes_debug_truncates() {
        let bytes = Bytes::from(vec![0xaa; 12]);
        assert_eq!(format!("{bytes:?}"), "0xaaaaaaaa..(12 bytes)");
    }
}
