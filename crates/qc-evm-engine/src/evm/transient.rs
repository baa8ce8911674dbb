//! # Transient Storage (EIP-1153)
//!
//! Backing store for TLOAD/TSTORE. Lives for one transaction and never
//! reaches the world state.

use crate::domain::value_objects::{Address, StorageKey, StorageValue};
use std::collections::HashMap;

/// Per-transaction transient storage, keyed by contract and slot.
#[derive(Debug, Default, Clone)]
pub struct TransientStorage {
    data: HashMap<(Address, StorageKey), StorageValue>,
}

impl TransientStorage {
    /// Creates a new empty transient storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// TLOAD: zero if the slot was never written.
    #[must_use]
    pub fn tload(&self, address: Address, key: StorageKey) -> StorageValue {
        self.data.get(&(address, key)).copied().unwrap_or_default()
    }

    /// TSTORE. Writing zero drops the slot.
    pub fn tstore(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        if value.is_zero() {
            self.data.remove(&(address, key));
        } else {
            self.data.insert((address, key), value);
        }
    }

    /// Number of non-zero slots across all contracts.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.data.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::U256;

    fn key(n: u64) -> StorageKey {
        StorageKey::from_u256(U256::from(n))
    }

    fn value(n: u64) -> StorageValue {
        StorageValue::from_u256(U256::from(n))
    }

    #[test]
    fn test_tload_unset_returns_zero() {
        let storage = TransientStorage::new();
        assert_eq!(storage.tload(Address::ZERO, key(1)), StorageValue::ZERO);
    }

    #[test]
    fn test_tstore_overwrite_and_clear() {
        let mut storage = TransientStorage::new();
        let addr = Address::new([7u8; 20]);

        storage.tstore(addr, key(1), value(1));
        storage.tstore(addr, key(1), value(2));
        assert_eq!(storage.tload(addr, key(1)), value(2));
        assert_eq!(storage.slot_count(), 1);

        storage.tstore(addr, key(1), StorageValue::ZERO);
        assert_eq!(storage.slot_count(), 0);
    }

    #[test]
    fn test_isolation_between_contracts() {
        let mut storage = TransientStorage::new();
        let addr1 = Address::new([1u8; 20]);
        let addr2 = Address::new([2u8; 20]);

        storage.tstore(addr1, key(1), value(42));
        assert_eq!(storage.tload(addr2, key(1)), StorageValue::ZERO);
    }
}
