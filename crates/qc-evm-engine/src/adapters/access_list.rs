//! # Access List Adapter
//!
//! EIP-2929 warm/cold account and storage tracking for one transaction.

use crate::domain::entities::EvmVersion;
use crate::domain::value_objects::{Address, StorageKey};
use crate::ports::outbound::{AccessList, AccessStatus};
use std::collections::{HashMap, HashSet};

/// Highest precompile address per fork (0x0a joins with Cancun).
fn precompile_count(version: EvmVersion) -> u8 {
    if version.is_enabled(EvmVersion::Cancun) {
        0x0a
    } else {
        0x09
    }
}

/// In-memory access list.
#[derive(Clone, Debug, Default)]
pub struct InMemoryAccessList {
    warm_accounts: HashSet<Address>,
    warm_storage: HashMap<Address, HashSet<StorageKey>>,
}

impl InMemoryAccessList {
    /// Create a new empty access list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Access list as it stands before the first opcode of a transaction.
    ///
    /// Precompiles, the sender and the target are warm. From Shanghai the
    /// coinbase is warm as well (EIP-3651).
    #[must_use]
    pub fn for_transaction(
        origin: Address,
        target: Address,
        coinbase: Address,
        version: EvmVersion,
    ) -> Self {
        let mut list = Self::new();
        for i in 1..=precompile_count(version) {
            let mut addr = [0u8; 20];
            addr[19] = i;
            list.warm_accounts.insert(Address::new(addr));
        }
        list.warm_accounts.insert(origin);
        list.warm_accounts.insert(target);
        if version.is_enabled(EvmVersion::Shanghai) {
            list.warm_accounts.insert(coinbase);
        }
        list
    }

    /// Number of warm accounts.
    #[must_use]
    pub fn warm_account_count(&self) -> usize {
        self.warm_accounts.len()
    }
}

impl AccessList for InMemoryAccessList {
    fn touch_account(&mut self, address: Address) -> AccessStatus {
        if self.warm_accounts.insert(address) {
            AccessStatus::Cold
        } else {
            AccessStatus::Warm
        }
    }

    fn touch_storage(&mut self, address: Address, key: StorageKey) -> AccessStatus {
        if self.warm_storage.entry(address).or_default().insert(key) {
            AccessStatus::Cold
        } else {
            AccessStatus::Warm
        }
    }

    fn is_account_warm(&self, address: Address) -> bool {
        self.warm_accounts.contains(&address)
    }

    fn is_storage_warm(&self, address: Address, key: StorageKey) -> bool {
        self.warm_storage
            .get(&address)
            .is_some_and(|slots| slots.contains(&key))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::U256;

    fn addr(n: u8) -> Address {
        Address::new([n; 20])
    }

    #[test]
    fn test_account_access() {
        let mut list = InMemoryAccessList::new();

        // First access is cold
        assert_eq!(list.touch_account(addr(1)), AccessStatus::Cold);
        assert!(list.is_account_warm(addr(1)));

        // Second access is warm
        assert_eq!(list.touch_account(addr(1)), AccessStatus::Warm);
    }

    #[test]
    fn test_storage_access() {
        let mut list = InMemoryAccessList::new();
        let key = StorageKey::from_u256(U256::from(7));

        assert_eq!(list.touch_storage(addr(1), key), AccessStatus::Cold);
        assert!(list.is_storage_warm(addr(1), key));
        assert_eq!(list.touch_storage(addr(1), key), AccessStatus::Warm);

        // Same slot number on another contract is a different slot
        assert!(!list.is_storage_warm(addr(2), key));
    }

    #[test]
    fn test_for_transaction_berlin() {
        let list = InMemoryAccessList::for_transaction(
            addr(0xaa),
            addr(0xbb),
            addr(0xcc),
            EvmVersion::Berlin,
        );

        let mut ecrecover = [0u8; 20];
        ecrecover[19] = 1;
        assert!(list.is_account_warm(Address::new(ecrecover)));
        assert!(list.is_account_warm(addr(0xaa)));
        assert!(list.is_account_warm(addr(0xbb)));
        assert!(!list.is_account_warm(addr(0xcc)));
        assert_eq!(list.warm_account_count(), 11);
    }

    #[test]
    fn test_for_transaction_cancun_warms_coinbase() {
        let list = InMemoryAccessList::for_transaction(
            addr(0xaa),
            addr(0xbb),
            addr(0xcc),
            EvmVersion::Cancun,
        );

        let mut point_eval = [0u8; 20];
        point_eval[19] = 0x0a;
        assert!(list.is_account_warm(Address::new(point_eval)));
        assert!(list.is_account_warm(addr(0xcc)));
        assert_eq!(list.warm_account_count(), 13);
    }
}
