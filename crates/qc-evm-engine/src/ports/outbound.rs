//! # Driven Ports (SPI - Outbound)
//!
//! Read access to world state and warm/cold access tracking. The engine
//! never writes through these traits: writes are reported as
//! `StateChange`s and applied by whoever owns the state.

use crate::domain::entities::AccountInfo;
use crate::domain::value_objects::{Address, StorageKey, StorageValue, U256};

// =============================================================================
// STATE VIEW
// =============================================================================

/// Read-only view of world state.
pub trait StateView {
    /// Account record, `None` if the account was never created.
    fn account(&self, address: &Address) -> Option<AccountInfo>;

    /// Storage slot value, zero if never written.
    fn storage(&self, address: &Address, key: &StorageKey) -> StorageValue;

    /// Balance, zero for unknown accounts.
    fn balance(&self, address: &Address) -> U256 {
        self.account(address)
            .map_or_else(U256::zero, |account| account.balance)
    }

    /// Nonce, zero for unknown accounts.
    fn nonce(&self, address: &Address) -> u64 {
        self.account(address).map_or(0, |account| account.nonce)
    }
}

// =============================================================================
// ACCESS LIST (EIP-2929)
// =============================================================================

/// Access status for EIP-2929 gas calculation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessStatus {
    /// First access in this transaction.
    Cold,
    /// Already accessed in this transaction.
    Warm,
}

impl AccessStatus {
    /// Returns true for `Cold`.
    #[must_use]
    pub const fn is_cold(self) -> bool {
        matches!(self, Self::Cold)
    }
}

/// Warm/cold tracking for accounts and storage slots.
pub trait AccessList {
    /// Marks an account as accessed, returning its previous status.
    fn touch_account(&mut self, address: Address) -> AccessStatus;

    /// Marks a storage slot as accessed, returning its previous status.
    fn touch_storage(&mut self, address: Address, key: StorageKey) -> AccessStatus;

    /// Checks whether an account is warm without touching it.
    fn is_account_warm(&self, address: Address) -> bool;

    /// Checks whether a storage slot is warm without touching it.
    fn is_storage_warm(&self, address: Address, key: StorageKey) -> bool;
}
