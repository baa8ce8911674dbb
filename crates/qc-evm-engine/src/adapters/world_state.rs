//! # World State Adapter
//!
//! In-memory world state owned by the host. Transactions read it through
//! [`StateView`] and their reported changes are applied with
//! [`WorldState::apply`].

use crate::domain::entities::{AccountInfo, StateChange};
use crate::domain::value_objects::{Address, Bytes, StorageKey, StorageValue, U256};
use crate::ports::outbound::StateView;
use std::collections::HashMap;

/// In-memory accounts and storage.
#[derive(Clone, Debug, Default)]
pub struct WorldState {
    accounts: HashMap<Address, AccountInfo>,
    storage: HashMap<(Address, StorageKey), StorageValue>,
}

impl WorldState {
    /// Create a new empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn account_mut(&mut self, address: Address) -> &mut AccountInfo {
        self.accounts.entry(address).or_default()
    }

    /// Set balance for an address, creating the account if needed.
    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.account_mut(address).balance = balance;
    }

    /// Set nonce for an address, creating the account if needed.
    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.account_mut(address).nonce = nonce;
    }

    /// Install runtime code at an address, creating the account if needed.
    pub fn set_code(&mut self, address: Address, code: Bytes) {
        self.account_mut(address).code = code;
    }

    /// Runtime code, empty for unknown accounts.
    #[must_use]
    pub fn code(&self, address: &Address) -> Bytes {
        self.accounts
            .get(address)
            .map(|account| account.code.clone())
            .unwrap_or_default()
    }

    /// Write a storage slot, creating the account if needed. Zero clears
    /// the slot.
    pub fn set_storage(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        self.account_mut(address);
        if value.is_zero() {
            self.storage.remove(&(address, key));
        } else {
            self.storage.insert((address, key), value);
        }
    }

    /// Number of accounts ever created.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Number of non-zero storage slots across all contracts.
    #[must_use]
    pub fn storage_slot_count(&self) -> usize {
        self.storage.len()
    }

    /// Apply the changes of one transaction, in order.
    pub fn apply(&mut self, changes: &[StateChange]) {
        for change in changes {
            match change {
                StateChange::AccountUpdate {
                    address,
                    balance,
                    nonce,
                } => {
                    let account = self.account_mut(*address);
                    account.balance = *balance;
                    account.nonce = *nonce;
                }
                StateChange::CodeDeploy { address, code } => {
                    self.set_code(*address, code.clone());
                }
                StateChange::StorageWrite {
                    address,
                    key,
                    value,
                } => {
                    self.set_storage(*address, *key, *value);
                }
            }
        }
    }
}

impl StateView for WorldState {
    fn account(&self, address: &Address) -> Option<AccountInfo> {
        self.accounts.get(address).cloned()
    }

    fn storage(&self, address: &Address, key: &StorageKey) -> StorageValue {
        self.storage
            .get(&(*address, *key))
            .copied()
            .unwrap_or(StorageValue::ZERO)
    }
}

// =============================================================================
// TESTS
// =============================================================================
