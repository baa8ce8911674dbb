//! # Pending State
//!
//! Journaled overlay over a read-only [`StateView`]. The processor and the
//! interpreter write here during one transaction; checkpoints roll back the
//! frame on revert or halt, and [`PendingState::into_changes`] diffs the
//! overlay against the base to produce the reported state changes.

use crate::domain::entities::{AccountInfo, StateChange};
use crate::domain::value_objects::{Address, Bytes, StorageKey, StorageValue, U256};
use crate::ports::outbound::StateView;
use std::collections::BTreeMap;

#[derive(Debug)]
enum JournalEntry {
    Account {
        address: Address,
        previous: Option<AccountInfo>,
    },
    Storage {
        address: Address,
        key: StorageKey,
        previous: Option<StorageValue>,
    },
}

/// Position in the journal to roll back to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// Per-transaction write overlay.
pub struct PendingState<'a> {
    base: &'a dyn StateView,
    accounts: BTreeMap<Address, AccountInfo>,
    storage: BTreeMap<(Address, StorageKey), StorageValue>,
    journal: Vec<JournalEntry>,
}

impl<'a> PendingState<'a> {
    /// Empty overlay over `base`.
    #[must_use]
    pub fn new(base: &'a dyn StateView) -> Self {
        Self {
            base,
            accounts: BTreeMap::new(),
            storage: BTreeMap::new(),
            journal: Vec::new(),
        }
    }

    /// Marks the current position of the journal.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.journal.len())
    }

    /// Undoes every write made since `checkpoint`.
    pub fn revert_to(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.0 {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            match entry {
                JournalEntry::Account { address, previous } => match previous {
                    Some(account) => {
                        self.accounts.insert(address, account);
                    }
                    None => {
                        self.accounts.remove(&address);
                    }
                },
                JournalEntry::Storage {
                    address,
                    key,
                    previous,
                } => match previous {
                    Some(value) => {
                        self.storage.insert((address, key), value);
                    }
                    None => {
                        self.storage.remove(&(address, key));
                    }
                },
            }
        }
    }

    fn account_mut(&mut self, address: Address) -> &mut AccountInfo {
        let previous = self.accounts.get(&address).cloned();
        self.journal.push(JournalEntry::Account { address, previous });

        let base = self.base;
        self.accounts
            .entry(address)
            .or_insert_with(|| base.account(&address).unwrap_or_default())
    }

    /// Sets an account balance.
    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.account_mut(address).balance = balance;
    }

    /// Credits an account (saturating at 2^256 - 1).
    pub fn add_balance(&mut self, address: Address, amount: U256) {
        let account = self.account_mut(address);
        account.balance = account.balance.saturating_add(amount);
    }

    /// Debits an account (saturating at zero). Callers check funds first.
    pub fn sub_balance(&mut self, address: Address, amount: U256) {
        let account = self.account_mut(address);
        account.balance = account.balance.saturating_sub(amount);
    }

    /// Sets an account nonce.
    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.account_mut(address).nonce = nonce;
    }

    /// Installs runtime code.
    pub fn set_code(&mut self, address: Address, code: Bytes) {
        self.account_mut(address).code = code;
    }

    /// Runtime code of an account, empty if none.
    #[must_use]
    pub fn code(&self, address: &Address) -> Bytes {
        self.account(address)
            .map(|account| account.code)
            .unwrap_or_default()
    }

    /// Writes a storage slot.
    pub fn set_storage(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        let previous = self.storage.insert((address, key), value);
        self.journal.push(JournalEntry::Storage {
            address,
            key,
            previous,
        });
    }

    /// Slot value at the start of the transaction.
    #[must_use]
    pub fn original_storage(&self, address: &Address, key: &StorageKey) -> StorageValue {
        self.base.storage(address, key)
    }

    /// Net effect of the transaction against the base state, sorted by
    /// address then slot. Writes that restored the original value are
    /// dropped.
    #[must_use]
    pub fn into_changes(self) -> Vec<StateChange> {
        let Self {
            base,
            accounts,
            storage,
            ..
        } = self;

        let mut by_address: BTreeMap<Address, Vec<StateChange>> = BTreeMap::new();

        for (address, account) in accounts {
            let before = base.account(&address).unwrap_or_default();
            let entry = by_address.entry(address).or_default();
            if account.balance != before.balance || account.nonce != before.nonce {
                entry.push(StateChange::AccountUpdate {
                    address,
                    balance: account.balance,
                    nonce: account.nonce,
                });
            }
            if account.code != before.code {
                entry.push(StateChange::CodeDeploy {
                    address,
                    code: account.code,
                });
            }
        }

        for ((address, key), value) in storage {
            if value != base.storage(&address, &key) {
                by_address
                    .entry(address)
                    .or_default()
                    .push(StateChange::StorageWrite {
                        address,
                        key,
                        value,
                    });
            }
        }

        by_address.into_values().flatten().collect()
    }
}

impl StateView for PendingState<'_> {
    fn account(&self, address: &Address) -> Option<AccountInfo> {
        match self.accounts.get(address) {
            Some(account) => Some(account.clone()),
            None => self.base.account(address),
        }
    }

    fn storage(&self, address: &Address, key: &StorageKey) -> StorageValue {
        match self.storage.get(&(*address, *key)) {
            Some(value) => *value,
            None => self.base.storage(address, key),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
