//! # Instance
//!
//! The object behind the opaque `QcEvmInstance*` handle. It owns the
//! engine, the live world state, the pending transaction and the error
//! slot. Nothing in it is shared with other instances.

use crate::errors::{ErrorSlot, FfiError};
use qc_evm_engine::adapters::WorldState;
use qc_evm_engine::domain::entities::{EngineConfig, Transaction};
use qc_evm_engine::ports::inbound::ExecutionEngine;
use qc_evm_engine::processor::Evm;

/// One isolated execution context.
pub struct QcEvmInstance {
    pub(crate) engine: Box<dyn ExecutionEngine>,
    pub(crate) state: WorldState,
    pub(crate) pending_tx: Option<Transaction>,
    pub(crate) errors: ErrorSlot,
}

impl QcEvmInstance {
    /// Instance backed by the built-in EVM.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_engine(Box::new(Evm::new(config)))
    }

    /// Instance backed by any engine.
    #[must_use]
    pub fn with_engine(engine: Box<dyn ExecutionEngine>) -> Self {
        Self {
            engine,
            state: WorldState::new(),
            pending_tx: None,
            errors: ErrorSlot::new(),
        }
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    /// Live world state.
    #[must_use]
    pub fn state(&self) -> &WorldState {
        &self.state
    }

    /// Mutable live world state.
    pub fn state_mut(&mut self) -> &mut WorldState {
        &mut self.state
    }

    /// Transaction attached by the last successful `set_tx`.
    #[must_use]
    pub fn pending_tx(&self) -> Option<&Transaction> {
        self.pending_tx.as_ref()
    }

    /// Error slot.
    #[must_use]
    pub fn errors(&self) -> &ErrorSlot {
        &self.errors
    }

    /// Settles a call: clears the slot on success, stores the error
    /// otherwise.
    pub fn record<T>(&mut self, result: Result<T, FfiError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.errors.clear();
                Some(value)
            }
            Err(err) => {
                tracing::debug!(error = %err, code = err.code().as_raw(), "boundary call failed");
                self.errors.set(&err);
                None
            }
        }
    }
}

impl Default for QcEvmInstance {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for QcEvmInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QcEvmInstance")
            .field("chain_id", &self.config().chain_id())
            .field("accounts", &self.state.account_count())
            .field("pending_tx", &self.pending_tx.is_some())
            .field("last_error", &self.errors.message())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    fn assert_send<T: Send>() {}

    #[test]
    fn test_instance_is_send() {
        assert_send::<QcEvmInstance>();
    }

    #[test]
    fn test_fresh_instance() {
        let instance = QcEvmInstance::default();
        assert_eq!(instance.config().chain_id(), 1);
        assert!(instance.pending_tx().is_none());
        assert_eq!(instance.errors().code(), ErrorCode::None);
        assert_eq!(instance.state().account_count(), 0);
    }

    #[test]
    fn test_record() {
        let mut instance = QcEvmInstance::default();

        let failed: Option<()> = instance.record(Err(FfiError::MissingTransactionConfig));
        assert!(failed.is_none());
        assert_eq!(instance.errors().code(), ErrorCode::MissingTransactionConfig);

        assert_eq!(instance.record(Ok(7)), Some(7));
        assert_eq!(instance.errors().code(), ErrorCode::None);
        assert!(instance.errors().message().is_none());
    }
}
