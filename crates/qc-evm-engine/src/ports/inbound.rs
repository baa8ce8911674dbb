//! # Driving Ports (API - Inbound)
//!
//! The surface embedders program against. Hosts hold a
//! `Box<dyn ExecutionEngine>` and never see the interpreter.

use crate::domain::entities::{EngineConfig, Transaction, TransactionResult};
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::EngineError;
use crate::ports::outbound::StateView;

/// Transaction execution against a caller-owned state.
///
/// Implementations must not assume the reported changes get applied: the
/// same state may be used again for a dry run.
pub trait ExecutionEngine: Send {
    /// Active configuration.
    fn config(&self) -> &EngineConfig;

    /// Validates and runs `tx` against `state`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the transaction is invalid for this state.
    /// Reverts and halts are results, not errors.
    fn apply_transaction(
        &self,
        state: &dyn StateView,
        tx: &Transaction,
    ) -> Result<TransactionResult, EngineError>;

    /// Runs a zero-value creation from `deployer` at its current nonce,
    /// using the default gas price.
    ///
    /// # Errors
    ///
    /// Same as [`ExecutionEngine::apply_transaction`].
    fn deploy(
        &self,
        state: &dyn StateView,
        deployer: Address,
        init_code: Bytes,
        gas_limit: u64,
    ) -> Result<TransactionResult, EngineError> {
        let nonce = state.nonce(&deployer);
        let tx = Transaction::create(deployer, init_code, gas_limit, nonce);
        self.apply_transaction(state, &tx)
    }
}
