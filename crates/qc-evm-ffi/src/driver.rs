//! # Execution Driver
//!
//! Hands transactions to the instance's engine and decides what happens to
//! the reported state changes.
//!
//! | Entry | Transaction | State |
//! |-------|-------------|-------|
//! | [`execute`] (`DryRun`) | attached | discarded |
//! | [`execute`] (`Commit`) | attached | applied |
//! | [`call_contract`] | built from arguments | applied |
//! | [`transfer`] | built from arguments | applied |
//! | [`deploy`] | creation from arguments | applied |
//!
//! A rejected transaction never reaches the state. A revert or halt still
//! commits what the engine reports for it: the fee debit and the nonce bump.

use crate::errors::FfiError;
use crate::instance::QcEvmInstance;
use primitive_types::U256;
use qc_evm_engine::domain::entities::{Transaction, TransactionResult, TxKind};
use qc_evm_engine::domain::value_objects::{Address, Bytes};
use qc_evm_engine::ports::outbound::StateView;
use tracing::{debug, instrument, warn};

/// Whether reported state changes are applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Run and throw the changes away.
    DryRun,
    /// Run and apply the changes to the live state.
    Commit,
}

/// Runs the attached transaction.
///
/// # Errors
///
/// Returns `MissingTransactionConfig` if nothing is attached and
/// `EngineInternalError` if the engine rejects the transaction.
#[instrument(skip(instance))]
pub fn execute(instance: &mut QcEvmInstance, mode: Mode) -> Result<TransactionResult, FfiError> {
    let tx = instance
        .pending_tx
        .clone()
        .ok_or(FfiError::MissingTransactionConfig)?;
    run(instance, &tx, mode)
}

/// Committed message call from `from` at its current nonce.
///
/// # Errors
///
/// Returns `EngineInternalError` if the engine rejects the transaction.
#[instrument(skip(instance, data), fields(data_len = data.len()))]
pub fn call_contract(
    instance: &mut QcEvmInstance,
    from: Address,
    to: Address,
    data: &[u8],
    value: U256,
    gas_limit: u64,
) -> Result<TransactionResult, FfiError> {
    let tx = Transaction {
        caller: from,
        kind: TxKind::Call(to),
        value,
        data: Bytes::from_slice(data),
        gas_limit,
        gas_price: None,
        nonce: instance.state.nonce(&from),
    };
    run(instance, &tx, Mode::Commit)
}

/// Committed plain value transfer from `from` at its current nonce.
///
/// # Errors
///
/// Returns `EngineInternalError` if the engine rejects the transaction.
#[instrument(skip(instance))]
pub fn transfer(
    instance: &mut QcEvmInstance,
    from: Address,
    to: Address,
    value: U256,
    gas_limit: u64,
) -> Result<TransactionResult, FfiError> {
    let nonce = instance.state.nonce(&from);
    let tx = Transaction::transfer(from, to, value, gas_limit, nonce);
    run(instance, &tx, Mode::Commit)
}

/// Committed contract creation from `deployer` at its current nonce.
///
/// # Errors
///
/// Returns `EngineInternalError` if the engine rejects the transaction.
#[instrument(skip(instance, init_code), fields(code_len = init_code.len()))]
pub fn deploy(
    instance: &mut QcEvmInstance,
    deployer: Address,
    init_code: &[u8],
    gas_limit: u64,
) -> Result<TransactionResult, FfiError> {
    let result = instance
        .engine
        .deploy(
            &instance.state,
            deployer,
            Bytes::from_slice(init_code),
            gas_limit,
        )
        .inspect_err(|e| warn!(error = %e, "deployment rejected"))?;

    settle(instance, &result, Mode::Commit);
    Ok(result)
}

fn run(
    instance: &mut QcEvmInstance,
    tx: &Transaction,
    mode: Mode,
) -> Result<TransactionResult, FfiError> {
    let result = instance
        .engine
        .apply_transaction(&instance.state, tx)
        .inspect_err(|e| warn!(error = %e, "transaction rejected"))?;

    settle(instance, &result, mode);
    Ok(result)
}

fn settle(instance: &mut QcEvmInstance, result: &TransactionResult, mode: Mode) {
    debug!(
        outcome = result.outcome.label(),
        gas_used = result.gas_used,
        changes = result.changes.len(),
        ?mode,
        "engine finished"
    );
    if mode == Mode::Commit {
        instance.state.apply(&result.changes);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{configure, TxArgs};
    use qc_evm_engine::domain::entities::ExecutionOutcome;
    use qc_evm_engine::domain::value_objects::{StorageKey, StorageValue};

    const A: Address = Address::new([0xAA; 20]);
    const B: Address = Address::new([0xBB; 20]);
    const C: Address = Address::new([0xCC; 20]);

    // PUSH1 1, PUSH1 0, SSTORE, STOP
    const STORE_ONE: [u8; 6] = [0x60, 0x01, 0x60, 0x00, 0x55, 0x00];
    // PUSH1 0, PUSH1 0, REVERT
    const ALWAYS_REVERT: [u8; 5] = [0x60, 0x00, 0x60, 0x00, 0xFD];

    fn funded() -> QcEvmInstance {
        let mut instance = QcEvmInstance::default();
        instance.state_mut().set_balance(A, U256::from(0x64));
        instance
    }

    fn attach(instance: &mut QcEvmInstance, to: Option<&str>, gas_limit: u64) {
        let args = TxArgs {
            caller: "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            to,
            value: Some("0x1"),
            gas_limit,
            ..TxArgs::default()
        };
        configure(instance, &args).unwrap();
    }

    #[test]
    fn test_execute_requires_config() {
        let mut instance = funded();
        assert_eq!(
            execute(&mut instance, Mode::DryRun).unwrap_err(),
            FfiError::MissingTransactionConfig
        );
    }

    #[test]
    fn test_dry_run_then_commit() {
        let mut instance = funded();
        attach(
            &mut instance,
            Some("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"),
            21_000,
        );

        let dry = execute(&mut instance, Mode::DryRun).unwrap();
        assert!(dry.outcome.is_success());
        assert_eq!(instance.state().balance(&A), U256::from(0x64));
        assert_eq!(instance.state().balance(&B), U256::zero());

        let committed = execute(&mut instance, Mode::Commit).unwrap();
        assert_eq!(committed.gas_used, 21_000);
        assert_eq!(instance.state().balance(&A), U256::from(0x63));
        assert_eq!(instance.state().balance(&B), U256::one());
        assert_eq!(instance.state().nonce(&A), 1);

        // Configuration survives execution but the nonce is now stale.
        assert!(instance.pending_tx().is_some());
        let stale = execute(&mut instance, Mode::Commit).unwrap_err();
        assert!(matches!(stale, FfiError::EngineInternalError(_)));
        assert_eq!(instance.state().balance(&B), U256::one());
    }

    #[test]
    fn test_transfer_uses_current_nonce() {
        let mut instance = funded();
        for _ in 0..3 {
            let result = transfer(&mut instance, A, B, U256::one(), 21_000).unwrap();
            assert!(result.outcome.is_success());
        }
        assert_eq!(instance.state().nonce(&A), 3);
        assert_eq!(instance.state().balance(&B), U256::from(3));
        assert!(instance.pending_tx().is_none());
    }

    #[test]
    fn test_rejection_changes_nothing() {
        let mut instance = funded();
        let err = transfer(&mut instance, A, B, U256::from(0x65), 21_000).unwrap_err();
        assert!(err.to_string().contains("insufficient funds"));
        assert_eq!(instance.state().balance(&A), U256::from(0x64));
        assert_eq!(instance.state().nonce(&A), 0);
    }

    #[test]
    fn test_call_contract_commits_storage() {
        let mut instance = funded();
        instance.state_mut().set_code(C, Bytes::from_slice(&STORE_ONE));

        let result = call_contract(&mut instance, A, C, &[], U256::zero(), 100_000).unwrap();
        assert!(result.outcome.is_success());
        assert_eq!(
            instance.state().storage(&C, &StorageKey::default()),
            StorageValue::from_u256(U256::one())
        );
    }

    #[test]
    fn test_revert_keeps_only_nonce_and_fee() {
        let mut instance = funded();
        instance.state_mut().set_code(C, Bytes::from_slice(&ALWAYS_REVERT));

        let result = call_contract(&mut instance, A, C, &[], U256::from(5), 100_000).unwrap();
        assert!(matches!(result.outcome, ExecutionOutcome::Revert { .. }));
        // Zero gas price: the value transfer is undone and no fee is due.
        assert_eq!(instance.state().balance(&A), U256::from(0x64));
        assert_eq!(instance.state().balance(&C), U256::zero());
        assert_eq!(instance.state().nonce(&A), 1);
    }

    #[test]
    fn test_deploy_commits_code() {
        let mut instance = funded();
        // Init code returning STORE_ONE as runtime code:
        // PUSH1 6, PUSH1 12, PUSH1 0, CODECOPY, PUSH1 6, PUSH1 0, RETURN
        let mut init = vec![
            0x60, 0x06, 0x60, 0x0C, 0x60, 0x00, 0x39, 0x60, 0x06, 0x60, 0x00, 0xF3,
        ];
        init.extend_from_slice(&STORE_ONE);

        let result = deploy(&mut instance, A, &init, 200_000).unwrap();
        let ExecutionOutcome::Success {
            created_address: Some(address),
            ..
        } = result.outcome
        else {
            panic!("expected successful creation, got {:?}", result.outcome);
        };
        assert_eq!(instance.state().code(&address).as_slice(), &STORE_ONE);
        assert_eq!(instance.state().nonce(&address), 1);
        assert_eq!(instance.state().nonce(&A), 1);
    }
}
