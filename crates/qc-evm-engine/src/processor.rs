//! # Transaction Processor
//!
//! Validates a transaction, charges it, runs its single frame and settles
//! gas. Every write lands in a [`PendingState`]; the result carries the net
//! changes and the caller decides whether to apply them.
//!
//! ## Accounting
//!
//! | Outcome | Fee | Nonce | Value, storage, code |
//! |---------|-----|-------|----------------------|
//! | Success | gas used | bumped | kept |
//! | Revert  | gas used | bumped | rolled back |
//! | Halt    | gas limit | bumped | rolled back |

use crate::adapters::access_list::InMemoryAccessList;
use crate::adapters::pending::PendingState;
use crate::domain::entities::{
    EngineConfig, EvmVersion, ExecutionContext, ExecutionOutcome, Transaction, TransactionResult,
    TxKind,
};
use crate::domain::services::{compute_contract_address, intrinsic_gas};
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::{EngineError, VmError};
use crate::evm::gas::{self, costs};
use crate::evm::interpreter::{FrameOutcome, FrameResult, Interpreter};
use crate::evm::transient::TransientStorage;
use crate::ports::inbound::ExecutionEngine;
use crate::ports::outbound::StateView;
use tracing::{debug, instrument, warn};

/// Transaction prefix checks that passed, carried into execution.
struct Admission {
    gas_price: U256,
    intrinsic: u64,
    sender_nonce: u64,
    next_nonce: u64,
    /// Up-front fee: `gas_limit * gas_price`.
    max_fee: U256,
    /// Balance the sender needs: `max_fee + value`.
    required: U256,
}

/// Single-frame EVM engine.
#[derive(Clone, Debug, Default)]
pub struct Evm {
    config: EngineConfig,
}

impl Evm {
    /// Creates an engine with the given configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    fn version(&self) -> EvmVersion {
        self.config.evm_version
    }

    /// Checks everything that can reject a transaction before state is
    /// touched.
    fn admit(&self, state: &dyn StateView, tx: &Transaction) -> Result<Admission, EngineError> {
        let config = &self.config;
        let gas_price = tx.gas_price.unwrap_or(config.default_gas_price);

        if !config.disable_base_fee && gas_price < config.block.base_fee {
            return Err(EngineError::GasPriceBelowBaseFee {
                gas_price,
                base_fee: config.block.base_fee,
            });
        }

        if !config.disable_block_gas_limit && tx.gas_limit > config.block.gas_limit {
            return Err(EngineError::GasLimitExceedsBlock {
                limit: tx.gas_limit,
                block_limit: config.block.gas_limit,
            });
        }

        let is_create = tx.kind.is_create();
        if is_create
            && self.version().is_enabled(EvmVersion::Shanghai)
            && tx.data.len() > config.max_init_code_size
        {
            return Err(EngineError::InitCodeSizeExceeded {
                size: tx.data.len(),
                max: config.max_init_code_size,
            });
        }

        let intrinsic = intrinsic_gas(tx.data.as_slice(), is_create, self.version());
        if tx.gas_limit < intrinsic {
            return Err(EngineError::IntrinsicGasTooLow {
                intrinsic,
                limit: tx.gas_limit,
            });
        }

        let sender_nonce = state.nonce(&tx.caller);
        if !config.disable_nonce_check && sender_nonce != tx.nonce {
            return Err(EngineError::NonceMismatch {
                address: tx.caller,
                expected: sender_nonce,
                actual: tx.nonce,
            });
        }
        let next_nonce = sender_nonce
            .checked_add(1)
            .ok_or(EngineError::NonceOverflow(tx.caller))?;

        let max_fee = U256::from(tx.gas_limit)
            .checked_mul(gas_price)
            .ok_or(EngineError::CostOverflow)?;
        let required = max_fee
            .checked_add(tx.value)
            .ok_or(EngineError::CostOverflow)?;

        let available = state.balance(&tx.caller);
        if !config.disable_balance_check && available < required {
            return Err(EngineError::InsufficientFunds {
                required,
                available,
            });
        }

        Ok(Admission {
            gas_price,
            intrinsic,
            sender_nonce,
            next_nonce,
            max_fee,
            required,
        })
    }

    /// Runs the frame of an admitted transaction. On return the pending
    /// state holds the frame's effects, or none of them if it failed.
    fn run_frame(
        &self,
        pending: &mut PendingState<'_>,
        tx: &Transaction,
        target: Address,
        frame_gas: u64,
        gas_price: U256,
    ) -> FrameResult {
        let checkpoint = pending.checkpoint();
        let is_create = tx.kind.is_create();

        if is_create {
            let existing = pending.account(&target).unwrap_or_default();
            if existing.nonce != 0 || !existing.code.is_empty() {
                return halted(VmError::CreateCollision(target));
            }
            // EIP-161: contracts start at nonce 1
            pending.set_nonce(target, 1);
        }

        if !tx.value.is_zero() {
            pending.sub_balance(tx.caller, tx.value);
            pending.add_balance(target, tx.value);
        }

        let code = if is_create {
            tx.data.clone()
        } else {
            pending.code(&target)
        };
        let calldata = if is_create {
            Bytes::new()
        } else {
            tx.data.clone()
        };

        let mut result = if code.is_empty() {
            FrameResult {
                outcome: FrameOutcome::Return(Bytes::new()),
                gas_left: frame_gas,
                refund: 0,
                logs: Vec::new(),
            }
        } else {
            let context = ExecutionContext::new_transaction(
                tx.caller,
                target,
                tx.value,
                calldata,
                frame_gas,
                gas_price,
                self.config.block.clone(),
            );
            let mut access_list = InMemoryAccessList::for_transaction(
                tx.caller,
                target,
                self.config.block.coinbase,
                self.version(),
            );
            let mut transient = TransientStorage::new();
            Interpreter::new(
                &context,
                code.as_slice(),
                self.version(),
                pending,
                &mut access_list,
                &mut transient,
            )
            .run()
        };

        if is_create {
            if let FrameOutcome::Return(runtime) = &result.outcome {
                let runtime = runtime.clone();
                match self.deposit_cost(&runtime) {
                    Ok(cost) if cost <= result.gas_left => {
                        result.gas_left -= cost;
                        pending.set_code(target, runtime);
                    }
                    Ok(_) => result = halted(VmError::OutOfGas),
                    Err(reason) => result = halted(reason),
                }
            }
        }

        if !matches!(result.outcome, FrameOutcome::Return(_)) {
            pending.revert_to(checkpoint);
        }
        result
    }

    /// Gas for storing `runtime` as contract code.
    fn deposit_cost(&self, runtime: &Bytes) -> Result<u64, VmError> {
        if runtime.len() > self.config.max_code_size {
            return Err(VmError::CodeSizeExceeded {
                size: runtime.len(),
                max: self.config.max_code_size,
            });
        }
        // EIP-3541
        if self.version().is_enabled(EvmVersion::London)
            && runtime.as_slice().first() == Some(&0xEF)
        {
            return Err(VmError::InvalidCodePrefix);
        }
        Ok(costs::CODE_DEPOSIT_BYTE * runtime.len() as u64)
    }
}

fn halted(reason: VmError) -> FrameResult {
    FrameResult {
        outcome: FrameOutcome::Halt(reason),
        gas_left: 0,
        refund: 0,
        logs: Vec::new(),
    }
}

impl ExecutionEngine for Evm {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[instrument(
        skip(self, state, tx),
        fields(caller = %tx.caller, create = tx.kind.is_create(), gas_limit = tx.gas_limit)
    )]
    fn apply_transaction(
        &self,
        state: &dyn StateView,
        tx: &Transaction,
    ) -> Result<TransactionResult, EngineError> {
        let admission = self
            .admit(state, tx)
            .inspect_err(|e| warn!(error = %e, "Transaction rejected"))?;

        let mut pending = PendingState::new(state);

        if self.config.disable_balance_check {
            let balance = pending.balance(&tx.caller);
            if balance < admission.required {
                pending.set_balance(tx.caller, admission.required);
            }
        }

        // Up-front fee and nonce bump survive every outcome
        pending.sub_balance(tx.caller, admission.max_fee);
        pending.set_nonce(tx.caller, admission.next_nonce);

        let (target, created) = match tx.kind {
            TxKind::Call(to) => (to, None),
            TxKind::Create => {
                let address = compute_contract_address(tx.caller, admission.sender_nonce);
                (address, Some(address))
            }
        };

        let frame_gas = tx.gas_limit - admission.intrinsic;
        let frame = self.run_frame(&mut pending, tx, target, frame_gas, admission.gas_price);

        let gas_spent = tx.gas_limit - frame.gas_left;
        let gas_refunded = if matches!(frame.outcome, FrameOutcome::Return(_)) {
            gas::capped_refund(gas_spent, frame.refund, self.version())
        } else {
            0
        };
        let gas_used = gas_spent - gas_refunded;

        // Reimburse unused gas, then pay the priority fee
        let unused = U256::from(tx.gas_limit - gas_used);
        pending.add_balance(tx.caller, unused.saturating_mul(admission.gas_price));

        let tip_per_gas = if self.config.disable_base_fee {
            admission.gas_price
        } else {
            admission.gas_price.saturating_sub(self.config.block.base_fee)
        };
        let tip = tip_per_gas.saturating_mul(U256::from(gas_used));
        if !tip.is_zero() {
            pending.add_balance(self.config.block.coinbase, tip);
        }

        let outcome = match frame.outcome {
            FrameOutcome::Return(output) => ExecutionOutcome::Success {
                output,
                logs: frame.logs,
                created_address: created,
            },
            FrameOutcome::Revert(output) => ExecutionOutcome::Revert { output },
            FrameOutcome::Halt(reason) => ExecutionOutcome::Halt { reason },
        };

        let changes = pending.into_changes();
        debug!(
            outcome = outcome.label(),
            gas_used,
            gas_refunded,
            changes = changes.len(),
            "Transaction executed"
        );

        Ok(TransactionResult {
            outcome,
            gas_used,
            gas_refunded,
            changes,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
