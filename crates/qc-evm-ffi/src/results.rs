//! # Result Materializer
//!
//! Copies engine results into `#[repr(C)]` structures owned by the caller,
//! and releases them again.
//!
//! ## Ownership
//!
//! Every pointer inside a result is a fresh allocation owned by that result
//! alone. Freeing the top-level pointer once releases all of them:
//!
//! | Field | Allocation | Released as |
//! |-------|------------|-------------|
//! | `output` | `Box<[u8]>` of `output_len` | boxed slice |
//! | `logs` | `Box<[QcEvmLog]>` of `logs_len` | boxed slice, then each log |
//! | `QcEvmLog::topics` | `Box<[*mut c_char]>` of `topics_len` | boxed slice of `CString`s |
//! | address strings | `CString` | `CString::from_raw` |
//!
//! Empty buffers are null with a zero length.
//!
//! Everything is first built as owned Rust values, so a failed allocation
//! part way through drops what was already built; raw pointers are only
//! produced once nothing can fail any more.

use crate::codec::{format_address, format_hash};
use crate::errors::FfiError;
use qc_evm_engine::domain::entities::{ExecutionOutcome, Log, TransactionResult};
use std::ffi::{c_char, c_int, CString};
use std::ptr;

/// Outcome tag: STOP/RETURN.
pub const STATUS_SUCCESS: c_int = 1;
/// Outcome tag: REVERT.
pub const STATUS_REVERT: c_int = 0;
/// Outcome tag: exceptional halt.
pub const STATUS_HALT: c_int = -1;

/// Integer tag of an outcome.
#[must_use]
pub const fn status_of(outcome: &ExecutionOutcome) -> c_int {
    match outcome {
        ExecutionOutcome::Success { .. } => STATUS_SUCCESS,
        ExecutionOutcome::Revert { .. } => STATUS_REVERT,
        ExecutionOutcome::Halt { .. } => STATUS_HALT,
    }
}

// =============================================================================
// C LAYOUT
// =============================================================================

/// One log record.
#[repr(C)]
#[derive(Debug)]
pub struct QcEvmLog {
    /// Emitting contract, full-width hex.
    pub address: *mut c_char,
    /// Topics, full-width hex, in order.
    pub topics: *mut *mut c_char,
    /// Number of topics.
    pub topics_len: usize,
    /// Log data.
    pub data: *mut u8,
    /// Length of `data`.
    pub data_len: usize,
}

/// Result of `qc_evm_execute`, `qc_evm_execute_commit`,
/// `qc_evm_call_contract` and `qc_evm_transfer`.
#[repr(C)]
#[derive(Debug)]
pub struct QcEvmExecutionResult {
    /// 1 success, 0 revert, -1 halt.
    pub status: c_int,
    /// Gas charged after refund.
    pub gas_used: u64,
    /// Gas refunded.
    pub gas_refunded: u64,
    /// Return data, revert data, or deployed code for a creation.
    pub output: *mut u8,
    /// Length of `output`.
    pub output_len: usize,
    /// Logs in emission order (success only).
    pub logs: *mut QcEvmLog,
    /// Number of logs.
    pub logs_len: usize,
    /// New contract address for a successful creation, null otherwise.
    pub created_address: *mut c_char,
}

/// Result of `qc_evm_deploy_contract`.
#[repr(C)]
#[derive(Debug)]
pub struct QcEvmDeploymentResult {
    /// 1 success, 0 revert, -1 halt.
    pub status: c_int,
    /// New contract address on success, null otherwise.
    pub contract_address: *mut c_char,
    /// Gas charged after refund.
    pub gas_used: u64,
    /// Gas refunded.
    pub gas_refunded: u64,
}

// =============================================================================
// OWNED STAGING
// =============================================================================

struct OwnedLog {
    address: CString,
    topics: Vec<CString>,
    data: Box<[u8]>,
}

impl OwnedLog {
    fn build(log: &Log) -> Result<Self, FfiError> {
        let mut topics = Vec::new();
        topics
            .try_reserve_exact(log.topics.len())
            .map_err(|_| FfiError::AllocationFailure("log topics"))?;
        for topic in &log.topics {
            topics.push(c_string(format_hash(topic))?);
        }
        Ok(Self {
            address: c_string(format_address(&log.address))?,
            topics,
            data: boxed_bytes(log.data.as_slice(), "log data")?,
        })
    }

    fn into_raw(self) -> QcEvmLog {
        let (topics, topics_len) = if self.topics.is_empty() {
            (ptr::null_mut(), 0)
        } else {
            let raw: Box<[*mut c_char]> = self
                .topics
                .into_iter()
                .map(CString::into_raw)
                .collect();
            let len = raw.len();
            (Box::into_raw(raw).cast::<*mut c_char>(), len)
        };
        let (data, data_len) = raw_bytes(self.data);
        QcEvmLog {
            address: self.address.into_raw(),
            topics,
            topics_len,
            data,
            data_len,
        }
    }
}

fn c_string(text: String) -> Result<CString, FfiError> {
    CString::new(text).map_err(|_| FfiError::AllocationFailure("string contains NUL"))
}

/// Moves `text` into a caller-owned C string (released with
/// [`free_c_string`]).
pub(crate) fn into_raw_string(text: String) -> Result<*mut c_char, FfiError> {
    c_string(text).map(CString::into_raw)
}

fn boxed_bytes(bytes: &[u8], what: &'static str) -> Result<Box<[u8]>, FfiError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(bytes.len())
        .map_err(|_| FfiError::AllocationFailure(what))?;
    buffer.extend_from_slice(bytes);
    Ok(buffer.into_boxed_slice())
}

fn raw_bytes(bytes: Box<[u8]>) -> (*mut u8, usize) {
    if bytes.is_empty() {
        (ptr::null_mut(), 0)
    } else {
        let len = bytes.len();
        (Box::into_raw(bytes).cast::<u8>(), len)
    }
}

// =============================================================================
// MATERIALIZE
// =============================================================================

impl QcEvmExecutionResult {
    /// Copies `result` into a caller-owned allocation.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailure` if any buffer cannot be allocated; nothing
    /// is leaked in that case.
    pub fn materialize(result: &TransactionResult) -> Result<*mut Self, FfiError> {
        let (output, logs, created) = match &result.outcome {
            ExecutionOutcome::Success {
                output,
                logs,
                created_address,
            } => (output.as_slice(), logs.as_slice(), created_address.as_ref()),
            ExecutionOutcome::Revert { output } => (output.as_slice(), &[][..], None),
            ExecutionOutcome::Halt { .. } => (&[][..], &[][..], None),
        };

        let output = boxed_bytes(output, "output")?;
        let mut owned_logs = Vec::new();
        owned_logs
            .try_reserve_exact(logs.len())
            .map_err(|_| FfiError::AllocationFailure("logs"))?;
        for log in logs {
            owned_logs.push(OwnedLog::build(log)?);
        }
        let created = created
            .map(|address| c_string(format_address(address)))
            .transpose()?;

        // Nothing below can fail.
        let (output, output_len) = raw_bytes(output);
        let (logs, logs_len) = if owned_logs.is_empty() {
            (ptr::null_mut(), 0)
        } else {
            let raw: Box<[QcEvmLog]> = owned_logs.into_iter().map(OwnedLog::into_raw).collect();
            let len = raw.len();
            (Box::into_raw(raw).cast::<QcEvmLog>(), len)
        };

        Ok(Box::into_raw(Box::new(Self {
            status: status_of(&result.outcome),
            gas_used: result.gas_used,
            gas_refunded: result.gas_refunded,
            output,
            output_len,
            logs,
            logs_len,
            created_address: created.map_or(ptr::null_mut(), CString::into_raw),
        })))
    }
}

impl QcEvmDeploymentResult {
    /// Copies a creation result into a caller-owned allocation.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailure` if the address string cannot be built.
    pub fn materialize(result: &TransactionResult) -> Result<*mut Self, FfiError> {
        let address = match &result.outcome {
            ExecutionOutcome::Success {
                created_address: Some(address),
                ..
            } => Some(c_string(format_address(address))?),
            _ => None,
        };

        Ok(Box::into_raw(Box::new(Self {
            status: status_of(&result.outcome),
            contract_address: address.map_or(ptr::null_mut(), CString::into_raw),
            gas_used: result.gas_used,
            gas_refunded: result.gas_refunded,
        })))
    }
}

// =============================================================================
// RELEASE
// =============================================================================

/// Releases a string returned by the boundary.
///
/// # Safety
///
/// `ptr` must be null or a string returned by this library that has not been
/// freed yet.
pub unsafe fn free_c_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

unsafe fn free_bytes(ptr: *mut u8, len: usize) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)));
    }
}

unsafe fn free_log(log: &QcEvmLog) {
    free_c_string(log.address);
    if !log.topics.is_null() {
        let topics = Box::from_raw(ptr::slice_from_raw_parts_mut(log.topics, log.topics_len));
        for &topic in topics.iter() {
            free_c_string(topic);
        }
    }
    free_bytes(log.data, log.data_len);
}

/// Releases an execution result and everything it points to.
///
/// # Safety
///
/// `ptr` must be null or a result returned by this library that has not been
/// freed yet, with its fields unmodified.
pub unsafe fn free_execution_result(ptr: *mut QcEvmExecutionResult) {
    if ptr.is_null() {
        return;
    }
    let result = Box::from_raw(ptr);
    free_bytes(result.output, result.output_len);
    if !result.logs.is_null() {
        let logs = Box::from_raw(ptr::slice_from_raw_parts_mut(result.logs, result.logs_len));
        for log in logs.iter() {
            free_log(log);
        }
    }
    free_c_string(result.created_address);
}

/// Releases a deployment result.
///
/// # Safety
///
/// Same as [`free_execution_result`].
pub unsafe fn free_deployment_result(ptr: *mut QcEvmDeploymentResult) {
    if ptr.is_null() {
        return;
    }
    let result = Box::from_raw(ptr);
    free_c_string(result.contract_address);
}

// =============================================================================
// TESTS
// =============================================================================
