//! # C API
//!
//! The `extern "C"` entry points declared in `include/qc_evm_ffi.h`.
//!
//! Conventions shared by every function:
//!
//! - Status-returning calls give `0` on success and `-1` on failure.
//! - Pointer-returning calls give null on failure.
//! - Failures on a live instance leave a message in its error slot
//!   (`qc_evm_get_last_error`); success clears it.
//! - A null instance handle fails without touching any slot.
//! - Panics are caught here and reported as `EngineInternalError`.

use crate::codec::{
    address_arg, byte_slice, format_bytes, format_u256, optional_str, required_str, u256_arg,
};
use crate::config::{engine_config_from_json, ConfigError, QcEvmConfig, QcEvmPreset};
use crate::driver::{self, Mode};
use crate::errors::FfiError;
use crate::instance::QcEvmInstance;
use crate::logging::{init_logging, LoggingConfig};
use crate::results::{
    free_c_string, free_deployment_result, free_execution_result, into_raw_string,
    QcEvmDeploymentResult, QcEvmExecutionResult,
};
use crate::transaction::{configure, TxArgs};
use primitive_types::U256;
use qc_evm_engine::domain::entities::EngineConfig;
use qc_evm_engine::domain::value_objects::{Bytes, StorageKey, StorageValue};
use qc_evm_engine::ports::outbound::StateView;
use std::any::Any;
use std::ffi::{c_char, c_int, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use tracing::{error, warn};

const STATUS_OK: c_int = 0;
const STATUS_ERR: c_int = -1;

// =============================================================================
// PLUMBING
// =============================================================================

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("panic inside qc-evm: {detail}")
}

/// Runs `op` on a live instance with panics contained, then settles the
/// error slot.
unsafe fn with_instance<T>(
    handle: *mut QcEvmInstance,
    op: impl FnOnce(&mut QcEvmInstance) -> Result<T, FfiError>,
) -> Option<T> {
    let instance = handle.as_mut()?;
    let result = catch_unwind(AssertUnwindSafe(|| op(&mut *instance))).unwrap_or_else(|payload| {
        let message = panic_message(&*payload);
        error!(panic = %message, "caught panic at the C boundary");
        Err(FfiError::EngineInternalError(message))
    });
    instance.record(result)
}

fn status(outcome: Option<()>) -> c_int {
    outcome.map_or(STATUS_ERR, |()| STATUS_OK)
}

fn boxed_instance(config: Result<EngineConfig, ConfigError>) -> *mut QcEvmInstance {
    match config {
        Ok(config) => catch_unwind(|| Box::into_raw(Box::new(QcEvmInstance::new(config))))
            .unwrap_or(ptr::null_mut()),
        Err(e) => {
            warn!(error = %e, "refusing to create instance");
            ptr::null_mut()
        }
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Creates an instance with the default configuration.
#[no_mangle]
pub extern "C" fn qc_evm_new() -> *mut QcEvmInstance {
    boxed_instance(Ok(EngineConfig::default()))
}

/// Creates an instance from a C configuration struct. Null or invalid
/// configuration yields null.
///
/// # Safety
///
/// `config` must be null or point to a valid `QcEvmConfig`.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_new_with_config(config: *const QcEvmConfig) -> *mut QcEvmInstance {
    match config.as_ref() {
        Some(raw) => boxed_instance(EngineConfig::try_from(raw)),
        None => {
            warn!("qc_evm_new_with_config called with null config");
            ptr::null_mut()
        }
    }
}

/// Creates an instance from a named preset (`QcEvmPreset`). Unknown values
/// yield null.
#[no_mangle]
pub extern "C" fn qc_evm_new_with_preset(preset: c_int) -> *mut QcEvmInstance {
    boxed_instance(QcEvmPreset::try_from(preset).map(QcEvmPreset::engine_config))
}

/// Creates an instance from a JSON configuration document. Null or invalid
/// documents yield null.
///
/// # Safety
///
/// `json` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_new_with_json_config(json: *const c_char) -> *mut QcEvmInstance {
    if json.is_null() {
        warn!("qc_evm_new_with_json_config called with null document");
        return ptr::null_mut();
    }
    let config = CStr::from_ptr(json)
        .to_str()
        .map_err(|e| ConfigError::Json(e.to_string()))
        .and_then(engine_config_from_json);
    boxed_instance(config)
}

/// Destroys an instance. Null is a no-op.
///
/// # Safety
///
/// `handle` must be null or an instance from `qc_evm_new*` that has not been
/// freed yet.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_free(handle: *mut QcEvmInstance) {
    if handle.is_null() {
        return;
    }
    let instance = Box::from_raw(handle);
    if catch_unwind(AssertUnwindSafe(move || drop(instance))).is_err() {
        error!("panic while dropping instance");
    }
}

/// Chain id of the instance, 0 for null.
///
/// # Safety
///
/// `handle` must be null or a live instance.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_get_chain_id(handle: *const QcEvmInstance) -> u64 {
    handle
        .as_ref()
        .map_or(0, |instance| instance.config().chain_id())
}

/// Fork spec id of the instance, 0 for null.
///
/// # Safety
///
/// `handle` must be null or a live instance.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_get_spec_id(handle: *const QcEvmInstance) -> u8 {
    handle
        .as_ref()
        .map_or(0, |instance| instance.config().evm_version.spec_id())
}

// =============================================================================
// TRANSACTION
// =============================================================================

/// Attaches a transaction to the instance, replacing any previous one.
///
/// `to` null means contract creation; `value` null means zero; `gas_price`
/// null means the engine default; `data` may be null when `data_len` is 0.
///
/// # Safety
///
/// String arguments must be null or NUL-terminated; `data` must be valid for
/// `data_len` bytes when non-null.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn qc_evm_set_tx(
    handle: *mut QcEvmInstance,
    caller: *const c_char,
    to: *const c_char,
    value: *const c_char,
    data: *const u8,
    data_len: usize,
    gas_limit: u64,
    gas_price: *const c_char,
    nonce: u64,
) -> c_int {
    status(with_instance(handle, |instance| {
        let caller = required_str(caller, "caller")?;
        let to = optional_str(to);
        let value = optional_str(value);
        let gas_price = optional_str(gas_price);
        let args = TxArgs {
            caller: &caller,
            to: to.as_deref(),
            value: value.as_deref(),
            data: byte_slice(data, data_len, "data")?,
            gas_limit,
            gas_price: gas_price.as_deref(),
            nonce,
        };
        configure(instance, &args)
    }))
}

// =============================================================================
// EXECUTION
// =============================================================================

unsafe fn execute_with(handle: *mut QcEvmInstance, mode: Mode) -> *mut QcEvmExecutionResult {
    with_instance(handle, |instance| {
        let result = driver::execute(instance, mode)?;
        QcEvmExecutionResult::materialize(&result)
    })
    .unwrap_or(ptr::null_mut())
}

/// Runs the attached transaction without changing state.
///
/// # Safety
///
/// `handle` must be null or a live instance.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_execute(handle: *mut QcEvmInstance) -> *mut QcEvmExecutionResult {
    execute_with(handle, Mode::DryRun)
}

/// Runs the attached transaction and commits its state changes.
///
/// # Safety
///
/// `handle` must be null or a live instance.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_execute_commit(
    handle: *mut QcEvmInstance,
) -> *mut QcEvmExecutionResult {
    execute_with(handle, Mode::Commit)
}

/// Calls `to` from `from` at its current nonce and commits. `value` null
/// means zero. The attached transaction is left alone.
///
/// # Safety
///
/// String arguments must be null or NUL-terminated; `data` must be valid for
/// `data_len` bytes when non-null.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_call_contract(
    handle: *mut QcEvmInstance,
    from: *const c_char,
    to: *const c_char,
    data: *const u8,
    data_len: usize,
    value: *const c_char,
    gas_limit: u64,
) -> *mut QcEvmExecutionResult {
    with_instance(handle, |instance| {
        let from = address_arg(from, "from")?;
        let to = address_arg(to, "to")?;
        let data = byte_slice(data, data_len, "data")?;
        let value = if value.is_null() {
            U256::zero()
        } else {
            u256_arg(value, "value")?
        };
        let result = driver::call_contract(instance, from, to, data, value, gas_limit)?;
        QcEvmExecutionResult::materialize(&result)
    })
    .unwrap_or(ptr::null_mut())
}

/// Transfers `value` from `from` to `to` at the sender's current nonce and
/// commits. The attached transaction is left alone.
///
/// # Safety
///
/// String arguments must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_transfer(
    handle: *mut QcEvmInstance,
    from: *const c_char,
    to: *const c_char,
    value: *const c_char,
    gas_limit: u64,
) -> *mut QcEvmExecutionResult {
    with_instance(handle, |instance| {
        let from = address_arg(from, "from")?;
        let to = address_arg(to, "to")?;
        let value = u256_arg(value, "value")?;
        let result = driver::transfer(instance, from, to, value, gas_limit)?;
        QcEvmExecutionResult::materialize(&result)
    })
    .unwrap_or(ptr::null_mut())
}

/// Deploys `bytecode` (init code) from `deployer` and commits.
///
/// # Safety
///
/// `deployer` must be null or NUL-terminated; `bytecode` must be valid for
/// `bytecode_len` bytes when non-null.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_deploy_contract(
    handle: *mut QcEvmInstance,
    deployer: *const c_char,
    bytecode: *const u8,
    bytecode_len: usize,
    gas_limit: u64,
) -> *mut QcEvmDeploymentResult {
    with_instance(handle, |instance| {
        let deployer = address_arg(deployer, "deployer")?;
        if bytecode.is_null() {
            return Err(FfiError::NullArgument("bytecode"));
        }
        let init_code = byte_slice(bytecode, bytecode_len, "bytecode")?;
        let result = driver::deploy(instance, deployer, init_code, gas_limit)?;
        QcEvmDeploymentResult::materialize(&result)
    })
    .unwrap_or(ptr::null_mut())
}

// =============================================================================
// STATE ACCESSORS
// =============================================================================

/// Balance of `address` as canonical hex. Free with `qc_evm_free_string`.
///
/// # Safety
///
/// `address` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_get_balance(
    handle: *mut QcEvmInstance,
    address: *const c_char,
) -> *mut c_char {
    with_instance(handle, |instance| {
        let address = address_arg(address, "address")?;
        into_raw_string(format_u256(instance.state().balance(&address)))
    })
    .unwrap_or(ptr::null_mut())
}

/// Overwrites the balance of `address`, creating the account if needed.
///
/// # Safety
///
/// String arguments must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_set_balance(
    handle: *mut QcEvmInstance,
    address: *const c_char,
    balance: *const c_char,
) -> c_int {
    status(with_instance(handle, |instance| {
        let address = address_arg(address, "address")?;
        let balance = u256_arg(balance, "balance")?;
        instance.state_mut().set_balance(address, balance);
        Ok(())
    }))
}

/// Storage slot of `address` as canonical hex. Free with
/// `qc_evm_free_string`.
///
/// # Safety
///
/// String arguments must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_get_storage(
    handle: *mut QcEvmInstance,
    address: *const c_char,
    slot: *const c_char,
) -> *mut c_char {
    with_instance(handle, |instance| {
        let address = address_arg(address, "address")?;
        let key = StorageKey::from_u256(u256_arg(slot, "slot")?);
        let value = instance.state().storage(&address, &key);
        into_raw_string(format_u256(value.to_u256()))
    })
    .unwrap_or(ptr::null_mut())
}

/// Writes a storage slot of `address`. Zero clears the slot.
///
/// # Safety
///
/// String arguments must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_set_storage(
    handle: *mut QcEvmInstance,
    address: *const c_char,
    slot: *const c_char,
    value: *const c_char,
) -> c_int {
    status(with_instance(handle, |instance| {
        let address = address_arg(address, "address")?;
        let key = StorageKey::from_u256(u256_arg(slot, "slot")?);
        let value = StorageValue::from_u256(u256_arg(value, "value")?);
        instance.state_mut().set_storage(address, key, value);
        Ok(())
    }))
}

/// Writes the nonce of `address` to `nonce_out`.
///
/// # Safety
///
/// `address` must be null or NUL-terminated; `nonce_out` must be null or
/// valid for a `u64` write.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_get_nonce(
    handle: *mut QcEvmInstance,
    address: *const c_char,
    nonce_out: *mut u64,
) -> c_int {
    status(with_instance(handle, |instance| {
        let address = address_arg(address, "address")?;
        let out = nonce_out
            .as_mut()
            .ok_or(FfiError::NullArgument("nonce_out"))?;
        *out = instance.state().nonce(&address);
        Ok(())
    }))
}

/// Overwrites the nonce of `address`, creating the account if needed.
///
/// # Safety
///
/// `address` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_set_nonce(
    handle: *mut QcEvmInstance,
    address: *const c_char,
    nonce: u64,
) -> c_int {
    status(with_instance(handle, |instance| {
        let address = address_arg(address, "address")?;
        instance.state_mut().set_nonce(address, nonce);
        Ok(())
    }))
}

/// Code of `address` as hex (`0x` when empty). Free with
/// `qc_evm_free_string`.
///
/// # Safety
///
/// `address` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_get_code(
    handle: *mut QcEvmInstance,
    address: *const c_char,
) -> *mut c_char {
    with_instance(handle, |instance| {
        let address = address_arg(address, "address")?;
        into_raw_string(format_bytes(instance.state().code(&address).as_slice()))
    })
    .unwrap_or(ptr::null_mut())
}

/// Replaces the code of `address`. `code` may be null when `len` is 0.
///
/// # Safety
///
/// `address` must be null or NUL-terminated; `code` must be valid for `len`
/// bytes when non-null.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_set_code(
    handle: *mut QcEvmInstance,
    address: *const c_char,
    code: *const u8,
    len: usize,
) -> c_int {
    status(with_instance(handle, |instance| {
        let address = address_arg(address, "address")?;
        let code = byte_slice(code, len, "code")?;
        instance
            .state_mut()
            .set_code(address, Bytes::from_slice(code));
        Ok(())
    }))
}

// =============================================================================
// ERROR CHANNEL
// =============================================================================

/// Last error message of the instance, null if none. The pointer is owned
/// by the instance and valid until its next call; do not free it.
///
/// # Safety
///
/// `handle` must be null or a live instance.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_get_last_error(handle: *const QcEvmInstance) -> *const c_char {
    handle
        .as_ref()
        .map_or(ptr::null(), |instance| instance.errors().as_ptr())
}

/// Class of the last error (0 = none), -1 for a null handle.
///
/// # Safety
///
/// `handle` must be null or a live instance.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_get_last_error_code(handle: *const QcEvmInstance) -> c_int {
    handle
        .as_ref()
        .map_or(STATUS_ERR, |instance| instance.errors().code().as_raw())
}

// =============================================================================
// RELEASE
// =============================================================================

/// Frees a string returned by this library. Null is a no-op.
///
/// # Safety
///
/// `s` must be null or a string returned by this library, freed once.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_free_string(s: *mut c_char) {
    free_c_string(s);
}

/// Frees an execution result and everything it owns. Null is a no-op.
///
/// # Safety
///
/// `result` must be null or a result returned by this library, freed once.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_free_execution_result(result: *mut QcEvmExecutionResult) {
    free_execution_result(result);
}

/// Frees a deployment result. Null is a no-op.
///
/// # Safety
///
/// `result` must be null or a result returned by this library, freed once.
#[no_mangle]
pub unsafe extern "C" fn qc_evm_free_deployment_result(result: *mut QcEvmDeploymentResult) {
    free_deployment_result(result);
}

// =============================================================================
// MISC
// =============================================================================

/// Installs a stderr `tracing` subscriber configured from `QC_LOG_LEVEL` /
/// `RUST_LOG` and `QC_JSON_LOGS`. Returns -1 if one is already installed or
/// the filter is invalid.
#[no_mangle]
pub extern "C" fn qc_evm_init_logging() -> c_int {
    match catch_unwind(|| init_logging(&LoggingConfig::from_env())) {
        Ok(Ok(())) => STATUS_OK,
        Ok(Err(_)) | Err(_) => STATUS_ERR,
    }
}

/// Library version as a static string. Do not free.
#[no_mangle]
pub extern "C" fn qc_evm_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0")
        .as_ptr()
        .cast::<c_char>()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn test_panic_message() {
        let payload = catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(&*payload), "panic inside qc-evm: boom");

        let owned = catch_unwind(|| std::panic::panic_any(String::from("owned"))).unwrap_err();
        assert!(panic_message(&*owned).ends_with("owned"));

        let other = catch_unwind(|| std::panic::panic_any(7_u32)).unwrap_err();
        assert!(panic_message(&*other).ends_with("unknown panic"));
    }

    #[test]
    fn test_panic_is_contained() {
        let handle = qc_evm_new();
        let out: Option<()> = unsafe { with_instance(handle, |_| panic!("engine bug")) };
        assert!(out.is_none());
        unsafe {
            assert_eq!(
                qc_evm_get_last_error_code(handle),
                ErrorCode::EngineInternalError.as_raw()
            );
            let message = CStr::from_ptr(qc_evm_get_last_error(handle));
            assert!(message.to_str().unwrap().contains("engine bug"));
            qc_evm_free(handle);
        }
    }

    #[test]
    fn test_null_handle() {
        unsafe {
            assert!(qc_evm_execute(ptr::null_mut()).is_null());
            assert_eq!(qc_evm_get_chain_id(ptr::null()), 0);
            assert_eq!(qc_evm_get_spec_id(ptr::null()), 0);
            assert!(qc_evm_get_last_error(ptr::null()).is_null());
            assert_eq!(qc_evm_get_last_error_code(ptr::null()), -1);
            qc_evm_free(ptr::null_mut());
        }
    }

    #[test]
    fn test_version() {
        let version = unsafe { CStr::from_ptr(qc_evm_version()) };
        assert_eq!(version.to_str().unwrap(), crate::VERSION);
    }
}
