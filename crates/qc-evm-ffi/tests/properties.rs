//! # Property Tests
//!
//! Accessor round-trips and dry-run isolation over generated inputs.

use proptest::prelude::*;
use qc_evm_ffi::*;
use std::ffi::{c_char, CStr, CString};
use std::ptr;

fn cstr(s: &str) -> CString {
    CString::new(s).unwrap()
}

unsafe fn take_string(ptr: *mut c_char) -> String {
    assert!(!ptr.is_null());
    let owned = CStr::from_ptr(ptr).to_str().unwrap().to_owned();
    qc_evm_free_string(ptr);
    owned
}

fn address_hex(bytes: &[u8; 20], upper: bool) -> String {
    let digits = hex::encode(bytes);
    if upper {
        format!("0X{}", digits.to_uppercase())
    } else {
        format!("0x{digits}")
    }
}

/// Any spelling of `bytes` the parser must accept: optional zero padding
/// beyond 64 digits and either case.
fn value_hex(bytes: &[u8; 32], extra_zeros: usize, upper: bool) -> String {
    let digits = hex::encode(bytes);
    let digits = if upper { digits.to_uppercase() } else { digits };
    format!("0x{}{digits}", "0".repeat(extra_zeros))
}

fn canonical(bytes: &[u8; 32]) -> String {
    let digits = hex::encode(bytes);
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0x0".to_string()
    } else {
        format!("0x{trimmed}")
    }
}

/// Balances, nonces and the first few storage slots of the given accounts.
unsafe fn snapshot(evm: *mut QcEvmInstance, accounts: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    for account in accounts {
        let address = cstr(account);
        out.push(take_string(qc_evm_get_balance(evm, address.as_ptr())));
        let mut nonce = 0_u64;
        assert_eq!(qc_evm_get_nonce(evm, address.as_ptr(), &mut nonce), 0);
        out.push(nonce.to_string());
        for slot in 0..4 {
            let slot = cstr(&format!("0x{slot}"));
            out.push(take_string(qc_evm_get_storage(
                evm,
                address.as_ptr(),
                slot.as_ptr(),
            )));
        }
        out.push(take_string(qc_evm_get_code(evm, address.as_ptr())));
    }
    out
}

proptest! {
    #[test]
    fn balance_round_trip(
        address in any::<[u8; 20]>(),
        value in any::<[u8; 32]>(),
        extra_zeros in 0usize..4,
        upper in any::<bool>(),
    ) {
        unsafe {
            let evm = qc_evm_new();
            let addr = cstr(&address_hex(&address, upper));
            let input = cstr(&value_hex(&value, extra_zeros, upper));

            prop_assert_eq!(qc_evm_set_balance(evm, addr.as_ptr(), input.as_ptr()), 0);
            let read = take_string(qc_evm_get_balance(evm, addr.as_ptr()));
            prop_assert_eq!(read, canonical(&value));
            qc_evm_free(evm);
        }
    }

    #[test]
    fn storage_round_trip(
        address in any::<[u8; 20]>(),
        slot in any::<[u8; 32]>(),
        other_slot in any::<[u8; 32]>(),
        value in any::<[u8; 32]>(),
    ) {
        prop_assume!(slot != other_slot);
        unsafe {
            let evm = qc_evm_new();
            let addr = cstr(&address_hex(&address, false));
            let slot = cstr(&value_hex(&slot, 0, false));
            let other_slot = cstr(&value_hex(&other_slot, 0, false));
            let input = cstr(&value_hex(&value, 0, true));

            prop_assert_eq!(
                qc_evm_set_storage(evm, addr.as_ptr(), slot.as_ptr(), input.as_ptr()),
                0
            );
            let read = take_string(qc_evm_get_storage(evm, addr.as_ptr(), slot.as_ptr()));
            prop_assert_eq!(read, canonical(&value));
            let untouched = take_string(qc_evm_get_storage(evm, addr.as_ptr(), other_slot.as_ptr()));
            prop_assert_eq!(untouched, "0x0");
            qc_evm_free(evm);
        }
    }

    #[test]
    fn dry_run_never_mutates(
        code in prop::collection::vec(any::<u8>(), 0..64),
        calldata in prop::collection::vec(any::<u8>(), 0..32),
        value in 0u8..0x80,
        gas_limit in 30_000u64..200_000,
    ) {
        const SENDER: &str = "0x000000000000000000000000000000000000000a";
        const TARGET: &str = "0x000000000000000000000000000000000000000c";
        unsafe {
            let evm = qc_evm_new();
            qc_evm_set_balance(evm, cstr(SENDER).as_ptr(), cstr("0x80").as_ptr());
            qc_evm_set_code(evm, cstr(TARGET).as_ptr(), code.as_ptr(), code.len());
            qc_evm_set_storage(
                evm,
                cstr(TARGET).as_ptr(),
                cstr("0x1").as_ptr(),
                cstr("0x5").as_ptr(),
            );
            let before = snapshot(evm, &[SENDER, TARGET]);

            let value = cstr(&format!("0x{value:x}"));
            prop_assert_eq!(
                qc_evm_set_tx(
                    evm,
                    cstr(SENDER).as_ptr(),
                    cstr(TARGET).as_ptr(),
                    value.as_ptr(),
                    calldata.as_ptr(),
                    calldata.len(),
                    gas_limit,
                    ptr::null(),
                    0,
                ),
                0
            );

            // Whatever the outcome, the live state is untouched.
            let result = qc_evm_execute(evm);
            prop_assert!(!result.is_null());
            qc_evm_free_execution_result(result);

            prop_assert_eq!(snapshot(evm, &[SENDER, TARGET]), before);
            qc_evm_free(evm);
        }
    }
}
