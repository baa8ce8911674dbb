//! # Allocation Tests
//!
//! Every pointer handed out by the boundary must come back through its
//! release function and leave nothing behind. A counting allocator tracks
//! live allocations made on the test's own thread, so the harness running
//! other tests in parallel does not disturb the numbers.

use qc_evm_ffi::*;
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::ffi::CString;
use std::ptr;

// =============================================================================
// COUNTING ALLOCATOR
// =============================================================================

struct CountingAllocator;

thread_local! {
    static LIVE: Cell<isize> = const { Cell::new(0) };
}

fn adjust(delta: isize) {
    let _ = LIVE.try_with(|live| live.set(live.get() + delta));
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            adjust(1);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        adjust(-1);
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc_zeroed(layout);
        if !ptr.is_null() {
            adjust(1);
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator;

fn live() -> isize {
    LIVE.with(Cell::get)
}

// =============================================================================
// WORKLOAD
// =============================================================================

const A: &str = "0x000000000000000000000000000000000000000a";
const B: &str = "0x000000000000000000000000000000000000000b";
const C: &str = "0x000000000000000000000000000000000000000c";

/// MSTORE(0, 0x2a), LOG2(0, 32, 0x01, 0x02), RETURN(0, 32).
const LOGGING_RUNTIME: [u8; 20] = [
    0x60, 0x2a, 0x60, 0x00, 0x52, // MSTORE
    0x60, 0x02, 0x60, 0x01, 0x60, 0x20, 0x60, 0x00, 0xa2, // LOG2
    0x60, 0x20, 0x60, 0x00, 0xf3, // RETURN
    0x00,
];

/// Init code returning `LOGGING_RUNTIME`.
fn init_code() -> Vec<u8> {
    let mut code = vec![0x60, 20, 0x60, 12, 0x60, 0x00, 0x39, 0x60, 20, 0x60, 0x00, 0xf3];
    code.extend_from_slice(&LOGGING_RUNTIME);
    code
}

/// Exercises every allocating entry point once and releases everything.
fn full_cycle() {
    let a = CString::new(A).unwrap();
    let b = CString::new(B).unwrap();
    let c = CString::new(C).unwrap();
    let hundred = CString::new("0x64").unwrap();
    let one = CString::new("0x1").unwrap();
    let bad = CString::new("0xnope").unwrap();
    let init = init_code();

    unsafe {
        let evm = qc_evm_new();
        qc_evm_set_balance(evm, a.as_ptr(), hundred.as_ptr());
        qc_evm_set_code(evm, c.as_ptr(), LOGGING_RUNTIME.as_ptr(), LOGGING_RUNTIME.len());

        // Result with output and logs.
        qc_evm_set_tx(
            evm,
            a.as_ptr(),
            c.as_ptr(),
            one.as_ptr(),
            ptr::null(),
            0,
            100_000,
            ptr::null(),
            0,
        );
        let dry = qc_evm_execute(evm);
        assert_eq!((*dry).logs_len, 1);
        assert_eq!((*(*dry).logs).topics_len, 2);
        qc_evm_free_execution_result(dry);

        let committed = qc_evm_execute_commit(evm);
        assert_eq!((*committed).status, 1);
        qc_evm_free_execution_result(committed);

        // Creation result with an address string.
        let deployed = qc_evm_deploy_contract(evm, b.as_ptr(), init.as_ptr(), init.len(), 300_000);
        assert_eq!((*deployed).status, 1);
        qc_evm_free_deployment_result(deployed);

        let transfer = qc_evm_transfer(evm, a.as_ptr(), b.as_ptr(), one.as_ptr(), 21_000);
        qc_evm_free_execution_result(transfer);

        for s in [
            qc_evm_get_balance(evm, a.as_ptr()),
            qc_evm_get_storage(evm, c.as_ptr(), one.as_ptr()),
            qc_evm_get_code(evm, c.as_ptr()),
        ] {
            assert!(!s.is_null());
            qc_evm_free_string(s);
        }

        // Failures allocate an error message owned by the instance.
        assert!(qc_evm_get_balance(evm, bad.as_ptr()).is_null());
        assert!(!qc_evm_get_last_error(evm).is_null());

        qc_evm_free(evm);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[test]
fn test_release_leaks_nothing() {
    // Warm up lazily initialized statics (tracing callsites and the like).
    full_cycle();

    let before = live();
    for _ in 0..5 {
        full_cycle();
    }
    assert_eq!(live(), before);
}

#[test]
fn test_result_owns_its_buffers() {
    full_cycle();

    let a = CString::new(A).unwrap();
    let c = CString::new(C).unwrap();
    unsafe {
        let evm = qc_evm_new();
        qc_evm_set_code(evm, c.as_ptr(), LOGGING_RUNTIME.as_ptr(), LOGGING_RUNTIME.len());
        qc_evm_set_tx(
            evm,
            a.as_ptr(),
            c.as_ptr(),
            ptr::null(),
            ptr::null(),
            0,
            100_000,
            ptr::null(),
            0,
        );

        let before = live();
        let result = qc_evm_execute(evm);
        // Result, output, log array, address, topic array, two topics, data.
        assert_eq!(live() - before, 8);

        qc_evm_free_execution_result(result);
        assert_eq!(live(), before);
        qc_evm_free(evm);
    }
}

#[test]
fn test_error_slot_reuses_storage() {
    full_cycle();

    let bad = CString::new("0x12").unwrap();
    unsafe {
        let evm = qc_evm_new();
        assert!(qc_evm_get_balance(evm, bad.as_ptr()).is_null());
        let with_one_error = live();

        // A second failure replaces the message instead of accumulating.
        assert!(qc_evm_get_balance(evm, bad.as_ptr()).is_null());
        assert_eq!(live(), with_one_error);

        qc_evm_free(evm);
    }
}
