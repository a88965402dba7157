//! Reference Model ABI.
//!
//! The C entry points every reference shared object must export. Signatures and symbol names
//! are fixed; the register buffer is a [`RegFile`](crate::common::RegFile) passed as `void *`.

use std::ffi::c_void;

/// `void difftest_init(void)`: one-time reference-side setup.
pub type InitFn = unsafe extern "C" fn();

/// `void difftest_memcpy(uint64_t addr, void *buf, size_t n, bool direction)`.
pub type MemcpyFn = unsafe extern "C" fn(addr: u64, buf: *mut c_void, n: usize, direction: bool);

/// `void difftest_regcpy(void *dut, bool direction)`.
pub type RegcpyFn = unsafe extern "C" fn(dut: *mut c_void, direction: bool);

/// `void difftest_exec(uint64_t n)`: execute exactly `n` instructions.
pub type ExecFn = unsafe extern "C" fn(n: u64);

/// `void difftest_raise_intr(uint64_t NO)`: take interrupt/exception `NO`.
pub type RaiseIntrFn = unsafe extern "C" fn(no: u64);

/// `direction` value for reference → DUT copies.
pub const DIFFTEST_TO_DUT: bool = false;

/// `direction` value for DUT → reference copies.
pub const DIFFTEST_TO_REF: bool = true;

/// Symbol of [`InitFn`].
pub const SYM_INIT: &str = "difftest_init";
/// Symbol of [`MemcpyFn`].
pub const SYM_MEMCPY: &str = "difftest_memcpy";
/// Symbol of [`RegcpyFn`].
pub const SYM_REGCPY: &str = "difftest_regcpy";
/// Symbol of [`ExecFn`].
pub const SYM_EXEC: &str = "difftest_exec";
/// Symbol of [`RaiseIntrFn`].
pub const SYM_RAISE_INTR: &str = "difftest_raise_intr";

/// Every symbol a reference model must export, in resolution order.
pub const REQUIRED_SYMBOLS: [&str; 5] = [SYM_MEMCPY, SYM_REGCPY, SYM_EXEC, SYM_RAISE_INTR, SYM_INIT];
