//! Global Harness Constants.
//!
//! This module defines the constants both simulators must agree on. It includes:
//! 1. **Memory Constants:** Physical memory base and the reset entry point.
//! 2. **Register Constants:** Register-file shape.
//! 3. **Alarm Constants:** Tick frequency and handler registry capacity.

/// Base guest-physical address of the memory image.
pub const PMEM_START: u64 = 0x8000_0000;

/// Default size of the guest memory image in bytes (128 MiB).
pub const PMEM_SIZE: usize = 128 * 1024 * 1024;

/// Program counter value loaded into the DUT before the first register sync.
pub const INST_START: u64 = 0x8000_0000;

/// Number of general-purpose registers in the shared register file.
pub const NR_GPR: usize = 32;

/// Alarm ticks per second of virtual (process CPU) time.
pub const TIMER_HZ: u32 = 60;

/// Maximum number of handlers the alarm registry holds.
pub const MAX_HANDLER: usize = 8;
