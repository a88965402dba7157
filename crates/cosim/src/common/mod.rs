//! Common types shared by the reference binding, the alarm, and the session driver.
//!
//! This module provides:
//! 1. **Constants:** Guest memory layout and alarm frequency/capacity.
//! 2. **Error Handling:** Error types for binding, alarm installation, and initialization.
//! 3. **Register File:** The `#[repr(C)]` register layout both simulators agree on.

/// Common constants used throughout the harness.
pub mod constants;

/// Error types for every fallible startup path.
pub mod error;

/// Register file shared verbatim with the reference model.
pub mod reg;

pub use constants::{INST_START, MAX_HANDLER, PMEM_START, TIMER_HZ};
pub use error::{AlarmError, BindError, ConfigError, DiffError};
pub use reg::{RegFile, RegMismatch, checkregs};
