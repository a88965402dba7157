//! RISC-V co-simulation harness.
//!
//! This crate verifies an instruction-set simulator (the DUT) against an independently
//! built reference model. It provides:
//! 1. **Difftest:** Binding to a dynamically loaded reference model and the lockstep
//!    initialize / step / check / resync protocol.
//! 2. **Alarm:** A virtual-timer tick source with a bounded registry of periodic handlers,
//!    used to inject asynchronous timer interrupts into the DUT.
//! 3. **State:** The shared register-file layout and the guest physical memory image.
//! 4. **Simulation:** A session driver that runs DUT and reference side by side.
//! 5. **Support:** Configuration and statistics collection.

/// Common types and constants (register file, guest memory layout, errors).
pub mod common;
/// Harness configuration (defaults, JSON deserialization, validation).
pub mod config;
/// Differential testing: reference-model ABI, binding, and stepping protocol.
pub mod difftest;
/// Instruction-set naming helpers (ABI register names).
pub mod isa;
/// Lockstep session driver.
pub mod sim;
/// Guest memory and periodic devices (alarm, timer interrupt).
pub mod soc;
/// Co-simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Lockstep differential tester; construct with `DiffTest::init` or `DiffTest::with_reference`.
pub use crate::difftest::DiffTest;
/// Shared architectural register file.
pub use crate::common::RegFile;
