//! Lockstep session driver.
//!
//! Ties a DUT, an optional difftest, and an optional alarm into the per-instruction loop:
//! deliver alarm ticks at a safe point, retire one unit of DUT work, mirror it on the
//! reference, compare.

/// Session driver and the DUT-facing trait.
pub mod session;

pub use session::{Dut, Retired, RunOutcome, Session, Verdict};
