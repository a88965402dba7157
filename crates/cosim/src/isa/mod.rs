//! Instruction-set naming helpers.
//!
//! The harness never decodes instructions; it only needs register names for diagnostics.

/// RISC-V ABI register names.
pub mod abi;
