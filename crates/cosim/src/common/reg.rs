//! Shared Register File.
//!
//! This module provides the `RegFile` struct that both the DUT and the reference model
//! copy verbatim across the difftest ABI. It provides:
//! 1. **Layout:** A `#[repr(C)]` aggregate of 32 GPRs followed by the program counter.
//! 2. **Comparison:** Field-by-field diffing into named mismatches.
//! 3. **Observability:** A side-by-side dump for divergence reports.

use std::fmt::{self, Write as _};

use tracing::error;

use crate::common::constants::NR_GPR;
use crate::isa::abi;

/// Architectural register state in the layout the reference ABI expects.
///
/// The reference model reads and writes this struct through a `void *`, so field order
/// and width are part of the ABI and must not change.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegFile {
    /// General-purpose registers `x0`-`x31`.
    pub gpr: [u64; NR_GPR],
    /// Program counter.
    pub pc: u64,
}

/// A single register that differs between reference and DUT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegMismatch {
    /// ABI name of the register (`"pc"` for the program counter).
    pub name: &'static str,
    /// Value held by the reference model.
    pub reference: u64,
    /// Value held by the DUT.
    pub dut: u64,
}

impl fmt::Display for RegMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<4} ref={:#018x} dut={:#018x}",
            self.name, self.reference, self.dut
        )
    }
}

impl RegFile {
    /// Creates a register file with every register zeroed and `pc` set to `pc`.
    pub fn with_pc(pc: u64) -> Self {
        Self {
            gpr: [0; NR_GPR],
            pc,
        }
    }

    /// Reads a general-purpose register.
    ///
    /// # Arguments
    ///
    /// * `idx` - Register index (0-31).
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not a GPR index. Use [`RegFile::get`] for untrusted indices.
    pub fn read(&self, idx: usize) -> u64 {
        self.gpr[idx]
    }

    /// Writes a general-purpose register. Writes to `x0` are ignored.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not a GPR index. Use [`RegFile::set`] for untrusted indices.
    pub fn write(&mut self, idx: usize, val: u64) {
        if idx != abi::REG_ZERO {
            self.gpr[idx] = val;
        }
    }

    /// Reads a general-purpose register, or `None` if `idx` is out of range.
    pub fn get(&self, idx: usize) -> Option<u64> {
        self.gpr.get(idx).copied()
    }

    /// Writes a general-purpose register, ignoring `x0`.
    ///
    /// # Returns
    ///
    /// `false` (and nothing is written) if `idx` is out of range.
    pub fn set(&mut self, idx: usize, val: u64) -> bool {
        match self.gpr.get_mut(idx) {
            Some(slot) => {
                if idx != abi::REG_ZERO {
                    *slot = val;
                }
                true
            }
            None => false,
        }
    }

    /// Lists every register whose value differs, with `self` as the reference side.
    ///
    /// The program counter is reported first, then GPRs in index order.
    ///
    /// # Arguments
    ///
    /// * `dut` - The DUT register file to compare against.
    ///
    /// # Returns
    ///
    /// An empty vector when both register files are identical.
    pub fn diff(&self, dut: &Self) -> Vec<RegMismatch> {
        let mut out = Vec::new();
        if self.pc != dut.pc {
            out.push(RegMismatch {
                name: "pc",
                reference: self.pc,
                dut: dut.pc,
            });
        }
        for (idx, (r, d)) in self.gpr.iter().zip(dut.gpr.iter()).enumerate() {
            if r != d {
                out.push(RegMismatch {
                    name: abi::reg_name(idx),
                    reference: *r,
                    dut: *d,
                });
            }
        }
        out
    }

    /// Formats both register files side by side, marking differing rows with `*`.
    pub fn dump(reference: &Self, dut: &Self) -> String {
        let mut out = String::new();
        let mark = |a: u64, b: u64| if a == b { ' ' } else { '*' };
        let _ = writeln!(
            out,
            "{} pc   ref={:#018x} dut={:#018x}",
            mark(reference.pc, dut.pc),
            reference.pc,
            dut.pc
        );
        for idx in 0..NR_GPR {
            let (r, d) = (reference.gpr[idx], dut.gpr[idx]);
            let _ = writeln!(
                out,
                "{} {:<4} ref={:#018x} dut={:#018x}",
                mark(r, d),
                abi::reg_name(idx),
                r,
                d
            );
        }
        out
    }
}

/// Default register-comparison predicate.
///
/// Compares the program counter and all general-purpose registers. Each mismatch is logged
/// at `error` level against the DUT's program counter.
///
/// # Returns
///
/// `true` if the register files match.
pub fn checkregs(reference: &RegFile, dut: &RegFile) -> bool {
    let mismatches = reference.diff(dut);
    for m in &mismatches {
        error!(
            reg = m.name,
            pc = dut.pc,
            "register mismatch: ref={:#x} dut={:#x}",
            m.reference,
            m.dut
        );
    }
    mismatches.is_empty()
}
