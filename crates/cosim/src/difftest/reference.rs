//! Reference model capability.
//!
//! [`RefModel`] is the five-operation interface the stepping protocol drives. The native
//! binding in [`binding`](super::binding) is one implementation; tests and in-process oracles
//! are others.

use crate::common::reg::RegFile;
use crate::difftest::abi;

/// Copy direction for `regcpy`, and the ABI `memcpy` flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Reference → DUT buffer.
    ToDut,
    /// DUT buffer → reference.
    ToRef,
}

impl Direction {
    /// The `bool` the C ABI uses for this direction.
    pub const fn as_abi(self) -> bool {
        match self {
            Self::ToDut => abi::DIFFTEST_TO_DUT,
            Self::ToRef => abi::DIFFTEST_TO_REF,
        }
    }
}

/// An oracle simulator of the same instruction set as the DUT.
///
/// Implementations are not reentrant and must only be driven from the simulation loop,
/// never from an alarm handler.
pub trait RefModel {
    /// One-time reference-side setup.
    fn init(&mut self);

    /// Copies `buf` into reference memory at `addr`.
    fn memcpy_to_ref(&mut self, addr: u64, buf: &[u8]);

    /// Fills `buf` from reference memory at `addr`.
    fn memcpy_to_dut(&mut self, addr: u64, buf: &mut [u8]);

    /// Copies the whole register file between `regs` and the reference.
    ///
    /// With [`Direction::ToRef`] the reference only reads `regs`.
    fn regcpy(&mut self, regs: &mut RegFile, direction: Direction);

    /// Executes exactly `n` instructions.
    fn exec(&mut self, n: u64);

    /// Makes the reference take interrupt or exception `no` as its next step.
    fn raise_intr(&mut self, no: u64);
}

impl<R: RefModel + ?Sized> RefModel for Box<R> {
    fn init(&mut self) {
        (**self).init();
    }

    fn memcpy_to_ref(&mut self, addr: u64, buf: &[u8]) {
        (**self).memcpy_to_ref(addr, buf);
    }

    fn memcpy_to_dut(&mut self, addr: u64, buf: &mut [u8]) {
        (**self).memcpy_to_dut(addr, buf);
    }

    fn regcpy(&mut self, regs: &mut RegFile, direction: Direction) {
        (**self).regcpy(regs, direction);
    }

    fn exec(&mut self, n: u64) {
        (**self).exec(n);
    }

    fn raise_intr(&mut self, no: u64) {
        (**self).raise_intr(no);
    }
}
