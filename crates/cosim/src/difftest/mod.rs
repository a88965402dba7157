//! Differential Testing.
//!
//! Steps a reference model in lockstep with the DUT and compares architectural registers.
//! It provides:
//! 1. **ABI:** The C entry points a reference shared object exports.
//! 2. **Binding:** Resolution of those entry points into a [`RefModel`].
//! 3. **Protocol:** [`DiffTest`], the initialize / step / check / resync state machine.
//!
//! # Protocol
//!
//! Initialization seeds the reference with the DUT's memory image (the only bulk memory copy)
//! and its register file, after resetting the DUT's `pc` to the entry point. From then on the
//! caller must call [`DiffTest::step`] exactly once per DUT instruction retired, and may call
//! [`DiffTest::check`] after any step.
//!
//! Step skew is not detectable here: if the DUT retires more or fewer instructions than the
//! reference is stepped between two checks, every later comparison is meaningless. Keeping
//! the 1:1 correspondence is the caller's precondition.

/// Reference model C ABI.
pub mod abi;

/// Native (shared object) reference binding.
pub mod binding;

/// Reference model capability trait.
pub mod reference;

use std::fmt;

use tracing::{info, warn};

pub use binding::{DylibRef, NativeRef, RefApi, SymbolTable};
pub use reference::{Direction, RefModel};

use crate::common::constants::INST_START;
use crate::common::error::DiffError;
use crate::common::reg::{RegFile, RegMismatch, checkregs};
use crate::config::Config;
use crate::soc::memory::GuestMemory;
use crate::stats::DiffStats;

/// Register-comparison predicate: `(reference, dut) -> matched`.
pub type Checker = Box<dyn Fn(&RegFile, &RegFile) -> bool + Send>;

/// Synchronization state of an initialized [`DiffTest`].
///
/// Before initialization there is no `DiffTest` value at all, so stepping an uninitialized
/// reference cannot be expressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// Every comparison so far has matched.
    Synced,
    /// At least one comparison reported a mismatch. Stepping may continue for diagnostics.
    Diverged,
}

/// Lockstep differential tester.
pub struct DiffTest<R> {
    reference: R,
    ref_regs: RegFile,
    state: SyncState,
    skip_next: bool,
    checker: Checker,
    stats: DiffStats,
}

impl<R> fmt::Debug for DiffTest<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffTest")
            .field("state", &self.state)
            .field("skip_next", &self.skip_next)
            .field("ref_regs", &self.ref_regs)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl DiffTest<DylibRef> {
    /// Loads the reference shared object at `ref_so` and runs the initialization handshake.
    ///
    /// # Arguments
    ///
    /// * `ref_so` - Path to the reference model shared object.
    /// * `mem` - DUT guest memory holding the loaded image at its base address.
    /// * `dut` - DUT register file; its `pc` is reset to [`INST_START`].
    /// * `image_size` - Bytes of guest memory to copy into the reference.
    ///
    /// # Errors
    ///
    /// [`DiffError::Bind`] if the reference cannot be bound, [`DiffError::ImageOutOfRange`]
    /// if the image does not fit in `mem`.
    pub fn init<M>(
        ref_so: &std::path::Path,
        mem: &M,
        dut: &mut RegFile,
        image_size: usize,
    ) -> Result<Self, DiffError>
    where
        M: GuestMemory + ?Sized,
    {
        let reference = DylibRef::bind(ref_so)?;
        Self::with_reference(reference, mem, dut, image_size)
    }

    /// Like [`DiffTest::init`], taking the reference path, image size, and entry point from
    /// `config`.
    ///
    /// Nothing is loaded unless `config` enables difftest and `mem` is based at the configured
    /// `pmem_start`.
    ///
    /// # Errors
    ///
    /// * [`DiffError::Disabled`] if `difftest.enabled` is `false`.
    /// * [`DiffError::Unconfigured`] if `config` names no reference model.
    /// * [`DiffError::BaseMismatch`] if `mem` does not start at `memory.pmem_start`.
    /// * The errors of [`DiffTest::init`].
    pub fn from_config<M>(config: &Config, mem: &M, dut: &mut RegFile) -> Result<Self, DiffError>
    where
        M: GuestMemory + ?Sized,
    {
        if !config.difftest.enabled {
            return Err(DiffError::Disabled);
        }
        let ref_so = config
            .difftest
            .ref_so
            .as_deref()
            .ok_or(DiffError::Unconfigured)?;
        if mem.base() != config.memory.pmem_start {
            return Err(DiffError::BaseMismatch {
                configured: config.memory.pmem_start,
                actual: mem.base(),
            });
        }
        let reference = DylibRef::bind(ref_so)?;
        Self::handshake(
            reference,
            mem,
            dut,
            config.difftest.image_size,
            config.memory.inst_start,
        )
    }
}

impl<R: RefModel> DiffTest<R> {
    /// Runs the initialization handshake against an already bound reference model.
    ///
    /// Calls `init`, copies `image_size` bytes from the base of `mem` into the reference,
    /// sets the DUT `pc` to [`INST_START`], then copies the DUT registers into the reference.
    /// Afterwards both sides hold identical registers and identical images.
    ///
    /// # Errors
    ///
    /// [`DiffError::ImageOutOfRange`] if the image does not fit in `mem`. The reference is
    /// not touched in that case.
    pub fn with_reference<M>(
        reference: R,
        mem: &M,
        dut: &mut RegFile,
        image_size: usize,
    ) -> Result<Self, DiffError>
    where
        M: GuestMemory + ?Sized,
    {
        Self::handshake(reference, mem, dut, image_size, INST_START)
    }

    fn handshake<M>(
        mut reference: R,
        mem: &M,
        dut: &mut RegFile,
        image_size: usize,
        entry: u64,
    ) -> Result<Self, DiffError>
    where
        M: GuestMemory + ?Sized,
    {
        let base = mem.base();
        let image = mem
            .guest_to_host(base)
            .and_then(|host| host.get(..image_size))
            .ok_or(DiffError::ImageOutOfRange {
                base,
                size: image_size,
            })?;

        reference.init();
        reference.memcpy_to_ref(base, image);

        dut.pc = entry;
        let mut ref_regs = *dut;
        reference.regcpy(&mut ref_regs, Direction::ToRef);

        info!(image_size, "difftest initialized: image at {base:#x}, entry {entry:#x}");
        Ok(Self {
            reference,
            ref_regs,
            state: SyncState::Synced,
            skip_next: false,
            checker: Box::new(checkregs),
            stats: DiffStats::default(),
        })
    }

    /// Replaces the register-comparison predicate (default: [`checkregs`]).
    #[must_use]
    pub fn with_checker<F>(mut self, checker: F) -> Self
    where
        F: Fn(&RegFile, &RegFile) -> bool + Send + 'static,
    {
        self.checker = Box::new(checker);
        self
    }

    /// Advances the reference by exactly one instruction.
    ///
    /// Must be called once per DUT instruction retired. If [`DiffTest::skip_ref`] is pending,
    /// the reference is not advanced; the next [`DiffTest::check`] resyncs instead.
    pub fn step(&mut self) {
        if self.skip_next {
            return;
        }
        self.reference.exec(1);
        self.stats.ref_steps += 1;
    }

    /// Advances the reference by `n` instructions, for callers that compare per batch.
    pub fn step_n(&mut self, n: u64) {
        if self.skip_next || n == 0 {
            return;
        }
        self.reference.exec(n);
        self.stats.ref_steps += n;
    }

    /// Copies the reference registers out and compares them with `dut`.
    ///
    /// A mismatch moves the tester to [`SyncState::Diverged`] for good; the caller decides
    /// whether to stop. After a pending [`DiffTest::skip_ref`], the DUT registers are copied
    /// into the reference instead and the result is `true`.
    ///
    /// # Returns
    ///
    /// `true` if the registers match under the configured predicate.
    pub fn check(&mut self, dut: &RegFile) -> bool {
        self.stats.checks += 1;
        if self.skip_next {
            self.skip_next = false;
            self.stats.skips += 1;
            self.sync_dut_to_ref(dut);
            return true;
        }

        self.reference.regcpy(&mut self.ref_regs, Direction::ToDut);
        let matched = (self.checker)(&self.ref_regs, dut);
        if !matched {
            self.stats.mismatches += 1;
            if self.state == SyncState::Synced {
                warn!("reference diverged at pc {:#x}", dut.pc);
            }
            self.state = SyncState::Diverged;
        }
        matched
    }

    /// Overwrites the reference registers with `dut` without touching memory.
    pub fn sync_dut_to_ref(&mut self, dut: &RegFile) {
        self.ref_regs = *dut;
        self.reference.regcpy(&mut self.ref_regs, Direction::ToRef);
        self.stats.resyncs += 1;
    }

    /// Marks the next step as unverifiable (e.g. it touched a device the reference does
    /// not model). The reference is not stepped and the next check resyncs from the DUT.
    pub fn skip_ref(&mut self) {
        self.skip_next = true;
    }

    /// Tells the reference that the DUT took interrupt or exception `no` in place of
    /// retiring an instruction.
    pub fn raise_intr(&mut self, no: u64) {
        self.reference.raise_intr(no);
        self.stats.interrupts += 1;
    }

    /// Copies `buf.len()` bytes of reference memory at `addr` into `buf`, for diagnostics.
    pub fn read_ref_memory(&mut self, addr: u64, buf: &mut [u8]) {
        self.reference.memcpy_to_dut(addr, buf);
    }

    /// The reference registers as of the last check or resync.
    pub fn ref_regs(&self) -> &RegFile {
        &self.ref_regs
    }

    /// Registers that differ between the last reference snapshot and `dut`.
    pub fn mismatches(&self, dut: &RegFile) -> Vec<RegMismatch> {
        self.ref_regs.diff(dut)
    }

    /// Current synchronization state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Counters for this run.
    pub fn stats(&self) -> &DiffStats {
        &self.stats
    }

    /// Mutable counters, for drivers that record alarm ticks alongside.
    pub fn stats_mut(&mut self) -> &mut DiffStats {
        &mut self.stats
    }

    /// The bound reference model.
    pub fn reference(&self) -> &R {
        &self.reference
    }
}
