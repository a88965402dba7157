//! Session: DUT + reference + alarm side by side.
//!
//! The session owns the DUT and drives the difftest protocol from the main loop, so the
//! reference model is never touched from alarm context.

use tracing::error;

use crate::common::reg::{RegFile, RegMismatch};
use crate::config::Config;
use crate::difftest::{DiffTest, RefModel};
use crate::soc::devices::alarm::Alarm;

/// What the DUT did in one call to [`Dut::exec_once`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retired {
    /// One instruction retired normally; the reference executes it too.
    Instruction,
    /// One instruction retired whose effect the reference cannot reproduce (device access);
    /// the reference is resynced from the DUT instead.
    Skip,
    /// The DUT took interrupt or exception `cause` instead of retiring an instruction.
    Interrupt(u64),
}

/// The simulator under test, as seen by the session.
pub trait Dut {
    /// Current architectural registers.
    fn regs(&self) -> &RegFile;

    /// Retires one instruction or takes one trap.
    fn exec_once(&mut self) -> Retired;
}

/// Result of one lockstep step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Reference and DUT agree (or no difftest is attached).
    Match,
    /// The registers that differ, reference side first.
    Mismatch(Vec<RegMismatch>),
}

/// How [`Session::run`] ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// All requested steps ran.
    Completed {
        /// Steps executed.
        steps: u64,
    },
    /// Stopped at the first mismatch (`halt_on_mismatch`).
    Halted {
        /// 1-based step at which the divergence was detected.
        step: u64,
        /// Differing registers.
        mismatches: Vec<RegMismatch>,
    },
}

/// Lockstep co-simulation session.
#[derive(Debug)]
pub struct Session<D, R> {
    dut: D,
    difftest: Option<DiffTest<R>>,
    alarm: Option<Alarm>,
    halt_on_mismatch: bool,
    retired: u64,
}

impl<D: Dut, R: RefModel> Session<D, R> {
    /// Creates a session that only runs the DUT.
    pub fn new(dut: D) -> Self {
        Self {
            dut,
            difftest: None,
            alarm: None,
            halt_on_mismatch: true,
            retired: 0,
        }
    }

    /// Creates a DUT-only session with the run policy from `config`
    /// (`difftest.halt_on_mismatch`).
    pub fn from_config(dut: D, config: &Config) -> Self {
        Self::new(dut).halt_on_mismatch(config.difftest.halt_on_mismatch)
    }

    /// Attaches an initialized difftest.
    #[must_use]
    pub fn with_difftest(mut self, difftest: DiffTest<R>) -> Self {
        self.difftest = Some(difftest);
        self
    }

    /// Attaches a started alarm; its ticks are delivered before every DUT step.
    #[must_use]
    pub fn with_alarm(mut self, alarm: Alarm) -> Self {
        self.alarm = Some(alarm);
        self
    }

    /// Whether [`Session::run`] stops at the first mismatch (default `true`).
    #[must_use]
    pub fn halt_on_mismatch(mut self, halt: bool) -> Self {
        self.halt_on_mismatch = halt;
        self
    }

    /// Runs one lockstep step.
    ///
    /// 1. Delivers pending alarm ticks (the safe point).
    /// 2. Lets the DUT retire one instruction or take one trap.
    /// 3. Mirrors that on the reference: `step`, `skip_ref`, or `raise_intr`.
    /// 4. Compares registers.
    pub fn step(&mut self) -> Verdict {
        let ticks = self.alarm.as_mut().map_or(0, Alarm::poll);

        let retired = self.dut.exec_once();
        self.retired += 1;

        let Some(difftest) = self.difftest.as_mut() else {
            return Verdict::Match;
        };
        difftest.stats_mut().alarm_ticks += ticks;
        match retired {
            Retired::Instruction => difftest.step(),
            Retired::Skip => difftest.skip_ref(),
            Retired::Interrupt(cause) => difftest.raise_intr(cause),
        }

        let regs = self.dut.regs();
        if difftest.check(regs) {
            Verdict::Match
        } else {
            Verdict::Mismatch(difftest.mismatches(regs))
        }
    }

    /// Runs up to `max_steps` steps.
    pub fn run(&mut self, max_steps: u64) -> RunOutcome {
        for step in 1..=max_steps {
            if let Verdict::Mismatch(mismatches) = self.step() {
                if self.halt_on_mismatch {
                    if let Some(difftest) = &self.difftest {
                        error!(
                            step,
                            "difftest halted:\n{}",
                            RegFile::dump(difftest.ref_regs(), self.dut.regs())
                        );
                    }
                    return RunOutcome::Halted { step, mismatches };
                }
            }
        }
        RunOutcome::Completed { steps: max_steps }
    }

    /// The DUT.
    pub fn dut(&self) -> &D {
        &self.dut
    }

    /// Mutable access to the DUT, for tests that inject DUT-only state changes.
    pub fn dut_mut(&mut self) -> &mut D {
        &mut self.dut
    }

    /// The attached difftest, if any.
    pub fn difftest(&self) -> Option<&DiffTest<R>> {
        self.difftest.as_ref()
    }

    /// Mutable access to the attached difftest.
    pub fn difftest_mut(&mut self) -> Option<&mut DiffTest<R>> {
        self.difftest.as_mut()
    }

    /// The attached alarm, if any.
    pub fn alarm(&self) -> Option<&Alarm> {
        self.alarm.as_ref()
    }

    /// DUT steps taken so far.
    pub fn retired(&self) -> u64 {
        self.retired
    }
}
