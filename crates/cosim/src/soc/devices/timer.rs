//! Timer Interrupt Latch.
//!
//! The guest-facing consumer of the alarm. Each alarm tick latches one pending machine timer
//! interrupt; the DUT takes it at its next interrupt check and reports the cause to difftest
//! through `raise_intr`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::common::error::AlarmError;
use crate::soc::devices::alarm::AlarmBuilder;

/// Bit marking an `mcause` value as an interrupt.
pub const CAUSE_INTERRUPT_BIT: u64 = 1 << 63;

/// `mcause` of a machine timer interrupt.
pub const IRQ_TIMER: u64 = CAUSE_INTERRUPT_BIT | 7;

/// Pending timer interrupt shared between the alarm handler and the DUT.
#[derive(Debug, Clone, Default)]
pub struct TimerIrq {
    pending: Arc<AtomicBool>,
    raised: Arc<AtomicU64>,
}

impl TimerIrq {
    /// Creates a latch with no interrupt pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the latching handler with the alarm.
    ///
    /// # Errors
    ///
    /// Propagates [`AlarmError::RegistryFull`].
    pub fn attach(&self, alarm: &mut AlarmBuilder) -> Result<(), AlarmError> {
        let latch = self.clone();
        alarm.add_handler(move || latch.raise())
    }

    /// Latches an interrupt. Ticks that arrive while one is already pending coalesce.
    pub fn raise(&self) {
        self.pending.store(true, Ordering::Release);
        let _ = self.raised.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns `true` if an interrupt is waiting to be taken.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Takes the pending interrupt, clearing the latch.
    ///
    /// # Returns
    ///
    /// The interrupt cause if one was pending.
    pub fn take(&self) -> Option<u64> {
        self.pending
            .swap(false, Ordering::AcqRel)
            .then_some(IRQ_TIMER)
    }

    /// Number of ticks seen, including coalesced ones.
    pub fn raised(&self) -> u64 {
        self.raised.load(Ordering::Relaxed)
    }
}
