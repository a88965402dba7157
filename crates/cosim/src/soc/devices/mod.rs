//! Periodic devices.
//!
//! This module contains the host-timer driven components. It includes:
//! 1. **Alarm:** A bounded registry of periodic handlers fed by a virtual interval timer.
//! 2. **Timer Interrupt:** The guest-facing consumer that latches one pending interrupt per tick.

/// Virtual-timer alarm and handler registry.
pub mod alarm;

/// Timer-interrupt latch driven by the alarm.
pub mod timer;

pub use alarm::{Alarm, AlarmBuilder, TickInjector};
pub use timer::TimerIrq;
