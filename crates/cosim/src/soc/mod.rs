//! Guest-side collaborators of the harness.
//!
//! This module provides:
//! 1. **Memory:** The guest physical memory image and the accessor trait difftest seeds from.
//! 2. **Devices:** The periodic alarm and the timer-interrupt device it drives.

/// Periodic devices (alarm, timer interrupt).
pub mod devices;

/// Guest physical memory.
pub mod memory;

pub use memory::{GuestMemory, PhysMem};
