//! Co-simulation statistics collection and reporting.
//!
//! This module tracks what a lockstep run did. It provides:
//! 1. **Protocol counters:** Reference steps, comparisons, mismatches, resyncs, and skips.
//! 2. **Interrupt counters:** Interrupts forwarded to the reference and alarm ticks delivered.
//! 3. **Reporting:** A fixed-width summary printed to stdout at the end of a run.

use std::time::Instant;

/// Counters for one lockstep run.
#[derive(Clone, Debug)]
pub struct DiffStats {
    start_time: Instant,
    /// Instructions the reference model was told to execute.
    pub ref_steps: u64,
    /// Register comparisons performed (including skipped ones).
    pub checks: u64,
    /// Comparisons that reported a divergence.
    pub mismatches: u64,
    /// DUT-to-reference register overrides.
    pub resyncs: u64,
    /// Comparisons replaced by a resync because the step was unverifiable.
    pub skips: u64,
    /// Interrupts forwarded to the reference model.
    pub interrupts: u64,
    /// Alarm ticks delivered to handlers.
    pub alarm_ticks: u64,
}

impl Default for DiffStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            ref_steps: 0,
            checks: 0,
            mismatches: 0,
            resyncs: 0,
            skips: 0,
            interrupts: 0,
            alarm_ticks: 0,
        }
    }
}

impl DiffStats {
    /// Fraction of comparisons that matched, in percent. Returns 100 when nothing was checked.
    pub fn match_rate(&self) -> f64 {
        if self.checks == 0 {
            return 100.0;
        }
        let matched = self.checks.saturating_sub(self.mismatches);
        (matched as f64 / self.checks as f64) * 100.0
    }

    /// Prints a summary of the run to stdout.
    pub fn print(&self) {
        let seconds = self.start_time.elapsed().as_secs_f64();
        println!("\n==========================================================");
        println!("DIFFTEST STATISTICS");
        println!("==========================================================");
        println!("host_seconds             {seconds:.4} s");
        println!("ref_steps                {}", self.ref_steps);
        println!("checks                   {}", self.checks);
        println!(
            "mismatches               {} ({:.2}% match)",
            self.mismatches,
            self.match_rate()
        );
        println!("resyncs                  {}", self.resyncs);
        println!("skips                    {}", self.skips);
        println!("interrupts               {}", self.interrupts);
        println!("alarm_ticks              {}", self.alarm_ticks);
        println!("----------------------------------------------------------");
    }
}
