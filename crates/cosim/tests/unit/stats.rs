//! # Statistics Tests

use cosim_core::common::RegFile;
use cosim_core::difftest::DiffTest;
use cosim_core::stats::DiffStats;

use crate::common::harness::{ToyRef, test_memory, toy_exec};

#[test]
fn test_default_stats_are_zero() {
    let stats = DiffStats::default();
    assert_eq!(stats.ref_steps, 0);
    assert_eq!(stats.checks, 0);
    assert_eq!(stats.mismatches, 0);
    assert_eq!(stats.resyncs, 0);
    assert_eq!(stats.skips, 0);
    assert_eq!(stats.interrupts, 0);
    assert_eq!(stats.alarm_ticks, 0);
}

#[test]
fn test_match_rate() {
    let mut stats = DiffStats::default();
    assert!((stats.match_rate() - 100.0).abs() < f64::EPSILON, "no checks counts as a full match");

    stats.checks = 4;
    stats.mismatches = 1;
    assert!((stats.match_rate() - 75.0).abs() < f64::EPSILON);
}

#[test]
fn test_protocol_updates_counters() {
    let mem = test_memory(64);
    let mut dut = RegFile::default();
    let mut difftest = DiffTest::with_reference(ToyRef::default(), &mem, &mut dut, 64).unwrap();

    for _ in 0..3 {
        toy_exec(&mut dut);
        difftest.step();
        assert!(difftest.check(&dut));
    }
    difftest.skip_ref();
    assert!(difftest.check(&dut));
    difftest.raise_intr(3);

    let stats = difftest.stats();
    assert_eq!(stats.ref_steps, 3);
    assert_eq!(stats.checks, 4);
    assert_eq!(stats.skips, 1);
    assert_eq!(stats.resyncs, 1);
    assert_eq!(stats.interrupts, 1);
    stats.print();
}
