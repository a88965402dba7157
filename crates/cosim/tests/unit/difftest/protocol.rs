//! # Stepping Protocol Tests
//!
//! Tests for the initialization handshake, lockstep stepping, divergence detection, and the
//! resync, skip, and interrupt operations, driven against the in-process toy reference and a
//! `mockall` reference.

use cosim_core::common::{DiffError, INST_START, PMEM_START, RegFile};
use cosim_core::config::Config;
use cosim_core::difftest::{DiffTest, Direction, SyncState};
use cosim_core::isa::abi::{REG_A0, REG_SP};
use cosim_core::soc::PhysMem;
use cosim_core::soc::devices::timer::IRQ_TIMER;
use mockall::Sequence;
use pretty_assertions::assert_eq;

use crate::common::harness::{TRAP_VECTOR, ToyRef, init_tracing, test_memory, toy_exec, toy_trap};
use crate::common::mocks::reference::MockReference;

const IMAGE_LEN: usize = 512;

fn synced() -> (DiffTest<ToyRef>, RegFile) {
    init_tracing();
    let mem = test_memory(IMAGE_LEN);
    let mut dut = RegFile::default();
    dut.write(REG_SP, 0x8000_8000);
    let difftest =
        DiffTest::with_reference(ToyRef::default(), &mem, &mut dut, IMAGE_LEN).unwrap();
    (difftest, dut)
}

#[test]
fn test_handshake_calls_in_order() {
    let mem = test_memory(IMAGE_LEN);
    let mut dut = RegFile::with_pc(0x1234);
    let mut seq = Sequence::new();
    let mut reference = MockReference::new();

    let _ = reference
        .expect_init()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    let _ = reference
        .expect_memcpy_to_ref()
        .withf(|addr, buf| {
            *addr == PMEM_START
                && buf.len() == IMAGE_LEN
                && buf.iter().enumerate().all(|(i, b)| usize::from(*b) == i % 251)
        })
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    let _ = reference
        .expect_regcpy()
        .withf(|regs, direction| regs.pc == INST_START && *direction == Direction::ToRef)
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());

    let difftest = DiffTest::with_reference(reference, &mem, &mut dut, IMAGE_LEN).unwrap();
    assert_eq!(dut.pc, INST_START, "the DUT pc is reset to the entry point");
    assert_eq!(difftest.state(), SyncState::Synced);
    assert_eq!(*difftest.ref_regs(), dut);
}

#[test]
fn test_image_out_of_range_leaves_reference_untouched() {
    let mem = PhysMem::new(PMEM_START, 1024);
    let mut dut = RegFile::with_pc(0x42);
    // No expectations: any call on the mock panics.
    let reference = MockReference::new();

    let err = DiffTest::with_reference(reference, &mem, &mut dut, 1025).unwrap_err();
    match err {
        DiffError::ImageOutOfRange { base, size } => {
            assert_eq!(base, PMEM_START);
            assert_eq!(size, 1025);
        }
        other => panic!("expected ImageOutOfRange, got {other:?}"),
    }
    assert_eq!(dut.pc, 0x42, "the DUT is not modified on failure");
}

#[test]
fn test_whole_memory_image_is_accepted() {
    let mem = PhysMem::new(PMEM_START, 1024);
    let mut dut = RegFile::default();
    assert!(DiffTest::with_reference(ToyRef::default(), &mem, &mut dut, 1024).is_ok());
}

#[test]
fn test_reference_holds_image_and_registers_after_init() {
    let (difftest, dut) = synced();
    let reference = difftest.reference();
    assert!(reference.initialized);
    assert_eq!(reference.mem_base, PMEM_START);
    assert_eq!(reference.mem.len(), IMAGE_LEN);
    assert_eq!(reference.regs, dut);
    assert_eq!(reference.executed, 0);
}

#[test]
fn test_check_right_after_init_matches() {
    let (mut difftest, dut) = synced();
    assert!(difftest.check(&dut));
    assert!(difftest.check(&dut), "checking twice without stepping is harmless");
    assert_eq!(difftest.state(), SyncState::Synced);
    assert_eq!(difftest.stats().checks, 2);
    assert_eq!(difftest.stats().mismatches, 0);
}

#[test]
fn test_lockstep_run_matches() {
    let (mut difftest, mut dut) = synced();
    for _ in 0..1000 {
        toy_exec(&mut dut);
        difftest.step();
        assert!(difftest.check(&dut), "diverged at pc {:#x}", dut.pc);
    }
    assert_eq!(difftest.reference().executed, 1000);
    assert_eq!(difftest.stats().ref_steps, 1000);
    assert_eq!(difftest.state(), SyncState::Synced);
}

#[test]
fn test_batched_steps_match_at_checkpoints() {
    let (mut difftest, mut dut) = synced();
    for _ in 0..10 {
        for _ in 0..7 {
            toy_exec(&mut dut);
        }
        difftest.step_n(7);
        assert!(difftest.check(&dut));
    }
    difftest.step_n(0);
    assert_eq!(difftest.stats().ref_steps, 70);
}

#[test]
fn test_step_skew_is_not_hidden() {
    let (mut difftest, mut dut) = synced();
    toy_exec(&mut dut);
    toy_exec(&mut dut);
    difftest.step();
    assert!(!difftest.check(&dut), "one step behind must not compare equal");
}

#[test]
fn test_corrupted_reference_is_detected() {
    let (mut difftest, mut dut) = synced();
    toy_exec(&mut dut);
    difftest.step();

    let mut corrupted = dut;
    corrupted.gpr[7] ^= 0x80;
    difftest.sync_dut_to_ref(&corrupted);

    assert!(!difftest.check(&dut));
    assert_eq!(difftest.state(), SyncState::Diverged);
    let mismatches = difftest.mismatches(&dut);
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].name, "t2");
    assert_eq!(mismatches[0].reference, corrupted.gpr[7]);
    assert_eq!(mismatches[0].dut, dut.gpr[7]);
}

#[test]
fn test_divergence_is_sticky() {
    let (mut difftest, mut dut) = synced();
    dut.write(REG_A0, 99);
    assert!(!difftest.check(&dut));

    difftest.sync_dut_to_ref(&dut);
    assert!(difftest.check(&dut), "a resync restores register agreement");
    assert_eq!(difftest.state(), SyncState::Diverged);
    assert_eq!(difftest.stats().mismatches, 1);
    assert_eq!(difftest.stats().resyncs, 1);
}

#[test]
fn test_sync_dut_to_ref_overrides_reference_registers() {
    let (mut difftest, mut dut) = synced();
    dut.pc = 0x8000_0100;
    dut.write(REG_SP, 0x8000_4000);

    difftest.sync_dut_to_ref(&dut);
    assert_eq!(difftest.reference().regs, dut);
    assert_eq!(difftest.reference().mem.len(), IMAGE_LEN, "memory is untouched");

    toy_exec(&mut dut);
    difftest.step();
    assert!(difftest.check(&dut));
}

#[test]
fn test_skip_ref_resyncs_instead_of_stepping() {
    let (mut difftest, mut dut) = synced();
    toy_exec(&mut dut);
    difftest.step();
    assert!(difftest.check(&dut));

    // A device read the reference cannot reproduce.
    toy_exec(&mut dut);
    dut.write(REG_A0, 0xFEED);
    difftest.skip_ref();
    difftest.step();
    assert_eq!(difftest.reference().executed, 1, "the skipped step is not executed");
    assert!(difftest.check(&dut));
    assert_eq!(difftest.reference().regs, dut);
    assert_eq!(difftest.stats().skips, 1);

    toy_exec(&mut dut);
    difftest.step();
    assert!(difftest.check(&dut), "lockstep resumes after the skip");
    assert_eq!(difftest.reference().executed, 2);
    assert_eq!(difftest.state(), SyncState::Synced);
}

#[test]
fn test_raise_intr_is_forwarded() {
    let (mut difftest, mut dut) = synced();
    toy_exec(&mut dut);
    difftest.step();

    toy_trap(&mut dut, IRQ_TIMER);
    difftest.raise_intr(IRQ_TIMER);
    assert!(difftest.check(&dut));
    assert_eq!(dut.pc, TRAP_VECTOR);
    assert_eq!(difftest.reference().interrupts, vec![IRQ_TIMER]);
    assert_eq!(difftest.stats().interrupts, 1);
}

#[test]
fn test_custom_checker_replaces_default() {
    let (difftest, mut dut) = synced();
    let mut difftest = difftest.with_checker(|reference, dut| reference.pc == dut.pc);

    dut.write(REG_A0, 1);
    assert!(difftest.check(&dut), "only the pc is compared");

    dut.pc += 4;
    assert!(!difftest.check(&dut));
}

#[test]
fn test_read_ref_memory() {
    let (mut difftest, _dut) = synced();
    let mut buf = [0u8; 8];
    difftest.read_ref_memory(PMEM_START + 250, &mut buf);
    assert_eq!(buf, [250, 0, 1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_from_config_requires_reference() {
    let mut config = Config::default();
    config.difftest.enabled = true;
    let mem = test_memory(16);
    let mut dut = RegFile::default();
    let err = DiffTest::from_config(&config, &mem, &mut dut).unwrap_err();
    assert!(matches!(err, DiffError::Unconfigured), "got {err:?}");
}

#[test]
fn test_from_config_disabled_never_loads_reference() {
    let config = Config::from_json(
        r#"{ "difftest": { "enabled": false, "ref_so": "/nonexistent/ref.so", "image_size": 16 } }"#,
    )
    .unwrap();
    let mem = test_memory(16);
    let mut dut = RegFile::with_pc(0x42);
    let err = DiffTest::from_config(&config, &mem, &mut dut).unwrap_err();
    assert!(matches!(err, DiffError::Disabled), "got {err:?}");
    assert_eq!(dut.pc, 0x42, "the DUT is not touched");
}

#[test]
fn test_from_config_rejects_memory_at_another_base() {
    let config = Config::from_json(
        r#"{
            "difftest": { "enabled": true, "ref_so": "/nonexistent/ref.so", "image_size": 16 },
            "memory": { "pmem_start": 2415919104 }
        }"#,
    )
    .unwrap();
    let mem = test_memory(16);
    let mut dut = RegFile::default();
    let err = DiffTest::from_config(&config, &mem, &mut dut).unwrap_err();
    match err {
        DiffError::BaseMismatch { configured, actual } => {
            assert_eq!(configured, 0x9000_0000);
            assert_eq!(actual, PMEM_START);
        }
        other => panic!("expected BaseMismatch before any load, got {other:?}"),
    }
}

#[test]
fn test_from_config_reports_bind_failure() {
    let config = Config::from_json(
        r#"{ "difftest": { "enabled": true, "ref_so": "/nonexistent/ref.so", "image_size": 16 } }"#,
    )
    .unwrap();
    let mem = test_memory(16);
    let mut dut = RegFile::default();
    let err = DiffTest::from_config(&config, &mem, &mut dut).unwrap_err();
    assert!(matches!(err, DiffError::Bind(_)), "got {err:?}");
}

#[test]
fn test_regcpy_to_dut_feeds_the_comparison() {
    let mem = test_memory(IMAGE_LEN);
    let mut dut = RegFile::default();
    let mut reference = MockReference::new();
    let _ = reference.expect_init().return_const(());
    let _ = reference.expect_memcpy_to_ref().return_const(());
    let _ = reference
        .expect_regcpy()
        .withf(|_, direction| *direction == Direction::ToRef)
        .return_const(());
    let _ = reference.expect_exec().withf(|n| *n == 1).times(1).return_const(());
    let _ = reference
        .expect_regcpy()
        .withf(|_, direction| *direction == Direction::ToDut)
        .times(1)
        .returning(|regs, _| {
            regs.pc = INST_START + 4;
            regs.gpr[1] = 0xAA;
        });

    let mut difftest = DiffTest::with_reference(reference, &mem, &mut dut, IMAGE_LEN).unwrap();
    difftest.step();

    let mut expected = RegFile::with_pc(INST_START + 4);
    expected.gpr[1] = 0xAA;
    assert!(difftest.check(&expected));
    assert_eq!(*difftest.ref_regs(), expected);
}
