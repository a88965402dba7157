//! # Error Tests
//!
//! Display formatting and source chaining for the startup error types.

use std::error::Error as _;
use std::io;

use cosim_core::common::{AlarmError, BindError, ConfigError, DiffError};

#[test]
fn test_bind_error_messages_name_the_symbol() {
    assert_eq!(
        BindError::MissingSymbol("difftest_exec").to_string(),
        "reference model does not export `difftest_exec`"
    );
    assert_eq!(
        BindError::NullSymbol("difftest_init").to_string(),
        "reference model exports `difftest_init` as a null pointer"
    );
    assert_eq!(BindError::EmptyPath.to_string(), "no reference model path given");
}

#[test]
fn test_diff_error_is_transparent_over_bind_error() {
    let err = DiffError::from(BindError::MissingSymbol("difftest_regcpy"));
    assert_eq!(
        err.to_string(),
        "reference model does not export `difftest_regcpy`"
    );
}

#[test]
fn test_image_out_of_range_message() {
    let err = DiffError::ImageOutOfRange {
        base: 0x8000_0000,
        size: 4096,
    };
    assert_eq!(
        err.to_string(),
        "image of 4096 bytes at 0x80000000 is outside guest memory"
    );
}

#[test]
fn test_alarm_error_messages() {
    assert_eq!(
        AlarmError::RegistryFull { capacity: 8 }.to_string(),
        "alarm handler registry is full (8 handlers)"
    );
    let err = AlarmError::Timer(io::Error::from(io::ErrorKind::InvalidInput));
    assert!(err.to_string().starts_with("can not set timer"));
    assert!(err.source().is_some(), "the OS error is kept as the source");
}

#[test]
fn test_config_error_messages() {
    assert_eq!(
        ConfigError::MissingReference.to_string(),
        "difftest is enabled but `ref_so` is not set"
    );
    assert_eq!(
        ConfigError::ImageTooLarge {
            image_size: 2,
            pmem_size: 1
        }
        .to_string(),
        "image size 2 exceeds guest memory size 1"
    );
}

#[test]
fn test_config_driven_diff_errors() {
    assert_eq!(
        DiffError::Disabled.to_string(),
        "difftest is disabled in the configuration"
    );
    assert_eq!(
        DiffError::BaseMismatch {
            configured: 0x9000_0000,
            actual: 0x8000_0000
        }
        .to_string(),
        "configured pmem_start 0x90000000 does not match guest memory base 0x80000000"
    );
}
