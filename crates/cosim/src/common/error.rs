//! Startup Error Definitions.
//!
//! Every failure in this crate happens once, at startup, and leaves the harness unusable.
//! This module defines:
//! 1. **Binding Errors:** Reference model path, load, and symbol resolution failures.
//! 2. **Alarm Errors:** Registry overflow and host signal/timer installation failures.
//! 3. **Difftest Errors:** Initialization handshake failures.
//! 4. **Configuration Errors:** JSON parsing and validation failures.
//!
//! Register divergence is deliberately absent: it is reported as a boolean by
//! [`DiffTest::check`](crate::difftest::DiffTest::check), never as an error.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to produce a fully bound reference model.
#[derive(Debug, Error)]
pub enum BindError {
    /// No shared object path was supplied.
    #[error("no reference model path given")]
    EmptyPath,

    /// The dynamic loader rejected the shared object.
    #[error("failed to load reference model `{}`: {source}", path.display())]
    Load {
        /// Path handed to the loader.
        path: PathBuf,
        /// Loader diagnostic.
        #[source]
        source: libloading::Error,
    },

    /// A required entry point is not exported.
    #[error("reference model does not export `{0}`")]
    MissingSymbol(&'static str),

    /// A required entry point resolved to address zero.
    #[error("reference model exports `{0}` as a null pointer")]
    NullSymbol(&'static str),
}

/// Failure to configure or arm the periodic alarm.
#[derive(Debug, Error)]
pub enum AlarmError {
    /// More handlers were registered than the registry holds.
    #[error("alarm handler registry is full ({capacity} handlers)")]
    RegistryFull {
        /// Registry capacity.
        capacity: usize,
    },

    /// Another host alarm is already armed in this process.
    #[error("a host alarm is already armed in this process")]
    AlreadyArmed,

    /// `sigaction(SIGVTALRM)` was rejected.
    #[error("can not set signal handler: {0}")]
    SignalHandler(#[source] io::Error),

    /// `setitimer(ITIMER_VIRTUAL)` was rejected.
    #[error("can not set timer: {0}")]
    Timer(#[source] io::Error),
}

/// Failure during the difftest initialization handshake.
#[derive(Debug, Error)]
pub enum DiffError {
    /// The reference model could not be bound.
    #[error(transparent)]
    Bind(#[from] BindError),

    /// The requested image does not fit in guest memory.
    #[error("image of {size} bytes at {base:#x} is outside guest memory")]
    ImageOutOfRange {
        /// Guest-physical base of the image.
        base: u64,
        /// Requested image size in bytes.
        size: usize,
    },

    /// Difftest was requested but no reference model was configured.
    #[error("difftest is enabled but no reference model is configured")]
    Unconfigured,
    /// The configuration has difftest turned off.
    #[error("difftest is disabled in the configuration")]
    Disabled,
    /// Guest memory is not based where the configuration says it is.
    #[error("configured pmem_start {configured:#x} does not match guest memory base {actual:#x}")]
    BaseMismatch {
        /// `memory.pmem_start` from the configuration.
        configured: u64,
        /// Base address of the guest memory handed to the handshake.
        actual: u64,
    },
}

/// Failure to read or validate a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document did not match the configuration schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// Difftest is enabled without a reference shared object.
    #[error("difftest is enabled but `ref_so` is not set")]
    MissingReference,

    /// The configured image is larger than guest memory.
    #[error("image size {image_size} exceeds guest memory size {pmem_size}")]
    ImageTooLarge {
        /// Configured image size in bytes.
        image_size: usize,
        /// Configured guest memory size in bytes.
        pmem_size: usize,
    },
}
