//! Configuration for the co-simulation harness.
//!
//! This module defines the configuration structures used to set up a lockstep run. It provides:
//! 1. **Defaults:** Guest memory layout and difftest settings.
//! 2. **Structures:** Difftest and memory sections, each with per-field defaults.
//! 3. **Validation:** Rejection of configurations that could never start.
//!
//! Configuration is supplied as JSON, or use `Config::default()` for a run without difftest.

use std::path::PathBuf;

use serde::Deserialize;

use crate::common::error::ConfigError;

/// Default configuration constants for the harness.
mod defaults {
    use crate::common::constants;

    /// Base address of guest physical memory.
    pub const PMEM_START: u64 = constants::PMEM_START;

    /// Size of guest physical memory (128 MiB).
    pub const PMEM_SIZE: usize = constants::PMEM_SIZE;

    /// Reset program counter.
    pub const INST_START: u64 = constants::INST_START;

    /// Bytes of guest memory copied into the reference at initialization (1 MiB).
    ///
    /// Loaders normally override this with the size of the image they placed.
    pub const IMAGE_SIZE: usize = 1024 * 1024;
}

/// Root configuration.
///
/// # Examples
///
/// ```
/// use cosim_core::config::Config;
///
/// let json = r#"{
///     "difftest": {
///         "enabled": true,
///         "ref_so": "/opt/ref/riscv64-nemu-interpreter-so",
///         "image_size": 4096
///     },
///     "memory": {
///         "pmem_size": 8388608
///     }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert!(config.difftest.enabled);
/// assert_eq!(config.difftest.image_size, 4096);
/// assert_eq!(config.memory.pmem_start, 0x8000_0000);
/// assert_eq!(config.memory.pmem_size, 8 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Differential testing settings
    #[serde(default)]
    pub difftest: DiffTestConfig,
    /// Guest memory layout
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Config {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed JSON and any error from [`Config::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration can be used to start a run.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::MissingReference`] if difftest is enabled without `ref_so`.
    /// * [`ConfigError::ImageTooLarge`] if the image would not fit in guest memory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.difftest.enabled && self.difftest.ref_so.is_none() {
            return Err(ConfigError::MissingReference);
        }
        if self.difftest.image_size > self.memory.pmem_size {
            return Err(ConfigError::ImageTooLarge {
                image_size: self.difftest.image_size,
                pmem_size: self.memory.pmem_size,
            });
        }
        Ok(())
    }
}

/// Differential testing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DiffTestConfig {
    /// Run the reference model in lockstep with the DUT
    #[serde(default)]
    pub enabled: bool,

    /// Path to the reference model shared object
    #[serde(default)]
    pub ref_so: Option<PathBuf>,

    /// Bytes of guest memory, starting at `pmem_start`, copied into the reference at startup
    #[serde(default = "DiffTestConfig::default_image_size")]
    pub image_size: usize,

    /// Stop the session at the first register mismatch instead of counting and continuing
    #[serde(default = "DiffTestConfig::default_halt_on_mismatch")]
    pub halt_on_mismatch: bool,
}

impl DiffTestConfig {
    /// Returns the default image size.
    fn default_image_size() -> usize {
        defaults::IMAGE_SIZE
    }

    /// Halting on the first divergence is the usual debugging mode.
    fn default_halt_on_mismatch() -> bool {
        true
    }
}

impl Default for DiffTestConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ref_so: None,
            image_size: defaults::IMAGE_SIZE,
            halt_on_mismatch: true,
        }
    }
}

/// Guest physical memory layout.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Guest-physical base address of memory
    #[serde(default = "MemoryConfig::default_pmem_start")]
    pub pmem_start: u64,

    /// Size of guest memory in bytes
    #[serde(default = "MemoryConfig::default_pmem_size")]
    pub pmem_size: usize,

    /// Program counter the DUT is reset to before the first register sync
    #[serde(default = "MemoryConfig::default_inst_start")]
    pub inst_start: u64,
}

impl MemoryConfig {
    fn default_pmem_start() -> u64 {
        defaults::PMEM_START
    }

    fn default_pmem_size() -> usize {
        defaults::PMEM_SIZE
    }

    fn default_inst_start() -> u64 {
        defaults::INST_START
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            pmem_start: defaults::PMEM_START,
            pmem_size: defaults::PMEM_SIZE,
            inst_start: defaults::INST_START,
        }
    }
}
