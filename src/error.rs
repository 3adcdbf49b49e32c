//! Error taxonomy.
//!
//! Peripheral failures are caught at the component that owns the peripheral and
//! degrade to a fallback; none of these errors are allowed to stop the main loop.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by console components and hardware backends.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// A peripheral failed to initialize or stopped responding.
    ///
    /// Callers degrade (keypad-only input, disabled display) instead of failing.
    #[error("device `{device}` unavailable: {reason}")]
    DeviceUnavailable { device: String, reason: String },

    /// A raw input value outside the known mapping (e.g. a scancode with no key).
    #[error("input glitch: {0}")]
    InputGlitch(String),

    /// Filesystem-level I/O on a device node, sysfs attribute or config file.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The game catalog violates its id invariants.
    #[error("invalid catalog: {0}")]
    Catalog(String),
}

impl ConsoleError {
    pub fn unavailable(device: impl Into<String>, reason: impl ToString) -> Self {
        ConsoleError::DeviceUnavailable {
            device: device.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConsoleError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A game session could not be constructed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("launch failed: {reason}")]
pub struct LaunchError {
    pub reason: String,
}

impl LaunchError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
