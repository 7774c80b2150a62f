//! Error handling for printfix
//!
//! Provides error types for every layer of the preprocessor:
//! - Configuration errors (bed geometry, filament names, settings files)
//! - G-Code errors (tokenizing and per-command anomalies)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Configuration error type
///
/// Raised when the configured machine description cannot be used. These are
/// reported to the caller immediately and are never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// Calibration points do not describe a usable bed surface
    #[error("Degenerate bed geometry: {reason}")]
    DegenerateBedGeometry {
        /// What made the geometry unusable.
        reason: String,
    },

    /// Filament type name is not recognised
    #[error("Invalid filament type: {value}")]
    InvalidFilamentType {
        /// The rejected filament name.
        value: String,
    },

    /// A setting holds a value that cannot be used
    #[error("Invalid setting value for {setting}: {reason}")]
    InvalidSetting {
        /// The setting with the invalid value.
        setting: String,
        /// The reason the value is invalid.
        reason: String,
    },
}

/// G-Code error type
///
/// Represents problems with a single command. The pipeline recovers from
/// these by forwarding the offending command unmodified.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GcodeError {
    /// Line could not be tokenized
    #[error("Invalid syntax in '{line}': {reason}")]
    InvalidSyntax {
        /// The offending source line.
        line: String,
        /// The reason for the syntax error.
        reason: String,
    },

    /// A parameter or computed coordinate is NaN or infinite
    #[error("Non-finite value for parameter '{parameter}'")]
    NonFiniteValue {
        /// The parameter letter.
        parameter: char,
    },

    /// Generic G-Code error
    #[error("G-Code error: {message}")]
    Other {
        /// The error message.
        message: String,
    },
}

/// Main error type for printfix
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// G-Code error
    #[error(transparent)]
    Gcode(#[from] GcodeError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this error must abort processing instead of being recovered per command
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::Io(_))
    }

    /// Check if this is a configuration error
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// Check if this is a G-Code error
    pub fn is_gcode_error(&self) -> bool {
        matches!(self, Error::Gcode(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
