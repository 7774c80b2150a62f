//! # Printfix
//!
//! G-Code preprocessor for desktop 3D printers. Sliced G-Code is corrected
//! command by command before it reaches the printer:
//! - Bed tilt compensation from four calibrated corners
//! - X/Y backlash compensation on direction reversals
//! - First-layer wave bonding, tack points and thermal bonding
//! - Feed-rate conversion to the firmware speed scale
//! - Print bounds collection, build volume checks and model centering
//!
//! ## Architecture
//!
//! Printfix is organized as a workspace:
//!
//! 1. **printfix-core** - Geometry kernel, units, error types
//! 2. **printfix-settings** - Preprocessor settings and build volume
//! 3. **printfix-gcode** - Tokenizer, bed model, collector, passes and the
//!    preprocessor facade
//! 4. **printfix** - Re-exports and logging setup

pub use printfix_core as core;
pub use printfix_gcode as gcode;
pub use printfix_settings as settings;

pub use printfix_core::{ConfigurationError, Error, GcodeError, Result};
pub use printfix_gcode::{
    api, BedModel, GcodeCommand, GcodeParser, PipelineState, Preprocessor, PreprocessorPass,
    PreprocessorPipeline, PrintBounds, PrintInformation, PrintInformationCollector,
};
pub use printfix_settings::{BedTier, BuildVolume, FilamentType, PreprocessorSettings};

/// Initialize logging for the host application
///
/// The filter comes from `RUST_LOG`, with `info` as the floor.
///
/// # Errors
/// Returns error if a global subscriber is already installed
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
