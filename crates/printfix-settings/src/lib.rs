//! Printfix Settings Crate
//!
//! Holds the preprocessor configuration: backlash, bed calibration, filament,
//! per-pass toggles, print-mode flags and the printable build volume, plus
//! JSON/TOML persistence.

pub mod config;

pub use config::{BedTier, BuildVolume, FilamentType, PreprocessorSettings};
