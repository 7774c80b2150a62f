//! # Printfix G-Code
//!
//! G-Code handling for printfix: line tokenizing, the triangulated bed
//! model, the print information collector, and the ordered preprocessing
//! passes that adapt sliced G-Code to the printer.
//!
//! [`Preprocessor`] runs one job; [`api`] exposes the same operations as
//! plain functions over a shared instance.

pub mod api;
pub mod bed;
pub mod collector;
pub mod command;
pub mod io;
pub mod parser;
pub mod pipeline;
pub mod preprocessor;
pub mod processors;

pub use bed::{BedModel, BED_CENTER_X, BED_CENTER_Y, CORNER_OFFSET_X, CORNER_OFFSET_Y};
pub use collector::{PrintBounds, PrintInformation, PrintInformationCollector, TierExtents};
pub use command::{compute_checksum, format_number, CommandKind, GcodeCommand, Word};
pub use io::{FileReadStats, GcodeFileReader, GcodeFileWriter};
pub use parser::{is_printing_move, GcodeParser, LayerTracker, MotionState, Position};
pub use pipeline::{PassContext, PassHandle, PipelineState, PreprocessorPass, PreprocessorPipeline};
pub use preprocessor::Preprocessor;
pub use processors::{
    bounded_temperature, create_tack_point, BacklashCompensationPass, BedCompensationPass,
    CenterModelPass, FeedRateConversionPass, PreparationPass, ThermalBondingPass, ValidationPass,
    WaveBondingPass,
};
