//! Preparation pass
//!
//! Frames the job with the printer's start and end sequences and normalizes
//! commands before the geometry passes see them: inch input becomes
//! millimetres and a bare `G92` spells out the axes it resets.

use printfix_core::{MeasurementSystem, FeedRateUnits, Result};
use printfix_settings::{FilamentType, PreprocessorSettings};

use super::bounded_temperature;
use crate::command::GcodeCommand;
use crate::pipeline::{PassContext, PipelineState, PreprocessorPass};

/// Height the head is raised to before homing, in mm
const HOMING_LIFT: f64 = 5.0;
/// Lower lift used with the Micro Pass frame
const MICRO_PASS_HOMING_LIFT: f64 = 3.0;
/// Lift at the end of the print, relative, in mm
const FINAL_LIFT: f64 = 3.0;
pub(crate) const TRAVEL_FEED_RATE: f64 = 2900.0;
const EXTRUDER_FEED_RATE: f64 = 2000.0;
/// Filament pushed through the nozzle before printing, in mm
const PRIME_LENGTH: f64 = 7.5;
const FINAL_RETRACT: f64 = 1.0;

#[derive(Debug, Clone, Default)]
pub struct PreparationState {
    /// A command of this job has been seen
    pub started: bool,
    /// End sequence emitted
    pub finished: bool,
    /// `G20` is active; coordinates arrive in inches
    pub inch_mode: bool,
}

/// Adds start/end sequences and normalizes units
#[derive(Debug, Clone, Default)]
pub struct PreparationPass;

impl PreparationPass {
    pub fn new() -> Self {
        Self
    }
}

impl PreprocessorPass for PreparationPass {
    fn name(&self) -> &str {
        "preparation"
    }

    fn description(&self) -> &str {
        "Adds start and end sequences and converts inch input to millimetres"
    }

    fn is_enabled(&self, settings: &PreprocessorSettings) -> bool {
        settings.use_preparation_preprocessor
    }

    fn process(
        &self,
        command: &GcodeCommand,
        state: &mut PipelineState,
        context: &PassContext<'_>,
    ) -> Result<Vec<GcodeCommand>> {
        let state = &mut state.preparation;
        let mut output = Vec::new();

        if !state.started {
            state.started = true;
            if !context.settings.printing_test_pattern() {
                output.extend(start_sequence(context.settings));
            }
        }

        if !command.is_command() {
            output.push(command.clone());
            return Ok(output);
        }

        if command.is_g(20) {
            state.inch_mode = true;
            output.push(GcodeCommand::new('G', 21));
            return Ok(output);
        }
        if command.is_g(21) {
            state.inch_mode = false;
        }

        let mut prepared = command.clone();

        if prepared.is_g(92) && !prepared.has_axis_words() {
            for axis in ['X', 'Y', 'Z', 'E'] {
                prepared.set(axis, 0.0);
            }
        }

        if state.inch_mode && (prepared.is_motion() || prepared.is_g(92)) {
            for axis in ['X', 'Y', 'Z', 'E'] {
                if let Some(value) = prepared.get(axis) {
                    prepared.set(axis, MeasurementSystem::Imperial.to_millimeters(value));
                }
            }
            if let Some(feed_rate) = prepared.f() {
                prepared.set('F', FeedRateUnits::InPerMin.to_mm_per_min(feed_rate));
            }
        }

        output.push(prepared);
        Ok(output)
    }

    fn finish(
        &self,
        state: &mut PipelineState,
        context: &PassContext<'_>,
    ) -> Result<Vec<GcodeCommand>> {
        let state = &mut state.preparation;
        if !state.started || state.finished || context.settings.printing_test_pattern() {
            return Ok(Vec::new());
        }
        state.finished = true;
        Ok(end_sequence())
    }
}

/// Fan, motors, homing, heating and priming
fn start_sequence(settings: &PreprocessorSettings) -> Vec<GcodeCommand> {
    let temperature = f64::from(bounded_temperature(settings.filament_temperature));
    let fan_speed = match settings.filament_type {
        FilamentType::Pla => 255.0,
        _ => 50.0,
    };
    let lift = if settings.using_micro_pass {
        MICRO_PASS_HOMING_LIFT
    } else {
        HOMING_LIFT
    };

    vec![
        GcodeCommand::new('M', 106).with('S', fan_speed),
        GcodeCommand::new('M', 17),
        GcodeCommand::new('G', 90),
        GcodeCommand::new('M', 104).with('S', temperature),
        GcodeCommand::new('G', 0).with('Z', lift).with('F', TRAVEL_FEED_RATE),
        GcodeCommand::new('G', 28),
        GcodeCommand::new('M', 109).with('S', temperature),
        GcodeCommand::new('G', 92).with('E', 0.0),
        GcodeCommand::new('G', 1)
            .with('E', PRIME_LENGTH)
            .with('F', EXTRUDER_FEED_RATE),
        GcodeCommand::new('G', 92).with('E', 0.0),
    ]
}

/// Retract, lift clear of the print, and shut everything down
fn end_sequence() -> Vec<GcodeCommand> {
    vec![
        GcodeCommand::new('G', 91),
        GcodeCommand::new('G', 0)
            .with('E', -FINAL_RETRACT)
            .with('F', EXTRUDER_FEED_RATE),
        GcodeCommand::new('G', 0)
            .with('Z', FINAL_LIFT)
            .with('F', TRAVEL_FEED_RATE),
        GcodeCommand::new('G', 90),
        GcodeCommand::new('M', 104).with('S', 0.0),
        GcodeCommand::new('M', 107),
        GcodeCommand::new('M', 18),
    ]
}
