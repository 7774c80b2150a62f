//! Backlash compensation pass
//!
//! The X and Y belts have slack that eats part of the first move after the
//! axis changes direction. Each reversal is preceded by a fast corrective move
//! that takes up the slack, and everything after it is shifted by the
//! accumulated compensation.

use printfix_core::Result;
use printfix_settings::PreprocessorSettings;

use super::ensure_finite;
use super::preparation::TRAVEL_FEED_RATE;
use crate::command::GcodeCommand;
use crate::parser::MotionState;
use crate::pipeline::{PassContext, PipelineState, PreprocessorPass};

const AXES: [char; 2] = ['X', 'Y'];

#[derive(Debug, Clone, Default)]
pub struct BacklashState {
    pub motion: MotionState,
    /// Last direction of travel per axis (X, Y), `1.0` or `-1.0`
    pub direction: [Option<f64>; 2],
    /// Accumulated shift per axis (X, Y)
    pub compensation: [f64; 2],
}

impl BacklashState {
    /// Forget directions and compensation, as after homing
    pub fn clear(&mut self) {
        self.direction = [None; 2];
        self.compensation = [0.0; 2];
    }
}

/// Adds corrective moves on X/Y direction reversals
#[derive(Debug, Clone, Default)]
pub struct BacklashCompensationPass;

impl BacklashCompensationPass {
    pub fn new() -> Self {
        Self
    }
}

impl PreprocessorPass for BacklashCompensationPass {
    fn name(&self) -> &str {
        "backlash_compensation"
    }

    fn description(&self) -> &str {
        "Takes up belt slack when the X or Y axis reverses"
    }

    fn is_enabled(&self, settings: &PreprocessorSettings) -> bool {
        settings.use_backlash_compensation_preprocessor
    }

    fn process(
        &self,
        command: &GcodeCommand,
        state: &mut PipelineState,
        context: &PassContext<'_>,
    ) -> Result<Vec<GcodeCommand>> {
        let state = &mut state.backlash;
        let settings = context.settings;

        if !command.is_motion() {
            state.motion.apply(command);

            if command.is_g(28) {
                state.clear();
                return Ok(vec![command.clone()]);
            }
            if command.is_g(92) && state.compensation != [0.0; 2] {
                let mut shifted = command.clone();
                shift_axes(&mut shifted, &state.compensation);
                return Ok(vec![shifted]);
            }
            return Ok(vec![command.clone()]);
        }
        ensure_finite(command)?;

        let relative = state.motion.relative;
        let previous_feed_rate = state.motion.feed_rate;
        let (before, after) = state.motion.apply(command);
        let deltas = [after.x - before.x, after.y - before.y];
        let backlash = [settings.backlash_x, settings.backlash_y];
        let starts = [before.x, before.y];

        let mut corrective = GcodeCommand::new('G', 0);
        let mut reversed = false;

        for axis in 0..AXES.len() {
            if deltas[axis] == 0.0 {
                continue;
            }
            let direction = deltas[axis].signum();
            if state.direction[axis].is_some_and(|previous| previous != direction) {
                let previous_compensation = state.compensation[axis];
                state.compensation[axis] += direction * backlash[axis];
                let target = if relative {
                    state.compensation[axis] - previous_compensation
                } else {
                    starts[axis] + state.compensation[axis]
                };
                corrective.set(AXES[axis], target);
                reversed = true;
            }
            state.direction[axis] = Some(direction);
        }

        let mut moved = command.clone();
        if !relative {
            shift_axes(&mut moved, &state.compensation);
        }

        if !reversed {
            return Ok(vec![moved]);
        }

        tracing::debug!("Axis reversal before '{}', adding {}", command, corrective);
        corrective.set('F', settings.backlash_speed);
        // Without a known feed rate the move would inherit the backlash speed
        let feed_rate = command.f().or(previous_feed_rate).unwrap_or(TRAVEL_FEED_RATE);
        moved.set('F', feed_rate);
        Ok(vec![corrective, moved])
    }
}

/// Shift the X/Y words present on `command` by the compensation
fn shift_axes(command: &mut GcodeCommand, compensation: &[f64; 2]) {
    for (axis, shift) in AXES.iter().zip(compensation) {
        if *shift == 0.0 {
            continue;
        }
        if let Some(value) = command.get(*axis) {
            command.set(*axis, value + shift);
        }
    }
}
