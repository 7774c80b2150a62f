//! Center-model pass
//!
//! Moves the whole print so its X/Y bounds are centred on the bed. The
//! displacement comes from the print information collected beforehand.

use printfix_core::Result;
use printfix_settings::PreprocessorSettings;

use crate::command::GcodeCommand;
use crate::parser::MotionState;
use crate::pipeline::{PassContext, PipelineState, PreprocessorPass};

#[derive(Debug, Clone, Default)]
pub struct CenterModelState {
    pub motion: MotionState,
    /// Missing print bounds already reported
    pub reported_missing_bounds: bool,
}

/// Shifts the print to the bed centre
#[derive(Debug, Clone, Default)]
pub struct CenterModelPass;

impl CenterModelPass {
    pub fn new() -> Self {
        Self
    }
}

impl PreprocessorPass for CenterModelPass {
    fn name(&self) -> &str {
        "center_model"
    }

    fn description(&self) -> &str {
        "Centres the print on the bed using the collected print bounds"
    }

    fn is_enabled(&self, settings: &PreprocessorSettings) -> bool {
        settings.use_center_model_preprocessor
    }

    fn process(
        &self,
        command: &GcodeCommand,
        state: &mut PipelineState,
        context: &PassContext<'_>,
    ) -> Result<Vec<GcodeCommand>> {
        let state = &mut state.center_model;
        let relative = state.motion.relative;
        state.motion.apply(command);

        if !context.settings.centers_model() {
            return Ok(vec![command.clone()]);
        }
        let Some((dx, dy)) = context.center_displacement else {
            if !state.reported_missing_bounds {
                tracing::debug!("No valid print bounds, leaving the model where it is");
                state.reported_missing_bounds = true;
            }
            return Ok(vec![command.clone()]);
        };

        let shifts = (command.is_motion() && !relative) || command.is_g(92);
        if !shifts || !(command.has('X') || command.has('Y')) {
            return Ok(vec![command.clone()]);
        }

        let mut centred = command.clone();
        if let Some(x) = command.x() {
            centred.set('X', x + dx);
        }
        if let Some(y) = command.y() {
            centred.set('Y', y + dy);
        }
        Ok(vec![centred])
    }
}
