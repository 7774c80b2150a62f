//! Bed compensation pass
//!
//! Follows the calibrated bed surface by adding the bed model's height
//! adjustment to every move.

use printfix_core::Result;
use printfix_settings::PreprocessorSettings;

use super::ensure_finite;
use crate::command::GcodeCommand;
use crate::parser::MotionState;
use crate::pipeline::{PassContext, PipelineState, PreprocessorPass};

#[derive(Debug, Clone, Default)]
pub struct BedCompensationState {
    pub motion: MotionState,
}

/// Adjusts Z to the bed surface
#[derive(Debug, Clone, Default)]
pub struct BedCompensationPass;

impl BedCompensationPass {
    pub fn new() -> Self {
        Self
    }
}

impl PreprocessorPass for BedCompensationPass {
    fn name(&self) -> &str {
        "bed_compensation"
    }

    fn description(&self) -> &str {
        "Raises or lowers moves to follow the calibrated bed surface"
    }

    fn is_enabled(&self, settings: &PreprocessorSettings) -> bool {
        settings.use_bed_compensation_preprocessor
    }

    fn process(
        &self,
        command: &GcodeCommand,
        state: &mut PipelineState,
        context: &PassContext<'_>,
    ) -> Result<Vec<GcodeCommand>> {
        let state = &mut state.bed_compensation;

        if !command.is_motion() {
            state.motion.apply(command);
            return Ok(vec![command.clone()]);
        }
        ensure_finite(command)?;

        let relative = state.motion.relative;
        let (before, after) = state.motion.apply(command);

        let Some(bed) = context.bed else {
            return Ok(vec![command.clone()]);
        };
        if !(command.has('X') || command.has('Y') || command.has('Z')) {
            return Ok(vec![command.clone()]);
        }

        let (dx, dy) = context.active_displacement();
        let adjustment_after = bed.height_adjustment(after.x + dx, after.y + dy);

        let mut compensated = command.clone();
        if relative {
            let adjustment_before = bed.height_adjustment(before.x + dx, before.y + dy);
            let delta = adjustment_after - adjustment_before;
            if delta == 0.0 {
                return Ok(vec![command.clone()]);
            }
            compensated.set('Z', command.z().unwrap_or(0.0) + delta);
        } else {
            compensated.set('Z', after.z + adjustment_after);
        }

        Ok(vec![compensated])
    }
}
