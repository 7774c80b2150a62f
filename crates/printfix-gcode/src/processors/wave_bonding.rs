//! Wave bonding pass
//!
//! On the first layer, extruding moves are cut into short segments whose
//! heights follow a small wave, pressing filament into the bed at regular
//! intervals. Sharp corners get a tack point: a dwell that lets the filament
//! anchor before the head turns back on itself.

use printfix_core::{distance, is_sharp_corner, Point3, Result, Vector3};
use printfix_settings::PreprocessorSettings;

use super::ensure_finite;
use crate::command::GcodeCommand;
use crate::parser::{LayerTracker, MotionState, Position};
use crate::pipeline::{PassContext, PipelineState, PreprocessorPass};

/// Travel distance of one full wave, in mm
pub const WAVE_PERIOD: f64 = 5.0;
/// Longest segment an extruding move is cut into
pub const WAVE_PERIOD_QUARTER: f64 = WAVE_PERIOD / 4.0;
/// Amplitude of the wave, in mm
pub const WAVE_SIZE: f64 = 0.15;

/// Z adjustment per segment, in units of `WAVE_SIZE`
const WAVE_STEPS: [f64; 4] = [1.0, 0.0, -1.5, 0.0];

/// Dwells this short (in ms) are not worth emitting
const MIN_TACK_POINT_TIME: f64 = 5.0;

const MIN_TRAVEL: f64 = 1e-9;

/// Upper bound on segments per move; longer moves get longer segments
pub const MAX_WAVE_SEGMENTS: usize = 1024;

/// Dwell command for a corner at `point`, timed by its distance from `reference`
///
/// Returns `None` when the dwell would be 5 ms or shorter.
pub fn create_tack_point(point: &Point3<f64>, reference: &Point3<f64>) -> Option<GcodeCommand> {
    let time = distance(point, reference).ceil();
    (time > MIN_TACK_POINT_TIME).then(|| GcodeCommand::new('G', 4).with('P', time))
}

#[derive(Debug, Clone, Default)]
pub struct WaveBondingState {
    pub motion: MotionState,
    pub layers: LayerTracker,
    /// Index into the wave for the next segment
    pub wave_step: usize,
    /// Z offset of the last emitted segment
    pub current_adjustment_z: f64,
    /// X/Y travel of the last move that went anywhere
    pub previous_travel: Option<Vector3<f64>>,
    /// Where the last tack point was placed
    pub tack_reference: Option<Point3<f64>>,
    /// Tack point found on a travel move, emitted before the next extruding move
    pub pending_tack_point: Option<GcodeCommand>,
}

impl WaveBondingState {
    /// Put back the true Z on a move if the last segment left an offset
    fn restore_z(&mut self, command: &GcodeCommand, after: &Position) -> GcodeCommand {
        if self.current_adjustment_z == 0.0 {
            return command.clone();
        }

        let mut restored = command.clone();
        if self.motion.relative {
            restored.set('Z', command.z().unwrap_or(0.0) - self.current_adjustment_z);
        } else {
            restored.set('Z', after.z);
        }
        self.current_adjustment_z = 0.0;
        restored
    }
}

/// Splits first-layer moves into a Z wave and adds tack points at corners
#[derive(Debug, Clone, Default)]
pub struct WaveBondingPass;

impl WaveBondingPass {
    pub fn new() -> Self {
        Self
    }
}

impl PreprocessorPass for WaveBondingPass {
    fn name(&self) -> &str {
        "wave_bonding"
    }

    fn description(&self) -> &str {
        "Adds a Z wave and corner tack points to the first layer"
    }

    fn is_enabled(&self, settings: &PreprocessorSettings) -> bool {
        settings.use_wave_bonding_preprocessor
    }

    fn process(
        &self,
        command: &GcodeCommand,
        state: &mut PipelineState,
        _context: &PassContext<'_>,
    ) -> Result<Vec<GcodeCommand>> {
        let state = &mut state.wave_bonding;

        if !command.is_motion() {
            state.motion.apply(command);
            return Ok(vec![command.clone()]);
        }
        ensure_finite(command)?;

        let relative = state.motion.relative;
        let (before, after) = state.motion.apply(command);
        state.layers.observe(&before, &after);

        if relative || !state.layers.is_first_layer() {
            state.pending_tack_point = None;
            return Ok(vec![state.restore_z(command, &after)]);
        }

        let travel = Vector3::new(after.x - before.x, after.y - before.y, 0.0);
        let moving = travel.norm() > MIN_TRAVEL;
        let extruding = moving && after.e > before.e;
        let mut output = Vec::new();

        if extruding {
            if let Some(tack_point) = state.pending_tack_point.take() {
                output.push(tack_point);
            }
            if state.tack_reference.is_none() {
                state.tack_reference = Some(before.point());
            }
        }

        if moving {
            if let Some(previous) = state.previous_travel {
                if is_sharp_corner(&travel, &previous) {
                    let corner = before.point();
                    let reference = state.tack_reference.unwrap_or(corner);
                    if let Some(tack_point) = create_tack_point(&corner, &reference) {
                        tracing::debug!("Sharp corner at ({}, {}), adding {}", corner.x, corner.y, tack_point);
                        if extruding {
                            output.push(tack_point);
                        } else {
                            state.pending_tack_point = Some(tack_point);
                        }
                    }
                    state.tack_reference = Some(corner);
                }
            }
            state.previous_travel = Some(travel);
        }

        if !extruding {
            output.push(state.restore_z(command, &after));
            return Ok(output);
        }

        let wanted = (travel.norm() / WAVE_PERIOD_QUARTER).ceil().max(1.0);
        if wanted > MAX_WAVE_SEGMENTS as f64 {
            tracing::warn!(
                "Wave bonding move of {} mm limited to {} segments",
                travel.norm(),
                MAX_WAVE_SEGMENTS
            );
        }
        let segments = wanted.min(MAX_WAVE_SEGMENTS as f64) as usize;
        let relative_extrusion = state.motion.relative_extrusion;

        for index in 1..=segments {
            let point = before.lerp(&after, index as f64 / segments as f64);
            let adjustment = WAVE_STEPS[state.wave_step] * WAVE_SIZE;
            state.wave_step = (state.wave_step + 1) % WAVE_STEPS.len();

            let extrusion = if relative_extrusion {
                (after.e - before.e) / segments as f64
            } else {
                point.e
            };

            let mut segment = GcodeCommand::new('G', 1)
                .with('X', point.x)
                .with('Y', point.y)
                .with('Z', point.z + adjustment)
                .with('E', extrusion);
            if index == 1 {
                if let Some(feed_rate) = command.f() {
                    segment.set('F', feed_rate);
                }
            }

            state.current_adjustment_z = adjustment;
            output.push(segment);
        }

        Ok(output)
    }

    fn finish(
        &self,
        state: &mut PipelineState,
        _context: &PassContext<'_>,
    ) -> Result<Vec<GcodeCommand>> {
        let state = &mut state.wave_bonding;
        state.pending_tack_point = None;

        if state.current_adjustment_z == 0.0 {
            return Ok(Vec::new());
        }

        let z = if state.motion.relative {
            -state.current_adjustment_z
        } else {
            state.motion.position.z
        };
        state.current_adjustment_z = 0.0;
        Ok(vec![GcodeCommand::new('G', 0).with('Z', z)])
    }
}
