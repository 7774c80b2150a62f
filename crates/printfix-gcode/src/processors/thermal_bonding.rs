//! Thermal bonding pass
//!
//! Runs the nozzle hotter while the first layer goes down so it bonds to the
//! bed, then returns to the configured temperature.

use printfix_core::Result;
use printfix_settings::PreprocessorSettings;

use crate::command::GcodeCommand;
use crate::parser::{LayerTracker, MotionState};
use crate::pipeline::{PassContext, PipelineState, PreprocessorPass};

/// Lowest nozzle temperature the printer accepts, in °C
pub const MIN_TEMPERATURE: u16 = 150;
/// Highest nozzle temperature the printer accepts, in °C
pub const MAX_TEMPERATURE: u16 = 315;

/// Clamp a temperature into the printer's safe range
///
/// Values that are not a number fall back to the minimum.
pub fn bounded_temperature(temperature: f64) -> u16 {
    if temperature.is_nan() {
        return MIN_TEMPERATURE;
    }
    temperature
        .round()
        .clamp(f64::from(MIN_TEMPERATURE), f64::from(MAX_TEMPERATURE)) as u16
}

#[derive(Debug, Clone, Default)]
pub struct ThermalBondingState {
    pub motion: MotionState,
    pub layers: LayerTracker,
}

/// Raises the nozzle temperature for the first layer
#[derive(Debug, Clone, Default)]
pub struct ThermalBondingPass;

impl ThermalBondingPass {
    pub fn new() -> Self {
        Self
    }
}

fn heater_command(temperature: u16) -> GcodeCommand {
    GcodeCommand::new('M', 104).with('S', f64::from(temperature))
}

fn target_temperature(settings: &PreprocessorSettings, first_layer: bool) -> u16 {
    let bonus = if first_layer {
        settings.filament_type.bonding_temperature_bonus()
    } else {
        0.0
    };
    bounded_temperature(settings.filament_temperature + bonus)
}

impl PreprocessorPass for ThermalBondingPass {
    fn name(&self) -> &str {
        "thermal_bonding"
    }

    fn description(&self) -> &str {
        "Raises the nozzle temperature for the first layer"
    }

    fn is_enabled(&self, settings: &PreprocessorSettings) -> bool {
        settings.use_thermal_bonding_preprocessor
    }

    fn process(
        &self,
        command: &GcodeCommand,
        state: &mut PipelineState,
        context: &PassContext<'_>,
    ) -> Result<Vec<GcodeCommand>> {
        let state = &mut state.thermal_bonding;
        let settings = context.settings;

        let (before, after) = state.motion.apply(command);

        if command.is_motion() {
            return Ok(match state.layers.observe(&before, &after) {
                Some(1) => vec![heater_command(target_temperature(settings, true)), command.clone()],
                Some(2) => {
                    tracing::debug!("Second layer reached, restoring nozzle temperature");
                    vec![heater_command(target_temperature(settings, false)), command.clone()]
                }
                _ => vec![command.clone()],
            });
        }

        if command.is_m(104) || command.is_m(109) {
            if let Some(requested) = command.s() {
                // S0 switches the heater off and is left alone
                if requested > 0.0 {
                    let mut adjusted = command.clone();
                    let temperature = target_temperature(settings, state.layers.is_first_layer());
                    adjusted.set('S', f64::from(temperature));
                    return Ok(vec![adjusted]);
                }
            }
        }

        Ok(vec![command.clone()])
    }
}
