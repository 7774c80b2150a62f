//! Preprocessing pass contract and the ordered pass pipeline

use std::sync::Arc;

use printfix_core::Result;
use printfix_settings::PreprocessorSettings;

use crate::bed::BedModel;
use crate::command::GcodeCommand;
use crate::processors::{
    BacklashCompensationPass, BacklashState, BedCompensationPass, BedCompensationState,
    CenterModelPass, CenterModelState, FeedRateConversionPass, PreparationPass, PreparationState,
    ThermalBondingPass, ThermalBondingState, ValidationPass, WaveBondingPass, WaveBondingState,
};

/// Read-only inputs shared by every pass for one call
#[derive(Debug, Clone, Copy)]
pub struct PassContext<'a> {
    pub settings: &'a PreprocessorSettings,
    /// Bed surface, present when bed compensation is enabled
    pub bed: Option<&'a BedModel>,
    /// X/Y shift that centres the model, when print bounds are known
    pub center_displacement: Option<(f64, f64)>,
    /// Set on the final command of a job
    pub last_command: bool,
}

impl<'a> PassContext<'a> {
    pub fn new(settings: &'a PreprocessorSettings) -> Self {
        Self {
            settings,
            bed: None,
            center_displacement: None,
            last_command: false,
        }
    }

    pub fn with_bed(mut self, bed: &'a BedModel) -> Self {
        self.bed = Some(bed);
        self
    }

    pub fn with_center_displacement(mut self, displacement: Option<(f64, f64)>) -> Self {
        self.center_displacement = displacement;
        self
    }

    pub fn with_last_command(mut self, last_command: bool) -> Self {
        self.last_command = last_command;
        self
    }

    /// Displacement applied by the center-model pass, or none
    pub fn active_displacement(&self) -> (f64, f64) {
        if self.settings.centers_model() {
            self.center_displacement.unwrap_or((0.0, 0.0))
        } else {
            (0.0, 0.0)
        }
    }
}

/// Persistent state of every pass across calls
///
/// Each pass keeps its own view of the machine, since it sees the stream as
/// emitted by the passes before it.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub preparation: PreparationState,
    pub wave_bonding: WaveBondingState,
    pub thermal_bonding: ThermalBondingState,
    pub bed_compensation: BedCompensationState,
    pub backlash: BacklashState,
    pub center_model: CenterModelState,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current wave bonding Z adjustment
    pub fn current_adjustment_z(&self) -> f64 {
        self.wave_bonding.current_adjustment_z
    }

    /// Forget everything learned from previous commands
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Trait for preprocessing passes
///
/// A pass transforms one command into zero or more commands. Returning an
/// empty vector drops the command; returning several inserts commands
/// around it.
pub trait PreprocessorPass: Send + Sync {
    /// Get the name/identifier of this pass
    fn name(&self) -> &str;

    /// Get a description of what this pass does
    fn description(&self) -> &str;

    /// Check if the settings enable this pass
    fn is_enabled(&self, settings: &PreprocessorSettings) -> bool;

    /// Process a single command
    ///
    /// # Errors
    /// Fatal errors (see [`printfix_core::Error::is_fatal`]) abort the call;
    /// any other error forwards `command` unmodified.
    fn process(
        &self,
        command: &GcodeCommand,
        state: &mut PipelineState,
        context: &PassContext<'_>,
    ) -> Result<Vec<GcodeCommand>>;

    /// Emit deferred output after the last command of a job
    fn finish(
        &self,
        _state: &mut PipelineState,
        _context: &PassContext<'_>,
    ) -> Result<Vec<GcodeCommand>> {
        Ok(Vec::new())
    }
}

/// Arc-wrapped pass for thread-safe sharing
pub type PassHandle = Arc<dyn PreprocessorPass>;

/// Ordered chain of preprocessing passes
///
/// Every command a pass emits is fed to the next pass. On the last command
/// of a job, each pass's deferred output is appended after its regular
/// output and flows through the passes that follow.
pub struct PreprocessorPipeline {
    passes: Vec<PassHandle>,
}

impl PreprocessorPipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Pipeline with every pass in its fixed order
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        pipeline.register_all(vec![
            Arc::new(ValidationPass::new()),
            Arc::new(PreparationPass::new()),
            Arc::new(WaveBondingPass::new()),
            Arc::new(ThermalBondingPass::new()),
            Arc::new(BedCompensationPass::new()),
            Arc::new(BacklashCompensationPass::new()),
            Arc::new(FeedRateConversionPass::new()),
            Arc::new(CenterModelPass::new()),
        ]);
        pipeline
    }

    /// Register a pass; passes run in registration order
    pub fn register(&mut self, pass: PassHandle) -> &mut Self {
        self.passes.push(pass);
        self
    }

    /// Register multiple passes at once
    pub fn register_all(&mut self, passes: Vec<PassHandle>) -> &mut Self {
        self.passes.extend(passes);
        self
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Names of the registered passes, in order
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Get a reference to a pass by name
    pub fn get_pass_by_name(&self, name: &str) -> Option<&PassHandle> {
        self.passes.iter().find(|pass| pass.name() == name)
    }

    /// List all passes with their descriptions and enabled flags
    pub fn list_passes(&self, settings: &PreprocessorSettings) -> Vec<(&str, &str, bool)> {
        self.passes
            .iter()
            .map(|pass| (pass.name(), pass.description(), pass.is_enabled(settings)))
            .collect()
    }

    /// Process a single command through every enabled pass
    ///
    /// # Errors
    /// Returns the first fatal error raised by a pass
    pub fn process_command(
        &self,
        command: GcodeCommand,
        state: &mut PipelineState,
        context: &PassContext<'_>,
    ) -> Result<Vec<GcodeCommand>> {
        let mut current_commands = vec![command];

        for pass in &self.passes {
            if !pass.is_enabled(context.settings) {
                continue;
            }

            let mut next_commands = Vec::with_capacity(current_commands.len());

            for cmd in current_commands {
                match pass.process(&cmd, state, context) {
                    Ok(processed) => next_commands.extend(processed),
                    Err(e) if e.is_fatal() => {
                        tracing::error!("Pass '{}' failed: {}", pass.name(), e);
                        return Err(e);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Pass '{}' failed on command '{}': {}",
                            pass.name(),
                            cmd,
                            e
                        );
                        next_commands.push(cmd);
                    }
                }
            }

            if context.last_command {
                next_commands.extend(pass.finish(state, context)?);
            }

            current_commands = next_commands;

            // Nothing left to transform, unless deferred output still has to flush
            if current_commands.is_empty() && !context.last_command {
                break;
            }
        }

        Ok(current_commands)
    }
}

impl Default for PreprocessorPipeline {
    fn default() -> Self {
        Self::new()
    }
}
