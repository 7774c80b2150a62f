//! Validation pass
//!
//! Removes what the printer cannot use: line numbers, checksums, comments,
//! heated-bed commands, auto-levelling (when the bed model handles levelling)
//! and tool selection on a single-extruder machine.

use printfix_core::Result;
use printfix_settings::PreprocessorSettings;

use crate::command::GcodeCommand;
use crate::pipeline::{PassContext, PipelineState, PreprocessorPass};

/// Strips unsupported commands and metadata
#[derive(Debug, Clone, Default)]
pub struct ValidationPass;

impl ValidationPass {
    pub fn new() -> Self {
        Self
    }
}

impl PreprocessorPass for ValidationPass {
    fn name(&self) -> &str {
        "validation"
    }

    fn description(&self) -> &str {
        "Drops comments, line numbers and commands the printer does not support"
    }

    fn is_enabled(&self, settings: &PreprocessorSettings) -> bool {
        settings.use_validation_preprocessor
    }

    fn process(
        &self,
        command: &GcodeCommand,
        _state: &mut PipelineState,
        context: &PassContext<'_>,
    ) -> Result<Vec<GcodeCommand>> {
        if command.is_blank() {
            return Ok(Vec::new());
        }
        if !command.is_command() {
            return Ok(vec![command.clone()]);
        }

        // Heated bed
        if command.is_m(140) || command.is_m(190) {
            tracing::debug!("Dropping heated bed command '{}'", command);
            return Ok(Vec::new());
        }

        if command.is_g(29) && context.settings.use_bed_compensation_preprocessor {
            tracing::debug!("Dropping auto-levelling, bed compensation is enabled");
            return Ok(Vec::new());
        }

        if command.letter() == Some('T') {
            warn_on_extra_tool(command.number().map(f64::from));
            return Ok(Vec::new());
        }

        if command.is_arc() {
            tracing::warn!(
                "Arc move '{}' is passed through without bed or backlash correction",
                command
            );
        }

        let mut validated = command.clone();
        validated.strip_metadata();
        if validated.has('T') {
            warn_on_extra_tool(validated.get('T'));
            validated.remove('T');
        }

        Ok(vec![validated])
    }
}

fn warn_on_extra_tool(tool: Option<f64>) {
    if tool.is_some_and(|tool| tool > 0.0) {
        tracing::warn!("Printer has a single extruder; ignoring selection of tool {:?}", tool);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::GcodeParser;

    fn run(line: &str, settings: &PreprocessorSettings) -> Vec<String> {
        let command = GcodeParser::new().parse_lossy(line);
        ValidationPass::new()
            .process(&command, &mut PipelineState::new(), &PassContext::new(settings))
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    #[test]
    fn test_strips_metadata() {
        let settings = PreprocessorSettings::default();
        assert_eq!(run("N7 G1 X5 Y5*33 ; edge", &settings), vec!["G1 X5 Y5"]);
        assert_eq!(run("G1 X5 Y5", &settings), vec!["G1 X5 Y5"]);
    }

    #[test]
    fn test_drops_blank_and_comment_lines() {
        let settings = PreprocessorSettings::default();
        assert!(run("", &settings).is_empty());
        assert!(run("; layer 2", &settings).is_empty());
    }

    #[test]
    fn test_drops_unsupported_commands() {
        let mut settings = PreprocessorSettings::default();
        assert!(run("M140 S60", &settings).is_empty());
        assert!(run("M190 S60", &settings).is_empty());
        assert!(run("G29", &settings).is_empty());
        assert!(run("T1", &settings).is_empty());

        settings.use_bed_compensation_preprocessor = false;
        assert_eq!(run("G29", &settings), vec!["G29"]);
    }

    #[test]
    fn test_removes_tool_words() {
        let settings = PreprocessorSettings::default();
        assert_eq!(run("M104 S210 T0", &settings), vec!["M104 S210"]);
    }

    #[test]
    fn test_passthrough_lines() {
        let settings = PreprocessorSettings::default();
        assert_eq!(run("@pause", &settings), vec!["@pause"]);
        assert_eq!(run("M117 Hello", &settings), vec!["M117 Hello"]);
        assert_eq!(run("G2 X10 Y10 I5 J0", &settings), vec!["G2 X10 Y10 I5 J0"]);
    }
}
