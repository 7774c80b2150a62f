//! Feed-rate conversion pass

use printfix_core::{firmware_feed_rate, Result};
use printfix_settings::PreprocessorSettings;

use crate::command::GcodeCommand;
use crate::pipeline::{PassContext, PipelineState, PreprocessorPass};

/// Rewrites G0/G1 feed rates onto the firmware's inverted scale
#[derive(Debug, Clone, Default)]
pub struct FeedRateConversionPass;

impl FeedRateConversionPass {
    pub fn new() -> Self {
        Self
    }
}

impl PreprocessorPass for FeedRateConversionPass {
    fn name(&self) -> &str {
        "feed_rate_conversion"
    }

    fn description(&self) -> &str {
        "Converts feed rates from mm/min to the firmware speed scale"
    }

    fn is_enabled(&self, settings: &PreprocessorSettings) -> bool {
        settings.use_feed_rate_conversion_preprocessor
    }

    fn process(
        &self,
        command: &GcodeCommand,
        _state: &mut PipelineState,
        _context: &PassContext<'_>,
    ) -> Result<Vec<GcodeCommand>> {
        match command.f() {
            Some(feed_rate) if command.is_motion() => {
                let mut converted = command.clone();
                converted.set('F', firmware_feed_rate(feed_rate));
                Ok(vec![converted])
            }
            _ => Ok(vec![command.clone()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::GcodeParser;

    fn run(line: &str) -> String {
        let settings = PreprocessorSettings::default();
        FeedRateConversionPass::new()
            .process(
                &GcodeParser::new().parse_lossy(line),
                &mut PipelineState::new(),
                &PassContext::new(&settings),
            )
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_converts_motion_feed_rates() {
        // 1800 mm/min is 30 mm/s, half of the maximum
        assert_eq!(run("G1 X10 F1800"), "G1 X10 F430.00067");
        assert_eq!(run("G0 F0"), "G0 F830");
        assert_eq!(run("G1 F100000"), "G1 F30");
    }

    #[test]
    fn test_other_commands_untouched() {
        assert_eq!(run("G1 X10"), "G1 X10");
        assert_eq!(run("M203 F1200"), "M203 F1200");
    }
}
