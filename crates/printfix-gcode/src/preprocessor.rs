//! Per-job preprocessing session
//!
//! A `Preprocessor` owns the settings, the pass pipeline, the state the
//! passes carry between commands, and the print information collected for
//! the current job. Independent jobs use independent instances.

use std::path::Path;

use printfix_core::Result;
use printfix_settings::PreprocessorSettings;

use crate::bed::BedModel;
use crate::collector::{PrintInformation, PrintInformationCollector};
use crate::command::GcodeCommand;
use crate::io::{GcodeFileReader, GcodeFileWriter};
use crate::parser::GcodeParser;
use crate::pipeline::{PassContext, PipelineState, PreprocessorPipeline};

/// G-code preprocessor for one print job at a time
pub struct Preprocessor {
    settings: PreprocessorSettings,
    parser: GcodeParser,
    pipeline: PreprocessorPipeline,
    state: PipelineState,
    print_information: Option<PrintInformation>,
}

impl Preprocessor {
    /// Create a preprocessor with default settings and the standard passes
    pub fn new() -> Self {
        Self::with_settings(PreprocessorSettings::default())
    }

    pub fn with_settings(settings: PreprocessorSettings) -> Self {
        Self {
            settings,
            parser: GcodeParser::new(),
            pipeline: PreprocessorPipeline::standard(),
            state: PipelineState::new(),
            print_information: None,
        }
    }

    /// Replace the pass pipeline
    pub fn with_pipeline(mut self, pipeline: PreprocessorPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn settings(&self) -> &PreprocessorSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut PreprocessorSettings {
        &mut self.settings
    }

    pub fn pipeline(&self) -> &PreprocessorPipeline {
        &self.pipeline
    }

    /// Restore default settings and forget the current job
    pub fn reset_settings(&mut self) {
        self.settings.reset();
        self.state.reset();
        self.print_information = None;
    }

    /// Scan a file for print bounds and judge whether it fits the printer
    ///
    /// Returns the printability verdict. Each call replaces the previous
    /// information; on error no information is kept.
    ///
    /// # Errors
    /// Returns error if the file cannot be read
    pub fn collect_print_information(&mut self, path: impl AsRef<Path>) -> anyhow::Result<bool> {
        self.print_information = None;
        let information = PrintInformationCollector::collect(path, &self.settings)?;
        let printable = information.printable;
        self.print_information = Some(information);
        Ok(printable)
    }

    /// Information from the last successful collection
    pub fn print_information(&self) -> Option<&PrintInformation> {
        self.print_information.as_ref()
    }

    /// Displacement the center-model pass applies, if bounds are known
    pub fn center_displacement(&self) -> Option<(f64, f64)> {
        self.print_information
            .as_ref()
            .and_then(|information| information.center_displacement(&self.settings.build_volume))
    }

    fn bed_model(&self) -> Result<Option<BedModel>> {
        if !self.settings.use_bed_compensation_preprocessor {
            return Ok(None);
        }
        match BedModel::from_settings(&self.settings) {
            Ok(bed) => Ok(Some(bed)),
            Err(e) => {
                tracing::error!("Bed calibration is unusable: {}", e);
                Err(e.into())
            }
        }
    }

    /// Run one line through the pipeline
    ///
    /// State carries over between calls; `last_command` flushes deferred
    /// output (end sequence, Z restore).
    ///
    /// # Errors
    /// Returns configuration errors, such as degenerate bed calibration
    pub fn process_line(&mut self, line: &str, last_command: bool) -> Result<Vec<GcodeCommand>> {
        let bed = self.bed_model()?;
        let displacement = self.center_displacement();

        let mut context = PassContext::new(&self.settings)
            .with_center_displacement(displacement)
            .with_last_command(last_command);
        if let Some(bed) = bed.as_ref() {
            context = context.with_bed(bed);
        }

        let command = self.parser.parse_lossy(line);
        self.pipeline
            .process_command(command, &mut self.state, &context)
    }

    /// Run one line through the pipeline and render the result, one command per line
    ///
    /// # Errors
    /// Returns configuration errors, such as degenerate bed calibration
    pub fn process_text(&mut self, line: &str, last_command: bool) -> Result<String> {
        let output = self.process_line(line, last_command)?;
        Ok(output
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Process a whole file as one job
    ///
    /// Pass state starts fresh for every file. The final line of `input` is
    /// treated as the last command. An empty input produces an empty output
    /// file. Returns the number of lines written.
    ///
    /// # Errors
    /// Returns error if either file cannot be accessed, if `output` is the
    /// input file itself, or if the settings are unusable
    pub fn process_file(
        &mut self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> anyhow::Result<u64> {
        let reader = GcodeFileReader::new(input)?;
        let output = output.as_ref();
        if is_same_file(reader.path(), output)? {
            return Err(anyhow::anyhow!(
                "Output {} would overwrite its own input",
                output.display()
            ));
        }

        let bed = self.bed_model()?;
        let displacement = self.center_displacement();
        let mut writer = GcodeFileWriter::create(output)?;

        // A file is a whole job with a known first and last line
        self.state.reset();

        let mut context = PassContext::new(&self.settings).with_center_displacement(displacement);
        if let Some(bed) = bed.as_ref() {
            context = context.with_bed(bed);
        }

        let parser = self.parser;
        let pipeline = &self.pipeline;
        let state = &mut self.state;
        let mut emit = |line: &str, last_command: bool| -> anyhow::Result<()> {
            let context = context.with_last_command(last_command);
            for command in pipeline.process_command(parser.parse_lossy(line), state, &context)? {
                writer.write_line(&command.to_string())?;
            }
            Ok(())
        };

        // One line of lookahead so the final line is known to be last
        let mut pending: Option<String> = None;
        let stats = reader.read_lines(|line| {
            if let Some(previous) = pending.replace(line.to_string()) {
                emit(&previous, false)?;
            }
            Ok(())
        })?;
        if let Some(last) = pending.take() {
            emit(&last, true)?;
        }

        let written = writer.finish()?;
        tracing::info!(
            "Preprocessed {} lines from {} into {} lines",
            stats.lines_read,
            reader.path().display(),
            written
        );
        Ok(written)
    }

    /// Z adjustment the bed model requires at `(x, y)`
    ///
    /// # Errors
    /// Returns configuration errors for degenerate bed calibration
    pub fn height_adjustment(&self, x: f64, y: f64) -> Result<f64> {
        Ok(BedModel::from_settings(&self.settings)?.height_adjustment(x, y))
    }

    /// Wave bonding offset currently applied to Z
    pub fn current_adjustment_z(&self) -> f64 {
        self.state.current_adjustment_z()
    }
}

/// Returns if `output` resolves to the existing file at `input`
fn is_same_file(input: &Path, output: &Path) -> anyhow::Result<bool> {
    if !output.exists() {
        return Ok(false);
    }
    Ok(std::fs::canonicalize(input)? == std::fs::canonicalize(output)?)
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
