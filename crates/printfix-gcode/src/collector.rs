//! Print information collector
//!
//! One-shot scan of a whole file computing the extents of every move and
//! whether the print fits the configured build volume. The scan is separate
//! from the live pipeline and recomputes everything on each call.

use std::path::Path;

use printfix_settings::{BuildVolume, PreprocessorSettings};
use serde::{Deserialize, Serialize};

use crate::io::GcodeFileReader;
use crate::parser::{GcodeParser, MotionState, Position};

const TIER_NAMES: [&str; 3] = ["low", "medium", "high"];

/// Min/max of every axis seen across a file
///
/// `min <= max` holds on every axis whenever `valid` is set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PrintBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
    pub min_e: f64,
    pub max_e: f64,
    pub valid: bool,
}

impl PrintBounds {
    /// Grow the bounds to include a position
    pub fn include(&mut self, position: &Position) {
        if !self.valid {
            *self = Self {
                min_x: position.x,
                max_x: position.x,
                min_y: position.y,
                max_y: position.y,
                min_z: position.z,
                max_z: position.z,
                min_e: position.e,
                max_e: position.e,
                valid: true,
            };
            return;
        }

        self.min_x = self.min_x.min(position.x);
        self.max_x = self.max_x.max(position.x);
        self.min_y = self.min_y.min(position.y);
        self.max_y = self.max_y.max(position.y);
        self.min_z = self.min_z.min(position.z);
        self.max_z = self.max_z.max(position.z);
        self.min_e = self.min_e.min(position.e);
        self.max_e = self.max_e.max(position.e);
    }

    /// X/Y centre of the model
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// X/Y extents of the moves that fall in one height tier
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TierExtents {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    /// Set once any move lands in the tier
    pub used: bool,
}

impl TierExtents {
    fn include(&mut self, x: f64, y: f64) {
        if !self.used {
            *self = Self {
                min_x: x,
                max_x: x,
                min_y: y,
                max_y: y,
                used: true,
            };
            return;
        }
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    fn shifted(&self, dx: f64, dy: f64) -> Self {
        Self {
            min_x: self.min_x + dx,
            max_x: self.max_x + dx,
            min_y: self.min_y + dy,
            max_y: self.max_y + dy,
            used: self.used,
        }
    }
}

/// Result of a collection run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrintInformation {
    pub bounds: PrintBounds,
    /// Extents per tier, lowest first
    pub tiers: [TierExtents; 3],
    /// Number of G0/G1 commands seen
    pub motion_commands: u64,
    pub printable: bool,
    /// Human readable reasons the print does not fit
    pub violations: Vec<String>,
}

impl PrintInformation {
    /// X/Y shift that centres the model on the bed, when bounds are known
    pub fn center_displacement(&self, volume: &BuildVolume) -> Option<(f64, f64)> {
        if !self.bounds.valid {
            return None;
        }
        let (bed_x, bed_y) = volume.bed_center();
        let (model_x, model_y) = self.bounds.center();
        Some((bed_x - model_x, bed_y - model_y))
    }
}

/// Scans G-code and records where the print head goes
pub struct PrintInformationCollector {
    parser: GcodeParser,
    motion: MotionState,
    volume: BuildVolume,
    bounds: PrintBounds,
    tiers: [TierExtents; 3],
    motion_commands: u64,
}

impl PrintInformationCollector {
    /// Create a collector that sorts moves into the tiers of `volume`
    pub fn new(volume: BuildVolume) -> Self {
        Self {
            parser: GcodeParser::new(),
            motion: MotionState::new(),
            volume,
            bounds: PrintBounds::default(),
            tiers: [TierExtents::default(); 3],
            motion_commands: 0,
        }
    }

    /// Scan a file and judge it against `settings`
    ///
    /// # Errors
    /// Returns error if the file cannot be read
    pub fn collect(
        path: impl AsRef<Path>,
        settings: &PreprocessorSettings,
    ) -> anyhow::Result<PrintInformation> {
        let reader = GcodeFileReader::new(path)?;
        let mut collector = Self::new(settings.build_volume);

        let stats = reader.read_lines(|line| {
            collector.observe_line(line);
            Ok(())
        })?;
        tracing::debug!(
            "Scanned {} lines ({} bytes) from {}",
            stats.lines_read,
            stats.bytes_read,
            reader.path().display()
        );

        Ok(collector.finish(settings))
    }

    /// Scan G-code held in memory
    pub fn collect_str(text: &str, settings: &PreprocessorSettings) -> PrintInformation {
        let mut collector = Self::new(settings.build_volume);
        for line in text.lines() {
            collector.observe_line(line);
        }
        collector.finish(settings)
    }

    /// Feed one line of G-code
    pub fn observe_line(&mut self, line: &str) {
        // Lines that do not tokenize cannot move the head
        let Ok(command) = self.parser.parse_line(line) else {
            return;
        };

        let (_, after) = self.motion.apply(&command);
        if !command.is_motion() {
            return;
        }

        self.motion_commands += 1;
        self.bounds.include(&after);
        let tier = self.volume.tier_index_for_z(after.z);
        self.tiers[tier].include(after.x, after.y);
    }

    /// Finish the scan and judge printability
    pub fn finish(self, settings: &PreprocessorSettings) -> PrintInformation {
        let mut information = PrintInformation {
            bounds: self.bounds,
            tiers: self.tiers,
            motion_commands: self.motion_commands,
            printable: false,
            violations: Vec::new(),
        };

        if self.motion_commands == 0 {
            information
                .violations
                .push("file contains no motion commands".to_string());
            tracing::warn!("Print is not printable: file contains no motion commands");
            return information;
        }

        let volume = &settings.build_volume;
        let (dx, dy) = if settings.centers_model() {
            information.center_displacement(volume).unwrap_or((0.0, 0.0))
        } else {
            (0.0, 0.0)
        };

        for (index, (extents, limits)) in information
            .tiers
            .iter()
            .zip(volume.tiers())
            .enumerate()
        {
            if !extents.used {
                continue;
            }
            let placed = extents.shifted(dx, dy);
            if !limits.contains_x(placed.min_x, placed.max_x) {
                information.violations.push(format!(
                    "X range {}..{} exceeds the {} tier limits {}..{}",
                    placed.min_x, placed.max_x, TIER_NAMES[index], limits.x_min, limits.x_max
                ));
            }
            if !limits.contains_y(placed.min_y, placed.max_y) {
                information.violations.push(format!(
                    "Y range {}..{} exceeds the {} tier limits {}..{}",
                    placed.min_y, placed.max_y, TIER_NAMES[index], limits.y_min, limits.y_max
                ));
            }
        }

        if information.bounds.min_z < volume.z_min() {
            information.violations.push(format!(
                "Z {} is below the bed at {}",
                information.bounds.min_z,
                volume.z_min()
            ));
        }
        if information.bounds.max_z > volume.z_max() {
            information.violations.push(format!(
                "Z {} exceeds the maximum height {}",
                information.bounds.max_z,
                volume.z_max()
            ));
        }

        for violation in &information.violations {
            if settings.ignore_print_dimension_limitations {
                tracing::debug!("Ignoring dimension limit: {}", violation);
            } else {
                tracing::warn!("Print exceeds build volume: {}", violation);
            }
        }

        information.printable =
            information.violations.is_empty() || settings.ignore_print_dimension_limitations;
        information
    }
}
