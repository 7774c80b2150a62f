//! Preprocessor configuration
//!
//! Provides the settings read by every preprocessing pass, the tiered build
//! volume used for printability checks, and configuration file handling.
//! Supports JSON and TOML file formats.
//!
//! Settings are organized as:
//! - Backlash compensation (distances and corrective speed)
//! - Bed calibration (corner orientations and offsets)
//! - Filament (temperature and type)
//! - Pass toggles and print-mode flags
//! - Build volume

use printfix_core::{ConfigurationError, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Filament material loaded in the printer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilamentType {
    /// Polylactic acid
    Pla,
    /// Acrylonitrile butadiene styrene
    Abs,
    /// High impact polystyrene
    Hips,
    /// Any other material
    Other,
}

impl Default for FilamentType {
    fn default() -> Self {
        Self::Pla
    }
}

impl fmt::Display for FilamentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pla => write!(f, "PLA"),
            Self::Abs => write!(f, "ABS"),
            Self::Hips => write!(f, "HIPS"),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

impl FromStr for FilamentType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PLA" => Ok(Self::Pla),
            "ABS" => Ok(Self::Abs),
            "HIPS" => Ok(Self::Hips),
            "OTHER" => Ok(Self::Other),
            _ => Err(ConfigurationError::InvalidFilamentType {
                value: s.to_string(),
            }),
        }
    }
}

impl FilamentType {
    /// Extra degrees added to the nozzle temperature while bonding the first layer
    pub fn bonding_temperature_bonus(self) -> f64 {
        match self {
            Self::Pla => 10.0,
            _ => 15.0,
        }
    }
}

/// Printable box for one height band of the build volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BedTier {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub z_min: f64,
    pub z_max: f64,
}

impl BedTier {
    /// Create a tier from its extents
    pub fn new(x: (f64, f64), y: (f64, f64), z: (f64, f64)) -> Self {
        Self {
            x_min: x.0,
            x_max: x.1,
            y_min: y.0,
            y_max: y.1,
            z_min: z.0,
            z_max: z.1,
        }
    }

    /// X/Y centre of the tier
    pub fn center(&self) -> (f64, f64) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// Returns if an X range fits inside the tier
    pub fn contains_x(&self, min: f64, max: f64) -> bool {
        min >= self.x_min && max <= self.x_max
    }

    /// Returns if a Y range fits inside the tier
    pub fn contains_y(&self, min: f64, max: f64) -> bool {
        min >= self.y_min && max <= self.y_max
    }

    fn is_well_formed(&self) -> bool {
        let values = [
            self.x_min, self.x_max, self.y_min, self.y_max, self.z_min, self.z_max,
        ];
        values.iter().all(|v| v.is_finite())
            && self.x_min <= self.x_max
            && self.y_min <= self.y_max
            && self.z_min <= self.z_max
    }
}

/// Printable volume, split into three height tiers
///
/// The printer's frame narrows as the head rises, so each band of Z has its
/// own X/Y extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildVolume {
    pub low: BedTier,
    pub medium: BedTier,
    pub high: BedTier,
}

impl Default for BuildVolume {
    fn default() -> Self {
        Self {
            low: BedTier::new((0.0, 113.0), (0.0, 107.0), (0.0, 5.0)),
            medium: BedTier::new((2.8, 110.2), (-6.6, 107.0), (5.0, 73.5)),
            high: BedTier::new((2.35, 82.0), (20.05, 92.95), (73.5, 112.0)),
        }
    }
}

impl BuildVolume {
    /// Single box from the origin to `(x, y, z)` used for every tier
    pub fn uniform(x: f64, y: f64, z: f64) -> Self {
        let tier = BedTier::new((0.0, x), (0.0, y), (0.0, z));
        Self {
            low: tier,
            medium: tier,
            high: tier,
        }
    }

    /// Tiers from lowest to highest
    pub fn tiers(&self) -> [&BedTier; 3] {
        [&self.low, &self.medium, &self.high]
    }

    /// Index into [`BuildVolume::tiers`] of the tier that applies at height `z`
    pub fn tier_index_for_z(&self, z: f64) -> usize {
        if z < self.low.z_max {
            0
        } else if z < self.medium.z_max {
            1
        } else {
            2
        }
    }

    /// Lowest printable Z
    pub fn z_min(&self) -> f64 {
        self.low.z_min
    }

    /// Highest printable Z
    pub fn z_max(&self) -> f64 {
        self.high.z_max
    }

    /// Centre of the bed surface
    pub fn bed_center(&self) -> (f64, f64) {
        self.low.center()
    }

    fn is_well_formed(&self) -> bool {
        self.low.is_well_formed() && self.medium.is_well_formed() && self.high.is_well_formed()
    }
}

/// Every tunable read by the preprocessing passes
///
/// Fields accept any value; passes that need a safe range (temperature)
/// clamp at the point of use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessorSettings {
    /// Dead travel on X when the axis reverses, in mm
    pub backlash_x: f64,
    /// Dead travel on Y when the axis reverses, in mm
    pub backlash_y: f64,
    /// Feed rate of corrective backlash moves, in mm/min
    pub backlash_speed: f64,

    pub back_right_orientation: f64,
    pub back_left_orientation: f64,
    pub front_left_orientation: f64,
    pub front_right_orientation: f64,

    /// Base height added to every bed compensation result
    pub bed_height_offset: f64,
    pub back_right_offset: f64,
    pub back_left_offset: f64,
    pub front_left_offset: f64,
    pub front_right_offset: f64,

    /// Nozzle temperature in °C
    pub filament_temperature: f64,
    pub filament_type: FilamentType,

    pub use_validation_preprocessor: bool,
    pub use_preparation_preprocessor: bool,
    pub use_wave_bonding_preprocessor: bool,
    pub use_thermal_bonding_preprocessor: bool,
    pub use_bed_compensation_preprocessor: bool,
    pub use_backlash_compensation_preprocessor: bool,
    pub use_feed_rate_conversion_preprocessor: bool,
    pub use_center_model_preprocessor: bool,

    /// Accept prints that leave the build volume
    pub ignore_print_dimension_limitations: bool,
    /// Printer is fitted with the Micro Pass frame
    pub using_micro_pass: bool,
    /// Stream is the built-in test border
    pub printing_test_border: bool,
    /// Stream is the backlash calibration cylinder
    pub printing_backlash_calibration_cylinder: bool,

    pub build_volume: BuildVolume,
}

impl Default for PreprocessorSettings {
    fn default() -> Self {
        Self {
            backlash_x: 0.3,
            backlash_y: 0.6,
            backlash_speed: 1500.0,
            back_right_orientation: 0.0,
            back_left_orientation: 0.0,
            front_left_orientation: 0.0,
            front_right_orientation: 0.0,
            bed_height_offset: 0.0,
            back_right_offset: 0.0,
            back_left_offset: 0.0,
            front_left_offset: 0.0,
            front_right_offset: 0.0,
            filament_temperature: 215.0,
            filament_type: FilamentType::default(),
            use_validation_preprocessor: true,
            use_preparation_preprocessor: true,
            use_wave_bonding_preprocessor: false,
            use_thermal_bonding_preprocessor: true,
            use_bed_compensation_preprocessor: true,
            use_backlash_compensation_preprocessor: true,
            use_feed_rate_conversion_preprocessor: true,
            use_center_model_preprocessor: false,
            ignore_print_dimension_limitations: false,
            using_micro_pass: false,
            printing_test_border: false,
            printing_backlash_calibration_cylinder: false,
            build_volume: BuildVolume::default(),
        }
    }
}

impl PreprocessorSettings {
    /// Create settings with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore every field to its default
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Set the filament type by name (`PLA`, `ABS`, `HIPS` or `OTHER`)
    pub fn set_filament_type(&mut self, name: &str) -> Result<()> {
        self.filament_type = name.parse::<FilamentType>()?;
        Ok(())
    }

    /// Returns if a test pattern with its own framing is being printed
    pub fn printing_test_pattern(&self) -> bool {
        self.printing_test_border || self.printing_backlash_calibration_cylinder
    }

    /// Returns if the center-model pass is active for this print
    pub fn centers_model(&self) -> bool {
        self.use_center_model_preprocessor && !self.printing_test_pattern()
    }

    /// Load settings from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::other(format!("Failed to read settings file: {}", e)))?;

        let settings: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .map_err(|e| Error::other(format!("Invalid JSON settings: {}", e)))?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)
                .map_err(|e| Error::other(format!("Invalid TOML settings: {}", e)))?
        } else {
            return Err(Error::other("Settings file must be .json or .toml"));
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)
                .map_err(|e| Error::other(format!("Failed to serialize settings: {}", e)))?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self)
                .map_err(|e| Error::other(format!("Failed to serialize settings: {}", e)))?
        } else {
            return Err(Error::other("Settings file must be .json or .toml"));
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate settings before they are persisted or loaded
    pub fn validate(&self) -> Result<()> {
        let numeric = [
            ("backlash_x", self.backlash_x),
            ("backlash_y", self.backlash_y),
            ("backlash_speed", self.backlash_speed),
            ("back_right_orientation", self.back_right_orientation),
            ("back_left_orientation", self.back_left_orientation),
            ("front_left_orientation", self.front_left_orientation),
            ("front_right_orientation", self.front_right_orientation),
            ("bed_height_offset", self.bed_height_offset),
            ("back_right_offset", self.back_right_offset),
            ("back_left_offset", self.back_left_offset),
            ("front_left_offset", self.front_left_offset),
            ("front_right_offset", self.front_right_offset),
            ("filament_temperature", self.filament_temperature),
        ];

        if let Some((name, _)) = numeric.iter().find(|(_, value)| !value.is_finite()) {
            return Err(ConfigurationError::InvalidSetting {
                setting: name.to_string(),
                reason: "value must be finite".to_string(),
            }
            .into());
        }

        if !self.build_volume.is_well_formed() {
            return Err(ConfigurationError::InvalidSetting {
                setting: "build_volume".to_string(),
                reason: "every tier needs finite extents with min <= max".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
