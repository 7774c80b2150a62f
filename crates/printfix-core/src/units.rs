//! Unit conversion utilities
//!
//! Handles conversion between Metric (mm) and Imperial (inch) input, feed-rate
//! unit scaling, and the inverted feed-rate scale expected by the printer
//! firmware.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Millimetres per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Fastest feed rate the firmware accepts, in mm/s
pub const MAX_FEED_RATE_PER_SECOND: f64 = 60.0001;

/// Firmware feed value at full speed
const FIRMWARE_FEED_RATE_FLOOR: f64 = 30.0;

/// Firmware feed value span between full speed and standstill
const FIRMWARE_FEED_RATE_SPAN: f64 = 800.0;

/// Measurement system of incoming coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementSystem {
    /// Metric system (mm, G21)
    Metric,
    /// Imperial system (inches, G20)
    Imperial,
}

impl Default for MeasurementSystem {
    fn default() -> Self {
        Self::Metric
    }
}

impl fmt::Display for MeasurementSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metric => write!(f, "Metric"),
            Self::Imperial => write!(f, "Imperial"),
        }
    }
}

impl FromStr for MeasurementSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metric" | "mm" => Ok(Self::Metric),
            "imperial" | "inch" | "in" => Ok(Self::Imperial),
            _ => Err(format!("Unknown measurement system: {}", s)),
        }
    }
}

impl MeasurementSystem {
    /// Measurement system selected by a G20/G21 command number
    pub fn from_gcode(number: u32) -> Option<Self> {
        match number {
            20 => Some(Self::Imperial),
            21 => Some(Self::Metric),
            _ => None,
        }
    }

    /// Convert a length in this system to millimetres
    pub fn to_millimeters(self, value: f64) -> f64 {
        match self {
            Self::Metric => value,
            Self::Imperial => value * MM_PER_INCH,
        }
    }
}

/// Feed rate units selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedRateUnits {
    /// Millimeters per minute
    MmPerMin,
    /// Millimeters per second
    MmPerSec,
    /// Inches per minute
    InPerMin,
    /// Inches per second
    InPerSec,
}

impl Default for FeedRateUnits {
    fn default() -> Self {
        Self::MmPerMin
    }
}

impl fmt::Display for FeedRateUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MmPerMin => write!(f, "mm/min"),
            Self::MmPerSec => write!(f, "mm/sec"),
            Self::InPerMin => write!(f, "in/min"),
            Self::InPerSec => write!(f, "in/sec"),
        }
    }
}

impl FeedRateUnits {
    /// Convert a feed rate expressed in these units to mm/min
    pub fn to_mm_per_min(self, value: f64) -> f64 {
        match self {
            Self::MmPerMin => value,
            Self::MmPerSec => value * 60.0,
            Self::InPerMin => value * MM_PER_INCH,
            Self::InPerSec => value * MM_PER_INCH * 60.0,
        }
    }

    /// Convert a feed rate in mm/min to these units
    pub fn from_mm_per_min(self, value_mm_per_min: f64) -> f64 {
        match self {
            Self::MmPerMin => value_mm_per_min,
            Self::MmPerSec => value_mm_per_min / 60.0,
            Self::InPerMin => value_mm_per_min / MM_PER_INCH,
            Self::InPerSec => (value_mm_per_min / MM_PER_INCH) / 60.0,
        }
    }
}

/// Convert a feed rate in mm/min to the firmware's inverted feed scale.
///
/// The firmware reads `F` as a delay: 30 is full speed
/// (`MAX_FEED_RATE_PER_SECOND`) and 830 is standstill. Faster requests are
/// capped at full speed.
pub fn firmware_feed_rate(value_mm_per_min: f64) -> f64 {
    let per_second = FeedRateUnits::MmPerSec
        .from_mm_per_min(value_mm_per_min)
        .clamp(0.0, MAX_FEED_RATE_PER_SECOND);
    FIRMWARE_FEED_RATE_FLOOR
        + (1.0 - per_second / MAX_FEED_RATE_PER_SECOND) * FIRMWARE_FEED_RATE_SPAN
}
