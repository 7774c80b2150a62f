//! # Printfix Core
//!
//! Core types and utilities shared by the printfix crates:
//! the geometry kernel used by bed compensation and corner detection,
//! length and feed-rate unit handling, and the error types.

pub mod error;
pub mod geometry;
pub mod units;

pub use error::{ConfigurationError, Error, GcodeError, Result};

pub use geometry::{
    angle_between, distance, is_point_in_triangle, is_sharp_corner, max, min, plane_equation,
    plane_normal, sign, z_from_xy_and_plane, PlaneEquation, Point3, Vector3,
    SHARP_CORNER_ANGLE,
};

pub use units::{
    firmware_feed_rate, FeedRateUnits, MeasurementSystem, MAX_FEED_RATE_PER_SECOND, MM_PER_INCH,
};
