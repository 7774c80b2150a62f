//! Bed model
//!
//! Describes the build plate surface as four triangles fanned out from the
//! bed centre to the calibrated corners, and answers how far the nozzle must
//! be raised or lowered at a given X/Y.

use printfix_core::{
    plane_equation, sign, z_from_xy_and_plane, ConfigurationError, PlaneEquation, Point3,
};
use printfix_settings::PreprocessorSettings;

/// Bed centre in machine coordinates
pub const BED_CENTER_X: f64 = 54.0;
pub const BED_CENTER_Y: f64 = 50.0;

/// Distance from the bed centre to the calibration corners
pub const CORNER_OFFSET_X: f64 = 50.9;
pub const CORNER_OFFSET_Y: f64 = 53.0;

/// Minimum doubled triangle area accepted as non-degenerate
const MIN_TRIANGLE_AREA: f64 = 1e-6;

/// One side of the calibration quadrilateral and the triangle behind it
#[derive(Debug, Clone, Copy, PartialEq)]
struct Region {
    /// Edge endpoints, in quadrilateral order
    start: Point3<f64>,
    end: Point3<f64>,
    plane: PlaneEquation,
}

/// Triangulated model of the build plate surface
#[derive(Debug, Clone, PartialEq)]
pub struct BedModel {
    center: Point3<f64>,
    /// Back, right, front and left regions, walking the quadrilateral
    regions: [Region; 4],
    height_offset: f64,
}

impl BedModel {
    /// Build the model from calibration settings
    ///
    /// Each corner sits at `orientation + offset` above the bed centre.
    pub fn from_settings(settings: &PreprocessorSettings) -> Result<Self, ConfigurationError> {
        let corner = |dx: f64, dy: f64, orientation: f64, offset: f64| {
            Point3::new(BED_CENTER_X + dx, BED_CENTER_Y + dy, orientation + offset)
        };

        Self::from_points(
            corner(
                CORNER_OFFSET_X,
                CORNER_OFFSET_Y,
                settings.back_right_orientation,
                settings.back_right_offset,
            ),
            corner(
                -CORNER_OFFSET_X,
                CORNER_OFFSET_Y,
                settings.back_left_orientation,
                settings.back_left_offset,
            ),
            corner(
                -CORNER_OFFSET_X,
                -CORNER_OFFSET_Y,
                settings.front_left_orientation,
                settings.front_left_offset,
            ),
            corner(
                CORNER_OFFSET_X,
                -CORNER_OFFSET_Y,
                settings.front_right_orientation,
                settings.front_right_offset,
            ),
            Point3::new(BED_CENTER_X, BED_CENTER_Y, 0.0),
            settings.bed_height_offset,
        )
    }

    /// Build the model from explicit calibration points in machine coordinates
    ///
    /// The corners must form a convex quadrilateral around `center`.
    pub fn from_points(
        back_right: Point3<f64>,
        back_left: Point3<f64>,
        front_left: Point3<f64>,
        front_right: Point3<f64>,
        center: Point3<f64>,
        height_offset: f64,
    ) -> Result<Self, ConfigurationError> {
        let points = [back_right, back_left, front_left, front_right, center];
        if points
            .iter()
            .any(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
            || !height_offset.is_finite()
        {
            return Err(degenerate("calibration values must be finite"));
        }

        // Walk the quadrilateral: back, right, front, left edges
        let edges = [
            (back_left, back_right),
            (back_right, front_right),
            (front_right, front_left),
            (front_left, back_left),
        ];

        let orientation = sign(&center, &edges[0].0, &edges[0].1);
        let mut regions = Vec::with_capacity(4);
        for (start, end) in edges {
            let side = sign(&center, &start, &end);
            if side.abs() < MIN_TRIANGLE_AREA {
                return Err(degenerate("centre lies on a calibration edge"));
            }
            if side.signum() != orientation.signum() {
                return Err(degenerate("corners do not form a convex quadrilateral"));
            }

            let plane = plane_equation(&center, &start, &end);
            if plane.is_vertical() || !plane.is_finite() {
                return Err(degenerate("calibration triangle is vertical"));
            }
            regions.push(Region { start, end, plane });
        }

        // Each corner must turn the same way as the walk around the centre
        for (index, region) in regions.iter().enumerate() {
            let next = &regions[(index + 1) % regions.len()];
            let turn = sign(&next.end, &region.start, &region.end);
            if turn.signum() != orientation.signum() || turn.abs() < MIN_TRIANGLE_AREA {
                return Err(degenerate("corners do not form a convex quadrilateral"));
            }
        }

        let regions: [Region; 4] = regions
            .try_into()
            .map_err(|_| degenerate("expected four calibration regions"))?;

        Ok(Self {
            center,
            regions,
            height_offset,
        })
    }

    /// Z adjustment required at `(x, y)`, including the bed height offset
    ///
    /// Points inside the calibration quadrilateral use the plane of the
    /// triangle that contains them. Outside, the planes of every edge the
    /// point lies beyond are averaged, so side regions extrapolate one plane
    /// and corner regions blend the two adjacent ones.
    pub fn height_adjustment(&self, x: f64, y: f64) -> f64 {
        let point = Point3::new(x, y, 0.0);
        let orientation = sign(&self.center, &self.regions[0].start, &self.regions[0].end);

        let outside: Vec<&Region> = self
            .regions
            .iter()
            .filter(|region| {
                let side = sign(&point, &region.start, &region.end);
                side != 0.0 && side.signum() != orientation.signum()
            })
            .collect();

        let surface = if outside.is_empty() {
            let containing = self
                .regions
                .iter()
                .find(|region| {
                    printfix_core::is_point_in_triangle(
                        &point,
                        &self.center,
                        &region.start,
                        &region.end,
                    )
                })
                .unwrap_or(&self.regions[0]);
            z_from_xy_and_plane(&point, &containing.plane)
        } else {
            let total: f64 = outside
                .iter()
                .map(|region| z_from_xy_and_plane(&point, &region.plane))
                .sum();
            total / outside.len() as f64
        };

        surface + self.height_offset
    }

    /// Base height offset added to every adjustment
    pub fn height_offset(&self) -> f64 {
        self.height_offset
    }

    /// Calibration centre point
    pub fn center(&self) -> Point3<f64> {
        self.center
    }
}

fn degenerate(reason: &str) -> ConfigurationError {
    ConfigurationError::DegenerateBedGeometry {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn tilted_settings() -> PreprocessorSettings {
        let mut settings = PreprocessorSettings::default();
        settings.back_right_orientation = 0.4;
        settings.back_left_orientation = 0.2;
        settings.front_left_offset = -0.1;
        settings.front_right_offset = 0.3;
        settings
    }

    #[test]
    fn test_flat_bed_has_no_adjustment() {
        let bed = BedModel::from_settings(&PreprocessorSettings::default()).unwrap();
        for (x, y) in [(54.0, 50.0), (0.0, 0.0), (110.0, 105.0), (-20.0, 200.0)] {
            assert!(bed.height_adjustment(x, y).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_corners_and_centre() {
        let bed = BedModel::from_settings(&tilted_settings()).unwrap();
        let back_right = bed.height_adjustment(BED_CENTER_X + CORNER_OFFSET_X, BED_CENTER_Y + CORNER_OFFSET_Y);
        let back_left = bed.height_adjustment(BED_CENTER_X - CORNER_OFFSET_X, BED_CENTER_Y + CORNER_OFFSET_Y);
        let front_left = bed.height_adjustment(BED_CENTER_X - CORNER_OFFSET_X, BED_CENTER_Y - CORNER_OFFSET_Y);
        let front_right = bed.height_adjustment(BED_CENTER_X + CORNER_OFFSET_X, BED_CENTER_Y - CORNER_OFFSET_Y);

        assert!((back_right - 0.4).abs() < TOLERANCE);
        assert!((back_left - 0.2).abs() < TOLERANCE);
        assert!((front_left + 0.1).abs() < TOLERANCE);
        assert!((front_right - 0.3).abs() < TOLERANCE);
        assert!(bed.height_adjustment(BED_CENTER_X, BED_CENTER_Y).abs() < TOLERANCE);
    }

    #[test]
    fn test_back_edge_midpoint_interpolates() {
        let bed = BedModel::from_settings(&tilted_settings()).unwrap();
        let mid_back = bed.height_adjustment(BED_CENTER_X, BED_CENTER_Y + CORNER_OFFSET_Y);
        assert!((mid_back - 0.3).abs() < TOLERANCE);
    }

    #[test]
    fn test_side_region_extends_the_side_plane() {
        let bed = BedModel::from_settings(&tilted_settings()).unwrap();
        // Straight behind the back edge, only the back plane applies
        let inside = bed.height_adjustment(BED_CENTER_X + 10.0, BED_CENTER_Y + 40.0);
        let edge = bed.height_adjustment(BED_CENTER_X + 10.0, BED_CENTER_Y + CORNER_OFFSET_Y);
        let beyond = bed.height_adjustment(BED_CENTER_X + 10.0, BED_CENTER_Y + CORNER_OFFSET_Y + 13.0);
        let slope = (edge - inside) / 13.0;
        assert!((beyond - edge - slope * 13.0).abs() < 1e-6);
    }

    #[test]
    fn test_corner_region_averages_adjacent_planes() {
        let settings = tilted_settings();
        let bed = BedModel::from_settings(&settings).unwrap();
        let x = BED_CENTER_X + CORNER_OFFSET_X + 5.0;
        let y = BED_CENTER_Y + CORNER_OFFSET_Y + 5.0;
        let value = bed.height_adjustment(x, y);
        assert!(value.is_finite());
        // Close to the back-right corner height
        assert!((value - 0.4).abs() < 0.2);
    }

    #[test]
    fn test_height_offset_is_added() {
        let mut settings = PreprocessorSettings::default();
        settings.bed_height_offset = 0.25;
        let bed = BedModel::from_settings(&settings).unwrap();
        assert!((bed.height_adjustment(30.0, 40.0) - 0.25).abs() < TOLERANCE);
        assert_eq!(bed.height_offset(), 0.25);
    }

    #[test]
    fn test_non_finite_settings_are_rejected() {
        let mut settings = PreprocessorSettings::default();
        settings.back_left_offset = f64::NAN;
        let err = BedModel::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConfigurationError::DegenerateBedGeometry { .. }));
    }

    #[test]
    fn test_collinear_points_are_rejected() {
        let line = |x: f64| Point3::new(x, x, 0.0);
        let result = BedModel::from_points(line(4.0), line(3.0), line(1.0), line(0.0), line(2.0), 0.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_convex_quadrilateral_is_rejected() {
        let result = BedModel::from_points(
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(-10.0, 10.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(10.0, -10.0, 0.0),
            Point3::new(3.0, 2.0, 0.0),
            0.0,
        );
        assert!(result.is_err());
    }
}
