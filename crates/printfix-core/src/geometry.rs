//! Geometry kernel
//!
//! Pure functions over 3D points used by bed compensation (plane fitting and
//! triangle classification) and wave bonding (corner detection). Nothing in
//! this module keeps state.

use serde::{Deserialize, Serialize};

pub use nalgebra::{Point3, Vector3};

/// Angle between successive travel vectors above which a corner counts as sharp
pub const SHARP_CORNER_ANGLE: f64 = std::f64::consts::FRAC_PI_2;

/// Tolerance for treating a length or coefficient as zero
const EPSILON: f64 = 1e-9;

/// Plane coefficients such that `a·x + b·y + c·z + d = 0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneEquation {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl PlaneEquation {
    /// Normal vector of the plane
    pub fn normal(&self) -> Vector3<f64> {
        Vector3::new(self.a, self.b, self.c)
    }

    /// True when the plane cannot be evaluated as `z = f(x, y)`
    pub fn is_vertical(&self) -> bool {
        self.c.abs() < EPSILON
    }

    /// True when every coefficient is finite
    pub fn is_finite(&self) -> bool {
        self.a.is_finite() && self.b.is_finite() && self.c.is_finite() && self.d.is_finite()
    }

    /// Evaluate the plane height at `(x, y)`
    pub fn z_at(&self, x: f64, y: f64) -> f64 {
        -(self.a * x + self.b * y + self.d) / self.c
    }
}

/// Returns the smaller of two numbers
pub fn min(first: f64, second: f64) -> f64 {
    if first < second {
        first
    } else {
        second
    }
}

/// Returns the larger of two numbers
pub fn max(first: f64, second: f64) -> f64 {
    if first > second {
        first
    } else {
        second
    }
}

/// Euclidean distance between two points
pub fn distance(first: &Point3<f64>, second: &Point3<f64>) -> f64 {
    nalgebra::distance(first, second)
}

/// Normal of the plane through three points.
///
/// Collinear points give the zero vector; callers must check before use.
pub fn plane_normal(v1: &Point3<f64>, v2: &Point3<f64>, v3: &Point3<f64>) -> Vector3<f64> {
    (v2 - v1).cross(&(v3 - v1))
}

/// Equation of the plane through three points
pub fn plane_equation(v1: &Point3<f64>, v2: &Point3<f64>, v3: &Point3<f64>) -> PlaneEquation {
    let normal = plane_normal(v1, v2, v3);
    PlaneEquation {
        a: normal.x,
        b: normal.y,
        c: normal.z,
        d: -normal.dot(&v1.coords),
    }
}

/// Z of `plane` at the X/Y of `point`. The Z of `point` is ignored.
pub fn z_from_xy_and_plane(point: &Point3<f64>, plane: &PlaneEquation) -> f64 {
    plane.z_at(point.x, point.y)
}

/// Signed area test of `p1` against the edge `p2 → p3`, in the X/Y plane.
///
/// Only the sign of the result is meaningful.
pub fn sign(p1: &Point3<f64>, p2: &Point3<f64>, p3: &Point3<f64>) -> f64 {
    (p1.x - p3.x) * (p2.y - p3.y) - (p2.x - p3.x) * (p1.y - p3.y)
}

/// Returns if `pt` lies inside the triangle `v1 v2 v3` (X/Y only).
///
/// Points on an edge or vertex are inside.
pub fn is_point_in_triangle(
    pt: &Point3<f64>,
    v1: &Point3<f64>,
    v2: &Point3<f64>,
    v3: &Point3<f64>,
) -> bool {
    let d1 = sign(pt, v1, v2);
    let d2 = sign(pt, v2, v3);
    let d3 = sign(pt, v3, v1);

    let has_negative = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_positive = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;

    !(has_negative && has_positive)
}

/// Angle in radians between two vectors, or 0 when either is zero length
pub fn angle_between(first: &Vector3<f64>, second: &Vector3<f64>) -> f64 {
    let lengths = first.norm() * second.norm();
    if lengths < EPSILON {
        return 0.0;
    }
    (first.dot(second) / lengths).clamp(-1.0, 1.0).acos()
}

/// Returns if turning from travel vector `previous` onto `current` is a sharp corner
pub fn is_sharp_corner(current: &Vector3<f64>, previous: &Vector3<f64>) -> bool {
    if current.norm() < EPSILON || previous.norm() < EPSILON {
        return false;
    }
    angle_between(current, previous) > SHARP_CORNER_ANGLE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    #[test]
    fn test_min_max() {
        assert_eq!(min(1.0, 2.0), 1.0);
        assert_eq!(min(-3.0, -4.0), -4.0);
        assert_eq!(max(1.0, 2.0), 2.0);
        assert_eq!(max(-3.0, -4.0), -3.0);
    }

    #[test]
    fn test_plane_equation_flat_plane() {
        let plane = plane_equation(&p(0.0, 0.0, 2.0), &p(1.0, 0.0, 2.0), &p(0.0, 1.0, 2.0));
        assert!(!plane.is_vertical());
        assert!((z_from_xy_and_plane(&p(25.0, -7.0, 0.0), &plane) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_plane_equation_tilted_plane() {
        // z = 0.5x
        let plane = plane_equation(&p(0.0, 0.0, 0.0), &p(2.0, 0.0, 1.0), &p(0.0, 2.0, 0.0));
        assert!((plane.z_at(4.0, 9.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_plane_normal_collinear_is_zero() {
        let normal = plane_normal(&p(0.0, 0.0, 0.0), &p(1.0, 1.0, 1.0), &p(2.0, 2.0, 2.0));
        assert!(normal.norm() < 1e-12);
        let plane = plane_equation(&p(0.0, 0.0, 0.0), &p(1.0, 1.0, 1.0), &p(2.0, 2.0, 2.0));
        assert!(plane.is_vertical());
    }

    #[test]
    fn test_point_in_triangle() {
        let a = p(0.0, 0.0, 0.0);
        let b = p(10.0, 0.0, 0.0);
        let c = p(0.0, 10.0, 0.0);
        assert!(is_point_in_triangle(&p(2.0, 2.0, 0.0), &a, &b, &c));
        assert!(is_point_in_triangle(&p(5.0, 0.0, 0.0), &a, &b, &c));
        assert!(is_point_in_triangle(&a, &a, &b, &c));
        assert!(!is_point_in_triangle(&p(6.0, 6.0, 0.0), &a, &b, &c));
        assert!(!is_point_in_triangle(&p(-1.0, 2.0, 0.0), &a, &b, &c));
    }

    #[test]
    fn test_point_in_triangle_orientation_independent() {
        let a = p(0.0, 0.0, 0.0);
        let b = p(10.0, 0.0, 0.0);
        let c = p(0.0, 10.0, 0.0);
        let inside = p(1.0, 1.0, 0.0);
        assert!(is_point_in_triangle(&inside, &a, &c, &b));
        assert!(is_point_in_triangle(&inside, &c, &b, &a));
    }

    #[test]
    fn test_sign_orientation() {
        let left = sign(&p(0.0, 1.0, 0.0), &p(0.0, 0.0, 0.0), &p(1.0, 0.0, 0.0));
        let right = sign(&p(0.0, -1.0, 0.0), &p(0.0, 0.0, 0.0), &p(1.0, 0.0, 0.0));
        assert!(left * right < 0.0);
    }

    #[test]
    fn test_distance() {
        assert_eq!(distance(&p(0.0, 0.0, 0.0), &p(3.0, 4.0, 0.0)), 5.0);
    }

    #[test]
    fn test_sharp_corner_thresholds() {
        let east = Vector3::new(20.0, 0.0, 0.0);
        let (s, c) = 170f64.to_radians().sin_cos();
        let reversal = Vector3::new(20.0 * c, 20.0 * s, 0.0);
        let (s, c) = 10f64.to_radians().sin_cos();
        let gentle = Vector3::new(20.0 * c, 20.0 * s, 0.0);

        assert!(is_sharp_corner(&reversal, &east));
        assert!(!is_sharp_corner(&gentle, &east));
        assert!(!is_sharp_corner(&Vector3::zeros(), &east));
    }

    #[test]
    fn test_angle_between() {
        let x = Vector3::new(1.0, 0.0, 0.0);
        let y = Vector3::new(0.0, 3.0, 0.0);
        assert!((angle_between(&x, &y) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(angle_between(&x, &Vector3::zeros()), 0.0);
    }
}
