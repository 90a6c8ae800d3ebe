//! Numeric helpers shared by the decompilers.

use nalgebra::{Point3, Vector3};

use crate::plane::PlaneType;

/// Normal components this close to ±1 snap to an exact axis.
pub const NORMAL_EPSILON: f64 = 0.0001;
/// Plane distances this close to an integer snap to it.
pub const DIST_EPSILON: f64 = 0.02;

/// Snaps a nearly axial unit vector onto the exact axis.
pub fn snap_vector(normal: Vector3<f64>) -> Vector3<f64> {
    for axis in 0..3 {
        if (normal[axis] - 1.0).abs() < NORMAL_EPSILON {
            let mut snapped = Vector3::zeros();
            snapped[axis] = 1.0;
            return snapped;
        }
        if (normal[axis] + 1.0).abs() < NORMAL_EPSILON {
            let mut snapped = Vector3::zeros();
            snapped[axis] = -1.0;
            return snapped;
        }
    }
    normal
}

/// Snaps a plane's normal to an axis and its distance to an integer where close.
pub fn snap_plane(normal: Vector3<f64>, dist: f64) -> (Vector3<f64>, f64) {
    let normal = snap_vector(normal);
    let rounded = dist.round();
    if (dist - rounded).abs() < DIST_EPSILON {
        (normal, rounded)
    } else {
        (normal, dist)
    }
}

/// Classifies a unit normal by its dominant axis.
pub fn plane_type_for_normal(normal: &Vector3<f64>) -> PlaneType {
    if normal.x == 1.0 || normal.x == -1.0 {
        return PlaneType::X;
    }
    if normal.y == 1.0 || normal.y == -1.0 {
        return PlaneType::Y;
    }
    if normal.z == 1.0 || normal.z == -1.0 {
        return PlaneType::Z;
    }

    let ax = normal.x.abs();
    let ay = normal.y.abs();
    let az = normal.z.abs();

    if ax >= ay && ax >= az {
        PlaneType::AnyX
    } else if ay >= ax && ay >= az {
        PlaneType::AnyY
    } else {
        PlaneType::AnyZ
    }
}

/// Rounds an emitted coordinate: near zero becomes zero, near an integer
/// (towards zero) becomes that integer.
pub fn snap_coordinate(value: f64) -> f64 {
    if value.abs() < 0.2 {
        return 0.0;
    }
    let truncated = value.trunc();
    if (truncated - value).abs() < 0.3 {
        truncated
    } else {
        value
    }
}

pub fn snap_point(point: Point3<f64>) -> Point3<f64> {
    point.map(snap_coordinate)
}

/// Parses three whitespace-separated numbers, as found in entity keys.
pub fn parse_vector3(text: &str) -> Option<Vector3<f64>> {
    let mut parts = text.split_whitespace().map(str::parse::<f64>);
    let x = parts.next()?.ok()?;
    let y = parts.next()?.ok()?;
    let z = parts.next()?.ok()?;
    Some(Vector3::new(x, y, z))
}

/// Axis-aligned bounds accumulated from points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub mins: Point3<f64>,
    pub maxs: Point3<f64>,
}

impl Bounds {
    /// Empty bounds; adding any point makes them valid.
    pub fn empty() -> Self {
        Self {
            mins: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            maxs: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn add_point(&mut self, point: &Point3<f64>) {
        self.mins = self.mins.inf(point);
        self.maxs = self.maxs.sup(point);
    }

    /// Returns `true` if no point has been added.
    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.mins[i] > self.maxs[i])
    }

    /// Returns `true` if every coordinate lies within `±limit`.
    ///
    /// Empty bounds are never within any limit.
    pub fn within(&self, limit: f64) -> bool {
        !self.is_empty() && (0..3).all(|i| self.mins[i] >= -limit && self.maxs[i] <= limit)
    }

    /// Returns `true` if the boxes overlap once both are grown by `margin`.
    pub fn overlaps(&self, other: &Bounds, margin: f64) -> bool {
        (0..3).all(|i| {
            self.mins[i] - margin <= other.maxs[i] && self.maxs[i] + margin >= other.mins[i]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_vector_snaps_near_axis() {
        let snapped = snap_vector(Vector3::new(0.00001, -0.99999, 0.0));
        assert_eq!(snapped, Vector3::new(0.0, -1.0, 0.0));

        let diagonal = Vector3::new(0.6, 0.8, 0.0);
        assert_eq!(snap_vector(diagonal), diagonal);
    }

    #[test]
    fn snap_plane_rounds_close_distances() {
        let (_, dist) = snap_plane(Vector3::z(), 63.99);
        assert_eq!(dist, 64.0);

        let (_, dist) = snap_plane(Vector3::z(), 63.9);
        assert_eq!(dist, 63.9);
    }

    #[test]
    fn plane_types() {
        assert_eq!(plane_type_for_normal(&Vector3::new(0.0, -1.0, 0.0)), PlaneType::Y);
        assert_eq!(plane_type_for_normal(&Vector3::new(0.6, 0.8, 0.0)), PlaneType::AnyY);
        assert_eq!(plane_type_for_normal(&Vector3::new(0.8, 0.0, 0.6)), PlaneType::AnyX);
        assert_eq!(plane_type_for_normal(&Vector3::new(0.0, 0.6, -0.8)), PlaneType::AnyZ);
    }

    #[test]
    fn snap_coordinate_rules() {
        assert_eq!(snap_coordinate(0.15), 0.0);
        assert_eq!(snap_coordinate(12.2), 12.0);
        assert_eq!(snap_coordinate(-12.2), -12.0);
        assert_eq!(snap_coordinate(12.5), 12.5);
    }

    #[test]
    fn parse_vector3_reads_entity_values() {
        assert_eq!(
            parse_vector3("16 -32 8.5"),
            Some(Vector3::new(16.0, -32.0, 8.5))
        );
        assert_eq!(parse_vector3("16 -32"), None);
        assert_eq!(parse_vector3("a b c"), None);
    }

    #[test]
    fn bounds_accumulate_and_check_limits() {
        let mut bounds = Bounds::empty();
        assert!(!bounds.within(4096.0));

        bounds.add_point(&Point3::new(-10.0, 0.0, 5.0));
        bounds.add_point(&Point3::new(10.0, 20.0, -5.0));

        assert_eq!(bounds.mins, Point3::new(-10.0, 0.0, -5.0));
        assert_eq!(bounds.maxs, Point3::new(10.0, 20.0, 5.0));
        assert!(bounds.within(4096.0));
        assert!(!bounds.within(15.0));
    }

    #[test]
    fn bounds_overlap_with_margin() {
        let a = Bounds {
            mins: Point3::origin(),
            maxs: Point3::new(10.0, 10.0, 10.0),
        };
        let b = Bounds {
            mins: Point3::new(11.0, 0.0, 0.0),
            maxs: Point3::new(20.0, 10.0, 10.0),
        };

        assert!(!a.overlaps(&b, 0.0));
        assert!(a.overlaps(&b, 2.0));
    }
}
