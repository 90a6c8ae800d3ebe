//! Plane representation used by the reconstruction engine.

use nalgebra::{Point3, Vector3};

use crate::math::{DIST_EPSILON, NORMAL_EPSILON, plane_type_for_normal};

/// Dominant-axis classification of a plane normal.
///
/// `X`, `Y` and `Z` are exactly axial; the `Any*` variants name the largest
/// component of a non-axial normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PlaneType {
    X = 0,
    Y = 1,
    Z = 2,
    AnyX = 3,
    AnyY = 4,
    AnyZ = 5,
}

impl PlaneType {
    /// Decodes the on-disk plane type, falling back to `None` for unknown codes.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::X),
            1 => Some(Self::Y),
            2 => Some(Self::Z),
            3 => Some(Self::AnyX),
            4 => Some(Self::AnyY),
            5 => Some(Self::AnyZ),
            _ => None,
        }
    }

    #[inline]
    pub fn is_axial(self) -> bool {
        matches!(self, Self::X | Self::Y | Self::Z)
    }
}

/// Which side of a plane a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// Point is in front of the plane (positive side of normal)
    Front,
    /// Point is behind the plane (negative side of normal)
    Back,
    /// Point lies on the plane (within epsilon tolerance)
    OnPlane,
}

/// A plane in 3D space, represented as `normal · point = dist`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    normal: Vector3<f64>,
    dist: f64,
    kind: PlaneType,
}

impl Plane {
    /// Creates a plane from a unit normal and distance, deriving its type.
    pub fn new(normal: Vector3<f64>, dist: f64) -> Self {
        Self {
            normal,
            dist,
            kind: plane_type_for_normal(&normal),
        }
    }

    /// Creates a plane with an explicit type, as stored in a compiled level.
    pub fn with_type(normal: Vector3<f64>, dist: f64, kind: PlaneType) -> Self {
        Self { normal, dist, kind }
    }

    /// Returns the unit normal vector of the plane.
    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    /// Returns the signed distance from the origin to the plane along the normal.
    #[inline]
    pub fn dist(&self) -> f64 {
        self.dist
    }

    #[inline]
    pub fn kind(&self) -> PlaneType {
        self.kind
    }

    /// Computes the signed distance from a point to the plane.
    #[inline]
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) - self.dist
    }

    /// Classifies which side of the plane a point lies on, with a custom epsilon.
    pub fn classify_point_with_epsilon(&self, point: &Point3<f64>, epsilon: f64) -> PlaneSide {
        let dist = self.signed_distance(point);
        if dist > epsilon {
            PlaneSide::Front
        } else if dist < -epsilon {
            PlaneSide::Back
        } else {
            PlaneSide::OnPlane
        }
    }

    /// Returns a new plane with the normal flipped (facing the opposite direction).
    #[inline]
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            dist: -self.dist,
            kind: self.kind,
        }
    }

    /// Axial planes whose normal points down an axis are stored second in a pair.
    #[inline]
    pub fn is_facing_negative(&self) -> bool {
        self.kind.is_axial() && self.normal.iter().any(|&c| c < 0.0)
    }

    /// Tolerant comparison against a normal and distance.
    pub fn approx_eq(&self, normal: &Vector3<f64>, dist: f64) -> bool {
        (0..3).all(|i| (self.normal[i] - normal[i]).abs() < NORMAL_EPSILON)
            && (self.dist - dist).abs() < DIST_EPSILON
    }

    /// Returns `true` if both planes have exactly opposite normal and distance.
    pub fn is_exact_inverse_of(&self, other: &Plane) -> bool {
        self.normal == -other.normal && self.dist == -other.dist
    }
}
