//! Convex polygons lying on a plane, and the clipping operations on them.

use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

use crate::plane::{Plane, PlaneSide};
use crate::{Error, Result};

/// Half-extent of the maximal winding on a plane, and the range beyond
/// which geometry is considered bogus.
pub const BOGUS_RANGE: f64 = 65535.0;
/// Hard upper bound on the number of points in a winding.
pub const MAX_POINTS_ON_WINDING: usize = 96;
/// Edges shorter than this do not count towards a winding's size.
pub const EDGE_LENGTH: f64 = 0.2;
/// Tolerance used when testing whether two windings form a convex pair.
pub const CONVEX_EPSILON: f64 = 0.2;
/// Tolerance for collinearity and slope tests.
pub const CONTINUOUS_EPSILON: f64 = 0.005;
/// Tolerance for treating two points as the same point.
pub const EQUAL_EPSILON: f64 = 0.001;

type Points = SmallVec<[Point3<f64>; 8]>;

/// An ordered, convex, planar point loop.
///
/// Windings run clockwise when seen from the front of their plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Winding {
    points: Points,
}

impl Winding {
    /// Creates a winding from points in loop order.
    pub fn new(points: impl IntoIterator<Item = Point3<f64>>) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    /// Builds a square of half-size [`BOGUS_RANGE`] on the given plane.
    ///
    /// Fails with [`Error::NoAxisFound`] if the normal has no usable component.
    pub fn base_for_plane(normal: &Vector3<f64>, dist: f64) -> Result<Self> {
        let mut max = -BOGUS_RANGE;
        let mut axis = None;
        for i in 0..3 {
            let v = normal[i].abs();
            if v > max {
                axis = Some(i);
                max = v;
            }
        }

        let mut vup = match axis.ok_or(Error::NoAxisFound)? {
            0 | 1 => Vector3::z(),
            _ => Vector3::x(),
        };

        let v = vup.dot(normal);
        vup -= normal * v;
        vup = vup.normalize();

        let org = normal * dist;
        let vright = vup.cross(normal) * BOGUS_RANGE;
        let vup = vup * BOGUS_RANGE;

        Ok(Self::new([
            Point3::from(org - vright + vup),
            Point3::from(org + vright + vup),
            Point3::from(org + vright - vup),
            Point3::from(org - vright - vup),
        ]))
    }

    #[inline]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Area of the polygon, computed as a triangle fan.
    pub fn area(&self) -> f64 {
        let Some(first) = self.points.first() else {
            return 0.0;
        };
        self.points
            .windows(2)
            .skip(1)
            .map(|pair| (pair[0] - first).cross(&(pair[1] - first)).norm() * 0.5)
            .sum()
    }

    /// Returns `true` if fewer than three edges are longer than [`EDGE_LENGTH`].
    pub fn is_tiny(&self) -> bool {
        let n = self.points.len();
        let mut edges = 0;
        for i in 0..n {
            let next = self.points[(i + 1) % n];
            if (next - self.points[i]).norm() > EDGE_LENGTH {
                edges += 1;
                if edges == 3 {
                    return false;
                }
            }
        }
        true
    }

    /// Returns `true` if any coordinate lies outside the map range.
    pub fn is_huge(&self) -> bool {
        self.points
            .iter()
            .any(|p| p.iter().any(|c| c.abs() >= BOGUS_RANGE + 128.0))
    }

    /// Splits the winding by a plane into `(front, back)` parts.
    ///
    /// Points within `epsilon` of the plane belong to both parts. A winding
    /// entirely on one side is returned unchanged on that side, with `None`
    /// on the other; a winding entirely on the plane goes to the back.
    pub fn clip(
        &self,
        normal: &Vector3<f64>,
        dist: f64,
        epsilon: f64,
    ) -> Result<(Option<Winding>, Option<Winding>)> {
        let plane = Plane::new(*normal, dist);
        let n = self.points.len();

        let mut dists: SmallVec<[f64; 16]> = SmallVec::with_capacity(n + 1);
        let mut sides: SmallVec<[PlaneSide; 16]> = SmallVec::with_capacity(n + 1);
        let mut front_count = 0;
        let mut back_count = 0;

        for point in &self.points {
            let side = plane.classify_point_with_epsilon(point, epsilon);
            match side {
                PlaneSide::Front => front_count += 1,
                PlaneSide::Back => back_count += 1,
                PlaneSide::OnPlane => {}
            }
            dists.push(plane.signed_distance(point));
            sides.push(side);
        }

        if front_count == 0 {
            return Ok((None, Some(self.clone())));
        }
        if back_count == 0 {
            return Ok((Some(self.clone()), None));
        }

        let limit = n + 4;
        let mut front = Points::with_capacity(limit);
        let mut back = Points::with_capacity(limit);

        for i in 0..n {
            let p1 = self.points[i];
            let next = (i + 1) % n;

            match sides[i] {
                PlaneSide::OnPlane => {
                    front.push(p1);
                    back.push(p1);
                    continue;
                }
                PlaneSide::Front => front.push(p1),
                PlaneSide::Back => back.push(p1),
            }

            if sides[next] == PlaneSide::OnPlane || sides[next] == sides[i] {
                continue;
            }

            let p2 = self.points[next];
            let t = dists[i] / (dists[i] - dists[next]);
            let mut mid = Point3::origin();
            for j in 0..3 {
                // Exact axial planes yield exact coordinates.
                mid[j] = if normal[j] == 1.0 {
                    dist
                } else if normal[j] == -1.0 {
                    -dist
                } else {
                    p1[j] + t * (p2[j] - p1[j])
                };
            }

            front.push(mid);
            back.push(mid);
        }

        for points in [&front, &back] {
            if points.len() > limit {
                return Err(Error::WindingOverflow {
                    points: points.len(),
                    limit,
                });
            }
            if points.len() > MAX_POINTS_ON_WINDING {
                return Err(Error::TooManyPoints(points.len()));
            }
        }

        Ok((Self::non_degenerate(front), Self::non_degenerate(back)))
    }

    /// Keeps only the part of the winding in front of the plane.
    pub fn chop(self, normal: &Vector3<f64>, dist: f64, epsilon: f64) -> Result<Option<Winding>> {
        let (front, _) = self.clip(normal, dist, epsilon)?;
        Ok(front)
    }

    /// Removes points that lie on the straight line between their neighbours.
    ///
    /// Repeats until no such point remains, so the result is a fixed point.
    pub fn remove_collinear_points(&mut self) {
        while self.points.len() >= 3 {
            let n = self.points.len();
            let collinear = (0..n).find(|&i| {
                let prev = self.points[(i + n - 1) % n];
                let current = self.points[i];
                let next = self.points[(i + 1) % n];

                let mut lengths = [
                    (current - prev).norm(),
                    (next - current).norm(),
                    (next - prev).norm(),
                ];
                lengths.sort_by(f64::total_cmp);
                (lengths[2] - (lengths[0] + lengths[1])).abs() <= CONTINUOUS_EPSILON
            });

            match collinear {
                Some(i) => {
                    self.points.remove(i);
                }
                None => break,
            }
        }
    }

    /// Returns `true` if joining the two windings would not be convex: some
    /// point of either lies more than [`CONVEX_EPSILON`] in front of the
    /// other's plane.
    pub fn are_non_convex(&self, plane: &Plane, other: &Winding, other_plane: &Plane) -> bool {
        self.points
            .iter()
            .any(|p| other_plane.signed_distance(p) > CONVEX_EPSILON)
            || other
                .points
                .iter()
                .any(|p| plane.signed_distance(p) > CONVEX_EPSILON)
    }

    /// Returns the points in reverse order.
    pub fn reversed(&self) -> Self {
        Self::new(self.points.iter().rev().copied())
    }

    pub fn translated(&self, offset: &Vector3<f64>) -> Self {
        Self::new(self.points.iter().map(|p| p + offset))
    }

    fn non_degenerate(points: Points) -> Option<Winding> {
        (points.len() >= 3).then_some(Winding { points })
    }
}
