//! Deduplicated plane storage with paired inverses.
//!
//! Every plane lives next to its exact inverse: for any index `i`, the plane
//! at `i ^ 1` faces the other way. Axial planes facing down their axis are
//! always the second member of a pair. Lookups are tolerant: normals and
//! distances are snapped first, then compared with the snapping epsilons
//! against every plane in the neighbouring distance buckets.

use nalgebra::Vector3;
use smallvec::SmallVec;

use crate::bsp::BspPlane;
use crate::math::snap_plane;
use crate::plane::Plane;
use crate::{Error, Result};

/// Number of distance buckets; must be a power of two.
pub const PLANE_HASHES: usize = 1024;

/// Job-local arena of planes.
#[derive(Debug, Clone)]
pub struct PlaneRegistry {
    planes: Vec<Plane>,
    buckets: Vec<SmallVec<[usize; 4]>>,
}

impl Default for PlaneRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaneRegistry {
    pub fn new() -> Self {
        Self {
            planes: Vec::new(),
            buckets: vec![SmallVec::new(); PLANE_HASHES],
        }
    }

    /// Builds a registry from the plane lump of a compiled level.
    ///
    /// Consecutive exact inverses are kept as a pair; any other plane gets a
    /// synthesized inverse. Returns the registry and the mapping from file
    /// plane index to registry index.
    pub fn from_bsp_planes(bsp_planes: &[BspPlane]) -> (Self, Vec<usize>) {
        let mut registry = Self::new();
        let mut remap = vec![0; bsp_planes.len()];

        let mut i = 0;
        while i < bsp_planes.len() {
            let plane = bsp_planes[i].to_plane();
            let next = bsp_planes.get(i + 1).map(BspPlane::to_plane);

            match next {
                Some(next) if plane.is_exact_inverse_of(&next) => {
                    if plane.is_facing_negative() {
                        remap[i + 1] = registry.push(next);
                        remap[i] = registry.push(plane);
                    } else {
                        remap[i] = registry.push(plane);
                        remap[i + 1] = registry.push(next);
                    }
                    i += 2;
                }
                _ => {
                    remap[i] = registry.push_pair(plane);
                    i += 1;
                }
            }
        }

        (registry, remap)
    }

    /// Number of stored planes (always even).
    #[inline]
    pub fn len(&self) -> usize {
        self.planes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    /// Returns the plane at `index`.
    ///
    /// # Panics
    /// Panics if `index` was not handed out by this registry.
    #[inline]
    pub fn get(&self, index: usize) -> &Plane {
        &self.planes[index]
    }

    /// Looks up a plane without creating it.
    pub fn find(&self, normal: Vector3<f64>, dist: f64) -> Option<usize> {
        let (normal, dist) = snap_plane(normal, dist);
        let hash = bucket_for(dist);

        [hash.wrapping_sub(1), hash, hash + 1]
            .into_iter()
            .map(|h| h & (PLANE_HASHES - 1))
            .flat_map(|h| self.buckets[h].iter().copied())
            .find(|&index| self.planes[index].approx_eq(&normal, dist))
    }

    /// Returns the index of the plane equal to `normal · p = dist`, creating
    /// the plane and its inverse if no stored plane matches.
    pub fn find_or_create(&mut self, normal: Vector3<f64>, dist: f64) -> Result<usize> {
        if let Some(index) = self.find(normal, dist) {
            return Ok(index);
        }

        let (normal, dist) = snap_plane(normal, dist);
        if normal.norm() < 0.5 {
            return Err(Error::BadPlaneNormal);
        }

        Ok(self.push_pair(Plane::new(normal, dist)))
    }

    /// Appends `plane` and its inverse in canonical order, returning the
    /// index of `plane`.
    fn push_pair(&mut self, plane: Plane) -> usize {
        let inverse = plane.flipped();
        if plane.is_facing_negative() {
            self.push(inverse);
            self.push(plane)
        } else {
            let index = self.push(plane);
            self.push(inverse);
            index
        }
    }

    fn push(&mut self, plane: Plane) -> usize {
        let index = self.planes.len();
        self.buckets[bucket_for(plane.dist())].push(index);
        self.planes.push(plane);
        index
    }
}

#[inline]
fn bucket_for(dist: f64) -> usize {
    (dist.abs() as usize / 8) & (PLANE_HASHES - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plane::PlaneType;
    use nalgebra::Vector3;

    fn make_bsp_plane(normal: [f32; 3], distance: f32, kind: PlaneType) -> BspPlane {
        BspPlane {
            normal: Vector3::new(normal[0], normal[1], normal[2]),
            distance,
            kind,
        }
    }

    #[test]
    fn created_pairs_are_exact_inverses() {
        let mut registry = PlaneRegistry::new();
        let normal = Vector3::new(0.6, 0.8, 0.0);
        let index = registry.find_or_create(normal, 100.0).unwrap();

        let plane = registry.get(index);
        let inverse = registry.get(index ^ 1);
        assert!(plane.is_exact_inverse_of(inverse));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn lookup_is_idempotent() {
        let mut registry = PlaneRegistry::new();
        let first = registry.find_or_create(Vector3::z(), 64.0).unwrap();
        let second = registry.find_or_create(Vector3::z(), 64.0).unwrap();
        let snapped = registry
            .find_or_create(Vector3::new(0.0, 0.00001, 0.99999), 64.01)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first, snapped);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn inverse_lookup_differs_in_pairing_bit() {
        let mut registry = PlaneRegistry::new();
        let front = registry.find_or_create(Vector3::y(), -40.0).unwrap();
        let back = registry.find_or_create(-Vector3::y(), 40.0).unwrap();

        assert_eq!(front ^ 1, back);
    }

    #[test]
    fn negative_axial_planes_are_stored_second() {
        let mut registry = PlaneRegistry::new();
        let index = registry.find_or_create(-Vector3::x(), 16.0).unwrap();

        assert_eq!(index & 1, 1);
        assert_eq!(registry.get(index & !1).normal(), Vector3::x());
    }

    #[test]
    fn neighbouring_buckets_are_searched() {
        // Stored unsnapped just below a bucket boundary, queried just above it.
        let planes = [make_bsp_plane([1.0, 0.0, 0.0], 15.995, PlaneType::X)];
        let (registry, remap) = PlaneRegistry::from_bsp_planes(&planes);

        assert_eq!(registry.find(Vector3::x(), 16.01), Some(remap[0]));
    }

    #[test]
    fn degenerate_normal_is_rejected() {
        let mut registry = PlaneRegistry::new();
        assert!(matches!(
            registry.find_or_create(Vector3::new(0.1, 0.1, 0.0), 0.0),
            Err(Error::BadPlaneNormal)
        ));
    }

    #[test]
    fn bsp_planes_are_paired_and_remapped() {
        let planes = [
            // A negative-facing plane followed by its exact inverse.
            make_bsp_plane([-1.0, 0.0, 0.0], -32.0, PlaneType::X),
            make_bsp_plane([1.0, 0.0, 0.0], 32.0, PlaneType::X),
            // A lone plane gets a synthesized inverse.
            make_bsp_plane([0.0, 0.0, 1.0], 0.0, PlaneType::Z),
        ];

        let (registry, remap) = PlaneRegistry::from_bsp_planes(&planes);

        assert_eq!(registry.len(), 4);
        assert_eq!(remap, vec![1, 0, 2]);
        assert_eq!(registry.get(0).normal(), Vector3::x());
        assert!(registry.get(2).is_exact_inverse_of(registry.get(3)));
    }
}
