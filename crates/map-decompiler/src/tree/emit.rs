//! Conversion of finished brushes into map brushes.

use nalgebra::Vector3;

use crate::brush::{Brush, Side, SideFlags, SideSource};
use crate::bsp::Contents;
use crate::map::{MapFace, Solid};
use crate::math::{snap_point, snap_vector};
use crate::texture::{CLIP_TEXTURE, TextureProjection};
use crate::winding::{BOGUS_RANGE, Winding};
use crate::Result;

use super::TreeDecompiler;

/// Winding edges shorter than this never get an edge bevel.
const MIN_BEVEL_EDGE: f64 = 0.5;
/// A candidate bevel is rejected if any brush point lies this far in front.
const BEVEL_EPSILON: f64 = 0.1;

impl TreeDecompiler<'_> {
    /// Finishes a brush and converts it to a map brush.
    ///
    /// Returns `None` for brushes that are dropped: brushes with no textured
    /// side (counted as clip brushes), brushes out of range, and liquids
    /// when they are excluded.
    pub(super) fn emit_brush(
        &mut self,
        brush: &mut Brush,
        entity_index: usize,
        origin: &Vector3<f64>,
    ) -> Result<Option<Solid>> {
        let best = brush
            .sides
            .iter()
            .filter(|s| s.winding.is_some())
            .filter_map(|s| s.texinfo)
            .last();
        let Some(best) = best else {
            brush.contents = Contents::Clip;
            self.clip_brushes += 1;
            return Ok(None);
        };

        for side in brush.sides.iter_mut().filter(|s| s.texinfo.is_none()) {
            side.texinfo = Some(best);
        }

        brush.create_windings(&self.registry, true)?;
        if !brush.bounds.within(BOGUS_RANGE) {
            self.log.warn(format_args!(
                "entity {entity_index}, brush {}: bounds out of range",
                self.map_brushes
            ));
            return Ok(None);
        }

        self.add_bevels(brush)?;
        self.map_brushes += 1;

        if !self.options.include_liquids && brush.contents.is_liquid() {
            return Ok(None);
        }

        self.to_solid(brush, origin).map(Some)
    }

    /// Adds the sides a brush needs to expand correctly against boxes.
    ///
    /// The six axial sides end up first, ordered `-x, +x, -y, +y, -z, +z`,
    /// and missing ones are added as bevels at the brush bounds. Then each
    /// non-axial edge of the remaining sides gets a bevel for every axis
    /// plane through it that has the whole brush behind it.
    pub(super) fn add_bevels(&mut self, brush: &mut Brush) -> Result<()> {
        let bevel_texinfo = brush.sides.first().and_then(|s| s.texinfo);
        let make_bevel = |plane: usize| Side {
            texinfo: bevel_texinfo,
            flags: SideFlags::BEVEL,
            ..Side::new(plane, SideSource::Generated)
        };

        let mut order = 0;
        for axis in 0..3 {
            for dir in [-1.0, 1.0] {
                let existing = brush
                    .sides
                    .iter()
                    .position(|s| self.registry.get(s.plane).normal()[axis] == dir);

                let index = match existing {
                    Some(index) => index,
                    None => {
                        let mut normal = Vector3::zeros();
                        normal[axis] = dir;
                        let dist = if dir > 0.0 {
                            brush.bounds.maxs[axis]
                        } else {
                            -brush.bounds.mins[axis]
                        };
                        let plane = self.registry.find_or_create(normal, dist)?;
                        brush.sides.push(make_bevel(plane));
                        brush.sides.len() - 1
                    }
                };

                brush.sides.swap(index, order);
                order += 1;
            }
        }

        if brush.sides.len() == 6 {
            return Ok(());
        }

        let mut i = 6;
        while i < brush.sides.len() {
            self.cancel.check()?;

            let Some(winding) = brush.sides[i].winding.clone() else {
                i += 1;
                continue;
            };

            let points = winding.points();
            for (j, point) in points.iter().enumerate() {
                let next = points[(j + 1) % points.len()];
                let edge = *point - next;
                if edge.norm() < MIN_BEVEL_EDGE {
                    continue;
                }
                let edge = snap_vector(edge.normalize());
                if edge.iter().any(|&c| c == 1.0 || c == -1.0) {
                    continue;
                }

                for axis in 0..3 {
                    for dir in [-1.0, 1.0] {
                        let mut axis_vector = Vector3::zeros();
                        axis_vector[axis] = dir;

                        let normal = edge.cross(&axis_vector);
                        if normal.norm() < MIN_BEVEL_EDGE {
                            continue;
                        }
                        let normal = normal.normalize();
                        let dist = point.coords.dot(&normal);

                        if !self.is_outer_bevel(brush, &normal, dist) {
                            continue;
                        }

                        let plane = self.registry.find_or_create(normal, dist)?;
                        brush.sides.push(make_bevel(plane));
                    }
                }
            }

            i += 1;
        }

        Ok(())
    }

    /// Returns `true` if the plane is new to the brush and has every winding
    /// point behind it.
    fn is_outer_bevel(&self, brush: &Brush, normal: &Vector3<f64>, dist: f64) -> bool {
        !brush.sides.iter().any(|side| {
            self.registry.get(side.plane).approx_eq(normal, dist)
                || side.winding.as_ref().is_some_and(|w| {
                    w.points()
                        .iter()
                        .any(|p| p.coords.dot(normal) - dist > BEVEL_EPSILON)
                })
        })
    }

    /// Writes every non-bevel side with a winding as a map face, moving the
    /// geometry back by the entity's origin.
    fn to_solid(&mut self, brush: &Brush, origin: &Vector3<f64>) -> Result<Solid> {
        let mut faces = Vec::with_capacity(brush.sides.len());

        for side in brush.sides.iter().filter(|s| !s.is_bevel() && s.winding.is_some()) {
            let plane_index = if *origin != Vector3::zeros() {
                let plane = self.registry.get(side.plane);
                let (normal, dist) = (plane.normal(), plane.dist());
                self.registry.find_or_create(normal, dist + normal.dot(origin))?
            } else {
                side.plane
            };

            let normal = self.registry.get(plane_index).normal();
            let (texture_name, projection) = match side.texinfo {
                Some(texinfo) => {
                    let info = &self.bsp.texinfos[texinfo];
                    let projection = TextureProjection::from_texture_vectors(
                        &info.s.cast(),
                        &info.t.cast(),
                        origin,
                        &normal,
                    );
                    (self.texture_name(texinfo), projection)
                }
                None => (CLIP_TEXTURE, TextureProjection::face_aligned(&normal)),
            };

            // Both planes of a pair share the first one's base winding; the
            // point order encodes which way the face points.
            let base = self.registry.get(plane_index & !1);
            let winding = Winding::base_for_plane(&base.normal(), base.dist())?;
            let [a, b, c] = [0, 1, 2].map(|i| snap_point(winding.points()[i]));
            let vertices = if plane_index & 1 == 0 { [a, b, c] } else { [b, a, c] };

            faces.push(MapFace::new(texture_name, &projection, vertices));
        }

        Ok(Solid { faces })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::SplitParams;
    use crate::options::DecompilerOptions;
    use crate::test_util::box_level;
    use crate::{CancellationToken, Transcript};
    use nalgebra::Point3;

    fn with_decompiler(test: impl FnOnce(&mut TreeDecompiler<'_>)) {
        let bsp = box_level(Contents::Solid, "crate01");
        let options = DecompilerOptions::default();
        let log = Transcript::new();
        let cancel = CancellationToken::new();
        let mut decompiler = TreeDecompiler::new(&log, &bsp, &options, &cancel);
        test(&mut decompiler);
    }

    fn make_box(decompiler: &mut TreeDecompiler<'_>, maxs: f64) -> Brush {
        let mut brush = Brush::from_bounds(
            &mut decompiler.registry,
            &Point3::origin(),
            &Point3::new(maxs, maxs, maxs),
            Contents::Solid,
            SideSource::Bounds,
        )
        .unwrap();
        for side in &mut brush.sides {
            side.texinfo = Some(0);
        }
        brush
    }

    /// A box cut along `x + y = size`, keeping the corner at the origin.
    fn make_wedge(decompiler: &mut TreeDecompiler<'_>, size: f64) -> Brush {
        let brush = make_box(decompiler, size);
        let normal = Vector3::new(1.0, 1.0, 0.0).normalize();
        let dist = normal.dot(&Vector3::new(size, 0.0, 0.0));
        let plane = decompiler.registry.find_or_create(normal, dist).unwrap();
        let (_, back) = brush
            .split(
                &decompiler.registry,
                plane,
                SideSource::Node(0),
                &SplitParams::NODE,
                decompiler.log,
            )
            .unwrap();
        let mut back = back.unwrap();
        for side in &mut back.sides {
            side.texinfo = Some(0);
        }
        back
    }

    #[test]
    fn axial_box_needs_no_bevels() {
        with_decompiler(|decompiler| {
            let mut brush = make_box(decompiler, 64.0);
            decompiler.add_bevels(&mut brush).unwrap();

            assert_eq!(brush.sides.len(), 6);
            assert!(brush.sides.iter().all(|s| !s.is_bevel()));

            let normals: Vec<_> = brush
                .sides
                .iter()
                .map(|s| decompiler.registry.get(s.plane).normal())
                .collect();
            assert_eq!(normals[0], -Vector3::x());
            assert_eq!(normals[1], Vector3::x());
            assert_eq!(normals[5], Vector3::z());
        });
    }

    #[test]
    fn wedge_gets_axial_bevels() {
        with_decompiler(|decompiler| {
            let mut brush = make_wedge(decompiler, 64.0);
            assert_eq!(brush.sides.len(), 5);

            let solid = decompiler
                .emit_brush(&mut brush, 0, &Vector3::zeros())
                .unwrap()
                .unwrap();

            // +x and +y are missing; the sloped side has no open edges.
            assert_eq!(brush.sides.len(), 7);
            assert_eq!(brush.sides.iter().filter(|s| s.is_bevel()).count(), 2);
            assert_eq!(solid.faces.len(), 5);
        });
    }

    #[test]
    fn emitted_faces_point_outwards() {
        with_decompiler(|decompiler| {
            let mut brush = make_box(decompiler, 32.0);
            let solid = decompiler
                .emit_brush(&mut brush, 0, &Vector3::zeros())
                .unwrap()
                .unwrap();

            for face in &solid.faces {
                let (normal, dist) = face.plane();
                let centre = Point3::new(16.0, 16.0, 16.0);
                assert!(normal.dot(&centre.coords) < dist, "{normal:?} faces inwards");
            }
            assert_eq!(decompiler.map_brushes, 1);
        });
    }

    #[test]
    fn untextured_brush_is_counted_as_clip() {
        with_decompiler(|decompiler| {
            let mut brush = make_box(decompiler, 32.0);
            for side in &mut brush.sides {
                side.texinfo = None;
            }

            assert!(decompiler.emit_brush(&mut brush, 0, &Vector3::zeros()).unwrap().is_none());
            assert_eq!(brush.contents, Contents::Clip);
            assert_eq!(decompiler.clip_brushes, 1);
            assert_eq!(decompiler.map_brushes, 0);
        });
    }

    #[test]
    fn bevel_scan_stops_when_canceled() {
        with_decompiler(|decompiler| {
            let mut brush = make_wedge(decompiler, 64.0);
            decompiler.cancel.cancel();

            let err = decompiler.add_bevels(&mut brush).unwrap_err();
            assert!(err.is_canceled());
        });
    }
}
