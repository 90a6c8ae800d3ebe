//! Decompilation that extrudes every visible face into a thin brush.
//!
//! Faces of a model are first reduced to clean polygons and merged along
//! shared edges wherever the union stays convex. Each polygon is then pushed
//! one unit back along its normal, which yields a brush whose front face
//! carries the original texture. The result looks like the level but does
//! not reproduce its solid volumes.

use nalgebra::{Point3, Vector3};

use crate::bsp::{BspFace, BspFile};
use crate::cancel::CancellationToken;
use crate::entity::{
    DecompiledEntity, apply_trigger_textures, brush_entities, create_map_with_entities, origin_brush,
};
use crate::map::{MapFace, MapFile, Solid};
use crate::options::DecompilerOptions;
use crate::texture::{NULL_TEXTURE, TextureProjection};
use crate::winding::{CONTINUOUS_EPSILON, EQUAL_EPSILON, Winding};
use crate::{LogSink, Result};

/// How far faces are extruded behind themselves.
const BRUSH_THICKNESS: f64 = 1.0;

/// Decompiles every brush model of `bsp` by extruding its faces.
///
/// The level must already have passed [`BspFile::validate`].
pub fn decompile(
    log: &dyn LogSink,
    bsp: &BspFile,
    options: &DecompilerOptions,
    cancel: &CancellationToken,
) -> Result<MapFile> {
    options.log_summary(log);

    let decompiler = FaceToBrushDecompiler {
        log,
        bsp,
        options,
        cancel,
    };
    let mut map = create_map_with_entities(&bsp.entities);

    for mut target in brush_entities(&mut map, log, bsp.models.len()) {
        cancel.check()?;
        decompiler.decompile_model(&mut target)?;
    }

    apply_trigger_textures(&mut map, &options.trigger_entity_wildcards, log)?;

    Ok(map)
}

/// A face polygon together with the plane and texture it came from.
#[derive(Debug, Clone, PartialEq)]
struct FaceSide {
    /// File plane index.
    plane: usize,
    /// `true` if the polygon faces against the plane normal.
    side: bool,
    texinfo: usize,
    winding: Winding,
}

struct FaceToBrushDecompiler<'a> {
    log: &'a dyn LogSink,
    bsp: &'a BspFile,
    options: &'a DecompilerOptions,
    cancel: &'a CancellationToken,
}

impl FaceToBrushDecompiler<'_> {
    fn decompile_model(&self, target: &mut DecompiledEntity<'_>) -> Result<()> {
        let model = target.model;
        let sides = self.create_sides(model);
        let sides = self.merge_sides(sides, model)?;

        let mut solids: Vec<Solid> = sides
            .iter()
            .filter_map(|side| self.create_map_brush(side, model, &target.origin))
            .collect();

        if model == 0 {
            self.log.info(format_args!("{} brushes", solids.len()));
        }

        if target.wants_origin_brush(self.options.always_generate_origin_brushes) {
            solids.push(origin_brush(&target.origin));
        }

        target.entity.solids.extend(solids);
        Ok(())
    }

    /// Converts the faces of `model` to sides, dropping those that collapse
    /// to fewer than three points.
    fn create_sides(&self, model: usize) -> Vec<FaceSide> {
        let model_info = &self.bsp.models[model];
        let faces = model_info.first_face..model_info.first_face + model_info.num_faces;

        faces
            .filter_map(|index| {
                let side = self.face_to_side(&self.bsp.faces[index]);
                if side.winding.len() < 3 {
                    self.log.warn(format_args!(
                        "Skipping model {model} face {index}: face has only collinear points"
                    ));
                    return None;
                }
                Some(side)
            })
            .collect()
    }

    fn face_to_side(&self, face: &BspFace) -> FaceSide {
        let mut winding = Winding::new(self.bsp.face_points(face));
        winding.remove_collinear_points();
        FaceSide {
            plane: face.plane,
            side: face.side,
            texinfo: face.texinfo,
            winding,
        }
    }

    /// Direction a side faces.
    fn side_normal(&self, side: &FaceSide) -> Vector3<f64> {
        let normal = self.bsp.planes[side.plane].normal.cast::<f64>();
        if side.side { -normal } else { normal }
    }

    /// Merges sides along shared edges until a pass merges nothing.
    fn merge_sides(&self, mut sides: Vec<FaceSide>, model: usize) -> Result<Vec<FaceSide>> {
        if model == 0 {
            self.log.info(format_args!("Merging faces"));
        }

        let mut total = 0;
        loop {
            self.cancel.check()?;

            let mut merged = 0;
            let mut result = Vec::with_capacity(sides.len());
            for side in sides {
                merged += self.merge_side_into(side, &mut result);
            }
            sides = result;

            total += merged;
            if merged == 0 {
                break;
            }
        }

        if total > 0 {
            self.log.info(format_args!("Model {model}: merged {total} faces"));
        }

        Ok(sides)
    }

    /// Merges `side` with every side of `list` it can absorb, then appends
    /// it. Returns the number of merges.
    fn merge_side_into(&self, mut side: FaceSide, list: &mut Vec<FaceSide>) -> usize {
        let mut merged = 0;
        let mut i = 0;
        while i < list.len() {
            match self.try_merge(&side, &list[i]) {
                Some(union) => {
                    list.remove(i);
                    side = union;
                    merged += 1;
                }
                None => i += 1,
            }
        }
        list.push(side);
        merged
    }

    /// Joins two sides on the same plane and texture across a shared edge,
    /// if the result is convex.
    ///
    /// Points made redundant by the join are dropped when both neighbouring
    /// edges continue in a straight line.
    fn try_merge(&self, f1: &FaceSide, f2: &FaceSide) -> Option<FaceSide> {
        if f1.plane != f2.plane || f1.side != f2.side || f1.texinfo != f2.texinfo {
            return None;
        }

        let a = f1.winding.points();
        let b = f2.winding.points();
        let (n1, n2) = (a.len(), b.len());

        // The shared edge runs p1 -> p2 in the first side and p2 -> p1 in the
        // second.
        let (i, j) = (0..n1).find_map(|i| {
            let p1 = a[i];
            let p2 = a[(i + 1) % n1];
            (0..n2)
                .find(|&j| points_equal(&b[(j + 1) % n2], &p1) && points_equal(&b[j], &p2))
                .map(|j| (i, j))
        })?;

        let p1 = a[i];
        let p2 = a[(i + 1) % n1];
        let normal = self.side_normal(f1);

        let slope = normal.cross(&(p1 - a[(i + n1 - 1) % n1])).normalize();
        let dot = (b[(j + 2) % n2] - p1).dot(&slope);
        if dot > CONTINUOUS_EPSILON {
            return None;
        }
        let keep1 = dot < -CONTINUOUS_EPSILON;

        let slope = normal.cross(&(a[(i + 2) % n1] - p2)).normalize();
        let dot = (b[(j + n2 - 1) % n2] - p2).dot(&slope);
        if dot > CONTINUOUS_EPSILON {
            return None;
        }
        let keep2 = dot < -CONTINUOUS_EPSILON;

        let first = (1..n1)
            .map(|offset| (i + offset) % n1)
            .filter(|&k| keep2 || k != (i + 1) % n1)
            .map(|k| a[k]);
        let second = (1..n2)
            .map(|offset| (j + offset) % n2)
            .filter(|&l| keep1 || l != (j + 1) % n2)
            .map(|l| b[l]);

        Some(FaceSide {
            plane: f1.plane,
            side: f1.side,
            texinfo: f1.texinfo,
            winding: Winding::new(first.chain(second)),
        })
    }

    /// Extrudes a side into a brush, or returns `None` for windings too
    /// small or too large to make a sane brush.
    fn create_map_brush(&self, side: &FaceSide, model: usize, origin: &Vector3<f64>) -> Option<Solid> {
        let winding = &side.winding;
        let points = winding.points();

        if winding.is_tiny() {
            self.log.warn(format_args!(
                "Skipping model {model} face near {:?}: face is tiny",
                points[0].coords.as_slice()
            ));
            return None;
        }
        if winding.is_huge() {
            self.log.warn(format_args!(
                "Skipping model {model} face near {:?}: face is huge",
                points[0].coords.as_slice()
            ));
            return None;
        }

        let normal = self.side_normal(side);
        let info = &self.bsp.texinfos[side.texinfo];
        let texture_name = self.bsp.texture_name(side.texinfo);
        let projection =
            TextureProjection::from_texture_vectors(&info.s.cast(), &info.t.cast(), origin, &normal);
        let generated = if self.options.apply_null_to_generated_faces {
            NULL_TEXTURE
        } else {
            texture_name
        };

        let front = |p: &Point3<f64>| p + origin;
        let back = |p: &Point3<f64>| p + origin - normal * BRUSH_THICKNESS;

        let mut faces = Vec::with_capacity(points.len() + 2);
        faces.push(MapFace::new(
            texture_name,
            &projection,
            [front(&points[0]), front(&points[1]), front(&points[2])],
        ));
        faces.push(MapFace::new(
            generated,
            &projection,
            [back(&points[2]), back(&points[1]), back(&points[0])],
        ));

        for (e, a) in points.iter().enumerate() {
            let b = &points[(e + 1) % points.len()];
            let wall_normal = normal.cross(&(b - a)).normalize();
            faces.push(MapFace::new(
                generated,
                &TextureProjection::face_aligned(&wall_normal),
                [back(b), front(b), front(a)],
            ));
        }

        Some(Solid { faces })
    }
}

fn points_equal(a: &Point3<f64>, b: &Point3<f64>) -> bool {
    (a - b).iter().all(|d| d.abs() <= EQUAL_EPSILON)
}
