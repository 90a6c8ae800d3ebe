//! Matching brush sides against the faces that were compiled onto them.

use nalgebra::Vector3;
use rustc_hash::FxHashMap;

use crate::brush::{Brush, SideFlags, SideSource, SplitParams};
use crate::bsp::BspFace;
use crate::options::BrushOptimization;
use crate::texture::texture_contents;
use crate::winding::Winding;
use crate::Result;

use super::TreeDecompiler;

/// Faces must overlap a side by more than this to texture it.
const MIN_FACE_AREA: f64 = 1.0;
/// Fence planes are chopped with this much slack.
const FENCE_EPSILON: f64 = 0.9;

/// Outcome of scanning a model's faces for one side.
enum FaceMatch {
    Face(usize),
    /// The brush was cut along a face; the pieces replace it.
    Split(Vec<Brush>),
    None,
}

impl TreeDecompiler<'_> {
    /// Gives every side a texture info from the face that overlaps it most.
    ///
    /// With [`BrushOptimization::BestTextureMatch`], a side covered by faces
    /// with different textures causes its brush to be split along the
    /// second face. The pieces go to the end of the list and are textured
    /// in turn.
    pub(super) fn texture_brushes(&mut self, mut brushes: Vec<Brush>, model: usize) -> Result<Vec<Brush>> {
        if model == 0 {
            self.log.info(format_args!("texturing brushes"));
        }

        let bsp = self.bsp;
        let faces_by_plane = self.faces_by_plane(model);

        let mut index = 0;
        'brushes: while index < brushes.len() {
            self.cancel.check()?;

            for side_index in 0..brushes[index].sides.len() {
                let brush = &brushes[index];
                let side = &brush.sides[side_index];
                if side.is_textured() {
                    continue;
                }

                let best = match (side.source, &side.winding) {
                    (SideSource::Node(node), Some(winding)) => {
                        let faces = faces_by_plane
                            .get(&bsp.nodes[node].plane)
                            .map_or(&[][..], Vec::as_slice);
                        match self.match_side(brush, winding, faces)? {
                            FaceMatch::Face(face) => Some(bsp.faces[face].texinfo),
                            FaceMatch::None => None,
                            FaceMatch::Split(pieces) => {
                                brushes.remove(index);
                                brushes.extend(pieces);
                                continue 'brushes;
                            }
                        }
                    }
                    _ => None,
                };

                let side = &mut brushes[index].sides[side_index];
                side.texinfo = best;
                side.flags.insert(SideFlags::TEXTURED);
            }

            index += 1;
        }

        if model == 0 {
            self.log.info(format_args!("{} brushes", brushes.len()));
        }

        Ok(brushes)
    }

    /// Indices of the faces of `model`, grouped by file plane in face order.
    fn faces_by_plane(&self, model: usize) -> FxHashMap<usize, Vec<usize>> {
        let model = &self.bsp.models[model];
        let mut index: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
        for face in model.first_face..model.first_face + model.num_faces {
            index.entry(self.bsp.faces[face].plane).or_default().push(face);
        }
        index
    }

    /// Scans `faces`, all on the plane of the side's node, for the best
    /// texture source of the side.
    fn match_side(&mut self, brush: &Brush, winding: &Winding, faces: &[usize]) -> Result<FaceMatch> {
        let bsp = self.bsp;

        let mut best: Option<(usize, f64)> = None;
        for &face_index in faces {
            let face = &bsp.faces[face_index];
            let area = self.face_on_winding(face, winding)?;
            if area <= MIN_FACE_AREA {
                continue;
            }

            if self.options.brush_optimization == BrushOptimization::BestTextureMatch {
                if let Some((best_face, _)) = best {
                    if bsp.faces[best_face].texinfo != face.texinfo {
                        if let Some(pieces) = self.split_brush_with_face(brush, face)? {
                            return Ok(FaceMatch::Split(pieces));
                        }
                        self.log.debug(format_args!("face {face_index}: no real texture split"));
                        continue;
                    }
                }
            }

            // Earlier faces win ties.
            if best.is_none_or(|(_, best_area)| area > best_area) {
                best = Some((face_index, area));
            }
        }

        Ok(best.map_or(FaceMatch::None, |(face, _)| FaceMatch::Face(face)))
    }

    /// Plane of a face, facing the way the face does.
    fn face_normal(&self, face: &BspFace) -> Vector3<f64> {
        let normal = self.registry.get(self.file_plane(face.plane)).normal();
        if face.side { -normal } else { normal }
    }

    /// Planes through each edge of a face, perpendicular to it and facing
    /// into it. Zero-length edges have no fence.
    fn fence_planes<'f>(
        &'f self,
        face: &'f BspFace,
    ) -> impl Iterator<Item = (Vector3<f64>, f64)> + 'f {
        let normal = self.face_normal(face);
        self.bsp.face_edges(face).filter_map(move |(surfedge, edge)| {
            let (start, end) = if surfedge >= 0 {
                (edge.start, edge.end)
            } else {
                (edge.end, edge.start)
            };
            let v1 = self.bsp.vertices[end].cast::<f64>();
            let v2 = self.bsp.vertices[start].cast::<f64>();

            let fence = (v1 - v2).cross(&normal);
            let length = fence.norm();
            if length == 0.0 {
                return None;
            }
            let fence = fence / length;
            Some((fence, fence.dot(&v1.coords)))
        })
    }

    /// Area of the part of `winding` covered by `face`.
    fn face_on_winding(&self, face: &BspFace, winding: &Winding) -> Result<f64> {
        let mut clipped = winding.clone();
        for (normal, dist) in self.fence_planes(face) {
            match clipped.chop(&normal, dist, FENCE_EPSILON)? {
                Some(w) => clipped = w,
                None => return Ok(0.0),
            }
        }
        Ok(clipped.area())
    }

    /// Cuts `brush` along the fence planes of `face`.
    ///
    /// The piece inside every fence comes first. Returns `None` when the
    /// face does not actually divide the brush.
    fn split_brush_with_face(&mut self, brush: &Brush, face: &BspFace) -> Result<Option<Vec<Brush>>> {
        let fences: Vec<_> = self.fence_planes(face).collect();

        let mut pieces = Vec::new();
        let mut inside = brush.clone();
        for (normal, dist) in fences {
            let plane = self.registry.find_or_create(normal, dist)?;
            let (front, back) = inside.split(
                &self.registry,
                plane,
                SideSource::FaceSplit,
                &SplitParams::FACE,
                self.log,
            )?;

            if let Some(back) = back {
                pieces.insert(0, back);
            }
            match front {
                Some(front) => inside = front,
                None => {
                    self.log.info(format_args!("split_brush_with_face: no new brush"));
                    return Ok(None);
                }
            }
        }

        if pieces.is_empty() {
            return Ok(None);
        }
        pieces.insert(0, inside);
        Ok(Some(pieces))
    }

    /// Makes liquid brushes carry a texture of their own liquid on every side.
    pub(super) fn fix_contents_textures(&self, brushes: &mut [Brush]) {
        for brush in brushes.iter_mut().filter(|b| b.contents.is_liquid()) {
            let matches = |texinfo: usize| texture_contents(self.texture_name(texinfo)) == brush.contents;

            let texinfo = brush
                .sides
                .iter()
                .filter_map(|s| s.texinfo)
                .find(|&t| matches(t))
                .or_else(|| (0..self.bsp.texinfos.len()).find(|&t| matches(t)));

            match texinfo {
                Some(texinfo) => {
                    for side in &mut brush.sides {
                        side.texinfo = Some(texinfo);
                    }
                }
                None => self.log.info(format_args!(
                    "brush contents {:?} with wrong textures",
                    brush.contents
                )),
            }
        }
    }
}
