//! Hand-built levels shared by the unit tests.

use nalgebra::{Point3, Vector3, Vector4};

use crate::bsp::{
    BSP_VERSION, BspEdge, BspFace, BspFile, BspLeaf, BspModel, BspNode, BspPlane, Contents, Entity,
    MipTexture, NodeChild, TextureInfo,
};
use crate::plane::PlaneType;
use crate::texture::texture_axis_from_plane;

const EMPTY: NodeChild = NodeChild::Leaf(0);

/// Incrementally assembles a [`BspFile`].
pub struct LevelBuilder {
    bsp: BspFile,
}

impl LevelBuilder {
    /// An empty level with one texture, one texinfo per axis and a world entity.
    pub fn new(texture: &str) -> Self {
        let mut builder = Self {
            bsp: BspFile {
                version: BSP_VERSION,
                leaves: vec![BspLeaf {
                    contents: Contents::Empty as i32,
                }],
                // Edge 0 is never referenced by a surfedge.
                edges: vec![BspEdge { start: 0, end: 0 }],
                vertices: vec![Point3::origin()],
                entities: vec![Entity::new("worldspawn").with_property("wad", "test.wad")],
                ..Default::default()
            },
        };
        let miptex = builder.texture(texture);
        for axis in 0..3 {
            builder.texinfo(axis, miptex);
        }
        builder
    }

    pub fn texture(&mut self, name: &str) -> usize {
        self.bsp.textures.push(MipTexture::named(name));
        self.bsp.textures.len() - 1
    }

    /// World-aligned texinfo for faces facing along `axis`.
    pub fn texinfo(&mut self, axis: usize, miptex: usize) -> usize {
        let mut normal = Vector3::zeros();
        normal[axis] = 1.0;
        let (u, v) = texture_axis_from_plane(&normal);
        self.bsp.texinfos.push(TextureInfo {
            s: Vector4::new(u.x as f32, u.y as f32, u.z as f32, 0.0),
            t: Vector4::new(v.x as f32, v.y as f32, v.z as f32, 0.0),
            miptex,
            flags: 0,
        });
        self.bsp.texinfos.len() - 1
    }

    /// Returns the plane `p[axis] = dist`, facing up the axis, adding it if
    /// the level does not have it yet.
    pub fn plane(&mut self, axis: usize, dist: f32) -> usize {
        let mut normal = Vector3::zeros();
        normal[axis] = 1.0;
        if let Some(existing) = self
            .bsp
            .planes
            .iter()
            .position(|p| p.normal == normal && p.distance == dist)
        {
            return existing;
        }

        let kind = [PlaneType::X, PlaneType::Y, PlaneType::Z][axis];
        self.bsp.planes.push(BspPlane {
            normal,
            distance: dist,
            kind,
        });
        self.bsp.planes.len() - 1
    }

    pub fn leaf(&mut self, contents: Contents) -> NodeChild {
        self.bsp.leaves.push(BspLeaf {
            contents: contents as i32,
        });
        NodeChild::Leaf(self.bsp.leaves.len() - 1)
    }

    pub fn node(&mut self, plane: usize, front: NodeChild, back: NodeChild) -> NodeChild {
        self.bsp.nodes.push(BspNode {
            plane,
            children: [front, back],
            mins: [0; 3],
            maxs: [0; 3],
        });
        NodeChild::Node(self.bsp.nodes.len() - 1)
    }

    /// Adds nodes that put the box `mins..maxs` in `inside` and everything
    /// else in the empty leaf, returning the root.
    pub fn box_nodes(&mut self, mins: [f32; 3], maxs: [f32; 3], inside: NodeChild) -> NodeChild {
        let mut child = inside;
        for axis in (0..3).rev() {
            let low = self.plane(axis, mins[axis]);
            child = self.node(low, child, EMPTY);
            let high = self.plane(axis, maxs[axis]);
            child = self.node(high, EMPTY, child);
        }
        child
    }

    /// Adds a face with the given corners, in any rotational order.
    ///
    /// The loop is stored clockwise as seen from the side it faces.
    pub fn face(&mut self, plane: usize, side: bool, texinfo: usize, corners: &[[f32; 3]]) -> usize {
        let mut points: Vec<Point3<f32>> = corners.iter().copied().map(Point3::from).collect();

        let mut outward = self.bsp.planes[plane].normal;
        if side {
            outward = -outward;
        }
        if (points[2] - points[0]).cross(&(points[1] - points[0])).dot(&outward) < 0.0 {
            points.reverse();
        }

        let first_edge = self.bsp.surfedges.len();
        let first_vertex = self.bsp.vertices.len();
        self.bsp.vertices.extend(points.iter().copied());
        for i in 0..points.len() {
            let edge = self.bsp.edges.len();
            self.bsp.edges.push(BspEdge {
                start: first_vertex + i,
                end: first_vertex + (i + 1) % points.len(),
            });
            self.bsp.surfedges.push(edge as i32);
        }

        self.bsp.faces.push(BspFace {
            plane,
            side,
            first_edge,
            num_edges: points.len(),
            texinfo,
        });
        self.bsp.faces.len() - 1
    }

    /// Adds the six outward faces of a box, one texinfo per axis.
    ///
    /// `skip` leaves out the face at `(axis, high)`.
    pub fn box_faces(&mut self, mins: [f32; 3], maxs: [f32; 3], skip: Option<(usize, bool)>) {
        for axis in 0..3 {
            for high in [false, true] {
                if skip == Some((axis, high)) {
                    continue;
                }
                let dist = if high { maxs[axis] } else { mins[axis] };
                let plane = self.plane(axis, dist);
                let corners = rectangle(axis, dist, mins, maxs);
                self.face(plane, !high, axis, &corners);
            }
        }
    }

    /// Sets the single world model and the head node bounds.
    pub fn finish(mut self, head: NodeChild, mins: [i16; 3], maxs: [i16; 3]) -> BspFile {
        if let NodeChild::Node(node) = head {
            self.bsp.nodes[node].mins = mins;
            self.bsp.nodes[node].maxs = maxs;
        }
        self.bsp.models.push(BspModel {
            head_node: head,
            first_face: 0,
            num_faces: self.bsp.faces.len(),
        });
        self.bsp
    }
}

/// Corners of the face of `mins..maxs` lying on `p[axis] = dist`.
pub fn rectangle(axis: usize, dist: f32, mins: [f32; 3], maxs: [f32; 3]) -> [[f32; 3]; 4] {
    let (a, b) = ((axis + 1) % 3, (axis + 2) % 3);
    let corner = |ua: f32, ub: f32| {
        let mut p = [0.0; 3];
        p[axis] = dist;
        p[a] = ua;
        p[b] = ub;
        p
    };
    [
        corner(mins[a], mins[b]),
        corner(maxs[a], mins[b]),
        corner(maxs[a], maxs[b]),
        corner(mins[a], maxs[b]),
    ]
}

/// A 64-unit cube at the origin filled with `contents`, every face using
/// `texture`.
pub fn box_level(contents: Contents, texture: &str) -> BspFile {
    let mut builder = LevelBuilder::new(texture);
    let inside = builder.leaf(contents);
    let head = builder.box_nodes([0.0; 3], [64.0; 3], inside);
    builder.box_faces([0.0; 3], [64.0; 3], None);
    builder.finish(head, [0; 3], [64; 3])
}

/// Two solid 64-unit cubes side by side along x, in separate leaves.
pub fn two_box_level() -> BspFile {
    let mut builder = LevelBuilder::new("brick");
    let left = builder.leaf(Contents::Solid);
    let right = builder.leaf(Contents::Solid);
    let middle = builder.plane(0, 64.0);
    let split = builder.node(middle, right, left);
    let head = builder.box_nodes([0.0; 3], [128.0, 64.0, 64.0], split);
    builder.box_faces([0.0; 3], [128.0, 64.0, 64.0], None);
    builder.finish(head, [0; 3], [128, 64, 64])
}

/// A solid cube whose top is covered by two faces with different textures,
/// split at `x = 32`.
pub fn split_face_level() -> BspFile {
    let mut builder = LevelBuilder::new("brick");
    let inside = builder.leaf(Contents::Solid);
    let head = builder.box_nodes([0.0; 3], [64.0; 3], inside);
    builder.box_faces([0.0; 3], [64.0; 3], Some((2, true)));

    let top = builder.plane(2, 64.0);
    let tile = builder.texture("tile");
    let tile_info = builder.texinfo(2, tile);
    builder.face(top, false, 2, &rectangle(2, 64.0, [0.0; 3], [32.0, 64.0, 64.0]));
    builder.face(top, false, tile_info, &rectangle(2, 64.0, [32.0, 0.0, 0.0], [64.0; 3]));

    builder.finish(head, [0; 3], [64; 3])
}

/// Two coplanar floor tiles sharing an edge, with no node tree.
pub fn two_tile_level() -> BspFile {
    let mut builder = LevelBuilder::new("floor");
    let floor = builder.plane(2, 0.0);
    builder.face(floor, false, 2, &rectangle(2, 0.0, [0.0; 3], [64.0, 64.0, 0.0]));
    builder.face(floor, false, 2, &rectangle(2, 0.0, [64.0, 0.0, 0.0], [128.0, 64.0, 0.0]));
    builder.finish(EMPTY, [0; 3], [0; 3])
}
