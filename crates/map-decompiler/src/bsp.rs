//! In-memory model of a compiled GoldSource level.
//!
//! Reading and writing the binary format is left to the caller; this module
//! only describes the lumps the decompilers consume and checks that they
//! reference each other consistently.

use nalgebra::{Point3, Vector3, Vector4};

use crate::plane::{Plane, PlaneType};
use crate::{Error, Result};

/// The only level version the decompilers accept.
pub const BSP_VERSION: i32 = 30;

/// Leaf and brush contents, with their on-disk codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Contents {
    Empty = -1,
    Solid = -2,
    Water = -3,
    Slime = -4,
    Lava = -5,
    Sky = -6,
    Origin = -7,
    Clip = -8,
    Current0 = -9,
    Current90 = -10,
    Current180 = -11,
    Current270 = -12,
    CurrentUp = -13,
    CurrentDown = -14,
    Translucent = -15,
}

impl Contents {
    #[inline]
    pub fn is_liquid(self) -> bool {
        matches!(self, Self::Water | Self::Slime | Self::Lava)
    }
}

impl TryFrom<i32> for Contents {
    type Error = i32;

    fn try_from(raw: i32) -> std::result::Result<Self, i32> {
        Ok(match raw {
            -1 => Self::Empty,
            -2 => Self::Solid,
            -3 => Self::Water,
            -4 => Self::Slime,
            -5 => Self::Lava,
            -6 => Self::Sky,
            -7 => Self::Origin,
            -8 => Self::Clip,
            -9 => Self::Current0,
            -10 => Self::Current90,
            -11 => Self::Current180,
            -12 => Self::Current270,
            -13 => Self::CurrentUp,
            -14 => Self::CurrentDown,
            -15 => Self::Translucent,
            other => return Err(other),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BspPlane {
    pub normal: Vector3<f32>,
    pub distance: f32,
    pub kind: PlaneType,
}

impl BspPlane {
    pub fn to_plane(&self) -> Plane {
        Plane::with_type(self.normal.cast(), f64::from(self.distance), self.kind)
    }
}

/// A child slot of a node: another node or a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeChild {
    Node(usize),
    Leaf(usize),
}

impl NodeChild {
    /// Decodes the on-disk convention where leaf `l` is stored as `-(l + 1)`.
    ///
    /// Level readers use this to fill [`BspNode::children`] and
    /// [`BspModel::head_node`].
    pub fn from_raw(raw: i32) -> Self {
        if raw >= 0 {
            Self::Node(raw as usize)
        } else {
            Self::Leaf((-(raw + 1)) as usize)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BspNode {
    pub plane: usize,
    /// Front child first, back child second.
    pub children: [NodeChild; 2],
    pub mins: [i16; 3],
    pub maxs: [i16; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BspLeaf {
    /// Raw contents code; see [`Contents`].
    pub contents: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BspFace {
    pub plane: usize,
    /// `true` if the face points against its plane's normal.
    pub side: bool,
    pub first_edge: usize,
    pub num_edges: usize,
    pub texinfo: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BspEdge {
    pub start: usize,
    pub end: usize,
}

/// Texture projection: `u = s.xyz · p + s.w`, `v = t.xyz · p + t.w`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureInfo {
    pub s: Vector4<f32>,
    pub t: Vector4<f32>,
    pub miptex: usize,
    pub flags: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipTexture {
    pub name: String,
    /// Embedded pixel data, absent for textures that live in a WAD.
    pub mip_data: Option<Vec<u8>>,
}

impl MipTexture {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mip_data: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BspModel {
    /// Root of the visible hull.
    pub head_node: NodeChild,
    pub first_face: usize,
    pub num_faces: usize,
}

/// An entity as stored in the entity lump.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entity {
    pub class_name: String,
    /// Key/value pairs in file order, `classname` excluded.
    pub properties: Vec<(String, String)>,
}

impl Entity {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A compiled level.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BspFile {
    pub version: i32,
    pub planes: Vec<BspPlane>,
    pub nodes: Vec<BspNode>,
    pub leaves: Vec<BspLeaf>,
    pub faces: Vec<BspFace>,
    pub surfedges: Vec<i32>,
    pub edges: Vec<BspEdge>,
    pub vertices: Vec<Point3<f32>>,
    pub texinfos: Vec<TextureInfo>,
    pub textures: Vec<MipTexture>,
    pub models: Vec<BspModel>,
    pub entities: Vec<Entity>,
}

impl BspFile {
    /// Iterates over a face's vertex loop.
    ///
    /// A positive surfedge walks its edge from start to end, a negative one
    /// from end to start.
    pub fn face_points<'a>(&'a self, face: &BspFace) -> impl Iterator<Item = Point3<f64>> + 'a {
        self.surfedges[face.first_edge..face.first_edge + face.num_edges]
            .iter()
            .map(move |&surfedge| {
                let edge = &self.edges[surfedge.unsigned_abs() as usize];
                let vertex = if surfedge >= 0 { edge.start } else { edge.end };
                self.vertices[vertex].cast()
            })
    }

    /// Iterates over a face's edges as `(surfedge, edge)`.
    pub fn face_edges<'a>(&'a self, face: &BspFace) -> impl Iterator<Item = (i32, &'a BspEdge)> + 'a {
        self.surfedges[face.first_edge..face.first_edge + face.num_edges]
            .iter()
            .map(move |&surfedge| (surfedge, &self.edges[surfedge.unsigned_abs() as usize]))
    }

    /// Name of the texture used by a texture info.
    pub fn texture_name(&self, texinfo: usize) -> &str {
        &self.textures[self.texinfos[texinfo].miptex].name
    }

    /// Checks every cross-lump reference.
    ///
    /// The decompilers index lumps directly once this has passed.
    pub fn validate(&self) -> Result<()> {
        fn check(lump: &'static str, index: usize, value: usize, len: usize) -> Result<()> {
            if value < len {
                Ok(())
            } else {
                Err(Error::InvalidReference {
                    lump,
                    index,
                    value: value as i64,
                })
            }
        }

        let check_child = |index: usize, child: NodeChild| match child {
            NodeChild::Node(node) => check("node", index, node, self.nodes.len()),
            NodeChild::Leaf(leaf) => check("node", index, leaf, self.leaves.len()),
        };

        for (i, node) in self.nodes.iter().enumerate() {
            check("node", i, node.plane, self.planes.len())?;
            for child in node.children {
                check_child(i, child)?;
            }
        }

        for (i, face) in self.faces.iter().enumerate() {
            check("face", i, face.plane, self.planes.len())?;
            check("face", i, face.texinfo, self.texinfos.len())?;
            if face.first_edge + face.num_edges > self.surfedges.len() {
                return Err(Error::InvalidReference {
                    lump: "face",
                    index: i,
                    value: (face.first_edge + face.num_edges) as i64,
                });
            }
        }

        for (i, &surfedge) in self.surfedges.iter().enumerate() {
            if surfedge.unsigned_abs() as usize >= self.edges.len() {
                return Err(Error::InvalidReference {
                    lump: "surfedge",
                    index: i,
                    value: i64::from(surfedge),
                });
            }
        }

        for (i, edge) in self.edges.iter().enumerate() {
            check("edge", i, edge.start, self.vertices.len())?;
            check("edge", i, edge.end, self.vertices.len())?;
        }

        for (i, texinfo) in self.texinfos.iter().enumerate() {
            check("texinfo", i, texinfo.miptex, self.textures.len())?;
        }

        for (i, model) in self.models.iter().enumerate() {
            check_child(i, model.head_node).map_err(|_| Error::InvalidReference {
                lump: "model",
                index: i,
                value: match model.head_node {
                    NodeChild::Node(n) | NodeChild::Leaf(n) => n as i64,
                },
            })?;
            if model.first_face + model.num_faces > self.faces.len() {
                return Err(Error::InvalidReference {
                    lump: "model",
                    index: i,
                    value: (model.first_face + model.num_faces) as i64,
                });
            }
            if let NodeChild::Node(head) = model.head_node {
                self.check_node_tree(head)?;
            }
        }

        Ok(())
    }

    /// Walks the nodes under `head`, rejecting any node reached twice.
    ///
    /// Child indices must already be in range.
    fn check_node_tree(&self, head: usize) -> Result<()> {
        let mut visited = vec![false; self.nodes.len()];
        visited[head] = true;
        let mut stack = vec![head];

        while let Some(index) = stack.pop() {
            for child in self.nodes[index].children {
                let NodeChild::Node(node) = child else {
                    continue;
                };
                if visited[node] {
                    return Err(Error::InvalidReference {
                        lump: "node",
                        index,
                        value: node as i64,
                    });
                }
                visited[node] = true;
                stack.push(node);
            }
        }

        Ok(())
    }
}
