//! In-memory model of an editable brush map.

use nalgebra::{Point3, Vector3};

use crate::math::parse_vector3;
use crate::texture::TextureProjection;

/// One face of a brush: a plane through three points plus its texture projection.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFace {
    pub texture_name: String,
    pub u_axis: Vector3<f64>,
    pub v_axis: Vector3<f64>,
    pub x_shift: f64,
    pub y_shift: f64,
    /// Rotation in degrees, in `[0, 360)`.
    pub rotation: f64,
    pub x_scale: f64,
    pub y_scale: f64,
    /// Three points on the face plane. The outward normal is
    /// `(v0 - v1) × (v2 - v1)`.
    pub vertices: [Point3<f64>; 3],
}

impl MapFace {
    pub fn new(
        texture_name: impl Into<String>,
        projection: &TextureProjection,
        vertices: [Point3<f64>; 3],
    ) -> Self {
        Self {
            texture_name: texture_name.into(),
            u_axis: projection.u_axis,
            v_axis: projection.v_axis,
            x_shift: projection.x_shift,
            y_shift: projection.y_shift,
            rotation: projection.rotation,
            x_scale: projection.x_scale,
            y_scale: projection.y_scale,
            vertices,
        }
    }

    /// Returns the outward unit normal and distance of the face plane.
    pub fn plane(&self) -> (Vector3<f64>, f64) {
        let [a, b, c] = self.vertices;
        let normal = (a - b).cross(&(c - b)).normalize();
        (normal, normal.dot(&a.coords))
    }
}

/// A convex brush.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Solid {
    pub faces: Vec<MapFace>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapEntity {
    pub class_name: String,
    /// Key/value pairs in file order, `classname` excluded.
    pub properties: Vec<(String, String)>,
    pub solids: Vec<Solid>,
}

impl MapEntity {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Removes a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.properties.iter().position(|(k, _)| k == key)?;
        Some(self.properties.remove(index).1)
    }

    /// The entity's `origin` key, or zero when absent or malformed.
    pub fn origin(&self) -> Vector3<f64> {
        self.get("origin")
            .and_then(parse_vector3)
            .unwrap_or_else(Vector3::zeros)
    }
}

/// A decompiled map: the world entity plus every other entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapFile {
    pub worldspawn: MapEntity,
    pub entities: Vec<MapEntity>,
}

impl MapFile {
    /// Iterates over the world entity followed by all other entities.
    pub fn all_entities(&self) -> impl Iterator<Item = &MapEntity> {
        std::iter::once(&self.worldspawn).chain(self.entities.iter())
    }

    /// Total number of brushes across all entities.
    pub fn brush_count(&self) -> usize {
        self.all_entities().map(|e| e.solids.len()).sum()
    }
}
