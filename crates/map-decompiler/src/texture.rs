//! Texture naming rules and texture projection math.

use nalgebra::{Vector3, Vector4};

use crate::bsp::Contents;

/// Texture applied to origin brushes.
pub const ORIGIN_TEXTURE: &str = "ORIGIN";
/// Texture applied to generated faces that should not render.
pub const NULL_TEXTURE: &str = "NULL";
/// Texture applied to sides that no face covered.
pub const CLIP_TEXTURE: &str = "CLIP";
/// Texture applied to trigger entities.
pub const TRIGGER_TEXTURE: &str = "AAATRIGGER";

/// Derives brush contents from a texture name.
///
/// Sky collapses to solid. Liquids carry a `!` or `*` prefix: `lava` or
/// `slime` right after it decides those, any other `!` texture is water.
pub fn texture_contents(name: &str) -> Contents {
    if starts_with_ignore_case(name, "sky") {
        return Contents::Solid;
    }

    let Some(rest) = name.strip_prefix(['!', '*']) else {
        return Contents::Solid;
    };
    if starts_with_ignore_case(rest, "lava") {
        return Contents::Lava;
    }
    if starts_with_ignore_case(rest, "slime") {
        return Contents::Slime;
    }
    if name.starts_with('!') {
        return Contents::Water;
    }

    Contents::Solid
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// (normal, u, v) for floor, ceiling, west, east, south and north.
const BASE_AXES: [[Vector3<f64>; 3]; 6] = [
    [
        Vector3::new(0.0, 0.0, 1.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, -1.0, 0.0),
    ],
    [
        Vector3::new(0.0, 0.0, -1.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, -1.0, 0.0),
    ],
    [
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.0, 0.0, -1.0),
    ],
    [
        Vector3::new(-1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.0, 0.0, -1.0),
    ],
    [
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 0.0, -1.0),
    ],
    [
        Vector3::new(0.0, -1.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 0.0, -1.0),
    ],
];

/// Returns the world-aligned texture axes for a plane normal.
///
/// The first base axis with the largest positive dot product wins; normals
/// with no positive match fall back to the floor axes.
pub fn texture_axis_from_plane(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let mut best = 0.0;
    let mut best_axis = 0;

    for (i, axes) in BASE_AXES.iter().enumerate() {
        let dot = normal.dot(&axes[0]);
        if dot > best {
            best = dot;
            best_axis = i;
        }
    }

    (BASE_AXES[best_axis][1], BASE_AXES[best_axis][2])
}

/// The positive unit axis closest to a normal's direction.
pub fn closest_axis(normal: &Vector3<f64>) -> Vector3<f64> {
    let abs = normal.abs();
    if abs.x >= abs.y && abs.x >= abs.z {
        Vector3::x()
    } else if abs.y >= abs.z {
        Vector3::y()
    } else {
        Vector3::z()
    }
}

/// Texture axes aligned to the face itself rather than to the world.
pub fn uv_axes_from_normal(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let temp_v = if closest_axis(normal) == Vector3::z() {
        -Vector3::y()
    } else {
        -Vector3::z()
    };

    let u = normal.cross(&temp_v).normalize();
    let v = u.cross(normal).normalize();
    (u, v)
}

/// Texture placement of a map face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureProjection {
    pub u_axis: Vector3<f64>,
    pub v_axis: Vector3<f64>,
    pub x_shift: f64,
    pub y_shift: f64,
    pub rotation: f64,
    pub x_scale: f64,
    pub y_scale: f64,
}

impl TextureProjection {
    /// Face-aligned projection with unit scale and no shift or rotation.
    pub fn face_aligned(normal: &Vector3<f64>) -> Self {
        let (u_axis, v_axis) = uv_axes_from_normal(normal);
        Self {
            u_axis,
            v_axis,
            x_shift: 0.0,
            y_shift: 0.0,
            rotation: 0.0,
            x_scale: 1.0,
            y_scale: 1.0,
        }
    }

    /// Converts a compiled texture vector pair into map texture placement.
    ///
    /// `origin` is the owning entity's origin; geometry is moved back to it,
    /// so the shift is compensated by the origin's projection onto each
    /// texture vector.
    pub fn from_texture_vectors(
        s: &Vector4<f64>,
        t: &Vector4<f64>,
        origin: &Vector3<f64>,
        normal: &Vector3<f64>,
    ) -> Self {
        let (s3, sw) = fix_degenerate(s);
        let (t3, tw) = fix_degenerate(t);

        let (x_axis, y_axis) = texture_axis_from_plane(normal);

        let mut u_axis = s3.normalize();
        let mut v_axis = t3.normalize();

        if normal.dot(&u_axis.cross(&v_axis)).abs() < 0.01 {
            // Stored axes are parallel to the plane's normal.
            (u_axis, v_axis) = uv_axes_from_normal(normal);
        }

        let x_shift = sw - origin.dot(&s3);
        let y_shift = tw - origin.dot(&t3);

        let sv = major_index(&x_axis);
        let tv = major_index(&y_axis);

        let ang1 = axis_angle(&u_axis, sv, tv);
        let ang2 = axis_angle(&x_axis, sv, tv);

        Self {
            u_axis,
            v_axis,
            x_shift,
            y_shift,
            rotation: wrap_degrees(ang2 - ang1),
            x_scale: 1.0 / s3.norm(),
            y_scale: 1.0 / t3.norm(),
        }
    }
}

/// A texture vector too short to normalize becomes unit X with no shift.
fn fix_degenerate(vector: &Vector4<f64>) -> (Vector3<f64>, f64) {
    let xyz = vector.xyz();
    if xyz.norm() < 0.01 {
        (Vector3::x(), 0.0)
    } else {
        (xyz, vector.w)
    }
}

/// Index of the first non-zero component among x and y, else z.
fn major_index(axis: &Vector3<f64>) -> usize {
    if axis.x != 0.0 {
        0
    } else if axis.y != 0.0 {
        1
    } else {
        2
    }
}

fn axis_angle(axis: &Vector3<f64>, sv: usize, tv: usize) -> f64 {
    let angle = if axis[tv] == 0.0 {
        if axis[sv] > 0.0 { 90.0 } else { -90.0 }
    } else {
        axis[sv].atan2(axis[tv]).to_degrees()
    };
    wrap_degrees(angle)
}

fn wrap_degrees(mut angle: f64) -> f64 {
    if angle < 0.0 {
        angle += 360.0;
    }
    if angle >= 360.0 {
        angle -= 360.0;
    }
    angle
}
