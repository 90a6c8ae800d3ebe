//! Entity bookkeeping shared by both decompilers.

use nalgebra::{Point3, Vector3};
use regex::RegexSet;

use crate::bsp::Entity;
use crate::map::{MapEntity, MapFace, MapFile, Solid};
use crate::texture::{ORIGIN_TEXTURE, TRIGGER_TEXTURE, TextureProjection};
use crate::{LogSink, Result};

/// Half the edge length of a generated origin brush.
pub const ORIGIN_BRUSH_HALF_SIZE: f64 = 16.0;

const WORLDSPAWN: &str = "worldspawn";

/// An output entity that owns a BSP model and is waiting for its brushes.
#[derive(Debug)]
pub struct DecompiledEntity<'a> {
    /// Position in the entity lump; 0 is the world.
    pub index: usize,
    pub model: usize,
    /// Offset the model's geometry is moved back by.
    pub origin: Vector3<f64>,
    pub entity: &'a mut MapEntity,
}

impl DecompiledEntity<'_> {
    #[inline]
    pub fn is_world(&self) -> bool {
        self.model == 0
    }

    /// Whether an origin brush should be added once the model's brushes exist.
    pub fn wants_origin_brush(&self, always: bool) -> bool {
        self.origin != Vector3::zeros() || (always && !self.is_world())
    }
}

/// Creates the output skeleton: every entity with its key/values, no brushes.
///
/// The first entity becomes the world entity.
pub fn create_map_with_entities(entities: &[Entity]) -> MapFile {
    let copy = |entity: &Entity| MapEntity {
        class_name: entity.class_name.clone(),
        properties: entity
            .properties
            .iter()
            .filter(|(key, _)| key != "classname")
            .cloned()
            .collect(),
        solids: Vec::new(),
    };

    let mut entities = entities.iter();
    let worldspawn = entities.next().map(copy).unwrap_or_default();

    MapFile {
        worldspawn,
        entities: entities.map(copy).collect(),
    }
}

/// Resolves which BSP model an entity owns, removing the `model` key.
///
/// The world owns model 0. Other entities own the model named by a `*N`
/// `model` key; entities without one are point entities. Indices that do not
/// name an existing model are logged and ignored.
pub fn take_model_number(
    log: &dyn LogSink,
    entity: &mut MapEntity,
    index: usize,
    model_count: usize,
) -> Option<usize> {
    let model = if entity.class_name == WORLDSPAWN {
        Some(0)
    } else {
        match entity.get("model") {
            Some(value) if value.starts_with('*') => {
                let number = value[1..].parse::<usize>().ok();
                entity.remove("model");
                number
            }
            _ => return None,
        }
    };

    match model {
        Some(model) if model < model_count => Some(model),
        _ => {
            log.error(format_args!(
                "Entity {index} ({}) has an invalid model index (total {model_count} models)",
                entity.class_name
            ));
            None
        }
    }
}

/// Collects every entity that owns a BSP model, world first.
pub fn brush_entities<'a>(
    map: &'a mut MapFile,
    log: &dyn LogSink,
    model_count: usize,
) -> Vec<DecompiledEntity<'a>> {
    std::iter::once(&mut map.worldspawn)
        .chain(map.entities.iter_mut())
        .enumerate()
        .filter_map(|(index, entity)| {
            let model = take_model_number(log, entity, index, model_count)?;
            Some(DecompiledEntity {
                index,
                model,
                origin: entity.origin(),
                entity,
            })
        })
        .collect()
}

/// A cube of [`ORIGIN_TEXTURE`] centred on `origin`.
pub fn origin_brush(origin: &Vector3<f64>) -> Solid {
    let faces = (0..6)
        .map(|i| {
            let mut normal = Vector3::zeros();
            normal[i % 3] = if i >= 3 { -1.0 } else { 1.0 };

            let projection = TextureProjection::face_aligned(&normal);
            let (u, v) = (projection.u_axis, projection.v_axis);

            let h = ORIGIN_BRUSH_HALF_SIZE;
            let corner = Point3::from(origin + normal * h - u * h - v * h);
            // v × u points along the normal, which fixes the point order.
            let vertices = [corner + v * (2.0 * h), corner, corner + u * (2.0 * h)];

            MapFace::new(ORIGIN_TEXTURE, &projection, vertices)
        })
        .collect();

    Solid { faces }
}

/// Retextures brush entities whose class name matches a wildcard as triggers.
///
/// Wildcards use `*` and `?` and match the whole class name, ignoring case.
/// Origin brush faces keep their texture.
pub fn apply_trigger_textures(map: &mut MapFile, wildcards: &[String], log: &dyn LogSink) -> Result<()> {
    if wildcards.is_empty() {
        return Ok(());
    }

    let patterns = RegexSet::new(wildcards.iter().map(|w| wildcard_to_regex(w)))?;

    let mut count = 0;
    for entity in map
        .entities
        .iter_mut()
        .filter(|e| !e.solids.is_empty() && patterns.is_match(&e.class_name))
    {
        for face in entity.solids.iter_mut().flat_map(|s| s.faces.iter_mut()) {
            if face.texture_name != ORIGIN_TEXTURE {
                face.texture_name = TRIGGER_TEXTURE.to_string();
            }
        }
        count += 1;
    }

    if count > 0 {
        log.info(format_args!("{count} trigger entities retextured"));
    }

    Ok(())
}

fn wildcard_to_regex(wildcard: &str) -> String {
    let mut pattern = String::with_capacity(wildcard.len() + 8);
    pattern.push_str("(?i)^");
    for c in wildcard.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            c => pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    pattern.push('$');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Transcript;
    use log::Level;

    fn make_entities() -> Vec<Entity> {
        vec![
            Entity::new("worldspawn")
                .with_property("classname", "worldspawn")
                .with_property("wad", "halflife.wad"),
            Entity::new("func_door")
                .with_property("model", "*1")
                .with_property("origin", "0 0 32"),
            Entity::new("info_player_start").with_property("origin", "0 0 0"),
            Entity::new("func_wall").with_property("model", "*7"),
        ]
    }

    #[test]
    fn skeleton_copies_key_values_without_classname() {
        let map = create_map_with_entities(&make_entities());

        assert_eq!(
            map.worldspawn.properties,
            vec![("wad".to_string(), "halflife.wad".to_string())]
        );
        assert_eq!(map.entities.len(), 3);
        assert_eq!(map.entities[0].class_name, "func_door");
        assert!(map.brush_count() == 0);
    }

    #[test]
    fn model_numbers_are_resolved_and_removed() {
        let mut map = create_map_with_entities(&make_entities());
        let log = Transcript::new();

        let targets = brush_entities(&mut map, &log, 2);
        let found: Vec<_> = targets.iter().map(|t| (t.index, t.model)).collect();
        assert_eq!(found, vec![(0, 0), (1, 1)]);
        assert_eq!(targets[1].origin, Vector3::new(0.0, 0.0, 32.0));
        assert!(targets[1].wants_origin_brush(false));
        assert!(!targets[0].wants_origin_brush(true));
        drop(targets);

        assert_eq!(map.entities[0].get("model"), None);
        assert!(log.contains(Level::Error, "Entity 3 (func_wall)"));
    }

    #[test]
    fn unparsable_model_is_rejected() {
        let log = Transcript::new();
        let mut entity = MapEntity {
            class_name: "func_wall".into(),
            properties: vec![("model".into(), "*x".into())],
            solids: Vec::new(),
        };

        assert_eq!(take_model_number(&log, &mut entity, 4, 10), None);
        assert!(log.contains(Level::Error, "invalid model index"));
    }

    #[test]
    fn origin_brush_is_a_closed_cube() {
        let origin = Vector3::new(64.0, -32.0, 8.0);
        let brush = origin_brush(&origin);

        assert_eq!(brush.faces.len(), 6);
        for face in &brush.faces {
            let (normal, dist) = face.plane();
            let expected = normal.dot(&origin) + ORIGIN_BRUSH_HALF_SIZE;
            assert!((dist - expected).abs() < 1e-9, "face {normal:?} at {dist}");
            assert_eq!(face.texture_name, ORIGIN_TEXTURE);
        }
    }

    #[test]
    fn wildcards_match_whole_name_ignoring_case() {
        let set = RegexSet::new([wildcard_to_regex("trigger_*"), wildcard_to_regex("func_?all")]).unwrap();

        assert!(set.is_match("TRIGGER_once"));
        assert!(set.is_match("func_wall"));
        assert!(!set.is_match("func_walls"));
        assert!(!set.is_match("my_trigger_once"));
    }

    #[test]
    fn triggers_get_trigger_texture() {
        let log = Transcript::new();
        let mut map = create_map_with_entities(&[
            Entity::new("worldspawn"),
            Entity::new("trigger_multiple"),
            Entity::new("func_wall"),
        ]);
        for entity in &mut map.entities {
            let mut brush = origin_brush(&Vector3::zeros());
            brush.faces[0].texture_name = "brick".into();
            entity.solids.push(brush);
        }

        apply_trigger_textures(&mut map, &["trigger_*".to_string()], &log).unwrap();

        assert_eq!(map.entities[0].solids[0].faces[0].texture_name, TRIGGER_TEXTURE);
        assert_eq!(map.entities[0].solids[0].faces[1].texture_name, ORIGIN_TEXTURE);
        assert_eq!(map.entities[1].solids[0].faces[0].texture_name, "brick");
        assert!(log.contains(Level::Info, "1 trigger entities"));
    }
}
