//! Turning a model's node tree into convex brushes.

use nalgebra::{Point3, Vector3};

use crate::brush::{Brush, SideSource, SplitParams};
use crate::bsp::{Contents, NodeChild};
use crate::{Error, Result};

use super::TreeDecompiler;

/// How far the starting brush reaches past the head node's bounds.
const HEAD_NODE_PADDING: f64 = 8.0;

impl TreeDecompiler<'_> {
    /// Replays the node tree of `model`, returning one brush per non-empty
    /// leaf region.
    pub(super) fn create_brushes(&mut self, model: usize) -> Result<Vec<Brush>> {
        let bsp = self.bsp;
        let head = bsp.models[model].head_node;
        let NodeChild::Node(head_node) = head else {
            self.log.debug(format_args!("model {model} has no nodes"));
            return Ok(Vec::new());
        };

        let node = &bsp.nodes[head_node];
        let padding = Vector3::repeat(HEAD_NODE_PADDING);
        let mins = Point3::from(node.mins.map(f64::from)) - padding;
        let maxs = Point3::from(node.maxs.map(f64::from)) + padding;

        if model == 0 {
            self.log.info(format_args!(
                "brush size: {:?} to {:?}",
                mins.coords.as_slice(),
                maxs.coords.as_slice()
            ));
        }

        let brush = Brush::from_bounds(
            &mut self.registry,
            &mins,
            &maxs,
            Contents::Solid,
            SideSource::Bounds,
        )?;

        self.create_brushes_recursive(brush, head)
    }

    fn create_brushes_recursive(&mut self, mut brush: Brush, child: NodeChild) -> Result<Vec<Brush>> {
        let node_index = match child {
            NodeChild::Leaf(leaf) => {
                let raw = self.bsp.leaves[leaf].contents;
                brush.contents = match Contents::try_from(raw) {
                    Ok(Contents::Empty) => return Ok(Vec::new()),
                    Ok(Contents::Solid | Contents::Clip | Contents::Sky | Contents::Translucent) => {
                        Contents::Solid
                    }
                    Ok(liquid @ (Contents::Water | Contents::Slime | Contents::Lava)) => liquid,
                    _ => return Err(Error::UnexpectedLeafContents { leaf, contents: raw }),
                };
                return Ok(vec![brush]);
            }
            NodeChild::Node(node_index) => node_index,
        };

        let node = &self.bsp.nodes[node_index];
        let children = node.children;

        // Node planes go through the registry so generated planes snap onto them.
        let file_plane = *self.registry.get(self.file_plane(node.plane));
        let plane = self
            .registry
            .find_or_create(file_plane.normal(), file_plane.dist())?;

        let (front, back) = brush.split(
            &self.registry,
            plane,
            SideSource::Node(node_index),
            &SplitParams::NODE,
            self.log,
        )?;

        let mut brushes = match front {
            Some(front) => self.create_brushes_recursive(front, children[0])?,
            None => Vec::new(),
        };
        if let Some(back) = back {
            brushes.extend(self.create_brushes_recursive(back, children[1])?);
        }

        Ok(brushes)
    }
}
