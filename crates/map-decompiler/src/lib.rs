//! Reconstructs editable brush maps from compiled GoldSource levels.
//!
//! A compiled level keeps its geometry as a BSP tree of convex leaves plus
//! the visible faces, but not the brushes it was built from. Two strategies
//! recover brushes from that data:
//!
//! - [`DecompilerStrategy::Tree`] replays each model's node tree, turning
//!   every non-empty leaf into a convex brush that is then textured from the
//!   faces lying on it.
//! - [`DecompilerStrategy::FaceToBrush`] merges coplanar faces and extrudes
//!   each one into a thin brush.
//!
//! Both read an in-memory [`BspFile`] and produce an in-memory [`MapFile`].
//! Progress and warnings go through a caller-supplied [`LogSink`], and a job
//! can be stopped at its checkpoints with a [`CancellationToken`].

pub mod brush;
pub mod bsp;
mod cancel;
pub mod entity;
mod error;
mod face_to_brush;
pub mod map;
pub mod math;
mod options;
pub mod plane;
pub mod registry;
mod sink;
mod strategy;
pub mod texture;
mod tree;
pub mod winding;

#[cfg(test)]
mod test_util;

pub use bsp::{
    BSP_VERSION, BspEdge, BspFace, BspFile, BspLeaf, BspModel, BspNode, BspPlane, Contents, Entity,
    MipTexture, NodeChild, TextureInfo,
};
pub use cancel::CancellationToken;
pub use error::{Error, Result};
pub use map::{MapEntity, MapFace, MapFile, Solid};
pub use options::{BrushOptimization, DecompilerOptions};
pub use sink::{LogForwarder, LogSink, Transcript};
pub use strategy::{DecompilerStrategy, Outcome};
