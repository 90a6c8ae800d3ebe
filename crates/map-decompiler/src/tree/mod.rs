//! Decompilation by replaying a model's node tree.
//!
//! Every model starts as one box brush around its head node. The box is cut
//! by each node plane on the way down the tree, and the pieces that end in
//! non-empty leaves become brushes. Those brushes are then textured from the
//! faces lying on their sides, optionally merged, and emitted with bevels
//! and origin compensation.
//!
//! # Stages
//!
//! - [`split`]: node tree walk producing untextured brushes
//! - [`texturing`]: face matching, texture-driven splits and liquid fixes
//! - [`merge`]: fixed-point pairwise brush merging
//! - [`emit`]: bevels, origin handling and conversion to map faces

mod emit;
mod merge;
mod split;
mod texturing;

use crate::bsp::BspFile;
use crate::cancel::CancellationToken;
use crate::entity::{
    DecompiledEntity, apply_trigger_textures, brush_entities, create_map_with_entities, origin_brush,
};
use crate::map::MapFile;
use crate::options::DecompilerOptions;
use crate::registry::PlaneRegistry;
use crate::{LogSink, Result};

/// Decompiles every brush model of `bsp` by replaying its node tree.
///
/// The level must already have passed [`BspFile::validate`].
pub fn decompile(
    log: &dyn LogSink,
    bsp: &BspFile,
    options: &DecompilerOptions,
    cancel: &CancellationToken,
) -> Result<MapFile> {
    options.log_summary(log);

    let mut decompiler = TreeDecompiler::new(log, bsp, options, cancel);
    let mut map = create_map_with_entities(&bsp.entities);

    for mut target in brush_entities(&mut map, log, bsp.models.len()) {
        cancel.check()?;
        decompiler.decompile_model(&mut target)?;
    }

    cancel.check()?;

    log.info(format_args!("{} map brushes", decompiler.map_brushes));
    log.info(format_args!("{} clip brushes", decompiler.clip_brushes));

    apply_trigger_textures(&mut map, &options.trigger_entity_wildcards, log)?;

    Ok(map)
}

/// State of one tree decompilation job.
///
/// The level is only read; planes generated while splitting and bevelling
/// go to the job's own registry.
pub(crate) struct TreeDecompiler<'a> {
    log: &'a dyn LogSink,
    bsp: &'a BspFile,
    options: &'a DecompilerOptions,
    cancel: &'a CancellationToken,

    registry: PlaneRegistry,
    /// Registry index of each file plane.
    plane_remap: Vec<usize>,

    map_brushes: usize,
    clip_brushes: usize,
}

impl<'a> TreeDecompiler<'a> {
    pub(crate) fn new(
        log: &'a dyn LogSink,
        bsp: &'a BspFile,
        options: &'a DecompilerOptions,
        cancel: &'a CancellationToken,
    ) -> Self {
        let (registry, plane_remap) = PlaneRegistry::from_bsp_planes(&bsp.planes);

        Self {
            log,
            bsp,
            options,
            cancel,
            registry,
            plane_remap,
            map_brushes: 0,
            clip_brushes: 0,
        }
    }

    /// Registry index of a plane from the level's plane lump.
    #[inline]
    fn file_plane(&self, index: usize) -> usize {
        self.plane_remap[index]
    }

    fn texture_name(&self, texinfo: usize) -> &'a str {
        self.bsp.texture_name(texinfo)
    }

    /// Runs every stage for one model and attaches the result to its entity.
    pub(crate) fn decompile_model(&mut self, target: &mut DecompiledEntity<'_>) -> Result<()> {
        let model = target.model;

        let brushes = self.create_brushes(model)?;
        let mut brushes = self.texture_brushes(brushes, model)?;
        self.fix_contents_textures(&mut brushes);

        if self.options.merge_brushes {
            brushes = self.merge_brushes(brushes, model)?;
        }

        self.cancel.check()?;

        if target.is_world() {
            self.log.info(format_args!("converting brushes to map brushes"));
        }

        let origin = target.origin;
        let mut solids = Vec::with_capacity(brushes.len());
        for brush in &mut brushes {
            if let Some(solid) = self.emit_brush(brush, target.index, &origin)? {
                solids.push(solid);
            }
            self.cancel.check()?;
        }

        if !brushes.is_empty()
            && target.wants_origin_brush(self.options.always_generate_origin_brushes)
        {
            solids.push(origin_brush(&origin));
            self.map_brushes += 1;
        }

        if target.is_world() {
            self.log.info(format_args!("{} brushes", brushes.len()));
        }

        target.entity.solids.extend(solids);
        Ok(())
    }
}
