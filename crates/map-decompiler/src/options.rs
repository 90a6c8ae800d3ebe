//! Per-job decompiler configuration.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, LogSink};

/// How the Tree decompiler trades brush count against texture fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BrushOptimization {
    /// Split brush sides so each piece carries the texture of the face it
    /// overlaps most.
    #[default]
    BestTextureMatch,
    /// Never split for texturing; each side takes the largest overlapping face.
    FewestBrushes,
}

impl BrushOptimization {
    pub const ALL: [BrushOptimization; 2] = [Self::BestTextureMatch, Self::FewestBrushes];

    pub fn name(self) -> &'static str {
        match self {
            Self::BestTextureMatch => "BestTextureMatch",
            Self::FewestBrushes => "FewestBrushes",
        }
    }
}

impl fmt::Display for BrushOptimization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BrushOptimization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|o| o.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownBrushOptimization(s.to_string()))
    }
}

/// Immutable options for one decompilation job.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecompilerOptions {
    /// Merge adjacent convex brushes after reconstruction.
    pub merge_brushes: bool,
    /// Keep water, slime and lava brushes.
    pub include_liquids: bool,
    pub brush_optimization: BrushOptimization,
    /// Use `NULL` on the back and side faces generated by extrusion.
    pub apply_null_to_generated_faces: bool,
    /// Emit an origin brush for every brush entity, not only rotated ones.
    pub always_generate_origin_brushes: bool,
    /// Class name patterns (`*` and `?`) of entities textured as triggers.
    pub trigger_entity_wildcards: Vec<String>,
}

impl DecompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_merge_brushes(mut self, merge: bool) -> Self {
        self.merge_brushes = merge;
        self
    }

    pub fn with_include_liquids(mut self, include: bool) -> Self {
        self.include_liquids = include;
        self
    }

    pub fn with_brush_optimization(mut self, optimization: BrushOptimization) -> Self {
        self.brush_optimization = optimization;
        self
    }

    pub fn with_apply_null_to_generated_faces(mut self, apply: bool) -> Self {
        self.apply_null_to_generated_faces = apply;
        self
    }

    pub fn with_always_generate_origin_brushes(mut self, always: bool) -> Self {
        self.always_generate_origin_brushes = always;
        self
    }

    pub fn with_trigger_entity_wildcards<I, S>(mut self, wildcards: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trigger_entity_wildcards = wildcards.into_iter().map(Into::into).collect();
        self
    }

    /// Logs the options that change the generated geometry.
    pub fn log_summary(&self, log: &dyn LogSink) {
        if self.merge_brushes {
            log.info(format_args!("Merging brushes"));
        } else {
            log.info(format_args!("Not merging brushes"));
        }

        match self.brush_optimization {
            BrushOptimization::BestTextureMatch => {
                log.info(format_args!("Optimizing for texture placement"))
            }
            BrushOptimization::FewestBrushes => {
                log.info(format_args!("Optimizing for fewest brushes"))
            }
        }

        if !self.include_liquids {
            log.info(format_args!(
                "Excluding brushes with liquid content types (water, slime, lava)"
            ));
        }

        if self.always_generate_origin_brushes {
            log.info(format_args!("Generating origin brushes for all brush entities"));
        }
    }
}
