//! Selecting and running a decompilation strategy.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bsp::{BSP_VERSION, BspFile};
use crate::cancel::CancellationToken;
use crate::map::MapFile;
use crate::options::DecompilerOptions;
use crate::{Error, LogSink, Result, face_to_brush, tree};

/// The available decompilation algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DecompilerStrategy {
    /// Rebuilds solid brushes from the node tree.
    #[default]
    Tree,
    /// Extrudes each visible face into a thin brush.
    FaceToBrush,
}

/// How a decompilation job ended.
#[derive(Debug)]
pub enum Outcome {
    Done(MapFile),
    Canceled,
    Failed(Error),
}

impl DecompilerStrategy {
    pub const ALL: [DecompilerStrategy; 2] = [Self::Tree, Self::FaceToBrush];

    pub fn name(self) -> &'static str {
        match self {
            Self::Tree => "Tree",
            Self::FaceToBrush => "FaceToBrush",
        }
    }

    /// Decompiles `bsp` into a map.
    ///
    /// Fails before doing any work if the level has the wrong version, has
    /// no entities, or contains a dangling index.
    pub fn decompile(
        self,
        log: &dyn LogSink,
        bsp: &BspFile,
        options: &DecompilerOptions,
        cancel: &CancellationToken,
    ) -> Result<MapFile> {
        if bsp.version != BSP_VERSION {
            return Err(Error::UnsupportedVersion(bsp.version));
        }
        if bsp.entities.is_empty() {
            return Err(Error::NoEntities);
        }
        bsp.validate()?;
        cancel.check()?;

        log.info(format_args!("Decompiling with the {self} strategy"));

        match self {
            Self::Tree => tree::decompile(log, bsp, options, cancel),
            Self::FaceToBrush => face_to_brush::decompile(log, bsp, options, cancel),
        }
    }

    /// Runs [`decompile`](Self::decompile), folding cancellation and errors
    /// into an [`Outcome`].
    pub fn run(
        self,
        log: &dyn LogSink,
        bsp: &BspFile,
        options: &DecompilerOptions,
        cancel: &CancellationToken,
    ) -> Outcome {
        match self.decompile(log, bsp, options, cancel) {
            Ok(map) => Outcome::Done(map),
            Err(err) if err.is_canceled() => {
                log.info(format_args!("Decompilation cancelled"));
                Outcome::Canceled
            }
            Err(err) => {
                log.error(format_args!("Error while decompiling: {err}"));
                Outcome::Failed(err)
            }
        }
    }
}

impl fmt::Display for DecompilerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DecompilerStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownStrategy(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::Contents;
    use crate::test_util::{box_level, two_tile_level};
    use crate::Transcript;

    #[test]
    fn names_parse_case_insensitively() {
        for strategy in DecompilerStrategy::ALL {
            assert_eq!(strategy.name().parse::<DecompilerStrategy>().unwrap(), strategy);
            assert_eq!(strategy.to_string().to_lowercase().parse::<DecompilerStrategy>().unwrap(), strategy);
        }
        assert_eq!("FACETOBRUSH".parse::<DecompilerStrategy>().unwrap(), DecompilerStrategy::FaceToBrush);

        let err = "quake".parse::<DecompilerStrategy>().unwrap_err();
        assert!(matches!(err, Error::UnknownStrategy(ref name) if name == "quake"));
    }

    #[test]
    fn wrong_version_fails_fast() {
        let mut bsp = box_level(Contents::Solid, "crate01");
        bsp.version = 29;
        let log = Transcript::new();

        for strategy in DecompilerStrategy::ALL {
            let outcome = strategy.run(&log, &bsp, &DecompilerOptions::default(), &CancellationToken::new());
            assert!(matches!(outcome, Outcome::Failed(Error::UnsupportedVersion(29))));
        }
        assert!(log.contains(log::Level::Error, "BSP version 29"));
    }

    #[test]
    fn missing_entities_fail_fast() {
        let mut bsp = box_level(Contents::Solid, "crate01");
        bsp.entities.clear();
        let log = Transcript::new();

        let outcome = DecompilerStrategy::Tree.run(&log, &bsp, &DecompilerOptions::default(), &CancellationToken::new());
        assert!(matches!(outcome, Outcome::Failed(Error::NoEntities)));
    }

    #[test]
    fn dangling_reference_fails_fast() {
        let mut bsp = box_level(Contents::Solid, "crate01");
        bsp.faces[0].texinfo = 99;
        let log = Transcript::new();

        let outcome = DecompilerStrategy::FaceToBrush.run(&log, &bsp, &DecompilerOptions::default(), &CancellationToken::new());
        assert!(matches!(outcome, Outcome::Failed(Error::InvalidReference { .. })));
    }

    #[test]
    fn cancel_before_start_is_not_an_error() {
        let bsp = box_level(Contents::Solid, "crate01");
        let log = Transcript::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        for strategy in DecompilerStrategy::ALL {
            let outcome = strategy.run(&log, &bsp, &DecompilerOptions::default(), &cancel);
            assert!(matches!(outcome, Outcome::Canceled));
        }
        assert!(log.contains(log::Level::Info, "Decompilation cancelled"));
        assert!(!log.contains(log::Level::Error, "cancel"));
    }

    #[test]
    fn both_strategies_produce_maps() {
        let log = Transcript::new();
        let options = DecompilerOptions::default();
        let cancel = CancellationToken::new();

        let tree = DecompilerStrategy::Tree
            .decompile(&log, &box_level(Contents::Solid, "crate01"), &options, &cancel)
            .unwrap();
        assert_eq!(tree.brush_count(), 1);
        assert_eq!(tree.worldspawn.solids[0].faces.len(), 6);

        let faces = DecompilerStrategy::FaceToBrush
            .decompile(&log, &two_tile_level(), &options, &cancel)
            .unwrap();
        assert_eq!(faces.brush_count(), 1);
        assert_eq!(faces.worldspawn.get("wad"), Some("test.wad"));
    }
}
