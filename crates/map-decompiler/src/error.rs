//! Error types for decompilation.

use thiserror::Error;

/// Result type for decompiler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a decompilation job.
///
/// Recoverable per-element problems (a face that degenerates, a brush that
/// fails its bounds check) are logged and skipped instead of surfacing here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("BSP version {0} is not supported, only GoldSource (version 30) levels can be decompiled")]
    UnsupportedVersion(i32),

    #[error("BSP file has no entities")]
    NoEntities,

    #[error("{lump} entry {index} references {value}, which is out of range")]
    InvalidReference {
        lump: &'static str,
        index: usize,
        value: i64,
    },

    #[error("unknown decompiler strategy: {0}")]
    UnknownStrategy(String),

    #[error("unknown brush optimization: {0}")]
    UnknownBrushOptimization(String),

    #[error("invalid trigger entity wildcard: {0}")]
    InvalidWildcard(#[from] regex::Error),

    #[error("clipped winding has {points} points, estimated at most {limit}")]
    WindingOverflow { points: usize, limit: usize },

    #[error("winding with {0} points exceeds the point limit")]
    TooManyPoints(usize),

    #[error("no axis found for winding")]
    NoAxisFound,

    #[error("bad plane normal")]
    BadPlaneNormal,

    #[error("found contents {contents} in leaf {leaf}")]
    UnexpectedLeafContents { leaf: usize, contents: i32 },

    #[error("decompilation canceled")]
    Canceled,
}

impl Error {
    /// Returns `true` for the cooperative cancellation outcome.
    #[inline]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }
}
