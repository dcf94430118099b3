//! Map error type.

use thiserror::Error;

use crate::geom::{Direction, Position};

/// Errors produced by `delve-core`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("position {0} is outside the map")]
    OutOfBounds(Position),

    #[error("invalid map dimensions {width}x{height}x{depth}")]
    InvalidDimensions { width: i32, height: i32, depth: i32 },

    #[error("walls can only be placed on orthogonal edges, got {0}")]
    DiagonalWall(Direction),

    #[error("ascii level {level} row {row} has width {got}, expected {expected}")]
    RaggedAscii {
        level: usize,
        row: usize,
        got: usize,
        expected: usize,
    },

    #[error("ascii level {level} has {got} rows, expected {expected}")]
    LevelHeightMismatch {
        level: usize,
        got: usize,
        expected: usize,
    },

    #[error("unknown tile glyph {0:?}")]
    UnknownGlyph(char),
}

pub type MapResult<T> = Result<T, MapError>;
