//! Pathfinding error type.
//!
//! "No path exists" is never an error: searches report it as `Ok(None)` and
//! scheduled searches hand `None` to their listener. The variants below are
//! configuration, precondition and state faults.

use thiserror::Error;

use delve_core::{Capability, MapError, Position};

use crate::navigation::EntranceId;

/// Errors produced by `delve-paths`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathfindingError {
    #[error(transparent)]
    Map(#[from] MapError),

    #[error("clearance must be at least 1")]
    ZeroClearance,

    #[error("capability must not be empty")]
    EmptyCapability,

    #[error("start and goal are both {0}")]
    StartIsGoal(Position),

    #[error("start {start} and goal {goal} are on different levels")]
    LevelMismatch { start: Position, goal: Position },

    #[error("{pos} is not walkable for {capability}")]
    NotWalkable { pos: Position, capability: Capability },

    #[error("{pos} has clearance {actual} for {capability}, {required} required")]
    InsufficientClearance {
        pos: Position,
        capability: Capability,
        actual: u32,
        required: u32,
    },

    #[error("an edge cannot connect entrance {0} to itself")]
    SelfEdge(EntranceId),

    #[error("edge {from} -> {to} needs cost, clearance and capability of at least 1")]
    DegenerateEdge { from: EntranceId, to: EntranceId },

    #[error("a path needs at least one step")]
    EmptyPath,

    #[error("path is no longer valid")]
    InvalidPath,

    #[error("path has no steps left")]
    PathExhausted,

    #[error("next step of the path is not resolved yet")]
    NotReady,

    #[error("{0} is already an entrance")]
    AlreadyEntrance(Position),

    #[error("{0} does not belong to any section")]
    NoSection(Position),

    #[error("level {level} has no entrance {id}")]
    UnknownEntrance { id: EntranceId, level: i32 },

    #[error("entrance {id} is not a temporary node of level {level}")]
    ForeignEntrance { id: EntranceId, level: i32 },

    #[error("level {0} has no navigation data")]
    UnknownLevel(i32),
}

pub type PathfindingResult<T> = Result<T, PathfindingError>;
