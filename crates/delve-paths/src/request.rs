//! Search requests.

use std::fmt;

use delve_core::{Capability, Position};

use crate::error::{PathfindingError, PathfindingResult};

/// Which search a request runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchKind {
    /// Route over the entrance graph, expanded segment by segment.
    Hierarchical,
    /// Exact A* over tiles.
    Local,
}

/// A validated path request: endpoints, agent size and movement capability.
///
/// Construction rejects configuration errors (zero clearance, empty
/// capability, identical endpoints, endpoints on different levels). Whether
/// the endpoints are actually reachable is only known once a search runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchRequest {
    start: Position,
    goal: Position,
    clearance: u32,
    capability: Capability,
    kind: SearchKind,
}

impl SearchRequest {
    /// A hierarchical request.
    pub fn new(
        start: Position,
        goal: Position,
        clearance: u32,
        capability: Capability,
    ) -> PathfindingResult<Self> {
        Self::with_kind(start, goal, clearance, capability, SearchKind::Hierarchical)
    }

    /// A request for a single exact tile search.
    pub fn local(
        start: Position,
        goal: Position,
        clearance: u32,
        capability: Capability,
    ) -> PathfindingResult<Self> {
        Self::with_kind(start, goal, clearance, capability, SearchKind::Local)
    }

    pub fn with_kind(
        start: Position,
        goal: Position,
        clearance: u32,
        capability: Capability,
        kind: SearchKind,
    ) -> PathfindingResult<Self> {
        if clearance == 0 {
            return Err(PathfindingError::ZeroClearance);
        }
        if capability.is_empty() {
            return Err(PathfindingError::EmptyCapability);
        }
        if start == goal {
            return Err(PathfindingError::StartIsGoal(start));
        }
        if start.z != goal.z {
            return Err(PathfindingError::LevelMismatch { start, goal });
        }
        Ok(Self {
            start,
            goal,
            clearance,
            capability,
            kind,
        })
    }

    #[inline]
    pub fn start(&self) -> Position {
        self.start
    }

    #[inline]
    pub fn goal(&self) -> Position {
        self.goal
    }

    #[inline]
    pub fn clearance(&self) -> u32 {
        self.clearance
    }

    #[inline]
    pub fn capability(&self) -> Capability {
        self.capability
    }

    #[inline]
    pub fn kind(&self) -> SearchKind {
        self.kind
    }

    /// Level both endpoints are on.
    #[inline]
    pub fn level(&self) -> i32 {
        self.start.z
    }
}

impl fmt::Display for SearchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} (clearance {}, {})",
            self.start, self.goal, self.clearance, self.capability
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors() {
        let a = Position::new(1, 1, 0);
        let b = Position::new(3, 1, 0);
        let walk = Capability::WALK;
        assert_eq!(
            SearchRequest::new(a, b, 0, walk),
            Err(PathfindingError::ZeroClearance)
        );
        assert_eq!(
            SearchRequest::new(a, b, 1, Capability::NONE),
            Err(PathfindingError::EmptyCapability)
        );
        assert_eq!(
            SearchRequest::new(a, a, 1, walk),
            Err(PathfindingError::StartIsGoal(a))
        );
        let deep = Position::new(3, 1, 2);
        assert_eq!(
            SearchRequest::local(a, deep, 1, walk),
            Err(PathfindingError::LevelMismatch { start: a, goal: deep })
        );
    }

    #[test]
    fn accessors() {
        let r = SearchRequest::local(Position::new(1, 1, 2), Position::new(4, 1, 2), 2, Capability::FLY)
            .unwrap();
        assert_eq!(r.kind(), SearchKind::Local);
        assert_eq!(r.level(), 2);
        assert_eq!(r.clearance(), 2);
        assert_eq!(r.to_string(), "(1, 1, 2) -> (4, 1, 2) (clearance 2, fly)");
    }
}
