//! Tunables: [`CostModel`] and [`NavConfig`].

use delve_core::{Direction, Position};

/// Step costs for 8-directional movement.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostModel {
    pub orthogonal: u32,
    pub diagonal: u32,
}

impl CostModel {
    /// Unscaled costs (1/1), used to price entrance edges.
    pub const UNIT: Self = Self {
        orthogonal: 1,
        diagonal: 1,
    };

    /// Scaled costs (10/14), used for paths handed to callers.
    pub const SCALED: Self = Self {
        orthogonal: 10,
        diagonal: 14,
    };

    /// Cost of a single step in `dir`.
    #[inline]
    pub const fn step(self, dir: Direction) -> u32 {
        if dir.is_diagonal() {
            self.diagonal
        } else {
            self.orthogonal
        }
    }

    /// Octile distance between two positions of the same level.
    ///
    /// Admissible and consistent for 8-way movement as long as
    /// `orthogonal <= diagonal <= 2 * orthogonal`.
    #[inline]
    pub fn octile(self, a: Position, b: Position) -> u32 {
        let dx = a.x.abs_diff(b.x);
        let dy = a.y.abs_diff(b.y);
        let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
        self.diagonal * lo + self.orthogonal * (hi - lo)
    }
}

/// Navigation settings shared by every search of a [`Pathfinder`](crate::Pathfinder).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NavConfig {
    /// Step costs of the tile paths returned to callers.
    pub path_costs: CostModel,
    /// Step costs of the section-internal searches that price edges and
    /// stitch start/goal nodes into the entrance graph.
    pub edge_costs: CostModel,
    /// Merge candidate entrances two tiles apart into one entrance on the
    /// tile between them.
    pub collapse_entrances: bool,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            path_costs: CostModel::SCALED,
            edge_costs: CostModel::UNIT,
            collapse_entrances: true,
        }
    }
}

impl NavConfig {
    /// Set the caller-facing path costs (builder).
    pub const fn with_path_costs(mut self, costs: CostModel) -> Self {
        self.path_costs = costs;
        self
    }

    /// Set the edge pricing costs (builder).
    pub const fn with_edge_costs(mut self, costs: CostModel) -> Self {
        self.edge_costs = costs;
        self
    }

    /// Enable or disable entrance collapsing (builder).
    pub const fn with_collapse_entrances(mut self, collapse: bool) -> Self {
        self.collapse_entrances = collapse;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octile_matches_both_scales() {
        let a = Position::new(0, 0, 0);
        let b = Position::new(4, 2, 0);
        assert_eq!(CostModel::SCALED.octile(a, b), 2 * 14 + 2 * 10);
        assert_eq!(CostModel::UNIT.octile(a, b), 4);
        assert_eq!(CostModel::SCALED.octile(b, a), CostModel::SCALED.octile(a, b));
        assert_eq!(CostModel::SCALED.octile(a, a), 0);
    }

    #[test]
    fn step_costs() {
        assert_eq!(CostModel::SCALED.step(Direction::North), 10);
        assert_eq!(CostModel::SCALED.step(Direction::SouthWest), 14);
        assert_eq!(CostModel::UNIT.step(Direction::SouthWest), 1);
    }

    #[test]
    fn builder_overrides_defaults() {
        let c = NavConfig::default()
            .with_path_costs(CostModel::UNIT)
            .with_collapse_entrances(false);
        assert_eq!(c.path_costs, CostModel::UNIT);
        assert_eq!(c.edge_costs, CostModel::UNIT);
        assert!(!c.collapse_entrances);
    }
}
