//! The [`Tile`] type: terrain state plus per-capability clearance.

use crate::capability::{Capability, MovementType};
use crate::geom::{Direction, Position, Sides};

/// A single map tile.
///
/// The terrain flags are owned by the map. `clearance` values are written by
/// the clearance calculator and read by the searches.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tile {
    pos: Position,
    pub dug_out: bool,
    pub has_floor: bool,
    pub underground: bool,
    /// Sides facing undug rock, maintained by wall reflow.
    pub rock: Sides,
    /// Walls placed explicitly by the host (orthogonal bits only).
    pub built: Sides,
    clearance: [u32; Capability::SLOTS],
}

impl Tile {
    /// A solid, undug underground tile.
    pub fn solid(pos: Position) -> Self {
        Self {
            pos,
            dug_out: false,
            has_floor: false,
            underground: true,
            rock: Sides::NONE,
            built: Sides::NONE,
            clearance: [0; Capability::SLOTS],
        }
    }

    /// The tile position.
    #[inline]
    pub fn pos(&self) -> Position {
        self.pos
    }

    /// Whether the tile can be entered by movement type `t`.
    #[inline]
    pub fn walkable_by(&self, t: MovementType) -> bool {
        match t {
            MovementType::Walk => self.dug_out && self.has_floor,
            MovementType::Fly => self.dug_out,
        }
    }

    /// Whether the tile can be entered by at least one movement type of `cap`.
    pub fn walkable(&self, cap: Capability) -> bool {
        cap.iter().any(|t| self.walkable_by(t))
    }

    /// Stored clearance for `cap` (0 = impassable).
    #[inline]
    pub fn clearance(&self, cap: Capability) -> u32 {
        self.clearance[cap.bits() as usize]
    }

    /// Store the clearance for `cap`. The empty capability always stays 0.
    #[inline]
    pub fn set_clearance(&mut self, cap: Capability, value: u32) {
        if !cap.is_empty() {
            self.clearance[cap.bits() as usize] = value;
        }
    }

    /// Whether the edge of this tile in orthogonal direction `dir` carries a
    /// wall (rock face or built wall).
    #[inline]
    pub fn has_wall(&self, dir: Direction) -> bool {
        (self.rock | self.built).has(dir)
    }

    /// Orthogonal wall bits.
    #[inline]
    pub fn walls(&self) -> Sides {
        (self.rock | self.built) & Sides::WALLS
    }

    /// Diagonal corner bits.
    #[inline]
    pub fn corners(&self) -> Sides {
        self.rock & Sides::CORNERS
    }
}


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn tile_round_trip_keeps_terrain_and_clearance() {
        let mut t = Tile::solid(Position::new(4, 1, 2));
        t.dug_out = true;
        t.has_floor = true;
        t.built = t.built.with(Direction::East);
        t.set_clearance(Capability::WALK, 3);
        let json = serde_json::to_string(&t).unwrap();
        let back: Tile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
        assert_eq!(back.clearance(Capability::WALK), 3);
        assert!(back.has_wall(Direction::East));
    }
}
