//! Clearance computation.
//!
//! The clearance of a tile for a capability is the side length of the largest
//! axis-aligned square, anchored at the tile as its top-left corner, whose
//! tiles are all walkable with that capability and whose internal edges are
//! all free of walls. Non-walkable tiles have clearance 0.
//!
//! Values are filled in by a dynamic program that walks each level from the
//! bottom-right corner back to the top-left, so that the east, south and
//! south-east neighbours of a tile are always final before the tile itself.

use log::trace;

use delve_core::{Capability, Direction, Position, TileMap};

/// Computes and stores per-tile clearance on a [`TileMap`].
#[derive(Copy, Clone, Debug, Default)]
pub struct ClearanceCalculator;

impl ClearanceCalculator {
    /// Recompute the clearance of every tile on level `z` for `cap`.
    ///
    /// Levels outside the map are ignored.
    pub fn compute_level(map: &mut TileMap, z: i32, cap: Capability) {
        if z < 0 || z >= map.depth() || cap.is_empty() {
            return;
        }
        let (w, h) = (map.width(), map.height());
        for y in (0..h).rev() {
            for x in (0..w).rev() {
                let pos = Position::new(x, y, z);
                let value = Self::tile_value(map, pos, cap, x == w - 1 || y == h - 1);
                map.set_clearance(pos, cap, value);
            }
        }
    }

    /// Recompute the clearance of level `z` for every non-empty capability.
    pub fn compute_all(map: &mut TileMap, z: i32) {
        for cap in Capability::NON_EMPTY {
            Self::compute_level(map, z, cap);
        }
        trace!("clearance recomputed for level {z}");
    }

    fn tile_value(map: &TileMap, pos: Position, cap: Capability, on_border: bool) -> u32 {
        if !map.walkable(pos, cap) {
            return 0;
        }
        if on_border {
            return 1;
        }
        let e = pos.step(Direction::East);
        let s = pos.step(Direction::South);
        let se = pos.step(Direction::SouthEast);
        let obstructed = map.has_wall(pos, Direction::East)
            || map.has_wall(pos, Direction::South)
            || map.has_wall(e, Direction::South)
            || map.has_wall(s, Direction::East);
        if obstructed {
            return 1;
        }
        map.clearance(e, cap)
            .min(map.clearance(s, cap))
            .min(map.clearance(se, cap))
            + 1
    }
}
