//! Entrance detection.
//!
//! An entrance is a chokepoint tile: walking around its 8 neighbours, the
//! blocked ones form at least two separate runs and at least one open run is
//! two or more tiles long. Such a tile joins otherwise separate open areas,
//! like the mouth of a corridor or a doorway in a wall.
//!
//! Candidates are accepted in row-major order and never next to an already
//! accepted entrance. Optionally, pairs of entrances exactly two tiles apart
//! are then collapsed into a single entrance on the tile between them.

use log::trace;

use delve_core::{Capability, Direction, Position, TileMap};

/// Movement class used for everything structural: sections, entrances and
/// the connectivity checks between them.
pub(crate) const STRUCTURAL: Capability = Capability::WALK_OR_FLY;

/// Whether `pos` can take part in the entrance graph at all.
fn open_tile(map: &TileMap, pos: Position) -> bool {
    map.get_tile(pos)
        .is_some_and(|t| t.underground && t.walkable(STRUCTURAL))
}

/// Blocked state of the 8 neighbours of `pos`, indexed by
/// [`Direction::index`].
fn blocked_neighbours(map: &TileMap, pos: Position) -> [bool; 8] {
    let mut blocked = [true; 8];
    for dir in Direction::ALL {
        let np = pos.step(dir);
        blocked[dir.index()] = !(map.get_tile(np).is_some_and(|t| t.underground)
            && map.can_move_to(pos, np, dir, 1, STRUCTURAL));
    }
    blocked
}

/// Number of circular blocked runs and length of the longest circular open
/// run.
fn runs(blocked: &[bool; 8]) -> (usize, usize) {
    if blocked.iter().all(|&b| b) {
        return (1, 0);
    }
    // Start on the first tile of a blocked run so a run wrapping past NW
    // is counted once.
    let Some(first) = (0..8).find(|&i| blocked[i] && !blocked[(i + 7) % 8]) else {
        return (0, 8);
    };
    let mut blocked_runs = 1;
    let mut open = 0;
    let mut longest = 0;
    let mut prev_blocked = true;
    for i in 1..8 {
        let b = blocked[(first + i) % 8];
        if b {
            if !prev_blocked {
                blocked_runs += 1;
            }
            open = 0;
        } else {
            open += 1;
            longest = longest.max(open);
        }
        prev_blocked = b;
    }
    (blocked_runs, longest)
}

/// Whether the neighbourhood of `pos` makes it a chokepoint.
pub(crate) fn is_chokepoint(map: &TileMap, pos: Position) -> bool {
    let (blocked_runs, longest_open) = runs(&blocked_neighbours(map, pos));
    blocked_runs >= 2 && longest_open >= 2
}

fn touches(accepted: &[bool], map: &TileMap, pos: Position) -> bool {
    Direction::ALL
        .iter()
        .filter_map(|&d| map.level_index(pos.step(d)))
        .any(|i| accepted[i])
}

/// Entrance tiles of level `z`, in row-major order.
pub(crate) fn detect(map: &TileMap, z: i32, collapse: bool) -> Vec<Position> {
    let mut accepted = vec![false; map.level_len()];
    let mut found = Vec::new();
    for pos in map.level_positions(z) {
        if !open_tile(map, pos) || touches(&accepted, map, pos) {
            continue;
        }
        if is_chokepoint(map, pos) {
            if let Some(i) = map.level_index(pos) {
                accepted[i] = true;
            }
            found.push(pos);
        }
    }
    if collapse {
        found = collapse_pairs(map, found);
    }
    found.sort_by_key(|p| (p.y, p.x));
    found
}

/// Replace pairs of entrances two tiles apart by the tile between them,
/// when that tile is open and no third entrance touches it.
fn collapse_pairs(map: &TileMap, found: Vec<Position>) -> Vec<Position> {
    let mut alive = vec![true; found.len()];
    let mut merged: Vec<Position> = Vec::new();

    for i in 0..found.len() {
        if !alive[i] {
            continue;
        }
        for j in i + 1..found.len() {
            if !alive[j] {
                continue;
            }
            let (a, b) = (found[i], found[j]);
            let (dx, dy) = (b.x - a.x, b.y - a.y);
            if a.chebyshev(b) != 2 || dx % 2 != 0 || dy % 2 != 0 {
                continue;
            }
            let mid = a.shift(dx / 2, dy / 2);
            if !open_tile(map, mid) {
                continue;
            }
            let crowded = found
                .iter()
                .enumerate()
                .filter(|&(k, _)| k != i && k != j && alive[k])
                .map(|(_, &p)| p)
                .chain(merged.iter().copied())
                .any(|p| p.chebyshev(mid) <= 1);
            if crowded {
                continue;
            }
            trace!("collapsed entrances {a} and {b} into {mid}");
            alive[i] = false;
            alive[j] = false;
            merged.push(mid);
            break;
        }
    }

    found
        .into_iter()
        .zip(alive)
        .filter_map(|(p, keep)| keep.then_some(p))
        .chain(merged)
        .collect()
}
