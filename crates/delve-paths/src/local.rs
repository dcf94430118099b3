//! Exact A* over the tiles of one level.
//!
//! [`LocalSearch`] owns its node cache and reuses it between searches: each
//! search bumps a generation counter instead of clearing the cache, so
//! repeated queries do not allocate once the cache has grown to the size of a
//! level.

use std::collections::{BinaryHeap, VecDeque};

use delve_core::{Capability, Direction, Position, TileMap};

use crate::config::CostModel;
use crate::error::{PathfindingError, PathfindingResult};
use crate::path::AnnotatedPath;
use crate::request::SearchRequest;

const NO_PARENT: usize = usize::MAX;

#[derive(Clone, Copy, Debug, Default)]
struct Node {
    g: u32,
    parent: usize,
    // Step taken from the parent into this node.
    dir: Option<Direction>,
    generation: u32,
    open: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct NodeRef {
    pub(crate) idx: usize,
    pub(crate) f: u32,
}

impl Ord for NodeRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse so BinaryHeap (max-heap) pops smallest f first.
        other.f.cmp(&self.f)
    }
}

impl PartialOrd for NodeRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// LocalSearch
// ---------------------------------------------------------------------------

/// Reusable A* search over tiles.
#[derive(Debug, Default)]
pub struct LocalSearch {
    nodes: Vec<Node>,
    generation: u32,
    open: BinaryHeap<NodeRef>,
}

impl LocalSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shortest path for `request` anywhere on its level, priced with `costs`.
    ///
    /// Returns `Ok(None)` when the goal cannot be reached and an error when an
    /// endpoint is off the map, not walkable, or too narrow for the requested
    /// clearance.
    pub fn search(
        &mut self,
        map: &TileMap,
        request: &SearchRequest,
        costs: CostModel,
    ) -> PathfindingResult<Option<AnnotatedPath>> {
        self.search_within(
            map,
            request.start(),
            request.goal(),
            request.clearance(),
            request.capability(),
            costs,
            |_| true,
        )
    }

    /// Shortest path from `start` to `goal` that only enters tiles accepted
    /// by `allow`. The endpoints themselves are not passed to `allow`.
    #[allow(clippy::too_many_arguments)]
    pub fn search_within(
        &mut self,
        map: &TileMap,
        start: Position,
        goal: Position,
        clearance: u32,
        cap: Capability,
        costs: CostModel,
        allow: impl Fn(Position) -> bool,
    ) -> PathfindingResult<Option<AnnotatedPath>> {
        check_endpoint(map, start, clearance, cap)?;
        check_endpoint(map, goal, clearance, cap)?;
        if start == goal {
            return Err(PathfindingError::StartIsGoal(start));
        }
        if start.z != goal.z {
            return Err(PathfindingError::LevelMismatch { start, goal });
        }
        let (Some(start_idx), Some(goal_idx)) = (map.level_index(start), map.level_index(goal))
        else {
            return Ok(None);
        };

        if self.nodes.len() != map.level_len() {
            self.nodes = vec![Node::default(); map.level_len()];
            self.generation = 0;
        }
        // Bump generation to lazily invalidate all nodes.
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.nodes.fill(Node::default());
            self.generation = 1;
        }
        let cur_gen = self.generation;

        self.nodes[start_idx] = Node {
            g: 0,
            parent: NO_PARENT,
            dir: None,
            generation: cur_gen,
            open: true,
        };
        self.open.clear();
        self.open.push(NodeRef {
            idx: start_idx,
            f: costs.octile(start, goal),
        });

        let found = loop {
            let Some(current) = self.open.pop() else {
                break false;
            };
            let ci = current.idx;
            if self.nodes[ci].generation != cur_gen || !self.nodes[ci].open {
                continue;
            }
            if ci == goal_idx {
                break true;
            }
            self.nodes[ci].open = false;
            let current_g = self.nodes[ci].g;
            let cp = map.level_position(start.z, ci);

            for dir in Direction::ALL {
                let np = cp.step(dir);
                if np != goal && !allow(np) {
                    continue;
                }
                if !map.can_move_to(cp, np, dir, clearance, cap) {
                    continue;
                }
                let Some(ni) = map.level_index(np) else {
                    continue;
                };
                let tentative_g = current_g + costs.step(dir);
                let n = &mut self.nodes[ni];
                if n.generation == cur_gen && tentative_g >= n.g {
                    continue;
                }
                *n = Node {
                    g: tentative_g,
                    parent: ci,
                    dir: Some(dir),
                    generation: cur_gen,
                    open: true,
                };
                self.open.push(NodeRef {
                    idx: ni,
                    f: tentative_g + costs.octile(np, goal),
                });
            }
        };

        if !found {
            return Ok(None);
        }

        let mut steps = VecDeque::new();
        let mut ci = goal_idx;
        while let Some(dir) = self.nodes[ci].dir {
            steps.push_front(dir);
            ci = self.nodes[ci].parent;
        }
        AnnotatedPath::new(start, steps, self.nodes[goal_idx].g).map(Some)
    }
}

/// Fails unless `pos` can hold an agent of size `clearance` moving with `cap`.
pub(crate) fn check_endpoint(
    map: &TileMap,
    pos: Position,
    clearance: u32,
    cap: Capability,
) -> PathfindingResult<()> {
    if !map.is_inside_map(pos) {
        return Err(delve_core::MapError::OutOfBounds(pos).into());
    }
    let actual = map.clearance(pos, cap);
    if actual == 0 {
        return Err(PathfindingError::NotWalkable {
            pos,
            capability: cap,
        });
    }
    if actual < clearance {
        return Err(PathfindingError::InsufficientClearance {
            pos,
            capability: cap,
            actual,
            required: clearance,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clearance::ClearanceCalculator;
    use crate::path::Path;
    use rand::rngs::StdRng;
    use rand::{RngExt, SeedableRng};

    fn computed(levels: &[&str]) -> TileMap {
        let mut m = TileMap::from_ascii(levels).unwrap();
        for z in 0..m.depth() {
            ClearanceCalculator::compute_all(&mut m, z);
        }
        m
    }

    fn p(x: i32, y: i32) -> Position {
        Position::new(x, y, 0)
    }

    fn walk(path: &mut AnnotatedPath) -> Vec<Position> {
        let mut at = path.start();
        let mut out = vec![at];
        while path.has_next().unwrap() {
            at = at.step(path.next().unwrap());
            out.push(at);
        }
        out
    }

    // Unit-cost breadth-first distance, for cross-checking A*.
    fn bfs_distance(map: &TileMap, from: Position, to: Position, clearance: u32, cap: Capability) -> Option<u32> {
        let mut dist = vec![u32::MAX; map.level_len()];
        let mut queue = VecDeque::new();
        dist[map.level_index(from)?] = 0;
        queue.push_back(from);
        while let Some(cp) = queue.pop_front() {
            let d = dist[map.level_index(cp)?];
            if cp == to {
                return Some(d);
            }
            for dir in Direction::ALL {
                let np = cp.step(dir);
                if map.can_move_to(cp, np, dir, clearance, cap) {
                    let ni = map.level_index(np)?;
                    if dist[ni] == u32::MAX {
                        dist[ni] = d + 1;
                        queue.push_back(np);
                    }
                }
            }
        }
        None
    }

    #[test]
    fn straight_and_diagonal_costs() {
        let m = computed(&["
            ######
            #....#
            #....#
            #....#
            ######
        "]);
        let mut ls = LocalSearch::new();
        let r = SearchRequest::local(p(1, 1), p(4, 1), 1, Capability::WALK).unwrap();
        let path = ls.search(&m, &r, CostModel::SCALED).unwrap().unwrap();
        assert_eq!(path.cost(), 30);
        assert_eq!(path.len(), 3);

        let r = SearchRequest::local(p(1, 1), p(3, 3), 1, Capability::WALK).unwrap();
        let mut path = ls.search(&m, &r, CostModel::SCALED).unwrap().unwrap();
        assert_eq!(path.cost(), 28);
        assert_eq!(walk(&mut path), vec![p(1, 1), p(2, 2), p(3, 3)]);
    }

    #[test]
    fn open_room_crossing_is_straight() {
        let m = computed(&["
            .....
            .....
            .....
            .....
            .....
        "]);
        let mut search = LocalSearch::new();
        let req = SearchRequest::local(p(0, 2), p(4, 2), 1, Capability::WALK).unwrap();
        let mut path = search.search(&m, &req, CostModel::SCALED).unwrap().unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path.cost(), 4 * CostModel::SCALED.orthogonal);
        assert_eq!(walk(&mut path), (0..5).map(|x| p(x, 2)).collect::<Vec<_>>());
    }

    #[test]
    fn path_is_physically_valid() {
        let m = computed(&["
            ##########
            #...#....#
            #.#.#.##.#
            #.#...#..#
            #.####.#.#
            #........#
            ##########
        "]);
        let mut ls = LocalSearch::new();
        let r = SearchRequest::local(p(1, 1), p(8, 1), 1, Capability::WALK).unwrap();
        let mut path = ls.search(&m, &r, CostModel::SCALED).unwrap().unwrap();
        let cost = path.cost();
        let tiles = walk(&mut path);
        assert_eq!(*tiles.last().unwrap(), p(8, 1));
        let mut total = 0;
        for w in tiles.windows(2) {
            let dir = w[0].direction_to(w[1]).unwrap();
            assert!(m.can_move_to(w[0], w[1], dir, 1, Capability::WALK));
            total += CostModel::SCALED.step(dir);
        }
        assert_eq!(total, cost);
    }

    #[test]
    fn narrow_gaps_stop_large_agents() {
        let m = computed(&["
            ##########
            #........#
            #........#
            #####.####
            #........#
            #........#
            #........#
            ##########
        "]);
        let mut ls = LocalSearch::new();
        let r = SearchRequest::local(p(1, 1), p(1, 4), 1, Capability::WALK).unwrap();
        assert!(ls.search(&m, &r, CostModel::SCALED).unwrap().is_some());
        let r = SearchRequest::local(p(1, 1), p(1, 4), 2, Capability::WALK).unwrap();
        assert_eq!(ls.search(&m, &r, CostModel::SCALED).unwrap(), None);
    }

    #[test]
    fn endpoint_faults() {
        let m = computed(&["
            #####
            #.._#
            #####
        "]);
        let mut ls = LocalSearch::new();
        let r = SearchRequest::local(p(1, 1), p(3, 1), 1, Capability::WALK).unwrap();
        assert_eq!(
            ls.search(&m, &r, CostModel::SCALED),
            Err(PathfindingError::NotWalkable {
                pos: p(3, 1),
                capability: Capability::WALK
            })
        );
        let r = SearchRequest::local(p(1, 1), p(2, 1), 2, Capability::WALK).unwrap();
        assert!(matches!(
            ls.search(&m, &r, CostModel::SCALED),
            Err(PathfindingError::InsufficientClearance { required: 2, .. })
        ));
        let r = SearchRequest::local(p(1, 1), p(3, 1), 1, Capability::FLY).unwrap();
        assert!(ls.search(&m, &r, CostModel::SCALED).unwrap().is_some());
    }

    #[test]
    fn unreachable_goal_is_not_an_error() {
        let m = computed(&["
            #######
            #..#..#
            #######
        "]);
        let mut ls = LocalSearch::new();
        let r = SearchRequest::local(p(1, 1), p(5, 1), 1, Capability::WALK).unwrap();
        assert_eq!(ls.search(&m, &r, CostModel::SCALED).unwrap(), None);
    }

    #[test]
    fn restriction_is_respected() {
        let m = computed(&["
            #######
            #.....#
            #.....#
            #######
        "]);
        let mut ls = LocalSearch::new();
        let path = ls
            .search_within(&m, p(1, 1), p(5, 1), 1, Capability::WALK, CostModel::UNIT, |q| q.y == 2)
            .unwrap()
            .unwrap();
        // Forced down to row 2 and back up.
        assert_eq!(path.cost(), 4);
        assert!(path.positions().iter().skip(1).rev().skip(1).all(|q| q.y == 2));
        let none = ls
            .search_within(&m, p(1, 1), p(5, 1), 1, Capability::WALK, CostModel::UNIT, |_| false)
            .unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn matches_breadth_first_search_on_random_caves() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut ls = LocalSearch::new();
        for _ in 0..15 {
            let mut m = TileMap::new(16, 12, 1).unwrap();
            for y in 0..12 {
                for x in 0..16 {
                    if rng.random_range(0..100) < 62 {
                        m.carve(p(x, y), true).unwrap();
                    }
                }
            }
            m.reflow_level(0);
            ClearanceCalculator::compute_all(&mut m, 0);
            let open: Vec<Position> = m
                .level_positions(0)
                .filter(|&q| m.walkable(q, Capability::WALK))
                .collect();
            for _ in 0..10 {
                let a = open[rng.random_range(0..open.len())];
                let b = open[rng.random_range(0..open.len())];
                if a == b {
                    continue;
                }
                let r = SearchRequest::local(a, b, 1, Capability::WALK).unwrap();
                let found = ls.search(&m, &r, CostModel::UNIT).unwrap();
                let expected = bfs_distance(&m, a, b, 1, Capability::WALK);
                assert_eq!(found.map(|path| path.cost()), expected, "{a} -> {b}");
            }
        }
    }
}
