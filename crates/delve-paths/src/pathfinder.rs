//! The [`Pathfinder`] service: map, navigation data and scheduler together.
//!
//! ```
//! use delve_core::{Capability, Position, TileMap};
//! use delve_paths::{NavConfig, Path, Pathfinder};
//!
//! let level = concat!(
//!     "###########\n",
//!     "#...###...#\n",
//!     "#.........#\n",
//!     "#...###...#\n",
//!     "###########\n",
//! );
//! let map = TileMap::from_ascii(&[level]).unwrap();
//! let mut pf = Pathfinder::new(map, NavConfig::default()).unwrap();
//! let ticket = pf
//!     .submit_path_ticket(Position::new(1, 2, 0), Position::new(9, 2, 0), 1, Capability::WALK)
//!     .unwrap();
//! pf.tick();
//! let mut route = ticket.take().unwrap();
//!
//! // Segments resolve as the scheduler ticks.
//! let mut steps = 0;
//! loop {
//!     if route.has_next().unwrap() {
//!         route.next().unwrap();
//!         steps += 1;
//!     } else if !pf.tick() {
//!         break;
//!     }
//! }
//! assert_eq!(steps, 8);
//! ```

use log::{debug, info, warn};

use delve_core::{Capability, Direction, DigOutcome, Position, TileMap};

use crate::clearance::ClearanceCalculator;
use crate::config::NavConfig;
use crate::error::PathfindingResult;
use crate::hierarchical::{HierarchicalSearch, Plan};
use crate::local::LocalSearch;
use crate::navigation::NavigationMap;
use crate::path::{AnnotatedPath, HierarchicalPath, Route};
use crate::request::{SearchKind, SearchRequest};
use crate::scheduler::{Scheduler, SearchExecutor, SearchListener, SearchTicket, Submitter};

/// Executes scheduled searches against borrowed pathfinder state.
struct Engine<'a> {
    map: &'a TileMap,
    nav: &'a mut NavigationMap,
    local: &'a mut LocalSearch,
    hierarchical: &'a mut HierarchicalSearch,
    config: &'a NavConfig,
}

impl Engine<'_> {
    fn run(&mut self, request: &SearchRequest, submitter: &Submitter) -> PathfindingResult<Option<Route>> {
        match request.kind() {
            SearchKind::Local => Ok(self
                .local
                .search(self.map, request, self.config.path_costs)?
                .map(Route::Local)),
            SearchKind::Hierarchical => {
                let plan = self
                    .hierarchical
                    .plan(self.map, self.nav, self.local, request, self.config)?;
                match plan {
                    None => Ok(None),
                    Some(Plan::Direct(path)) => Ok(Some(Route::Local(path))),
                    Some(Plan::Waypoints(abs)) => HierarchicalPath::new(
                        abs.waypoints,
                        abs.cost,
                        request.clearance(),
                        request.capability(),
                        submitter.clone(),
                    )
                    .map(|h| Some(Route::Hierarchical(h))),
                }
            }
        }
    }
}

impl SearchExecutor for Engine<'_> {
    fn execute(&mut self, request: &SearchRequest, submitter: &Submitter) -> Option<Route> {
        match self.run(request, submitter) {
            Ok(route) => route,
            Err(e) => {
                warn!("search {request} failed: {e}");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pathfinder
// ---------------------------------------------------------------------------

/// Owns a [`TileMap`] with its navigation data and serves path requests.
///
/// Requests go through a FIFO [`Scheduler`] drained one search per
/// [`tick`](Self::tick). Terrain edits made through the pathfinder rebuild
/// the clearance and navigation data of every level they touch.
#[derive(Debug)]
pub struct Pathfinder {
    map: TileMap,
    nav: NavigationMap,
    scheduler: Scheduler,
    local: LocalSearch,
    hierarchical: HierarchicalSearch,
    config: NavConfig,
}

impl Pathfinder {
    /// Compute clearance and navigation data for every level of `map`.
    pub fn new(mut map: TileMap, config: NavConfig) -> PathfindingResult<Self> {
        for z in 0..map.depth() {
            ClearanceCalculator::compute_all(&mut map, z);
        }
        let mut local = LocalSearch::new();
        let nav = NavigationMap::build(&map, &mut local, &config)?;
        info!(
            "navigation ready: {} levels, {} sections, {} entrances, {} edges",
            map.depth(),
            nav.section_count(),
            nav.entrance_count(),
            nav.edge_count()
        );
        Ok(Self {
            map,
            nav,
            scheduler: Scheduler::new(),
            local,
            hierarchical: HierarchicalSearch::new(),
            config,
        })
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn navigation(&self) -> &NavigationMap {
        &self.nav
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    /// A handle for queueing searches directly.
    pub fn submitter(&self) -> Submitter {
        self.scheduler.submitter()
    }

    /// Number of queued searches.
    pub fn pending(&self) -> usize {
        self.scheduler.len()
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Queue a hierarchical search; `listener` receives the route.
    pub fn submit_path(
        &self,
        start: Position,
        goal: Position,
        clearance: u32,
        capability: Capability,
        listener: impl SearchListener + 'static,
    ) -> PathfindingResult<()> {
        let request = SearchRequest::new(start, goal, clearance, capability)?;
        self.scheduler.submit(request, listener);
        Ok(())
    }

    /// Queue a hierarchical search and return a ticket for its route.
    pub fn submit_path_ticket(
        &self,
        start: Position,
        goal: Position,
        clearance: u32,
        capability: Capability,
    ) -> PathfindingResult<SearchTicket> {
        let request = SearchRequest::new(start, goal, clearance, capability)?;
        Ok(self.scheduler.submit_ticket(request))
    }

    /// Queue any prepared request.
    pub fn submit(&self, request: SearchRequest, listener: impl SearchListener + 'static) {
        self.scheduler.submit(request, listener);
    }

    /// Run a hierarchical search right away, bypassing the queue.
    ///
    /// Segments of a returned [`HierarchicalPath`] are still resolved through
    /// the scheduler.
    pub fn find_path(
        &mut self,
        start: Position,
        goal: Position,
        clearance: u32,
        capability: Capability,
    ) -> PathfindingResult<Option<Route>> {
        let request = SearchRequest::new(start, goal, clearance, capability)?;
        let submitter = self.scheduler.submitter();
        self.engine().run(&request, &submitter)
    }

    /// Exact tile search right away, bypassing the queue.
    pub fn local_path(
        &mut self,
        start: Position,
        goal: Position,
        clearance: u32,
        capability: Capability,
    ) -> PathfindingResult<Option<AnnotatedPath>> {
        let request = SearchRequest::local(start, goal, clearance, capability)?;
        self.local.search(&self.map, &request, self.config.path_costs)
    }

    /// Run the oldest queued search. Returns whether a search ran.
    pub fn tick(&mut self) -> bool {
        let mut engine = Engine {
            map: &self.map,
            nav: &mut self.nav,
            local: &mut self.local,
            hierarchical: &mut self.hierarchical,
            config: &self.config,
        };
        self.scheduler.tick(&mut engine)
    }

    /// Tick until the queue is empty, including searches queued while
    /// ticking. Returns the number of searches run.
    pub fn run_until_idle(&mut self) -> usize {
        let mut n = 0;
        while self.tick() {
            n += 1;
        }
        n
    }

    fn engine(&mut self) -> Engine<'_> {
        Engine {
            map: &self.map,
            nav: &mut self.nav,
            local: &mut self.local,
            hierarchical: &mut self.hierarchical,
            config: &self.config,
        }
    }

    // -----------------------------------------------------------------------
    // Terrain edits
    // -----------------------------------------------------------------------

    /// Dig out `pos` and rebuild every level the dig changed.
    ///
    /// Paths obtained earlier are not invalidated; callers holding one should
    /// re-request it.
    pub fn dig_out(&mut self, pos: Position) -> PathfindingResult<DigOutcome> {
        let outcome = self.map.dig_out(pos)?;
        if !outcome.is_empty() {
            debug!("dug out {pos}, rebuilding levels {:?}", outcome.levels());
        }
        for &z in outcome.levels() {
            self.rebuild_level(z)?;
        }
        Ok(outcome)
    }

    /// Build a wall on the edge of `pos` facing `dir` and rebuild its level.
    pub fn build_wall(&mut self, pos: Position, dir: Direction) -> PathfindingResult<()> {
        self.map.build_wall(pos, dir)?;
        self.rebuild_level(pos.z)
    }

    /// Remove a built wall and rebuild its level.
    pub fn remove_wall(&mut self, pos: Position, dir: Direction) -> PathfindingResult<()> {
        self.map.remove_wall(pos, dir)?;
        self.rebuild_level(pos.z)
    }

    /// Recompute clearance and navigation data of level `z`.
    pub fn rebuild_level(&mut self, z: i32) -> PathfindingResult<()> {
        ClearanceCalculator::compute_all(&mut self.map, z);
        self.nav
            .rebuild_level(&self.map, z, &mut self.local, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PathfindingError;
    use crate::path::Path;
    use crate::scheduler::TicketState;
    use rand::rngs::StdRng;
    use rand::{RngExt, SeedableRng};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn p(x: i32, y: i32) -> Position {
        Position::new(x, y, 0)
    }

    fn pathfinder(levels: &[&str]) -> Pathfinder {
        Pathfinder::new(TileMap::from_ascii(levels).unwrap(), NavConfig::default()).unwrap()
    }

    /// Follow `route` to its end, ticking the scheduler whenever a segment
    /// is pending. Returns the visited tiles.
    fn follow(pf: &mut Pathfinder, route: &mut Route) -> Vec<Position> {
        let mut at = route.start();
        let mut tiles = vec![at];
        loop {
            if route.has_next().unwrap() {
                at = at.step(route.next().unwrap());
                tiles.push(at);
            } else if !pf.tick() {
                break;
            }
        }
        tiles
    }

    fn assert_walkable(map: &TileMap, tiles: &[Position], clearance: u32, cap: Capability) {
        for w in tiles.windows(2) {
            let dir = w[0].direction_to(w[1]).unwrap();
            assert!(
                map.can_move_to(w[0], w[1], dir, clearance, cap),
                "illegal step {} -> {}",
                w[0],
                w[1]
            );
        }
    }

    const CORRIDOR: &str = "
        ###########
        #...###...#
        #.........#
        #...###...#
        ###########
    ";

    #[test]
    fn hierarchical_route_is_resolved_segment_by_segment() {
        let mut pf = pathfinder(&[CORRIDOR]);
        let mut route = pf.find_path(p(1, 2), p(9, 2), 1, Capability::WALK).unwrap().unwrap();
        let Route::Hierarchical(h) = &route else {
            panic!("expected a hierarchical route");
        };
        assert_eq!(h.len(), 3);
        assert_eq!(h.waypoints(), &[p(1, 2), p(3, 2), p(7, 2), p(9, 2)]);
        // Two segments are submitted on construction.
        assert_eq!(pf.pending(), 2);

        let tiles = follow(&mut pf, &mut route);
        assert_eq!(tiles.first(), Some(&p(1, 2)));
        assert_eq!(tiles.last(), Some(&p(9, 2)));
        assert_eq!(tiles.len(), 9);
        assert_walkable(pf.map(), &tiles, 1, Capability::WALK);
        assert_eq!(pf.pending(), 0);
    }

    #[test]
    fn ticket_receives_route_after_a_tick() {
        let mut pf = pathfinder(&[CORRIDOR]);
        let ticket = pf.submit_path_ticket(p(1, 1), p(3, 3), 1, Capability::WALK).unwrap();
        assert_eq!(ticket.state(), TicketState::Pending);
        assert!(pf.tick());
        let route = ticket.take().unwrap();
        assert_eq!(route.as_local().map(|p| p.cost()), Some(28));
    }

    #[test]
    fn listeners_run_in_submission_order() {
        let mut pf = pathfinder(&[CORRIDOR]);
        let log = Rc::new(RefCell::new(Vec::new()));
        for goal in [p(3, 3), p(9, 2), p(0, 0)] {
            let log = log.clone();
            pf.submit_path(p(1, 1), goal, 1, Capability::WALK, move |r: &SearchRequest, route: Option<Route>| {
                log.borrow_mut().push((r.goal(), route.is_some()));
            })
            .unwrap();
        }
        assert!(pf.tick());
        assert_eq!(log.borrow().len(), 1);
        pf.run_until_idle();
        let log = log.borrow();
        assert_eq!(log[0], (p(3, 3), true));
        assert_eq!(log[1], (p(9, 2), true));
        // Unwalkable goal: the fault is logged and the listener gets nothing.
        assert_eq!(log[2], (p(0, 0), false));
    }

    #[test]
    fn configuration_errors_are_reported_at_submission() {
        let pf = pathfinder(&[CORRIDOR]);
        assert_eq!(
            pf.submit_path_ticket(p(1, 1), p(1, 1), 1, Capability::WALK).err(),
            Some(PathfindingError::StartIsGoal(p(1, 1)))
        );
        assert_eq!(
            pf.submit_path_ticket(p(1, 1), p(2, 1), 0, Capability::WALK).err(),
            Some(PathfindingError::ZeroClearance)
        );
        assert_eq!(pf.pending(), 0);
    }

    #[test]
    fn digging_a_bridge_merges_sections() {
        let mut pf = pathfinder(&["
            #########
            #.......#
            #########
            #...#...#
            #########
        "]);
        let sections = pf.navigation().section_count();
        assert!(pf.find_path(p(1, 3), p(7, 3), 1, Capability::WALK).unwrap().is_none());
        let outcome = pf.dig_out(p(4, 3)).unwrap();
        assert_eq!(outcome.levels(), &[0]);
        assert!(pf.navigation().section_count() < sections);
        let route = pf.find_path(p(1, 3), p(7, 3), 1, Capability::WALK).unwrap();
        assert!(route.is_some());
    }

    #[test]
    fn digging_below_rebuilds_the_level_above() {
        let mut pf = pathfinder(&["
            #####
            #...#
            #####
        ", "
            #####
            #####
            #####
        "]);
        let top = Position::new(2, 1, 0);
        assert!(pf.local_path(Position::new(1, 1, 0), Position::new(3, 1, 0), 1, Capability::WALK)
            .unwrap()
            .is_some());
        let outcome = pf.dig_out(top.below()).unwrap();
        assert_eq!(outcome.levels(), &[0, 1]);
        assert_eq!(pf.map().clearance(top, Capability::WALK), 0);
        assert_eq!(
            pf.local_path(Position::new(1, 1, 0), Position::new(3, 1, 0), 1, Capability::WALK)
                .unwrap(),
            None
        );
        assert!(pf.local_path(Position::new(1, 1, 0), Position::new(3, 1, 0), 1, Capability::FLY)
            .unwrap()
            .is_some());
    }

    #[test]
    fn built_walls_close_the_corridor() {
        let mut pf = pathfinder(&[CORRIDOR]);
        assert!(pf.find_path(p(1, 2), p(9, 2), 1, Capability::WALK).unwrap().is_some());
        pf.run_until_idle();
        pf.build_wall(p(5, 2), Direction::East).unwrap();
        assert!(pf.find_path(p(1, 2), p(9, 2), 1, Capability::WALK).unwrap().is_none());
        pf.remove_wall(p(5, 2), Direction::East).unwrap();
        assert!(pf.find_path(p(1, 2), p(9, 2), 1, Capability::WALK).unwrap().is_some());
    }

    fn random_cave(rng: &mut StdRng) -> TileMap {
        let (w, h) = (18, 14);
        let mut m = TileMap::new(w, h, 1).unwrap();
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                if rng.random_range(0..100) < 64 {
                    let floor = rng.random_range(0..100) < 85;
                    m.carve(p(x, y), floor).unwrap();
                }
            }
        }
        m.reflow_level(0);
        m
    }

    #[test]
    fn random_caves_agree_with_local_search() {
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..12 {
            let mut pf = Pathfinder::new(random_cave(&mut rng), NavConfig::default()).unwrap();
            let open: Vec<Position> = pf
                .map()
                .level_positions(0)
                .filter(|&q| pf.map().walkable(q, Capability::WALK))
                .collect();
            if open.len() < 2 {
                continue;
            }
            for _ in 0..12 {
                let a = open[rng.random_range(0..open.len())];
                let b = open[rng.random_range(0..open.len())];
                if a == b {
                    continue;
                }
                let exact = pf.local_path(a, b, 1, Capability::WALK).unwrap();
                let before = pf.navigation().clone();
                let route = pf.find_path(a, b, 1, Capability::WALK).unwrap();
                assert_eq!(pf.navigation(), &before, "temporary nodes leaked");
                match route {
                    None => assert!(exact.is_none(), "missed a path {a} -> {b}"),
                    Some(mut route) => {
                        assert!(exact.is_some());
                        let tiles = follow(&mut pf, &mut route);
                        assert_eq!(tiles.last(), Some(&b));
                        assert_walkable(pf.map(), &tiles, 1, Capability::WALK);
                    }
                }
            }
        }
    }

    #[test]
    fn wider_capability_never_loses_a_route() {
        let mut rng = StdRng::seed_from_u64(77);
        for _ in 0..10 {
            let mut pf = Pathfinder::new(random_cave(&mut rng), NavConfig::default()).unwrap();
            let open: Vec<Position> = pf
                .map()
                .level_positions(0)
                .filter(|&q| pf.map().walkable(q, Capability::WALK))
                .collect();
            if open.len() < 2 {
                continue;
            }
            for _ in 0..10 {
                let a = open[rng.random_range(0..open.len())];
                let b = open[rng.random_range(0..open.len())];
                if a == b {
                    continue;
                }
                let walk = pf.find_path(a, b, 1, Capability::WALK).unwrap().is_some();
                let any = pf.find_path(a, b, 1, Capability::WALK_OR_FLY).unwrap().is_some();
                assert!(!walk || any, "{a} -> {b}");
                pf.run_until_idle();
            }
        }
    }
}
