//! A* over the entrance graph.
//!
//! When start and goal share a section the search falls through to a direct
//! local search. Otherwise both endpoints are inserted into the graph as
//! temporary entrances, stitched to the entrances of their section, and the
//! cheapest chain of edges usable by the request is returned as a list of
//! waypoints. The temporary entrances are removed again before the search
//! returns, whatever its outcome.

use std::collections::BinaryHeap;

use log::{trace, warn};

use delve_core::{Position, TileMap};

use crate::config::{CostModel, NavConfig};
use crate::error::PathfindingResult;
use crate::local::{check_endpoint, LocalSearch, NodeRef};
use crate::navigation::{EntranceId, LevelGraph, NavigationMap};
use crate::path::{AnnotatedPath, Path};
use crate::request::SearchRequest;

/// Waypoints of a route over the entrance graph, start and goal included.
/// Consecutive waypoints always share a section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbstractPath {
    pub waypoints: Vec<Position>,
    /// Sum of the edge costs along the route.
    pub cost: u32,
}

/// What a hierarchical search produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Plan {
    /// Start and goal share a section: the exact tile path.
    Direct(AnnotatedPath),
    /// Start and goal are in different sections: waypoints to resolve.
    Waypoints(AbstractPath),
}

// ---------------------------------------------------------------------------
// Temporary nodes
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Side {
    Start,
    Goal,
}

/// Temporary entrances inserted for one search, removed on drop.
struct TemporaryNodes<'a> {
    nav: &'a mut NavigationMap,
    z: i32,
    ids: Vec<EntranceId>,
}

impl<'a> TemporaryNodes<'a> {
    fn new(nav: &'a mut NavigationMap, z: i32) -> Self {
        Self {
            nav,
            z,
            ids: Vec::with_capacity(2),
        }
    }

    fn graph(&self) -> PathfindingResult<&LevelGraph> {
        self.nav.level(self.z)
    }

    /// Graph node for `pos`: the entrance already there, or a new temporary
    /// entrance linked to every entrance of its section that the request
    /// can reach. `None` when it links to nothing.
    fn endpoint(
        &mut self,
        map: &TileMap,
        local: &mut LocalSearch,
        pos: Position,
        side: Side,
        request: &SearchRequest,
        costs: CostModel,
    ) -> PathfindingResult<Option<EntranceId>> {
        if let Some(id) = self.graph()?.entrance_at(pos) {
            return Ok(Some(id));
        }
        let id = self.nav.insert_temporary_entrance(pos)?;
        self.ids.push(id);

        let (clearance, cap) = (request.clearance(), request.capability());
        let graph = self.graph()?;
        let Some(entrance) = graph.entrance(id) else {
            return Ok(None);
        };
        let home = entrance.home();
        let targets: Vec<(EntranceId, Position)> = graph
            .section(home)
            .map(|s| s.entrances())
            .unwrap_or_default()
            .iter()
            .filter(|&&t| t != id)
            .filter_map(|&t| graph.entrance(t).map(|e| (t, e.pos())))
            .collect();

        let mut links = Vec::with_capacity(targets.len());
        for (target, tpos) in targets {
            if map.clearance(tpos, cap) < clearance {
                continue;
            }
            let (a, b) = match side {
                Side::Start => (pos, tpos),
                Side::Goal => (tpos, pos),
            };
            let allow = |q: Position| graph.is_interior(q, home);
            if let Some(path) = local.search_within(map, a, b, clearance, cap, costs, allow)? {
                links.push((target, path.cost()));
            }
        }
        trace!("{side:?} node {id} at {pos} links to {} entrances", links.len());
        if links.is_empty() {
            return Ok(None);
        }
        let graph = self.nav.level_mut(self.z)?;
        for (target, cost) in links {
            graph.connect(id, target, cost, clearance, cap)?;
        }
        Ok(Some(id))
    }
}

impl Drop for TemporaryNodes<'_> {
    fn drop(&mut self) {
        while let Some(id) = self.ids.pop() {
            if let Err(e) = self.nav.remove_temporary_entrance(self.z, id) {
                warn!("could not remove temporary entrance {id}: {e}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// HierarchicalSearch
// ---------------------------------------------------------------------------

/// Reusable A* search over entrances.
#[derive(Debug, Default)]
pub struct HierarchicalSearch {
    g: Vec<u32>,
    parent: Vec<Option<EntranceId>>,
    closed: Vec<bool>,
    open: BinaryHeap<NodeRef>,
}

impl HierarchicalSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan a route for `request`.
    ///
    /// `Ok(None)` means no route exists for the request's clearance and
    /// capability. Endpoint faults are reported as errors, as for
    /// [`LocalSearch::search`].
    pub fn plan(
        &mut self,
        map: &TileMap,
        nav: &mut NavigationMap,
        local: &mut LocalSearch,
        request: &SearchRequest,
        config: &NavConfig,
    ) -> PathfindingResult<Option<Plan>> {
        let (start, goal) = (request.start(), request.goal());
        check_endpoint(map, start, request.clearance(), request.capability())?;
        check_endpoint(map, goal, request.clearance(), request.capability())?;

        if nav.level(request.level())?.shares_section(start, goal) {
            trace!("{request}: endpoints share a section");
            return Ok(local.search(map, request, config.path_costs)?.map(Plan::Direct));
        }

        let costs = config.edge_costs;
        let mut nodes = TemporaryNodes::new(nav, request.level());
        let Some(from) = nodes.endpoint(map, local, start, Side::Start, request, costs)? else {
            return Ok(None);
        };
        let Some(to) = nodes.endpoint(map, local, goal, Side::Goal, request, costs)? else {
            return Ok(None);
        };
        let found = self.search_graph(nodes.graph()?, from, to, request, costs);
        Ok(found.map(Plan::Waypoints))
    }

    fn search_graph(
        &mut self,
        graph: &LevelGraph,
        from: EntranceId,
        to: EntranceId,
        request: &SearchRequest,
        costs: CostModel,
    ) -> Option<AbstractPath> {
        let n = graph.entrances().len();
        self.g.clear();
        self.g.resize(n, u32::MAX);
        self.parent.clear();
        self.parent.resize(n, None);
        self.closed.clear();
        self.closed.resize(n, false);
        self.open.clear();

        let goal = graph.entrance(to)?.pos();
        let estimate = |id: EntranceId| graph.entrance(id).map_or(0, |e| costs.octile(e.pos(), goal));

        self.g[from.index()] = 0;
        self.open.push(NodeRef {
            idx: from.index(),
            f: estimate(from),
        });

        while let Some(NodeRef { idx, .. }) = self.open.pop() {
            if self.closed[idx] {
                continue;
            }
            if idx == to.index() {
                return Some(self.reconstruct(graph, from, to));
            }
            self.closed[idx] = true;
            let g = self.g[idx];
            for edge in graph.entrances()[idx].edges() {
                if !edge.permits(request.clearance(), request.capability()) {
                    continue;
                }
                let ni = edge.to.index();
                if ni >= n || self.closed[ni] {
                    continue;
                }
                let tentative = g + edge.cost;
                if tentative < self.g[ni] {
                    self.g[ni] = tentative;
                    self.parent[ni] = Some(EntranceId(idx as u32));
                    self.open.push(NodeRef {
                        idx: ni,
                        f: tentative + estimate(edge.to),
                    });
                }
            }
        }
        None
    }

    fn reconstruct(&self, graph: &LevelGraph, from: EntranceId, to: EntranceId) -> AbstractPath {
        let mut waypoints = Vec::new();
        let mut cur = Some(to);
        while let Some(id) = cur {
            if let Some(e) = graph.entrance(id) {
                waypoints.push(e.pos());
            }
            if id == from {
                break;
            }
            cur = self.parent[id.index()];
        }
        waypoints.reverse();
        AbstractPath {
            waypoints,
            cost: self.g[to.index()],
        }
    }
}
