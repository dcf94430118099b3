//! The abstract navigation graph.
//!
//! Each level of the map is partitioned into **sections**: maximal connected
//! areas of walkable tiles that do not cross an **entrance** (a chokepoint
//! tile joining two open areas). Entrances bordering the same section are
//! linked by directed **edges** priced with a section-internal
//! local search; each edge records the largest clearance and the capability
//! its underlying tile path supports.
//!
//! Sections and entrances live in per-level arenas and are referred to by
//! index handles ([`SectionId`], [`EntranceId`]). Per-tile lookups go through
//! dense tables indexed like the level's tiles.

use std::fmt;

use log::{debug, trace};

use delve_core::{Capability, Direction, MapError, Position, TileMap};

use crate::config::NavConfig;
use crate::entrances::{self, STRUCTURAL};
use crate::error::{PathfindingError, PathfindingResult};
use crate::local::LocalSearch;
use crate::path::Path;

/// Index of a section within its level.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectionId(pub u32);

/// Index of an entrance within its level.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntranceId(pub u32);

impl SectionId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EntranceId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

impl fmt::Display for EntranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Edge, Section, Entrance
// ---------------------------------------------------------------------------

/// A directed link between two entrances of a shared section.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    pub from: EntranceId,
    pub to: EntranceId,
    /// Cost of the underlying tile path, in edge cost units.
    pub cost: u32,
    /// Largest agent size the underlying tile path admits.
    pub clearance: u32,
    /// Movement types the underlying tile path was found with.
    pub capability: Capability,
}

impl Edge {
    pub fn new(
        from: EntranceId,
        to: EntranceId,
        cost: u32,
        clearance: u32,
        capability: Capability,
    ) -> PathfindingResult<Self> {
        if from == to {
            return Err(PathfindingError::SelfEdge(from));
        }
        if cost == 0 || clearance == 0 || capability.is_empty() {
            return Err(PathfindingError::DegenerateEdge { from, to });
        }
        Ok(Self {
            from,
            to,
            cost,
            clearance,
            capability,
        })
    }

    /// Whether an agent of size `clearance` moving with `capability` may use
    /// this edge.
    #[inline]
    pub fn permits(&self, clearance: u32, capability: Capability) -> bool {
        self.clearance >= clearance && capability.contains_all(self.capability)
    }

    /// Whether this edge makes `other` (between the same endpoints)
    /// redundant: usable by everyone who could use `other`, at no higher
    /// cost.
    fn dominates(&self, other: &Edge) -> bool {
        self.to == other.to
            && other.capability.contains_all(self.capability)
            && self.clearance >= other.clearance
            && self.cost <= other.cost
    }
}

/// A connected area of walkable tiles bounded by entrances.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Section {
    id: SectionId,
    tiles: Vec<Position>,
    entrances: Vec<EntranceId>,
}

impl Section {
    pub fn id(&self) -> SectionId {
        self.id
    }

    /// Tiles of the section. Entrance tiles are only listed for sections
    /// created around an isolated entrance.
    pub fn tiles(&self) -> &[Position] {
        &self.tiles
    }

    /// Entrances bordering the section.
    pub fn entrances(&self) -> &[EntranceId] {
        &self.entrances
    }
}

/// A chokepoint tile and its outgoing edges.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entrance {
    id: EntranceId,
    pos: Position,
    sections: Vec<SectionId>,
    edges: Vec<Edge>,
    temporary: bool,
}

impl Entrance {
    pub fn id(&self) -> EntranceId {
        self.id
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    /// The section the entrance tile itself is filed under.
    pub fn home(&self) -> SectionId {
        self.sections[0]
    }

    /// Every section the entrance borders, home section first.
    pub fn sections(&self) -> &[SectionId] {
        &self.sections
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Whether the entrance is a search endpoint inserted for a single
    /// hierarchical search.
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }
}

// ---------------------------------------------------------------------------
// LevelGraph
// ---------------------------------------------------------------------------

/// Sections, entrances and edges of one level.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelGraph {
    z: i32,
    width: i32,
    height: i32,
    sections: Vec<Section>,
    entrances: Vec<Entrance>,
    section_of: Vec<Option<SectionId>>,
    entrance_of: Vec<Option<EntranceId>>,
}

impl LevelGraph {
    fn empty(z: i32, width: i32, height: i32) -> Self {
        let len = (width * height) as usize;
        Self {
            z,
            width,
            height,
            sections: Vec::new(),
            entrances: Vec::new(),
            section_of: vec![None; len],
            entrance_of: vec![None; len],
        }
    }

    #[inline]
    fn idx(&self, pos: Position) -> Option<usize> {
        if pos.z != self.z || pos.x < 0 || pos.y < 0 || pos.x >= self.width || pos.y >= self.height
        {
            return None;
        }
        Some((pos.y * self.width + pos.x) as usize)
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn entrances(&self) -> &[Entrance] {
        &self.entrances
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(id.index())
    }

    pub fn entrance(&self, id: EntranceId) -> Option<&Entrance> {
        self.entrances.get(id.index())
    }

    /// Section `pos` is filed under. Entrance tiles report their home section.
    pub fn section_at(&self, pos: Position) -> Option<SectionId> {
        self.idx(pos).and_then(|i| self.section_of[i])
    }

    /// Entrance on `pos`, if any.
    pub fn entrance_at(&self, pos: Position) -> Option<EntranceId> {
        self.idx(pos).and_then(|i| self.entrance_of[i])
    }

    /// Every section `pos` belongs to: all bordered sections for an
    /// entrance tile, the single containing section otherwise.
    pub fn sections_at(&self, pos: Position) -> Vec<SectionId> {
        match self.entrance_at(pos).and_then(|id| self.entrance(id)) {
            Some(e) => e.sections.clone(),
            None => self.section_at(pos).into_iter().collect(),
        }
    }

    /// Whether `a` and `b` belong to a common section.
    pub fn shares_section(&self, a: Position, b: Position) -> bool {
        let sb = self.sections_at(b);
        self.sections_at(a).iter().any(|s| sb.contains(s))
    }

    /// Whether `pos` is a non-entrance tile of `section`.
    #[inline]
    pub fn is_interior(&self, pos: Position, section: SectionId) -> bool {
        self.idx(pos)
            .is_some_and(|i| self.section_of[i] == Some(section) && self.entrance_of[i].is_none())
    }

    /// Total number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.entrances.iter().map(|e| e.edges.len()).sum()
    }

    /// Number of temporary entrances currently present.
    pub fn temporary_count(&self) -> usize {
        self.entrances.iter().filter(|e| e.temporary).count()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    fn build(
        map: &TileMap,
        z: i32,
        local: &mut LocalSearch,
        config: &NavConfig,
    ) -> PathfindingResult<Self> {
        let mut graph = Self::empty(z, map.width(), map.height());
        let found = entrances::detect(map, z, config.collapse_entrances);
        for &pos in &found {
            if let Some(i) = graph.idx(pos) {
                graph.entrance_of[i] = Some(EntranceId(u32::MAX));
            }
        }
        graph.flood_sections(map);
        for pos in found {
            graph.attach_entrance(map, pos);
        }
        graph.price_edges(map, local, config)?;
        Ok(graph)
    }

    fn flood_sections(&mut self, map: &TileMap) {
        let mut stack = Vec::new();
        for seed in map.level_positions(self.z) {
            let Some(si) = self.idx(seed) else {
                continue;
            };
            if self.section_of[si].is_some()
                || self.entrance_of[si].is_some()
                || !map.walkable(seed, STRUCTURAL)
            {
                continue;
            }
            let id = SectionId(self.sections.len() as u32);
            let mut tiles = vec![seed];
            self.section_of[si] = Some(id);
            stack.clear();
            stack.push(seed);
            while let Some(cp) = stack.pop() {
                for dir in Direction::ALL {
                    let np = cp.step(dir);
                    let Some(ni) = self.idx(np) else {
                        continue;
                    };
                    if self.section_of[ni].is_some()
                        || self.entrance_of[ni].is_some()
                        || !map.can_move_to(cp, np, dir, 1, STRUCTURAL)
                    {
                        continue;
                    }
                    self.section_of[ni] = Some(id);
                    tiles.push(np);
                    stack.push(np);
                }
            }
            self.sections.push(Section {
                id,
                tiles,
                entrances: Vec::new(),
            });
        }
    }

    fn attach_entrance(&mut self, map: &TileMap, pos: Position) {
        let id = EntranceId(self.entrances.len() as u32);
        let mut sections = Vec::new();
        for dir in Direction::ALL {
            let np = pos.step(dir);
            if !map.can_move_to(pos, np, dir, 1, STRUCTURAL) {
                continue;
            }
            let Some(ni) = self.idx(np) else {
                continue;
            };
            if self.entrance_of[ni].is_some() {
                continue;
            }
            if let Some(s) = self.section_of[ni] {
                if !sections.contains(&s) {
                    sections.push(s);
                }
            }
        }
        if sections.is_empty() {
            let s = SectionId(self.sections.len() as u32);
            self.sections.push(Section {
                id: s,
                tiles: vec![pos],
                entrances: Vec::new(),
            });
            sections.push(s);
        }
        for &s in &sections {
            self.sections[s.index()].entrances.push(id);
        }
        if let Some(i) = self.idx(pos) {
            self.section_of[i] = Some(sections[0]);
            self.entrance_of[i] = Some(id);
        }
        self.entrances.push(Entrance {
            id,
            pos,
            sections,
            edges: Vec::new(),
            temporary: false,
        });
    }

    fn price_edges(
        &mut self,
        map: &TileMap,
        local: &mut LocalSearch,
        config: &NavConfig,
    ) -> PathfindingResult<()> {
        for s in 0..self.sections.len() {
            let section = SectionId(s as u32);
            let members = self.sections[s].entrances.clone();
            for (i, &a) in members.iter().enumerate() {
                for &b in &members[i + 1..] {
                    let priced = self.price_pair(map, local, section, a, b, config)?;
                    for (cost, clearance, cap) in priced {
                        self.connect_unless_dominated(a, b, cost, clearance, cap)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Candidate edges between `a` and `b` through `section`, as
    /// `(cost, clearance, capability)`.
    ///
    /// For each capability this is the path at the largest clearance that
    /// still connects the pair, plus the clearance-1 path when that one is
    /// strictly cheaper.
    fn price_pair(
        &self,
        map: &TileMap,
        local: &mut LocalSearch,
        section: SectionId,
        a: EntranceId,
        b: EntranceId,
        config: &NavConfig,
    ) -> PathfindingResult<Vec<(u32, u32, Capability)>> {
        let (pa, pb) = (self.entrances[a.index()].pos, self.entrances[b.index()].pos);
        let allow = |q: Position| self.is_interior(q, section);
        let costs = config.edge_costs;
        let mut out = Vec::new();
        for cap in Capability::NON_EMPTY {
            let top = map.clearance(pa, cap).min(map.clearance(pb, cap));
            if top == 0 {
                continue;
            }
            let Some(base) = local.search_within(map, pa, pb, 1, cap, costs, &allow)? else {
                continue;
            };
            let (mut lo, mut lo_cost, mut hi) = (1, base.cost(), top);
            while lo < hi {
                let mid = lo + (hi - lo).div_ceil(2);
                match local.search_within(map, pa, pb, mid, cap, costs, &allow)? {
                    Some(path) => {
                        lo = mid;
                        lo_cost = path.cost();
                    }
                    None => hi = mid - 1,
                }
            }
            if lo > 1 && lo_cost > base.cost() {
                out.push((base.cost(), 1, cap));
            }
            out.push((lo_cost, lo, cap));
        }
        Ok(out)
    }

    fn connect_unless_dominated(
        &mut self,
        a: EntranceId,
        b: EntranceId,
        cost: u32,
        clearance: u32,
        cap: Capability,
    ) -> PathfindingResult<()> {
        let forward = Edge::new(a, b, cost, clearance, cap)?;
        if self.entrances[a.index()]
            .edges
            .iter()
            .any(|e| e.dominates(&forward))
        {
            trace!("edge {a} -> {b} ({cap}, clearance {clearance}) is dominated");
            return Ok(());
        }
        let backward = Edge::new(b, a, cost, clearance, cap)?;
        self.entrances[a.index()]
            .edges
            .retain(|e| !forward.dominates(e));
        self.entrances[b.index()]
            .edges
            .retain(|e| !backward.dominates(e));
        self.connect(a, b, cost, clearance, cap)
    }

    /// Add edges in both directions between `a` and `b`.
    pub fn connect(
        &mut self,
        a: EntranceId,
        b: EntranceId,
        cost: u32,
        clearance: u32,
        cap: Capability,
    ) -> PathfindingResult<()> {
        self.add_edge(Edge::new(a, b, cost, clearance, cap)?)?;
        self.add_edge(Edge::new(b, a, cost, clearance, cap)?)
    }

    /// Add a single directed edge.
    pub fn add_edge(&mut self, edge: Edge) -> PathfindingResult<()> {
        for id in [edge.from, edge.to] {
            if id.index() >= self.entrances.len() {
                return Err(PathfindingError::UnknownEntrance { id, level: self.z });
            }
        }
        self.entrances[edge.from.index()].edges.push(edge);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Temporary entrances
    // -----------------------------------------------------------------------

    /// Insert a temporary entrance on the non-entrance tile `pos`, filed
    /// under the section containing it. The new entrance has no edges.
    pub fn insert_temporary_entrance(&mut self, pos: Position) -> PathfindingResult<EntranceId> {
        let i = self.idx(pos).ok_or(MapError::OutOfBounds(pos))?;
        if self.entrance_of[i].is_some() {
            return Err(PathfindingError::AlreadyEntrance(pos));
        }
        let home = self.section_of[i].ok_or(PathfindingError::NoSection(pos))?;
        let id = EntranceId(self.entrances.len() as u32);
        self.entrances.push(Entrance {
            id,
            pos,
            sections: vec![home],
            edges: Vec::new(),
            temporary: true,
        });
        self.sections[home.index()].entrances.push(id);
        self.entrance_of[i] = Some(id);
        trace!("temporary entrance {id} at {pos}");
        Ok(id)
    }

    /// Remove a temporary entrance together with every edge touching it.
    ///
    /// Entrances inserted after `id` are renumbered down by one.
    pub fn remove_temporary_entrance(&mut self, id: EntranceId) -> PathfindingResult<()> {
        if !self.entrance(id).is_some_and(|e| e.temporary) {
            return Err(PathfindingError::ForeignEntrance { id, level: self.z });
        }
        let removed = self.entrances.remove(id.index());
        for s in &removed.sections {
            self.sections[s.index()].entrances.retain(|&e| e != id);
        }
        if let Some(i) = self.idx(removed.pos) {
            self.entrance_of[i] = None;
        }
        for e in &mut self.entrances {
            e.edges.retain(|edge| edge.to != id);
        }

        for k in id.index()..self.entrances.len() {
            let renumbered = EntranceId(k as u32);
            self.entrances[k].id = renumbered;
            if let Some(i) = self.idx(self.entrances[k].pos) {
                self.entrance_of[i] = Some(renumbered);
            }
        }
        let shift = |e: EntranceId| if e.0 > id.0 { EntranceId(e.0 - 1) } else { e };
        for e in &mut self.entrances {
            for edge in &mut e.edges {
                edge.from = shift(edge.from);
                edge.to = shift(edge.to);
            }
        }
        for s in &mut self.sections {
            for e in &mut s.entrances {
                *e = shift(*e);
            }
        }
        trace!("removed temporary entrance {id} at {}", removed.pos);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NavigationMap
// ---------------------------------------------------------------------------

/// Navigation graphs of every level of a map.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavigationMap {
    levels: Vec<LevelGraph>,
}

impl NavigationMap {
    /// An empty navigation map sized for `map`. Call
    /// [`rebuild_all`](Self::rebuild_all) before searching.
    pub fn new(map: &TileMap) -> Self {
        Self {
            levels: (0..map.depth())
                .map(|z| LevelGraph::empty(z, map.width(), map.height()))
                .collect(),
        }
    }

    /// Build the navigation graph of every level from scratch.
    ///
    /// Clearance must already be up to date on `map`.
    pub fn build(
        map: &TileMap,
        local: &mut LocalSearch,
        config: &NavConfig,
    ) -> PathfindingResult<Self> {
        let mut nav = Self::new(map);
        nav.rebuild_all(map, local, config)?;
        Ok(nav)
    }

    pub fn rebuild_all(
        &mut self,
        map: &TileMap,
        local: &mut LocalSearch,
        config: &NavConfig,
    ) -> PathfindingResult<()> {
        for z in 0..map.depth() {
            self.rebuild_level(map, z, local, config)?;
        }
        Ok(())
    }

    /// Recompute entrances, sections and edges of level `z`. Temporary
    /// entrances on that level are discarded.
    pub fn rebuild_level(
        &mut self,
        map: &TileMap,
        z: i32,
        local: &mut LocalSearch,
        config: &NavConfig,
    ) -> PathfindingResult<()> {
        if z < 0 || z >= map.depth() {
            return Err(PathfindingError::UnknownLevel(z));
        }
        let graph = LevelGraph::build(map, z, local, config)?;
        debug!(
            "level {z}: {} sections, {} entrances, {} edges",
            graph.sections.len(),
            graph.entrances.len(),
            graph.edge_count()
        );
        let zi = z as usize;
        if zi < self.levels.len() {
            self.levels[zi] = graph;
        } else {
            while self.levels.len() < zi {
                let missing = self.levels.len() as i32;
                self.levels
                    .push(LevelGraph::empty(missing, map.width(), map.height()));
            }
            self.levels.push(graph);
        }
        Ok(())
    }

    /// Number of levels.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, z: i32) -> PathfindingResult<&LevelGraph> {
        usize::try_from(z)
            .ok()
            .and_then(|i| self.levels.get(i))
            .ok_or(PathfindingError::UnknownLevel(z))
    }

    pub fn level_mut(&mut self, z: i32) -> PathfindingResult<&mut LevelGraph> {
        usize::try_from(z)
            .ok()
            .and_then(|i| self.levels.get_mut(i))
            .ok_or(PathfindingError::UnknownLevel(z))
    }

    /// Section `pos` is filed under.
    pub fn section_at(&self, pos: Position) -> Option<SectionId> {
        self.level(pos.z).ok()?.section_at(pos)
    }

    /// Entrance on `pos`, if any.
    pub fn entrance_at(&self, pos: Position) -> Option<EntranceId> {
        self.level(pos.z).ok()?.entrance_at(pos)
    }

    /// Whether two positions of the same level share a section.
    pub fn shares_section(&self, a: Position, b: Position) -> bool {
        a.z == b.z && self.level(a.z).is_ok_and(|g| g.shares_section(a, b))
    }

    pub fn insert_temporary_entrance(&mut self, pos: Position) -> PathfindingResult<EntranceId> {
        self.level_mut(pos.z)?.insert_temporary_entrance(pos)
    }

    pub fn remove_temporary_entrance(&mut self, z: i32, id: EntranceId) -> PathfindingResult<()> {
        self.level_mut(z)?.remove_temporary_entrance(id)
    }

    /// Total number of sections over all levels.
    pub fn section_count(&self) -> usize {
        self.levels.iter().map(|g| g.sections.len()).sum()
    }

    /// Total number of entrances over all levels.
    pub fn entrance_count(&self) -> usize {
        self.levels.iter().map(|g| g.entrances.len()).sum()
    }

    /// Total number of directed edges over all levels.
    pub fn edge_count(&self) -> usize {
        self.levels.iter().map(LevelGraph::edge_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clearance::ClearanceCalculator;

    fn built(levels: &[&str], config: &NavConfig) -> (TileMap, NavigationMap) {
        let mut m = TileMap::from_ascii(levels).unwrap();
        for z in 0..m.depth() {
            ClearanceCalculator::compute_all(&mut m, z);
        }
        let nav = NavigationMap::build(&m, &mut LocalSearch::new(), config).unwrap();
        (m, nav)
    }

    fn p(x: i32, y: i32) -> Position {
        Position::new(x, y, 0)
    }

    const DOORWAY: &str = "
        #########
        #...#...#
        #.......#
        #...#...#
        #########
    ";

    const CORRIDOR: &str = "
        ###########
        #...###...#
        #.........#
        #...###...#
        ###########
    ";

    #[test]
    fn doorway_joins_two_sections() {
        let (_, nav) = built(&[DOORWAY], &NavConfig::default());
        let g = nav.level(0).unwrap();
        assert_eq!(g.entrances().len(), 1);
        let door = &g.entrances()[0];
        assert_eq!(door.pos(), p(4, 2));
        assert_eq!(door.sections().len(), 2);
        assert_eq!(g.sections().len(), 2);
        assert_eq!(g.edge_count(), 0);
        assert!(g.shares_section(p(1, 1), p(4, 2)));
        assert!(g.shares_section(p(7, 3), p(4, 2)));
        assert!(!g.shares_section(p(1, 1), p(7, 3)));
    }

    #[test]
    fn open_room_is_one_section_without_entrances() {
        let (_, nav) = built(
            &["
            ########
            #......#
            #......#
            #......#
            #......#
            ########
        "],
            &NavConfig::default(),
        );
        let g = nav.level(0).unwrap();
        assert!(g.entrances().is_empty());
        assert_eq!(g.sections().len(), 1);
        assert_eq!(g.sections()[0].tiles().len(), 24);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn collapse_can_be_disabled() {
        let config = NavConfig::default().with_collapse_entrances(false);
        let (_, nav) = built(&[DOORWAY], &config);
        let g = nav.level(0).unwrap();
        let at: Vec<_> = g.entrances().iter().map(Entrance::pos).collect();
        assert_eq!(at, vec![p(3, 2), p(5, 2)]);
        // The doorway tile between them is a section of its own, crossed by
        // a walking and a flying edge in each direction.
        assert_eq!(g.sections().len(), 3);
        assert_eq!(g.edge_count(), 4);
    }

    #[test]
    fn corridor_edges_carry_cost_clearance_and_capability() {
        let (_, nav) = built(&[CORRIDOR], &NavConfig::default());
        let g = nav.level(0).unwrap();
        assert_eq!(g.sections().len(), 3);
        let a = g.entrance_at(p(3, 2)).unwrap();
        let b = g.entrance_at(p(7, 2)).unwrap();
        let edges = g.entrance(a).unwrap().edges();
        // One walking and one flying edge; the walk-or-fly one is dominated.
        assert_eq!(edges.len(), 2);
        for e in edges {
            assert_eq!((e.to, e.cost, e.clearance), (b, 4, 1));
        }
        let caps: Vec<_> = edges.iter().map(|e| e.capability).collect();
        assert!(caps.contains(&Capability::WALK));
        assert!(caps.contains(&Capability::FLY));
        // Edges are stored in both directions.
        assert_eq!(g.entrance(b).unwrap().edges().len(), 2);
        assert!(g.entrance(b).unwrap().edges().iter().all(|e| e.to == a));
    }

    #[test]
    fn every_walkable_tile_is_in_exactly_one_section() {
        let (m, nav) = built(&[CORRIDOR], &NavConfig::default());
        let g = nav.level(0).unwrap();
        let mut seen = vec![0; m.level_len()];
        for s in g.sections() {
            for &t in s.tiles() {
                seen[m.level_index(t).unwrap()] += 1;
                assert_eq!(g.section_at(t), Some(s.id()));
            }
        }
        for pos in m.level_positions(0) {
            let i = m.level_index(pos).unwrap();
            let walkable = m.walkable(pos, STRUCTURAL);
            if g.entrance_at(pos).is_some() {
                assert_eq!(seen[i], 0);
                assert!(g.section_at(pos).is_some());
            } else {
                assert_eq!(seen[i], usize::from(walkable), "{pos}");
            }
        }
    }

    #[test]
    fn edges_respect_endpoint_clearance_and_are_not_dominated() {
        let (m, nav) = built(
            &["
            ############
            #..#.......#
            #..........#
            #..#.......#
            ####.......#
            #..#.......#
            #..........#
            #..#.......#
            ############
        "],
            &NavConfig::default(),
        );
        let g = nav.level(0).unwrap();
        for e in g.entrances() {
            for edge in e.edges() {
                let target = g.entrance(edge.to).unwrap().pos();
                assert!(edge.clearance <= m.clearance(e.pos(), edge.capability));
                assert!(edge.clearance <= m.clearance(target, edge.capability));
                // No edge is dominated by a sibling.
                assert!(!e
                    .edges()
                    .iter()
                    .any(|other| other != edge && other.dominates(edge)));
            }
        }
    }

    #[test]
    fn temporary_entrances_come_and_go() {
        let (_, mut nav) = built(&[CORRIDOR], &NavConfig::default());
        let before = nav.clone();
        let g = nav.level_mut(0).unwrap();
        let door = g.entrance_at(p(3, 2)).unwrap();
        let s = g.insert_temporary_entrance(p(1, 1)).unwrap();
        let t = g.insert_temporary_entrance(p(2, 3)).unwrap();
        g.connect(s, door, 2, 1, Capability::WALK).unwrap();
        g.connect(t, door, 1, 1, Capability::WALK).unwrap();
        g.connect(s, t, 2, 1, Capability::WALK).unwrap();
        assert_eq!(g.temporary_count(), 2);
        assert_eq!(g.entrance_at(p(1, 1)), Some(s));

        // Removing the earlier one renumbers the later one.
        g.remove_temporary_entrance(s).unwrap();
        assert_eq!(g.entrance_at(p(2, 3)), Some(s));
        assert!(g.entrance(s).unwrap().edges().iter().all(|e| e.to == door));
        g.remove_temporary_entrance(s).unwrap();
        assert_eq!(nav, before);
    }

    #[test]
    fn temporary_entrance_faults() {
        let (_, mut nav) = built(&[CORRIDOR], &NavConfig::default());
        let g = nav.level_mut(0).unwrap();
        let door = g.entrance_at(p(3, 2)).unwrap();
        assert_eq!(
            g.insert_temporary_entrance(p(3, 2)),
            Err(PathfindingError::AlreadyEntrance(p(3, 2)))
        );
        assert_eq!(
            g.insert_temporary_entrance(p(0, 0)),
            Err(PathfindingError::NoSection(p(0, 0)))
        );
        assert_eq!(
            g.remove_temporary_entrance(door),
            Err(PathfindingError::ForeignEntrance { id: door, level: 0 })
        );
        assert_eq!(
            g.connect(door, door, 1, 1, Capability::WALK),
            Err(PathfindingError::SelfEdge(door))
        );
        assert_eq!(
            nav.level(3).unwrap_err(),
            PathfindingError::UnknownLevel(3)
        );
    }

    #[test]
    fn entrances_are_listed_by_their_sections() {
        let mut m = TileMap::from_ascii(&["
            #######
            #.#.#.#
            ##...##
            #.....#
            #######
        "])
        .unwrap();
        ClearanceCalculator::compute_all(&mut m, 0);
        let nav = NavigationMap::build(&m, &mut LocalSearch::new(), &NavConfig::default()).unwrap();
        let g = nav.level(0).unwrap();
        for e in g.entrances() {
            assert!(!e.sections().is_empty());
            for s in e.sections() {
                assert!(g.section(*s).unwrap().entrances().contains(&e.id()));
            }
        }
    }

    #[test]
    fn edge_validation_and_permissions() {
        let e = Edge::new(EntranceId(0), EntranceId(1), 3, 2, Capability::WALK).unwrap();
        assert!(e.permits(2, Capability::WALK));
        assert!(e.permits(1, Capability::WALK_OR_FLY));
        assert!(!e.permits(3, Capability::WALK));
        assert!(!e.permits(1, Capability::FLY));
        assert!(matches!(
            Edge::new(EntranceId(0), EntranceId(1), 0, 2, Capability::WALK),
            Err(PathfindingError::DegenerateEdge { .. })
        ));
        assert!(matches!(
            Edge::new(EntranceId(0), EntranceId(1), 3, 2, Capability::NONE),
            Err(PathfindingError::DegenerateEdge { .. })
        ));
    }
}
