//! Paths handed to callers.
//!
//! Every search result implements [`Path`]: a cursor that yields one
//! [`Direction`] per step. [`AnnotatedPath`] is a fully resolved tile path;
//! [`HierarchicalPath`] is a list of waypoints whose segments are resolved
//! lazily by scheduled local searches, at most two segments ahead.

use std::collections::VecDeque;

use log::debug;

use delve_core::{Capability, Direction, Position};

use crate::error::{PathfindingError, PathfindingResult};
use crate::request::SearchRequest;
use crate::scheduler::{SearchTicket, Submitter, TicketState};

/// A path being followed step by step.
pub trait Path {
    fn start(&self) -> Position;

    fn goal(&self) -> Position;

    /// Whether the path can still be followed.
    fn is_valid(&self) -> bool;

    /// Mark the path as no longer usable.
    fn invalidate(&mut self);

    /// Whether a next step is available right now.
    ///
    /// `Ok(false)` means the path is either finished or waiting for a
    /// scheduled search. Fails with [`PathfindingError::InvalidPath`] once the
    /// path is invalid.
    fn has_next(&mut self) -> PathfindingResult<bool>;

    /// Consume the next step.
    fn next(&mut self) -> PathfindingResult<Direction>;

    /// Number of steps (tile paths) or segments (hierarchical paths).
    fn len(&self) -> usize;

    /// Total cost in the units of the search that produced the path.
    fn cost(&self) -> u32;
}

// ---------------------------------------------------------------------------
// AnnotatedPath
// ---------------------------------------------------------------------------

/// A resolved tile path: a start tile and the directions to follow from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotatedPath {
    start: Position,
    goal: Position,
    here: Position,
    steps: VecDeque<Direction>,
    len: usize,
    cost: u32,
    valid: bool,
}

impl AnnotatedPath {
    /// Build a path from `start` following `steps`.
    pub fn new(
        start: Position,
        steps: impl Into<VecDeque<Direction>>,
        cost: u32,
    ) -> PathfindingResult<Self> {
        let steps = steps.into();
        if steps.is_empty() {
            return Err(PathfindingError::EmptyPath);
        }
        let goal = steps.iter().fold(start, |p, &d| p.step(d));
        Ok(Self {
            start,
            goal,
            here: start,
            len: steps.len(),
            steps,
            cost,
            valid: true,
        })
    }

    /// The tile reached after the steps consumed so far.
    #[inline]
    pub fn position(&self) -> Position {
        self.here
    }

    /// Number of steps not consumed yet.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    /// Remaining steps, in order.
    pub fn steps(&self) -> impl Iterator<Item = Direction> + '_ {
        self.steps.iter().copied()
    }

    /// Tiles still to be visited, starting with the current one.
    pub fn positions(&self) -> Vec<Position> {
        let mut out = Vec::with_capacity(self.steps.len() + 1);
        let mut p = self.here;
        out.push(p);
        for &d in &self.steps {
            p = p.step(d);
            out.push(p);
        }
        out
    }
}

impl Path for AnnotatedPath {
    fn start(&self) -> Position {
        self.start
    }

    fn goal(&self) -> Position {
        self.goal
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn invalidate(&mut self) {
        self.valid = false;
    }

    fn has_next(&mut self) -> PathfindingResult<bool> {
        if !self.valid {
            return Err(PathfindingError::InvalidPath);
        }
        Ok(!self.steps.is_empty())
    }

    fn next(&mut self) -> PathfindingResult<Direction> {
        if !self.valid {
            return Err(PathfindingError::InvalidPath);
        }
        let dir = self.steps.pop_front().ok_or(PathfindingError::PathExhausted)?;
        self.here = self.here.step(dir);
        Ok(dir)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn cost(&self) -> u32 {
        self.cost
    }
}

// ---------------------------------------------------------------------------
// HierarchicalPath
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Segment {
    Waiting(SearchTicket),
    Ready(AnnotatedPath),
}

enum Progress {
    Resolved(AnnotatedPath),
    Finished,
    Lost,
}

/// A path over entrance waypoints, resolved one segment at a time.
///
/// On construction the first two segments are submitted as local searches.
/// Each time the current segment is used up, the prefetched one becomes
/// current and the segment after it is submitted. A failed segment search
/// invalidates the whole path.
#[derive(Debug)]
pub struct HierarchicalPath {
    waypoints: Vec<Position>,
    // Index into `waypoints` of the next segment end to submit.
    next_target: usize,
    current: Option<Segment>,
    prefetched: Option<SearchTicket>,
    clearance: u32,
    capability: Capability,
    cost: u32,
    valid: bool,
    submitter: Submitter,
}

impl HierarchicalPath {
    /// Start resolving a path through `waypoints` (start and goal included).
    ///
    /// `cost` is the total cost of the route over the entrance graph.
    pub fn new(
        waypoints: Vec<Position>,
        cost: u32,
        clearance: u32,
        capability: Capability,
        submitter: Submitter,
    ) -> PathfindingResult<Self> {
        if waypoints.len() < 2 {
            return Err(PathfindingError::EmptyPath);
        }
        let mut path = Self {
            waypoints,
            next_target: 1,
            current: None,
            prefetched: None,
            clearance,
            capability,
            cost,
            valid: true,
            submitter,
        };
        let first = path.submit_next()?;
        path.current = first.map(Segment::Waiting);
        path.prefetched = path.submit_next()?;
        Ok(path)
    }

    /// All waypoints, start and goal included.
    pub fn waypoints(&self) -> &[Position] {
        &self.waypoints
    }

    /// Number of segment searches submitted but not resolved yet.
    pub fn pending_searches(&self) -> usize {
        let waiting = matches!(&self.current, Some(Segment::Waiting(t)) if t.is_pending());
        let prefetched = self.prefetched.as_ref().is_some_and(SearchTicket::is_pending);
        usize::from(waiting) + usize::from(prefetched)
    }

    /// Whether the current segment is resolved and can be stepped through.
    pub fn is_ready(&self) -> bool {
        matches!(self.current, Some(Segment::Ready(_)))
    }

    fn submit_next(&mut self) -> PathfindingResult<Option<SearchTicket>> {
        if self.next_target >= self.waypoints.len() {
            return Ok(None);
        }
        let from = self.waypoints[self.next_target - 1];
        let to = self.waypoints[self.next_target];
        let request = SearchRequest::local(from, to, self.clearance, self.capability)?;
        self.next_target += 1;
        Ok(Some(self.submitter.submit_ticket(request)))
    }

    fn advance(&mut self) -> PathfindingResult<()> {
        self.current = self.prefetched.take().map(Segment::Waiting);
        if self.current.is_some() {
            self.prefetched = self.submit_next()?;
        }
        Ok(())
    }

    fn fail(&mut self) -> PathfindingError {
        debug!(
            "hierarchical path {} -> {} lost a segment",
            self.start(),
            self.goal()
        );
        self.invalidate();
        PathfindingError::InvalidPath
    }
}

impl Path for HierarchicalPath {
    fn start(&self) -> Position {
        self.waypoints[0]
    }

    fn goal(&self) -> Position {
        self.waypoints[self.waypoints.len() - 1]
    }

    fn is_valid(&self) -> bool {
        let failed = |t: &SearchTicket| t.state() == TicketState::Failed;
        self.valid
            && !matches!(&self.current, Some(Segment::Waiting(t)) if failed(t))
            && !self.prefetched.as_ref().is_some_and(failed)
    }

    fn invalidate(&mut self) {
        self.valid = false;
        self.current = None;
        self.prefetched = None;
    }

    fn has_next(&mut self) -> PathfindingResult<bool> {
        if !self.valid {
            return Err(PathfindingError::InvalidPath);
        }
        if !self.is_valid() {
            return Err(self.fail());
        }
        loop {
            let progress = match &mut self.current {
                None => return Ok(false),
                Some(Segment::Ready(seg)) => {
                    if seg.has_next()? {
                        return Ok(true);
                    }
                    Progress::Finished
                }
                Some(Segment::Waiting(ticket)) => match ticket.state() {
                    TicketState::Pending => return Ok(false),
                    TicketState::Found => match ticket.take() {
                        Some(Route::Local(seg)) => Progress::Resolved(seg),
                        _ => Progress::Lost,
                    },
                    TicketState::Failed | TicketState::Taken => Progress::Lost,
                },
            };
            match progress {
                Progress::Resolved(seg) => self.current = Some(Segment::Ready(seg)),
                Progress::Finished => self.advance()?,
                Progress::Lost => return Err(self.fail()),
            }
        }
    }

    fn next(&mut self) -> PathfindingResult<Direction> {
        if !self.has_next()? {
            return Err(if self.current.is_none() {
                PathfindingError::PathExhausted
            } else {
                PathfindingError::NotReady
            });
        }
        match &mut self.current {
            Some(Segment::Ready(seg)) => seg.next(),
            _ => Err(PathfindingError::NotReady),
        }
    }

    fn len(&self) -> usize {
        self.waypoints.len() - 1
    }

    fn cost(&self) -> u32 {
        self.cost
    }
}

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

/// The result of a search: either a tile path or a hierarchical path.
#[derive(Debug)]
pub enum Route {
    Local(AnnotatedPath),
    Hierarchical(HierarchicalPath),
}

impl Route {
    pub fn as_local(&self) -> Option<&AnnotatedPath> {
        match self {
            Route::Local(p) => Some(p),
            Route::Hierarchical(_) => None,
        }
    }

    pub fn as_hierarchical(&self) -> Option<&HierarchicalPath> {
        match self {
            Route::Hierarchical(p) => Some(p),
            Route::Local(_) => None,
        }
    }

    pub fn into_local(self) -> Option<AnnotatedPath> {
        match self {
            Route::Local(p) => Some(p),
            Route::Hierarchical(_) => None,
        }
    }

    pub fn into_hierarchical(self) -> Option<HierarchicalPath> {
        match self {
            Route::Hierarchical(p) => Some(p),
            Route::Local(_) => None,
        }
    }
}

impl Path for Route {
    fn start(&self) -> Position {
        match self {
            Route::Local(p) => p.start(),
            Route::Hierarchical(p) => p.start(),
        }
    }

    fn goal(&self) -> Position {
        match self {
            Route::Local(p) => p.goal(),
            Route::Hierarchical(p) => p.goal(),
        }
    }

    fn is_valid(&self) -> bool {
        match self {
            Route::Local(p) => p.is_valid(),
            Route::Hierarchical(p) => p.is_valid(),
        }
    }

    fn invalidate(&mut self) {
        match self {
            Route::Local(p) => p.invalidate(),
            Route::Hierarchical(p) => p.invalidate(),
        }
    }

    fn has_next(&mut self) -> PathfindingResult<bool> {
        match self {
            Route::Local(p) => p.has_next(),
            Route::Hierarchical(p) => p.has_next(),
        }
    }

    fn next(&mut self) -> PathfindingResult<Direction> {
        match self {
            Route::Local(p) => p.next(),
            Route::Hierarchical(p) => p.next(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Route::Local(p) => p.len(),
            Route::Hierarchical(p) => p.len(),
        }
    }

    fn cost(&self) -> u32 {
        match self {
            Route::Local(p) => p.cost(),
            Route::Hierarchical(p) => p.cost(),
        }
    }
}
