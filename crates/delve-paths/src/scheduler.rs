//! FIFO search scheduling.
//!
//! Searches are queued through a [`Submitter`] and executed one per
//! [`Scheduler::tick`], in submission order. Each search reports to a
//! [`SearchListener`]: either a closure, or the slot behind a
//! [`SearchTicket`] that the submitter polls later.
//!
//! The queue is shared (`Rc<RefCell<..>>`) so that work running inside a
//! tick, such as a hierarchical path requesting its first segments, can
//! submit follow-up searches. Everything here is single-threaded.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use log::{debug, trace};

use delve_core::{Capability, Position};

use crate::error::PathfindingResult;
use crate::path::Route;
use crate::request::SearchRequest;

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// Receives the outcome of a scheduled search.
pub trait SearchListener {
    /// Called exactly once, with `None` when no path exists or the search
    /// could not run.
    fn search_finished(&mut self, request: &SearchRequest, route: Option<Route>);

    /// Abandoned listeners have their search skipped without running it.
    fn is_abandoned(&self) -> bool {
        false
    }
}

impl<F> SearchListener for F
where
    F: FnMut(&SearchRequest, Option<Route>),
{
    fn search_finished(&mut self, request: &SearchRequest, route: Option<Route>) {
        self(request, route)
    }
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

/// Observable state of a [`SearchTicket`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TicketState {
    /// The search has not run yet.
    Pending,
    /// A route was found and can be taken.
    Found,
    /// The search ran and found nothing.
    Failed,
    /// The found route was already taken.
    Taken,
}

#[derive(Debug)]
enum Slot {
    Pending,
    Found(Route),
    Failed,
    Taken,
}

/// Handle to the result of a scheduled search.
///
/// Dropping the ticket abandons the search: if it has not run yet, the
/// scheduler skips it.
#[derive(Debug)]
pub struct SearchTicket {
    slot: Rc<RefCell<Slot>>,
}

impl SearchTicket {
    pub fn state(&self) -> TicketState {
        match &*self.slot.borrow() {
            Slot::Pending => TicketState::Pending,
            Slot::Found(_) => TicketState::Found,
            Slot::Failed => TicketState::Failed,
            Slot::Taken => TicketState::Taken,
        }
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.state() == TicketState::Pending
    }

    /// Take the found route, leaving the ticket in [`TicketState::Taken`].
    /// Returns `None` in every other state.
    pub fn take(&self) -> Option<Route> {
        let mut slot = self.slot.borrow_mut();
        if !matches!(*slot, Slot::Found(_)) {
            return None;
        }
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Found(route) => Some(route),
            _ => None,
        }
    }
}

struct TicketListener {
    slot: Weak<RefCell<Slot>>,
}

impl SearchListener for TicketListener {
    fn search_finished(&mut self, _request: &SearchRequest, route: Option<Route>) {
        if let Some(slot) = self.slot.upgrade() {
            *slot.borrow_mut() = match route {
                Some(route) => Slot::Found(route),
                None => Slot::Failed,
            };
        }
    }

    fn is_abandoned(&self) -> bool {
        self.slot.strong_count() == 0
    }
}

// ---------------------------------------------------------------------------
// Submitter
// ---------------------------------------------------------------------------

struct Job {
    request: SearchRequest,
    listener: Box<dyn SearchListener>,
}

/// Cloneable handle onto a [`Scheduler`]'s queue.
#[derive(Clone, Default)]
pub struct Submitter {
    queue: Rc<RefCell<VecDeque<Job>>>,
}

impl Submitter {
    /// Queue `request`; `listener` is called once it has run.
    pub fn submit(&self, request: SearchRequest, listener: impl SearchListener + 'static) {
        trace!("queued search {request}");
        self.queue.borrow_mut().push_back(Job {
            request,
            listener: Box::new(listener),
        });
    }

    /// Queue `request` and return a ticket holding its result.
    pub fn submit_ticket(&self, request: SearchRequest) -> SearchTicket {
        let slot = Rc::new(RefCell::new(Slot::Pending));
        self.submit(
            request,
            TicketListener {
                slot: Rc::downgrade(&slot),
            },
        );
        SearchTicket { slot }
    }

    /// Queue a tile-level search between two positions of one level.
    pub fn submit_local(
        &self,
        start: Position,
        goal: Position,
        clearance: u32,
        capability: Capability,
    ) -> PathfindingResult<SearchTicket> {
        let request = SearchRequest::local(start, goal, clearance, capability)?;
        Ok(self.submit_ticket(request))
    }

    /// Number of queued searches.
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Whether no search is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Drop every queued search whose listener is abandoned. Returns how
    /// many were dropped.
    pub fn purge_abandoned(&self) -> usize {
        let mut queue = self.queue.borrow_mut();
        let before = queue.len();
        queue.retain(|job| !job.listener.is_abandoned());
        before - queue.len()
    }

    fn pop(&self) -> Option<Job> {
        self.queue.borrow_mut().pop_front()
    }
}

impl fmt::Debug for Submitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submitter")
            .field("queued", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Runs one queued search on behalf of the [`Scheduler`].
pub trait SearchExecutor {
    /// Execute `request`. `submitter` may be used to queue follow-up work.
    fn execute(&mut self, request: &SearchRequest, submitter: &Submitter) -> Option<Route>;
}

/// FIFO queue of searches, drained one search per tick.
#[derive(Debug, Default)]
pub struct Scheduler {
    submitter: Submitter,
    executed: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle for queueing searches.
    pub fn submitter(&self) -> Submitter {
        self.submitter.clone()
    }

    /// Queue `request` with a listener.
    pub fn submit(&self, request: SearchRequest, listener: impl SearchListener + 'static) {
        self.submitter.submit(request, listener);
    }

    /// Queue `request` and return a ticket holding its result.
    pub fn submit_ticket(&self, request: SearchRequest) -> SearchTicket {
        self.submitter.submit_ticket(request)
    }

    /// Run the oldest live search, if any. Abandoned searches at the front
    /// of the queue are discarded without counting as the tick's search.
    ///
    /// Returns whether a search ran.
    pub fn tick(&mut self, executor: &mut impl SearchExecutor) -> bool {
        let job = loop {
            let Some(job) = self.submitter.pop() else {
                return false;
            };
            if job.listener.is_abandoned() {
                debug!("skipping abandoned search {}", job.request);
                continue;
            }
            break job;
        };
        let Job {
            request,
            mut listener,
        } = job;
        let route = executor.execute(&request, &self.submitter);
        trace!(
            "search {request} {}",
            if route.is_some() { "found a route" } else { "failed" }
        );
        self.executed += 1;
        listener.search_finished(&request, route);
        true
    }

    /// Tick until the queue is empty. Returns the number of searches run.
    pub fn run_until_idle(&mut self, executor: &mut impl SearchExecutor) -> usize {
        let mut n = 0;
        while self.tick(executor) {
            n += 1;
        }
        n
    }

    /// Number of queued searches.
    pub fn len(&self) -> usize {
        self.submitter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submitter.is_empty()
    }

    /// Total number of searches executed so far.
    pub fn executed(&self) -> u64 {
        self.executed
    }
}
