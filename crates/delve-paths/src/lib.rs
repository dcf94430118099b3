//! **delve-paths**: hierarchical, clearance-aware pathfinding for delve maps.
//!
//! Each level of a [`TileMap`](delve_core::TileMap) is split into sections
//! joined by entrance tiles. Long searches run over the entrance graph and
//! yield a [`HierarchicalPath`] whose tile segments are resolved lazily by
//! the [`Scheduler`], one search per tick. Short searches inside a section go
//! straight to the tile-level [`LocalSearch`].
//!
//! Every search is parameterized by the agent's clearance (the side of the
//! square it occupies) and its movement [`Capability`](delve_core::Capability).
//!
//! Most users only need [`Pathfinder`], which owns the map, keeps the
//! navigation data in sync with terrain edits and drives the scheduler.

pub mod clearance;
pub mod config;
mod entrances;
pub mod error;
pub mod hierarchical;
pub mod local;
pub mod navigation;
pub mod path;
pub mod pathfinder;
pub mod request;
pub mod scheduler;

pub use clearance::ClearanceCalculator;
pub use config::{CostModel, NavConfig};
pub use error::{PathfindingError, PathfindingResult};
pub use hierarchical::{AbstractPath, HierarchicalSearch, Plan};
pub use local::LocalSearch;
pub use navigation::{Edge, Entrance, EntranceId, LevelGraph, NavigationMap, Section, SectionId};
pub use path::{AnnotatedPath, HierarchicalPath, Path, Route};
pub use pathfinder::Pathfinder;
pub use request::{SearchKind, SearchRequest};
pub use scheduler::{Scheduler, SearchExecutor, SearchListener, SearchTicket, Submitter, TicketState};
