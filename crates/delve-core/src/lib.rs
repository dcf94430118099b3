//! **delve-core**: the tile grid underneath the delve pathfinder.
//!
//! This crate provides the terrain side of the system: geometry primitives,
//! movement capabilities, tiles with their dug-out/floor/wall state, and the
//! [`TileMap`] that answers movement queries and applies digging.
//!
//! Navigation data (clearance, sections, entrances) is computed by
//! `delve-paths`; the map only stores the clearance values it is handed.

pub mod capability;
pub mod error;
pub mod geom;
pub mod map;
pub mod tile;

pub use capability::{Capability, MovementType};
pub use error::{MapError, MapResult};
pub use geom::{Direction, Position, Sides};
pub use map::{DigOutcome, LevelPositions, TileMap};
pub use tile::Tile;
