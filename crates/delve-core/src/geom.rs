//! Geometry primitives: [`Position`], [`Direction`] and the [`Sides`] mask.
//!
//! Levels are stacked along `z` (0 is the topmost level, larger values are
//! deeper). Within a level `x` grows east and `y` grows south.

use std::fmt;
use std::ops::{BitAnd, BitOr};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A tile position in the 3-D map.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    /// Create a new position.
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Return a position shifted by (dx, dy) on the same level.
    #[inline]
    pub const fn shift(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z,
        }
    }

    /// The neighbouring position one step in `dir`.
    #[inline]
    pub const fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.offset();
        self.shift(dx, dy)
    }

    /// The position directly above (one level up).
    #[inline]
    pub const fn above(self) -> Self {
        Self {
            x: self.x,
            y: self.y,
            z: self.z - 1,
        }
    }

    /// The position directly below (one level down).
    #[inline]
    pub const fn below(self) -> Self {
        Self {
            x: self.x,
            y: self.y,
            z: self.z + 1,
        }
    }

    /// Planar Chebyshev (L∞) distance, ignoring `z`.
    #[inline]
    pub fn chebyshev(self, other: Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// The direction of a single 8-way step from `self` to `other`, if the
    /// two positions are planar neighbours.
    pub fn direction_to(self, other: Self) -> Option<Direction> {
        if self.z != other.z {
            return None;
        }
        let d = (other.x - self.x, other.y - self.y);
        Direction::ALL.into_iter().find(|dir| dir.offset() == d)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// One of the eight compass directions, in clockwise compass order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    /// All directions in compass order, starting at north.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// The four orthogonal directions (north, east, south, west).
    pub const ORTHOGONAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Index into [`Direction::ALL`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// (dx, dy) of a single step.
    #[inline]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    /// Whether this is one of the four diagonal directions.
    #[inline]
    pub const fn is_diagonal(self) -> bool {
        self.index() % 2 == 1
    }

    /// The direction pointing the other way.
    #[inline]
    pub const fn opposite(self) -> Self {
        Self::ALL[(self.index() + 4) % 8]
    }

    /// The two orthogonal components of a diagonal direction
    /// (`NorthEast` → `(North, East)`). `None` for orthogonal directions.
    #[inline]
    pub const fn flanks(self) -> Option<(Direction, Direction)> {
        if self.is_diagonal() {
            Some((Self::ALL[self.index() - 1], Self::ALL[(self.index() + 1) % 8]))
        } else {
            None
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "N",
            Direction::NorthEast => "NE",
            Direction::East => "E",
            Direction::SouthEast => "SE",
            Direction::South => "S",
            Direction::SouthWest => "SW",
            Direction::West => "W",
            Direction::NorthWest => "NW",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Sides
// ---------------------------------------------------------------------------

/// Bitmask with one bit per [`Direction`].
///
/// Orthogonal bits describe walls on a tile's edges; diagonal bits describe
/// its corners.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sides(pub u8);

impl Sides {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0xFF);
    /// N, E, S and W bits.
    pub const WALLS: Self = Self(0b0101_0101);
    /// NE, SE, SW and NW bits.
    pub const CORNERS: Self = Self(0b1010_1010);

    /// The mask with only the bit for `dir` set.
    #[inline]
    pub const fn of(dir: Direction) -> Self {
        Self(1 << dir.index())
    }

    /// Whether the bit for `dir` is set.
    #[inline]
    pub const fn has(self, dir: Direction) -> bool {
        self.0 & (1 << dir.index()) != 0
    }

    /// Return the mask with the bit for `dir` set.
    #[inline]
    pub const fn with(self, dir: Direction) -> Self {
        Self(self.0 | (1 << dir.index()))
    }

    /// Return the mask with the bit for `dir` cleared.
    #[inline]
    pub const fn without(self, dir: Direction) -> Self {
        Self(self.0 & !(1 << dir.index()))
    }

    /// Whether the mask is empty.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Sides {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for Sides {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn position_and_direction_round_trip() {
        let p = Position::new(3, -2, 5);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(serde_json::from_str::<Position>(&json).unwrap(), p);
        for dir in Direction::ALL {
            let json = serde_json::to_string(&dir).unwrap();
            assert_eq!(serde_json::from_str::<Direction>(&json).unwrap(), dir);
        }
    }

    #[test]
    fn sides_round_trip() {
        let s = Sides::NONE.with(Direction::North).with(Direction::SouthEast);
        let back: Sides = serde_json::from_str(&serde_json::to_string(&s).unwrap()).unwrap();
        assert_eq!(back, s);
    }
}
