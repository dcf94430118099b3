//! Movement capabilities: [`MovementType`] and [`Capability`].

use std::fmt;
use std::ops::BitOr;

/// A single way of getting around.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MovementType {
    /// Needs a dug-out tile with a floor.
    Walk,
    /// Needs a dug-out tile; floors are irrelevant.
    Fly,
}

impl MovementType {
    /// Every movement type, in bit order.
    pub const ALL: [MovementType; 2] = [MovementType::Walk, MovementType::Fly];

    #[inline]
    const fn bit(self) -> u8 {
        match self {
            MovementType::Walk => 1 << 0,
            MovementType::Fly => 1 << 1,
        }
    }
}

/// An immutable set of movement types.
///
/// [`contains_all`](Capability::contains_all) is the partial order used to
/// decide whether an agent may use an edge or a tile that requires some
/// capability.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Capability(u8);

impl Capability {
    pub const NONE: Self = Self(0);
    pub const WALK: Self = Self(MovementType::Walk.bit());
    pub const FLY: Self = Self(MovementType::Fly.bit());
    pub const WALK_OR_FLY: Self = Self(MovementType::Walk.bit() | MovementType::Fly.bit());

    /// Number of distinct capability values, usable as a table size indexed
    /// by [`bits`](Capability::bits).
    pub const SLOTS: usize = 4;

    /// Every non-empty capability, smallest sets first.
    pub const NON_EMPTY: [Capability; 3] =
        [Capability::WALK, Capability::FLY, Capability::WALK_OR_FLY];

    /// Build a capability from a list of movement types.
    pub fn new(types: &[MovementType]) -> Self {
        Self(types.iter().fold(0, |acc, t| acc | t.bit()))
    }

    /// Rebuild a capability from its raw bits, dropping unknown bits.
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::WALK_OR_FLY.0)
    }

    /// The raw bit pattern.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether the set is empty.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether `self` includes the movement type `t`.
    #[inline]
    pub const fn contains(self, t: MovementType) -> bool {
        self.0 & t.bit() != 0
    }

    /// Whether `self` includes every movement type of `other`.
    #[inline]
    pub const fn contains_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// The union of both sets.
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Iterate over the movement types in the set.
    pub fn iter(self) -> impl Iterator<Item = MovementType> {
        MovementType::ALL.into_iter().filter(move |t| self.contains(*t))
    }
}

impl From<MovementType> for Capability {
    fn from(t: MovementType) -> Self {
        Self(t.bit())
    }
}

impl BitOr for Capability {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for t in self.iter() {
            if !first {
                f.write_str("+")?;
            }
            first = false;
            let name = match t {
                MovementType::Walk => "walk",
                MovementType::Fly => "fly",
            };
            f.write_str(name)?;
        }
        Ok(())
    }
}
