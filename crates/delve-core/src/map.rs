//! The [`TileMap`] type, a dense 3-D grid of [`Tile`]s.
//!
//! Tiles are stored level by level, each level in row-major order. The map
//! owns terrain state (digging, floors, walls) and answers the movement
//! queries the searches need. Clearance values are stored here but computed
//! elsewhere; after any terrain change the caller is expected to recompute
//! the clearance and navigation data of the levels reported in
//! [`DigOutcome`].

use crate::capability::Capability;
use crate::error::{MapError, MapResult};
use crate::geom::{Direction, Position, Sides};
use crate::tile::Tile;

/// Levels whose terrain changed as the result of a dig.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DigOutcome {
    levels: Vec<i32>,
}

impl DigOutcome {
    /// The changed levels, in ascending order.
    pub fn levels(&self) -> &[i32] {
        &self.levels
    }

    /// Whether the dig changed nothing (the tile was already dug out).
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TileMap
// ---------------------------------------------------------------------------

/// A dense 3-D tile map.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileMap {
    width: i32,
    height: i32,
    depth: i32,
    tiles: Vec<Tile>,
}

impl TileMap {
    /// Create a map of solid, undug underground rock.
    pub fn new(width: i32, height: i32, depth: i32) -> MapResult<Self> {
        if width <= 0 || height <= 0 || depth <= 0 {
            return Err(MapError::InvalidDimensions {
                width,
                height,
                depth,
            });
        }
        let mut tiles = Vec::with_capacity((width * height * depth) as usize);
        for z in 0..depth {
            for y in 0..height {
                for x in 0..width {
                    tiles.push(Tile::solid(Position::new(x, y, z)));
                }
            }
        }
        Ok(Self {
            width,
            height,
            depth,
            tiles,
        })
    }

    /// Parse a map from ASCII art, one string per level (top level first).
    ///
    /// | glyph | tile |
    /// |---|---|
    /// | `#` | undug rock |
    /// | `.` | dug out, with floor |
    /// | `_` | dug out, no floor (only flyers can use it) |
    /// | `~` | dug out, with floor, not underground |
    ///
    /// Blank lines and surrounding whitespace are ignored. Floors are taken
    /// as written; walls are reflowed from the dug state.
    pub fn from_ascii(levels: &[&str]) -> MapResult<Self> {
        let rows: Vec<Vec<&str>> = levels
            .iter()
            .map(|l| l.lines().map(str::trim).filter(|r| !r.is_empty()).collect())
            .collect();
        let height = rows.first().map_or(0, Vec::len);
        let width = rows
            .first()
            .and_then(|r| r.first())
            .map_or(0, |r| r.chars().count());
        let mut map = Self::new(width as i32, height as i32, levels.len() as i32)?;

        for (z, level) in rows.iter().enumerate() {
            if level.len() != height {
                return Err(MapError::LevelHeightMismatch {
                    level: z,
                    got: level.len(),
                    expected: height,
                });
            }
            for (y, row) in level.iter().enumerate() {
                let got = row.chars().count();
                if got != width {
                    return Err(MapError::RaggedAscii {
                        level: z,
                        row: y,
                        got,
                        expected: width,
                    });
                }
                for (x, ch) in row.chars().enumerate() {
                    let pos = Position::new(x as i32, y as i32, z as i32);
                    let (dug_out, has_floor, underground) = match ch {
                        '#' => (false, false, true),
                        '.' => (true, true, true),
                        '_' => (true, false, true),
                        '~' => (true, true, false),
                        other => return Err(MapError::UnknownGlyph(other)),
                    };
                    let tile = map.tile_mut(pos)?;
                    tile.dug_out = dug_out;
                    tile.has_floor = has_floor;
                    tile.underground = underground;
                }
            }
        }
        for z in 0..map.depth {
            map.reflow_level(z);
        }
        Ok(map)
    }

    // -----------------------------------------------------------------------
    // Dimensions and indexing
    // -----------------------------------------------------------------------

    /// Width of every level.
    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Height of every level.
    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Number of levels.
    #[inline]
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Number of tiles on one level.
    #[inline]
    pub fn level_len(&self) -> usize {
        (self.width * self.height) as usize
    }

    /// Whether `pos` lies inside the map.
    #[inline]
    pub fn is_inside_map(&self, pos: Position) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && pos.z >= 0
            && pos.x < self.width
            && pos.y < self.height
            && pos.z < self.depth
    }

    /// Flat index of `pos` into the tile storage.
    #[inline]
    pub fn index(&self, pos: Position) -> Option<usize> {
        if !self.is_inside_map(pos) {
            return None;
        }
        Some(((pos.z * self.height + pos.y) * self.width + pos.x) as usize)
    }

    /// Index of `pos` within its own level.
    #[inline]
    pub fn level_index(&self, pos: Position) -> Option<usize> {
        if !self.is_inside_map(pos) {
            return None;
        }
        Some((pos.y * self.width + pos.x) as usize)
    }

    /// Position of the tile at `idx` within level `z`.
    #[inline]
    pub fn level_position(&self, z: i32, idx: usize) -> Position {
        let w = self.width as usize;
        Position::new((idx % w) as i32, (idx / w) as i32, z)
    }

    // -----------------------------------------------------------------------
    // Tile access
    // -----------------------------------------------------------------------

    /// The tile at `pos`, or `None` outside the map.
    #[inline]
    pub fn get_tile(&self, pos: Position) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    /// Mutable access to the tile at `pos`.
    #[inline]
    pub fn get_tile_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        self.index(pos).map(|i| &mut self.tiles[i])
    }

    fn tile_mut(&mut self, pos: Position) -> MapResult<&mut Tile> {
        self.get_tile_mut(pos).ok_or(MapError::OutOfBounds(pos))
    }

    /// The neighbouring tile one step from `pos` in `dir`.
    #[inline]
    pub fn neighbor(&self, pos: Position, dir: Direction) -> Option<&Tile> {
        self.get_tile(pos.step(dir))
    }

    /// All tiles of level `z` in row-major order.
    pub fn level(&self, z: i32) -> Option<&[Tile]> {
        if z < 0 || z >= self.depth {
            return None;
        }
        let len = self.level_len();
        let start = z as usize * len;
        Some(&self.tiles[start..start + len])
    }

    /// Row-major iterator over the positions of level `z`.
    pub fn level_positions(&self, z: i32) -> LevelPositions {
        LevelPositions {
            width: self.width,
            height: if z >= 0 && z < self.depth { self.height } else { 0 },
            z,
            cur: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Movement queries
    // -----------------------------------------------------------------------

    /// Whether `pos` can be entered with capability `cap`. False off-map.
    #[inline]
    pub fn walkable(&self, pos: Position, cap: Capability) -> bool {
        self.get_tile(pos).is_some_and(|t| t.walkable(cap))
    }

    /// Stored clearance of `pos` for `cap`. 0 off-map.
    #[inline]
    pub fn clearance(&self, pos: Position, cap: Capability) -> u32 {
        self.get_tile(pos).map_or(0, |t| t.clearance(cap))
    }

    /// Store the clearance of `pos` for `cap`. No-op off-map.
    #[inline]
    pub fn set_clearance(&mut self, pos: Position, cap: Capability, value: u32) {
        if let Some(t) = self.get_tile_mut(pos) {
            t.set_clearance(cap, value);
        }
    }

    /// Whether the edge between `pos` and its orthogonal neighbour in `dir`
    /// is blocked by a wall on either side. Edges on the map border count as
    /// walled.
    pub fn has_wall(&self, pos: Position, dir: Direction) -> bool {
        let (Some(here), Some(there)) = (self.get_tile(pos), self.neighbor(pos, dir)) else {
            return true;
        };
        here.has_wall(dir) || there.has_wall(dir.opposite())
    }

    /// Whether an agent of size `clearance` with capability `cap` may step
    /// from `start` to the adjacent `goal` in direction `dir`.
    ///
    /// The goal must have enough clearance and the shared edge must be free
    /// of walls. A diagonal step additionally needs both flanking orthogonal
    /// tiles walkable and both two-step orthogonal detours wall-free.
    pub fn can_move_to(
        &self,
        start: Position,
        goal: Position,
        dir: Direction,
        clearance: u32,
        cap: Capability,
    ) -> bool {
        if start.step(dir) != goal || self.clearance(goal, cap) < clearance.max(1) {
            return false;
        }
        match dir.flanks() {
            None => !self.has_wall(start, dir),
            Some((a, b)) => {
                let via_a = start.step(a);
                let via_b = start.step(b);
                self.walkable(via_a, cap)
                    && self.walkable(via_b, cap)
                    && !self.has_wall(start, a)
                    && !self.has_wall(via_a, b)
                    && !self.has_wall(start, b)
                    && !self.has_wall(via_b, a)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Terrain edits
    // -----------------------------------------------------------------------

    /// Dig out the tile at `pos`.
    ///
    /// The dug tile gets a floor if the tile below is solid (or beyond the
    /// bottom of the map); a dug tile directly above loses its floor. Rock
    /// bits of the tile and its 8 neighbours are reflowed. Digging a tile that
    /// is already dug out changes nothing.
    pub fn dig_out(&mut self, pos: Position) -> MapResult<DigOutcome> {
        let below_solid = self.get_tile(pos.below()).is_none_or(|t| !t.dug_out);
        let tile = self.tile_mut(pos)?;
        if tile.dug_out {
            return Ok(DigOutcome::default());
        }
        tile.dug_out = true;
        tile.has_floor = below_solid;

        let mut levels = Vec::with_capacity(2);
        if let Some(above) = self.get_tile_mut(pos.above()) {
            if above.dug_out && above.has_floor {
                above.has_floor = false;
                levels.push(pos.z - 1);
            }
        }
        levels.push(pos.z);

        self.reflow_tile(pos);
        for dir in Direction::ALL {
            self.reflow_tile(pos.step(dir));
        }
        Ok(DigOutcome { levels })
    }

    /// Set the dug-out and floor state of a tile without reflowing walls.
    ///
    /// Intended for bulk loading; call [`reflow_level`](Self::reflow_level)
    /// once the level is complete.
    pub fn carve(&mut self, pos: Position, has_floor: bool) -> MapResult<()> {
        let tile = self.tile_mut(pos)?;
        tile.dug_out = true;
        tile.has_floor = has_floor;
        Ok(())
    }

    /// Mark a tile as underground (inside the diggable rock mass) or not.
    pub fn set_underground(&mut self, pos: Position, underground: bool) -> MapResult<()> {
        self.tile_mut(pos)?.underground = underground;
        Ok(())
    }

    /// Place a wall on the orthogonal edge of `pos` facing `dir`, mirrored on
    /// the neighbour when there is one.
    pub fn build_wall(&mut self, pos: Position, dir: Direction) -> MapResult<()> {
        self.set_built(pos, dir, true)
    }

    /// Remove a wall placed with [`build_wall`](Self::build_wall).
    pub fn remove_wall(&mut self, pos: Position, dir: Direction) -> MapResult<()> {
        self.set_built(pos, dir, false)
    }

    fn set_built(&mut self, pos: Position, dir: Direction, on: bool) -> MapResult<()> {
        if dir.is_diagonal() {
            return Err(MapError::DiagonalWall(dir));
        }
        let apply = |sides: Sides, d: Direction| if on { sides.with(d) } else { sides.without(d) };
        let tile = self.tile_mut(pos)?;
        tile.built = apply(tile.built, dir);
        if let Some(other) = self.get_tile_mut(pos.step(dir)) {
            other.built = apply(other.built, dir.opposite());
        }
        Ok(())
    }

    /// Recompute the rock bits of every tile on level `z`.
    pub fn reflow_level(&mut self, z: i32) {
        for pos in self.level_positions(z) {
            self.reflow_tile(pos);
        }
    }

    fn reflow_tile(&mut self, pos: Position) {
        let Some(tile) = self.get_tile(pos) else {
            return;
        };
        let mut rock = Sides::NONE;
        if tile.dug_out {
            for dir in Direction::ALL {
                if self.neighbor(pos, dir).is_none_or(|n| !n.dug_out) {
                    rock = rock.with(dir);
                }
            }
        }
        if let Some(tile) = self.get_tile_mut(pos) {
            tile.rock = rock;
        }
    }
}

// ---------------------------------------------------------------------------
// LevelPositions
// ---------------------------------------------------------------------------

/// Row-major iterator over the positions of one level.
#[derive(Clone, Debug)]
pub struct LevelPositions {
    width: i32,
    height: i32,
    z: i32,
    cur: i32,
}

impl Iterator for LevelPositions {
    type Item = Position;

    #[inline]
    fn next(&mut self) -> Option<Position> {
        if self.width <= 0 || self.cur >= self.width * self.height {
            return None;
        }
        let p = Position::new(self.cur % self.width, self.cur / self.width, self.z);
        self.cur += 1;
        Some(p)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.width * self.height - self.cur).max(0) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for LevelPositions {}
