//! Integer block grid and chunk bucketing.
//!
//! # Model
//! - A structure lives on an integer grid; one block occupies one cell.
//! - Cells are cubes of side `cell_size` meters (block size times scale).
//! - Chunks are `chunk_size` cells per axis. The chunk of a cell is
//!   `floor(coord / chunk_size)` per axis, so `-1` belongs to chunk `-1`, not `0`.

/// Integer cell coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridCoord {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The chunk this cell belongs to.
    #[inline]
    pub fn chunk(self, chunk_size: i32) -> ChunkKey {
        ChunkKey {
            x: self.x.div_euclid(chunk_size),
            y: self.y.div_euclid(chunk_size),
            z: self.z.div_euclid(chunk_size),
        }
    }
}

/// Chunk coordinate in chunk units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Inclusive integer bounds of a block set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridBounds {
    pub min: GridCoord,
    pub max: GridCoord,
}

impl GridBounds {
    /// Bounds of `coords`, or `None` when empty.
    pub fn of<I: IntoIterator<Item = GridCoord>>(coords: I) -> Option<Self> {
        let mut it = coords.into_iter();
        let first = it.next()?;
        let mut b = GridBounds {
            min: first,
            max: first,
        };
        for c in it {
            b.min.x = b.min.x.min(c.x);
            b.min.y = b.min.y.min(c.y);
            b.min.z = b.min.z.min(c.z);
            b.max.x = b.max.x.max(c.x);
            b.max.y = b.max.y.max(c.y);
            b.max.z = b.max.z.max(c.z);
        }
        Some(b)
    }

    /// Extent in cells along each axis.
    #[inline]
    pub fn cells(&self) -> (i64, i64, i64) {
        let extent = |min: i32, max: i32| max as i64 - min as i64 + 1;
        (
            extent(self.min.x, self.max.x),
            extent(self.min.y, self.max.y),
            extent(self.min.z, self.max.z),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_uses_floored_division() {
        assert_eq!(GridCoord::new(0, 7, 8).chunk(8), ChunkKey { x: 0, y: 0, z: 1 });
        assert_eq!(
            GridCoord::new(-1, -8, -9).chunk(8),
            ChunkKey { x: -1, y: -1, z: -2 }
        );
    }

    #[test]
    fn bounds_cover_all_coords() {
        let b = GridBounds::of([
            GridCoord::new(2, 0, -1),
            GridCoord::new(-3, 4, 5),
            GridCoord::new(0, 1, 0),
        ])
        .unwrap();
        assert_eq!(b.min, GridCoord::new(-3, 0, -1));
        assert_eq!(b.max, GridCoord::new(2, 4, 5));
        assert_eq!(b.cells(), (6, 5, 7));
        assert!(GridBounds::of(std::iter::empty()).is_none());
    }
}
