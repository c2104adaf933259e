//! # Chunk Addressing
//!
//! The world is cut into square cells of `chunk_size` world units on the
//! X/Z plane. A chunk is addressed by the integer pair `(x, z)` where
//! `x = floor(world_x / chunk_size)`.
//!
//! Distances between chunks are measured two ways:
//! - Chebyshev (max of axis deltas): defines the square load/unload rings
//! - Manhattan (sum of axis deltas): orders load candidates

use std::fmt;

use meridian_core::Vec3;

/// Default chunk edge length in world units.
pub const DEFAULT_CHUNK_SIZE: f32 = 32.0;

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not world units).
    pub x: i32,
    /// Z coordinate (in chunks, not world units).
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Converts a continuous world position to the containing chunk.
    #[inline]
    #[must_use]
    pub fn from_world_pos(world_x: f32, world_z: f32, chunk_size: f32) -> Self {
        Self {
            x: (world_x / chunk_size).floor() as i32,
            z: (world_z / chunk_size).floor() as i32,
        }
    }

    /// World-space position of the chunk's origin corner.
    #[inline]
    #[must_use]
    pub fn world_origin(self, chunk_size: f32) -> Vec3 {
        Vec3::new(self.x as f32 * chunk_size, 0.0, self.z as f32 * chunk_size)
    }

    /// Max of the axis deltas.
    #[inline]
    #[must_use]
    pub const fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dz = self.z.abs_diff(other.z);
        if dx > dz {
            dx
        } else {
            dz
        }
    }

    /// Sum of the axis deltas.
    #[inline]
    #[must_use]
    pub const fn manhattan_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.z.abs_diff(other.z)
    }

    /// Every coordinate within `radius` (Chebyshev) of this one, row-major.
    ///
    /// Yields `(2 * radius + 1)^2` coordinates.
    pub fn neighborhood(self, radius: u32) -> impl Iterator<Item = Self> {
        let r = radius as i32;
        (-r..=r).flat_map(move |dz| (-r..=r).map(move |dx| Self::new(self.x + dx, self.z + dz)))
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_coord_from_world() {
        let size = 32.0;
        assert_eq!(ChunkCoord::from_world_pos(0.0, 0.0, size), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_world_pos(31.9, 31.9, size), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_world_pos(32.0, 64.0, size), ChunkCoord::new(1, 2));
        assert_eq!(ChunkCoord::from_world_pos(-0.1, -0.1, size), ChunkCoord::new(-1, -1));
        assert_eq!(ChunkCoord::from_world_pos(-32.0, -32.0, size), ChunkCoord::new(-1, -1));
        assert_eq!(ChunkCoord::from_world_pos(-32.5, 0.0, size), ChunkCoord::new(-2, 0));
    }

    #[test]
    fn test_distances() {
        let a = ChunkCoord::new(0, 0);
        let b = ChunkCoord::new(3, -4);
        assert_eq!(a.chebyshev_distance(b), 4);
        assert_eq!(a.manhattan_distance(b), 7);
        assert_eq!(b.chebyshev_distance(a), 4);
    }

    #[test]
    fn test_neighborhood_size_and_bounds() {
        let center = ChunkCoord::new(6, 0);
        let ring: Vec<_> = center.neighborhood(3).collect();
        assert_eq!(ring.len(), 49);
        assert!(ring.iter().all(|c| c.chebyshev_distance(center) <= 3));
        assert!(ring.contains(&ChunkCoord::new(9, -3)));
        assert_eq!(ChunkCoord::new(1, 1).neighborhood(0).count(), 1);
    }

    #[test]
    fn test_world_origin() {
        let origin = ChunkCoord::new(-2, 3).world_origin(32.0);
        assert_eq!(origin, Vec3::new(-64.0, 0.0, 96.0));
    }
}
