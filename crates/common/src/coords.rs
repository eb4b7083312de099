use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Integer block address derived from a real (pixel) position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockCoord {
    pub x: i32,
    pub y: i32,
}

impl BlockCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Floor-divide a real position by the block size.
    pub fn from_real(real_x: i32, real_y: i32, block_size: i32) -> Self {
        Self {
            x: real_x.div_euclid(block_size),
            y: real_y.div_euclid(block_size),
        }
    }

    /// Same as [`BlockCoord::from_real`] for sub-pixel positions.
    pub fn from_real_f32(real_x: f32, real_y: f32, block_size: i32) -> Self {
        let size = block_size as f32;
        Self {
            x: (real_x / size).floor() as i32,
            y: (real_y / size).floor() as i32,
        }
    }

    /// Chunk owning this block.
    pub fn chunk(self, chunk_span: i32) -> ChunkKey {
        ChunkKey {
            x: self.x.div_euclid(chunk_span),
            y: self.y.div_euclid(chunk_span),
        }
    }

    /// Offset of this block inside its chunk's local grid, always in `0..chunk_span`.
    pub fn local_offset(self, chunk_span: i32) -> (usize, usize) {
        (
            self.x.rem_euclid(chunk_span) as usize,
            self.y.rem_euclid(chunk_span) as usize,
        )
    }

    /// Pixel rectangle covered by this block.
    pub fn real_bounds(self, block_size: i32) -> Rect {
        Rect::new(
            self.x * block_size,
            self.y * block_size,
            block_size,
            block_size,
        )
    }

    pub fn pack(self) -> u64 {
        pack_coordinates(self.x, self.y)
    }

    pub fn unpack(key: u64) -> Self {
        let (x, y) = unpack_coordinates(key);
        Self { x, y }
    }
}

/// Address of one chunk of the outdoor grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub x: i32,
    pub y: i32,
}

impl ChunkKey {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk containing a real position, given the chunk's edge length in pixels.
    pub fn from_real(real_x: i32, real_y: i32, chunk_pixel_size: i32) -> Self {
        Self {
            x: real_x.div_euclid(chunk_pixel_size),
            y: real_y.div_euclid(chunk_pixel_size),
        }
    }

    /// Chebyshev distance in chunks, the metric preload radii are expressed in.
    pub fn chunk_distance(self, other: ChunkKey) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    pub fn pack(self) -> u64 {
        pack_coordinates(self.x, self.y)
    }

    pub fn unpack(key: u64) -> Self {
        let (x, y) = unpack_coordinates(key);
        Self { x, y }
    }
}

/// Real position modulo the chunk size, always non-negative.
pub fn within_chunk_offset(real_x: i32, real_y: i32, chunk_size: i32) -> (i32, i32) {
    (real_x.rem_euclid(chunk_size), real_y.rem_euclid(chunk_size))
}

/// Pack two signed 32-bit components into one hashable key: `x << 32 | (y & 0xFFFF_FFFF)`.
#[inline]
pub fn pack_coordinates(x: i32, y: i32) -> u64 {
    ((x as u32 as u64) << 32) | (y as u32 as u64)
}

#[inline]
pub fn unpack_coordinates(key: u64) -> (i32, i32) {
    ((key >> 32) as u32 as i32, key as u32 as i32)
}

#[inline]
pub fn euclidean_distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    ((x2 - x1) * (x2 - x1) + (y2 - y1) * (y2 - y1)).sqrt()
}

/// Octile approximation of the Euclidean distance, used to rank targets.
#[inline]
pub fn diagonal_distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = (x2 - x1).abs();
    let dy = (y2 - y1).abs();
    (dx + dy) - (2.0 - std::f32::consts::SQRT_2) * dx.min(dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_from_negative_real_floors() {
        assert_eq!(BlockCoord::from_real(-1, -32, 32), BlockCoord::new(-1, -1));
        assert_eq!(BlockCoord::from_real(-33, 0, 32), BlockCoord::new(-2, 0));
        assert_eq!(BlockCoord::from_real(31, 32, 32), BlockCoord::new(0, 1));
        assert_eq!(BlockCoord::from_real_f32(-0.5, 12.9, 32), BlockCoord::new(-1, 0));
    }

    #[test]
    fn block_then_chunk_matches_direct_chunk() {
        let block_size = 32;
        let span = 16;
        for x in -2_000..2_000 {
            let via_block = BlockCoord::from_real(x, -x, block_size).chunk(span);
            let direct = ChunkKey::from_real(x, -x, span * block_size);
            assert_eq!(via_block, direct, "x = {x}");
        }
    }

    #[test]
    fn local_offset_is_non_negative() {
        assert_eq!(BlockCoord::new(-1, -16).local_offset(16), (15, 0));
        assert_eq!(BlockCoord::new(17, 3).local_offset(16), (1, 3));
        assert_eq!(within_chunk_offset(-1, -513, 512), (511, 511));
    }

    #[test]
    fn pack_unpack_extremes() {
        let samples = [
            (0, 0),
            (-1, -1),
            (i32::MIN, i32::MAX),
            (i32::MAX, i32::MIN),
            (12345, -98765),
        ];
        for (x, y) in samples {
            assert_eq!(unpack_coordinates(pack_coordinates(x, y)), (x, y));
        }
        assert_eq!(pack_coordinates(1, -1), 0x0000_0001_FFFF_FFFF);
        assert_eq!(ChunkKey::unpack(ChunkKey::new(-4, 9).pack()), ChunkKey::new(-4, 9));
    }

    #[test]
    fn distances() {
        assert_eq!(euclidean_distance(0.0, 0.0, 3.0, 4.0), 5.0);
        // Straight lines are exact, diagonals approximate sqrt(2).
        assert_eq!(diagonal_distance(0.0, 0.0, 10.0, 0.0), 10.0);
        let diag = diagonal_distance(0.0, 0.0, 10.0, 10.0);
        assert!((diag - 10.0 * std::f32::consts::SQRT_2).abs() < 1e-4);
    }

    #[test]
    fn chunk_distance_is_chebyshev() {
        assert_eq!(ChunkKey::new(0, 0).chunk_distance(ChunkKey::new(-2, 1)), 2);
    }
}
