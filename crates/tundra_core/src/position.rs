//! # Fixed-Point Positions
//!
//! Classic positions are `i16` fixed-point values with 32 units per block.
//! `x` and `y` are horizontal, `z` is height. On the wire the order is
//! `x, z, y` (x, height, y); the codec handles that swap.
//!
//! Rotation `r` (yaw) and look `l` (pitch) are single bytes where 256
//! units make a full turn.

use crate::map::Dimensions;

/// Fixed-point units per block.
pub const UNITS_PER_BLOCK: i32 = 32;

/// Player position plus heading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    /// X, 32 units per block.
    pub x: i16,
    /// Y, 32 units per block.
    pub y: i16,
    /// Height, 32 units per block.
    pub z: i16,
    /// Yaw.
    pub r: u8,
    /// Pitch.
    pub l: u8,
}

impl Position {
    /// Creates a position from raw fixed-point components.
    #[inline]
    #[must_use]
    pub const fn new(x: i16, y: i16, z: i16, r: u8, l: u8) -> Self {
        Self { x, y, z, r, l }
    }

    /// Position at the centre of the given block, standing on its floor.
    #[must_use]
    pub fn from_block(x: i32, y: i32, z: i32) -> Self {
        Self {
            x: saturate(x * UNITS_PER_BLOCK + UNITS_PER_BLOCK / 2),
            y: saturate(y * UNITS_PER_BLOCK + UNITS_PER_BLOCK / 2),
            z: saturate(z * UNITS_PER_BLOCK),
            r: 0,
            l: 0,
        }
    }

    /// Block coordinate containing this position.
    #[inline]
    #[must_use]
    pub const fn block_coords(self) -> (i32, i32, i32) {
        (
            (self.x as i32).div_euclid(UNITS_PER_BLOCK),
            (self.y as i32).div_euclid(UNITS_PER_BLOCK),
            (self.z as i32).div_euclid(UNITS_PER_BLOCK),
        )
    }

    /// Squared euclidean distance in fixed-point units.
    #[inline]
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        let dz = self.z as i64 - other.z as i64;
        dx * dx + dy * dy + dz * dz
    }

    /// Squared heading change, with each axis wrapped to `[-128, 127]`.
    #[inline]
    #[must_use]
    pub const fn rotation_distance_squared(self, other: Self) -> i32 {
        let dr = self.r.wrapping_sub(other.r) as i8 as i32;
        let dl = self.l.wrapping_sub(other.l) as i8 as i32;
        dr * dr + dl * dl
    }

    /// Returns true when x, y and z match, ignoring heading.
    #[inline]
    #[must_use]
    pub const fn same_location(self, other: Self) -> bool {
        self.x == other.x && self.y == other.y && self.z == other.z
    }

    /// Returns true when yaw and pitch match, ignoring location.
    #[inline]
    #[must_use]
    pub const fn same_heading(self, other: Self) -> bool {
        self.r == other.r && self.l == other.l
    }

    /// Copy of this position with the heading taken from `other`.
    #[inline]
    #[must_use]
    pub const fn with_heading_of(self, other: Self) -> Self {
        Self { r: other.r, l: other.l, ..self }
    }

    /// Clamps the location into the fixed-point extent of a map.
    #[must_use]
    pub fn clamped(self, dims: Dimensions) -> Self {
        let clamp = |v: i16, blocks: usize| -> i16 {
            let max = (blocks as i64 * i64::from(UNITS_PER_BLOCK) - 1).min(i64::from(i16::MAX));
            i64::from(v).clamp(0, max) as i16
        };
        Self {
            x: clamp(self.x, dims.width),
            y: clamp(self.y, dims.length),
            z: clamp(self.z, dims.height),
            ..self
        }
    }
}

fn saturate(v: i32) -> i16 {
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_block() {
        let p = Position::from_block(2, 3, 4);
        assert_eq!((p.x, p.y, p.z), (80, 112, 128));
        assert_eq!(p.block_coords(), (2, 3, 4));
    }

    #[test]
    fn test_distance() {
        let a = Position::new(0, 0, 0, 0, 0);
        let b = Position::new(3, 4, 0, 0, 0);
        assert_eq!(a.distance_squared(b), 25);
    }

    #[test]
    fn test_rotation_wraps() {
        let a = Position::new(0, 0, 0, 250, 0);
        let b = Position::new(0, 0, 0, 4, 0);
        // 250 -> 4 is a 10 unit turn, not 246
        assert_eq!(a.rotation_distance_squared(b), 100);
    }

    #[test]
    fn test_clamped() {
        let dims = Dimensions { width: 4, length: 4, height: 4 };
        let p = Position::new(-5, 500, 64, 1, 2).clamped(dims);
        assert_eq!((p.x, p.y, p.z), (0, 127, 64));
        assert_eq!((p.r, p.l), (1, 2));
    }
}
