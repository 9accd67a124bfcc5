//! # Voxel Map Buffer
//!
//! A map is a flat array of one-byte block codes with dimensions
//! `width (X) × length (Y) × height (Z)`, each in `[1, 65536)`.
//!
//! ## Indexing
//!
//! ```text
//! index(x, y, z) = (z * length + y) * width + x
//! ```
//!
//! Z is vertical and grows upwards, so one horizontal layer is a
//! contiguous `width * length` slice and the whole buffer can be sent
//! to a client without reordering.
//!
//! ## Snapshot Format
//!
//! [`Map::compressed_snapshot`] produces the Classic level stream: a gzip
//! stream containing a 4-byte big-endian block count followed by the raw
//! block bytes.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::block::Block;
use crate::error::{MapError, MapResult};
use crate::position::Position;

/// Exclusive upper bound of every map dimension.
pub const MAX_DIMENSION: usize = 65536;

/// Largest volume a map may have (the level stream counts blocks with an `i32`).
pub const MAX_VOLUME: usize = i32::MAX as usize;

/// Map extent in blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dimensions {
    /// Size along X.
    pub width: usize,
    /// Size along Y.
    pub length: usize,
    /// Size along Z (vertical).
    pub height: usize,
}

impl Dimensions {
    /// Creates unchecked dimensions.
    #[inline]
    #[must_use]
    pub const fn new(width: usize, length: usize, height: usize) -> Self {
        Self { width, length, height }
    }

    /// Checks every dimension is in `[1, 65536)` and the volume is addressable.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidDimensions`] otherwise.
    pub fn validate(self) -> MapResult<Self> {
        let in_range = |d: usize| (1..MAX_DIMENSION).contains(&d);
        let volume = self
            .width
            .checked_mul(self.length)
            .and_then(|v| v.checked_mul(self.height));
        match volume {
            Some(v) if v <= MAX_VOLUME
                && in_range(self.width)
                && in_range(self.length)
                && in_range(self.height) =>
            {
                Ok(self)
            }
            _ => Err(MapError::InvalidDimensions {
                width: self.width,
                length: self.length,
                height: self.height,
            }),
        }
    }

    /// Number of blocks.
    #[inline]
    #[must_use]
    pub const fn volume(self) -> usize {
        self.width * self.length * self.height
    }

    /// Returns true if the coordinate lies inside the map.
    #[inline]
    #[must_use]
    pub const fn contains(self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.width
            && (y as usize) < self.length
            && (z as usize) < self.height
    }

    /// Canonical index of an in-bounds coordinate.
    #[inline]
    #[must_use]
    pub const fn index(self, x: usize, y: usize, z: usize) -> usize {
        (z * self.length + y) * self.width + x
    }
}

/// A world's block buffer with its spawn point and metadata.
#[derive(Clone, Debug)]
pub struct Map {
    dims: Dimensions,
    blocks: Vec<Block>,
    spawn: Position,
    metadata: BTreeMap<(String, String), String>,
}

impl Map {
    /// Creates an all-air map with the spawn at the top centre.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidDimensions`] for out-of-range sizes.
    pub fn new(width: usize, length: usize, height: usize) -> MapResult<Self> {
        let dims = Dimensions::new(width, length, height).validate()?;
        Ok(Self {
            dims,
            blocks: vec![Block::AIR; dims.volume()],
            spawn: Self::default_spawn(dims),
            metadata: BTreeMap::new(),
        })
    }

    /// Wraps existing block data in canonical order.
    ///
    /// # Errors
    ///
    /// Fails on bad dimensions or if the data length differs from the volume.
    pub fn from_blocks(dims: Dimensions, blocks: Vec<Block>) -> MapResult<Self> {
        let dims = dims.validate()?;
        if blocks.len() != dims.volume() {
            return Err(MapError::VolumeMismatch {
                expected: dims.volume(),
                actual: blocks.len(),
            });
        }
        Ok(Self {
            dims,
            blocks,
            spawn: Self::default_spawn(dims),
            metadata: BTreeMap::new(),
        })
    }

    /// Decodes a level stream produced by [`Map::compressed_snapshot`].
    ///
    /// # Errors
    ///
    /// Fails if the stream is not gzip, the count is wrong, or data is short.
    pub fn from_compressed(dims: Dimensions, data: &[u8]) -> MapResult<Self> {
        let mut decoder = GzDecoder::new(data);
        let mut count = [0u8; 4];
        decoder.read_exact(&mut count)?;
        let count = u32::from_be_bytes(count) as usize;
        if count != dims.volume() {
            return Err(MapError::VolumeMismatch {
                expected: dims.volume(),
                actual: count,
            });
        }
        let mut raw = vec![0u8; count];
        decoder.read_exact(&mut raw)?;
        Self::from_blocks(dims, raw.into_iter().map(Block).collect())
    }

    fn default_spawn(dims: Dimensions) -> Position {
        let half = |blocks: usize| (blocks * 16).min(i16::MAX as usize) as i16;
        let top = (dims.height * 32).min(i16::MAX as usize) as i16;
        Position::new(half(dims.width), half(dims.length), top, 0, 0).clamped(dims)
    }

    /// Map extent.
    #[inline]
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dims
    }

    /// Size along X.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.dims.width
    }

    /// Size along Y.
    #[inline]
    #[must_use]
    pub const fn length(&self) -> usize {
        self.dims.length
    }

    /// Size along Z.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> usize {
        self.dims.height
    }

    /// Number of blocks.
    #[inline]
    #[must_use]
    pub fn volume(&self) -> usize {
        self.blocks.len()
    }

    /// Raw blocks in canonical order.
    #[inline]
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Mutable raw blocks in canonical order.
    #[inline]
    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    /// Returns true if the coordinate lies inside the map.
    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        self.dims.contains(x, y, z)
    }

    /// Canonical index, `None` when out of bounds.
    #[inline]
    #[must_use]
    pub const fn index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        if self.dims.contains(x, y, z) {
            Some(self.dims.index(x as usize, y as usize, z as usize))
        } else {
            None
        }
    }

    /// Index under the top-down layered fill order
    /// `x + width*length*(height-1-z) + width*y`.
    ///
    /// Only used to express that order in compatibility checks; storage
    /// always uses [`Map::index`].
    #[must_use]
    pub const fn legacy_layered_index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        if self.dims.contains(x, y, z) {
            let d = self.dims;
            Some(x as usize + d.width * d.length * (d.height - 1 - z as usize) + d.width * y as usize)
        } else {
            None
        }
    }

    /// Block at a coordinate, `None` when out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<Block> {
        self.index(x, y, z).map(|i| self.blocks[i])
    }

    /// Sets a block and returns the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::OutOfBounds`] for coordinates outside the map.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, z: i32, block: Block) -> MapResult<Block> {
        let index = self.index(x, y, z).ok_or(MapError::OutOfBounds { x, y, z })?;
        Ok(std::mem::replace(&mut self.blocks[index], block))
    }

    /// Sets a block if the coordinate is in bounds, returning whether it was.
    #[inline]
    pub fn try_set(&mut self, x: i32, y: i32, z: i32, block: Block) -> bool {
        match self.index(x, y, z) {
            Some(index) => {
                self.blocks[index] = block;
                true
            }
            None => false,
        }
    }

    /// Fills the whole map with one block.
    pub fn fill(&mut self, block: Block) {
        self.blocks.fill(block);
    }

    /// Fills the inclusive box `min..=max`, clipped to the map.
    pub fn fill_box(&mut self, min: (i32, i32, i32), max: (i32, i32, i32), block: Block) {
        let clip = |lo: i32, hi: i32, size: usize| -> Option<(usize, usize)> {
            let lo = lo.max(0);
            let hi = hi.min(size as i32 - 1);
            (lo <= hi).then_some((lo as usize, hi as usize))
        };
        let (Some((x0, x1)), Some((y0, y1)), Some((z0, z1))) = (
            clip(min.0, max.0, self.dims.width),
            clip(min.1, max.1, self.dims.length),
            clip(min.2, max.2, self.dims.height),
        ) else {
            return;
        };
        for z in z0..=z1 {
            for y in y0..=y1 {
                let start = self.dims.index(x0, y, z);
                let end = self.dims.index(x1, y, z);
                self.blocks[start..=end].fill(block);
            }
        }
    }

    /// Fills the horizontal layers `z_from..z_to` (exclusive), clipped to the map.
    pub fn fill_layers(&mut self, z_from: usize, z_to: usize, block: Block) {
        let layer = self.dims.width * self.dims.length;
        let z_to = z_to.min(self.dims.height);
        if z_from < z_to {
            self.blocks[z_from * layer..z_to * layer].fill(block);
        }
    }

    /// Highest non-air Z in a column, `None` for an empty or out-of-range column.
    #[must_use]
    pub fn surface_level(&self, x: i32, y: i32) -> Option<i32> {
        (0..self.dims.height as i32)
            .rev()
            .find(|&z| self.get(x, y, z).is_some_and(|b| !b.is_air()))
    }

    /// Number of blocks of a given type.
    #[must_use]
    pub fn count(&self, block: Block) -> usize {
        self.blocks.iter().filter(|b| **b == block).count()
    }

    /// Spawn point.
    #[inline]
    #[must_use]
    pub const fn spawn(&self) -> Position {
        self.spawn
    }

    /// Sets the spawn point, clamped into the map.
    pub fn set_spawn(&mut self, spawn: Position) {
        self.spawn = spawn.clamped(self.dims);
    }

    /// Metadata value for `group/key`.
    #[must_use]
    pub fn metadata(&self, group: &str, key: &str) -> Option<&str> {
        self.metadata
            .get(&(group.to_string(), key.to_string()))
            .map(String::as_str)
    }

    /// Stores a metadata value, replacing any previous one.
    pub fn set_metadata(&mut self, group: &str, key: &str, value: impl Into<String>) {
        self.metadata
            .insert((group.to_string(), key.to_string()), value.into());
    }

    /// Removes a metadata value.
    pub fn remove_metadata(&mut self, group: &str, key: &str) -> Option<String> {
        self.metadata.remove(&(group.to_string(), key.to_string()))
    }

    /// Iterates metadata as `(group, key, value)`.
    pub fn metadata_entries(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.metadata
            .iter()
            .map(|((g, k), v)| (g.as_str(), k.as_str(), v.as_str()))
    }

    /// Gzip level stream: 4-byte big-endian block count, then the blocks.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Io`] if the encoder fails.
    pub fn compressed_snapshot(&self) -> MapResult<Vec<u8>> {
        let mut encoder = GzEncoder::new(
            Vec::with_capacity(self.blocks.len() / 8 + 64),
            Compression::default(),
        );
        encoder.write_all(&(self.blocks.len() as u32).to_be_bytes())?;
        encoder.write_all(bytemuck::cast_slice(&self.blocks))?;
        Ok(encoder.finish()?)
    }
}
