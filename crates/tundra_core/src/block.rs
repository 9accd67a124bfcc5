//! # Block Codes
//!
//! The Classic block table. A block is a single byte on the wire and in
//! the map buffer, so [`Block`] is a transparent `u8` newtype that can be
//! viewed as raw bytes with `bytemuck`.

use std::fmt;
use std::str::FromStr;

use bytemuck::{Pod, Zeroable};

use crate::error::MapError;

/// A single block code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Block(pub u8);

impl Block {
    /// Empty space.
    pub const AIR: Self = Self(0);
    /// Stone.
    pub const STONE: Self = Self(1);
    /// Grass.
    pub const GRASS: Self = Self(2);
    /// Dirt.
    pub const DIRT: Self = Self(3);
    /// Cobblestone.
    pub const COBBLESTONE: Self = Self(4);
    /// Wooden planks.
    pub const PLANK: Self = Self(5);
    /// Sapling.
    pub const SAPLING: Self = Self(6);
    /// Bedrock (admincrete).
    pub const BEDROCK: Self = Self(7);
    /// Flowing water.
    pub const WATER: Self = Self(8);
    /// Still water.
    pub const STILL_WATER: Self = Self(9);
    /// Flowing lava.
    pub const LAVA: Self = Self(10);
    /// Still lava.
    pub const STILL_LAVA: Self = Self(11);
    /// Sand.
    pub const SAND: Self = Self(12);
    /// Gravel.
    pub const GRAVEL: Self = Self(13);
    /// Gold ore.
    pub const GOLD_ORE: Self = Self(14);
    /// Iron ore.
    pub const IRON_ORE: Self = Self(15);
    /// Coal ore.
    pub const COAL_ORE: Self = Self(16);
    /// Tree trunk.
    pub const LOG: Self = Self(17);
    /// Leaves.
    pub const LEAVES: Self = Self(18);
    /// Sponge.
    pub const SPONGE: Self = Self(19);
    /// Glass.
    pub const GLASS: Self = Self(20);
    /// Red cloth.
    pub const RED: Self = Self(21);
    /// Orange cloth.
    pub const ORANGE: Self = Self(22);
    /// Yellow cloth.
    pub const YELLOW: Self = Self(23);
    /// Lime cloth.
    pub const LIME: Self = Self(24);
    /// Green cloth.
    pub const GREEN: Self = Self(25);
    /// Teal cloth.
    pub const TEAL: Self = Self(26);
    /// Aqua cloth.
    pub const AQUA: Self = Self(27);
    /// Cyan cloth.
    pub const CYAN: Self = Self(28);
    /// Blue cloth.
    pub const BLUE: Self = Self(29);
    /// Indigo cloth.
    pub const INDIGO: Self = Self(30);
    /// Violet cloth.
    pub const VIOLET: Self = Self(31);
    /// Magenta cloth.
    pub const MAGENTA: Self = Self(32);
    /// Pink cloth.
    pub const PINK: Self = Self(33);
    /// Black cloth.
    pub const BLACK: Self = Self(34);
    /// Gray cloth.
    pub const GRAY: Self = Self(35);
    /// White cloth.
    pub const WHITE: Self = Self(36);
    /// Dandelion.
    pub const YELLOW_FLOWER: Self = Self(37);
    /// Rose.
    pub const RED_FLOWER: Self = Self(38);
    /// Brown mushroom.
    pub const BROWN_MUSHROOM: Self = Self(39);
    /// Red mushroom.
    pub const RED_MUSHROOM: Self = Self(40);
    /// Block of gold.
    pub const GOLD: Self = Self(41);
    /// Block of iron.
    pub const IRON: Self = Self(42);
    /// Double slab.
    pub const DOUBLE_STAIR: Self = Self(43);
    /// Slab.
    pub const STAIR: Self = Self(44);
    /// Bricks.
    pub const BRICK: Self = Self(45);
    /// TNT.
    pub const TNT: Self = Self(46);
    /// Bookshelf.
    pub const BOOKS: Self = Self(47);
    /// Mossy cobblestone.
    pub const MOSSY_COBBLE: Self = Self(48);
    /// Obsidian.
    pub const OBSIDIAN: Self = Self(49);

    /// Highest block code a vanilla Classic client understands.
    pub const MAX_CLASSIC: Self = Self::OBSIDIAN;

    const NAMES: [&'static str; 50] = [
        "air", "stone", "grass", "dirt", "cobblestone", "plank", "sapling", "bedrock", "water",
        "stillwater", "lava", "stilllava", "sand", "gravel", "goldore", "ironore", "coalore",
        "log", "leaves", "sponge", "glass", "red", "orange", "yellow", "lime", "green", "teal",
        "aqua", "cyan", "blue", "indigo", "violet", "magenta", "pink", "black", "gray", "white",
        "yellowflower", "redflower", "brownmushroom", "redmushroom", "gold", "iron",
        "doublestair", "stair", "brick", "tnt", "books", "mossycobble", "obsidian",
    ];

    /// Returns the raw block code.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u8 {
        self.0
    }

    /// Returns true if this block is empty space.
    #[inline]
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.0 == 0
    }

    /// Returns true for any code a Classic client can display.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 <= Self::MAX_CLASSIC.0
    }

    /// Returns true for water and lava, flowing or still.
    #[inline]
    #[must_use]
    pub const fn is_liquid(self) -> bool {
        matches!(self.0, 8..=11)
    }

    /// Returns true for the two flowing liquids.
    #[inline]
    #[must_use]
    pub const fn is_flowing_liquid(self) -> bool {
        self.0 == Self::WATER.0 || self.0 == Self::LAVA.0
    }

    /// Flowing liquids map to their still variant, everything else is unchanged.
    #[inline]
    #[must_use]
    pub const fn still_variant(self) -> Self {
        match self.0 {
            8 => Self::STILL_WATER,
            10 => Self::STILL_LAVA,
            _ => self,
        }
    }

    /// Lower-case name of the block, `None` for non-Classic codes.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        Self::NAMES.get(usize::from(self.0)).copied()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "#{}", self.0),
        }
    }
}

impl FromStr for Block {
    type Err = MapError;

    /// Parses a block by name (case-insensitive, `_` ignored) or by numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != ' ')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if let Ok(code) = normalized.parse::<u8>() {
            return Ok(Self(code));
        }
        Self::NAMES
            .iter()
            .position(|name| *name == normalized)
            .map(|index| Self(index as u8))
            .ok_or_else(|| MapError::UnknownBlock(s.to_string()))
    }
}

impl From<u8> for Block {
    #[inline]
    fn from(code: u8) -> Self {
        Self(code)
    }
}

impl From<Block> for u8 {
    #[inline]
    fn from(block: Block) -> Self {
        block.0
    }
}
