//! # Block Themes
//!
//! A theme maps the semantic roles of the realistic generator (ground,
//! sea floor, cliff, ...) to concrete block codes. Presets cover the
//! common looks; anything else is a [`BlockTheme`] built with struct
//! update syntax over a preset:
//!
//! ```rust,ignore
//! let theme = BlockTheme { snow: Block::GLASS, ..ThemePreset::Arctic.theme() };
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tundra_core::Block;

use crate::error::GenError;

/// Role to block mapping used for one generation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockTheme {
    /// Empty space.
    pub air: Block,
    /// Below the ground surface.
    pub ground: Block,
    /// Top block of dry land.
    pub ground_surface: Block,
    /// Under water.
    pub sea_floor: Block,
    /// Liquid body.
    pub water: Block,
    /// Top liquid block over shallow water.
    pub water_surface: Block,
    /// Top liquid block over water deeper than three blocks.
    pub deep_water_surface: Block,
    /// Everything under the ground and sea floor layers.
    pub bedrock: Block,
    /// Steep surfaces.
    pub cliff: Block,
    /// High altitude surface.
    pub snow: Block,
    /// Tree leaves.
    pub foliage: Block,
    /// Tree trunks.
    pub tree_trunk: Block,
    /// Depth of the ground layer.
    pub ground_thickness: usize,
    /// Depth of the sea floor layer.
    pub seafloor_thickness: usize,
}

/// Named theme presets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemePreset {
    /// Grass, dirt, sand shores, oak trees.
    #[default]
    Forest,
    /// Snow-covered land and ice over the water.
    Arctic,
    /// Sand and gravel, sparse trees.
    Desert,
    /// Obsidian land around lava seas.
    Hell,
    /// Low muddy land with leafy water.
    Swamp,
}

impl ThemePreset {
    /// Every preset.
    pub const ALL: [Self; 5] = [Self::Forest, Self::Arctic, Self::Desert, Self::Hell, Self::Swamp];

    /// Preset name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Forest => "Forest",
            Self::Arctic => "Arctic",
            Self::Desert => "Desert",
            Self::Hell => "Hell",
            Self::Swamp => "Swamp",
        }
    }

    /// Block mapping of this preset.
    #[must_use]
    pub const fn theme(self) -> BlockTheme {
        match self {
            Self::Forest => BlockTheme {
                air: Block::AIR,
                ground: Block::DIRT,
                ground_surface: Block::GRASS,
                sea_floor: Block::SAND,
                water: Block::WATER,
                water_surface: Block::WATER,
                deep_water_surface: Block::WATER,
                bedrock: Block::STONE,
                cliff: Block::STONE,
                snow: Block::WHITE,
                foliage: Block::LEAVES,
                tree_trunk: Block::LOG,
                ground_thickness: 5,
                seafloor_thickness: 3,
            },
            Self::Arctic => BlockTheme {
                air: Block::AIR,
                ground: Block::WHITE,
                ground_surface: Block::WHITE,
                sea_floor: Block::WHITE,
                water: Block::WATER,
                water_surface: Block::GLASS,
                deep_water_surface: Block::WATER,
                bedrock: Block::STONE,
                cliff: Block::STONE,
                snow: Block::WHITE,
                foliage: Block::WHITE,
                tree_trunk: Block::LOG,
                ground_thickness: 1,
                seafloor_thickness: 1,
            },
            Self::Desert => BlockTheme {
                air: Block::AIR,
                ground: Block::SAND,
                ground_surface: Block::SAND,
                sea_floor: Block::SAND,
                water: Block::WATER,
                water_surface: Block::WATER,
                deep_water_surface: Block::WATER,
                bedrock: Block::STONE,
                cliff: Block::GRAVEL,
                snow: Block::WHITE,
                foliage: Block::LEAVES,
                tree_trunk: Block::LOG,
                ground_thickness: 6,
                seafloor_thickness: 3,
            },
            Self::Hell => BlockTheme {
                air: Block::AIR,
                ground: Block::OBSIDIAN,
                ground_surface: Block::OBSIDIAN,
                sea_floor: Block::OBSIDIAN,
                water: Block::LAVA,
                water_surface: Block::LAVA,
                deep_water_surface: Block::LAVA,
                bedrock: Block::STONE,
                cliff: Block::STONE,
                snow: Block::OBSIDIAN,
                foliage: Block::AIR,
                tree_trunk: Block::LOG,
                ground_thickness: 7,
                seafloor_thickness: 3,
            },
            Self::Swamp => BlockTheme {
                air: Block::AIR,
                ground: Block::DIRT,
                ground_surface: Block::GRASS,
                sea_floor: Block::DIRT,
                water: Block::WATER,
                water_surface: Block::LEAVES,
                deep_water_surface: Block::WATER,
                bedrock: Block::STONE,
                cliff: Block::DIRT,
                snow: Block::WHITE,
                foliage: Block::LEAVES,
                tree_trunk: Block::LOG,
                ground_thickness: 4,
                seafloor_thickness: 2,
            },
        }
    }
}

impl fmt::Display for ThemePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ThemePreset {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| GenError::UnknownTheme(s.to_string()))
    }
}

impl Default for BlockTheme {
    fn default() -> Self {
        ThemePreset::default().theme()
    }
}
