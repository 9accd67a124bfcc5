//! Realistic generator templates: named starting points for
//! [`RealisticParams`].

use std::fmt;
use std::str::FromStr;

use crate::error::GenError;
use crate::params::RealisticParams;
use crate::theme::ThemePreset;

/// Named realistic terrain shapes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RealisticTemplate {
    /// The plain defaults.
    #[default]
    Default,
    /// A single flat layer at half height.
    Flat,
    /// Rolling dry land.
    Hills,
    /// One island in open water.
    Island,
    /// A ring of land around a lagoon.
    Atoll,
    /// Land with one side open to the sea.
    Bay,
    /// High snowy peaks.
    Mountains,
    /// Land around a central lake.
    Lake,
    /// Desert dunes.
    Dunes,
    /// Many small islands.
    Archipelago,
    /// A winding river across land.
    River,
    /// Many narrow streams.
    Streams,
    /// A tongue of land into the sea.
    Peninsula,
    /// Frozen sea with ice floes.
    Ice,
    /// Obsidian land around lava.
    Hell,
}

impl RealisticTemplate {
    /// Every template.
    pub const ALL: [Self; 15] = [
        Self::Default,
        Self::Flat,
        Self::Hills,
        Self::Island,
        Self::Atoll,
        Self::Bay,
        Self::Mountains,
        Self::Lake,
        Self::Dunes,
        Self::Archipelago,
        Self::River,
        Self::Streams,
        Self::Peninsula,
        Self::Ice,
        Self::Hell,
    ];

    /// Template name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::Flat => "Flat",
            Self::Hills => "Hills",
            Self::Island => "Island",
            Self::Atoll => "Atoll",
            Self::Bay => "Bay",
            Self::Mountains => "Mountains",
            Self::Lake => "Lake",
            Self::Dunes => "Dunes",
            Self::Archipelago => "Archipelago",
            Self::River => "River",
            Self::Streams => "Streams",
            Self::Peninsula => "Peninsula",
            Self::Ice => "Ice",
            Self::Hell => "Hell",
        }
    }

    /// Parameters for this template on a map of the given size.
    #[must_use]
    pub fn params(self, width: usize, length: usize, height: usize, seed: i64) -> RealisticParams {
        let mut params = RealisticParams { seed, ..RealisticParams::with_dimensions(width, length, height) };
        self.apply(&mut params);
        params
    }

    /// Overwrites the shape-related fields of `params`.
    ///
    /// Dimensions, seed and theme overrides made afterwards are kept by the
    /// caller; heights are scaled to the map where they would not fit.
    pub fn apply(self, p: &mut RealisticParams) {
        let high = p.height.saturating_sub(1);
        match self {
            Self::Default => {}
            Self::Flat => {
                p.max_height = 0;
                p.max_depth = 0;
                p.max_height_variation = 0;
                p.max_depth_variation = 0;
                p.add_water = false;
                p.add_trees = false;
                p.add_giant_trees = false;
                p.add_caves = false;
                p.add_ore = false;
                p.add_cave_lava = false;
                p.add_cave_water = false;
                p.add_beaches = false;
                p.add_cliffs = false;
                p.add_snow = false;
            }
            Self::Hills => {
                p.add_water = false;
                p.max_height = 8;
                p.max_depth = 8;
                p.feature_scale = 2;
                p.roughness = 0.75;
                p.tree_spacing_max = 12;
                p.tree_spacing_min = 6;
            }
            Self::Island => {
                p.use_bias = true;
                p.bias = 0.7;
                p.lowered_corners = 4;
                p.mid_point = 1;
                p.max_height = 16;
                p.max_depth = 40;
                p.max_depth_variation = 4;
                p.roughness = 0.45;
                p.add_beaches = true;
            }
            Self::Atoll => {
                p.theme = ThemePreset::Desert;
                p.use_bias = true;
                p.bias = 0.9;
                p.mid_point = 1;
                p.lowered_corners = 4;
                p.max_height = 2;
                p.max_depth = 39;
                p.invert_heightmap = true;
                p.add_trees = true;
                p.add_beaches = true;
                p.tree_spacing_max = 11;
                p.tree_spacing_min = 7;
            }
            Self::Bay => {
                p.use_bias = true;
                p.bias = 1.0;
                p.mid_point = -1;
                p.raised_corners = 3;
                p.max_height = 22;
                p.max_depth = 12;
                p.max_depth_variation = 4;
                p.add_beaches = true;
            }
            Self::Mountains => {
                p.add_water = false;
                p.max_height = high.min(p.height / 2 + 24).saturating_sub(p.height / 2);
                p.max_depth = 20;
                p.feature_scale = 1;
                p.detail_scale = 7;
                p.roughness = 0.65;
                p.above_func_exponent = 1.6;
                p.add_snow = true;
                p.snow_altitude = (p.height / 2 + p.max_height * 2 / 3).min(high);
                p.snow_transition = 5.min(p.snow_altitude);
                p.layered_heightmap = true;
                p.add_cliffs = true;
                p.cliff_threshold = 1.0;
            }
            Self::Lake => {
                p.use_bias = true;
                p.bias = 0.6;
                p.mid_point = -1;
                p.raised_corners = 4;
                p.max_height = 14;
                p.max_depth = 20;
                p.add_beaches = true;
            }
            Self::Dunes => {
                p.theme = ThemePreset::Desert;
                p.add_trees = false;
                p.add_water = false;
                p.max_height = 12;
                p.max_depth = 7;
                p.feature_scale = 2;
                p.detail_scale = 5;
                p.roughness = 0.4;
                p.marbled_heightmap = true;
                p.invert_heightmap = true;
                p.add_cliffs = false;
            }
            Self::Archipelago => {
                p.max_height = 8;
                p.max_depth = 20;
                p.feature_scale = 3;
                p.detail_scale = 8;
                p.match_water_coverage = true;
                p.water_coverage = 0.75;
                p.add_beaches = true;
                p.above_func_exponent = 1.4;
            }
            Self::River => {
                p.max_height = 8;
                p.max_depth = 6;
                p.feature_scale = 1;
                p.detail_scale = 6;
                p.marbled_heightmap = true;
                p.match_water_coverage = true;
                p.water_coverage = 0.2;
                p.add_beaches = true;
            }
            Self::Streams => {
                p.max_height = 5;
                p.max_depth = 4;
                p.feature_scale = 2;
                p.detail_scale = 7;
                p.marbled_heightmap = true;
                p.match_water_coverage = true;
                p.water_coverage = 0.1;
                p.tree_spacing_min = 5;
                p.tree_spacing_max = 8;
            }
            Self::Peninsula => {
                p.use_bias = true;
                p.bias = 0.5;
                p.raised_corners = 1;
                p.lowered_corners = 3;
                p.mid_point = 0;
                p.max_height = 22;
                p.max_depth = 12;
                p.add_beaches = true;
            }
            Self::Ice => {
                p.theme = ThemePreset::Arctic;
                p.add_trees = false;
                p.max_height = 2;
                p.max_depth = p.height / 2;
                p.match_water_coverage = true;
                p.water_coverage = 0.85;
                p.add_cliffs = false;
            }
            Self::Hell => {
                p.theme = ThemePreset::Hell;
                p.add_trees = false;
                p.add_cave_lava = true;
                p.max_height = 20;
                p.max_depth = 20;
                p.roughness = 0.6;
                p.layered_heightmap = true;
                p.add_cliffs = true;
            }
        }
    }
}

impl fmt::Display for RealisticTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RealisticTemplate {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|template| template.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| GenError::UnknownTemplate(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_template_validates() {
        for template in RealisticTemplate::ALL {
            for (w, l, h) in [(64, 64, 64), (256, 256, 96), (128, 64, 32)] {
                let params = template.params(w, l, h, 1);
                assert!(params.validate().is_ok(), "{template} at {w}x{l}x{h}: {:?}", params.validate());
            }
        }
    }

    #[test]
    fn test_flat_template() {
        let p = RealisticTemplate::Flat.params(64, 64, 64, 0);
        assert_eq!((p.max_height, p.max_depth, p.max_height_variation), (0, 0, 0));
        assert!(!p.add_water && !p.add_trees && !p.add_caves && !p.add_beaches && !p.add_cliffs);
    }

    #[test]
    fn test_parse() {
        assert_eq!("archipelago".parse::<RealisticTemplate>().unwrap(), RealisticTemplate::Archipelago);
        assert!("volcano".parse::<RealisticTemplate>().is_err());
    }
}
