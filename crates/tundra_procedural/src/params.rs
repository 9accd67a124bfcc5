//! # Generator Parameters
//!
//! Each generator has its own parameter struct; [`GenParams`] is the sum
//! type over them. Parameters are validated before any voxel work and are
//! immutable afterwards.
//!
//! ## Parameter Documents
//!
//! Parameters round-trip through a TOML document with a top-level
//! `version` and a `generator` tag:
//!
//! ```toml
//! version = 2
//! generator = "Realistic"
//! seed = 1234
//! detail_scale = 7
//! feature_scale = 1
//! ```
//!
//! Version 0 documents name the noise scales `min_detail_size` and
//! `max_detail_size`, and carry no generator tag (only the realistic
//! generator existed). Missing fields take their defaults. The writer
//! always emits version 2.

use serde::{Deserialize, Serialize};
use tundra_core::map::Dimensions;

use crate::error::{GenError, GenResult};
use crate::noise::WorldSeed;
use crate::theme::ThemePreset;

/// Version written by [`GenParams::to_document`].
pub const PARAMS_DOCUMENT_VERSION: i64 = 2;

/// Parameters of the realistic (heightmap) generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealisticParams {
    /// Block theme preset.
    pub theme: ThemePreset,
    /// Random seed.
    pub seed: i64,
    /// Map size along X.
    pub width: usize,
    /// Map size along Y.
    pub length: usize,
    /// Map size along Z.
    pub height: usize,

    /// Highest terrain above the water level, in blocks.
    pub max_height: usize,
    /// Deepest terrain below the water level, in blocks.
    pub max_depth: usize,
    /// Extra per-column height jitter above water.
    pub max_height_variation: usize,
    /// Extra per-column depth jitter below water.
    pub max_depth_variation: usize,

    /// Fill below the water level with water.
    pub add_water: bool,
    /// Use `water_level` instead of `height / 2`.
    pub custom_water_level: bool,
    /// Pick the heightmap threshold so `water_coverage` of the map is wet.
    pub match_water_coverage: bool,
    /// Water level when `custom_water_level` is set.
    pub water_level: usize,
    /// Target wet fraction when `match_water_coverage` is set.
    pub water_coverage: f32,

    /// Skew the heightmap with corner and centre offsets.
    pub use_bias: bool,
    /// Apply the bias after layering and marbling instead of before.
    pub delay_bias: bool,
    /// Bias magnitude.
    pub bias: f32,
    /// Number of corners raised by `bias`.
    pub raised_corners: i32,
    /// Number of corners lowered by `bias`.
    pub lowered_corners: i32,
    /// Centre offset, multiplied by `bias`.
    pub mid_point: i32,

    /// Finest noise octave.
    pub detail_scale: i32,
    /// Coarsest noise octave.
    pub feature_scale: i32,
    /// Amplitude decay between octaves.
    pub roughness: f32,
    /// Blend a second heightmap through a sharpened mask.
    pub layered_heightmap: bool,
    /// Sine-fold the heightmap.
    pub marbled_heightmap: bool,
    /// Flip the heightmap.
    pub invert_heightmap: bool,
    /// Power applied to the profile above water.
    pub above_func_exponent: f32,
    /// Power applied to the profile below water.
    pub below_func_exponent: f32,

    /// Plant small trees.
    pub add_trees: bool,
    /// Plant giant trees first.
    pub add_giant_trees: bool,
    /// Minimum distance between trees.
    pub tree_spacing_min: usize,
    /// Maximum distance between trees.
    pub tree_spacing_max: usize,
    /// Minimum trunk height.
    pub tree_height_min: usize,
    /// Maximum trunk height.
    pub tree_height_max: usize,

    /// Carve air caves.
    pub add_caves: bool,
    /// Carve lava caves.
    pub add_cave_lava: bool,
    /// Carve water caves.
    pub add_cave_water: bool,
    /// Place ore deposits.
    pub add_ore: bool,
    /// Multiplier on the number of caves and deposits.
    pub cave_density: f32,
    /// Multiplier on cave diameter.
    pub cave_size: f32,

    /// Cover high terrain with snow.
    pub add_snow: bool,
    /// Altitude above which the surface is always snow.
    pub snow_altitude: usize,
    /// Height of the band below `snow_altitude` where snow is probabilistic.
    pub snow_transition: usize,

    /// Use the cliff block on steep surfaces.
    pub add_cliffs: bool,
    /// Measure slope over a blurred heightmap.
    pub cliff_smoothing: bool,
    /// Rise per block above which a surface counts as a cliff.
    pub cliff_threshold: f32,

    /// Turn shorelines into sea floor.
    pub add_beaches: bool,
    /// Horizontal reach of beaches from water.
    pub beach_extent: usize,
    /// Height of beaches above the water level.
    pub beach_height: usize,
}

impl Default for RealisticParams {
    fn default() -> Self {
        Self {
            theme: ThemePreset::Forest,
            seed: 0,
            width: 256,
            length: 256,
            height: 96,
            max_height: 20,
            max_depth: 12,
            max_height_variation: 4,
            max_depth_variation: 0,
            add_water: true,
            custom_water_level: false,
            match_water_coverage: false,
            water_level: 48,
            water_coverage: 0.5,
            use_bias: false,
            delay_bias: false,
            bias: 0.0,
            raised_corners: 0,
            lowered_corners: 0,
            mid_point: 0,
            detail_scale: 7,
            feature_scale: 1,
            roughness: 0.5,
            layered_heightmap: false,
            marbled_heightmap: false,
            invert_heightmap: false,
            above_func_exponent: 1.0,
            below_func_exponent: 1.0,
            add_trees: true,
            add_giant_trees: false,
            tree_spacing_min: 7,
            tree_spacing_max: 11,
            tree_height_min: 5,
            tree_height_max: 7,
            add_caves: false,
            add_cave_lava: false,
            add_cave_water: false,
            add_ore: false,
            cave_density: 2.0,
            cave_size: 1.0,
            add_snow: false,
            snow_altitude: 70,
            snow_transition: 7,
            add_cliffs: true,
            cliff_smoothing: true,
            cliff_threshold: 1.0,
            add_beaches: false,
            beach_extent: 6,
            beach_height: 2,
        }
    }
}

impl RealisticParams {
    /// Defaults sized to the given map.
    #[must_use]
    pub fn with_dimensions(width: usize, length: usize, height: usize) -> Self {
        Self { width, length, height, ..Self::default() }
    }

    /// Map extent.
    #[inline]
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.length, self.height)
    }

    /// Block level of the water surface.
    #[inline]
    #[must_use]
    pub const fn water_level(&self) -> usize {
        if self.custom_water_level {
            self.water_level
        } else {
            self.height / 2
        }
    }

    /// Checks every constraint.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::InvalidParams`] naming the first violated constraint.
    pub fn validate(&self) -> GenResult<()> {
        validate_dimensions(self.dimensions())?;
        let rules = [
            ((0.0..=1.0).contains(&self.water_coverage), "water_coverage must be in [0, 1]"),
            (
                self.raised_corners >= 0 && self.lowered_corners >= 0,
                "raised_corners and lowered_corners must be non-negative",
            ),
            (
                self.raised_corners + self.lowered_corners <= 4,
                "raised_corners + lowered_corners must not exceed 4",
            ),
            (
                self.tree_spacing_min >= 1 && self.tree_spacing_min <= self.tree_spacing_max,
                "tree_spacing_min must be at least 1 and not exceed tree_spacing_max",
            ),
            (
                self.tree_height_min >= 1 && self.tree_height_min <= self.tree_height_max,
                "tree_height_min must be at least 1 and not exceed tree_height_max",
            ),
            (self.cave_density >= 0.0, "cave_density must be non-negative"),
            (self.cave_size >= 0.0, "cave_size must be non-negative"),
            (
                !self.add_snow || self.snow_altitude < self.height,
                "snow_altitude must be below the map height",
            ),
            (
                !self.add_snow || self.snow_transition <= self.snow_altitude,
                "snow_transition must not exceed snow_altitude",
            ),
            (
                self.cliff_threshold.is_finite() && self.cliff_threshold >= 0.0,
                "cliff_threshold must be non-negative",
            ),
            (self.bias.is_finite(), "bias must be finite"),
            (self.feature_scale >= 0, "feature_scale must be non-negative"),
            (self.detail_scale >= self.feature_scale, "detail_scale must not be below feature_scale"),
            (
                self.roughness.is_finite() && self.roughness > 0.0,
                "roughness must be positive",
            ),
            (
                self.above_func_exponent > 0.0 && self.below_func_exponent > 0.0,
                "above_func_exponent and below_func_exponent must be positive",
            ),
            (
                !self.custom_water_level || self.water_level < self.height,
                "water_level must be below the map height",
            ),
        ];
        check_rules(&rules)
    }
}

/// Parameters of the classic generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassicParams {
    /// Random seed.
    pub seed: i64,
    /// Map size along X.
    pub width: usize,
    /// Map size along Y.
    pub length: usize,
    /// Map size along Z.
    pub height: usize,
    /// Water level, `height / 2` when unset.
    pub water_level: Option<usize>,
    /// Plant trees on grass.
    pub add_trees: bool,
}

impl Default for ClassicParams {
    fn default() -> Self {
        Self { seed: 0, width: 256, length: 256, height: 64, water_level: None, add_trees: true }
    }
}

impl ClassicParams {
    /// Map extent.
    #[inline]
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.length, self.height)
    }

    /// Effective water level.
    #[inline]
    #[must_use]
    pub fn water_level(&self) -> usize {
        self.water_level.unwrap_or(self.height / 2)
    }

    /// Checks dimensions and water level.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::InvalidParams`] on violation.
    pub fn validate(&self) -> GenResult<()> {
        validate_dimensions(self.dimensions())?;
        check_rules(&[(self.water_level() < self.height, "water_level must be below the map height")])
    }
}

/// Parameters of the flat generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatParams {
    /// Map size along X.
    pub width: usize,
    /// Map size along Y.
    pub length: usize,
    /// Map size along Z.
    pub height: usize,
    /// Number of solid layers, `height / 2` when unset.
    pub ground_level: Option<usize>,
}

impl Default for FlatParams {
    fn default() -> Self {
        Self { width: 256, length: 256, height: 64, ground_level: None }
    }
}

impl FlatParams {
    /// Map extent.
    #[inline]
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.length, self.height)
    }

    /// Effective ground level.
    #[inline]
    #[must_use]
    pub fn ground_level(&self) -> usize {
        self.ground_level.unwrap_or(self.height / 2)
    }

    /// Checks dimensions and ground level.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::InvalidParams`] on violation.
    pub fn validate(&self) -> GenResult<()> {
        validate_dimensions(self.dimensions())?;
        let level = self.ground_level();
        check_rules(&[(
            level >= 1 && level <= self.height,
            "ground_level must be in [1, height]",
        )])
    }
}

/// Parameters of any generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "generator")]
pub enum GenParams {
    /// Flat grass world.
    Flat(FlatParams),
    /// Classic-style noise terrain.
    Classic(ClassicParams),
    /// Heightmap terrain with caves, beaches and trees.
    Realistic(RealisticParams),
}

impl GenParams {
    /// Name of the generator these parameters belong to.
    #[must_use]
    pub const fn generator_name(&self) -> &'static str {
        match self {
            Self::Flat(_) => "Flat",
            Self::Classic(_) => "Classic",
            Self::Realistic(_) => "Realistic",
        }
    }

    /// Map extent.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        match self {
            Self::Flat(p) => p.dimensions(),
            Self::Classic(p) => p.dimensions(),
            Self::Realistic(p) => p.dimensions(),
        }
    }

    /// World seed (the flat generator has none and reports the default).
    #[must_use]
    pub fn seed(&self) -> WorldSeed {
        match self {
            Self::Flat(_) => WorldSeed::default(),
            Self::Classic(p) => WorldSeed::from(p.seed),
            Self::Realistic(p) => WorldSeed::from(p.seed),
        }
    }

    /// Validates the wrapped parameters.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::InvalidParams`] on violation.
    pub fn validate(&self) -> GenResult<()> {
        match self {
            Self::Flat(p) => p.validate(),
            Self::Classic(p) => p.validate(),
            Self::Realistic(p) => p.validate(),
        }
    }

    /// Writes a version 2 parameter document.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::Serialize`] if TOML encoding fails.
    pub fn to_document(&self) -> GenResult<String> {
        let mut value = toml::Value::try_from(self)?;
        if let toml::Value::Table(table) = &mut value {
            table.insert("version".to_string(), toml::Value::Integer(PARAMS_DOCUMENT_VERSION));
        }
        Ok(toml::to_string(&value)?)
    }

    /// Reads a version 0 or version 2 parameter document.
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML, unknown generators or unsupported versions.
    pub fn from_document(text: &str) -> GenResult<Self> {
        let mut table: toml::Table = text.parse()?;
        let version = match table.remove("version") {
            Some(toml::Value::Integer(v)) => v,
            Some(_) => return Err(GenError::InvalidParams("version must be an integer".into())),
            None => 0,
        };
        match version {
            0 => {
                for (old, new) in [("min_detail_size", "detail_scale"), ("max_detail_size", "feature_scale")] {
                    if let Some(v) = table.remove(old) {
                        table.insert(new.to_string(), v);
                    }
                }
                table
                    .entry("generator")
                    .or_insert(toml::Value::String("Realistic".to_string()));
            }
            PARAMS_DOCUMENT_VERSION => {}
            other => return Err(GenError::UnsupportedVersion(other)),
        }
        Ok(toml::Value::Table(table).try_into()?)
    }
}

fn validate_dimensions(dims: Dimensions) -> GenResult<()> {
    dims.validate().map(|_| ()).map_err(|_| {
        GenError::InvalidParams(format!(
            "map dimensions {}x{}x{} must each be in [1, 65536) with an addressable volume",
            dims.width, dims.length, dims.height
        ))
    })
}

fn check_rules(rules: &[(bool, &str)]) -> GenResult<()> {
    match rules.iter().find(|(ok, _)| !ok) {
        Some((_, message)) => Err(GenError::InvalidParams((*message).to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(RealisticParams::default().validate().is_ok());
        assert!(ClassicParams::default().validate().is_ok());
        assert!(FlatParams::default().validate().is_ok());
        assert!(RealisticParams::with_dimensions(64, 64, 64).validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let base = RealisticParams::default();
        let cases = [
            RealisticParams { width: 0, ..base.clone() },
            RealisticParams { water_coverage: 1.5, ..base.clone() },
            RealisticParams { raised_corners: 3, lowered_corners: 2, ..base.clone() },
            RealisticParams { raised_corners: -1, ..base.clone() },
            RealisticParams { tree_spacing_min: 12, ..base.clone() },
            RealisticParams { tree_height_min: 0, ..base.clone() },
            RealisticParams { cave_density: -1.0, ..base.clone() },
            RealisticParams { add_snow: true, snow_altitude: 96, ..base.clone() },
            RealisticParams { add_snow: true, snow_altitude: 5, snow_transition: 6, ..base.clone() },
            RealisticParams { cliff_threshold: -0.5, ..base.clone() },
            RealisticParams { detail_scale: 0, feature_scale: 1, ..base.clone() },
            RealisticParams { roughness: 0.0, ..base.clone() },
            RealisticParams { custom_water_level: true, water_level: 200, ..base.clone() },
        ];
        for params in cases {
            assert!(
                matches!(params.validate(), Err(GenError::InvalidParams(_))),
                "expected rejection: {params:?}"
            );
        }
    }

    #[test]
    fn test_water_level() {
        let params = RealisticParams::with_dimensions(64, 64, 64);
        assert_eq!(params.water_level(), 32);
        let custom = RealisticParams { custom_water_level: true, water_level: 10, ..params };
        assert_eq!(custom.water_level(), 10);
    }

    #[test]
    fn test_document_round_trip_v2() {
        let params = GenParams::Realistic(RealisticParams {
            seed: -42,
            theme: ThemePreset::Desert,
            roughness: 0.37,
            add_caves: true,
            bias: 0.8,
            raised_corners: 2,
            ..RealisticParams::default()
        });
        let text = params.to_document().unwrap();
        assert!(text.contains("version = 2"));
        assert!(text.contains("generator = \"Realistic\""));
        assert_eq!(GenParams::from_document(&text).unwrap(), params);

        for params in [
            GenParams::Flat(FlatParams { ground_level: Some(10), ..FlatParams::default() }),
            GenParams::Classic(ClassicParams { seed: 99, ..ClassicParams::default() }),
        ] {
            let text = params.to_document().unwrap();
            assert_eq!(GenParams::from_document(&text).unwrap(), params);
        }
    }

    #[test]
    fn test_document_v0_renamed_fields_and_defaults() {
        let text = r"
            version = 0
            seed = 7
            min_detail_size = 6
            max_detail_size = 2
            add_water = false
        ";
        let GenParams::Realistic(params) = GenParams::from_document(text).unwrap() else {
            panic!("v0 documents describe the realistic generator");
        };
        assert_eq!(params.detail_scale, 6);
        assert_eq!(params.feature_scale, 2);
        assert_eq!(params.seed, 7);
        assert!(!params.add_water);
        // Absent fields fall back to defaults
        assert_eq!(params.max_height, RealisticParams::default().max_height);
        assert_eq!(params.theme, ThemePreset::Forest);
    }

    #[test]
    fn test_document_v0_rewritten_as_v2() {
        let v0 = "version = 0\nmin_detail_size = 5\nmax_detail_size = 1\n";
        let params = GenParams::from_document(v0).unwrap();
        let v2 = params.to_document().unwrap();
        assert!(v2.contains("detail_scale = 5"));
        assert!(!v2.contains("min_detail_size"));
        assert_eq!(GenParams::from_document(&v2).unwrap(), params);
    }

    #[test]
    fn test_document_unsupported_version() {
        assert!(matches!(
            GenParams::from_document("version = 9\ngenerator = \"Flat\""),
            Err(GenError::UnsupportedVersion(9))
        ));
    }
}
