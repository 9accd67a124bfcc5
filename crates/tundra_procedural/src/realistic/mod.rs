//! # Realistic Generator
//!
//! Heightmap terrain. Runs in phases, each of which polls cancellation:
//!
//! ```text
//! GeneratingHeightmap -> ProcessingHeightmap -> Voxelizing -> PostProcessing -> Done
//! ```
//!
//! The heightmap is a normalized [`Grid`]. Bias, layering, marbling and
//! inversion reshape it; a threshold splits it into land and water; a
//! power curve on each side sets the vertical profile. Voxelization turns
//! each column into blocks, after which caves, beaches and trees are
//! carved or planted.

mod caves;
mod features;
mod voxelize;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tundra_core::{Map, Position};

use crate::noise::{Grid, InterpolationMode, Noise, WorldSeed};
use crate::params::RealisticParams;
use crate::task::{GenContext, Step};

/// Heightmap value splitting land from water when coverage is not matched.
pub const DEFAULT_WATER_THRESHOLD: f32 = 0.5;

/// Blend mask values in this open band force cliffs.
pub(crate) const CLIFF_BLEND_BAND: (f32, f32) = (0.25, 0.75);

/// Processed heightmap and its companion grids.
#[derive(Clone, Debug)]
pub struct Terrain {
    /// Normalized heightmap after every transform and the power remap.
    pub heightmap: Grid,
    /// Slope of the heightmap, per cell.
    pub slope: Grid,
    /// Blend mask of a layered heightmap.
    pub blend: Option<Grid>,
    /// Per-column jitter in `[-1, 1]`.
    pub altitude: Option<Grid>,
    /// Heightmap value at the water surface.
    pub water_threshold: f32,
}

pub(crate) fn generate(params: &RealisticParams, ctx: &mut GenContext) -> Step<Map> {
    let theme = params.theme.theme();
    let mut rng = WorldSeed::from(params.seed).rng();

    let terrain = build_terrain(params, &mut rng, ctx)?;

    ctx.phase(50, "Voxelizing")?;
    let mut map = Map::new(params.width, params.length, params.height)?;
    voxelize::voxelize(&mut map, params, &theme, &terrain, &mut rng, ctx)?;

    if params.add_caves || params.add_ore || params.add_cave_lava || params.add_cave_water {
        ctx.phase(70, "Adding caves")?;
        caves::add_caves(&mut map, params, &theme, &mut rng, ctx)?;
    }

    if params.add_beaches {
        ctx.phase(80, "Making beaches")?;
        features::make_beaches(&mut map, params, &theme, ctx)?;
    }

    if params.add_trees {
        ctx.phase(90, "Planting trees")?;
        if params.add_giant_trees {
            features::plant_giant_trees(&mut map, params, &theme, &mut rng, ctx)?;
        }
        features::plant_trees(&mut map, params, &theme, &terrain.slope, &mut rng, ctx)?;
    }

    let (cx, cy) = ((params.width / 2) as i32, (params.length / 2) as i32);
    let ground = map.surface_level(cx, cy).unwrap_or(params.water_level() as i32);
    map.set_spawn(Position::from_block(cx, cy, ground + 2));
    Ok(map)
}

/// Runs the heightmap phases.
pub(crate) fn build_terrain(
    params: &RealisticParams,
    rng: &mut ChaCha8Rng,
    ctx: &mut GenContext,
) -> Step<Terrain> {
    let seed = WorldSeed::from(params.seed);
    let (width, length) = (params.width, params.length);
    let max_dim = width.max(length);

    ctx.phase(10, "Heightmap: priming")?;
    let mut heightmap = Grid::new(width, length);
    Noise::new(seed, InterpolationMode::Bicubic).perlin_noise_grid(
        &mut heightmap,
        params.feature_scale,
        params.detail_scale,
        params.roughness,
        0,
        0,
    );
    heightmap.normalize();

    if params.use_bias && !params.delay_bias {
        apply_bias(&mut heightmap, params, rng);
    }

    ctx.phase(20, "Heightmap: processing")?;
    let mut blend = None;
    if params.layered_heightmap {
        let mut second = Grid::new(width, length);
        Noise::new(seed.derive(1), InterpolationMode::Bicubic).perlin_noise_grid(&mut second, 0, 1, 0.6, 0, 0);
        second.normalize();

        let end_octave = (max_dim.max(1).ilog2() as i32 - 2).max(3);
        let mut mask = Grid::new(width, length);
        Noise::new(seed.derive(2), InterpolationMode::Cosine).perlin_noise_grid(&mut mask, 3, end_octave, 0.5, 0, 0);
        mask.normalize();
        mask.scale_and_clip(max_dim as f32 / 6.0);

        heightmap = Grid::blend(&heightmap, &second, &mask);
        heightmap.normalize();
        blend = Some(mask);
    }

    if params.marbled_heightmap {
        heightmap.marble();
        heightmap.normalize();
    }

    if params.invert_heightmap {
        heightmap.invert();
        heightmap.normalize();
    }

    if params.use_bias && params.delay_bias {
        apply_bias(&mut heightmap, params, rng);
    }
    ctx.check()?;

    let water_threshold = if params.match_water_coverage {
        heightmap.find_threshold(params.water_coverage)
    } else {
        DEFAULT_WATER_THRESHOLD
    };
    remap_profile(&mut heightmap, water_threshold, params.above_func_exponent, params.below_func_exponent);

    ctx.phase(30, "Heightmap: slopes")?;
    let slope = if params.cliff_smoothing {
        heightmap.gaussian_blur_5x5().calculate_slope()
    } else {
        heightmap.calculate_slope()
    };

    let altitude = (params.max_height_variation != 0 || params.max_depth_variation != 0).then(|| {
        let mut jitter = Grid::new(width, length);
        Noise::new(seed.derive(3), InterpolationMode::Cosine).perlin_noise_grid(&mut jitter, 1, 4, 0.5, 0, 0);
        jitter.normalize_range(-1.0, 1.0);
        jitter
    });

    Ok(Terrain { heightmap, slope, blend, altitude, water_threshold })
}

/// Normalizes, then adds the corner and centre displacement with the
/// corners shuffled.
fn apply_bias(heightmap: &mut Grid, params: &RealisticParams, rng: &mut ChaCha8Rng) {
    heightmap.normalize();
    let mut corners = [0.0f32; 4];
    let raised = params.raised_corners.max(0) as usize;
    let lowered = params.lowered_corners.max(0) as usize;
    for (i, corner) in corners.iter_mut().enumerate() {
        if i < raised {
            *corner = params.bias;
        } else if i < raised + lowered {
            *corner = -params.bias;
        }
    }
    corners.shuffle(rng);
    heightmap.apply_bias(
        corners[0],
        corners[1],
        corners[2],
        corners[3],
        params.mid_point as f32 * params.bias,
    );
    heightmap.normalize();
}

/// Power curve on each side of `threshold`; `threshold` itself is fixed
/// and values never cross it.
fn remap_profile(heightmap: &mut Grid, threshold: f32, above: f32, below: f32) {
    let threshold = threshold.clamp(0.0, 1.0);
    let span_above = 1.0 - threshold;
    for v in heightmap.data_mut() {
        if *v < threshold {
            let t = (threshold - *v) / threshold;
            *v = threshold - t.powf(below) * threshold;
        } else if span_above > 0.0 {
            let t = ((*v - threshold) / span_above).min(1.0);
            *v = threshold + t.powf(above) * span_above;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::RealisticTemplate;

    fn terrain(params: &RealisticParams) -> Terrain {
        let mut rng = WorldSeed::from(params.seed).rng();
        build_terrain(params, &mut rng, &mut GenContext::detached()).unwrap()
    }

    #[test]
    fn test_heightmap_is_normalized() {
        let params = RealisticParams { seed: 3, ..RealisticParams::with_dimensions(64, 64, 64) };
        let (min, max) = terrain(&params).heightmap.min_max();
        assert!(min.abs() < 1e-5);
        assert!((max - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_water_coverage_matched() {
        let params = RealisticParams {
            seed: 21,
            match_water_coverage: true,
            water_coverage: 0.5,
            above_func_exponent: 1.7,
            below_func_exponent: 0.6,
            ..RealisticParams::with_dimensions(96, 80, 64)
        };
        let terrain = terrain(&params);
        let coverage = terrain.heightmap.calculate_coverage(terrain.water_threshold);
        assert!((coverage - 0.5).abs() < 0.01, "coverage {coverage}");
    }

    #[test]
    fn test_every_shape_option_builds() {
        for template in [
            RealisticTemplate::Island,
            RealisticTemplate::Mountains,
            RealisticTemplate::Dunes,
            RealisticTemplate::Atoll,
            RealisticTemplate::Hell,
        ] {
            let mut params = template.params(48, 40, 48, 9);
            params.delay_bias = template == RealisticTemplate::Atoll;
            let terrain = terrain(&params);
            assert_eq!(terrain.heightmap.data().len(), 48 * 40);
            assert!(terrain.heightmap.data().iter().all(|v| v.is_finite()));
            assert_eq!(terrain.blend.is_some(), params.layered_heightmap);
        }
    }

    #[test]
    fn test_remap_keeps_threshold_and_order() {
        let mut grid = Grid::from_fn(11, 1, |x, _| x as f32 / 10.0);
        remap_profile(&mut grid, 0.4, 2.0, 0.5);
        let data = grid.data();
        assert!((data[4] - 0.4).abs() < 1e-6);
        assert!(data.windows(2).all(|w| w[0] <= w[1]));
        assert!(data[..4].iter().all(|&v| v < 0.4));
        assert!((data[10] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_bias_is_deterministic() {
        let params = RealisticParams {
            seed: 4,
            use_bias: true,
            bias: 0.8,
            raised_corners: 2,
            lowered_corners: 1,
            mid_point: -1,
            ..RealisticParams::with_dimensions(32, 32, 32)
        };
        assert_eq!(terrain(&params).heightmap, terrain(&params).heightmap);
    }
}
