//! Column-by-column conversion of the processed heightmap into blocks.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tundra_core::{Block, Map};

use super::{Terrain, CLIFF_BLEND_BAND};
use crate::params::RealisticParams;
use crate::task::{GenContext, Step};
use crate::theme::BlockTheme;

/// Water deeper than this gets the deep surface block.
const DEEP_WATER_DEPTH: i32 = 3;

/// Fills every column from bedrock up to its terrain level, flooding
/// columns below the water level.
pub(super) fn voxelize(
    map: &mut Map,
    params: &RealisticParams,
    theme: &BlockTheme,
    terrain: &Terrain,
    rng: &mut ChaCha8Rng,
    ctx: &GenContext,
) -> Step<()> {
    let width = map.width();
    let top = map.height() as i32 - 1;
    let water_level = params.water_level() as i32;
    let threshold = terrain.water_threshold;

    for y in 0..map.length() {
        ctx.check()?;
        for x in 0..width {
            let value = terrain.heightmap.get(x, y);
            let jitter = terrain.altitude.as_ref().map_or(0.0, |grid| grid.get(x, y));
            let underwater = value < threshold;

            // Blocks per heightmap unit on this side of the threshold
            let vertical_scale = if underwater {
                (params.max_depth as f32 + jitter * params.max_depth_variation as f32) / threshold
            } else if threshold < 1.0 {
                (params.max_height as f32 + jitter * params.max_height_variation as f32) / (1.0 - threshold)
            } else {
                0.0
            };
            let offset = if underwater {
                -((threshold - value) * vertical_scale).round() as i32
            } else {
                ((value - threshold) * vertical_scale).round() as i32
            };
            let level = (water_level + offset).clamp(0, top);

            let (xi, yi) = (x as i32, y as i32);
            if params.add_water && level < water_level {
                fill_water_column(map, theme, (xi, yi), level, water_level);
                continue;
            }

            let steep = terrain.slope.get(x, y) * vertical_scale.abs() >= params.cliff_threshold;
            let banded = terrain
                .blend
                .as_ref()
                .is_some_and(|mask| {
                    let m = mask.get(x, y);
                    m > CLIFF_BLEND_BAND.0 && m < CLIFF_BLEND_BAND.1
                });
            let cliff = params.add_cliffs && (steep || banded);
            let surface = if cliff {
                theme.cliff
            } else if params.add_snow && is_snowy(params, level, rng) {
                theme.snow
            } else {
                theme.ground_surface
            };
            let ground = if cliff { theme.cliff } else { theme.ground };
            fill_land_column(map, theme, (xi, yi), level, surface, ground);
        }
    }
    Ok(())
}

fn is_snowy(params: &RealisticParams, level: i32, rng: &mut ChaCha8Rng) -> bool {
    let altitude = params.snow_altitude as i32;
    let transition = params.snow_transition as i32;
    if level >= altitude {
        return true;
    }
    let band_start = altitude - transition;
    if transition == 0 || level <= band_start {
        return false;
    }
    let chance = f64::from(level - band_start) / f64::from(transition);
    rng.gen_bool(chance.clamp(0.0, 1.0))
}

fn fill_land_column(map: &mut Map, theme: &BlockTheme, (x, y): (i32, i32), level: i32, surface: Block, ground: Block) {
    let ground_floor = level - theme.ground_thickness as i32;
    for z in 0..level {
        let block = if z >= ground_floor { ground } else { theme.bedrock };
        map.try_set(x, y, z, block);
    }
    map.try_set(x, y, level, surface);
}

fn fill_water_column(map: &mut Map, theme: &BlockTheme, (x, y): (i32, i32), level: i32, water_level: i32) {
    let floor_bottom = level - theme.seafloor_thickness as i32;
    for z in 0..=level {
        let block = if z > floor_bottom { theme.sea_floor } else { theme.bedrock };
        map.try_set(x, y, z, block);
    }
    for z in level + 1..water_level {
        map.try_set(x, y, z, theme.water);
    }
    let surface = if water_level - level > DEEP_WATER_DEPTH {
        theme.deep_water_surface
    } else {
        theme.water_surface
    };
    map.try_set(x, y, water_level, surface);
}
