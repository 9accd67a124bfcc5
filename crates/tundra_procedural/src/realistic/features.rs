//! Post-processing: beaches and trees.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tundra_core::{Block, Map};

use crate::noise::Grid;
use crate::params::RealisticParams;
use crate::task::{GenContext, Step};
use crate::theme::BlockTheme;
use crate::tree::grow_tree;

/// Trees are only planted where the heightmap slope is below this.
const TREE_SLOPE_LIMIT: f32 = 0.5;

fn is_water(theme: &BlockTheme, block: Block) -> bool {
    block == theme.water || block == theme.water_surface || block == theme.deep_water_surface
}

/// Turns ground surface near water into sea floor.
///
/// A surface block at most `beach_height` above the water level becomes
/// sea floor, along with the ground under it, when a water surface block
/// lies within the sphere of radius `beach_extent + 1` around it.
pub(super) fn make_beaches(
    map: &mut Map,
    params: &RealisticParams,
    theme: &BlockTheme,
    ctx: &GenContext,
) -> Step<()> {
    let water_level = params.water_level() as i32;
    let reach = params.beach_extent as i32 + 1;
    let reach_sq = reach * reach;
    let (width, length) = (map.width() as i32, map.length() as i32);

    for y in 0..length {
        ctx.check()?;
        for x in 0..width {
            let Some(z) = map.surface_level(x, y) else { continue };
            if z < water_level || z > water_level + params.beach_height as i32 {
                continue;
            }
            if map.get(x, y, z) != Some(theme.ground_surface) {
                continue;
            }
            let dz = z - water_level;
            let near_water = (-reach..=reach).any(|dy| {
                (-reach..=reach).any(|dx| {
                    dx * dx + dy * dy + dz * dz <= reach_sq
                        && map.get(x + dx, y + dy, water_level).is_some_and(|b| is_water(theme, b))
                })
            });
            if !near_water {
                continue;
            }
            map.try_set(x, y, z, theme.sea_floor);
            if map.get(x, y, z - 1) == Some(theme.ground) {
                map.try_set(x, y, z - 1, theme.sea_floor);
            }
        }
    }
    Ok(())
}

/// Grid-jittered classic trees on gentle ground.
pub(super) fn plant_trees(
    map: &mut Map,
    params: &RealisticParams,
    theme: &BlockTheme,
    slope: &Grid,
    rng: &mut ChaCha8Rng,
    ctx: &GenContext,
) -> Step<()> {
    let spacing = params.tree_spacing_min..=params.tree_spacing_max;
    let heights = params.tree_height_min as i32..=params.tree_height_max as i32;
    let (width, length) = (map.width(), map.length());

    let mut y = rng.gen_range(0..params.tree_spacing_min);
    while y < length {
        ctx.check()?;
        let mut x = rng.gen_range(0..params.tree_spacing_min);
        while x < width {
            if slope.get(x, y) < TREE_SLOPE_LIMIT {
                let (xi, yi) = (x as i32, y as i32);
                if let Some(z) = map.surface_level(xi, yi) {
                    if map.get(xi, yi, z) == Some(theme.ground_surface) {
                        let height = rng.gen_range(heights.clone());
                        grow_tree(map, rng, (xi, yi, z + 1), height, theme.tree_trunk, theme.foliage);
                    }
                }
            }
            x += rng.gen_range(spacing.clone());
        }
        y += rng.gen_range(spacing.clone());
    }
    Ok(())
}

/// Number of giant trees for a map.
fn giant_tree_count(params: &RealisticParams) -> usize {
    let mean_spacing = (params.tree_spacing_min + params.tree_spacing_max) / 2;
    params.width * params.length * 4 / (1024 * mean_spacing.max(1))
}

/// Draws giant trees into a copy of the map while reading the original,
/// so trees never grow out of each other.
pub(super) fn plant_giant_trees(
    map: &mut Map,
    params: &RealisticParams,
    theme: &BlockTheme,
    rng: &mut ChaCha8Rng,
    ctx: &GenContext,
) -> Step<()> {
    let mut canvas = map.clone();
    let (width, length) = (map.width() as i32, map.length() as i32);
    let top = map.height() as i32 - 1;

    for _ in 0..giant_tree_count(params) {
        ctx.check()?;
        let x = rng.gen_range(0..width);
        let y = rng.gen_range(0..length);
        let Some(ground) = map.surface_level(x, y) else { continue };
        if map.get(x, y, ground) != Some(theme.ground_surface) {
            continue;
        }
        let max = params.tree_height_max as i32;
        let height = rng.gen_range(max * 2..=max * 3).min(top - ground - 1);
        if height < max {
            continue;
        }

        let crown_z = ground + height;
        let crown_radius = (height / 4).max(2);
        let crown_sq = crown_radius * crown_radius;
        for dz in -crown_radius..=crown_radius {
            for dy in -crown_radius..=crown_radius {
                for dx in -crown_radius..=crown_radius {
                    let d2 = dx * dx + dy * dy + dz * dz;
                    if d2 > crown_sq || (d2 * 4 > crown_sq * 3 && rng.gen_bool(0.5)) {
                        continue;
                    }
                    let (cx, cy, cz) = (x + dx, y + dy, crown_z + dz);
                    if map.get(cx, cy, cz).is_some_and(Block::is_air) {
                        canvas.try_set(cx, cy, cz, theme.foliage);
                    }
                }
            }
        }

        // Buttressed lower half, single column above
        for z in ground + 1..crown_z {
            let lower = z <= ground + height / 2;
            for (dx, dy) in [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)] {
                if (dx, dy) != (0, 0) && !lower {
                    continue;
                }
                if map.get(x + dx, y + dy, z).is_some_and(|b| b.is_air() || b == theme.foliage) {
                    canvas.try_set(x + dx, y + dy, z, theme.tree_trunk);
                }
            }
        }
    }
    *map = canvas;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    use crate::theme::ThemePreset;

    fn shore() -> (Map, RealisticParams) {
        let params = RealisticParams {
            beach_extent: 2,
            beach_height: 2,
            ..RealisticParams::with_dimensions(16, 8, 16)
        };
        let theme = ThemePreset::Forest.theme();
        let mut map = Map::new(16, 8, 16).unwrap();
        // Sea on the left half at level 8, land on the right at level 9
        for y in 0..8 {
            for x in 0..16 {
                if x < 8 {
                    map.fill_box((x, y, 0), (x, y, 5), theme.sea_floor);
                    map.fill_box((x, y, 6), (x, y, 7), theme.water);
                    map.set(x, y, 8, theme.water_surface).unwrap();
                } else {
                    map.fill_box((x, y, 0), (x, y, 8), theme.ground);
                    map.set(x, y, 9, theme.ground_surface).unwrap();
                }
            }
        }
        (map, params)
    }

    #[test]
    fn test_beaches_near_water_only() {
        let (mut map, params) = shore();
        let theme = params.theme.theme();
        make_beaches(&mut map, &params, &theme, &GenContext::detached()).unwrap();

        // dz = 1, so dx^2 <= 8 reaches two columns inland
        assert_eq!(map.get(8, 3, 9), Some(theme.sea_floor));
        assert_eq!(map.get(8, 3, 8), Some(theme.sea_floor));
        assert_eq!(map.get(9, 3, 9), Some(theme.sea_floor));
        assert_eq!(map.get(10, 3, 9), Some(theme.ground_surface));
        assert_eq!(map.get(15, 3, 9), Some(theme.ground_surface));
    }

    #[test]
    fn test_beaches_respect_height() {
        let (mut map, mut params) = shore();
        params.beach_height = 0;
        let theme = params.theme.theme();
        make_beaches(&mut map, &params, &theme, &GenContext::detached()).unwrap();
        assert_eq!(map.count(theme.sea_floor), 8 * 8 * 6);
    }

    #[test]
    fn test_trees_grow_on_ground_surface() {
        let params = RealisticParams::with_dimensions(48, 48, 32);
        let theme = params.theme.theme();
        let mut map = Map::new(48, 48, 32).unwrap();
        map.fill_layers(0, 10, theme.ground);
        map.fill_layers(10, 11, theme.ground_surface);
        let slope = Grid::new(48, 48);
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        plant_trees(&mut map, &params, &theme, &slope, &mut rng, &GenContext::detached()).unwrap();
        assert!(map.count(theme.tree_trunk) > 0);
        assert!(map.count(theme.foliage) > 0);

        // Steep everywhere: nothing grows
        let mut bare = Map::new(48, 48, 32).unwrap();
        bare.fill_layers(0, 11, theme.ground_surface);
        let steep = Grid::filled(48, 48, 1.0);
        plant_trees(&mut bare, &params, &theme, &steep, &mut rng, &GenContext::detached()).unwrap();
        assert_eq!(bare.count(theme.tree_trunk), 0);
    }

    #[test]
    fn test_giant_trees_read_original_map() {
        let params = RealisticParams {
            add_giant_trees: true,
            ..RealisticParams::with_dimensions(64, 64, 64)
        };
        assert_eq!(giant_tree_count(&params), 64 * 64 * 4 / (1024 * 9));
        let theme = params.theme.theme();
        let mut map = Map::new(64, 64, 64).unwrap();
        map.fill_layers(0, 10, theme.ground);
        map.fill_layers(10, 11, theme.ground_surface);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        plant_giant_trees(&mut map, &params, &theme, &mut rng, &GenContext::detached()).unwrap();
        assert!(map.count(theme.tree_trunk) > 0);
        assert_eq!(map.count(theme.ground_surface), 64 * 64);
    }
}
