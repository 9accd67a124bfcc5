//! # Classic Generator
//!
//! Terrain in the style of the original Classic level generator, built on
//! the improved-noise family:
//!
//! 1. Heights from two domain-warped octave fields and a selector.
//! 2. Strata: bedrock floor, stone core, a dirt band of noisy thickness.
//! 3. Water flooded inward from the map border.
//! 4. Surface: grass, with sand on low shores and gravel under water.
//! 5. Trees in random patches.

use std::collections::VecDeque;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tundra_core::{Block, Map, Position};

use crate::noise::{CombinedNoise, OctaveNoise, WorldSeed};
use crate::params::ClassicParams;
use crate::task::{GenContext, Step};
use crate::tree::{grow_tree, random_tree_height};

/// Octave sums here run at full amplitude per octave, so they are scaled
/// up before the height constants apply.
const OCTAVE_GAIN: f64 = 32.0;

/// Trees attempted per patch.
const TREES_PER_PATCH: usize = 20;
/// Random steps per tree attempt.
const TREE_WALK_STEPS: usize = 20;

/// Cells processed between cancellation polls during the flood fill.
const FLOOD_POLL_INTERVAL: usize = 4096;

pub(crate) fn generate(params: &ClassicParams, ctx: &mut GenContext) -> Step<Map> {
    let mut rng = WorldSeed::from(params.seed).rng();
    let mut map = Map::new(params.width, params.length, params.height)?;
    let water_level = params.water_level() as i32;

    ctx.phase(10, "Raising")?;
    let heights = raise(params, &mut rng, ctx)?;

    ctx.phase(30, "Soiling")?;
    soil(&mut map, &heights, &mut rng, ctx)?;

    ctx.phase(50, "Flooding")?;
    flood(&mut map, water_level, ctx)?;

    ctx.phase(70, "Growing surface")?;
    grow_surface(&mut map, &heights, water_level, &mut rng, ctx)?;

    if params.add_trees {
        ctx.phase(85, "Planting trees")?;
        plant_trees(&mut map, &mut rng, ctx)?;
    }

    ctx.phase(95, "Placing spawn")?;
    let (cx, cy) = ((params.width / 2) as i32, (params.length / 2) as i32);
    let spawn_z = map.surface_level(cx, cy).map_or(water_level, |z| z + 1);
    map.set_spawn(Position::from_block(cx, cy, spawn_z + 1));
    Ok(map)
}

/// Column heights, `[y * width + x]`, clamped to `[1, height - 1]`.
fn raise(params: &ClassicParams, rng: &mut ChaCha8Rng, ctx: &GenContext) -> Step<Vec<i32>> {
    let low = CombinedNoise::new(OctaveNoise::new(8, rng), OctaveNoise::new(8, rng));
    let high = CombinedNoise::new(OctaveNoise::new(8, rng), OctaveNoise::new(8, rng));
    let selector = OctaveNoise::new(6, rng);

    let water_level = params.water_level() as f64;
    let top = params.height as i32 - 1;
    let mut heights = Vec::with_capacity(params.width * params.length);
    for y in 0..params.length {
        ctx.check()?;
        let fy = y as f64;
        for x in 0..params.width {
            let fx = x as f64;
            let height_low = low.compute(fx * 1.3, fy * 1.3) * OCTAVE_GAIN / 6.0 - 4.0;
            let height_high = high.compute(fx * 1.3, fy * 1.3) * OCTAVE_GAIN / 5.0 + 6.0;
            let mut h = if selector.compute(fx, fy) > 0.0 {
                height_low
            } else {
                height_low.max(height_high)
            };
            h *= 0.5;
            if h < 0.0 {
                h *= 0.8;
            }
            heights.push(((h + water_level) as i32).clamp(1, top.max(1)));
        }
    }
    Ok(heights)
}

fn soil(map: &mut Map, heights: &[i32], rng: &mut ChaCha8Rng, ctx: &GenContext) -> Step<()> {
    let thickness = OctaveNoise::new(8, rng);
    let (width, length) = (map.width(), map.length());
    for y in 0..length {
        ctx.check()?;
        for x in 0..width {
            let dirt_top = heights[y * width + x];
            let dirt_thickness = (thickness.compute(x as f64, y as f64) * OCTAVE_GAIN / 24.0 - 4.0) as i32;
            let stone_top = dirt_top + dirt_thickness;
            let (x, y) = (x as i32, y as i32);
            for z in 0..=dirt_top {
                let block = if z == 0 {
                    Block::BEDROCK
                } else if z <= stone_top {
                    Block::STONE
                } else {
                    Block::DIRT
                };
                map.try_set(x, y, z, block);
            }
        }
    }
    Ok(())
}

/// Breadth-first fill of air below `water_level` reachable from the border.
fn flood(map: &mut Map, water_level: i32, ctx: &GenContext) -> Step<()> {
    let surface = water_level - 1;
    if surface < 0 {
        return Ok(());
    }
    let (width, length) = (map.width() as i32, map.length() as i32);
    let mut queue = VecDeque::new();
    let mut seed = |map: &mut Map, x: i32, y: i32| {
        if map.get(x, y, surface) == Some(Block::AIR) {
            map.try_set(x, y, surface, Block::WATER);
            queue.push_back((x, y, surface));
        }
    };
    for x in 0..width {
        seed(map, x, 0);
        seed(map, x, length - 1);
    }
    for y in 0..length {
        seed(map, 0, y);
        seed(map, width - 1, y);
    }

    let mut processed = 0usize;
    while let Some((x, y, z)) = queue.pop_front() {
        processed += 1;
        if processed % FLOOD_POLL_INTERVAL == 0 {
            ctx.check()?;
        }
        for (nx, ny, nz) in [(x - 1, y, z), (x + 1, y, z), (x, y - 1, z), (x, y + 1, z), (x, y, z - 1)] {
            if map.get(nx, ny, nz) == Some(Block::AIR) {
                map.try_set(nx, ny, nz, Block::WATER);
                queue.push_back((nx, ny, nz));
            }
        }
    }
    Ok(())
}

fn grow_surface(
    map: &mut Map,
    heights: &[i32],
    water_level: i32,
    rng: &mut ChaCha8Rng,
    ctx: &GenContext,
) -> Step<()> {
    let sand = OctaveNoise::new(8, rng);
    let gravel = OctaveNoise::new(8, rng);
    let width = map.width();
    for y in 0..map.length() {
        ctx.check()?;
        for x in 0..width {
            let z = heights[y * width + x];
            let (fx, fy) = (x as f64, y as f64);
            let (x, y) = (x as i32, y as i32);
            match map.get(x, y, z + 1) {
                Some(Block::WATER) => {
                    if gravel.compute(fx, fy) * OCTAVE_GAIN > 12.0 {
                        map.try_set(x, y, z, Block::GRAVEL);
                    }
                }
                Some(Block::AIR) | None => {
                    let block = if z <= water_level && sand.compute(fx, fy) * OCTAVE_GAIN > 8.0 {
                        Block::SAND
                    } else {
                        Block::GRASS
                    };
                    map.try_set(x, y, z, block);
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

fn plant_trees(map: &mut Map, rng: &mut ChaCha8Rng, ctx: &GenContext) -> Step<()> {
    let (width, length) = (map.width() as i32, map.length() as i32);
    let patches = map.width() * map.length() / 4000;
    for _ in 0..patches {
        ctx.check()?;
        let patch_x = rng.gen_range(0..width);
        let patch_y = rng.gen_range(0..length);
        for _ in 0..TREES_PER_PATCH {
            let (mut x, mut y) = (patch_x, patch_y);
            for _ in 0..TREE_WALK_STEPS {
                x += rng.gen_range(0..6) - rng.gen_range(0..6);
                y += rng.gen_range(0..6) - rng.gen_range(0..6);
                if x < 0 || y < 0 || x >= width || y >= length || !rng.gen_bool(0.25) {
                    continue;
                }
                let Some(ground) = map.surface_level(x, y) else { continue };
                if map.get(x, y, ground) == Some(Block::GRASS) {
                    let height = random_tree_height(rng);
                    grow_tree(map, rng, (x, y, ground + 1), height, Block::LOG, Block::LEAVES);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(seed: i64) -> ClassicParams {
        ClassicParams { seed, width: 64, length: 64, height: 48, water_level: None, add_trees: true }
    }

    #[test]
    fn test_classic_is_deterministic() {
        let a = generate(&params(11), &mut GenContext::detached()).unwrap();
        let b = generate(&params(11), &mut GenContext::detached()).unwrap();
        let c = generate(&params(12), &mut GenContext::detached()).unwrap();
        assert_eq!(a.blocks(), b.blocks());
        assert_ne!(a.blocks(), c.blocks());
    }

    #[test]
    fn test_classic_strata() {
        let map = generate(&params(5), &mut GenContext::detached()).unwrap();
        for y in 0..64 {
            for x in 0..64 {
                assert_eq!(map.get(x, y, 0), Some(Block::BEDROCK));
            }
        }
        assert!(map.count(Block::STONE) > 0);
        assert!(map.count(Block::GRASS) + map.count(Block::SAND) > 0);
    }

    #[test]
    fn test_flood_stays_below_water_level() {
        let map = generate(&params(8), &mut GenContext::detached()).unwrap();
        let water_level = 24;
        for z in water_level..48 {
            for y in 0..64 {
                for x in 0..64 {
                    assert_ne!(map.get(x, y, z), Some(Block::WATER));
                }
            }
        }
    }

    #[test]
    fn test_flood_fills_open_basin() {
        let mut map = Map::new(8, 8, 8).unwrap();
        map.fill_layers(0, 2, Block::STONE);
        flood(&mut map, 4, &GenContext::detached()).unwrap();
        assert_eq!(map.count(Block::WATER), 8 * 8 * 2);
        assert_eq!(map.get(3, 3, 4), Some(Block::AIR));
    }

    #[test]
    fn test_flood_skips_enclosed_pocket() {
        let mut map = Map::new(8, 8, 8).unwrap();
        map.fill_layers(0, 6, Block::STONE);
        map.set(4, 4, 3, Block::AIR).unwrap();
        flood(&mut map, 4, &GenContext::detached()).unwrap();
        assert_eq!(map.get(4, 4, 3), Some(Block::AIR));
        assert_eq!(map.count(Block::WATER), 0);
    }
}
