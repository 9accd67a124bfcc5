//! Caves and ore: random walks stamping spheres into the bedrock block.
//!
//! Two shapes cover every call site. A cave is a jittery axis-aligned walk
//! with a varying diameter; a vein follows smoothed paths between random
//! waypoints with a fixed diameter. Both only replace the theme's bedrock
//! block, so surface layers and earlier carvings are kept.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tundra_core::{Block, Map};

use crate::params::RealisticParams;
use crate::task::{GenContext, Step};
use crate::theme::BlockTheme;

/// Attempts to find a bedrock seed voxel for a cave.
const SEED_ATTEMPTS: usize = 10_000;
/// Chance that a cave step carves rather than only moving.
const CARVE_CHANCE: f64 = 0.75;
/// Waypoints per vein unless the call site says otherwise.
const DEFAULT_VEIN_BRANCHES: usize = 10;

struct Carver<'a> {
    map: &'a mut Map,
    rng: &'a mut ChaCha8Rng,
    bedrock: Block,
}

impl Carver<'_> {
    fn random_point(&mut self) -> (i32, i32, i32) {
        (
            self.rng.gen_range(0..self.map.width() as i32),
            self.rng.gen_range(0..self.map.length() as i32),
            self.rng.gen_range(0..self.map.height() as i32),
        )
    }

    /// Replaces bedrock inside a sphere. Liquids above `ceiling` become air.
    fn stamp(&mut self, center: (i32, i32, i32), radius: i32, fill: Block, ceiling: Option<i32>) {
        let (cx, cy, cz) = center;
        let r2 = radius * radius;
        for dz in -radius..=radius {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx * dx + dy * dy + dz * dz > r2 {
                        continue;
                    }
                    let (x, y, z) = (cx + dx, cy + dy, cz + dz);
                    if self.map.get(x, y, z) != Some(self.bedrock) {
                        continue;
                    }
                    let block = match ceiling {
                        Some(limit) if fill.is_liquid() && z > limit => Block::AIR,
                        _ => fill,
                    };
                    self.map.try_set(x, y, z, block);
                }
            }
        }
    }

    fn single_cave(&mut self, fill: Block, length: usize, max_diameter: f32) {
        let mut start = None;
        for _ in 0..SEED_ATTEMPTS {
            let (x, y, z) = self.random_point();
            if self.map.get(x, y, z) == Some(self.bedrock) {
                start = Some((x, y, z));
                break;
            }
        }
        let Some(start) = start else { return };

        let width = self.map.width() as f32;
        let bounds = [self.map.width() as i32, self.map.length() as i32, self.map.height() as i32];
        let mut position = [start.0, start.1, start.2];
        for _ in 0..length {
            let mut diameter = (max_diameter * self.rng.gen::<f32>() * width) as i32;
            if diameter < 1 {
                diameter = 2;
            }
            let radius = (diameter / 2).max(1);

            let axis = self.rng.gen_range(0..3);
            let step = if self.rng.gen_bool(0.5) { 1 } else { -1 };
            position[axis] = (position[axis] + step).clamp(0, bounds[axis] - 1);

            if self.rng.gen_bool(CARVE_CHANCE) {
                self.stamp((position[0], position[1], position[2]), radius, fill, Some(start.2));
            }
        }
    }

    fn single_vein(&mut self, fill: Block, length: usize, max_diameter: f32, spread: f32, branches: usize) {
        let dims = [self.map.width() as f32, self.map.length() as f32, self.map.height() as f32];
        let radius_f = (max_diameter * dims[0] * 0.5).max(1.0);
        let radius = radius_f.round() as i32;
        let steps = (length / branches.max(1)).max(1);

        let start = self.random_point();
        let mut point = [start.0 as f32, start.1 as f32, start.2 as f32];
        for _ in 0..branches {
            let mut target = [0.0f32; 3];
            for ((t, &p), &dim) in target.iter_mut().zip(&point).zip(&dims) {
                let offset = (self.rng.gen::<f32>() - 0.5) * 0.5 * dim;
                *t = (p + offset).clamp(0.0, dim - 1.0);
            }
            for k in (1..=steps).rev() {
                let weight = 1.0 / k as f32;
                for (p, &t) in point.iter_mut().zip(&target) {
                    let wobble = spread * radius_f * (self.rng.gen::<f32>() - 0.5);
                    *p = (1.0 - weight) * *p + weight * t + wobble;
                }
                let center = (point[0].round() as i32, point[1].round() as i32, point[2].round() as i32);
                self.stamp(center, radius, fill, None);
            }
        }
    }
}

fn count(constant: f32, density: f32) -> usize {
    (constant * density).max(0.0) as usize
}

pub(super) fn add_caves(
    map: &mut Map,
    params: &RealisticParams,
    theme: &BlockTheme,
    rng: &mut ChaCha8Rng,
    ctx: &GenContext,
) -> Step<()> {
    let density = params.cave_density;
    let size = params.cave_size;
    let mut carver = Carver { map, rng, bedrock: theme.bedrock };

    if params.add_caves {
        for _ in 0..count(36.0, density) {
            carver.single_cave(Block::AIR, 30, 0.05 * size);
        }
        ctx.check()?;
        for _ in 0..count(9.0, density) {
            carver.single_vein(Block::AIR, 500, 0.015 * size, 1.0, DEFAULT_VEIN_BRANCHES);
        }
        ctx.check()?;
        for _ in 0..count(30.0, density) {
            carver.single_vein(Block::AIR, 300, 0.03 * size, 1.0, 20);
        }
        ctx.check()?;
    }

    for (enabled, liquid) in [(params.add_cave_lava, Block::LAVA), (params.add_cave_water, Block::WATER)] {
        if !enabled {
            continue;
        }
        for _ in 0..count(8.0, density) {
            carver.single_cave(liquid, 30, 0.05 * size);
        }
        for _ in 0..count(3.0, density) {
            carver.single_vein(liquid, 1000, 0.015 * size, 1.0, DEFAULT_VEIN_BRANCHES);
        }
        ctx.check()?;
    }

    if params.add_cave_lava || params.add_cave_water {
        seal_liquids(carver.map, ctx)?;
    }

    if params.add_ore {
        for _ in 0..count(12.0, density) {
            carver.single_cave(Block::COAL_ORE, 500, 0.03);
        }
        ctx.check()?;
        for _ in 0..count(32.0, density) {
            carver.single_vein(Block::COAL_ORE, 200, 0.015, 1.0, DEFAULT_VEIN_BRANCHES);
            carver.single_cave(Block::IRON_ORE, 500, 0.02);
        }
        ctx.check()?;
        for _ in 0..count(8.0, density) {
            carver.single_vein(Block::IRON_ORE, 200, 0.015, 1.0, DEFAULT_VEIN_BRANCHES);
            carver.single_vein(Block::GOLD_ORE, 200, 0.0145, 1.0, DEFAULT_VEIN_BRANCHES);
        }
        for _ in 0..count(20.0, density) {
            carver.single_cave(Block::GOLD_ORE, 400, 0.0175);
        }
        ctx.check()?;
    }
    Ok(())
}

/// Turns flowing liquid touching air or the map edge into its still variant.
pub(super) fn seal_liquids(map: &mut Map, ctx: &GenContext) -> Step<()> {
    const NEIGHBOURS: [(i32, i32, i32); 6] = [(1, 0, 0), (-1, 0, 0), (0, 1, 0), (0, -1, 0), (0, 0, 1), (0, 0, -1)];
    let (width, length, height) = (map.width() as i32, map.length() as i32, map.height() as i32);
    for z in 0..height {
        ctx.check()?;
        for y in 0..length {
            for x in 0..width {
                let Some(block) = map.get(x, y, z) else { continue };
                if !block.is_flowing_liquid() {
                    continue;
                }
                let exposed = NEIGHBOURS
                    .iter()
                    .any(|&(dx, dy, dz)| map.get(x + dx, y + dy, z + dz).map_or(true, Block::is_air));
                if exposed {
                    map.try_set(x, y, z, block.still_variant());
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn half_stone() -> Map {
        let mut map = Map::new(32, 32, 32).unwrap();
        map.fill_layers(0, 16, Block::STONE);
        map.fill_layers(16, 17, Block::GRASS);
        map
    }

    #[test]
    fn test_caves_only_replace_bedrock() {
        let mut map = half_stone();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut carver = Carver { map: &mut map, rng: &mut rng, bedrock: Block::STONE };
        for _ in 0..10 {
            carver.single_cave(Block::AIR, 30, 0.2);
            carver.single_vein(Block::COAL_ORE, 100, 0.1, 1.0, DEFAULT_VEIN_BRANCHES);
        }
        assert!(map.count(Block::STONE) < 32 * 32 * 16);
        assert_eq!(map.count(Block::GRASS), 32 * 32);
        for z in 17..32 {
            for y in 0..32 {
                for x in 0..32 {
                    assert_eq!(map.get(x, y, z), Some(Block::AIR));
                }
            }
        }
    }

    #[test]
    fn test_cave_without_bedrock_is_noop() {
        let mut map = Map::new(16, 16, 16).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        Carver { map: &mut map, rng: &mut rng, bedrock: Block::STONE }.single_cave(Block::LAVA, 30, 0.5);
        assert_eq!(map.count(Block::AIR), 16 * 16 * 16);
    }

    #[test]
    fn test_liquid_above_ceiling_becomes_air() {
        let mut map = Map::new(16, 16, 16).unwrap();
        map.fill(Block::STONE);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut carver = Carver { map: &mut map, rng: &mut rng, bedrock: Block::STONE };
        carver.stamp((8, 8, 8), 3, Block::WATER, Some(8));
        carver.stamp((3, 3, 3), 1, Block::GOLD_ORE, Some(0));

        assert_eq!(map.get(8, 8, 8), Some(Block::WATER));
        assert_eq!(map.get(8, 8, 5), Some(Block::WATER));
        assert_eq!(map.get(8, 8, 9), Some(Block::AIR));
        assert_eq!(map.get(8, 8, 11), Some(Block::AIR));
        // Solids ignore the ceiling
        assert_eq!(map.get(3, 3, 4), Some(Block::GOLD_ORE));
        assert_eq!(map.get(8, 8, 12), Some(Block::STONE));
    }

    #[test]
    fn test_seal_liquids() {
        let mut map = Map::new(4, 4, 4).unwrap();
        map.fill(Block::STONE);
        map.set(1, 1, 1, Block::WATER).unwrap();
        map.set(2, 1, 1, Block::LAVA).unwrap();
        map.set(2, 2, 1, Block::AIR).unwrap();
        map.set(0, 3, 3, Block::WATER).unwrap();
        seal_liquids(&mut map, &GenContext::detached()).unwrap();

        // Enclosed by stone and lava
        assert_eq!(map.get(1, 1, 1), Some(Block::WATER));
        // Next to air
        assert_eq!(map.get(2, 1, 1), Some(Block::STILL_LAVA));
        // On the map edge
        assert_eq!(map.get(0, 3, 3), Some(Block::STILL_WATER));
    }

    #[test]
    fn test_counts_scale_with_density() {
        assert_eq!(count(36.0, 2.0), 72);
        assert_eq!(count(36.0, 0.0), 0);
        assert_eq!(count(9.0, 0.5), 4);
    }
}
