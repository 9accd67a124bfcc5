//! Classic tree growth.
//!
//! A tree needs a clear envelope above its base: nothing at the base
//! layer except the trunk cell, a 3x3 ring for most of the trunk and a
//! 5x5 ring for the top two layers. If any cell of the envelope is solid
//! or outside the map, nothing is written.

use rand::Rng;
use tundra_core::{Block, Map};

/// Shortest classic trunk.
pub const MIN_TREE_HEIGHT: i32 = 4;
/// Tallest classic trunk.
pub const MAX_TREE_HEIGHT: i32 = 6;

/// Random classic trunk height in `[4, 6]`.
pub fn random_tree_height<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    rng.gen_range(MIN_TREE_HEIGHT..=MAX_TREE_HEIGHT)
}

/// True when a tree of `height` fits with its trunk base at `base`.
#[must_use]
pub fn has_clearance(map: &Map, base: (i32, i32, i32), height: i32) -> bool {
    let (x, y, z) = base;
    (z..=z + 1 + height).all(|yy| {
        let radius = if yy == z {
            0
        } else if yy >= z + height - 1 {
            2
        } else {
            1
        };
        (-radius..=radius).all(|dy| {
            (-radius..=radius).all(|dx| map.get(x + dx, y + dy, yy).is_some_and(Block::is_air))
        })
    })
}

/// Grows a tree with its trunk base at `base`.
///
/// Returns false, leaving the map untouched, when the envelope is not clear.
pub fn grow_tree<R: Rng + ?Sized>(
    map: &mut Map,
    rng: &mut R,
    base: (i32, i32, i32),
    height: i32,
    trunk: Block,
    leaves: Block,
) -> bool {
    if height < 1 || !has_clearance(map, base, height) {
        return false;
    }
    let (x, y, z) = base;
    let top = z + height;

    map.try_set(x, y, z - 1, Block::DIRT);

    for yy in top - 3..=top {
        let n = yy - top;
        let radius = 1 - n / 2;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let corner = dx.abs() == radius && dy.abs() == radius;
                if corner && (n == 0 || rng.gen_bool(0.5)) {
                    continue;
                }
                if map.get(x + dx, y + dy, yy).is_some_and(Block::is_air) {
                    map.try_set(x + dx, y + dy, yy, leaves);
                }
            }
        }
    }

    for yy in z..top {
        map.try_set(x, y, yy, trunk);
    }
    true
}
