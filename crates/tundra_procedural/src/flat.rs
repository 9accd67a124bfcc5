//! Flat generator: dirt up to one layer below the ground level, grass on
//! top, air above.

use tundra_core::{Block, Map, Position};

use crate::params::FlatParams;
use crate::task::{GenContext, Step};

pub(crate) fn generate(params: &FlatParams, ctx: &mut GenContext) -> Step<Map> {
    ctx.phase(10, "Filling ground")?;
    let mut map = Map::new(params.width, params.length, params.height)?;
    let ground = params.ground_level();

    map.fill_layers(0, ground - 1, Block::DIRT);
    map.fill_layers(ground - 1, ground, Block::GRASS);

    ctx.phase(90, "Placing spawn")?;
    map.set_spawn(Position::from_block(
        (params.width / 2) as i32,
        (params.length / 2) as i32,
        ground as i32 + 1,
    ));
    Ok(map)
}
