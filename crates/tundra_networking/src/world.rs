//! A named world: its map buffer and the players standing in it.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tundra_core::{Block, Map, MapResult};

use crate::player::Player;
use crate::protocol::Packet;
use crate::session::EntityView;

/// A map buffer shared between the world and in-flight level transfers.
pub type SharedMap = Arc<RwLock<Map>>;

/// A loaded world.
#[derive(Debug)]
pub struct World {
    name: String,
    map: RwLock<SharedMap>,
    players: RwLock<BTreeMap<u64, Arc<Player>>>,
}

impl World {
    /// Wraps a map.
    #[must_use]
    pub fn new(name: impl Into<String>, map: Map) -> Self {
        Self {
            name: name.into(),
            map: RwLock::new(Arc::new(RwLock::new(map))),
            players: RwLock::new(BTreeMap::new()),
        }
    }

    /// World name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current map buffer.
    #[must_use]
    pub fn map(&self) -> SharedMap {
        Arc::clone(&self.map.read())
    }

    /// Swaps in a whole new map.
    ///
    /// Sessions that already hold the old buffer keep reading it until they
    /// rejoin; nobody ever sees a half-written map.
    pub fn replace_map(&self, map: Map) -> SharedMap {
        let shared = Arc::new(RwLock::new(map));
        *self.map.write() = Arc::clone(&shared);
        shared
    }

    /// Block at a coordinate, `None` out of bounds.
    #[must_use]
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Option<Block> {
        self.map().read().get(x, y, z)
    }

    /// Sets one block and returns the old one.
    ///
    /// # Errors
    ///
    /// Returns [`tundra_core::MapError::OutOfBounds`] outside the map.
    pub fn set_block(&self, x: i32, y: i32, z: i32, block: Block) -> MapResult<Block> {
        self.map().write().set(x, y, z, block)
    }

    /// Adds a player to the roster.
    pub fn add_player(&self, player: Arc<Player>) {
        self.players.write().insert(player.key(), player);
    }

    /// Removes a player from the roster.
    pub fn remove_player(&self, key: u64) -> Option<Arc<Player>> {
        self.players.write().remove(&key)
    }

    /// Players in the world, in join order of their session keys.
    #[must_use]
    pub fn players(&self) -> Vec<Arc<Player>> {
        self.players.read().values().cloned().collect()
    }

    /// Number of players in the world.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.read().len()
    }

    /// Positions of everyone except `except`, for visibility updates.
    #[must_use]
    pub fn entity_views(&self, except: u64) -> Vec<EntityView> {
        self.players
            .read()
            .values()
            .filter(|p| p.key() != except)
            .map(|p| EntityView { key: p.key(), name: p.name().to_owned(), position: p.position() })
            .collect()
    }

    /// Queues a bulk packet for everyone except `except`.
    pub fn broadcast(&self, packet: &Packet, except: Option<u64>) {
        for player in self.players.read().values() {
            if Some(player.key()) != except {
                player.send_bulk(packet.clone());
            }
        }
    }

    /// Sends chat text to everyone in the world.
    pub fn message(&self, text: &str) {
        for player in self.players.read().values() {
            player.message(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::test_player;
    use tundra_core::Position;

    fn world() -> World {
        World::new("main", Map::new(8, 8, 8).unwrap())
    }

    #[test]
    fn test_set_block_returns_old() {
        let world = world();
        assert_eq!(world.set_block(1, 1, 1, Block::STONE).unwrap(), Block::AIR);
        assert_eq!(world.get_block(1, 1, 1), Some(Block::STONE));
        assert!(world.set_block(8, 0, 0, Block::STONE).is_err());
    }

    #[test]
    fn test_replace_map_keeps_old_snapshot_intact() {
        let world = world();
        let old = world.map();
        let mut fresh = Map::new(8, 8, 8).unwrap();
        fresh.fill(Block::DIRT);
        world.replace_map(fresh);
        assert_eq!(old.read().get(0, 0, 0), Some(Block::AIR));
        assert_eq!(world.get_block(0, 0, 0), Some(Block::DIRT));
    }

    #[test]
    fn test_broadcast_skips_sender() {
        let world = world();
        let (alice, _, alice_bulk) = test_player(1, "alice");
        let (bob, _, bob_bulk) = test_player(2, "bob");
        world.add_player(alice);
        world.add_player(Arc::clone(&bob));
        world.broadcast(&Packet::set_block(0, 0, 0, Block::STONE), Some(1));
        assert!(alice_bulk.is_empty());
        assert_eq!(bob_bulk.len(), 1);

        bob.set_position(Position::new(32, 32, 32, 0, 0));
        let views = world.entity_views(1);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].name, "bob");
        assert_eq!(views[0].position, Position::new(32, 32, 32, 0, 0));
    }
}
