//! Per-viewer interest management.
//!
//! A viewer sees other players inside [`VISIBLE_ADD_DISTANCE_SQ`] and
//! keeps seeing them until they pass [`VISIBLE_REMOVE_DISTANCE_SQ`]. The
//! gap between the two stops entities flickering at the boundary.

use std::collections::{HashMap, HashSet};

use tundra_core::{IdPool, Position};

use super::movement::MovementEncoder;
use crate::protocol::Packet;

/// Entity IDs a viewer can hand out (`0..=126`; `-1` is the viewer).
pub const MAX_VISIBLE_ENTITIES: usize = 127;
/// Squared fixed-point distance at which an entity is spawned.
pub const VISIBLE_ADD_DISTANCE_SQ: i64 = (64 * 32) * (64 * 32);
/// Squared fixed-point distance at which an entity is despawned.
pub const VISIBLE_REMOVE_DISTANCE_SQ: i64 = (72 * 32) * (72 * 32);

/// Another player as seen from the world roster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityView {
    /// Server-wide session number of the player.
    pub key: u64,
    /// Display name.
    pub name: String,
    /// Current position.
    pub position: Position,
}

#[derive(Clone, Debug)]
struct Tracked {
    id: u8,
    encoder: MovementEncoder,
}

/// Entities one client currently has spawned.
#[derive(Clone, Debug)]
pub struct VisibleEntities {
    pool: IdPool,
    tracked: HashMap<u64, Tracked>,
}

impl Default for VisibleEntities {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibleEntities {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self { pool: IdPool::new(MAX_VISIBLE_ENTITIES), tracked: HashMap::new() }
    }

    /// Number of spawned entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    /// True when nothing is spawned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Client-side ID of a spawned entity.
    #[must_use]
    pub fn id_of(&self, key: u64) -> Option<i8> {
        self.tracked.get(&key).map(|t| t.id as i8)
    }

    /// Spawns, moves and despawns entities for a viewer at `viewer`.
    ///
    /// `others` must not include the viewer. Entities missing from
    /// `others` are despawned.
    pub fn update<'a>(&mut self, viewer: Position, others: impl IntoIterator<Item = &'a EntityView>) -> Vec<Packet> {
        let mut packets = Vec::new();
        let mut seen = HashSet::new();

        for other in others {
            seen.insert(other.key);
            let distance = viewer.distance_squared(other.position);
            match self.tracked.get_mut(&other.key) {
                Some(tracked) if distance > VISIBLE_REMOVE_DISTANCE_SQ => {
                    let id = tracked.id;
                    self.tracked.remove(&other.key);
                    self.pool.release(id);
                    packets.push(Packet::RemoveEntity { id: id as i8 });
                }
                Some(tracked) => {
                    packets.extend(tracked.encoder.encode(tracked.id as i8, other.position));
                }
                None if distance <= VISIBLE_ADD_DISTANCE_SQ => {
                    let Some(id) = self.pool.acquire() else { continue };
                    self.tracked.insert(other.key, Tracked { id, encoder: MovementEncoder::new(other.position) });
                    packets.push(Packet::AddEntity { id: id as i8, name: other.name.clone(), position: other.position });
                }
                None => {}
            }
        }

        let gone: Vec<u64> = self.tracked.keys().filter(|key| !seen.contains(key)).copied().collect();
        for key in gone {
            packets.extend(self.remove(key));
        }
        packets
    }

    /// Despawns one entity.
    pub fn remove(&mut self, key: u64) -> Option<Packet> {
        let tracked = self.tracked.remove(&key)?;
        self.pool.release(tracked.id);
        Some(Packet::RemoveEntity { id: tracked.id as i8 })
    }

    /// Despawns everything, e.g. when the viewer changes world.
    pub fn clear(&mut self) -> Vec<Packet> {
        let packets = self.tracked.values().map(|t| Packet::RemoveEntity { id: t.id as i8 }).collect();
        self.tracked.clear();
        self.pool.clear();
        packets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(key: u64, x: i16) -> EntityView {
        EntityView { key, name: format!("p{key}"), position: Position::new(x, 0, 0, 0, 0) }
    }

    #[test]
    fn test_add_within_range() {
        let mut table = VisibleEntities::new();
        let packets = table.update(Position::default(), &[view(1, 100), view(2, 32_000)]);
        assert_eq!(packets.len(), 1);
        assert!(matches!(&packets[0], Packet::AddEntity { id: 0, name, .. } if name == "p1"));
        assert_eq!(table.id_of(1), Some(0));
        assert_eq!(table.id_of(2), None);
    }

    #[test]
    fn test_hysteresis_band() {
        let mut table = VisibleEntities::new();
        let between = 68 * 32;
        // Inside the band but never added: stays hidden
        assert!(table.update(Position::default(), &[view(1, between)]).is_empty());

        table.update(Position::default(), &[view(1, 10)]);
        // Inside the band once added: stays visible and moves
        let packets = table.update(Position::default(), &[view(1, between)]);
        assert!(matches!(packets[0], Packet::Teleport { id: 0, .. }));
        assert_eq!(table.len(), 1);

        let packets = table.update(Position::default(), &[view(1, 73 * 32)]);
        assert_eq!(packets, vec![Packet::RemoveEntity { id: 0 }]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_departed_entities_removed_and_ids_reused() {
        let mut table = VisibleEntities::new();
        table.update(Position::default(), &[view(1, 0), view(2, 0)]);
        let packets = table.update(Position::default(), &[view(2, 0)]);
        assert_eq!(packets, vec![Packet::RemoveEntity { id: 0 }]);
        let packets = table.update(Position::default(), &[view(2, 0), view(3, 0)]);
        assert!(matches!(packets[0], Packet::AddEntity { id: 0, .. }));
    }

    #[test]
    fn test_id_pool_limit() {
        let mut table = VisibleEntities::new();
        let crowd: Vec<EntityView> = (0..200).map(|k| view(k, 0)).collect();
        table.update(Position::default(), &crowd);
        assert_eq!(table.len(), MAX_VISIBLE_ENTITIES);
        assert_eq!(table.clear().len(), MAX_VISIBLE_ENTITIES);
        assert!(table.is_empty());
    }
}
