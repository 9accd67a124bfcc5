//! Position delta encoding for entity updates.
//!
//! Each tracked entity remembers the last position sent for it and picks
//! the smallest packet that carries the change. Tiny changes are dropped
//! once in a row, and every [`FULL_POSITION_UPDATE_INTERVAL`] updates an
//! absolute teleport resynchronises the client.

use tundra_core::Position;

use crate::protocol::Packet;

/// Updates between forced absolute teleports.
pub const FULL_POSITION_UPDATE_INTERVAL: u32 = 20;
/// Squared fixed-point distance below which a move may be skipped.
pub const SKIP_MOVEMENT_THRESHOLD_SQ: i64 = 64;
/// Squared heading change below which a move may be skipped.
pub const SKIP_ROTATION_THRESHOLD_SQ: i32 = 1500;

/// Delta encoder for one entity as seen by one viewer.
#[derive(Clone, Debug)]
pub struct MovementEncoder {
    last_sent: Position,
    skipped_last: bool,
    since_full: u32,
}

impl MovementEncoder {
    /// Starts from the position the viewer was last told about.
    #[must_use]
    pub const fn new(initial: Position) -> Self {
        Self { last_sent: initial, skipped_last: false, since_full: 0 }
    }

    /// Position the viewer currently believes the entity is at.
    #[must_use]
    pub const fn last_sent(&self) -> Position {
        self.last_sent
    }

    /// Packet moving entity `id` to `next`, if one should be sent.
    pub fn encode(&mut self, id: i8, next: Position) -> Option<Packet> {
        let last = self.last_sent;
        if next == last {
            return None;
        }

        self.since_full += 1;
        if self.since_full >= FULL_POSITION_UPDATE_INTERVAL {
            self.since_full = 0;
            self.skipped_last = false;
            self.last_sent = next;
            return Some(Packet::Teleport { id, position: next });
        }

        let small = last.distance_squared(next) < SKIP_MOVEMENT_THRESHOLD_SQ
            && last.rotation_distance_squared(next) < SKIP_ROTATION_THRESHOLD_SQ;
        if small && !self.skipped_last {
            self.skipped_last = true;
            return None;
        }
        self.skipped_last = false;
        self.last_sent = next;
        Some(delta_packet(id, last, next))
    }
}

/// Smallest packet taking an entity from `last` to `next`.
#[must_use]
pub fn delta_packet(id: i8, last: Position, next: Position) -> Packet {
    let delta = |a: i16, b: i16| i8::try_from(i32::from(b) - i32::from(a)).ok();
    let moved = !last.same_location(next);
    let turned = !last.same_heading(next);

    if !moved {
        return Packet::Rotate { id, r: next.r, l: next.l };
    }
    match (delta(last.x, next.x), delta(last.y, next.y), delta(last.z, next.z)) {
        (Some(dx), Some(dy), Some(dz)) if turned => Packet::MoveRotate { id, dx, dy, dz, r: next.r, l: next.l },
        (Some(dx), Some(dy), Some(dz)) => Packet::Move { id, dx, dy, dz },
        _ => Packet::Teleport { id, position: next },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: i16, y: i16, z: i16, r: u8) -> Position {
        Position::new(x, y, z, r, 0)
    }

    #[test]
    fn test_zero_delta_sends_nothing() {
        let mut encoder = MovementEncoder::new(at(0, 0, 0, 0));
        assert_eq!(encoder.encode(1, at(0, 0, 0, 0)), None);
    }

    #[test]
    fn test_small_move_skipped_once() {
        let mut encoder = MovementEncoder::new(at(0, 0, 0, 0));
        assert!(encoder.encode(1, at(100, 0, 0, 0)).is_some());
        // Small, after a sent packet: coalesced
        assert_eq!(encoder.encode(1, at(103, 0, 0, 0)), None);
        // Small again: forced through, relative to the last sent position
        assert_eq!(encoder.encode(1, at(105, 0, 0, 0)), Some(Packet::Move { id: 1, dx: 5, dy: 0, dz: 0 }));
        assert_eq!(encoder.encode(1, at(106, 0, 0, 0)), None);
    }

    #[test]
    fn test_smallest_packet() {
        let base = at(1000, 1000, 1000, 10);
        assert_eq!(delta_packet(2, base, at(1000, 1000, 1000, 90)), Packet::Rotate { id: 2, r: 90, l: 0 });
        assert_eq!(
            delta_packet(2, base, at(1010, 990, 1000, 10)),
            Packet::Move { id: 2, dx: 10, dy: -10, dz: 0 }
        );
        assert_eq!(
            delta_packet(2, base, at(1010, 1000, 1127, 11)),
            Packet::MoveRotate { id: 2, dx: 10, dy: 0, dz: 127, r: 11, l: 0 }
        );
        let far = at(1128, 1000, 1000, 10);
        assert_eq!(delta_packet(2, base, far), Packet::Teleport { id: 2, position: far });
    }

    #[test]
    fn test_full_update_interval() {
        let mut encoder = MovementEncoder::new(at(0, 0, 0, 0));
        let mut teleports = 0;
        for i in 1..=FULL_POSITION_UPDATE_INTERVAL as i16 * 2 {
            if let Some(Packet::Teleport { .. }) = encoder.encode(0, at(i * 20, 0, 0, 0)) {
                teleports += 1;
            }
        }
        assert_eq!(teleports, 2);
    }
}
