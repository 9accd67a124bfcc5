//! # Anti-Speedhack Detection
//!
//! Server-side movement validation for players without the speedhack
//! exemption.
//!
//! ## Detection Methods
//!
//! - **Packet spam**: more than [`SPAM_WINDOW`] movement packets inside
//!   [`SPAM_INTERVAL`] means the client is running fast.
//! - **Two-strike jump**: one large jump is tolerated (lag, respawn, a
//!   teleport the client has not seen yet) and stores a checkpoint. A
//!   second consecutive large jump is denied and the player is sent back
//!   to the checkpoint.
//! - **Freeze**: a frozen player may look around but not move; drift past
//!   [`FROZEN_DRIFT_SQ`] is answered with a teleport back.
//!
//! All distances are fixed-point units, 32 per block, `z` is height.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tundra_core::Position;

/// Movement packets tracked by the spam detector.
pub const SPAM_WINDOW: usize = 7;
/// A full window arriving faster than this is spam.
pub const SPAM_INTERVAL: Duration = Duration::from_millis(50);
/// Largest upward step per packet before it counts as a jump.
pub const MAX_JUMP_DELTA: i32 = 25;
/// Largest horizontal squared distance per packet (one block).
pub const MAX_DISTANCE_SQ: i32 = 32 * 32;
/// Squared drift a frozen player may accumulate before being pulled back.
pub const FROZEN_DRIFT_SQ: i64 = 32 * 32;

/// Why a movement was denied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    /// Too many packets in too little time.
    PacketSpam,
    /// Second consecutive large jump.
    RepeatedJump,
}

/// What to do with one movement packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MovementVerdict {
    /// Apply the movement.
    Accept,
    /// Ignore the movement and teleport the player to `revert_to`.
    Deny {
        /// Where to send the player.
        revert_to: Position,
        /// Which check fired.
        reason: DenyReason,
    },
}

impl MovementVerdict {
    /// Returns true for [`MovementVerdict::Accept`].
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Per-session speedhack state.
#[derive(Clone, Debug)]
pub struct SpeedhackDetector {
    /// Arrival times of recent movement packets.
    packet_times: VecDeque<Instant>,
    /// Large jumps seen in a row.
    strikes: u8,
    /// Position before the first strike.
    checkpoint: Position,
}

impl SpeedhackDetector {
    /// Creates a detector for a player standing at `position`.
    #[must_use]
    pub fn new(position: Position) -> Self {
        Self { packet_times: VecDeque::with_capacity(SPAM_WINDOW), strikes: 0, checkpoint: position }
    }

    /// Consecutive large jumps recorded so far.
    #[must_use]
    pub const fn strikes(&self) -> u8 {
        self.strikes
    }

    /// Position a repeated jump would revert to.
    #[must_use]
    pub const fn checkpoint(&self) -> Position {
        self.checkpoint
    }

    /// Forgets history, e.g. after a server-side teleport or world change.
    pub fn reset(&mut self, position: Position) {
        self.packet_times.clear();
        self.strikes = 0;
        self.checkpoint = position;
    }

    /// Records a packet arrival, returning true if the window filled too fast.
    pub fn is_spamming(&mut self, now: Instant) -> bool {
        if self.packet_times.len() >= SPAM_WINDOW {
            if let Some(oldest) = self.packet_times.pop_front() {
                if now.saturating_duration_since(oldest) < SPAM_INTERVAL {
                    return true;
                }
            }
        }
        self.packet_times.push_back(now);
        false
    }

    /// Checks a move from `current` to `next` against both detectors.
    pub fn check(&mut self, now: Instant, current: Position, next: Position) -> MovementVerdict {
        if self.is_spamming(now) {
            tracing::debug!("movement packet spam");
            return MovementVerdict::Deny { revert_to: current, reason: DenyReason::PacketSpam };
        }
        self.check_jump(current, next)
    }

    /// Two-strike large jump detection.
    pub fn check_jump(&mut self, current: Position, next: Position) -> MovementVerdict {
        if !is_large_jump(current, next) {
            self.strikes = 0;
            return MovementVerdict::Accept;
        }
        if self.strikes == 0 {
            self.checkpoint = current;
            self.strikes = 1;
            MovementVerdict::Accept
        } else {
            self.strikes = 0;
            tracing::debug!(x = self.checkpoint.x, y = self.checkpoint.y, z = self.checkpoint.z, "repeated jump");
            MovementVerdict::Deny { revert_to: self.checkpoint, reason: DenyReason::RepeatedJump }
        }
    }
}

/// True when a move covers more than a block horizontally or climbs too fast.
#[must_use]
pub fn is_large_jump(current: Position, next: Position) -> bool {
    let dx = i32::from(next.x) - i32::from(current.x);
    let dy = i32::from(next.y) - i32::from(current.y);
    let dz = i32::from(next.z) - i32::from(current.z);
    dx * dx + dy * dy > MAX_DISTANCE_SQ || dz > MAX_JUMP_DELTA
}

/// Outcome for a frozen player's movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrozenMove {
    /// Position to record: the anchor location with the new heading.
    pub position: Position,
    /// The player drifted too far and must be teleported back.
    pub teleport: bool,
}

/// Pins a frozen player to `anchor` while letting the heading change.
#[must_use]
pub fn frozen_move(anchor: Position, next: Position) -> FrozenMove {
    FrozenMove {
        position: anchor.with_heading_of(next),
        teleport: anchor.distance_squared(next) > FROZEN_DRIFT_SQ,
    }
}
