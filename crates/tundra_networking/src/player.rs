//! Shared handle to a logged-in player.
//!
//! The session thread owns the socket; everything else talks to the
//! player through this handle. Outbound packets go through two channels:
//! priority traffic (chat, entity movement, kicks) is always written before
//! bulk traffic (block updates).

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::{Mutex, RwLock};
use tundra_core::Position;

use crate::protocol::{chat_packets, Packet};
use crate::session::LeaveReason;
use crate::world::World;

/// A logged-in player.
#[derive(Debug)]
pub struct Player {
    key: u64,
    name: String,
    address: IpAddr,
    rank: String,
    can_speedhack: bool,
    user_type: AtomicU8,
    position: Mutex<Position>,
    world: RwLock<Option<Arc<World>>>,
    frozen: AtomicBool,
    muted: AtomicBool,
    priority: Sender<Packet>,
    bulk: Sender<Packet>,
    kick: Mutex<Option<(LeaveReason, String)>>,
}

/// Login-time facts used to build a [`Player`].
#[derive(Clone, Debug)]
pub struct PlayerInfo {
    /// Server-wide session number.
    pub key: u64,
    /// Name as typed by the client.
    pub name: String,
    /// Remote address.
    pub address: IpAddr,
    /// Rank name.
    pub rank: String,
    /// Handshake user type.
    pub user_type: u8,
    /// Skips anti-speedhack checks.
    pub can_speedhack: bool,
    /// Starts frozen.
    pub frozen: bool,
    /// Starts muted.
    pub muted: bool,
}

impl Player {
    /// Creates a handle whose packets are delivered through the two senders.
    #[must_use]
    pub fn new(info: PlayerInfo, priority: Sender<Packet>, bulk: Sender<Packet>) -> Self {
        Self {
            key: info.key,
            name: info.name,
            address: info.address,
            rank: info.rank,
            can_speedhack: info.can_speedhack,
            user_type: AtomicU8::new(info.user_type),
            position: Mutex::new(Position::default()),
            world: RwLock::new(None),
            frozen: AtomicBool::new(info.frozen),
            muted: AtomicBool::new(info.muted),
            priority,
            bulk,
            kick: Mutex::new(None),
        }
    }

    /// Server-wide session number.
    #[must_use]
    pub const fn key(&self) -> u64 {
        self.key
    }

    /// Player name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remote address.
    #[must_use]
    pub const fn address(&self) -> IpAddr {
        self.address
    }

    /// Rank name.
    #[must_use]
    pub fn rank(&self) -> &str {
        &self.rank
    }

    /// True if movement checks are skipped for this player.
    #[must_use]
    pub const fn can_speedhack(&self) -> bool {
        self.can_speedhack
    }

    /// Handshake user type.
    #[must_use]
    pub fn user_type(&self) -> u8 {
        self.user_type.load(Ordering::Relaxed)
    }

    /// Changes the user type and tells the client.
    pub fn set_user_type(&self, user_type: u8) {
        self.user_type.store(user_type, Ordering::Relaxed);
        self.send(Packet::SetPermission { user_type });
    }

    /// Last accepted position.
    #[must_use]
    pub fn position(&self) -> Position {
        *self.position.lock()
    }

    /// Stores a new accepted position.
    pub fn set_position(&self, position: Position) {
        *self.position.lock() = position;
    }

    /// World the player is in, if joined.
    #[must_use]
    pub fn world(&self) -> Option<Arc<World>> {
        self.world.read().clone()
    }

    pub(crate) fn set_world(&self, world: Option<Arc<World>>) {
        *self.world.write() = world;
    }

    /// True if the player cannot move.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Relaxed)
    }

    /// Freezes or unfreezes the player.
    pub fn set_frozen(&self, frozen: bool) {
        self.frozen.store(frozen, Ordering::Relaxed);
    }

    /// True if chat from the player is dropped.
    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    /// Mutes or unmutes the player.
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    /// Queues a latency-sensitive packet.
    pub fn send(&self, packet: Packet) {
        // A closed channel means the session is already gone
        let _ = self.priority.send(packet);
    }

    /// Queues a packet behind all priority traffic.
    pub fn send_bulk(&self, packet: Packet) {
        let _ = self.bulk.send(packet);
    }

    /// Sends chat text, wrapped into as many lines as needed.
    pub fn message(&self, text: &str) {
        for packet in chat_packets("", text) {
            self.send(packet);
        }
    }

    /// Asks the session to disconnect the player on its next iteration.
    ///
    /// The first kick wins; later ones are ignored.
    pub fn kick(&self, reason: LeaveReason, message: impl Into<String>) {
        let mut pending = self.kick.lock();
        if pending.is_none() {
            *pending = Some((reason, message.into()));
        }
    }

    /// True once a kick has been requested.
    #[must_use]
    pub fn is_kicked(&self) -> bool {
        self.kick.lock().is_some()
    }

    pub(crate) fn take_kick(&self) -> Option<(LeaveReason, String)> {
        self.kick.lock().take()
    }
}

#[cfg(test)]
pub(crate) fn test_player(key: u64, name: &str) -> (Arc<Player>, crossbeam_channel::Receiver<Packet>, crossbeam_channel::Receiver<Packet>) {
    use std::net::Ipv4Addr;

    let (priority_tx, priority_rx) = crossbeam_channel::unbounded();
    let (bulk_tx, bulk_rx) = crossbeam_channel::unbounded();
    let info = PlayerInfo {
        key,
        name: name.to_owned(),
        address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        rank: "guest".to_owned(),
        user_type: 0,
        can_speedhack: false,
        frozen: false,
        muted: false,
    };
    (Arc::new(Player::new(info, priority_tx, bulk_tx)), priority_rx, bulk_rx)
}
