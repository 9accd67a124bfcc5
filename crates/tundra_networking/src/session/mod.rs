//! # Sessions
//!
//! One thread per client. A session walks through
//!
//! ```text
//! Connecting → Authenticating → JoiningWorld → Ready → Disconnecting → Closed
//! ```
//!
//! Login and the level transfer use blocking reads with a long timeout. In
//! the ready state the socket read timeout doubles as the poll interval:
//! every iteration checks for kicks, pings, writes queued packets (priority
//! first, at most [`MAX_SESSION_PACKETS_PER_TICK`]), reads whatever the
//! client sent and refreshes visible entities.

mod greeting;
mod hooks;
mod leave;
mod movement;
mod visibility;

pub use greeting::{utc_time_of_day, Greeting};
pub use hooks::{
    AccessPolicy, AllowAll, BanAttempt, BlockChange, BlockHooks, BroadcastChat, ChatError, ChatHandler, Collaborators,
    InMemoryAccess, InMemoryDirectory, MovementHook, PlayerDirectory, PlayerRecord,
};
pub use leave::LeaveReason;
pub use movement::{
    delta_packet, MovementEncoder, FULL_POSITION_UPDATE_INTERVAL, SKIP_MOVEMENT_THRESHOLD_SQ, SKIP_ROTATION_THRESHOLD_SQ,
};
pub use visibility::{
    EntityView, VisibleEntities, MAX_VISIBLE_ENTITIES, VISIBLE_ADD_DISTANCE_SQ, VISIBLE_REMOVE_DISTANCE_SQ,
};

use std::io::{self, BufWriter, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, info, warn};
use tundra_core::{Block, Position};
use tundra_security::{frozen_move, is_valid_chat, is_valid_name, verify_name, MovementVerdict, NameCheck, NameDecision, SpeedhackDetector};

use crate::error::{is_timeout, ProtocolError, SessionError, SessionResult};
use crate::player::{Player, PlayerInfo};
use crate::protocol::{legacy_kick, OpCode, Packet, PROTOCOL_VERSION, SELF_ID};
use crate::server::ServerContext;
use crate::world::World;

/// Socket read timeout in the ready state; also the loop's idle sleep.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);
/// Read timeout while waiting for the handshake.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);
/// Keepalive interval.
pub const PING_INTERVAL: Duration = Duration::from_secs(3);
/// Outbound packets written per loop iteration.
pub const MAX_SESSION_PACKETS_PER_TICK: usize = 128;
/// Interval between visible-entity refreshes.
pub const ENTITY_UPDATE_INTERVAL: Duration = Duration::from_millis(50);
/// Silence after which a client is dropped.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60);
/// First byte of the handshake of the later, incompatible client protocol.
pub const LEGACY_HANDSHAKE_OPCODE: u8 = 0x02;

const READ_CHUNK: usize = 4096;

/// Where a session is in its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Socket accepted, nothing read yet.
    Connecting,
    /// Handshake received, running login checks.
    Authenticating,
    /// Sending a level.
    JoiningWorld,
    /// Normal traffic.
    Ready,
    /// Tearing down.
    Disconnecting,
    /// Socket closed.
    Closed,
}

/// One client connection.
pub struct Session {
    stream: TcpStream,
    writer: BufWriter<TcpStream>,
    peer: SocketAddr,
    context: Arc<ServerContext>,
    state: SessionState,
    inbound: Vec<u8>,
    priority_tx: Sender<Packet>,
    priority_rx: Receiver<Packet>,
    bulk_tx: Sender<Packet>,
    bulk_rx: Receiver<Packet>,
    player: Option<Arc<Player>>,
    detector: SpeedhackDetector,
    visible: VisibleEntities,
    holds_connection_slot: bool,
    last_ping: Instant,
    last_visibility: Instant,
    last_activity: Instant,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("peer", &self.peer)
            .field("state", &self.state)
            .field("player", &self.player.as_ref().map(|p| p.name().to_owned()))
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Wraps an accepted socket.
    ///
    /// # Errors
    ///
    /// Returns the socket error if the stream cannot be configured.
    pub fn new(stream: TcpStream, context: Arc<ServerContext>) -> io::Result<Self> {
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        let writer = BufWriter::new(stream.try_clone()?);
        let (priority_tx, priority_rx) = crossbeam_channel::unbounded();
        let (bulk_tx, bulk_rx) = crossbeam_channel::unbounded();
        let now = Instant::now();
        Ok(Self {
            stream,
            writer,
            peer,
            context,
            state: SessionState::Connecting,
            inbound: Vec::with_capacity(READ_CHUNK),
            priority_tx,
            priority_rx,
            bulk_tx,
            bulk_rx,
            player: None,
            detector: SpeedhackDetector::new(Position::default()),
            visible: VisibleEntities::new(),
            holds_connection_slot: false,
            last_ping: now,
            last_visibility: now,
            last_activity: now,
        })
    }

    /// Runs a session for `stream` on its own thread.
    ///
    /// # Errors
    ///
    /// Returns the error if the socket cannot be configured or the thread
    /// cannot be started.
    pub fn spawn(stream: TcpStream, context: Arc<ServerContext>) -> io::Result<JoinHandle<LeaveReason>> {
        let session = Self::new(stream, context)?;
        thread::Builder::new().name(format!("session-{}", session.peer)).spawn(move || session.run())
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Drives the session to completion and returns why it ended.
    pub fn run(mut self) -> LeaveReason {
        let result = self.login().and_then(|()| self.run_ready());
        let reason = match result {
            Ok(()) => LeaveReason::ClientQuit,
            Err(err) => {
                let reason = err.leave_reason();
                match &err {
                    SessionError::Kicked { .. } => {}
                    SessionError::Protocol(_) if matches!(reason, LeaveReason::ClientQuit | LeaveReason::Timeout) => {
                        debug!(peer = %self.peer, error = %err, "connection closed");
                    }
                    _ => warn!(peer = %self.peer, error = %err, "session failed"),
                }
                reason
            }
        };
        self.teardown(reason);
        reason
    }

    // ------------------------------------------------------------------
    // Login
    // ------------------------------------------------------------------

    fn login(&mut self) -> SessionResult<()> {
        self.stream.set_read_timeout(Some(LOGIN_TIMEOUT))?;

        let mut opcode = [0u8; 1];
        self.stream.read_exact(&mut opcode)?;
        if opcode[0] == LEGACY_HANDSHAKE_OPCODE {
            let message = "This server only supports Classic clients";
            warn!(peer = %self.peer, "unsupported client");
            self.writer.write_all(&legacy_kick(message))?;
            self.writer.flush()?;
            return Err(SessionError::Kicked { reason: LeaveReason::UnsupportedClient, message: message.to_owned() });
        }
        if opcode[0] != OpCode::Handshake as u8 {
            return Err(self.kick_now(LeaveReason::ProtocolViolation, "Expected a handshake"));
        }

        self.state = SessionState::Authenticating;
        let mut buffer = vec![0u8; OpCode::Handshake.packet_len()];
        buffer[0] = opcode[0];
        self.stream.read_exact(&mut buffer[1..])?;
        let handshake = Packet::decode(&buffer).map_err(|err| self.malformed(err))?;
        let Packet::Handshake { protocol_version, name, key, .. } = handshake else {
            return Err(self.kick_now(LeaveReason::ProtocolViolation, "Expected a handshake"));
        };

        if protocol_version != PROTOCOL_VERSION {
            return Err(self.kick_now(
                LeaveReason::ProtocolViolation,
                format!("Wrong protocol version {protocol_version}, expected {PROTOCOL_VERSION}"),
            ));
        }
        if !is_valid_name(&name) {
            return Err(self.kick_now(LeaveReason::ProtocolViolation, "Invalid characters in player name"));
        }

        let address = self.peer.ip();
        let context = Arc::clone(&self.context);
        let settings = context.settings();
        let collaborators = context.collaborators();

        let previous = collaborators.directory.lookup(&name);
        let check = NameCheck {
            hash_matches: verify_name(context.salt(), &name, &key),
            address,
            returning_address: previous.as_ref().and_then(|r| r.last_address) == Some(address),
            allow_lan: settings.allow_lan_unverified,
        };
        match settings.verify_names.decide(&check) {
            NameDecision::Verified => {}
            NameDecision::AllowedUnverified => {
                warn!(player = %name, peer = %self.peer, "name not verified, allowed by policy");
            }
            NameDecision::Rejected => {
                return Err(self.kick_now(LeaveReason::UnverifiedName, LeaveReason::UnverifiedName.default_message()));
            }
        }

        if collaborators.access.is_name_banned(&name) {
            collaborators.access.record_ban_attempt(&name, address);
            return Err(self.kick_now(LeaveReason::Banned, LeaveReason::Banned.default_message()));
        }
        if collaborators.access.is_ip_banned(address) {
            collaborators.access.record_ban_attempt(&name, address);
            return Err(self.kick_now(LeaveReason::IpBanned, LeaveReason::IpBanned.default_message()));
        }

        if !context.open_connection(address) {
            return Err(self.kick_now(
                LeaveReason::TooManyConnections,
                LeaveReason::TooManyConnections.default_message(),
            ));
        }
        self.holds_connection_slot = true;

        if !collaborators.access.is_paid(&name) {
            return Err(self.kick_now(LeaveReason::Kicked, "A paid account is required"));
        }
        if !collaborators.access.allow_connect(&name, address) {
            return Err(self.kick_now(LeaveReason::Kicked, "Login denied"));
        }

        if let Some(existing) = context.find_player(&name) {
            info!(player = %name, "replacing existing session");
            existing.kick(LeaveReason::Kicked, "Connected from elsewhere!");
        }

        let record = collaborators.directory.record_login(&name, address);
        collaborators.access.note_login(&name, address);
        let info = PlayerInfo {
            key: context.next_key(),
            name: name.clone(),
            address,
            rank: record.rank.clone(),
            user_type: record.user_type,
            can_speedhack: record.can_speedhack,
            frozen: record.frozen,
            muted: record.muted,
        };
        let player = Arc::new(Player::new(info, self.priority_tx.clone(), self.bulk_tx.clone()));
        if !context.register_player(Arc::clone(&player)) {
            return Err(self.kick_now(LeaveReason::ServerFull, LeaveReason::ServerFull.default_message()));
        }
        self.player = Some(Arc::clone(&player));

        self.write_packet(&Packet::Handshake {
            protocol_version: PROTOCOL_VERSION,
            name: settings.name.clone(),
            key: settings.motd.clone(),
            user_type: record.user_type,
        })?;

        let world = context.main_world();
        self.join_world(&player, &world)?;
        info!(player = %name, peer = %self.peer, world = %world.name(), "player logged in");

        let greeting = Greeting {
            server_name: settings.name.clone(),
            rank: record.rank.clone(),
            player_name: name.clone(),
            time: utc_time_of_day(),
            world: world.name().to_owned(),
            players: context.player_count(),
            worlds: context.world_count(),
            max_players: settings.max_players,
        };
        player.message(&greeting.render(&settings.greeting));
        if player.is_muted() {
            player.message("&cYou are still muted.");
        }
        if player.is_frozen() {
            player.message("&cYou are still frozen.");
        }

        let alts = collaborators.access.banned_accounts_on_ip(address);
        if !alts.is_empty() {
            warn!(player = %name, peer = %self.peer, banned = ?alts, "banned accounts seen on this address");
            let notice = format!("&c{name} shares an address with banned players: {}", alts.join(", "));
            for op in context.players().iter().filter(|p| p.key() != player.key() && p.user_type() == crate::protocol::USER_TYPE_OP) {
                op.message(&notice);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // World join
    // ------------------------------------------------------------------

    /// Sends `world`'s level to the client and spawns the player in it.
    fn join_world(&mut self, player: &Arc<Player>, world: &Arc<World>) -> SessionResult<()> {
        self.state = SessionState::JoiningWorld;

        if let Some(previous) = player.world() {
            previous.remove_player(player.key());
        }
        for packet in self.visible.clear() {
            self.write_packet(&packet)?;
        }

        let shared = world.map();
        let (snapshot, dims, spawn) = {
            let map = shared.read();
            (map.compressed_snapshot()?, map.dimensions(), map.spawn())
        };
        let Some(level_end) = Packet::level_end(dims) else {
            error!(
                world = %world.name(),
                width = dims.width,
                length = dims.length,
                height = dims.height,
                "map is too large for the protocol"
            );
            return Err(self.kick_now(LeaveReason::Unknown, "This world is too large to join"));
        };

        self.stream.set_nodelay(false)?;
        self.write_packet(&Packet::LevelBegin)?;
        for chunk in Packet::level_chunks(&snapshot) {
            self.write_packet(&chunk)?;
        }
        self.write_packet(&level_end)?;
        self.writer.flush()?;
        self.stream.set_nodelay(true)?;

        self.write_packet(&Packet::AddEntity { id: SELF_ID, name: player.name().to_owned(), position: spawn })?;
        self.write_packet(&Packet::Teleport { id: SELF_ID, position: spawn })?;

        player.set_position(spawn);
        player.set_world(Some(Arc::clone(world)));
        world.add_player(Arc::clone(player));
        self.detector.reset(spawn);

        let others = world.entity_views(player.key());
        for packet in self.visible.update(spawn, &others) {
            self.write_packet(&packet)?;
        }
        self.writer.flush()?;
        self.last_visibility = Instant::now();

        debug!(player = %player.name(), world = %world.name(), bytes = snapshot.len(), "level sent");
        self.state = SessionState::Ready;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Ready loop
    // ------------------------------------------------------------------

    fn run_ready(&mut self) -> SessionResult<()> {
        let Some(player) = self.player.clone() else {
            return Ok(());
        };
        self.stream.set_read_timeout(Some(POLL_INTERVAL))?;
        self.last_activity = Instant::now();

        loop {
            if let Some((reason, message)) = player.take_kick() {
                return Err(self.kick_now(reason, message));
            }
            if self.context.is_shutting_down() {
                return Err(self.kick_now(LeaveReason::ServerShutdown, LeaveReason::ServerShutdown.default_message()));
            }

            let now = Instant::now();
            if now.duration_since(self.last_ping) >= PING_INTERVAL {
                player.send(Packet::Ping);
                self.last_ping = now;
            }

            self.flush_outbound()?;
            self.read_available()?;
            self.drain_inbound(&player)?;

            if now.duration_since(self.last_visibility) >= ENTITY_UPDATE_INTERVAL {
                self.update_visibility(&player);
                self.last_visibility = now;
            }
            if now.duration_since(self.last_activity) >= IDLE_TIMEOUT {
                return Err(self.kick_now(LeaveReason::Timeout, LeaveReason::Timeout.default_message()));
            }
        }
    }

    /// Writes up to [`MAX_SESSION_PACKETS_PER_TICK`] queued packets,
    /// priority queue first.
    fn flush_outbound(&mut self) -> SessionResult<()> {
        let mut written = 0;
        while written < MAX_SESSION_PACKETS_PER_TICK {
            let Ok(packet) = self.priority_rx.try_recv() else { break };
            self.write_packet(&packet)?;
            written += 1;
        }
        while written < MAX_SESSION_PACKETS_PER_TICK {
            let Ok(packet) = self.bulk_rx.try_recv() else { break };
            self.write_packet(&packet)?;
            written += 1;
        }
        if written > 0 {
            self.writer.flush()?;
        }
        Ok(())
    }

    fn read_available(&mut self) -> SessionResult<()> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
                Ok(n) => {
                    self.inbound.extend_from_slice(&chunk[..n]);
                    self.last_activity = Instant::now();
                    if n < chunk.len() {
                        return Ok(());
                    }
                }
                Err(err) if is_timeout(&err) => return Ok(()),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Handles every complete packet in the inbound buffer.
    fn drain_inbound(&mut self, player: &Arc<Player>) -> SessionResult<()> {
        let mut offset = 0;
        while offset < self.inbound.len() {
            let opcode = self.inbound[offset];
            let Some(op) = OpCode::from_u8(opcode) else {
                return Err(self.kick_now(LeaveReason::InvalidOpcode, format!("Unknown packet opcode {opcode}")));
            };
            let len = op.packet_len();
            if self.inbound.len() - offset < len {
                break;
            }
            let packet = match Packet::decode(&self.inbound[offset..offset + len]) {
                Ok(packet) => packet,
                Err(err) => return Err(self.malformed(err)),
            };
            offset += len;
            self.handle_packet(player, packet)?;
        }
        self.inbound.drain(..offset);
        Ok(())
    }

    fn handle_packet(&mut self, player: &Arc<Player>, packet: Packet) -> SessionResult<()> {
        match packet {
            Packet::Ping => Ok(()),
            Packet::Message { text, .. } => self.handle_chat(player, &text),
            Packet::Teleport { position, .. } => {
                self.handle_movement(player, position);
                Ok(())
            }
            Packet::SetBlockClient { x, y, z, placing, block } => {
                self.handle_set_block(player, (i32::from(x), i32::from(y), i32::from(z)), placing, block)
            }
            other => Err(self.kick_now(LeaveReason::InvalidOpcode, format!("Unexpected packet {:?}", other.opcode()))),
        }
    }

    // ------------------------------------------------------------------
    // Inbound handlers
    // ------------------------------------------------------------------

    fn handle_chat(&mut self, player: &Arc<Player>, text: &str) -> SessionResult<()> {
        if !is_valid_chat(text) {
            return Err(self.kick_now(LeaveReason::InvalidMessage, LeaveReason::InvalidMessage.default_message()));
        }
        if player.is_muted() {
            player.message("&cYou are muted.");
            return Ok(());
        }

        let context = Arc::clone(&self.context);
        let chat = Arc::clone(&context.collaborators().chat);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| chat.handle(&context, player, text)));
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err.to_string()),
            Err(_) => Some("handler panicked".to_owned()),
        };
        if let Some(failure) = failure {
            error!(player = %player.name(), message = %text, error = %failure, "chat message failed");
            player.message("&cAn error occurred while processing your message.");
        }
        Ok(())
    }

    fn handle_movement(&mut self, player: &Arc<Player>, next: Position) {
        let current = player.position();
        if next == current {
            return;
        }

        let accepted = if player.is_frozen() {
            let pinned = frozen_move(current, next);
            if pinned.teleport {
                player.send(Packet::Teleport { id: SELF_ID, position: pinned.position });
            }
            pinned.position
        } else if player.can_speedhack() {
            next
        } else {
            match self.detector.check(Instant::now(), current, next) {
                MovementVerdict::Accept => next,
                MovementVerdict::Deny { revert_to, reason } => {
                    debug!(player = %player.name(), ?reason, "movement denied");
                    player.set_position(revert_to);
                    player.send(Packet::Teleport { id: SELF_ID, position: revert_to });
                    return;
                }
            }
        };

        if !self.context.collaborators().movement.allow(player, current, accepted) {
            player.send(Packet::Teleport { id: SELF_ID, position: current });
            return;
        }
        player.set_position(accepted);
    }

    fn handle_set_block(
        &mut self,
        player: &Arc<Player>,
        (x, y, z): (i32, i32, i32),
        placing: bool,
        block: Block,
    ) -> SessionResult<()> {
        if !block.is_valid() {
            return Err(self.kick_now(LeaveReason::InvalidSetTile, LeaveReason::InvalidSetTile.default_message()));
        }
        let Some(world) = player.world() else {
            return Ok(());
        };
        let Some(old) = world.get_block(x, y, z) else {
            debug!(player = %player.name(), x, y, z, "block edit outside the map ignored");
            return Ok(());
        };

        let new = if placing { block } else { Block::AIR };
        let hooks = Arc::clone(&self.context.collaborators().blocks);
        if !hooks.placing(player, &BlockChange { x, y, z, old, new }) {
            player.send(Packet::set_block(x, y, z, old));
            return Ok(());
        }

        let Ok(old) = world.set_block(x, y, z, new) else {
            return Ok(());
        };
        if old != new {
            world.broadcast(&Packet::set_block(x, y, z, new), Some(player.key()));
        }
        hooks.placed(player, &BlockChange { x, y, z, old, new });
        Ok(())
    }

    fn update_visibility(&mut self, player: &Arc<Player>) {
        let Some(world) = player.world() else { return };
        let others = world.entity_views(player.key());
        for packet in self.visible.update(player.position(), &others) {
            player.send(packet);
        }
    }

    // ------------------------------------------------------------------
    // Output and teardown
    // ------------------------------------------------------------------

    fn write_packet(&mut self, packet: &Packet) -> SessionResult<()> {
        packet.write_to(&mut self.writer)?;
        Ok(())
    }

    /// Writes a disconnect packet straight to the socket and returns the
    /// error that ends the session.
    fn kick_now(&mut self, reason: LeaveReason, message: impl Into<String>) -> SessionError {
        let message = message.into();
        let name = self.player.as_ref().map_or_else(String::new, |p| p.name().to_owned());
        match reason {
            LeaveReason::Kicked | LeaveReason::ServerShutdown | LeaveReason::Timeout => {
                info!(peer = %self.peer, player = %name, %reason, %message, "kicked");
            }
            _ => warn!(peer = %self.peer, player = %name, %reason, %message, "kicked"),
        }
        let packet = Packet::Disconnect { reason: message.clone() };
        // The connection is closing either way
        if packet.write_to(&mut self.writer).is_ok() {
            let _ = self.writer.flush();
        }
        SessionError::Kicked { reason, message }
    }

    /// Kicks a client whose packet failed to decode.
    fn malformed(&mut self, err: ProtocolError) -> SessionError {
        debug!(peer = %self.peer, error = %err, "undecodable packet");
        let reason = SessionError::from(err).leave_reason();
        self.kick_now(reason, "Malformed packet")
    }

    fn teardown(&mut self, reason: LeaveReason) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Disconnecting;
        if let Some(player) = self.player.take() {
            if let Some(world) = player.world() {
                world.remove_player(player.key());
            }
            player.set_world(None);
            self.context.unregister_player(player.key());
            info!(player = %player.name(), %reason, "player left");
        }
        if self.holds_connection_slot {
            self.context.release_connection(self.peer.ip());
            self.holds_connection_slot = false;
        }
        let _ = self.writer.flush();
        let _ = self.stream.shutdown(Shutdown::Both);
        self.state = SessionState::Closed;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown(LeaveReason::Unknown);
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use tundra_core::Map;

    use super::*;
    use crate::server::ServerSettings;

    fn loopback_session() -> (Session, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let (accepted, _) = listener.accept().unwrap();
        let world = World::new("main", Map::new(8, 8, 8).unwrap());
        let context = Arc::new(ServerContext::new(ServerSettings::default(), Collaborators::default(), world));
        (Session::new(accepted, context).unwrap(), client)
    }

    #[test]
    fn test_priority_packets_flush_before_bulk() {
        let (mut session, mut client) = loopback_session();
        session.bulk_tx.send(Packet::set_block(1, 2, 3, Block::STONE)).unwrap();
        session.bulk_tx.send(Packet::set_block(4, 5, 6, Block::DIRT)).unwrap();
        session.priority_tx.send(Packet::Ping).unwrap();
        session.priority_tx.send(Packet::Message { id: 0, text: "urgent".into() }).unwrap();

        session.flush_outbound().unwrap();

        let received: Vec<Packet> = (0..4).map(|_| Packet::read_from(&mut client).unwrap()).collect();
        assert_eq!(
            received,
            vec![
                Packet::Ping,
                Packet::Message { id: 0, text: "urgent".into() },
                Packet::set_block(1, 2, 3, Block::STONE),
                Packet::set_block(4, 5, 6, Block::DIRT),
            ]
        );
    }

    #[test]
    fn test_flush_is_capped_per_tick() {
        let (mut session, _client) = loopback_session();
        for i in 0..MAX_SESSION_PACKETS_PER_TICK + 5 {
            session.bulk_tx.send(Packet::set_block((i % 8) as i32, 0, 0, Block::STONE)).unwrap();
        }
        session.priority_tx.send(Packet::Ping).unwrap();

        session.flush_outbound().unwrap();
        assert!(session.priority_rx.is_empty());
        assert_eq!(session.bulk_rx.len(), 6);

        session.flush_outbound().unwrap();
        assert!(session.bulk_rx.is_empty());
    }
}
