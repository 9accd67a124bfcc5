//! End-to-end session tests over real loopback sockets.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flate2::read::GzDecoder;
use tundra_core::{Block, Map, Position};
use tundra_networking::protocol::{encode_string, Packet, PROTOCOL_VERSION, SELF_ID};
use tundra_networking::session::{
    BlockChange, BlockHooks, BroadcastChat, ChatError, ChatHandler, InMemoryAccess, InMemoryDirectory, MovementHook,
    PlayerRecord,
};
use tundra_networking::{Collaborators, LeaveReason, Player, Server, ServerContext, ServerSettings, World};

const SIZE: usize = 16;

struct TestServer {
    addr: SocketAddr,
    context: Arc<ServerContext>,
    thread: Option<JoinHandle<()>>,
}

impl TestServer {
    fn start(collaborators: Collaborators) -> Self {
        let mut map = Map::new(SIZE, SIZE, SIZE).unwrap();
        map.fill_layers(0, SIZE / 2, Block::DIRT);
        map.set_spawn(Position::from_block(8, 8, SIZE as i32 / 2));
        let settings = ServerSettings {
            name: "Test Server".into(),
            motd: "hello".into(),
            greeting: "Welcome {PLAYER_NAME}".into(),
            ..ServerSettings::default()
        };
        let context = Arc::new(ServerContext::new(settings, collaborators, World::new("main", map)));
        let server = Server::bind("127.0.0.1:0", Arc::clone(&context)).unwrap();
        let addr = server.local_addr().unwrap();
        let thread = thread::spawn(move || server.run().unwrap());
        Self { addr, context, thread: Some(thread) }
    }

    fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        stream
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.context.shutdown();
        if let Some(thread) = self.thread.take() {
            thread.join().unwrap();
        }
    }
}

fn handshake(name: &str, version: u8) -> Packet {
    Packet::Handshake { protocol_version: version, name: name.into(), key: String::new(), user_type: 0 }
}

fn send(stream: &mut TcpStream, packet: &Packet) {
    packet.write_to(stream).unwrap();
}

fn read(stream: &mut TcpStream) -> Packet {
    Packet::read_from(stream).unwrap()
}

/// Reads packets until one matches, failing after a generous limit.
fn read_until(stream: &mut TcpStream, mut matches: impl FnMut(&Packet) -> bool) -> Packet {
    for _ in 0..500 {
        let packet = read(stream);
        if matches(&packet) {
            return packet;
        }
    }
    panic!("expected packet never arrived");
}

/// Logs in and consumes everything up to the self spawn.
fn login(server: &TestServer, name: &str) -> TcpStream {
    let mut stream = server.connect();
    send(&mut stream, &handshake(name, PROTOCOL_VERSION));
    read_until(&mut stream, |p| matches!(p, Packet::Teleport { id: SELF_ID, .. }));
    stream
}

/// Sends a chat line and waits for its echo, so every packet sent before
/// it has been handled.
fn sync(stream: &mut TcpStream, marker: &str) {
    send(stream, &Packet::Message { id: SELF_ID, text: marker.into() });
    read_until(stream, |p| matches!(p, Packet::Message { text, .. } if text.contains(marker)));
}

fn spawn() -> Position {
    Position::from_block(8, 8, SIZE as i32 / 2)
}

fn moved(from: Position, dx: i16, r: u8) -> Position {
    Position::new(from.x + dx, from.y, from.z, r, from.l)
}

struct Fence;

impl MovementHook for Fence {
    fn allow(&self, _player: &Player, _from: Position, _to: Position) -> bool {
        false
    }
}

struct ReadOnly;

impl BlockHooks for ReadOnly {
    fn placing(&self, _player: &Player, _change: &BlockChange) -> bool {
        false
    }
}

/// Panics on "boom", fails on "fail", broadcasts anything else.
struct Faulty;

impl ChatHandler for Faulty {
    fn handle(&self, server: &ServerContext, player: &Arc<Player>, text: &str) -> Result<(), ChatError> {
        match text {
            "boom" => panic!("chat handler exploded"),
            "fail" => Err(ChatError("storage offline".into())),
            _ => BroadcastChat.handle(server, player, text),
        }
    }
}

#[test]
fn test_login_and_level_transfer() {
    let server = TestServer::start(Collaborators::default());
    let mut stream = server.connect();
    send(&mut stream, &handshake("alice", PROTOCOL_VERSION));

    assert_eq!(
        read(&mut stream),
        Packet::Handshake { protocol_version: PROTOCOL_VERSION, name: "Test Server".into(), key: "hello".into(), user_type: 0 }
    );
    assert_eq!(read(&mut stream), Packet::LevelBegin);

    let mut compressed = Vec::new();
    let dims = loop {
        match read(&mut stream) {
            Packet::LevelChunk { data, .. } => compressed.extend(data),
            Packet::LevelEnd { width, height, length } => break (width, height, length),
            other => panic!("unexpected {other:?}"),
        }
    };
    assert_eq!(dims, (SIZE as i16, SIZE as i16, SIZE as i16));

    let mut level = Vec::new();
    GzDecoder::new(compressed.as_slice()).read_to_end(&mut level).unwrap();
    assert_eq!(&level[..4], &((SIZE * SIZE * SIZE) as u32).to_be_bytes());
    assert_eq!(level.len(), 4 + SIZE * SIZE * SIZE);
    assert_eq!(level[4], Block::DIRT.id());

    let spawn = Position::from_block(8, 8, SIZE as i32 / 2);
    assert_eq!(read(&mut stream), Packet::AddEntity { id: SELF_ID, name: "alice".into(), position: spawn });
    assert_eq!(read(&mut stream), Packet::Teleport { id: SELF_ID, position: spawn });

    let greeting = read_until(&mut stream, |p| matches!(p, Packet::Message { .. }));
    assert_eq!(greeting, Packet::Message { id: 0, text: "Welcome alice".into() });
    assert_eq!(server.context.player_count(), 1);
}

#[test]
fn test_chat_is_broadcast() {
    let server = TestServer::start(Collaborators::default());
    let mut stream = login(&server, "alice");
    send(&mut stream, &Packet::Message { id: SELF_ID, text: "hi all".into() });
    let echo = read_until(&mut stream, |p| matches!(p, Packet::Message { text, .. } if text.contains("hi all")));
    assert_eq!(echo, Packet::Message { id: 0, text: "alice: &fhi all".into() });
}

#[test]
fn test_illegal_chat_kicks() {
    let server = TestServer::start(Collaborators::default());
    let mut stream = login(&server, "alice");

    let mut raw = vec![13u8, 0xff];
    let mut text = encode_string("bell");
    text[4] = 0x07;
    raw.extend_from_slice(&text);
    stream.write_all(&raw).unwrap();

    let kick = read_until(&mut stream, |p| matches!(p, Packet::Disconnect { .. }));
    assert_eq!(kick, Packet::Disconnect { reason: LeaveReason::InvalidMessage.default_message().into() });
    let mut rest = Vec::new();
    let _ = stream.read_to_end(&mut rest);
}

#[test]
fn test_wrong_protocol_version_rejected() {
    let server = TestServer::start(Collaborators::default());
    let mut stream = server.connect();
    send(&mut stream, &handshake("alice", 6));
    assert_eq!(read(&mut stream), Packet::Disconnect { reason: "Wrong protocol version 6, expected 7".into() });
    assert_eq!(server.context.player_count(), 0);
}

#[test]
fn test_legacy_client_gets_legacy_kick() {
    let server = TestServer::start(Collaborators::default());
    let mut stream = server.connect();
    stream.write_all(&[0x02, 0x00, 0x05]).unwrap();
    let mut first = [0u8; 1];
    stream.read_exact(&mut first).unwrap();
    assert_eq!(first[0], 0xff);
}

#[test]
fn test_banned_name_rejected_and_recorded() {
    let access = Arc::new(InMemoryAccess::new());
    access.ban_name("griefer");
    let collaborators = Collaborators { access: access.clone(), ..Collaborators::default() };
    let server = TestServer::start(collaborators);

    let mut stream = server.connect();
    send(&mut stream, &handshake("Griefer", PROTOCOL_VERSION));
    assert_eq!(read(&mut stream), Packet::Disconnect { reason: LeaveReason::Banned.default_message().into() });
    assert_eq!(access.attempts().len(), 1);
    assert_eq!(access.attempts()[0].name, "Griefer");
}

#[test]
fn test_block_edits_reach_other_players() {
    let server = TestServer::start(Collaborators::default());
    let mut alice = login(&server, "alice");
    let mut bob = login(&server, "bob");

    // Bob sees Alice spawn next to him
    let added = read_until(&mut bob, |p| matches!(p, Packet::AddEntity { id, .. } if *id != SELF_ID));
    assert!(matches!(added, Packet::AddEntity { name, .. } if name == "alice"));

    send(&mut alice, &Packet::SetBlockClient { x: 2, y: 3, z: 12, placing: true, block: Block::STONE });
    let update = read_until(&mut bob, |p| matches!(p, Packet::SetBlock { .. }));
    assert_eq!(update, Packet::SetBlock { x: 2, y: 3, z: 12, block: Block::STONE });
    assert_eq!(server.context.main_world().get_block(2, 3, 12), Some(Block::STONE));

    // Out-of-bounds edits are ignored rather than kicked
    send(&mut alice, &Packet::SetBlockClient { x: 500, y: 3, z: 12, placing: true, block: Block::STONE });
    send(&mut alice, &Packet::Message { id: SELF_ID, text: "still here".into() });
    read_until(&mut alice, |p| matches!(p, Packet::Message { text, .. } if text.contains("still here")));
}

#[test]
fn test_unknown_opcode_kicks() {
    let server = TestServer::start(Collaborators::default());
    let mut stream = login(&server, "alice");
    stream.write_all(&[0x42]).unwrap();
    let kick = read_until(&mut stream, |p| matches!(p, Packet::Disconnect { .. }));
    assert_eq!(kick, Packet::Disconnect { reason: "Unknown packet opcode 66".into() });
}

#[test]
fn test_malformed_packet_kicks() {
    let server = TestServer::start(Collaborators::default());
    let mut stream = login(&server, "alice");

    // Level chunk claiming 2000 data bytes
    let mut raw = vec![0x03, 0x07, 0xD0];
    raw.extend_from_slice(&[0u8; 1024]);
    raw.push(0);
    stream.write_all(&raw).unwrap();

    let kick = read_until(&mut stream, |p| matches!(p, Packet::Disconnect { .. }));
    assert_eq!(kick, Packet::Disconnect { reason: "Malformed packet".into() });
}

#[test]
fn test_frozen_player_is_pulled_back() {
    let directory = Arc::new(InMemoryDirectory::new());
    directory.insert(PlayerRecord { frozen: true, ..PlayerRecord::new("alice") });
    let server = TestServer::start(Collaborators { directory, ..Collaborators::default() });
    let mut stream = login(&server, "alice");

    let far = moved(spawn(), 200, 64);
    send(&mut stream, &Packet::Teleport { id: SELF_ID, position: far });
    let pulled = read_until(&mut stream, |p| matches!(p, Packet::Teleport { id: SELF_ID, .. }));
    assert_eq!(pulled, Packet::Teleport { id: SELF_ID, position: spawn().with_heading_of(far) });

    // Small steps keep the anchor but take the new heading
    send(&mut stream, &Packet::Teleport { id: SELF_ID, position: moved(spawn(), 10, 128) });
    sync(&mut stream, "frozen sync");
    let player = server.context.find_player("alice").unwrap();
    assert!(player.position().same_location(spawn()));
    assert_eq!(player.position().r, 128);
}

#[test]
fn test_repeated_jump_is_reverted() {
    let server = TestServer::start(Collaborators::default());
    let mut stream = login(&server, "alice");

    send(&mut stream, &Packet::Teleport { id: SELF_ID, position: moved(spawn(), 200, 0) });
    send(&mut stream, &Packet::Teleport { id: SELF_ID, position: moved(spawn(), 400, 0) });
    let reverted = read_until(&mut stream, |p| matches!(p, Packet::Teleport { id: SELF_ID, .. }));
    assert_eq!(reverted, Packet::Teleport { id: SELF_ID, position: spawn() });

    sync(&mut stream, "jump sync");
    assert_eq!(server.context.find_player("alice").unwrap().position(), spawn());
}

#[test]
fn test_movement_veto_sends_player_back() {
    let server = TestServer::start(Collaborators { movement: Arc::new(Fence), ..Collaborators::default() });
    let mut stream = login(&server, "alice");

    send(&mut stream, &Packet::Teleport { id: SELF_ID, position: moved(spawn(), 10, 0) });
    let back = read_until(&mut stream, |p| matches!(p, Packet::Teleport { id: SELF_ID, .. }));
    assert_eq!(back, Packet::Teleport { id: SELF_ID, position: spawn() });

    sync(&mut stream, "veto sync");
    assert_eq!(server.context.find_player("alice").unwrap().position(), spawn());
}

#[test]
fn test_cancelled_block_edit_restores_client_block() {
    let server = TestServer::start(Collaborators { blocks: Arc::new(ReadOnly), ..Collaborators::default() });
    let mut stream = login(&server, "alice");

    send(&mut stream, &Packet::SetBlockClient { x: 2, y: 3, z: 4, placing: false, block: Block::DIRT });
    let restored = read_until(&mut stream, |p| matches!(p, Packet::SetBlock { .. }));
    assert_eq!(restored, Packet::SetBlock { x: 2, y: 3, z: 4, block: Block::DIRT });
    assert_eq!(server.context.main_world().get_block(2, 3, 4), Some(Block::DIRT));
}

#[test]
fn test_chat_handler_failures_keep_session() {
    let server = TestServer::start(Collaborators { chat: Arc::new(Faulty), ..Collaborators::default() });
    let mut stream = login(&server, "alice");

    for text in ["fail", "boom"] {
        send(&mut stream, &Packet::Message { id: SELF_ID, text: text.into() });
        let notice = read_until(&mut stream, |p| matches!(p, Packet::Message { text, .. } if text.contains("error")));
        assert_eq!(notice, Packet::Message { id: 0, text: "&cAn error occurred while processing your message.".into() });
    }

    sync(&mut stream, "still chatting");
    assert_eq!(server.context.player_count(), 1);
}

#[test]
fn test_oversized_world_refuses_join() {
    let map = Map::new(32768, 1, 1).unwrap();
    let context = Arc::new(ServerContext::new(ServerSettings::default(), Collaborators::default(), World::new("wide", map)));
    let server = Server::bind("127.0.0.1:0", Arc::clone(&context)).unwrap();
    let addr = server.local_addr().unwrap();
    let runner = thread::spawn(move || server.run().unwrap());

    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    send(&mut stream, &handshake("alice", PROTOCOL_VERSION));
    assert!(matches!(read(&mut stream), Packet::Handshake { .. }));
    assert_eq!(read(&mut stream), Packet::Disconnect { reason: "This world is too large to join".into() });

    context.shutdown();
    runner.join().unwrap();
}
