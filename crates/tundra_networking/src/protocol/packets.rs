//! # Packet Definitions
//!
//! The sixteen Classic protocol messages.
//!
//! Every packet is an opcode byte followed by a fixed-size body, so the
//! opcode alone tells a reader how many bytes to wait for. Coordinates go
//! on the wire as `x, height, y`; [`Position`] keeps height in `z`.

use std::io::{Read, Write};

use tundra_core::{Block, Dimensions, Position};

use super::serialization::{PacketReader, PacketWriter};
use crate::error::{ProtocolError, ProtocolResult};

/// Protocol version spoken by Classic 0.30 clients.
pub const PROTOCOL_VERSION: u8 = 7;

/// Payload bytes in one level chunk.
pub const LEVEL_CHUNK_SIZE: usize = 1024;

/// User type byte for regular players.
pub const USER_TYPE_NORMAL: u8 = 0x00;

/// User type byte that lets the client place bedrock and water.
pub const USER_TYPE_OP: u8 = 0x64;

/// Entity ID a client uses for itself.
pub const SELF_ID: i8 = -1;

/// Classic message opcodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Both: login request and server identification.
    Handshake = 0,
    /// S→C: keepalive.
    Ping = 1,
    /// S→C: level transfer starts.
    LevelBegin = 2,
    /// S→C: piece of the compressed level.
    LevelChunk = 3,
    /// S→C: level transfer done, with dimensions.
    LevelEnd = 4,
    /// C→S: the player placed or destroyed a block.
    SetBlockClient = 5,
    /// S→C: a block changed.
    SetBlock = 6,
    /// S→C: spawn an entity.
    AddEntity = 7,
    /// Both: absolute position.
    Teleport = 8,
    /// S→C: relative move plus heading.
    MoveRotate = 9,
    /// S→C: relative move.
    Move = 10,
    /// S→C: heading only.
    Rotate = 11,
    /// S→C: despawn an entity.
    RemoveEntity = 12,
    /// Both: chat.
    Message = 13,
    /// S→C: kick with a reason.
    Disconnect = 14,
    /// S→C: user type change.
    SetPermission = 15,
}

impl OpCode {
    /// Parses an opcode byte.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Handshake,
            1 => Self::Ping,
            2 => Self::LevelBegin,
            3 => Self::LevelChunk,
            4 => Self::LevelEnd,
            5 => Self::SetBlockClient,
            6 => Self::SetBlock,
            7 => Self::AddEntity,
            8 => Self::Teleport,
            9 => Self::MoveRotate,
            10 => Self::Move,
            11 => Self::Rotate,
            12 => Self::RemoveEntity,
            13 => Self::Message,
            14 => Self::Disconnect,
            15 => Self::SetPermission,
            _ => return None,
        })
    }

    /// Full packet length in bytes, opcode included.
    #[must_use]
    pub const fn packet_len(self) -> usize {
        match self {
            Self::Handshake => 131,
            Self::Ping | Self::LevelBegin => 1,
            Self::LevelChunk => 1028,
            Self::LevelEnd | Self::MoveRotate => 7,
            Self::SetBlockClient => 9,
            Self::SetBlock => 8,
            Self::AddEntity => 74,
            Self::Teleport => 10,
            Self::Move => 5,
            Self::Rotate => 4,
            Self::RemoveEntity | Self::SetPermission => 2,
            Self::Message => 66,
            Self::Disconnect => 65,
        }
    }
}

/// A decoded Classic packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Packet {
    /// Login request (C→S, `key` is the verification hash) or server
    /// identification (S→C, `key` is the MOTD).
    Handshake {
        /// Protocol version, 7 for current clients.
        protocol_version: u8,
        /// Player name or server name.
        name: String,
        /// Verification key or MOTD.
        key: String,
        /// User type (S→C) or unused (C→S).
        user_type: u8,
    },
    /// Keepalive.
    Ping,
    /// Level transfer starts.
    LevelBegin,
    /// One piece of the gzipped level.
    LevelChunk {
        /// At most [`LEVEL_CHUNK_SIZE`] bytes.
        data: Vec<u8>,
        /// Transfer progress, 0-100.
        percent: u8,
    },
    /// Level transfer finished.
    LevelEnd {
        /// Size along X.
        width: i16,
        /// Size along Z.
        height: i16,
        /// Size along Y.
        length: i16,
    },
    /// Client block edit.
    SetBlockClient {
        /// X.
        x: i16,
        /// Y.
        y: i16,
        /// Height.
        z: i16,
        /// True when placing, false when destroying.
        placing: bool,
        /// Block held by the client.
        block: Block,
    },
    /// Server block update.
    SetBlock {
        /// X.
        x: i16,
        /// Y.
        y: i16,
        /// Height.
        z: i16,
        /// New block.
        block: Block,
    },
    /// Spawn an entity.
    AddEntity {
        /// Entity ID, [`SELF_ID`] for the receiving player.
        id: i8,
        /// Name shown above the entity.
        name: String,
        /// Where it appears.
        position: Position,
    },
    /// Absolute position.
    Teleport {
        /// Entity ID.
        id: i8,
        /// New position.
        position: Position,
    },
    /// Relative move plus heading.
    MoveRotate {
        /// Entity ID.
        id: i8,
        /// X delta.
        dx: i8,
        /// Y delta.
        dy: i8,
        /// Height delta.
        dz: i8,
        /// New yaw.
        r: u8,
        /// New pitch.
        l: u8,
    },
    /// Relative move.
    Move {
        /// Entity ID.
        id: i8,
        /// X delta.
        dx: i8,
        /// Y delta.
        dy: i8,
        /// Height delta.
        dz: i8,
    },
    /// Heading only.
    Rotate {
        /// Entity ID.
        id: i8,
        /// New yaw.
        r: u8,
        /// New pitch.
        l: u8,
    },
    /// Despawn an entity.
    RemoveEntity {
        /// Entity ID.
        id: i8,
    },
    /// Chat line.
    Message {
        /// Sender entity ID; unused by most clients.
        id: i8,
        /// At most 64 characters.
        text: String,
    },
    /// Kick.
    Disconnect {
        /// Shown to the player.
        reason: String,
    },
    /// User type change.
    SetPermission {
        /// New user type.
        user_type: u8,
    },
}

impl Packet {
    /// Opcode of this packet.
    #[must_use]
    pub const fn opcode(&self) -> OpCode {
        match self {
            Self::Handshake { .. } => OpCode::Handshake,
            Self::Ping => OpCode::Ping,
            Self::LevelBegin => OpCode::LevelBegin,
            Self::LevelChunk { .. } => OpCode::LevelChunk,
            Self::LevelEnd { .. } => OpCode::LevelEnd,
            Self::SetBlockClient { .. } => OpCode::SetBlockClient,
            Self::SetBlock { .. } => OpCode::SetBlock,
            Self::AddEntity { .. } => OpCode::AddEntity,
            Self::Teleport { .. } => OpCode::Teleport,
            Self::MoveRotate { .. } => OpCode::MoveRotate,
            Self::Move { .. } => OpCode::Move,
            Self::Rotate { .. } => OpCode::Rotate,
            Self::RemoveEntity { .. } => OpCode::RemoveEntity,
            Self::Message { .. } => OpCode::Message,
            Self::Disconnect { .. } => OpCode::Disconnect,
            Self::SetPermission { .. } => OpCode::SetPermission,
        }
    }

    /// Server-side block update for a map coordinate.
    #[must_use]
    pub const fn set_block(x: i32, y: i32, z: i32, block: Block) -> Self {
        Self::SetBlock { x: x as i16, y: y as i16, z: z as i16, block }
    }

    /// Encodes the packet into its exact wire form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let opcode = self.opcode();
        let mut w = PacketWriter::new(opcode as u8, opcode.packet_len());
        match self {
            Self::Handshake { protocol_version, name, key, user_type } => {
                w.write_u8(*protocol_version).write_string(name).write_string(key).write_u8(*user_type);
            }
            Self::Ping | Self::LevelBegin => {}
            Self::LevelChunk { data, percent } => {
                let len = data.len().min(LEVEL_CHUNK_SIZE);
                w.write_i16(len as i16).write_padded(data, LEVEL_CHUNK_SIZE).write_u8(*percent);
            }
            Self::LevelEnd { width, height, length } => {
                w.write_i16(*width).write_i16(*height).write_i16(*length);
            }
            Self::SetBlockClient { x, y, z, placing, block } => {
                w.write_i16(*x).write_i16(*z).write_i16(*y).write_u8(u8::from(*placing)).write_u8(block.0);
            }
            Self::SetBlock { x, y, z, block } => {
                w.write_i16(*x).write_i16(*z).write_i16(*y).write_u8(block.0);
            }
            Self::AddEntity { id, name, position } => {
                w.write_i8(*id).write_string(name);
                write_position(&mut w, *position);
            }
            Self::Teleport { id, position } => {
                w.write_i8(*id);
                write_position(&mut w, *position);
            }
            Self::MoveRotate { id, dx, dy, dz, r, l } => {
                w.write_i8(*id).write_i8(*dx).write_i8(*dz).write_i8(*dy).write_u8(*r).write_u8(*l);
            }
            Self::Move { id, dx, dy, dz } => {
                w.write_i8(*id).write_i8(*dx).write_i8(*dz).write_i8(*dy);
            }
            Self::Rotate { id, r, l } => {
                w.write_i8(*id).write_u8(*r).write_u8(*l);
            }
            Self::RemoveEntity { id } => {
                w.write_i8(*id);
            }
            Self::Message { id, text } => {
                w.write_i8(*id).write_string(text);
            }
            Self::Disconnect { reason } => {
                w.write_string(reason);
            }
            Self::SetPermission { user_type } => {
                w.write_u8(*user_type);
            }
        }
        w.finish()
    }

    /// Decodes one packet from `bytes`, which must start with the opcode.
    ///
    /// Bytes past the packet's fixed length are ignored.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let first = *bytes.first().ok_or(ProtocolError::Truncated { opcode: 0, needed: 1, available: 0 })?;
        let opcode = OpCode::from_u8(first).ok_or(ProtocolError::UnknownOpcode(first))?;
        let needed = opcode.packet_len();
        if bytes.len() < needed {
            return Err(ProtocolError::Truncated { opcode: first, needed, available: bytes.len() });
        }

        let mut r = PacketReader::new(&bytes[..needed]);
        r.read_u8()?;
        let packet = match opcode {
            OpCode::Handshake => Self::Handshake {
                protocol_version: r.read_u8()?,
                name: r.read_string()?,
                key: r.read_string()?,
                user_type: r.read_u8()?,
            },
            OpCode::Ping => Self::Ping,
            OpCode::LevelBegin => Self::LevelBegin,
            OpCode::LevelChunk => {
                let len = r.read_i16()?;
                let len = usize::try_from(len).map_err(|_| ProtocolError::ChunkTooLarge(0))?;
                if len > LEVEL_CHUNK_SIZE {
                    return Err(ProtocolError::ChunkTooLarge(len));
                }
                let data = r.read_bytes(LEVEL_CHUNK_SIZE)?[..len].to_vec();
                Self::LevelChunk { data, percent: r.read_u8()? }
            }
            OpCode::LevelEnd => Self::LevelEnd { width: r.read_i16()?, height: r.read_i16()?, length: r.read_i16()? },
            OpCode::SetBlockClient => {
                let (x, z, y) = (r.read_i16()?, r.read_i16()?, r.read_i16()?);
                Self::SetBlockClient { x, y, z, placing: r.read_u8()? != 0, block: Block(r.read_u8()?) }
            }
            OpCode::SetBlock => {
                let (x, z, y) = (r.read_i16()?, r.read_i16()?, r.read_i16()?);
                Self::SetBlock { x, y, z, block: Block(r.read_u8()?) }
            }
            OpCode::AddEntity => Self::AddEntity {
                id: r.read_i8()?,
                name: r.read_string()?,
                position: read_position(&mut r)?,
            },
            OpCode::Teleport => Self::Teleport { id: r.read_i8()?, position: read_position(&mut r)? },
            OpCode::MoveRotate => {
                let id = r.read_i8()?;
                let (dx, dz, dy) = (r.read_i8()?, r.read_i8()?, r.read_i8()?);
                Self::MoveRotate { id, dx, dy, dz, r: r.read_u8()?, l: r.read_u8()? }
            }
            OpCode::Move => {
                let id = r.read_i8()?;
                let (dx, dz, dy) = (r.read_i8()?, r.read_i8()?, r.read_i8()?);
                Self::Move { id, dx, dy, dz }
            }
            OpCode::Rotate => Self::Rotate { id: r.read_i8()?, r: r.read_u8()?, l: r.read_u8()? },
            OpCode::RemoveEntity => Self::RemoveEntity { id: r.read_i8()? },
            OpCode::Message => Self::Message { id: r.read_i8()?, text: r.read_string()? },
            OpCode::Disconnect => Self::Disconnect { reason: r.read_string()? },
            OpCode::SetPermission => Self::SetPermission { user_type: r.read_u8()? },
        };
        Ok(packet)
    }

    /// Reads exactly one packet from a blocking stream.
    pub fn read_from<R: Read>(reader: &mut R) -> ProtocolResult<Self> {
        let mut opcode = [0u8; 1];
        reader.read_exact(&mut opcode)?;
        let op = OpCode::from_u8(opcode[0]).ok_or(ProtocolError::UnknownOpcode(opcode[0]))?;
        let mut buffer = vec![0u8; op.packet_len()];
        buffer[0] = opcode[0];
        reader.read_exact(&mut buffer[1..])?;
        Self::decode(&buffer)
    }

    /// Writes the encoded packet to `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> ProtocolResult<()> {
        writer.write_all(&self.encode())?;
        Ok(())
    }

    /// Splits a compressed level into chunk packets with running percentages.
    pub fn level_chunks(data: &[u8]) -> impl Iterator<Item = Self> + '_ {
        let total = data.len().max(1);
        let mut sent = 0usize;
        data.chunks(LEVEL_CHUNK_SIZE).map(move |chunk| {
            sent += chunk.len();
            Self::LevelChunk { data: chunk.to_vec(), percent: (sent * 100 / total) as u8 }
        })
    }

    /// Level finalisation packet, or `None` when a dimension does not fit
    /// the packet's signed 16-bit fields.
    #[must_use]
    pub fn level_end(dims: Dimensions) -> Option<Self> {
        Some(Self::LevelEnd {
            width: i16::try_from(dims.width).ok()?,
            height: i16::try_from(dims.height).ok()?,
            length: i16::try_from(dims.length).ok()?,
        })
    }
}

fn write_position(w: &mut PacketWriter, p: Position) {
    w.write_i16(p.x).write_i16(p.z).write_i16(p.y).write_u8(p.r).write_u8(p.l);
}

fn read_position(r: &mut PacketReader<'_>) -> ProtocolResult<Position> {
    let (x, z, y) = (r.read_i16()?, r.read_i16()?, r.read_i16()?);
    Ok(Position::new(x, y, z, r.read_u8()?, r.read_u8()?))
}

/// Kick packet in the later client protocol, for clients that open with
/// its handshake instead of a Classic one.
#[must_use]
pub fn legacy_kick(reason: &str) -> Vec<u8> {
    let units: Vec<u16> = reason.encode_utf16().collect();
    let mut bytes = Vec::with_capacity(3 + units.len() * 2);
    bytes.push(0xff);
    bytes.extend_from_slice(&(units.len() as u16).to_be_bytes());
    for unit in units {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(packet: &Packet) -> Packet {
        let bytes = packet.encode();
        assert_eq!(bytes.len(), packet.opcode().packet_len(), "{packet:?}");
        Packet::decode(&bytes).unwrap()
    }

    #[test]
    fn test_round_trip_all_client_visible_packets() {
        let position = Position::new(1024, -5, 640, 200, 17);
        let packets = [
            Packet::Handshake {
                protocol_version: PROTOCOL_VERSION,
                name: "Notch".into(),
                key: "5f4dcc3b5aa765d61d8327deb882cf99".into(),
                user_type: USER_TYPE_OP,
            },
            Packet::Ping,
            Packet::LevelBegin,
            Packet::LevelEnd { width: 256, height: 64, length: 512 },
            Packet::SetBlockClient { x: 3, y: 4, z: 5, placing: true, block: Block::STONE },
            Packet::SetBlockClient { x: 3, y: 4, z: 5, placing: false, block: Block::AIR },
            Packet::SetBlock { x: 10, y: 20, z: 30, block: Block::WATER },
            Packet::AddEntity { id: 12, name: "Jeb".into(), position },
            Packet::Teleport { id: SELF_ID, position },
            Packet::MoveRotate { id: 3, dx: -128, dy: 127, dz: 0, r: 1, l: 255 },
            Packet::Move { id: 126, dx: 1, dy: -1, dz: 5 },
            Packet::Rotate { id: 0, r: 64, l: 192 },
            Packet::RemoveEntity { id: 9 },
            Packet::Message { id: -1, text: "&ehello world".into() },
            Packet::Disconnect { reason: "Kicked by console".into() },
            Packet::SetPermission { user_type: USER_TYPE_NORMAL },
        ];
        for packet in &packets {
            assert_eq!(&round_trip(packet), packet);
        }
    }

    #[test]
    fn test_names_at_string_boundary() {
        let exact = "n".repeat(64);
        let packet = Packet::AddEntity { id: 1, name: exact.clone(), position: Position::default() };
        assert_eq!(round_trip(&packet), packet);

        let long = Packet::Disconnect { reason: "r".repeat(80) };
        assert_eq!(round_trip(&long), Packet::Disconnect { reason: "r".repeat(64) });
    }

    #[test]
    fn test_coordinate_wire_order() {
        let bytes = Packet::SetBlock { x: 1, y: 2, z: 3, block: Block::DIRT }.encode();
        // x, height, y
        assert_eq!(bytes, vec![6, 0, 1, 0, 3, 0, 2, 3]);
    }

    #[test]
    fn test_level_chunks() {
        let data: Vec<u8> = (0..2500u32).map(|i| i as u8).collect();
        let chunks: Vec<Packet> = Packet::level_chunks(&data).collect();
        assert_eq!(chunks.len(), 3);
        let mut joined = Vec::new();
        for chunk in &chunks {
            let decoded = round_trip(chunk);
            let Packet::LevelChunk { data, .. } = decoded else { panic!("not a chunk") };
            assert!(data.len() <= LEVEL_CHUNK_SIZE);
            joined.extend(data);
        }
        assert_eq!(joined, data);
        assert!(matches!(chunks.last(), Some(Packet::LevelChunk { percent: 100, .. })));
    }

    #[test]
    fn test_level_end_fits_i16() {
        assert_eq!(
            Packet::level_end(Dimensions::new(256, 128, 64)),
            Some(Packet::LevelEnd { width: 256, height: 64, length: 128 })
        );
        assert!(Packet::level_end(Dimensions::new(32767, 32767, 32767)).is_some());
        assert_eq!(Packet::level_end(Dimensions::new(32768, 16, 16)), None);
        assert_eq!(Packet::level_end(Dimensions::new(16, 40000, 16)), None);
        assert_eq!(Packet::level_end(Dimensions::new(16, 16, 65535)), None);
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(Packet::decode(&[42]), Err(ProtocolError::UnknownOpcode(42))));
        assert!(matches!(Packet::decode(&[8, 0, 0]), Err(ProtocolError::Truncated { opcode: 8, needed: 10, .. })));

        let mut chunk = Packet::LevelChunk { data: vec![1], percent: 0 }.encode();
        chunk[1..3].copy_from_slice(&2000i16.to_be_bytes());
        assert!(matches!(Packet::decode(&chunk), Err(ProtocolError::ChunkTooLarge(2000))));
    }

    #[test]
    fn test_read_from_stream() {
        let mut wire = Packet::Ping.encode();
        wire.extend(Packet::Message { id: 0, text: "hi".into() }.encode());
        let mut cursor = std::io::Cursor::new(wire);
        assert_eq!(Packet::read_from(&mut cursor).unwrap(), Packet::Ping);
        assert_eq!(Packet::read_from(&mut cursor).unwrap(), Packet::Message { id: 0, text: "hi".into() });
        assert!(matches!(Packet::read_from(&mut cursor), Err(ProtocolError::Io(_))));
    }

    #[test]
    fn test_legacy_kick() {
        assert_eq!(legacy_kick("ab"), vec![0xff, 0, 2, 0, b'a', 0, b'b']);
    }
}
