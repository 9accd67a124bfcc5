//! # Packet Serialization
//!
//! Big-endian field writers and readers for fixed-layout Classic packets.
//!
//! ## Design
//!
//! - Every packet has a fixed size known from its opcode, so the writer
//!   reserves exactly that much and the reader never has to guess
//! - Strings are always 64 bytes of ASCII padded with spaces
//! - Readers work on a borrowed slice; they never allocate except for strings

use crate::error::{ProtocolError, ProtocolResult};

/// Length of every protocol string field.
pub const STRING_LENGTH: usize = 64;

/// Byte written in place of non-ASCII characters.
const REPLACEMENT: u8 = b'?';

/// Encodes `text` as a 64-byte space-padded ASCII field.
///
/// Non-ASCII characters become `?`; anything past 64 characters is dropped.
#[must_use]
pub fn encode_string(text: &str) -> [u8; STRING_LENGTH] {
    let mut field = [b' '; STRING_LENGTH];
    for (slot, ch) in field.iter_mut().zip(text.chars()) {
        *slot = if ch.is_ascii() { ch as u8 } else { REPLACEMENT };
    }
    field
}

/// Decodes a 64-byte field, dropping the trailing padding.
#[must_use]
pub fn decode_string(field: &[u8]) -> String {
    let end = field.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    field[..end]
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { REPLACEMENT as char })
        .collect()
}

/// Packet writer - appends big-endian fields to a buffer sized for one packet.
pub struct PacketWriter {
    buffer: Vec<u8>,
}

impl PacketWriter {
    /// Starts a packet with its opcode.
    #[must_use]
    pub fn new(opcode: u8, capacity: usize) -> Self {
        let mut buffer = Vec::with_capacity(capacity);
        buffer.push(opcode);
        Self { buffer }
    }

    /// Returns the number of bytes written, opcode included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing but the opcode has been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.len() <= 1
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buffer.push(value);
        self
    }

    /// Writes a signed byte.
    #[inline]
    pub fn write_i8(&mut self, value: i8) -> &mut Self {
        self.buffer.push(value as u8);
        self
    }

    /// Writes an i16 in big-endian format.
    #[inline]
    pub fn write_i16(&mut self, value: i16) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Writes a 64-byte string field.
    #[inline]
    pub fn write_string(&mut self, text: &str) -> &mut Self {
        self.buffer.extend_from_slice(&encode_string(text));
        self
    }

    /// Writes raw bytes, zero-padded up to `width`.
    pub fn write_padded(&mut self, bytes: &[u8], width: usize) -> &mut Self {
        let take = bytes.len().min(width);
        self.buffer.extend_from_slice(&bytes[..take]);
        self.buffer.resize(self.buffer.len() + (width - take), 0);
        self
    }

    /// Finishes the packet.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

/// Packet reader - reads big-endian fields from a packet body.
pub struct PacketReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> PacketReader<'a> {
    /// Creates a reader over `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    fn take(&mut self, count: usize) -> ProtocolResult<&'a [u8]> {
        if self.remaining() < count {
            let opcode = self.buffer.first().copied().unwrap_or(0);
            return Err(ProtocolError::Truncated {
                opcode,
                needed: self.position + count,
                available: self.buffer.len(),
            });
        }
        let slice = &self.buffer[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> ProtocolResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Reads a signed byte.
    #[inline]
    pub fn read_i8(&mut self) -> ProtocolResult<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    /// Reads a big-endian i16.
    #[inline]
    pub fn read_i16(&mut self) -> ProtocolResult<i16> {
        let bytes = self.take(2)?;
        Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a 64-byte string field.
    #[inline]
    pub fn read_string(&mut self) -> ProtocolResult<String> {
        Ok(decode_string(self.take(STRING_LENGTH)?))
    }

    /// Reads `count` raw bytes.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> ProtocolResult<&'a [u8]> {
        self.take(count)
    }
}
