//! The printer's network channel.
//!
//! Every packet on the channel is a VarInt discriminator followed by the
//! message payload. Payload fields use the game's "friendly byte buffer"
//! layout:
//!
//! - block positions are a big-endian `i64` packed by [`pack_block_pos`]
//! - strings are a VarInt byte length followed by UTF-8
//! - enums are their VarInt ordinal
//!
//! The transport underneath is reliable and ordered; nothing in this module
//! retries or acknowledges anything.

use std::fmt::{self, Debug, Formatter};
use std::string::FromUtf8Error;
use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use derive_more::{Display, FromStr};
use snafu::{ensure, Backtrace, OptionExt, Snafu};

use crate::block::{pack_block_pos, unpack_block_pos, BlockPos, InvalidRotationError, Rotation};

pub mod messages;
pub mod queued;

use messages::{Message, MessageKind, PrinterMessage};

/// Longest string, in characters, the channel accepts.
pub const MAX_STRING_CHARS: usize = 32767;
const MAX_VAR_INT_BYTES: usize = 5;

// MARK: Identifiers

/// The identifier of a connected player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, FromStr)]
pub struct PlayerId(pub u32);

// MARK: Errors

/// A value could not be written to the wire.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EncodeError {
    #[snafu(display("Block position {pos} does not fit in a packed block position."))]
    PositionOutOfRange { pos: BlockPos },
    #[snafu(display("String of {chars} characters exceeds the {MAX_STRING_CHARS} character limit."))]
    EncodeStringTooLong { chars: usize },
}

/// A packet could not be read from the wire.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DecodeError {
    #[snafu(display("Packet ended early: needed {needed} more bytes, {remaining} left."))]
    UnexpectedEof { needed: usize, remaining: usize },
    #[snafu(display("VarInt is longer than {MAX_VAR_INT_BYTES} bytes."))]
    VarIntTooLong,
    #[snafu(display("String length {length} is negative."))]
    NegativeLength { length: i32 },
    #[snafu(display("String of {chars} characters exceeds the {MAX_STRING_CHARS} character limit."))]
    DecodeStringTooLong { chars: usize },
    #[snafu(display("String is not valid UTF-8: {source}"), context(false))]
    InvalidUtf8 { source: FromUtf8Error },
    #[snafu(display("{source}"), context(false))]
    InvalidRotation { source: InvalidRotationError },
    #[snafu(display("Unknown message discriminator `{id}`."))]
    UnknownDiscriminator { id: i32 },
    #[snafu(display("{count} unread bytes after the end of a {kind} message."))]
    TrailingBytes { kind: MessageKind, count: usize },
}

/// An error raised by the channel registrar or while framing a message.
#[derive(Debug, Snafu)]
pub enum ChannelError {
    #[snafu(display("{kind} is already registered on channel `{channel}`."))]
    AlreadyRegistered {
        channel: String,
        kind: MessageKind,
        backtrace: Backtrace,
    },
    #[snafu(display("{kind} is not registered on channel `{channel}`."))]
    NotRegistered {
        channel: String,
        kind: MessageKind,
        backtrace: Backtrace,
    },
    #[snafu(display(
        "Channel `{channel}` speaks version `{local}` but the remote side speaks `{remote}`."
    ))]
    VersionMismatch {
        channel: String,
        local: String,
        remote: String,
        backtrace: Backtrace,
    },
    #[snafu(display("Failed to encode message: {source}"), context(false))]
    Encode {
        source: EncodeError,
        backtrace: Backtrace,
    },
    #[snafu(display("Failed to decode packet: {source}"), context(false))]
    Decode {
        source: DecodeError,
        backtrace: Backtrace,
    },
}

/// The transport refused a packet.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransportError {
    /// The other end of the transport has gone away.
    #[snafu(display("The transport is closed."))]
    Closed { backtrace: Backtrace },
}

/// An error that can occur when sending a message to the server.
#[derive(Debug, Snafu)]
pub enum ConnectionError {
    #[snafu(display("{source}"), context(false))]
    Channel { source: ChannelError },
    #[snafu(display("The message could not be sent: {source}"), context(false))]
    Transport { source: TransportError },
}

// MARK: Wire primitives

fn ensure_remaining(buf: &impl Buf, needed: usize) -> Result<(), DecodeError> {
    let remaining = buf.remaining();
    ensure!(remaining >= needed, UnexpectedEofSnafu { needed, remaining });
    Ok(())
}

/// Writes a variable-length, 7-bits-per-byte, little-endian integer.
pub fn write_var_int(buf: &mut impl BufMut, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !0x7F == 0 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
}

/// Reads an integer written by [`write_var_int`].
pub fn read_var_int(buf: &mut impl Buf) -> Result<i32, DecodeError> {
    let mut value = 0u32;
    for i in 0..MAX_VAR_INT_BYTES {
        ensure_remaining(buf, 1)?;
        let byte = buf.get_u8();
        value |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    VarIntTooLongSnafu.fail()
}

/// A value with a fixed layout on the printer channel.
pub trait Wire: Sized {
    fn write(&self, buf: &mut BytesMut) -> Result<(), EncodeError>;
    fn read(buf: &mut Bytes) -> Result<Self, DecodeError>;
}

impl Wire for BlockPos {
    fn write(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        let packed = pack_block_pos(self).context(PositionOutOfRangeSnafu { pos: *self })?;
        buf.put_i64(packed);
        Ok(())
    }

    fn read(buf: &mut Bytes) -> Result<Self, DecodeError> {
        ensure_remaining(buf, 8)?;
        Ok(unpack_block_pos(buf.get_i64()))
    }
}

impl Wire for String {
    fn write(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        let chars = self.chars().count();
        ensure!(chars <= MAX_STRING_CHARS, EncodeStringTooLongSnafu { chars });
        // A string within the character limit is at most 3 * 32767 bytes,
        // which always fits in an i32.
        write_var_int(buf, self.len() as i32);
        buf.put_slice(self.as_bytes());
        Ok(())
    }

    fn read(buf: &mut Bytes) -> Result<Self, DecodeError> {
        let length = read_var_int(buf)?;
        let length = usize::try_from(length)
            .ok()
            .context(NegativeLengthSnafu { length })?;
        ensure!(
            length <= MAX_STRING_CHARS * 3,
            DecodeStringTooLongSnafu { chars: length }
        );
        ensure_remaining(buf, length)?;
        let string = String::from_utf8(buf.split_to(length).to_vec())?;
        let chars = string.chars().count();
        ensure!(chars <= MAX_STRING_CHARS, DecodeStringTooLongSnafu { chars });
        Ok(string)
    }
}

impl Wire for Rotation {
    fn write(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        write_var_int(buf, self.ordinal());
        Ok(())
    }

    fn read(buf: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Rotation::try_from(read_var_int(buf)?)?)
    }
}

// MARK: Channel

/// A named, versioned message channel with a table of registered messages.
///
/// Discriminators are assigned in registration order, starting at zero, so
/// both sides must register the same messages in the same order. The version
/// string guards against mismatched registrations during the handshake.
pub struct Channel {
    name: String,
    version: String,
    kinds: Vec<MessageKind>,
}

impl Channel {
    /// Name of the printer's channel.
    pub const NAME: &'static str = "printer:main";
    /// Protocol version of the printer's channel.
    pub const VERSION: &'static str = "1";

    /// Creates a channel with no registered messages.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            kinds: Vec::new(),
        }
    }

    /// Creates the printer channel with all of its messages registered.
    #[must_use]
    pub fn printer() -> Self {
        let mut channel = Self::new(Self::NAME, Self::VERSION);
        for &kind in MessageKind::ALL {
            // The table is empty and `ALL` has no duplicates.
            _ = channel.register_kind(kind);
        }
        channel
    }

    /// Registers a message type and returns its discriminator.
    ///
    /// # Errors
    ///
    /// Returns an error if the message type is already registered.
    pub fn register<M: Message>(&mut self) -> Result<i32, ChannelError> {
        self.register_kind(M::KIND)
    }

    fn register_kind(&mut self, kind: MessageKind) -> Result<i32, ChannelError> {
        ensure!(
            !self.kinds.contains(&kind),
            AlreadyRegisteredSnafu {
                channel: &self.name,
                kind
            }
        );
        self.kinds.push(kind);
        Ok(self.kinds.len() as i32 - 1)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the discriminator of a registered message kind.
    pub fn id_of(&self, kind: MessageKind) -> Option<i32> {
        self.kinds.iter().position(|&k| k == kind).map(|i| i as i32)
    }

    /// Returns the message kind registered under a discriminator.
    pub fn kind_of(&self, id: i32) -> Option<MessageKind> {
        usize::try_from(id).ok().and_then(|i| self.kinds.get(i)).copied()
    }

    /// Whether a remote side speaking `remote_version` can talk to us.
    pub fn accepts(&self, remote_version: &str) -> bool {
        self.version == remote_version
    }

    /// Checks the remote side's version string.
    ///
    /// # Errors
    ///
    /// Returns an error if the versions differ.
    pub fn handshake(&self, remote_version: &str) -> Result<(), ChannelError> {
        ensure!(
            self.accepts(remote_version),
            VersionMismatchSnafu {
                channel: &self.name,
                local: &self.version,
                remote: remote_version,
            }
        );
        Ok(())
    }

    /// Frames a message as a packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the message kind is not registered or a field
    /// cannot be encoded.
    pub fn encode(&self, message: &PrinterMessage) -> Result<Bytes, ChannelError> {
        let kind = message.kind();
        let id = self.id_of(kind).context(NotRegisteredSnafu {
            channel: &self.name,
            kind,
        })?;
        let mut buf = BytesMut::new();
        write_var_int(&mut buf, id);
        message.write_payload(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Reads a message from a packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the discriminator is unknown, the payload is
    /// malformed, or bytes are left over after the payload.
    pub fn decode(&self, mut packet: Bytes) -> Result<PrinterMessage, ChannelError> {
        let id = read_var_int(&mut packet)?;
        let kind = self.kind_of(id).context(UnknownDiscriminatorSnafu { id })?;
        let message = PrinterMessage::read_payload(kind, &mut packet)?;
        if packet.has_remaining() {
            return Err(DecodeError::TrailingBytes {
                kind,
                count: packet.remaining(),
            }
            .into());
        }
        Ok(message)
    }
}

impl Debug for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("messages", &self.kinds.len())
            .finish()
    }
}

// MARK: Transport

/// The reliable, ordered packet transport underneath the channel.
///
/// Sends are fire-and-forget: an `Ok` means the transport took the packet,
/// not that the server received it.
pub trait Transport: Debug {
    /// Hands a packet to the transport for delivery to the server. Never
    /// blocks.
    fn send_to_server(&self, packet: Bytes) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send_to_server(&self, packet: Bytes) -> Result<(), TransportError> {
        (**self).send_to_server(packet)
    }
}

/// The client's handle for sending printer messages to the server.
#[derive(Debug)]
pub struct ClientConnection<T: Transport> {
    channel: Arc<Channel>,
    transport: T,
}

impl<T: Transport> ClientConnection<T> {
    pub const fn new(channel: Arc<Channel>, transport: T) -> Self {
        Self { channel, transport }
    }

    /// Creates a connection after checking the server's channel version.
    ///
    /// # Errors
    ///
    /// Returns an error if the server speaks a different version.
    pub fn connect(
        channel: Arc<Channel>,
        transport: T,
        server_version: &str,
    ) -> Result<Self, ChannelError> {
        channel.handshake(server_version)?;
        Ok(Self::new(channel, transport))
    }

    /// Encodes a message and hands it to the transport.
    pub fn send(&self, message: impl Into<PrinterMessage>) -> Result<(), ConnectionError> {
        let message = message.into();
        let packet = self.channel.encode(&message)?;
        log::trace!("Sending {} ({} bytes)", message.kind(), packet.len());
        self.transport.send_to_server(packet)?;
        Ok(())
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

// MARK: Tests
