//! Requests the printer screen sends to the server.
//!
//! Every message starts with the position of the printer block entity it is
//! addressed to, followed by its payload fields in declaration order.

use bytes::{Bytes, BytesMut};
use derive_more::{Display, From};

use super::{DecodeError, EncodeError, Wire};
use crate::block::{BlockPos, Rotation};

/// Values implementing this trait are messages that can be sent over the
/// printer channel.
pub trait Message: Sized + Into<PrinterMessage> {
    /// The kind used to look up this message's discriminator.
    const KIND: MessageKind;

    /// The printer block entity the message is addressed to.
    fn block_entity(&self) -> BlockPos;

    /// Writes the message payload, without a discriminator.
    fn write_payload(&self, buf: &mut BytesMut) -> Result<(), EncodeError>;

    /// Reads a message payload written by [`Message::write_payload`].
    fn read_payload(buf: &mut Bytes) -> Result<Self, DecodeError>;
}

macro_rules! message_library {
    {
        $(
            $(#[$message_meta:meta])*
            $vis:vis message $message_name:ident {
                block_entity: BlockPos,
                $(
                    $(#[$field_meta:meta])*
                    $field:ident : $type:ty
                ),*
                $(,)?
            }
        )*
    } => {
        /// Identifies a message type independently of its discriminator.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
        pub enum MessageKind {
            $( $message_name, )*
        }

        impl MessageKind {
            /// Every message kind, in the order the printer channel registers
            /// them.
            pub const ALL: &'static [Self] = &[$( Self::$message_name, )*];
        }

        $(
            $(#[$message_meta])*
            #[derive(Debug, Clone, PartialEq, Eq)]
            $vis struct $message_name {
                /// Position of the printer block entity.
                pub block_entity: BlockPos,
                $(
                    $(#[$field_meta])*
                    pub $field: $type,
                )*
            }

            impl Message for $message_name {
                const KIND: MessageKind = MessageKind::$message_name;

                fn block_entity(&self) -> BlockPos {
                    self.block_entity
                }

                fn write_payload(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
                    self.block_entity.write(buf)?;
                    $( self.$field.write(buf)?; )*
                    Ok(())
                }

                fn read_payload(buf: &mut Bytes) -> Result<Self, DecodeError> {
                    Ok(Self {
                        block_entity: Wire::read(buf)?,
                        $( $field: Wire::read(buf)?, )*
                    })
                }
            }
        )*

        /// Any message of the printer channel.
        #[derive(Debug, Clone, PartialEq, Eq, From)]
        pub enum PrinterMessage {
            $( $message_name($message_name), )*
        }

        impl PrinterMessage {
            pub const fn kind(&self) -> MessageKind {
                match self {
                    $( Self::$message_name(_) => MessageKind::$message_name, )*
                }
            }

            /// The printer block entity the message is addressed to.
            pub fn block_entity(&self) -> BlockPos {
                match self {
                    $( Self::$message_name(message) => message.block_entity, )*
                }
            }

            pub(crate) fn write_payload(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
                match self {
                    $( Self::$message_name(message) => message.write_payload(buf), )*
                }
            }

            pub(crate) fn read_payload(
                kind: MessageKind,
                buf: &mut Bytes,
            ) -> Result<Self, DecodeError> {
                Ok(match kind {
                    $( MessageKind::$message_name => $message_name::read_payload(buf)?.into(), )*
                })
            }
        }
    };
}

// Registration order is part of the protocol: the channel assigns
// discriminators in the order messages are declared here.
message_library! {
    /// Places the selected schematic at a position.
    ///
    /// The server also stores the target, rotation and schematic on the
    /// printer, then starts its placement workflow.
    pub message PlaceStructure {
        block_entity: BlockPos,
        target: BlockPos,
        rotation: Rotation,
        schematic: String,
    }

    /// Stores the selected schematic on the printer.
    pub message SchematicSelection {
        block_entity: BlockPos,
        name: String,
    }

    /// Stores the target position on the printer.
    pub message PositionUpdate {
        block_entity: BlockPos,
        target: BlockPos,
    }

    /// Stores the placement rotation on the printer.
    pub message RotationChange {
        block_entity: BlockPos,
        rotation: Rotation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Channel;

    fn round_trip(message: impl Into<PrinterMessage>) {
        let channel = Channel::printer();
        let message = message.into();
        let packet = channel.encode(&message).unwrap();
        assert_eq!(channel.decode(packet).unwrap(), message);
    }

    #[test]
    fn place_structure_round_trips() {
        round_trip(PlaceStructure {
            block_entity: BlockPos::new(98, 63, 195),
            target: BlockPos::new(100, 64, 200),
            rotation: Rotation::Clockwise90,
            schematic: "tower.nbt".to_owned(),
        });
    }

    #[test]
    fn schematic_selection_round_trips() {
        round_trip(SchematicSelection {
            block_entity: BlockPos::new(-5, -60, 7),
            name: "château ♥.schematic".to_owned(),
        });
    }

    #[test]
    fn position_update_round_trips() {
        round_trip(PositionUpdate {
            block_entity: BlockPos::new(0, 0, 0),
            target: BlockPos::new(-33_554_432, 2047, 33_554_431),
        });
    }

    #[test]
    fn rotation_change_round_trips() {
        for rotation in Rotation::ALL {
            round_trip(RotationChange {
                block_entity: BlockPos::new(12, 70, -12),
                rotation,
            });
        }
    }

    #[test]
    fn place_structure_layout() {
        let mut buf = BytesMut::new();
        PlaceStructure {
            block_entity: BlockPos::new(0, 1, 0),
            target: BlockPos::new(0, 2, 0),
            rotation: Rotation::CounterClockwise90,
            schematic: "a".to_owned(),
        }
        .write_payload(&mut buf)
        .unwrap();
        assert_eq!(
            buf.to_vec(),
            [0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 2, 3, 1, b'a']
        );
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let mut buf = Bytes::from_static(&[0, 0, 0, 0]);
        assert!(matches!(
            PositionUpdate::read_payload(&mut buf),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn message_reports_its_block_entity() {
        let message = PrinterMessage::from(SchematicSelection {
            block_entity: BlockPos::new(1, 2, 3),
            name: String::new(),
        });
        assert_eq!(message.kind(), MessageKind::SchematicSelection);
        assert_eq!(message.block_entity(), BlockPos::new(1, 2, 3));
    }
}
